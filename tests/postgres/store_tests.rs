//! Store-level behaviour of the `PostgreSQL` adapter.

use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use resourcing::request::{
    domain::{Actor, PersonId, Workflow, WorkflowTemplateCatalog},
    ports::{RequestStore, StoreError},
};
use rstest::rstest;
use uuid::Uuid;

use crate::postgres::helpers::{CleanupGuard, PgLifecycle, ensure_template, setup_store, test_runtime};

#[rstest]
fn stale_request_update_is_rejected(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_stale_update_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let request = lifecycle.submit("direct").await;
        let mut winner = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        let mut loser = winner.clone();

        let mut first = lifecycle.store.begin().await.expect("begin");
        first.update_request(&mut winner);
        lifecycle
            .store
            .commit(first)
            .await
            .expect("first update should commit");

        let mut second = lifecycle.store.begin().await.expect("begin");
        second.update_request(&mut loser);
        let outcome = lifecycle.store.commit(second).await;

        assert!(
            matches!(
                outcome,
                Err(StoreError::VersionConflict { request_id, .. }) if request_id == request.id()
            ),
            "expected a version conflict, got {outcome:?}"
        );
        let stored = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        assert_eq!(stored.version(), winner.version());
    });
}

#[rstest]
fn second_workflow_for_a_request_is_rejected(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_duplicate_workflow_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let request = lifecycle.submit("direct").await;
        let started = lifecycle
            .engine()
            .initialize(request.id(), &Actor::resource_owner(PersonId::new()))
            .await
            .expect("initialize should succeed");

        let mut copy = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        let catalog = WorkflowTemplateCatalog::builtin();
        let template = catalog
            .resolve(copy.request_type(), copy.sub_type())
            .expect("direct allocations have a template");
        let rival = Workflow::start(&mut copy, template, &DefaultClock).expect("workflow start");

        let mut tx = lifecycle.store.begin().await.expect("begin");
        tx.insert_workflow(&rival);
        let outcome = lifecycle.store.commit(tx).await;

        assert!(
            matches!(outcome, Err(StoreError::DuplicateWorkflow(id)) if id == request.id()),
            "expected a duplicate workflow, got {outcome:?}"
        );
        let kept = lifecycle
            .store
            .find_workflow(request.id())
            .await
            .expect("lookup should succeed")
            .expect("workflow exists");
        assert_eq!(kept.id(), started.workflow.id());
    });
}

#[rstest]
fn failed_commit_applies_nothing(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_atomic_commit_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let request = lifecycle.submit("direct").await;
        let mut current = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        let mut stale = current.clone();
        let catalog = WorkflowTemplateCatalog::builtin();
        let template = catalog
            .resolve(current.request_type(), current.sub_type())
            .expect("direct allocations have a template");

        let mut bump = lifecycle.store.begin().await.expect("begin");
        bump.update_request(&mut current);
        lifecycle.store.commit(bump).await.expect("bump should commit");

        let workflow = Workflow::start(&mut stale, template, &DefaultClock).expect("workflow start");
        let mut tx = lifecycle.store.begin().await.expect("begin");
        tx.insert_workflow(&workflow);
        tx.update_request(&mut stale);
        let outcome = lifecycle.store.commit(tx).await;

        assert!(matches!(outcome, Err(StoreError::VersionConflict { .. })));
        let workflow_after = lifecycle
            .store
            .find_workflow(request.id())
            .await
            .expect("lookup should succeed");
        assert!(workflow_after.is_none());
    });
}
