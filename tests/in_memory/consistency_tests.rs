//! Conflict retries and the store-first commit order.

use super::helpers::{Lifecycle, lifecycle};
use resourcing::request::{
    config::LifecycleConfig,
    domain::{Actor, PersonId},
    ports::RequestStore,
    services::{ErrorKind, LifecycleError},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_conflicts_are_retried(lifecycle: Lifecycle) {
    let request = lifecycle.submit("direct", Vec::new()).await;
    lifecycle
        .store
        .conflict_next_commits(2)
        .expect("injection should succeed");

    let snapshot = lifecycle
        .engine
        .initialize(request.id(), &Actor::resource_owner(PersonId::new()))
        .await
        .expect("initialize should succeed after retries");

    assert!(snapshot.workflow.is_running());
    assert_eq!(lifecycle.count_events("workflow_initialized"), 1);
    assert_eq!(lifecycle.sink.rollback_count().expect("readable"), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persistent_conflicts_exhaust_the_retry_budget() {
    let lifecycle = Lifecycle::with_config(LifecycleConfig::default().with_max_conflict_retries(1));
    let request = lifecycle.submit("direct", Vec::new()).await;
    lifecycle
        .store
        .conflict_next_commits(5)
        .expect("injection should succeed");

    let outcome = lifecycle
        .engine
        .initialize(request.id(), &Actor::resource_owner(PersonId::new()))
        .await;

    let Err(error) = outcome else {
        panic!("expected the retry budget to run out");
    };
    assert!(matches!(error, LifecycleError::Conflict { attempts: 2, .. }));
    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(
        lifecycle
            .store
            .find_workflow(request.id())
            .await
            .expect("lookup should succeed")
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_notification_commit_keeps_the_stored_change(lifecycle: Lifecycle) {
    let request = lifecycle.submit("direct", Vec::new()).await;
    lifecycle
        .sink
        .fail_next_commits(1)
        .expect("injection should succeed");

    let outcome = lifecycle
        .engine
        .initialize(request.id(), &Actor::resource_owner(PersonId::new()))
        .await;

    let Err(LifecycleError::PartialCommit(partial)) = outcome else {
        panic!("expected a partial commit, got {outcome:?}");
    };
    assert!(
        lifecycle
            .store
            .committed_transactions()
            .expect("readable")
            .contains(&partial.store_transaction)
    );
    assert!(
        lifecycle
            .store
            .find_workflow(request.id())
            .await
            .expect("lookup should succeed")
            .is_some()
    );
    assert_eq!(lifecycle.count_events("workflow_initialized"), 0);
}
