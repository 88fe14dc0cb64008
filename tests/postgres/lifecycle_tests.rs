//! Lifecycle services running against the `PostgreSQL` adapter.

use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use resourcing::request::{
    domain::{Actor, PersonId, ProvisioningState, ShareParams, ShareSource},
    ports::RequestStore,
    services::LifecycleError,
};
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

use crate::postgres::helpers::{CleanupGuard, PgLifecycle, ensure_template, setup_store, test_runtime};

#[rstest]
fn reset_clears_the_stored_workflow_state(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_reset_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let owner = Actor::resource_owner(PersonId::new());
        let request = lifecycle.submit("direct").await;
        let engine = lifecycle.engine();
        engine
            .initialize(request.id(), &owner)
            .await
            .expect("initialize should succeed");
        engine
            .approve(request.id(), &owner)
            .await
            .expect("approval should succeed");

        engine
            .reset(request.id(), &owner)
            .await
            .expect("reset should succeed");

        let stored = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        assert!(stored.state().is_none());
        let workflow = lifecycle
            .store
            .find_workflow(request.id())
            .await
            .expect("lookup should succeed");
        assert!(workflow.is_none());

        engine
            .initialize(request.id(), &owner)
            .await
            .expect("a reset request can start again");
    });
}

#[rstest]
fn deletion_cascades_opinions_and_keeps_revoked_grants(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_deletion_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let owner = Actor::resource_owner(PersonId::new());
        let reviewer = lifecycle.person("Ingrid Solberg");
        let reader = lifecycle.person("Tomas Berg");
        let request = lifecycle.submit("direct").await;

        let opinion = lifecycle
            .opinions()
            .request(request.id(), &owner, "Check grade", None, &[reviewer])
            .await
            .expect("second opinion should be created");
        let response_id = opinion
            .responses()
            .first()
            .expect("one response per assignee")
            .id();
        let params = ShareParams {
            shared_with: reader,
            scope: "basic_read".to_owned(),
            source: ShareSource::User,
            reason: None,
        };
        lifecycle
            .sharing()
            .share(request.id(), &owner, &params)
            .await
            .expect("sharing should succeed");

        lifecycle
            .requests()
            .delete_request(request.id())
            .await
            .expect("deletion should succeed");

        assert!(
            lifecycle
                .store
                .find_request(request.id())
                .await
                .expect("lookup should succeed")
                .is_none()
        );
        assert!(
            lifecycle
                .store
                .find_second_opinion(opinion.id())
                .await
                .expect("lookup should succeed")
                .is_none()
        );
        assert!(
            lifecycle
                .store
                .find_second_opinion_by_response(response_id)
                .await
                .expect("lookup should succeed")
                .is_none()
        );
        let grants = lifecycle
            .store
            .list_shares(request.id())
            .await
            .expect("grants should be listed");
        assert_eq!(grants.len(), 1);
        assert!(grants.iter().all(|grant| grant.is_revoked()));
        assert!(grants.iter().all(|grant| grant.revoked_at().is_some()));
    });
}

#[rstest]
fn provisioning_outcomes_round_trip_through_jsonb(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_provisioning_{}", Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let lifecycle = PgLifecycle::new(store);
    let rt = test_runtime();

    rt.block_on(async {
        let owner = Actor::resource_owner(PersonId::new());
        let request = lifecycle.submit("direct").await;
        let engine = lifecycle.engine();
        engine
            .initialize(request.id(), &owner)
            .await
            .expect("initialize should succeed");
        for _ in 0..2 {
            engine
                .approve(request.id(), &owner)
                .await
                .expect("approval should succeed");
        }

        let payload = json!({"code": "POSITION_FROZEN", "detail": {"until": "2026-12-01"}});
        lifecycle
            .org_chart
            .reject_pushes("position is frozen", Some(payload.clone()))
            .expect("scripting should succeed");
        let failed = lifecycle.provisioning().provision(request.id(), false).await;
        assert!(matches!(failed, Err(LifecycleError::Provisioning(_))));

        let stored = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        assert_eq!(stored.provisioning().state(), ProvisioningState::Error);
        assert_eq!(stored.provisioning().error_payload(), Some(&payload));

        lifecycle
            .org_chart
            .accept_pushes()
            .expect("scripting should succeed");
        let status = lifecycle
            .provisioning()
            .provision(request.id(), true)
            .await
            .expect("forced provisioning should succeed");

        let reloaded = lifecycle
            .store
            .find_request(request.id())
            .await
            .expect("lookup should succeed")
            .expect("request exists");
        assert_eq!(reloaded.provisioning(), &status);
        assert_eq!(reloaded.provisioning().state(), ProvisioningState::Provisioned);
        assert!(reloaded.provisioning().error_payload().is_none());
    });
}
