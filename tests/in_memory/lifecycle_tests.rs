//! End-to-end request lifecycle over the in-memory adapters.

use super::helpers::{Lifecycle, lifecycle};
use resourcing::request::{
    domain::{
        ActionParams, ActionProperties, Actor, InvalidWorkflowError, PersonId, ProvisioningState,
        Responsible, StepId, ValidationError, WorkflowState,
    },
    services::{ActionManager, Audience, LifecycleError},
};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn normal_allocation_runs_from_draft_to_provisioned(lifecycle: Lifecycle) {
    let ada = lifecycle.person("Ada");
    let grace = lifecycle.person("Grace");
    let owner = Actor::resource_owner(PersonId::new());
    let request = lifecycle.submit("normal", vec![ada, grace]).await;
    let request_id = request.id();

    lifecycle
        .engine
        .initialize(request_id, &owner)
        .await
        .expect("initialize should succeed");
    let first = lifecycle
        .engine
        .approve(request_id, &owner)
        .await
        .expect("created -> proposal should succeed");
    assert_eq!(first.transition.target_state().as_str(), "proposal");

    let blocked = lifecycle.engine.approve(request_id, &owner).await;
    assert!(matches!(
        blocked,
        Err(LifecycleError::Validation(ValidationError::CandidatesNotNarrowed { count: 2, .. }))
    ));

    lifecycle
        .proposals
        .propose(request_id, Some(grace), None)
        .await
        .expect("proposal should succeed");
    lifecycle
        .engine
        .approve(request_id, &owner)
        .await
        .expect("proposal -> approval should succeed");
    let last = lifecycle
        .engine
        .approve(request_id, &owner)
        .await
        .expect("final approval should succeed");

    assert!(last.transition.completes_workflow());
    assert!(last.provisioning_requested);
    assert_eq!(last.workflow.state(), WorkflowState::Completed);
    assert!(last.request.is_completed());

    let provisioned = lifecycle
        .provisioning
        .provision(request_id, false)
        .await
        .expect("provisioning should succeed");
    let repeated = lifecycle
        .provisioning
        .provision(request_id, false)
        .await
        .expect("repeat provisioning should succeed");

    assert_eq!(provisioned.state(), ProvisioningState::Provisioned);
    assert_eq!(repeated, provisioned);
    let pushes = lifecycle.org_chart.pushes().expect("pushes readable");
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes.first().and_then(|push| push.person_id), Some(grace));

    let view = lifecycle
        .queries
        .get_request(request_id, Audience::Public)
        .await
        .expect("request exists");
    assert!(view.is_completed);
    assert_eq!(view.proposed_person.map(|found| found.person_id), Some(grace));
    assert_eq!(
        lifecycle.event_names(),
        vec![
            "request_created",
            "workflow_initialized",
            "workflow_step_approved",
            "person_proposed",
            "workflow_step_approved",
            "workflow_step_approved",
            "workflow_completed",
            "provisioning_requested",
            "request_provisioned",
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn required_actions_hold_the_workflow_until_resolved(lifecycle: Lifecycle) {
    let owner = Actor::resource_owner(PersonId::new());
    let request = lifecycle.submit("direct", Vec::new()).await;
    let actions = ActionManager::new(
        Arc::clone(&lifecycle.store),
        Arc::clone(&lifecycle.sink),
        Arc::new(mockable::DefaultClock),
    );
    lifecycle
        .engine
        .initialize(request.id(), &owner)
        .await
        .expect("initialize should succeed");
    let action = actions
        .create_action(
            request.id(),
            &Actor::task_owner(PersonId::new()),
            &ActionParams {
                title: "Confirm budget".to_owned(),
                body: None,
                action_type: "task".to_owned(),
                sub_type: None,
                responsible: Responsible::ResourceOwner,
                is_required: true,
                properties: ActionProperties::new(),
            },
        )
        .await
        .expect("action creation should succeed");

    let blocked = lifecycle.engine.approve(request.id(), &owner).await;
    assert!(matches!(
        blocked,
        Err(LifecycleError::InvalidWorkflow(InvalidWorkflowError::BlockedByActions { .. }))
    ));

    actions
        .set_resolved(action.id(), true, &owner)
        .await
        .expect("resolving should succeed");
    lifecycle
        .engine
        .approve(request.id(), &owner)
        .await
        .expect("approval should succeed once resolved");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_requests_can_restart_their_workflow(lifecycle: Lifecycle) {
    let owner = Actor::resource_owner(PersonId::new());
    let request = lifecycle.submit("direct", Vec::new()).await;
    let started = lifecycle
        .engine
        .initialize(request.id(), &owner)
        .await
        .expect("initialize should succeed");

    let rejected = lifecycle
        .engine
        .reject(request.id(), &owner, "wrong department")
        .await
        .expect("rejection should succeed");
    assert_eq!(rejected.workflow.state(), WorkflowState::Terminated);

    let restarted = lifecycle
        .engine
        .initialize(request.id(), &owner)
        .await
        .expect("re-initialize should succeed");
    assert_ne!(restarted.workflow.id(), started.workflow.id());
    assert_eq!(
        restarted.request.state().map(StepId::as_str),
        Some("created")
    );
    assert_eq!(lifecycle.count_events("workflow_reset"), 1);
}
