//! Concurrent writers racing on one request.

use super::helpers::{Engine, Lifecycle, lifecycle};
use async_trait::async_trait;
use mockable::DefaultClock;
use resourcing::request::{
    adapters::memory::InMemoryOrgChart,
    domain::{Actor, OrgPositionId, PersonId, ProvisioningState, RequestId},
    ports::{AllocationPush, OrgChartClient, OrgChartResult, PositionSnapshot},
    services::{Audience, ErrorKind, LifecycleResult, ProvisioningCoordinator},
};
use rstest::rstest;
use std::sync::Arc;
use tokio::{sync::Barrier, task::JoinSet};

const RACERS: usize = 6;

async fn race<T, F, Fut>(
    lifecycle: &Lifecycle,
    request_id: RequestId,
    operation: F,
) -> Vec<LifecycleResult<T>>
where
    T: Send + 'static,
    F: Fn(Arc<Engine>, RequestId, Actor) -> Fut,
    Fut: Future<Output = LifecycleResult<T>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for _ in 0..RACERS {
        let actor = Actor::resource_owner(PersonId::new());
        tasks.spawn(operation(Arc::clone(&lifecycle.engine), request_id, actor));
    }
    let mut outcomes = Vec::with_capacity(RACERS);
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.expect("racing task should not panic"));
    }
    outcomes
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initialization_starts_exactly_one_workflow(lifecycle: Lifecycle) {
    let request = lifecycle.submit("direct", Vec::new()).await;

    let outcomes = race(&lifecycle, request.id(), |engine, id, actor| async move {
        engine.initialize(id, &actor).await
    })
    .await;

    let (won, lost): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
    assert_eq!(won.len(), 1);
    assert!(
        lost.iter().all(|outcome| outcome
            .as_ref()
            .is_err_and(|err| err.kind() == ErrorKind::InvalidWorkflow))
    );
    assert_eq!(lifecycle.count_events("workflow_initialized"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_never_skip_or_repeat_a_step(lifecycle: Lifecycle) {
    let request = lifecycle.submit("direct", Vec::new()).await;
    lifecycle
        .engine
        .initialize(request.id(), &Actor::resource_owner(PersonId::new()))
        .await
        .expect("initialize should succeed");

    let outcomes = race(&lifecycle, request.id(), |engine, id, actor| async move {
        engine.approve(id, &actor).await
    })
    .await;

    let approvals: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .collect();
    assert_eq!(approvals.len(), 2);
    let mut from: Vec<&str> = approvals
        .iter()
        .map(|approval| approval.transition.from.as_str())
        .collect();
    from.sort_unstable();
    assert_eq!(from, vec!["approval", "created"]);
    assert!(
        outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().err())
            .all(|err| err.kind() == ErrorKind::InvalidWorkflow)
    );
    assert_eq!(lifecycle.count_events("workflow_step_approved"), 2);
    assert_eq!(lifecycle.count_events("workflow_completed"), 1);
    assert_eq!(lifecycle.count_events("provisioning_requested"), 1);
}

/// Org chart that holds position lookups until every caller has arrived.
struct LockstepOrgChart {
    inner: Arc<InMemoryOrgChart>,
    arrivals: Barrier,
}

#[async_trait]
impl OrgChartClient for LockstepOrgChart {
    async fn resolve_position(&self, id: OrgPositionId) -> OrgChartResult<Option<PositionSnapshot>> {
        self.arrivals.wait().await;
        self.inner.resolve_position(id).await
    }

    async fn push_allocation(&self, push: &AllocationPush) -> OrgChartResult<OrgPositionId> {
        self.inner.push_allocation(push).await
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_provisioning_pushes_once(lifecycle: Lifecycle) {
    let request = lifecycle.submit("direct", Vec::new()).await;
    let actor = Actor::resource_owner(PersonId::new());
    lifecycle
        .engine
        .initialize(request.id(), &actor)
        .await
        .expect("initialize should succeed");
    for _ in 0..2 {
        lifecycle
            .engine
            .approve(request.id(), &actor)
            .await
            .expect("approve should succeed");
    }
    let coordinator = ProvisioningCoordinator::new(
        Arc::clone(&lifecycle.store),
        Arc::clone(&lifecycle.sink),
        Arc::new(LockstepOrgChart {
            inner: Arc::clone(&lifecycle.org_chart),
            arrivals: Barrier::new(2),
        }),
        Arc::new(DefaultClock),
    );

    let (left, right) = tokio::join!(
        coordinator.provision(request.id(), false),
        coordinator.provision(request.id(), false),
    );

    let first = left.expect("first provisioning should succeed");
    let second = right.expect("second provisioning should succeed");
    assert!(first.is_provisioned() || second.is_provisioned());
    assert_eq!(lifecycle.org_chart.pushes().expect("readable").len(), 1);
    assert_eq!(lifecycle.count_events("request_provisioned"), 1);
    let stored = lifecycle
        .queries
        .get_request(request.id(), Audience::Internal)
        .await
        .expect("request exists");
    assert_eq!(stored.provisioning.state(), ProvisioningState::Provisioned);
}
