//! Shared wiring for lifecycle service tests.

use std::sync::Arc;

use crate::request::{
    adapters::memory::{
        InMemoryNotificationSink, InMemoryOrgChart, InMemoryProfileResolver, InMemoryRequestStore,
        StaticAuthorizationOracle,
    },
    domain::{
        OrgPositionId, PersonId, Request, RequestEvent, RequestParams, RequestType, SubType,
    },
    ports::PositionSnapshot,
    services::{
        ActionManager, ProposalManager, ProvisioningCoordinator, RequestQueryService,
        RequestService, SecondOpinionManager, SharingManager, WorkflowEngine,
    },
};
use mockable::DefaultClock;
use rstest::fixture;

pub(super) type TestEngine = WorkflowEngine<
    InMemoryRequestStore,
    InMemoryNotificationSink,
    StaticAuthorizationOracle,
    DefaultClock,
>;

/// Memory adapters plus one known org-chart position.
pub(super) struct Harness {
    pub(super) store: Arc<InMemoryRequestStore>,
    pub(super) sink: Arc<InMemoryNotificationSink>,
    pub(super) oracle: Arc<StaticAuthorizationOracle>,
    pub(super) org_chart: Arc<InMemoryOrgChart>,
    pub(super) profiles: Arc<InMemoryProfileResolver>,
    pub(super) clock: Arc<DefaultClock>,
    pub(super) position: OrgPositionId,
}

impl Harness {
    pub(super) fn engine(&self) -> TestEngine {
        WorkflowEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.oracle),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn requests(
        &self,
    ) -> RequestService<InMemoryRequestStore, InMemoryNotificationSink, InMemoryProfileResolver, DefaultClock>
    {
        RequestService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn proposals(
        &self,
    ) -> ProposalManager<InMemoryRequestStore, InMemoryNotificationSink, InMemoryProfileResolver, DefaultClock>
    {
        ProposalManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn opinions(
        &self,
    ) -> SecondOpinionManager<
        InMemoryRequestStore,
        InMemoryNotificationSink,
        InMemoryProfileResolver,
        DefaultClock,
    > {
        SecondOpinionManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn sharing(
        &self,
    ) -> SharingManager<InMemoryRequestStore, InMemoryNotificationSink, InMemoryProfileResolver, DefaultClock>
    {
        SharingManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn actions(
        &self,
    ) -> ActionManager<InMemoryRequestStore, InMemoryNotificationSink, DefaultClock> {
        ActionManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn provisioning(
        &self,
    ) -> ProvisioningCoordinator<InMemoryRequestStore, InMemoryNotificationSink, InMemoryOrgChart, DefaultClock>
    {
        ProvisioningCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.org_chart),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn queries(&self) -> RequestQueryService<InMemoryRequestStore> {
        RequestQueryService::new(Arc::clone(&self.store))
    }

    /// Registers a resolvable person.
    pub(super) fn person(&self, name: &str) -> PersonId {
        let person_id = PersonId::new();
        self.profiles
            .add_person(person_id, name)
            .expect("profile registration should succeed");
        person_id
    }

    /// Submits a draft targeting the known position.
    pub(super) async fn submit(
        &self,
        request_type: RequestType,
        sub_type: &str,
        candidates: Vec<PersonId>,
    ) -> Request {
        let params = RequestParams {
            request_type,
            sub_type: SubType::new(sub_type).expect("valid sub type"),
            assigned_department: Some("PRD TPD".to_owned()),
            correlation_id: None,
            org_position_id: Some(self.position),
            candidates,
        };
        self.requests()
            .create_request(params, PersonId::new())
            .await
            .expect("request creation should succeed")
    }

    /// Names of the events delivered so far, in order.
    pub(super) fn event_names(&self) -> Vec<&'static str> {
        self.sink
            .published_events()
            .expect("published events should be readable")
            .iter()
            .map(RequestEvent::name)
            .collect()
    }
}

#[fixture]
pub(super) fn harness() -> Harness {
    let org_chart = InMemoryOrgChart::new();
    let position = OrgPositionId::new();
    org_chart
        .add_position(PositionSnapshot {
            id: position,
            name: "Senior engineer".to_owned(),
            department: Some("PRD TPD".to_owned()),
        })
        .expect("position registration should succeed");
    Harness {
        store: Arc::new(InMemoryRequestStore::new()),
        sink: Arc::new(InMemoryNotificationSink::new()),
        oracle: Arc::new(StaticAuthorizationOracle::allow_all()),
        org_chart: Arc::new(org_chart),
        profiles: Arc::new(InMemoryProfileResolver::new()),
        clock: Arc::new(DefaultClock),
        position,
    }
}
