//! Shared wiring for in-memory lifecycle integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use resourcing::request::{
    adapters::memory::{
        InMemoryNotificationSink, InMemoryOrgChart, InMemoryProfileResolver, InMemoryRequestStore,
        StaticAuthorizationOracle,
    },
    config::LifecycleConfig,
    domain::{OrgPositionId, PersonId, Request, RequestEvent, RequestParams, RequestType, SubType},
    ports::PositionSnapshot,
    services::{
        ProposalManager, ProvisioningCoordinator, RequestQueryService, RequestService,
        WorkflowEngine,
    },
};
use rstest::fixture;

/// Workflow engine over the memory adapters.
pub type Engine = WorkflowEngine<
    InMemoryRequestStore,
    InMemoryNotificationSink,
    StaticAuthorizationOracle,
    DefaultClock,
>;

/// Every adapter and service a lifecycle scenario touches.
pub struct Lifecycle {
    pub store: Arc<InMemoryRequestStore>,
    pub sink: Arc<InMemoryNotificationSink>,
    pub org_chart: Arc<InMemoryOrgChart>,
    pub profiles: Arc<InMemoryProfileResolver>,
    pub engine: Arc<Engine>,
    pub requests: RequestService<
        InMemoryRequestStore,
        InMemoryNotificationSink,
        InMemoryProfileResolver,
        DefaultClock,
    >,
    pub proposals: ProposalManager<
        InMemoryRequestStore,
        InMemoryNotificationSink,
        InMemoryProfileResolver,
        DefaultClock,
    >,
    pub provisioning: ProvisioningCoordinator<
        InMemoryRequestStore,
        InMemoryNotificationSink,
        InMemoryOrgChart,
        DefaultClock,
    >,
    pub queries: RequestQueryService<InMemoryRequestStore>,
    pub position: OrgPositionId,
}

impl Lifecycle {
    /// Wires every service with `config`.
    pub fn with_config(config: LifecycleConfig) -> Self {
        let store = Arc::new(InMemoryRequestStore::new());
        let sink = Arc::new(InMemoryNotificationSink::new());
        let org_chart = Arc::new(InMemoryOrgChart::new());
        let profiles = Arc::new(InMemoryProfileResolver::new());
        let clock = Arc::new(DefaultClock);
        let position = OrgPositionId::new();
        org_chart
            .add_position(PositionSnapshot {
                id: position,
                name: "Lead geologist".to_owned(),
                department: Some("EXP SUB".to_owned()),
            })
            .expect("position registration should succeed");

        let engine = WorkflowEngine::new(
            Arc::clone(&store),
            Arc::clone(&sink),
            Arc::new(StaticAuthorizationOracle::allow_all()),
            Arc::clone(&clock),
        )
        .with_config(config);
        Self {
            requests: RequestService::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&profiles),
                Arc::clone(&clock),
            )
            .with_config(config),
            proposals: ProposalManager::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&profiles),
                Arc::clone(&clock),
            )
            .with_config(config),
            provisioning: ProvisioningCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&org_chart),
                Arc::clone(&clock),
            )
            .with_config(config),
            queries: RequestQueryService::new(Arc::clone(&store)),
            engine: Arc::new(engine),
            store,
            sink,
            org_chart,
            profiles,
            position,
        }
    }

    /// Registers a resolvable person.
    pub fn person(&self, name: &str) -> PersonId {
        let person_id = PersonId::new();
        self.profiles
            .add_person(person_id, name)
            .expect("profile registration should succeed");
        person_id
    }

    /// Submits a draft request targeting the known position.
    pub async fn submit(&self, sub_type: &str, candidates: Vec<PersonId>) -> Request {
        let params = RequestParams {
            request_type: RequestType::Allocation,
            sub_type: SubType::new(sub_type).expect("valid sub type"),
            assigned_department: Some("EXP SUB".to_owned()),
            correlation_id: None,
            org_position_id: Some(self.position),
            candidates,
        };
        self.requests
            .create_request(params, PersonId::new())
            .await
            .expect("request creation should succeed")
    }

    /// Names of the events delivered so far, in order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.sink
            .published_events()
            .expect("events should be readable")
            .iter()
            .map(RequestEvent::name)
            .collect()
    }

    /// Number of delivered events called `name`.
    pub fn count_events(&self, name: &str) -> usize {
        self.event_names()
            .into_iter()
            .filter(|found| *found == name)
            .count()
    }
}

/// Lifecycle wired with default configuration.
#[fixture]
pub fn lifecycle() -> Lifecycle {
    Lifecycle::with_config(LifecycleConfig::default())
}
