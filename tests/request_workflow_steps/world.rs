//! Shared world state for request workflow BDD scenarios.

use std::{collections::HashMap, sync::Arc};

use mockable::DefaultClock;
use resourcing::request::{
    adapters::memory::{
        InMemoryNotificationSink, InMemoryOrgChart, InMemoryProfileResolver, InMemoryRequestStore,
        StaticAuthorizationOracle,
    },
    domain::{Action, Actor, OrgPositionId, PersonId, ProvisioningStatus, Request, RequestEvent},
    ports::PositionSnapshot,
    services::{
        ActionManager, LifecycleError, LifecycleResult, ProposalManager, ProvisioningCoordinator,
        RequestService, WorkflowEngine,
    },
};
use rstest::fixture;

type Store = InMemoryRequestStore;
type Sink = InMemoryNotificationSink;
type Profiles = InMemoryProfileResolver;

/// Scenario world for request workflow behaviour tests.
pub struct RequestWorkflowWorld {
    pub store: Arc<Store>,
    pub sink: Arc<Sink>,
    pub org_chart: Arc<InMemoryOrgChart>,
    pub profiles: Arc<Profiles>,
    pub requests: RequestService<Store, Sink, Profiles, DefaultClock>,
    pub engine: WorkflowEngine<Store, Sink, StaticAuthorizationOracle, DefaultClock>,
    pub proposals: ProposalManager<Store, Sink, Profiles, DefaultClock>,
    pub actions: ActionManager<Store, Sink, DefaultClock>,
    pub provisioning: ProvisioningCoordinator<Store, Sink, InMemoryOrgChart, DefaultClock>,
    pub owner: Actor,
    pub position: OrgPositionId,
    pub people: HashMap<String, PersonId>,
    pub request: Option<Request>,
    pub action: Option<Action>,
    pub last_error: Option<LifecycleError>,
    pub provisioning_outcome: Option<LifecycleResult<ProvisioningStatus>>,
}

impl RequestWorkflowWorld {
    /// Creates a world with one known org-chart position and no request.
    ///
    /// # Panics
    ///
    /// Panics when the in-memory org chart cannot register the position.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRequestStore::new());
        let sink = Arc::new(InMemoryNotificationSink::new());
        let org_chart = Arc::new(InMemoryOrgChart::new());
        let profiles = Arc::new(InMemoryProfileResolver::new());
        let clock = Arc::new(DefaultClock);
        let position = OrgPositionId::new();
        org_chart
            .add_position(PositionSnapshot {
                id: position,
                name: "Process engineer".to_owned(),
                department: None,
            })
            .unwrap_or_else(|err| panic!("position registration failed: {err}"));

        Self {
            requests: RequestService::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&profiles),
                Arc::clone(&clock),
            ),
            engine: WorkflowEngine::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::new(StaticAuthorizationOracle::allow_all()),
                Arc::clone(&clock),
            ),
            proposals: ProposalManager::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&profiles),
                Arc::clone(&clock),
            ),
            actions: ActionManager::new(Arc::clone(&store), Arc::clone(&sink), Arc::clone(&clock)),
            provisioning: ProvisioningCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&org_chart),
                clock,
            ),
            store,
            sink,
            org_chart,
            profiles,
            owner: Actor::resource_owner(PersonId::new()),
            position,
            people: HashMap::new(),
            request: None,
            action: None,
            last_error: None,
            provisioning_outcome: None,
        }
    }

    /// Returns the scenario's request.
    ///
    /// # Errors
    ///
    /// Returns an error when no request was submitted yet.
    pub fn request(&self) -> Result<&Request, eyre::Report> {
        self.request
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing request in scenario world"))
    }

    /// Counts delivered events called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the sink cannot be read.
    pub fn count_events(&self, name: &str) -> Result<usize, eyre::Report> {
        let events = self
            .sink
            .published_events()
            .map_err(|err| eyre::eyre!("read published events: {err}"))?;
        Ok(events
            .iter()
            .map(RequestEvent::name)
            .filter(|found| *found == name)
            .count())
    }
}

impl Default for RequestWorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RequestWorkflowWorld {
    RequestWorkflowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
