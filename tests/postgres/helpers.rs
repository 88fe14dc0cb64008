//! Shared wiring for `PostgreSQL` store tests.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use resourcing::request::{
    adapters::{
        memory::{
            InMemoryNotificationSink, InMemoryOrgChart, InMemoryProfileResolver,
            StaticAuthorizationOracle,
        },
        postgres::PostgresRequestStore,
    },
    domain::{OrgPositionId, PersonId, Request, RequestParams, RequestType, SubType},
    ports::PositionSnapshot,
    services::{
        ProvisioningCoordinator, RequestService, SecondOpinionManager, SharingManager,
        WorkflowEngine,
    },
};
use std::sync::Arc;
use tokio::runtime::Runtime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the request lifecycle schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-01-12-000000_create_request_lifecycle/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "resourcing_test_template";

/// Creates a tokio runtime for async operations in tests.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_SCHEMA_SQL)
                .map_err(|e| eyre::eyre!("schema migration failed: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Drops the per-test database when the test ends, even on panic.
pub struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    pub const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Creates a database from the template and returns a store over it.
pub fn setup_store(cluster: &TestCluster, db_name: &str) -> Result<PostgresRequestStore, BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(PostgresRequestStore::new(pool))
}

/// Lifecycle services over a Postgres store and in-memory collaborators.
pub struct PgLifecycle {
    pub store: Arc<PostgresRequestStore>,
    pub sink: Arc<InMemoryNotificationSink>,
    pub org_chart: Arc<InMemoryOrgChart>,
    pub profiles: Arc<InMemoryProfileResolver>,
    pub clock: Arc<DefaultClock>,
    pub position: OrgPositionId,
}

impl PgLifecycle {
    pub fn new(store: PostgresRequestStore) -> Self {
        let org_chart = Arc::new(InMemoryOrgChart::new());
        let position = OrgPositionId::new();
        org_chart
            .add_position(PositionSnapshot {
                id: position,
                name: "Drilling engineer".to_owned(),
                department: Some("DRL OPS".to_owned()),
            })
            .expect("position registration should succeed");
        Self {
            store: Arc::new(store),
            sink: Arc::new(InMemoryNotificationSink::new()),
            org_chart,
            profiles: Arc::new(InMemoryProfileResolver::new()),
            clock: Arc::new(DefaultClock),
            position,
        }
    }

    pub fn engine(
        &self,
    ) -> WorkflowEngine<
        PostgresRequestStore,
        InMemoryNotificationSink,
        StaticAuthorizationOracle,
        DefaultClock,
    > {
        WorkflowEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::new(StaticAuthorizationOracle::allow_all()),
            Arc::clone(&self.clock),
        )
    }

    pub fn requests(
        &self,
    ) -> RequestService<
        PostgresRequestStore,
        InMemoryNotificationSink,
        InMemoryProfileResolver,
        DefaultClock,
    > {
        RequestService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub fn opinions(
        &self,
    ) -> SecondOpinionManager<
        PostgresRequestStore,
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

    pub fn sharing(
        &self,
    ) -> SharingManager<
        PostgresRequestStore,
        InMemoryNotificationSink,
        InMemoryProfileResolver,
        DefaultClock,
    > {
        SharingManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.profiles),
            Arc::clone(&self.clock),
        )
    }

    pub fn provisioning(
        &self,
    ) -> ProvisioningCoordinator<
        PostgresRequestStore,
        InMemoryNotificationSink,
        InMemoryOrgChart,
        DefaultClock,
    > {
        ProvisioningCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            Arc::clone(&self.org_chart),
            Arc::clone(&self.clock),
        )
    }

    /// Registers a resolvable person.
    pub fn person(&self, name: &str) -> PersonId {
        let person_id = PersonId::new();
        self.profiles
            .add_person(person_id, name)
            .expect("profile registration should succeed");
        person_id
    }

    /// Submits a draft allocation targeting the known position.
    pub async fn submit(&self, sub_type: &str) -> Request {
        let params = RequestParams {
            request_type: RequestType::Allocation,
            sub_type: SubType::new(sub_type).expect("valid sub type"),
            assigned_department: Some("DRL OPS".to_owned()),
            correlation_id: None,
            org_position_id: Some(self.position),
            candidates: Vec::new(),
        };
        self.requests()
            .create_request(params, PersonId::new())
            .await
            .expect("request creation should succeed")
    }
}
