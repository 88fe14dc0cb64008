//! Port contracts for the request lifecycle.
//!
//! Ports define infrastructure-agnostic interfaces for the store, the
//! notification sink and the external collaborators consumed by services.

pub mod authorization;
pub mod notification;
pub mod org_chart;
pub mod profile;
pub mod store;

pub use authorization::{
    AuthorizationDecision, AuthorizationError, AuthorizationOracle, AuthorizationResult,
    ProtectedResource,
};
pub use notification::{
    NotificationError, NotificationResult, NotificationSink, NotificationTransaction,
};
pub use org_chart::{AllocationPush, OrgChartClient, OrgChartError, OrgChartResult, PositionSnapshot};
pub use profile::{PersonProfile, ProfileError, ProfileResolver, ProfileResult};
pub use store::{RequestStore, StagedWrite, StoreError, StoreResult, StoreTransaction};
