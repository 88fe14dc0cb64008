//! Org-chart client port used by provisioning.

use crate::request::domain::{
    OrgPositionId, PersonId, ProposalParameters, RequestId, RequestType,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for org-chart operations.
pub type OrgChartResult<T> = Result<T, OrgChartError>;

/// Read-only view of an org-chart position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSnapshot {
    /// Position identifier.
    pub id: OrgPositionId,
    /// Position name.
    pub name: String,
    /// Department owning the position.
    pub department: Option<String>,
}

/// Approved allocation pushed to the org chart.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPush {
    /// Request being provisioned.
    pub request_id: RequestId,
    /// Request type.
    pub request_type: RequestType,
    /// Target position.
    pub org_position_id: OrgPositionId,
    /// Person to allocate, when one was proposed.
    pub person_id: Option<PersonId>,
    /// Change-request scoping.
    pub parameters: Option<ProposalParameters>,
    /// Opaque proposed changes.
    pub proposed_changes: Option<Value>,
}

/// External org-chart system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrgChartClient: Send + Sync {
    /// Looks up a position.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError`] when the lookup fails.
    async fn resolve_position(&self, id: OrgPositionId) -> OrgChartResult<Option<PositionSnapshot>>;

    /// Pushes an approved allocation and returns the resulting position.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Rejected`] when the org chart refuses the
    /// allocation and [`OrgChartError::Unavailable`] when the outcome is
    /// unknown.
    async fn push_allocation(&self, push: &AllocationPush) -> OrgChartResult<OrgPositionId>;
}

/// Errors returned by the org-chart client.
#[derive(Debug, Clone, Error)]
pub enum OrgChartError {
    /// The org chart refused the allocation.
    #[error("org chart rejected allocation: {message}")]
    Rejected {
        /// Failure description.
        message: String,
        /// Raw payload returned by the org chart.
        payload: Option<Value>,
    },

    /// The org chart could not be reached; the outcome is unknown.
    #[error("org chart unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl OrgChartError {
    /// Wraps a transport failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
