//! Authorization oracle port.
//!
//! Policy evaluation lives outside the core; services only consume the
//! decision and its reason.

use crate::request::domain::{Actor, RequestId, RequestType, StepId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for authorization lookups.
pub type AuthorizationResult<T> = Result<T, AuthorizationError>;

/// Resource an actor asks to act on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtectedResource {
    /// Moving a request from one workflow step to the next.
    WorkflowTransition {
        /// Request identifier.
        request_id: RequestId,
        /// Request type.
        request_type: RequestType,
        /// Current step.
        from: StepId,
        /// Target step, or `completed` for the end of the workflow.
        to: StepId,
    },
    /// Rejecting the current workflow step.
    WorkflowRejection {
        /// Request identifier.
        request_id: RequestId,
        /// Step being rejected.
        step: StepId,
    },
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    allowed: bool,
    reason: Option<String>,
}

impl AuthorizationDecision {
    /// Grants access.
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Denies access with a reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns whether access was granted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the denial reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// External authorization policy evaluator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    /// Decides whether `actor` may act on `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] when the policy could not be
    /// evaluated.
    async fn authorize(
        &self,
        actor: &Actor,
        resource: &ProtectedResource,
    ) -> AuthorizationResult<AuthorizationDecision>;
}

/// Errors returned by authorization oracles.
#[derive(Debug, Clone, Error)]
pub enum AuthorizationError {
    /// The policy engine could not be reached or failed.
    #[error("authorization unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl AuthorizationError {
    /// Wraps an evaluation failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
