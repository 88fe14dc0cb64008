//! Service-level errors for request lifecycle operations.

use crate::request::{
    domain::{
        ActionId, InvalidWorkflowError, PersonId, ProvisioningState, RequestDomainError,
        RequestId, ResponseId, SecondOpinionId, ShareId, StepId, ValidationError,
    },
    ports::{AuthorizationError, NotificationError, OrgChartError, ProfileError, StoreError},
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Result type for lifecycle service operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Coarse classification of a [`LifecycleError`].
///
/// The transport layer maps kinds to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Illegal transition or workflow precondition failure.
    InvalidWorkflow,
    /// The caller may not perform this specific workflow transition.
    UnauthorizedWorkflow,
    /// The caller may not touch the addressed resource.
    Forbidden,
    /// The addressed resource does not exist.
    NotFound,
    /// The command was rejected before any mutation.
    Validation,
    /// The org chart refused or did not confirm an allocation.
    Provisioning,
    /// State committed but notifications did not.
    PartialCommit,
    /// Concurrent writers kept winning.
    Conflict,
    /// Infrastructure failure.
    Internal,
}

/// Structured denial of a workflow transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("not authorized to move request {request_id} from '{from}' to '{to}': {reason}")]
pub struct UnauthorizedWorkflowError {
    /// Request identifier.
    pub request_id: RequestId,
    /// Current step.
    pub from: StepId,
    /// Target step, or `completed`.
    pub to: StepId,
    /// Reason reported by the authorization oracle.
    pub reason: String,
}

/// Failure reported by the org chart while provisioning.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("provisioning of request {request_id} failed ({state}): {message}")]
pub struct ProvisioningError {
    /// Request identifier.
    pub request_id: RequestId,
    /// Provisioning state recorded for the request.
    pub state: ProvisioningState,
    /// Failure description.
    pub message: String,
    /// Raw org-chart payload, kept intact for diagnosis.
    pub payload: Option<Value>,
}

/// The store committed but the notification sink did not.
///
/// State and notifications have diverged and must be reconciled out of band.
#[derive(Debug, Clone, Error)]
#[error(
    "store transaction {store_transaction} committed but notification transaction \
     {notification_transaction} failed: {source}"
)]
pub struct PartialCommitError {
    /// Committed store transaction.
    pub store_transaction: Uuid,
    /// Failed notification transaction.
    pub notification_transaction: Uuid,
    /// Sink failure.
    pub source: NotificationError,
}

/// Errors returned by lifecycle services.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// Illegal transition or precondition failure.
    #[error(transparent)]
    InvalidWorkflow(#[from] InvalidWorkflowError),

    /// The oracle denied the workflow transition.
    #[error(transparent)]
    UnauthorizedWorkflow(#[from] UnauthorizedWorkflowError),

    /// The actor may not mutate the addressed resource.
    #[error("person {person_id} may not {operation}")]
    Forbidden {
        /// Acting person.
        person_id: PersonId,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The request does not exist.
    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// The action does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(ActionId),

    /// The second opinion does not exist.
    #[error("second opinion not found: {0}")]
    SecondOpinionNotFound(SecondOpinionId),

    /// The second-opinion response does not exist.
    #[error("second-opinion response not found: {0}")]
    ResponseNotFound(ResponseId),

    /// The sharing grant does not exist.
    #[error("share not found: {0}")]
    ShareNotFound(ShareId),

    /// Local validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Org-chart push failure.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Store committed, notifications did not.
    #[error(transparent)]
    PartialCommit(#[from] PartialCommitError),

    /// Optimistic-concurrency retries were exhausted.
    #[error("request {request_id} kept changing concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// Request identifier.
        request_id: RequestId,
        /// Attempts made.
        attempts: u32,
    },

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Notification sink failure before anything was committed.
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Authorization oracle failure.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Org-chart lookup failure.
    #[error(transparent)]
    OrgChart(#[from] OrgChartError),

    /// Profile lookup failure.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl LifecycleError {
    /// Classifies the error for transport mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWorkflow(_) | Self::Store(StoreError::DuplicateWorkflow(_)) => {
                ErrorKind::InvalidWorkflow
            }
            Self::UnauthorizedWorkflow(_) => ErrorKind::UnauthorizedWorkflow,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::RequestNotFound(_)
            | Self::TaskNotFound(_)
            | Self::SecondOpinionNotFound(_)
            | Self::ResponseNotFound(_)
            | Self::ShareNotFound(_)
            | Self::Store(StoreError::RequestNotFound(_)) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Provisioning(_) => ErrorKind::Provisioning,
            Self::PartialCommit(_) => ErrorKind::PartialCommit,
            Self::Conflict { .. } | Self::Store(StoreError::VersionConflict { .. }) => {
                ErrorKind::Conflict
            }
            Self::Store(_)
            | Self::Notification(_)
            | Self::Authorization(_)
            | Self::OrgChart(_)
            | Self::Profile(_) => ErrorKind::Internal,
        }
    }

    /// Returns whether the error is an optimistic-concurrency conflict that
    /// may succeed against fresh state.
    #[must_use]
    pub const fn is_retryable_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::VersionConflict { .. }))
    }
}

impl From<RequestDomainError> for LifecycleError {
    fn from(err: RequestDomainError) -> Self {
        Self::Validation(ValidationError::Domain(err))
    }
}
