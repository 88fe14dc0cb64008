//! Error types for request domain validation and lifecycle rules.

use super::{
    ActionId, OrgPositionId, PersonId, RequestId, RequestType, ResponseState, StepId, SubType,
};
use thiserror::Error;

/// Errors returned while constructing request domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestDomainError {
    /// A step identifier is empty after trimming.
    #[error("step identifier must not be empty")]
    EmptyStepId,

    /// A step identifier contains whitespace.
    #[error("invalid step identifier '{0}'")]
    InvalidStepId(String),

    /// A request sub type is empty after trimming.
    #[error("request sub type must not be empty")]
    EmptySubType,

    /// The request number is zero or too large to persist.
    #[error("invalid request number {0}, expected a positive integer")]
    InvalidRequestNumber(u64),

    /// A title is empty after trimming.
    #[error("{0} title must not be empty")]
    EmptyTitle(&'static str),

    /// A workflow template failed validation.
    #[error("invalid workflow template for {request_type}/{sub_type}: {reason}")]
    InvalidTemplate {
        /// Request type the template is registered for.
        request_type: RequestType,
        /// Sub type the template is registered for, or `*`.
        sub_type: String,
        /// Validation failure description.
        reason: String,
    },

    /// The workflow template catalog could not be decoded.
    #[error("workflow template catalog could not be decoded: {0}")]
    TemplateDecoding(String),
}

/// Illegal workflow transition or precondition failure.
///
/// Always surfaced to the caller as a rejected operation and never retried
/// automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidWorkflowError {
    /// A non-terminated workflow already exists for the request.
    #[error("request {0} already has an active workflow")]
    AlreadyExists(RequestId),

    /// The request has no workflow.
    #[error("request {0} has no workflow")]
    NotInitialized(RequestId),

    /// The workflow is completed or terminated.
    #[error("workflow for request {0} is not running")]
    NotRunning(RequestId),

    /// The request still has a running workflow.
    #[error("request {0} has an active workflow")]
    ActiveWorkflow(RequestId),

    /// The request state does not name a step of the workflow.
    #[error("request {0} has no current workflow step")]
    NoCurrentStep(RequestId),

    /// A step pointer references a step that does not exist.
    #[error("workflow for request {request_id} has no step '{step}'")]
    StepNotFound {
        /// Request identifier.
        request_id: RequestId,
        /// Missing step.
        step: StepId,
    },

    /// The current step has already been approved, rejected or skipped.
    #[error("step '{step}' of request {request_id} is already terminal")]
    StepAlreadyTerminal {
        /// Request identifier.
        request_id: RequestId,
        /// Terminal step.
        step: StepId,
    },

    /// A checked transition does not match the workflow's actual pointers.
    #[error("request {request_id} cannot move from '{from}' to '{to}'")]
    StepMismatch {
        /// Request identifier.
        request_id: RequestId,
        /// Requested source step.
        from: StepId,
        /// Requested target step, or `completed` for the end of the workflow.
        to: StepId,
    },

    /// Unresolved required actions block the transition.
    #[error("request {request_id} has {count} unresolved required action(s)")]
    BlockedByActions {
        /// Request identifier.
        request_id: RequestId,
        /// Number of blocking actions.
        count: usize,
    },

    /// The checked request type does not match the stored request.
    #[error("request {request_id} is of type {actual}, not {expected}")]
    RequestTypeMismatch {
        /// Request identifier.
        request_id: RequestId,
        /// Type supplied by the caller.
        expected: RequestType,
        /// Stored request type.
        actual: RequestType,
    },

    /// The request has not reached the point where it may be provisioned.
    #[error("request {0} is not ready for provisioning")]
    NotProvisionable(RequestId),

    /// No workflow template is configured for the request type.
    #[error("no workflow template configured for {request_type}/{sub_type}")]
    TemplateNotFound {
        /// Request type.
        request_type: RequestType,
        /// Request sub type.
        sub_type: SubType,
    },
}

/// Local validation failure, rejected before any mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The proposed person may not be cleared in the current state.
    #[error("proposed person of request {0} cannot be cleared in its current state")]
    CannotUnsetProposedPerson(RequestId),

    /// More than one candidate remains and no single person was proposed.
    #[error("request {request_id} has {count} candidates; propose exactly one person first")]
    CandidatesNotNarrowed {
        /// Request identifier.
        request_id: RequestId,
        /// Number of candidates.
        count: usize,
    },

    /// A referenced person could not be resolved.
    #[error("person {0} could not be resolved")]
    UnknownPerson(PersonId),

    /// The request names no org-chart position to provision.
    #[error("request {0} has no target position")]
    MissingOrgPosition(RequestId),

    /// A referenced org-chart position could not be resolved.
    #[error("position {0} could not be resolved")]
    UnknownPosition(OrgPositionId),

    /// A second opinion was requested without reviewers.
    #[error("a second opinion needs at least one assignee")]
    NoAssignees,

    /// The request is completed and no longer accepts the change.
    #[error("request {0} is completed")]
    RequestCompleted(RequestId),

    /// A second-opinion response cannot move between the given states.
    #[error("second-opinion response cannot move from {from} to {to}")]
    InvalidResponseTransition {
        /// Current response state.
        from: ResponseState,
        /// Requested response state.
        to: ResponseState,
    },

    /// The action is already in the requested resolution state.
    #[error("action {0} is already in the requested resolution state")]
    ActionUnchanged(ActionId),

    /// A sharing scope or reason was empty.
    #[error("sharing {0} must not be empty")]
    EmptySharingField(&'static str),

    /// A domain value failed validation.
    #[error(transparent)]
    Domain(#[from] RequestDomainError),
}

/// Error returned while parsing enum values from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

impl ParseEnumError {
    /// Creates a parse error for `kind`.
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
