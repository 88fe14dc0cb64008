//! Events staged into the notification transaction by lifecycle commands.

use super::{
    ActionId, OrgPositionId, PersonId, ProvisioningState, RequestId, RequestNumber, ResponseId,
    ResponseState, SecondOpinionId, ShareId, StepId, WorkflowId,
};
use serde::{Deserialize, Serialize};

/// Notification emitted for a committed lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RequestEvent {
    /// A draft request was submitted.
    RequestCreated {
        /// Request identifier.
        request_id: RequestId,
        /// Allocated request number.
        number: RequestNumber,
    },
    /// A request and its owned records were deleted.
    RequestDeleted {
        /// Request identifier.
        request_id: RequestId,
    },
    /// A workflow was started.
    WorkflowInitialized {
        /// Request identifier.
        request_id: RequestId,
        /// New workflow identifier.
        workflow_id: WorkflowId,
        /// Entry step.
        step: StepId,
    },
    /// A workflow step was approved.
    WorkflowStepApproved {
        /// Request identifier.
        request_id: RequestId,
        /// Approved step.
        from: StepId,
        /// Next current step; `None` when the workflow completed.
        to: Option<StepId>,
        /// Approver.
        approved_by: PersonId,
    },
    /// The terminal step was approved.
    WorkflowCompleted {
        /// Request identifier.
        request_id: RequestId,
        /// Completed workflow.
        workflow_id: WorkflowId,
    },
    /// The current step was rejected and the workflow terminated.
    WorkflowRejected {
        /// Request identifier.
        request_id: RequestId,
        /// Rejected step.
        step: StepId,
        /// Person who rejected.
        rejected_by: PersonId,
    },
    /// The workflow and its steps were discarded.
    WorkflowReset {
        /// Request identifier.
        request_id: RequestId,
        /// Discarded workflow.
        workflow_id: WorkflowId,
    },
    /// The workflow reached its provisioning point.
    ProvisioningRequested {
        /// Request identifier.
        request_id: RequestId,
    },
    /// The org chart accepted the allocation.
    RequestProvisioned {
        /// Request identifier.
        request_id: RequestId,
        /// Provisioned position.
        org_position_id: OrgPositionId,
    },
    /// The org chart rejected the allocation.
    ProvisioningFailed {
        /// Request identifier.
        request_id: RequestId,
        /// Resulting provisioning state.
        state: ProvisioningState,
        /// Failure message.
        message: String,
    },
    /// The proposed person was set or cleared.
    PersonProposed {
        /// Request identifier.
        request_id: RequestId,
        /// Proposed person; `None` when cleared.
        person_id: Option<PersonId>,
    },
    /// Reviewers were asked for a second opinion.
    SecondOpinionRequested {
        /// Request identifier.
        request_id: RequestId,
        /// New second opinion.
        second_opinion_id: SecondOpinionId,
        /// Assigned reviewers.
        assignees: Vec<PersonId>,
    },
    /// A reviewer updated their response.
    SecondOpinionResponseUpdated {
        /// Request identifier.
        request_id: RequestId,
        /// Updated response.
        response_id: ResponseId,
        /// Response state after the update.
        state: ResponseState,
    },
    /// A second opinion or one of its responses was deleted.
    SecondOpinionDeleted {
        /// Request identifier.
        request_id: RequestId,
        /// Affected second opinion.
        second_opinion_id: SecondOpinionId,
        /// Deleted response, when only one response was removed.
        response_id: Option<ResponseId>,
    },
    /// A person was granted visibility of a request.
    RequestShared {
        /// Request identifier.
        request_id: RequestId,
        /// Grant identifier.
        share_id: ShareId,
        /// Person receiving visibility.
        shared_with: PersonId,
    },
    /// A sharing grant was revoked.
    ShareRevoked {
        /// Request identifier.
        request_id: RequestId,
        /// Revoked grant.
        share_id: ShareId,
    },
    /// An action was attached to a request.
    ActionCreated {
        /// Request identifier.
        request_id: RequestId,
        /// New action.
        action_id: ActionId,
    },
    /// An action was resolved or reopened.
    ActionResolutionChanged {
        /// Request identifier.
        request_id: RequestId,
        /// Affected action.
        action_id: ActionId,
        /// Resolution after the change.
        is_resolved: bool,
    },
}

impl RequestEvent {
    /// Returns the request the event concerns.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::RequestCreated { request_id, .. }
            | Self::RequestDeleted { request_id }
            | Self::WorkflowInitialized { request_id, .. }
            | Self::WorkflowStepApproved { request_id, .. }
            | Self::WorkflowCompleted { request_id, .. }
            | Self::WorkflowRejected { request_id, .. }
            | Self::WorkflowReset { request_id, .. }
            | Self::ProvisioningRequested { request_id }
            | Self::RequestProvisioned { request_id, .. }
            | Self::ProvisioningFailed { request_id, .. }
            | Self::PersonProposed { request_id, .. }
            | Self::SecondOpinionRequested { request_id, .. }
            | Self::SecondOpinionResponseUpdated { request_id, .. }
            | Self::SecondOpinionDeleted { request_id, .. }
            | Self::RequestShared { request_id, .. }
            | Self::ShareRevoked { request_id, .. }
            | Self::ActionCreated { request_id, .. }
            | Self::ActionResolutionChanged { request_id, .. } => *request_id,
        }
    }

    /// Returns the snake-case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestCreated { .. } => "request_created",
            Self::RequestDeleted { .. } => "request_deleted",
            Self::WorkflowInitialized { .. } => "workflow_initialized",
            Self::WorkflowStepApproved { .. } => "workflow_step_approved",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowRejected { .. } => "workflow_rejected",
            Self::WorkflowReset { .. } => "workflow_reset",
            Self::ProvisioningRequested { .. } => "provisioning_requested",
            Self::RequestProvisioned { .. } => "request_provisioned",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::PersonProposed { .. } => "person_proposed",
            Self::SecondOpinionRequested { .. } => "second_opinion_requested",
            Self::SecondOpinionResponseUpdated { .. } => "second_opinion_response_updated",
            Self::SecondOpinionDeleted { .. } => "second_opinion_deleted",
            Self::RequestShared { .. } => "request_shared",
            Self::ShareRevoked { .. } => "share_revoked",
            Self::ActionCreated { .. } => "action_created",
            Self::ActionResolutionChanged { .. } => "action_resolution_changed",
        }
    }
}
