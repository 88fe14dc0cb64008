//! Domain model for the request lifecycle.
//!
//! Requests, their workflow state machine and the proposal, second-opinion,
//! provisioning and sharing sub-models live here. Everything is pure data and
//! rules; persistence, notification and external lookups stay behind the
//! ports.

mod action;
mod actor;
mod error;
mod event;
mod ids;
mod proposal;
mod provisioning;
mod request;
mod second_opinion;
mod sharing;
mod template;
mod view;
mod workflow;

pub use action::{Action, ActionParams, ActionProperties, PersistedActionData};
pub use actor::{Actor, Party, Responsible};
pub use error::{InvalidWorkflowError, ParseEnumError, RequestDomainError, ValidationError};
pub use event::RequestEvent;
pub use ids::{
    ActionId, CorrelationId, OrgPositionId, PersonId, RequestId, RequestNumber, ResponseId,
    SecondOpinionId, ShareId, StepId, WorkflowId,
};
pub use proposal::{
    PUBLIC_MASKED_STATE, Proposal, ProposalParameters, ProposalScope, ProposedPerson,
    can_unset_proposed_person, hides_proposals_for_public_view,
};
pub use provisioning::{ProvisioningState, ProvisioningStatus};
pub use request::{PersistedRequestData, Request, RequestParams, RequestType, SubType};
pub use second_opinion::{
    PersistedResponseData, PersistedSecondOpinionData, ResponseState, SecondOpinion,
    SecondOpinionResponse,
};
pub use sharing::{PersistedShareData, ShareParams, ShareSource, SharedRequest};
pub use template::{
    StepDefinition, WorkflowTemplate, WorkflowTemplateCatalog, WorkflowTemplateParams,
};
pub use view::{RequestView, ResponseView, SecondOpinionView};
pub use workflow::{
    PersistedWorkflowData, StepState, StepTransition, Workflow, WorkflowState, WorkflowStep,
};
