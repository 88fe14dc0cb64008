//! Application services for request lifecycle orchestration.
//!
//! Each mutating command runs through one [`TransactionCoordinator`] scope:
//! the store commits first, then the notification sink.

mod action;
mod error;
mod gate;
mod lookup;
mod proposal;
mod provisioning;
mod query;
mod request;
mod second_opinion;
mod sharing;
mod transaction;
mod workflow;

pub use action::ActionManager;
pub use error::{
    ErrorKind, LifecycleError, LifecycleResult, PartialCommitError, ProvisioningError,
    UnauthorizedWorkflowError,
};
pub use gate::ActionGate;
pub use proposal::ProposalManager;
pub use provisioning::{ProvisioningCoordinator, requires_provisioning};
pub use query::{Audience, RequestQueryService};
pub use request::RequestService;
pub use second_opinion::SecondOpinionManager;
pub use sharing::SharingManager;
pub use transaction::TransactionCoordinator;
pub use workflow::{Approval, WorkflowEngine, WorkflowSnapshot};
