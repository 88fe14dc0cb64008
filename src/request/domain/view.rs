//! Read-time projections that apply visibility rules without touching
//! storage.

use super::{
    CorrelationId, OrgPositionId, PersonId, ProposalParameters, ProposedPerson,
    ProvisioningStatus, Request, RequestId, RequestNumber, RequestType, ResponseId,
    ResponseState, SecondOpinion, SecondOpinionId, StepId, SubType,
    hides_proposals_for_public_view,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Externally visible representation of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    /// Request identifier.
    pub id: RequestId,
    /// Request number.
    pub number: RequestNumber,
    /// Request type.
    pub request_type: RequestType,
    /// Request sub type.
    pub sub_type: SubType,
    /// Current workflow state name.
    pub state: Option<StepId>,
    /// Draft flag.
    pub is_draft: bool,
    /// Whether the workflow completed.
    pub is_completed: bool,
    /// Department routing.
    pub assigned_department: Option<String>,
    /// Batch correlation identifier.
    pub correlation_id: Option<CorrelationId>,
    /// Target position.
    pub org_position_id: Option<OrgPositionId>,
    /// Creator.
    pub created_by: PersonId,
    /// Currently proposed person.
    pub proposed_person: Option<ProposedPerson>,
    /// First person ever proposed.
    pub initial_proposed_person: Option<ProposedPerson>,
    /// Change-request parameters.
    pub proposal_parameters: Option<ProposalParameters>,
    /// Opaque proposed changes.
    pub proposed_changes: Option<Value>,
    /// Eligible candidates.
    pub candidates: Vec<PersonId>,
    /// Provisioning status.
    pub provisioning: ProvisioningStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RequestView {
    /// Projects the request with every field intact.
    #[must_use]
    pub fn internal(request: &Request) -> Self {
        let proposal = request.proposal();
        Self {
            id: request.id(),
            number: request.number(),
            request_type: request.request_type(),
            sub_type: request.sub_type().clone(),
            state: request.state().cloned(),
            is_draft: request.is_draft(),
            is_completed: request.is_completed(),
            assigned_department: request.assigned_department().map(str::to_owned),
            correlation_id: request.correlation_id(),
            org_position_id: request.org_position_id(),
            created_by: request.created_by(),
            proposed_person: proposal.proposed_person().cloned(),
            initial_proposed_person: proposal.initial_proposed_person().cloned(),
            proposal_parameters: proposal.parameters().cloned(),
            proposed_changes: proposal.proposed_changes().cloned(),
            candidates: proposal.candidates().to_vec(),
            provisioning: request.provisioning().clone(),
            created_at: request.created_at(),
            updated_at: request.updated_at(),
        }
    }

    /// Projects the request for public readers, masking proposals of normal
    /// allocations that are still in the `created` state.
    #[must_use]
    pub fn public(request: &Request) -> Self {
        let mut view = Self::internal(request);
        if hides_proposals_for_public_view(
            request.request_type(),
            request.sub_type(),
            request.state(),
        ) {
            view.proposed_person = None;
            view.initial_proposed_person = None;
            view.proposal_parameters = None;
            view.proposed_changes = None;
        }
        view
    }
}

/// A response as seen by one reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseView {
    /// Response identifier.
    pub id: ResponseId,
    /// Assigned reviewer.
    pub assigned_to: PersonId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Publication timestamp.
    pub answered_at: Option<DateTime<Utc>>,
    /// Comment, empty when hidden from the reader.
    pub comment: String,
    /// Response state.
    pub state: ResponseState,
}

/// A second opinion as seen by one reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondOpinionView {
    /// Second-opinion identifier.
    pub id: SecondOpinionId,
    /// Owning request.
    pub request_id: RequestId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Creator.
    pub created_by: PersonId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Responses with the comment visibility rule applied.
    pub responses: Vec<ResponseView>,
}

impl SecondOpinionView {
    /// Projects `opinion` for `reader`.
    #[must_use]
    pub fn for_reader(opinion: &SecondOpinion, reader: PersonId) -> Self {
        Self {
            id: opinion.id(),
            request_id: opinion.request_id(),
            title: opinion.title().to_owned(),
            description: opinion.description().map(str::to_owned),
            created_by: opinion.created_by(),
            created_at: opinion.created_at(),
            responses: opinion
                .responses()
                .iter()
                .map(|response| ResponseView {
                    id: response.id(),
                    assigned_to: response.assigned_to(),
                    created_at: response.created_at(),
                    answered_at: response.answered_at(),
                    comment: response.visible_comment(reader).to_owned(),
                    state: response.state(),
                })
                .collect(),
        }
    }
}
