//! Candidate proposal embedded in a request.

use super::{
    ParseEnumError, PersonId, Request, RequestId, RequestType, StepId, SubType, ValidationError,
    WorkflowTemplate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Person put forward to fill the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedPerson {
    /// Directory identity of the proposed person.
    pub person_id: PersonId,
    /// Whether the person has been told about the proposal.
    pub was_notified: bool,
    /// When the person was proposed.
    pub proposed_at: DateTime<Utc>,
}

/// Scope of a change request proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalScope {
    /// Apply the change from the start date onwards.
    Default,
    /// Apply the change to the selected allocation instance only.
    InstanceOnly,
}

impl ProposalScope {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::InstanceOnly => "instance_only",
        }
    }
}

impl fmt::Display for ProposalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProposalScope {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "instance_only" | "instanceonly" => Ok(Self::InstanceOnly),
            _ => Err(ParseEnumError::new("proposal scope", value)),
        }
    }
}

/// Change-request scoping supplied alongside a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalParameters {
    /// Start of the change window.
    pub change_from: Option<DateTime<Utc>>,
    /// End of the change window.
    pub change_to: Option<DateTime<Utc>>,
    /// Free-form change type, e.g. `adjustment`.
    pub change_type: String,
    /// How far the change reaches.
    pub scope: ProposalScope,
}

/// Proposal data embedded in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    proposed_person: Option<ProposedPerson>,
    initial_proposed_person: Option<ProposedPerson>,
    parameters: Option<ProposalParameters>,
    proposed_changes: Option<Value>,
    candidates: Vec<PersonId>,
}

impl Proposal {
    /// Creates an empty proposal with an initial candidate set.
    ///
    /// Duplicate candidates are dropped, keeping first occurrence order.
    #[must_use]
    pub fn with_candidates(candidates: Vec<PersonId>) -> Self {
        let mut proposal = Self::default();
        proposal.replace_candidates(candidates);
        proposal
    }

    /// Returns the currently proposed person.
    #[must_use]
    pub const fn proposed_person(&self) -> Option<&ProposedPerson> {
        self.proposed_person.as_ref()
    }

    /// Returns the first person ever proposed. Write-once.
    #[must_use]
    pub const fn initial_proposed_person(&self) -> Option<&ProposedPerson> {
        self.initial_proposed_person.as_ref()
    }

    /// Returns the change-request parameters.
    #[must_use]
    pub const fn parameters(&self) -> Option<&ProposalParameters> {
        self.parameters.as_ref()
    }

    /// Returns the opaque proposed-changes bag.
    #[must_use]
    pub const fn proposed_changes(&self) -> Option<&Value> {
        self.proposed_changes.as_ref()
    }

    /// Returns the eligible candidates.
    #[must_use]
    pub fn candidates(&self) -> &[PersonId] {
        &self.candidates
    }

    /// Sets or clears the proposed person.
    ///
    /// The first person ever proposed is also recorded as the initial
    /// proposed person and never overwritten afterwards.
    pub(crate) fn propose(
        &mut self,
        person_id: Option<PersonId>,
        parameters: Option<ProposalParameters>,
        at: DateTime<Utc>,
    ) {
        self.proposed_person = person_id.map(|id| ProposedPerson {
            person_id: id,
            was_notified: false,
            proposed_at: at,
        });
        if self.initial_proposed_person.is_none() {
            self.initial_proposed_person.clone_from(&self.proposed_person);
        }
        if parameters.is_some() {
            self.parameters = parameters;
        }
    }

    /// Marks the proposed person as notified. Returns `false` when nobody is
    /// proposed.
    pub(crate) fn mark_notified(&mut self) -> bool {
        self.proposed_person.as_mut().is_some_and(|person| {
            person.was_notified = true;
            true
        })
    }

    pub(crate) fn replace_candidates(&mut self, candidates: Vec<PersonId>) {
        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        self.candidates = unique;
    }

    pub(crate) fn set_proposed_changes(&mut self, changes: Option<Value>) {
        self.proposed_changes = changes;
    }

    /// Ensures several candidates have been narrowed to one proposed person.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CandidatesNotNarrowed`] when more than one
    /// candidate exists and no person is proposed.
    pub fn ensure_narrowed(&self, request_id: RequestId) -> Result<(), ValidationError> {
        let count = self.candidates.len();
        if count > 1 && self.proposed_person.is_none() {
            return Err(ValidationError::CandidatesNotNarrowed { request_id, count });
        }
        Ok(())
    }
}

/// Returns whether the proposed person of `request` may be cleared.
///
/// True while the request is a draft, has no workflow state, or sits in one
/// of the template's early states.
#[must_use]
pub fn can_unset_proposed_person(request: &Request, template: &WorkflowTemplate) -> bool {
    if request.is_draft() {
        return true;
    }
    request
        .state()
        .is_none_or(|state| template.allows_unset_proposal_in(state))
}

/// Returns whether proposals are hidden in the public view of a request.
///
/// Only normal allocations still in the `created` state are masked.
#[must_use]
pub fn hides_proposals_for_public_view(
    request_type: RequestType,
    sub_type: &SubType,
    state: Option<&StepId>,
) -> bool {
    request_type == RequestType::Allocation
        && sub_type.as_str() == SubType::NORMAL
        && state.is_some_and(|value| value.as_str() == PUBLIC_MASKED_STATE)
}

/// State in which normal allocation proposals are masked publicly.
pub const PUBLIC_MASKED_STATE: &str = "created";
