//! Request aggregate root and request classification types.

use super::{
    CorrelationId, OrgPositionId, ParseEnumError, PersonId, Proposal, ProvisioningStatus,
    RequestDomainError, RequestId, RequestNumber, StepId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resourcing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Allocate a person into an org-chart position.
    Allocation,
    /// Change an existing allocation.
    ChangeRequest,
}

impl RequestType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allocation => "allocation",
            Self::ChangeRequest => "change_request",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RequestType {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allocation" => Ok(Self::Allocation),
            "change_request" | "changerequest" => Ok(Self::ChangeRequest),
            _ => Err(ParseEnumError::new("request type", value)),
        }
    }
}

/// Request sub type such as `normal`, `direct` or `joint_venture`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubType(String);

impl SubType {
    /// The standard allocation flow.
    pub const NORMAL: &'static str = "normal";

    /// Creates a validated, lowercase sub type.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::EmptySubType`] for blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, RequestDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestDomainError::EmptySubType);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Wraps a known-good sub type without validation.
    pub(crate) fn trusted(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }

    /// Returns the `normal` sub type.
    #[must_use]
    pub fn normal() -> Self {
        Self(Self::NORMAL.to_owned())
    }

    /// Returns the sub type as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubType {
    type Error = RequestDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubType> for String {
    fn from(value: SubType) -> Self {
        value.0
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameter object for creating a new draft request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    /// Request type.
    pub request_type: RequestType,
    /// Request sub type.
    pub sub_type: SubType,
    /// Department the request is routed to.
    pub assigned_department: Option<String>,
    /// Batch correlation identifier.
    pub correlation_id: Option<CorrelationId>,
    /// Target position in the org chart.
    pub org_position_id: Option<OrgPositionId>,
    /// Initial set of eligible persons.
    pub candidates: Vec<PersonId>,
}

/// Resource-allocation request aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    number: RequestNumber,
    request_type: RequestType,
    sub_type: SubType,
    state: Option<StepId>,
    is_draft: bool,
    assigned_department: Option<String>,
    correlation_id: Option<CorrelationId>,
    org_position_id: Option<OrgPositionId>,
    created_by: PersonId,
    proposal: Proposal,
    provisioning: ProvisioningStatus,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted request aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRequestData {
    /// Persisted request identifier.
    pub id: RequestId,
    /// Persisted request number.
    pub number: RequestNumber,
    /// Persisted request type.
    pub request_type: RequestType,
    /// Persisted sub type.
    pub sub_type: SubType,
    /// Persisted workflow state name.
    pub state: Option<StepId>,
    /// Persisted draft flag.
    pub is_draft: bool,
    /// Persisted department routing.
    pub assigned_department: Option<String>,
    /// Persisted batch correlation identifier.
    pub correlation_id: Option<CorrelationId>,
    /// Persisted target position.
    pub org_position_id: Option<OrgPositionId>,
    /// Persisted creator.
    pub created_by: PersonId,
    /// Persisted proposal data.
    pub proposal: Proposal,
    /// Persisted provisioning status.
    pub provisioning: ProvisioningStatus,
    /// Persisted optimistic-concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Creates a new draft request without a workflow.
    #[must_use]
    pub fn new(
        params: RequestParams,
        number: RequestNumber,
        created_by: PersonId,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: RequestId::new(),
            number,
            request_type: params.request_type,
            sub_type: params.sub_type,
            state: None,
            is_draft: true,
            assigned_department: params.assigned_department,
            correlation_id: params.correlation_id,
            org_position_id: params.org_position_id,
            created_by,
            proposal: Proposal::with_candidates(params.candidates),
            provisioning: ProvisioningStatus::default(),
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a request from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRequestData) -> Self {
        Self {
            id: data.id,
            number: data.number,
            request_type: data.request_type,
            sub_type: data.sub_type,
            state: data.state,
            is_draft: data.is_draft,
            assigned_department: data.assigned_department,
            correlation_id: data.correlation_id,
            org_position_id: data.org_position_id,
            created_by: data.created_by,
            proposal: data.proposal,
            provisioning: data.provisioning,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the human-facing request number.
    #[must_use]
    pub const fn number(&self) -> RequestNumber {
        self.number
    }

    /// Returns the request type.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Returns the request sub type.
    #[must_use]
    pub const fn sub_type(&self) -> &SubType {
        &self.sub_type
    }

    /// Returns the current workflow state name, if a workflow has started.
    #[must_use]
    pub const fn state(&self) -> Option<&StepId> {
        self.state.as_ref()
    }

    /// Returns whether the request is still a draft.
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        self.is_draft
    }

    /// Returns whether the request workflow has completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.as_ref().is_some_and(StepId::is_completed)
    }

    /// Returns the department the request is routed to.
    #[must_use]
    pub fn assigned_department(&self) -> Option<&str> {
        self.assigned_department.as_deref()
    }

    /// Returns the batch correlation identifier.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    /// Returns the target org-chart position.
    #[must_use]
    pub const fn org_position_id(&self) -> Option<OrgPositionId> {
        self.org_position_id
    }

    /// Returns the person who submitted the request.
    #[must_use]
    pub const fn created_by(&self) -> PersonId {
        self.created_by
    }

    /// Returns the embedded proposal.
    #[must_use]
    pub const fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    /// Returns the embedded provisioning status.
    #[must_use]
    pub const fn provisioning(&self) -> &ProvisioningStatus {
        &self.provisioning
    }

    /// Returns the optimistic-concurrency version the aggregate was read at.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the request into workflow step `step`.
    pub(crate) fn enter_step(&mut self, step: StepId, clock: &impl Clock) {
        self.state = Some(step);
        self.is_draft = false;
        self.touch(clock);
    }

    /// Records that the workflow has run to completion.
    pub(crate) fn mark_completed(&mut self, clock: &impl Clock) {
        self.state = Some(StepId::completed());
        self.touch(clock);
    }

    /// Clears the workflow state after a reset.
    pub(crate) fn clear_workflow_state(&mut self, clock: &impl Clock) {
        self.state = None;
        self.touch(clock);
    }

    /// Grants mutable access to the embedded proposal.
    pub(crate) fn proposal_mut(&mut self, clock: &impl Clock) -> &mut Proposal {
        self.touch(clock);
        &mut self.proposal
    }

    /// Replaces the provisioning status.
    pub(crate) fn record_provisioning(&mut self, status: ProvisioningStatus, clock: &impl Clock) {
        self.provisioning = status;
        self.touch(clock);
    }

    /// Advances the version after staging an update, returning the version
    /// the update was computed against.
    pub(crate) const fn advance_version(&mut self) -> u64 {
        let expected = self.version;
        self.version = expected.saturating_add(1);
        expected
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
