//! Second-opinion review sub-workflow.
//!
//! A second opinion asks named reviewers for confidential feedback on a
//! request. Each reviewer owns one response with its own small state
//! machine:
//!
//! ```text
//! Open ──► Draft ──► Published
//!   │        ▲ │
//!   │        └─┘
//!   └──────────────► Published
//! ```
//!
//! `Published` and `Closed` are read-only. `Closed` is only reached when the
//! parent request completes.

use super::{
    ParseEnumError, PersonId, RequestDomainError, RequestId, ResponseId, SecondOpinionId,
    ValidationError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a reviewer's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseState {
    /// Assigned, not yet worked on.
    Open,
    /// Work in progress, visible only to the assignee.
    Draft,
    /// Final answer, visible to every reader.
    Published,
    /// Closed without publication.
    Closed,
}

impl ResponseState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Closed => "closed",
        }
    }

    /// Returns whether a response in this state can no longer be edited.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Published | Self::Closed)
    }

    /// Returns whether a reviewer may move a response from `self` to
    /// `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open | Self::Draft, Self::Draft | Self::Published)
        )
    }
}

impl fmt::Display for ResponseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ResponseState {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError::new("response state", value)),
        }
    }
}

/// A single reviewer's response to a second opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondOpinionResponse {
    id: ResponseId,
    second_opinion_id: SecondOpinionId,
    assigned_to: PersonId,
    created_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
    comment: Option<String>,
    state: ResponseState,
}

/// Parameter object for reconstructing a persisted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedResponseData {
    /// Persisted identifier.
    pub id: ResponseId,
    /// Owning second opinion.
    pub second_opinion_id: SecondOpinionId,
    /// Assigned reviewer.
    pub assigned_to: PersonId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Publication timestamp.
    pub answered_at: Option<DateTime<Utc>>,
    /// Stored comment.
    pub comment: Option<String>,
    /// Response state.
    pub state: ResponseState,
}

impl SecondOpinionResponse {
    fn open(
        second_opinion_id: SecondOpinionId,
        assigned_to: PersonId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ResponseId::new(),
            second_opinion_id,
            assigned_to,
            created_at: at,
            answered_at: None,
            comment: None,
            state: ResponseState::Open,
        }
    }

    /// Reconstructs a response from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedResponseData) -> Self {
        Self {
            id: data.id,
            second_opinion_id: data.second_opinion_id,
            assigned_to: data.assigned_to,
            created_at: data.created_at,
            answered_at: data.answered_at,
            comment: data.comment,
            state: data.state,
        }
    }

    /// Returns the response identifier.
    #[must_use]
    pub const fn id(&self) -> ResponseId {
        self.id
    }

    /// Returns the owning second opinion.
    #[must_use]
    pub const fn second_opinion_id(&self) -> SecondOpinionId {
        self.second_opinion_id
    }

    /// Returns the assigned reviewer.
    #[must_use]
    pub const fn assigned_to(&self) -> PersonId {
        self.assigned_to
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the response was published.
    #[must_use]
    pub const fn answered_at(&self) -> Option<DateTime<Utc>> {
        self.answered_at
    }

    /// Returns the response state.
    #[must_use]
    pub const fn state(&self) -> ResponseState {
        self.state
    }

    /// Returns the stored comment without applying the visibility rule.
    ///
    /// Use [`Self::visible_comment`] for anything shown to a reader.
    #[must_use]
    pub fn stored_comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns whether `reader` may see the comment.
    #[must_use]
    pub fn is_comment_visible_to(&self, reader: PersonId) -> bool {
        self.assigned_to == reader || self.state == ResponseState::Published
    }

    /// Returns the comment as seen by `reader`; empty when hidden.
    #[must_use]
    pub fn visible_comment(&self, reader: PersonId) -> &str {
        if self.is_comment_visible_to(reader) {
            self.comment.as_deref().unwrap_or_default()
        } else {
            ""
        }
    }

    /// Updates the comment and/or state.
    ///
    /// Publishing records `answered_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidResponseTransition`] when the
    /// response is read-only or the state change is not allowed.
    pub fn update(
        &mut self,
        comment: Option<String>,
        state: Option<ResponseState>,
        clock: &impl Clock,
    ) -> Result<(), ValidationError> {
        let target = state.unwrap_or(self.state);
        let allowed = if state.is_some() {
            self.state.can_transition_to(target)
        } else {
            !self.state.is_read_only()
        };
        if !allowed {
            return Err(ValidationError::InvalidResponseTransition {
                from: self.state,
                to: target,
            });
        }
        if comment.is_some() {
            self.comment = comment;
        }
        if target == ResponseState::Published && self.state != ResponseState::Published {
            self.answered_at = Some(clock.utc());
        }
        self.state = target;
        Ok(())
    }

    /// Closes the response unless it was published. Returns whether the
    /// state changed.
    pub(crate) fn close(&mut self) -> bool {
        if self.state.is_read_only() {
            return false;
        }
        self.state = ResponseState::Closed;
        true
    }
}

/// Review request attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondOpinion {
    id: SecondOpinionId,
    request_id: RequestId,
    title: String,
    description: Option<String>,
    created_by: PersonId,
    created_at: DateTime<Utc>,
    responses: Vec<SecondOpinionResponse>,
}

/// Parameter object for reconstructing a persisted second opinion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSecondOpinionData {
    /// Persisted identifier.
    pub id: SecondOpinionId,
    /// Owning request.
    pub request_id: RequestId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: Option<String>,
    /// Creator.
    pub created_by: PersonId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Responses in assignment order.
    pub responses: Vec<SecondOpinionResponse>,
}

impl SecondOpinion {
    /// Creates a second opinion with one open response per distinct
    /// assignee.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoAssignees`] when `assignees` is empty
    /// and [`ValidationError::Domain`] when the title is blank.
    pub fn new(
        request_id: RequestId,
        title: &str,
        description: Option<String>,
        created_by: PersonId,
        assignees: &[PersonId],
        clock: &impl Clock,
    ) -> Result<Self, ValidationError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(RequestDomainError::EmptyTitle("second opinion").into());
        }
        if assignees.is_empty() {
            return Err(ValidationError::NoAssignees);
        }

        let id = SecondOpinionId::new();
        let now = clock.utc();
        let mut responses: Vec<SecondOpinionResponse> = Vec::with_capacity(assignees.len());
        for assignee in assignees {
            if responses.iter().all(|response| response.assigned_to != *assignee) {
                responses.push(SecondOpinionResponse::open(id, *assignee, now));
            }
        }

        Ok(Self {
            id,
            request_id,
            title: trimmed.to_owned(),
            description,
            created_by,
            created_at: now,
            responses,
        })
    }

    /// Reconstructs a second opinion from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSecondOpinionData) -> Self {
        Self {
            id: data.id,
            request_id: data.request_id,
            title: data.title,
            description: data.description,
            created_by: data.created_by,
            created_at: data.created_at,
            responses: data.responses,
        }
    }

    /// Returns the second-opinion identifier.
    #[must_use]
    pub const fn id(&self) -> SecondOpinionId {
        self.id
    }

    /// Returns the owning request.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creator.
    #[must_use]
    pub const fn created_by(&self) -> PersonId {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the responses in assignment order.
    #[must_use]
    pub fn responses(&self) -> &[SecondOpinionResponse] {
        &self.responses
    }

    /// Looks up a response.
    #[must_use]
    pub fn response(&self, id: ResponseId) -> Option<&SecondOpinionResponse> {
        self.responses.iter().find(|response| response.id == id)
    }

    /// Looks up a response for mutation.
    pub fn response_mut(&mut self, id: ResponseId) -> Option<&mut SecondOpinionResponse> {
        self.responses.iter_mut().find(|response| response.id == id)
    }

    /// Removes a response, returning it when present.
    pub fn remove_response(&mut self, id: ResponseId) -> Option<SecondOpinionResponse> {
        let index = self.responses.iter().position(|response| response.id == id)?;
        Some(self.responses.remove(index))
    }

    /// Closes every response that was not published. Returns how many
    /// responses changed.
    pub(crate) fn close_unpublished(&mut self) -> usize {
        self.responses
            .iter_mut()
            .map(SecondOpinionResponse::close)
            .filter(|changed| *changed)
            .count()
    }
}
