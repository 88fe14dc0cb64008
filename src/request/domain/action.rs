//! Actions (tasks) attached to a request.

use super::{ActionId, Actor, Party, PersonId, RequestDomainError, RequestId, Responsible};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form properties recorded on an action.
pub type ActionProperties = BTreeMap<String, Value>;

/// Parameter object for creating an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionParams {
    /// Short title.
    pub title: String,
    /// Optional body text.
    pub body: Option<String>,
    /// Action type, e.g. `request`.
    pub action_type: String,
    /// Optional action sub type.
    pub sub_type: Option<String>,
    /// Party that must resolve the action.
    pub responsible: Responsible,
    /// Whether an unresolved action blocks lifecycle transitions.
    pub is_required: bool,
    /// Free-form properties.
    pub properties: ActionProperties,
}

/// Task attached to a request, optionally blocking its workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    id: ActionId,
    request_id: RequestId,
    title: String,
    body: Option<String>,
    action_type: String,
    sub_type: Option<String>,
    source: Party,
    responsible: Responsible,
    is_required: bool,
    is_resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<PersonId>,
    sent_by: PersonId,
    properties: ActionProperties,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted action.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedActionData {
    /// Persisted identifier.
    pub id: ActionId,
    /// Owning request.
    pub request_id: RequestId,
    /// Persisted title.
    pub title: String,
    /// Persisted body.
    pub body: Option<String>,
    /// Persisted type.
    pub action_type: String,
    /// Persisted sub type.
    pub sub_type: Option<String>,
    /// Party that created the action.
    pub source: Party,
    /// Party that must resolve the action.
    pub responsible: Responsible,
    /// Persisted required flag.
    pub is_required: bool,
    /// Persisted resolution flag.
    pub is_resolved: bool,
    /// Persisted resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Persisted resolver.
    pub resolved_by: Option<PersonId>,
    /// Persisted sender.
    pub sent_by: PersonId,
    /// Persisted properties.
    pub properties: ActionProperties,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Action {
    /// Creates an unresolved action sent by `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        request_id: RequestId,
        params: ActionParams,
        sender: &Actor,
        clock: &impl Clock,
    ) -> Result<Self, RequestDomainError> {
        let title = params.title.trim();
        if title.is_empty() {
            return Err(RequestDomainError::EmptyTitle("action"));
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: ActionId::new(),
            request_id,
            title: title.to_owned(),
            body: params.body,
            action_type: params.action_type,
            sub_type: params.sub_type,
            source: sender.party(),
            responsible: params.responsible,
            is_required: params.is_required,
            is_resolved: false,
            resolved_at: None,
            resolved_by: None,
            sent_by: sender.person_id(),
            properties: params.properties,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs an action from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedActionData) -> Self {
        Self {
            id: data.id,
            request_id: data.request_id,
            title: data.title,
            body: data.body,
            action_type: data.action_type,
            sub_type: data.sub_type,
            source: data.source,
            responsible: data.responsible,
            is_required: data.is_required,
            is_resolved: data.is_resolved,
            resolved_at: data.resolved_at,
            resolved_by: data.resolved_by,
            sent_by: data.sent_by,
            properties: data.properties,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the action identifier.
    #[must_use]
    pub const fn id(&self) -> ActionId {
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

    /// Returns the body text.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the action type.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Returns the action sub type.
    #[must_use]
    pub fn sub_type(&self) -> Option<&str> {
        self.sub_type.as_deref()
    }

    /// Returns the party that created the action.
    #[must_use]
    pub const fn source(&self) -> Party {
        self.source
    }

    /// Returns the party that must resolve the action.
    #[must_use]
    pub const fn responsible(&self) -> Responsible {
        self.responsible
    }

    /// Returns whether the action is required.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.is_required
    }

    /// Returns whether the action is resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    /// Returns when the action was resolved.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Returns who resolved the action.
    #[must_use]
    pub const fn resolved_by(&self) -> Option<PersonId> {
        self.resolved_by
    }

    /// Returns who sent the action.
    #[must_use]
    pub const fn sent_by(&self) -> PersonId {
        self.sent_by
    }

    /// Returns the free-form properties.
    #[must_use]
    pub const fn properties(&self) -> &ActionProperties {
        &self.properties
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

    /// Returns whether this action blocks a transition attempted by `party`.
    #[must_use]
    pub const fn blocks(&self, party: Party) -> bool {
        self.is_required && !self.is_resolved && self.responsible.includes(party)
    }

    /// Resolves or reopens the action. Returns `false` when the action was
    /// already in the requested state.
    pub fn set_resolved(&mut self, resolved: bool, actor: &Actor, clock: &impl Clock) -> bool {
        if self.is_resolved == resolved {
            return false;
        }
        let timestamp = clock.utc();
        self.is_resolved = resolved;
        if resolved {
            self.resolved_at = Some(timestamp);
            self.resolved_by = Some(actor.person_id());
        } else {
            self.resolved_at = None;
            self.resolved_by = None;
        }
        self.updated_at = timestamp;
        true
    }
}
