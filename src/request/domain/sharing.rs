//! Person-level visibility grants for a request.

use super::{ParseEnumError, PersonId, RequestId, ShareId, ValidationError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a sharing grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSource {
    /// Shared explicitly by a user.
    User,
    /// Shared by an automated process.
    System,
}

impl ShareSource {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ShareSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ShareSource {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            _ => Err(ParseEnumError::new("share source", value)),
        }
    }
}

/// Parameter object for granting a share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareParams {
    /// Person receiving visibility.
    pub shared_with: PersonId,
    /// Visibility scope, e.g. `basic_read`.
    pub scope: String,
    /// Origin of the grant.
    pub source: ShareSource,
    /// Optional justification.
    pub reason: Option<String>,
}

/// Grant of visibility on one request to one person.
///
/// Grants are never deleted; revocation is recorded for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedRequest {
    id: ShareId,
    request_id: RequestId,
    shared_with: PersonId,
    shared_by: PersonId,
    scope: String,
    source: ShareSource,
    reason: Option<String>,
    granted_at: DateTime<Utc>,
    is_revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedShareData {
    /// Persisted identifier.
    pub id: ShareId,
    /// Shared request.
    pub request_id: RequestId,
    /// Person receiving visibility.
    pub shared_with: PersonId,
    /// Person who granted visibility.
    pub shared_by: PersonId,
    /// Visibility scope.
    pub scope: String,
    /// Origin of the grant.
    pub source: ShareSource,
    /// Justification.
    pub reason: Option<String>,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
    /// Revocation flag.
    pub is_revoked: bool,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SharedRequest {
    /// Creates an active grant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySharingField`] when the scope is
    /// blank.
    pub fn new(
        request_id: RequestId,
        params: ShareParams,
        shared_by: PersonId,
        clock: &impl Clock,
    ) -> Result<Self, ValidationError> {
        let scope = params.scope.trim();
        if scope.is_empty() {
            return Err(ValidationError::EmptySharingField("scope"));
        }
        Ok(Self {
            id: ShareId::new(),
            request_id,
            shared_with: params.shared_with,
            shared_by,
            scope: scope.to_ascii_lowercase(),
            source: params.source,
            reason: params
                .reason
                .map(|reason| reason.trim().to_owned())
                .filter(|reason| !reason.is_empty()),
            granted_at: clock.utc(),
            is_revoked: false,
            revoked_at: None,
        })
    }

    /// Reconstructs a grant from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedShareData) -> Self {
        Self {
            id: data.id,
            request_id: data.request_id,
            shared_with: data.shared_with,
            shared_by: data.shared_by,
            scope: data.scope,
            source: data.source,
            reason: data.reason,
            granted_at: data.granted_at,
            is_revoked: data.is_revoked,
            revoked_at: data.revoked_at,
        }
    }

    /// Returns the grant identifier.
    #[must_use]
    pub const fn id(&self) -> ShareId {
        self.id
    }

    /// Returns the shared request.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the person receiving visibility.
    #[must_use]
    pub const fn shared_with(&self) -> PersonId {
        self.shared_with
    }

    /// Returns the person who granted visibility.
    #[must_use]
    pub const fn shared_by(&self) -> PersonId {
        self.shared_by
    }

    /// Returns the normalised scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the grant origin.
    #[must_use]
    pub const fn source(&self) -> ShareSource {
        self.source
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the grant timestamp.
    #[must_use]
    pub const fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Returns whether the grant was revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.is_revoked
    }

    /// Returns when the grant was revoked.
    #[must_use]
    pub const fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns whether this active grant covers the same request, person and
    /// scope.
    #[must_use]
    pub fn duplicates(&self, request_id: RequestId, shared_with: PersonId, scope: &str) -> bool {
        !self.is_revoked
            && self.request_id == request_id
            && self.shared_with == shared_with
            && self.scope.eq_ignore_ascii_case(scope.trim())
    }

    /// Revokes the grant. Returns `false` when it was already revoked.
    pub fn revoke(&mut self, clock: &impl Clock) -> bool {
        if self.is_revoked {
            return false;
        }
        self.is_revoked = true;
        self.revoked_at = Some(clock.utc());
        true
    }
}
