//! Provisioning status embedded in a request.

use super::{OrgPositionId, ParseEnumError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Outcome of pushing a request into the org chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    /// Nothing has been pushed yet.
    #[default]
    NotProvisioned,
    /// A push has been claimed and is awaiting the org chart.
    InProgress,
    /// The org chart accepted the allocation.
    Provisioned,
    /// The last push failed.
    Error,
    /// The outcome could not be determined.
    Unknown,
}

impl ProvisioningState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotProvisioned => "not_provisioned",
            Self::InProgress => "in_progress",
            Self::Provisioned => "provisioned",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProvisioningState {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, ParseEnumError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_provisioned" | "notprovisioned" => Ok(Self::NotProvisioned),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "provisioned" => Ok(Self::Provisioned),
            "error" => Ok(ProvisioningState::Error),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseEnumError::new("provisioning state", value)),
        }
    }
}

/// Provisioning status of a request. Only the provisioning coordinator sets
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningStatus {
    state: ProvisioningState,
    org_position_id: Option<OrgPositionId>,
    provisioned_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    error_payload: Option<Value>,
}

impl ProvisioningStatus {
    /// Builds the status for a successful push.
    #[must_use]
    pub const fn provisioned(org_position_id: OrgPositionId, at: DateTime<Utc>) -> Self {
        Self {
            state: ProvisioningState::Provisioned,
            org_position_id: Some(org_position_id),
            provisioned_at: Some(at),
            error_message: None,
            error_payload: None,
        }
    }

    /// Builds the status recorded while a push is in flight.
    ///
    /// The position and timestamp of an earlier successful push are kept.
    #[must_use]
    pub const fn in_progress(previous: &Self) -> Self {
        Self {
            state: ProvisioningState::InProgress,
            org_position_id: previous.org_position_id,
            provisioned_at: previous.provisioned_at,
            error_message: None,
            error_payload: None,
        }
    }

    /// Builds the status for a failed push.
    ///
    /// The position and timestamp of an earlier successful push are kept.
    #[must_use]
    pub fn failed(previous: &Self, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            state: ProvisioningState::Error,
            org_position_id: previous.org_position_id,
            provisioned_at: previous.provisioned_at,
            error_message: Some(message.into()),
            error_payload: payload,
        }
    }

    /// Builds the status for a push whose outcome is unknown because the
    /// org chart could not be reached.
    #[must_use]
    pub fn unreachable(previous: &Self, message: impl Into<String>) -> Self {
        Self {
            state: ProvisioningState::Unknown,
            org_position_id: previous.org_position_id,
            provisioned_at: previous.provisioned_at,
            error_message: Some(message.into()),
            error_payload: None,
        }
    }

    /// Returns the provisioning state.
    #[must_use]
    pub const fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Returns whether the request has been provisioned.
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        matches!(self.state, ProvisioningState::Provisioned)
    }

    /// Returns whether another push is in flight.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(self.state, ProvisioningState::InProgress)
    }

    /// Returns whether a non-forced push must be skipped.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.is_provisioned() || self.is_in_progress()
    }

    /// Returns the provisioned org-chart position.
    #[must_use]
    pub const fn org_position_id(&self) -> Option<OrgPositionId> {
        self.org_position_id
    }

    /// Returns when the request was last provisioned.
    #[must_use]
    pub const fn provisioned_at(&self) -> Option<DateTime<Utc>> {
        self.provisioned_at
    }

    /// Returns the last error message.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the raw error payload reported by the org chart.
    #[must_use]
    pub const fn error_payload(&self) -> Option<&Value> {
        self.error_payload.as_ref()
    }
}
