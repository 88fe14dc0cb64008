//! Identifier and validated scalar types for the request domain.

use super::RequestDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a resource-allocation request.
    RequestId
);

uuid_identifier!(
    /// Unique identifier for a workflow instance.
    WorkflowId
);

uuid_identifier!(
    /// Unique identifier for an action (task) attached to a request.
    ActionId
);

uuid_identifier!(
    /// Unique identifier for a second-opinion review.
    SecondOpinionId
);

uuid_identifier!(
    /// Unique identifier for a single reviewer response to a second opinion.
    ResponseId
);

uuid_identifier!(
    /// Unique identifier for a sharing grant.
    ShareId
);

uuid_identifier!(
    /// Directory identity of a person (requester, reviewer, candidate).
    PersonId
);

uuid_identifier!(
    /// Groups requests created together in one batch submission.
    CorrelationId
);

uuid_identifier!(
    /// Identifier of a position in the external org chart.
    OrgPositionId
);

/// Monotonic, human-facing request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestNumber(u64);

impl RequestNumber {
    /// Largest number representable in the `PostgreSQL` `BIGINT` column.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated request number.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::InvalidRequestNumber`] when the value is
    /// zero or exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, RequestDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(RequestDomainError::InvalidRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a workflow step.
///
/// Step identifiers double as request state names, so they are normalised to
/// lowercase and compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

impl StepId {
    /// Reserved request state recorded once a workflow has completed.
    pub const COMPLETED: &'static str = "completed";

    /// Creates a validated step identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::EmptyStepId`] for blank input and
    /// [`RequestDomainError::InvalidStepId`] when the value contains
    /// whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, RequestDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestDomainError::EmptyStepId);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(RequestDomainError::InvalidStepId(raw));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Wraps a known-good identifier without validation.
    pub(crate) fn trusted(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }

    /// Returns the reserved completion state.
    #[must_use]
    pub fn completed() -> Self {
        Self(Self::COMPLETED.to_owned())
    }

    /// Returns whether this is the reserved completion state.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.0 == Self::COMPLETED
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StepId {
    type Error = RequestDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepId> for String {
    fn from(value: StepId) -> Self {
        value.0
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
