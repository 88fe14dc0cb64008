//! Identity and role of the caller driving a lifecycle command.

use super::{ParseEnumError, PersonId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two parties collaborating on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// Line management owning the person being allocated.
    ResourceOwner,
    /// Project side owning the position being filled.
    TaskOwner,
}

impl Party {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceOwner => "resource_owner",
            Self::TaskOwner => "task_owner",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Party {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resource_owner" | "resourceowner" => Ok(Self::ResourceOwner),
            "task_owner" | "taskowner" => Ok(Self::TaskOwner),
            _ => Err(ParseEnumError::new("party", value)),
        }
    }
}

/// Which party is responsible for resolving an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Responsible {
    /// Only the resource owner.
    ResourceOwner,
    /// Only the task owner.
    TaskOwner,
    /// Either party.
    Both,
}

impl Responsible {
    /// Returns whether `party` is among the responsible parties.
    #[must_use]
    pub const fn includes(self, party: Party) -> bool {
        matches!(
            (self, party),
            (Self::Both, _)
                | (Self::ResourceOwner, Party::ResourceOwner)
                | (Self::TaskOwner, Party::TaskOwner)
        )
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceOwner => "resource_owner",
            Self::TaskOwner => "task_owner",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Responsible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Responsible {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resource_owner" | "resourceowner" => Ok(Self::ResourceOwner),
            "task_owner" | "taskowner" => Ok(Self::TaskOwner),
            "both" => Ok(Self::Both),
            _ => Err(ParseEnumError::new("responsible party", value)),
        }
    }
}

/// Authenticated caller of a lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    person_id: PersonId,
    party: Party,
}

impl Actor {
    /// Creates an actor acting on behalf of `party`.
    #[must_use]
    pub const fn new(person_id: PersonId, party: Party) -> Self {
        Self { person_id, party }
    }

    /// Creates a resource-owner actor.
    #[must_use]
    pub const fn resource_owner(person_id: PersonId) -> Self {
        Self::new(person_id, Party::ResourceOwner)
    }

    /// Creates a task-owner actor.
    #[must_use]
    pub const fn task_owner(person_id: PersonId) -> Self {
        Self::new(person_id, Party::TaskOwner)
    }

    /// Returns the acting person.
    #[must_use]
    pub const fn person_id(&self) -> PersonId {
        self.person_id
    }

    /// Returns the party the actor represents.
    #[must_use]
    pub const fn party(&self) -> Party {
        self.party
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.person_id, self.party)
    }
}
