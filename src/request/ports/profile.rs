//! Person profile lookup port.

use crate::request::domain::PersonId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for profile lookups.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Basic directory profile of a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonProfile {
    /// Directory identity.
    pub person_id: PersonId,
    /// Display name.
    pub display_name: String,
    /// Mail address.
    pub mail: Option<String>,
    /// Home department.
    pub department: Option<String>,
}

/// Directory lookup for persons.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Resolves a person, returning `None` when the directory has no entry.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] when the directory cannot be queried.
    async fn resolve_person(&self, id: PersonId) -> ProfileResult<Option<PersonProfile>>;
}

/// Errors returned by profile resolvers.
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    /// The directory could not be queried.
    #[error("profile lookup failed: {0}")]
    Lookup(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProfileError {
    /// Wraps a lookup failure.
    pub fn lookup(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lookup(Arc::new(err))
    }
}
