//! In-memory person directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::request::{
    domain::PersonId,
    ports::{PersonProfile, ProfileError, ProfileResolver, ProfileResult},
};

/// Thread-safe in-memory profile resolver.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileResolver {
    profiles: Arc<RwLock<HashMap<PersonId, PersonProfile>>>,
}

impl InMemoryProfileResolver {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a person with a display name.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Lookup`] when the lock is poisoned.
    pub fn add_person(&self, person_id: PersonId, display_name: &str) -> ProfileResult<()> {
        self.profiles
            .write()
            .map_err(|err| ProfileError::lookup(std::io::Error::other(err.to_string())))?
            .insert(
                person_id,
                PersonProfile {
                    person_id,
                    display_name: display_name.to_owned(),
                    mail: None,
                    department: None,
                },
            );
        Ok(())
    }
}

#[async_trait]
impl ProfileResolver for InMemoryProfileResolver {
    async fn resolve_person(&self, id: PersonId) -> ProfileResult<Option<PersonProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|err| ProfileError::lookup(std::io::Error::other(err.to_string())))?;
        Ok(profiles.get(&id).cloned())
    }
}
