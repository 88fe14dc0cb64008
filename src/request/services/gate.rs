//! Blocking-action evaluation for lifecycle transitions.

use super::LifecycleResult;
use crate::request::{
    domain::{Party, RequestId},
    ports::RequestStore,
};
use std::sync::Arc;

/// Evaluates whether unresolved required actions block a transition.
///
/// Always reads the latest action state; nothing is cached.
pub struct ActionGate<S>
where
    S: RequestStore,
{
    store: Arc<S>,
}

impl<S> Clone for ActionGate<S>
where
    S: RequestStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ActionGate<S>
where
    S: RequestStore,
{
    /// Creates a gate reading from `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns whether any required, unresolved action names `party` (or
    /// both parties) as responsible.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::Store`] when actions cannot be read.
    pub async fn has_blocking_actions(
        &self,
        request_id: RequestId,
        party: Party,
    ) -> LifecycleResult<bool> {
        Ok(self.blocking_actions(request_id, party).await? > 0)
    }

    /// Counts the actions blocking `party`.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::Store`] when actions cannot be read.
    pub async fn blocking_actions(
        &self,
        request_id: RequestId,
        party: Party,
    ) -> LifecycleResult<usize> {
        let actions = self.store.list_actions(request_id).await?;
        Ok(actions.iter().filter(|action| action.blocks(party)).count())
    }
}
