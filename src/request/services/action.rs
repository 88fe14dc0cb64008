//! Action (task) commands.
//!
//! Action writes bump the owning request's version, so a gate check made by
//! a concurrent transition is re-evaluated when either side loses the race.

use super::{
    LifecycleError, LifecycleResult, TransactionCoordinator, lookup::load_request,
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{Action, ActionId, ActionParams, Actor, RequestEvent, RequestId, ValidationError},
    ports::{NotificationSink, RequestStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates and resolves actions attached to requests.
pub struct ActionManager<S, N, C>
where
    S: RequestStore,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    transactions: TransactionCoordinator<S, N>,
    config: LifecycleConfig,
    clock: Arc<C>,
}

impl<S, N, C> ActionManager<S, N, C>
where
    S: RequestStore,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Creates a manager with the default configuration.
    #[must_use]
    pub fn new(store: Arc<S>, sink: Arc<N>, clock: Arc<C>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store), sink),
            store,
            config: LifecycleConfig::default(),
            clock,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a new unresolved action to a request.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::RequestNotFound`] for unknown requests and
    /// a validation error for a blank title.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn create_action(
        &self,
        request_id: RequestId,
        actor: &Actor,
        params: &ActionParams,
    ) -> LifecycleResult<Action> {
        let action = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.create_once(request_id, actor, params)
        })
        .await?;
        info!(
            action_id = %action.id(),
            required = action.is_required(),
            responsible = %action.responsible(),
            "action created"
        );
        Ok(action)
    }

    async fn create_once(
        &self,
        request_id: RequestId,
        actor: &Actor,
        params: &ActionParams,
    ) -> LifecycleResult<Action> {
        let mut request = load_request(&*self.store, request_id).await?;
        let action = Action::new(request_id, params.clone(), actor, &*self.clock)?;
        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_action(&action);
                    Ok(action)
                },
                |created, events| {
                    events.publish(RequestEvent::ActionCreated {
                        request_id,
                        action_id: created.id(),
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Resolves or reopens an action.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`] for unknown actions and
    /// [`ValidationError::ActionUnchanged`] when the action already has the
    /// requested resolution.
    #[instrument(skip_all, fields(action_id = %action_id, resolved = resolved, actor = %actor))]
    pub async fn set_resolved(
        &self,
        action_id: ActionId,
        resolved: bool,
        actor: &Actor,
    ) -> LifecycleResult<Action> {
        let request_id = self.get_action(action_id).await?.request_id();
        let action = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.set_resolved_once(action_id, resolved, actor)
        })
        .await?;
        info!(%request_id, "action resolution changed");
        Ok(action)
    }

    async fn set_resolved_once(
        &self,
        action_id: ActionId,
        resolved: bool,
        actor: &Actor,
    ) -> LifecycleResult<Action> {
        let mut action = self.get_action(action_id).await?;
        if !action.set_resolved(resolved, actor, &*self.clock) {
            return Err(ValidationError::ActionUnchanged(action_id).into());
        }
        let request_id = action.request_id();
        let mut request = load_request(&*self.store, request_id).await?;
        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_action(&action);
                    Ok(action)
                },
                |changed, events| {
                    events.publish(RequestEvent::ActionResolutionChanged {
                        request_id,
                        action_id,
                        is_resolved: changed.is_resolved(),
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Fetches an action.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`] for unknown actions.
    pub async fn get_action(&self, action_id: ActionId) -> LifecycleResult<Action> {
        self.store
            .find_action(action_id)
            .await?
            .ok_or(LifecycleError::TaskNotFound(action_id))
    }
}
