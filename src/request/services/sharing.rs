//! Person-level sharing of requests.

use super::{
    LifecycleError, LifecycleResult, TransactionCoordinator,
    lookup::{ensure_person, load_request},
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{Actor, PersonId, RequestEvent, RequestId, ShareId, ShareParams, SharedRequest},
    ports::{NotificationSink, ProfileResolver, RequestStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Grants and revokes visibility of requests to individual people.
pub struct SharingManager<S, N, P, C>
where
    S: RequestStore,
    N: NotificationSink,
    P: ProfileResolver,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    transactions: TransactionCoordinator<S, N>,
    profiles: Arc<P>,
    config: LifecycleConfig,
    clock: Arc<C>,
}

impl<S, N, P, C> SharingManager<S, N, P, C>
where
    S: RequestStore,
    N: NotificationSink,
    P: ProfileResolver,
    C: Clock + Send + Sync,
{
    /// Creates a manager with the default configuration.
    #[must_use]
    pub fn new(store: Arc<S>, sink: Arc<N>, profiles: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store), sink),
            store,
            profiles,
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

    /// Shares a request with one person.
    ///
    /// Idempotent by request, person and scope: returns `false` without
    /// writing when an active grant already covers them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::request::domain::ValidationError::UnknownPerson`]
    /// when the person does not resolve, a validation error for a blank
    /// scope and [`LifecycleError::RequestNotFound`] for unknown requests.
    #[instrument(
        skip_all,
        fields(request_id = %request_id, actor = %actor, shared_with = %params.shared_with)
    )]
    pub async fn share(
        &self,
        request_id: RequestId,
        actor: &Actor,
        params: &ShareParams,
    ) -> LifecycleResult<bool> {
        ensure_person(&*self.profiles, params.shared_with).await?;
        let created = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.share_once(request_id, actor, params)
        })
        .await?;
        if created {
            info!("request shared");
        } else {
            debug!("request already shared with this scope");
        }
        Ok(created)
    }

    async fn share_once(
        &self,
        request_id: RequestId,
        actor: &Actor,
        params: &ShareParams,
    ) -> LifecycleResult<bool> {
        let mut request = load_request(&*self.store, request_id).await?;
        let existing = self.store.list_shares(request_id).await?;
        if existing
            .iter()
            .any(|share| share.duplicates(request_id, params.shared_with, &params.scope))
        {
            return Ok(false);
        }
        let share = SharedRequest::new(request_id, params.clone(), actor.person_id(), &*self.clock)?;

        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_share(&share);
                    Ok(share)
                },
                |granted, events| {
                    events.publish(RequestEvent::RequestShared {
                        request_id,
                        share_id: granted.id(),
                        shared_with: granted.shared_with(),
                    });
                    Ok(())
                },
            )
            .await?;
        Ok(true)
    }

    /// Revokes a grant. The grant is kept for audit.
    ///
    /// Revoking an already revoked grant returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ShareNotFound`] for unknown grants.
    #[instrument(skip_all, fields(share_id = %share_id))]
    pub async fn revoke(&self, share_id: ShareId) -> LifecycleResult<SharedRequest> {
        let request_id = self.find_grant(share_id).await?.request_id();
        let share = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.revoke_once(share_id)
        })
        .await?;
        info!(%request_id, "share revoked");
        Ok(share)
    }

    async fn revoke_once(&self, share_id: ShareId) -> LifecycleResult<SharedRequest> {
        let mut share = self.find_grant(share_id).await?;
        if !share.revoke(&*self.clock) {
            return Ok(share);
        }
        let request_id = share.request_id();
        let mut request = load_request(&*self.store, request_id).await?;

        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_share(&share);
                    Ok(share)
                },
                |_, events| {
                    events.publish(RequestEvent::ShareRevoked {
                        request_id,
                        share_id,
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Lists every grant of a request, revoked ones included.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::RequestNotFound`] for unknown requests.
    pub async fn list_shares(&self, request_id: RequestId) -> LifecycleResult<Vec<SharedRequest>> {
        load_request(&*self.store, request_id).await?;
        Ok(self.store.list_shares(request_id).await?)
    }

    /// Lists the active grants made to a person.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when grants cannot be read.
    pub async fn shared_with(&self, person_id: PersonId) -> LifecycleResult<Vec<SharedRequest>> {
        let shares = self.store.list_shares_for_person(person_id).await?;
        Ok(shares.into_iter().filter(|share| !share.is_revoked()).collect())
    }

    async fn find_grant(&self, id: ShareId) -> LifecycleResult<SharedRequest> {
        self.store
            .find_share(id)
            .await?
            .ok_or(LifecycleError::ShareNotFound(id))
    }
}
