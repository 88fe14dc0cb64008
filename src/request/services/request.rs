//! Request submission and deletion.

use super::{
    LifecycleResult, TransactionCoordinator,
    lookup::{ensure_person, load_request},
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{
        CorrelationId, InvalidWorkflowError, PersonId, Request, RequestEvent, RequestId,
        RequestParams,
    },
    ports::{NotificationSink, ProfileResolver, RequestStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates draft requests and deletes requests that are no longer in
/// flight.
pub struct RequestService<S, N, P, C>
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

impl<S, N, P, C> RequestService<S, N, P, C>
where
    S: RequestStore,
    N: NotificationSink,
    P: ProfileResolver,
    C: Clock + Send + Sync,
{
    /// Creates a service with the default configuration.
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

    /// Submits a draft request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::request::domain::ValidationError::UnknownPerson`]
    /// for unresolvable candidates and [`super::LifecycleError::Store`] when
    /// no number can be allocated.
    #[instrument(skip_all, fields(request_type = %params.request_type, created_by = %created_by))]
    pub async fn create_request(
        &self,
        params: RequestParams,
        created_by: PersonId,
    ) -> LifecycleResult<Request> {
        let draft = self.draft(params, created_by).await?;
        let request = self
            .transactions
            .run_atomically(
                move |tx| {
                    tx.insert_request(&draft);
                    Ok(draft)
                },
                |created, events| {
                    events.publish(created_event(created));
                    Ok(())
                },
            )
            .await?;
        info!(request_id = %request.id(), number = %request.number(), "request created");
        Ok(request)
    }

    /// Submits several draft requests sharing one new correlation
    /// identifier, all in one transaction.
    ///
    /// Any correlation identifier set on the individual parameters is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns the first error any request would fail with; nothing is
    /// created in that case.
    #[instrument(skip_all, fields(count = batch.len(), created_by = %created_by))]
    pub async fn create_batch(
        &self,
        batch: Vec<RequestParams>,
        created_by: PersonId,
    ) -> LifecycleResult<Vec<Request>> {
        let correlation_id = CorrelationId::new();
        let mut drafts = Vec::with_capacity(batch.len());
        for params in batch {
            let correlated = RequestParams {
                correlation_id: Some(correlation_id),
                ..params
            };
            drafts.push(self.draft(correlated, created_by).await?);
        }

        let created = self
            .transactions
            .run_atomically(
                move |tx| {
                    for draft in &drafts {
                        tx.insert_request(draft);
                    }
                    Ok(drafts)
                },
                |requests, events| {
                    for request in requests {
                        events.publish(created_event(request));
                    }
                    Ok(())
                },
            )
            .await?;
        info!(%correlation_id, count = created.len(), "request batch created");
        Ok(created)
    }

    async fn draft(&self, params: RequestParams, created_by: PersonId) -> LifecycleResult<Request> {
        for candidate in &params.candidates {
            ensure_person(&*self.profiles, *candidate).await?;
        }
        let number = self.store.next_request_number().await?;
        Ok(Request::new(params, number, created_by, &*self.clock))
    }

    /// Deletes a request and every record it owns.
    ///
    /// Sharing grants are kept for audit: active grants are revoked in the
    /// same transaction instead of being removed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::ActiveWorkflow`] while the request's
    /// workflow is still running and [`super::LifecycleError::RequestNotFound`]
    /// for unknown requests.
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub async fn delete_request(&self, request_id: RequestId) -> LifecycleResult<()> {
        retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.delete_once(request_id)
        })
        .await?;
        info!("request deleted");
        Ok(())
    }

    async fn delete_once(&self, request_id: RequestId) -> LifecycleResult<()> {
        let mut request = load_request(&*self.store, request_id).await?;
        let workflow = self.store.find_workflow(request_id).await?;
        if workflow.is_some_and(|found| found.is_running()) {
            return Err(InvalidWorkflowError::ActiveWorkflow(request_id).into());
        }
        let mut shares = self.store.list_shares(request_id).await?;
        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    let mut revoked = Vec::new();
                    for share in &mut shares {
                        if share.revoke(clock) {
                            tx.put_share(share);
                            revoked.push(share.id());
                        }
                    }
                    tx.update_request(&mut request);
                    tx.delete_request(request_id);
                    Ok(revoked)
                },
                |revoked, events| {
                    for share_id in revoked {
                        events.publish(RequestEvent::ShareRevoked {
                            request_id,
                            share_id: *share_id,
                        });
                    }
                    events.publish(RequestEvent::RequestDeleted { request_id });
                    Ok(())
                },
            )
            .await?;
        Ok(())
    }
}

const fn created_event(request: &Request) -> RequestEvent {
    RequestEvent::RequestCreated {
        request_id: request.id(),
        number: request.number(),
    }
}
