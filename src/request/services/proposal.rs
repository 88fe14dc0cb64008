//! Proposal sub-flow: proposed person, candidates and change parameters.

use super::{
    LifecycleResult, TransactionCoordinator,
    lookup::{ensure_person, load_request, resolve_template},
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{
        PersonId, ProposalParameters, Request, RequestEvent, RequestId, ValidationError,
        WorkflowTemplateCatalog, can_unset_proposed_person,
    },
    ports::{NotificationSink, ProfileResolver, RequestStore},
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Governs the proposal embedded in each request.
pub struct ProposalManager<S, N, P, C>
where
    S: RequestStore,
    N: NotificationSink,
    P: ProfileResolver,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    transactions: TransactionCoordinator<S, N>,
    profiles: Arc<P>,
    catalog: Arc<WorkflowTemplateCatalog>,
    config: LifecycleConfig,
    clock: Arc<C>,
}

impl<S, N, P, C> ProposalManager<S, N, P, C>
where
    S: RequestStore,
    N: NotificationSink,
    P: ProfileResolver,
    C: Clock + Send + Sync,
{
    /// Creates a manager using the built-in template catalog.
    #[must_use]
    pub fn new(store: Arc<S>, sink: Arc<N>, profiles: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store), sink),
            store,
            profiles,
            catalog: Arc::new(WorkflowTemplateCatalog::builtin()),
            config: LifecycleConfig::default(),
            clock,
        }
    }

    /// Replaces the template catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<WorkflowTemplateCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets or clears the proposed person.
    ///
    /// The first person ever proposed is kept as the initial proposed
    /// person. `parameters`, when given, replace the change-request scoping.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownPerson`] when the person does not
    /// resolve, [`ValidationError::CannotUnsetProposedPerson`] when clearing
    /// outside the template's early states, and
    /// [`ValidationError::RequestCompleted`] for completed requests.
    #[instrument(skip_all, fields(request_id = %request_id, person_id = ?person_id))]
    pub async fn propose(
        &self,
        request_id: RequestId,
        person_id: Option<PersonId>,
        parameters: Option<ProposalParameters>,
    ) -> LifecycleResult<Request> {
        if let Some(person) = person_id {
            ensure_person(&*self.profiles, person).await?;
        }
        let catalog = &*self.catalog;
        let request = self
            .update(request_id, move |request, clock| {
                if person_id.is_none() && !is_unsettable(catalog, request) {
                    return Err(ValidationError::CannotUnsetProposedPerson(request.id()));
                }
                request
                    .proposal_mut(clock)
                    .propose(person_id, parameters.clone(), clock.utc());
                Ok(Some(RequestEvent::PersonProposed {
                    request_id: request.id(),
                    person_id,
                }))
            })
            .await?;
        info!("proposed person updated");
        Ok(request)
    }

    /// Replaces the candidate list. Duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownPerson`] for unresolvable
    /// candidates and [`ValidationError::RequestCompleted`] for completed
    /// requests.
    #[instrument(skip_all, fields(request_id = %request_id, count = candidates.len()))]
    pub async fn set_candidates(
        &self,
        request_id: RequestId,
        candidates: Vec<PersonId>,
    ) -> LifecycleResult<Request> {
        for candidate in &candidates {
            ensure_person(&*self.profiles, *candidate).await?;
        }
        self.update(request_id, move |request, clock| {
            request
                .proposal_mut(clock)
                .replace_candidates(candidates.clone());
            Ok(None)
        })
        .await
    }

    /// Replaces the opaque proposed-changes bag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RequestCompleted`] for completed requests.
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub async fn set_proposed_changes(
        &self,
        request_id: RequestId,
        changes: Option<Value>,
    ) -> LifecycleResult<Request> {
        self.update(request_id, move |request, clock| {
            request
                .proposal_mut(clock)
                .set_proposed_changes(changes.clone());
            Ok(None)
        })
        .await
    }

    /// Marks the proposed person as notified.
    ///
    /// Returns `false` without writing when nobody is proposed.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] for unknown
    /// requests.
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub async fn mark_proposed_person_notified(
        &self,
        request_id: RequestId,
    ) -> LifecycleResult<bool> {
        let current = load_request(&*self.store, request_id).await?;
        match current.proposal().proposed_person() {
            None => return Ok(false),
            Some(proposed) if proposed.was_notified => return Ok(true),
            Some(_) => {}
        }
        self.update(request_id, |request, clock| {
            request.proposal_mut(clock).mark_notified();
            Ok(None)
        })
        .await?;
        Ok(true)
    }

    /// Returns whether the proposed person of the request may currently be
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] for unknown
    /// requests.
    pub async fn can_unset_proposed_person(&self, request_id: RequestId) -> LifecycleResult<bool> {
        let request = load_request(&*self.store, request_id).await?;
        Ok(is_unsettable(&self.catalog, &request))
    }

    async fn update<F>(&self, request_id: RequestId, mutate: F) -> LifecycleResult<Request>
    where
        F: Fn(&mut Request, &C) -> Result<Option<RequestEvent>, ValidationError> + Send + Sync,
    {
        let mutation = &mutate;
        retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.update_once(request_id, mutation)
        })
        .await
    }

    async fn update_once<F>(&self, request_id: RequestId, mutate: &F) -> LifecycleResult<Request>
    where
        F: Fn(&mut Request, &C) -> Result<Option<RequestEvent>, ValidationError> + Send + Sync,
    {
        let mut request = load_request(&*self.store, request_id).await?;
        if request.is_completed() {
            return Err(ValidationError::RequestCompleted(request_id).into());
        }
        let clock = &*self.clock;
        let (updated, _) = self
            .transactions
            .run_atomically(
                move |tx| {
                    let event = mutate(&mut request, clock)?;
                    tx.update_request(&mut request);
                    Ok((request, event))
                },
                |(_, event), events| {
                    if let Some(staged) = event {
                        events.publish(staged.clone());
                    }
                    Ok(())
                },
            )
            .await?;
        Ok(updated)
    }
}

fn is_unsettable(catalog: &WorkflowTemplateCatalog, request: &Request) -> bool {
    request.is_draft()
        || resolve_template(catalog, request)
            .is_ok_and(|template| can_unset_proposed_person(request, template))
}
