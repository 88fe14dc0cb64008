//! Second-opinion review commands.
//!
//! Creation and deletion of an opinion belong to its creator; each response
//! belongs to its assignee. Nothing changes once the parent request is
//! completed.

use super::{
    LifecycleError, LifecycleResult, TransactionCoordinator,
    lookup::{ensure_person, load_request},
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{
        Actor, PersonId, Request, RequestEvent, RequestId, ResponseId, ResponseState,
        SecondOpinion, SecondOpinionId, SecondOpinionResponse, ValidationError,
    },
    ports::{NotificationSink, ProfileResolver, RequestStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Manages second opinions and their responses.
pub struct SecondOpinionManager<S, N, P, C>
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

impl<S, N, P, C> SecondOpinionManager<S, N, P, C>
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

    /// Asks `assignees` for a second opinion on a request.
    ///
    /// Each distinct assignee receives one `Open` response.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoAssignees`], a blank-title validation
    /// error, [`ValidationError::UnknownPerson`] for unresolvable assignees
    /// and [`ValidationError::RequestCompleted`] for completed requests.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn request(
        &self,
        request_id: RequestId,
        actor: &Actor,
        title: &str,
        description: Option<&str>,
        assignees: &[PersonId],
    ) -> LifecycleResult<SecondOpinion> {
        for assignee in assignees {
            ensure_person(&*self.profiles, *assignee).await?;
        }
        let opinion = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.request_once(request_id, actor, title, description, assignees)
        })
        .await?;
        info!(
            second_opinion_id = %opinion.id(),
            assignees = opinion.responses().len(),
            "second opinion requested"
        );
        Ok(opinion)
    }

    async fn request_once(
        &self,
        request_id: RequestId,
        actor: &Actor,
        title: &str,
        description: Option<&str>,
        assignees: &[PersonId],
    ) -> LifecycleResult<SecondOpinion> {
        let mut request = self.open_request(request_id).await?;
        let opinion = SecondOpinion::new(
            request_id,
            title,
            description.map(str::to_owned),
            actor.person_id(),
            assignees,
            &*self.clock,
        )?;
        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_second_opinion(&opinion);
                    Ok(opinion)
                },
                |created, events| {
                    events.publish(RequestEvent::SecondOpinionRequested {
                        request_id,
                        second_opinion_id: created.id(),
                        assignees: created
                            .responses()
                            .iter()
                            .map(SecondOpinionResponse::assigned_to)
                            .collect(),
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Updates the comment and/or state of the actor's own response.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ResponseNotFound`] for unknown responses,
    /// [`LifecycleError::Forbidden`] when the actor is not the assignee,
    /// [`ValidationError::InvalidResponseTransition`] for illegal state
    /// changes and [`ValidationError::RequestCompleted`] for completed
    /// requests.
    #[instrument(skip_all, fields(response_id = %response_id, actor = %actor))]
    pub async fn update_response(
        &self,
        response_id: ResponseId,
        actor: &Actor,
        comment: Option<&str>,
        state: Option<ResponseState>,
    ) -> LifecycleResult<SecondOpinionResponse> {
        let request_id = self.opinion_by_response(response_id).await?.request_id();
        let response = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.update_response_once(response_id, actor, comment, state)
        })
        .await?;
        info!(state = %response.state(), "second-opinion response updated");
        Ok(response)
    }

    async fn update_response_once(
        &self,
        response_id: ResponseId,
        actor: &Actor,
        comment: Option<&str>,
        state: Option<ResponseState>,
    ) -> LifecycleResult<SecondOpinionResponse> {
        let mut opinion = self.opinion_by_response(response_id).await?;
        let request_id = opinion.request_id();
        let response = opinion
            .response_mut(response_id)
            .ok_or(LifecycleError::ResponseNotFound(response_id))?;
        ensure_actor(
            actor,
            response.assigned_to(),
            "update this second-opinion response",
        )?;
        let mut request = self.open_request(request_id).await?;
        response.update(comment.map(str::to_owned), state, &*self.clock)?;
        let updated = response.clone();

        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_second_opinion(&opinion);
                    Ok(updated)
                },
                |saved, events| {
                    events.publish(RequestEvent::SecondOpinionResponseUpdated {
                        request_id,
                        response_id,
                        state: saved.state(),
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Deletes a second opinion together with its responses.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::SecondOpinionNotFound`] for unknown
    /// opinions, [`LifecycleError::Forbidden`] when the actor did not create
    /// it and [`ValidationError::RequestCompleted`] for completed requests.
    #[instrument(skip_all, fields(second_opinion_id = %second_opinion_id, actor = %actor))]
    pub async fn delete(
        &self,
        second_opinion_id: SecondOpinionId,
        actor: &Actor,
    ) -> LifecycleResult<()> {
        let request_id = self.opinion(second_opinion_id).await?.request_id();
        retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.delete_once(second_opinion_id, actor)
        })
        .await?;
        info!("second opinion deleted");
        Ok(())
    }

    async fn delete_once(
        &self,
        second_opinion_id: SecondOpinionId,
        actor: &Actor,
    ) -> LifecycleResult<()> {
        let opinion = self.opinion(second_opinion_id).await?;
        ensure_actor(actor, opinion.created_by(), "delete this second opinion")?;
        let request_id = opinion.request_id();
        let mut request = self.open_request(request_id).await?;
        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.delete_second_opinion(second_opinion_id);
                    Ok(())
                },
                |_, events| {
                    events.publish(RequestEvent::SecondOpinionDeleted {
                        request_id,
                        second_opinion_id,
                        response_id: None,
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Removes the actor's own response from its second opinion.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ResponseNotFound`] for unknown responses,
    /// [`LifecycleError::Forbidden`] when the actor is not the assignee and
    /// [`ValidationError::RequestCompleted`] for completed requests.
    #[instrument(skip_all, fields(response_id = %response_id, actor = %actor))]
    pub async fn delete_response(
        &self,
        response_id: ResponseId,
        actor: &Actor,
    ) -> LifecycleResult<SecondOpinion> {
        let request_id = self.opinion_by_response(response_id).await?.request_id();
        let opinion = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.delete_response_once(response_id, actor)
        })
        .await?;
        info!(remaining = opinion.responses().len(), "second-opinion response deleted");
        Ok(opinion)
    }

    async fn delete_response_once(
        &self,
        response_id: ResponseId,
        actor: &Actor,
    ) -> LifecycleResult<SecondOpinion> {
        let mut opinion = self.opinion_by_response(response_id).await?;
        let assignee = opinion
            .response(response_id)
            .map(SecondOpinionResponse::assigned_to)
            .ok_or(LifecycleError::ResponseNotFound(response_id))?;
        ensure_actor(actor, assignee, "delete this second-opinion response")?;
        let request_id = opinion.request_id();
        let mut request = self.open_request(request_id).await?;
        opinion.remove_response(response_id);

        self.transactions
            .run_atomically(
                move |tx| {
                    tx.update_request(&mut request);
                    tx.put_second_opinion(&opinion);
                    Ok(opinion)
                },
                |remaining, events| {
                    events.publish(RequestEvent::SecondOpinionDeleted {
                        request_id,
                        second_opinion_id: remaining.id(),
                        response_id: Some(response_id),
                    });
                    Ok(())
                },
            )
            .await
    }

    async fn open_request(&self, request_id: RequestId) -> LifecycleResult<Request> {
        let request = load_request(&*self.store, request_id).await?;
        if request.is_completed() {
            return Err(ValidationError::RequestCompleted(request_id).into());
        }
        Ok(request)
    }

    async fn opinion(&self, id: SecondOpinionId) -> LifecycleResult<SecondOpinion> {
        self.store
            .find_second_opinion(id)
            .await?
            .ok_or(LifecycleError::SecondOpinionNotFound(id))
    }

    async fn opinion_by_response(&self, id: ResponseId) -> LifecycleResult<SecondOpinion> {
        self.store
            .find_second_opinion_by_response(id)
            .await?
            .ok_or(LifecycleError::ResponseNotFound(id))
    }
}

fn ensure_actor(actor: &Actor, owner: PersonId, operation: &'static str) -> LifecycleResult<()> {
    if actor.person_id() == owner {
        return Ok(());
    }
    warn!(person_id = %actor.person_id(), operation, "second-opinion access denied");
    Err(LifecycleError::Forbidden {
        person_id: actor.person_id(),
        operation,
    })
}
