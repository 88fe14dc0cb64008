//! Workflow lifecycle commands: initialize, approve, reject and reset.
//!
//! Every command reads fresh state, checks its preconditions, and stages the
//! resulting writes and events through the [`TransactionCoordinator`]. A
//! command that loses an optimistic-concurrency race is re-run against the
//! freshly read state instead of reapplying its precomputed transition.

use super::{
    ActionGate, LifecycleError, LifecycleResult, TransactionCoordinator,
    UnauthorizedWorkflowError,
    lookup::{load_request, load_workflow, resolve_template},
    provisioning::reaches_provisioning_point,
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{
        Actor, InvalidWorkflowError, Request, RequestEvent, RequestId, RequestType,
        SecondOpinion, StepId, StepTransition, Workflow, WorkflowTemplateCatalog,
    },
    ports::{
        AuthorizationOracle, NotificationSink, ProtectedResource, RequestStore, StoreError,
        StoreTransaction,
    },
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A request together with its workflow after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    /// Updated request.
    pub request: Request,
    /// Updated workflow.
    pub workflow: Workflow,
}

/// Outcome of an approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Updated request.
    pub request: Request,
    /// Updated workflow.
    pub workflow: Workflow,
    /// The applied step transition.
    pub transition: StepTransition,
    /// Whether the approval reached the provisioning point.
    pub provisioning_requested: bool,
    /// Number of second-opinion responses closed by completion.
    pub closed_responses: usize,
}

/// Workflow state machine service.
pub struct WorkflowEngine<S, N, A, C>
where
    S: RequestStore,
    N: NotificationSink,
    A: AuthorizationOracle,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    transactions: TransactionCoordinator<S, N>,
    gate: ActionGate<S>,
    oracle: Arc<A>,
    catalog: Arc<WorkflowTemplateCatalog>,
    config: LifecycleConfig,
    clock: Arc<C>,
}

impl<S, N, A, C> WorkflowEngine<S, N, A, C>
where
    S: RequestStore,
    N: NotificationSink,
    A: AuthorizationOracle,
    C: Clock + Send + Sync,
{
    /// Creates an engine using the built-in template catalog and default
    /// configuration.
    #[must_use]
    pub fn new(store: Arc<S>, sink: Arc<N>, oracle: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store), sink),
            gate: ActionGate::new(Arc::clone(&store)),
            store,
            oracle,
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

    /// Starts the workflow of a request.
    ///
    /// A terminated workflow left by a rejection is replaced in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::AlreadyExists`] when a workflow that
    /// is not terminated exists (including when a concurrent initialize won),
    /// [`InvalidWorkflowError::BlockedByActions`] when required actions for
    /// the actor's party are unresolved,
    /// [`InvalidWorkflowError::TemplateNotFound`] when no template applies,
    /// and [`LifecycleError::RequestNotFound`] for unknown requests.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn initialize(
        &self,
        request_id: RequestId,
        actor: &Actor,
    ) -> LifecycleResult<WorkflowSnapshot> {
        let snapshot = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.initialize_once(request_id, actor)
        })
        .await
        .map_err(|err| match err {
            LifecycleError::Store(StoreError::DuplicateWorkflow(id)) => {
                InvalidWorkflowError::AlreadyExists(id).into()
            }
            other => other,
        })?;
        info!(
            workflow_id = %snapshot.workflow.id(),
            state = ?snapshot.request.state(),
            "workflow initialized"
        );
        Ok(snapshot)
    }

    async fn initialize_once(
        &self,
        request_id: RequestId,
        actor: &Actor,
    ) -> LifecycleResult<WorkflowSnapshot> {
        let mut request = load_request(&*self.store, request_id).await?;
        let existing = self.store.find_workflow(request_id).await?;
        if existing.as_ref().is_some_and(|workflow| !workflow.is_terminated()) {
            return Err(InvalidWorkflowError::AlreadyExists(request_id).into());
        }
        self.ensure_not_blocked(request_id, actor).await?;

        let template = resolve_template(&self.catalog, &request)?;
        let replaced = existing.map(|workflow| workflow.id());
        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    let workflow = Workflow::start(&mut request, template, clock)?;
                    tx.update_request(&mut request);
                    if let Some(old) = replaced {
                        tx.delete_workflow(old);
                    }
                    tx.insert_workflow(&workflow);
                    Ok(WorkflowSnapshot { request, workflow })
                },
                |snapshot, events| {
                    if let Some(old) = replaced {
                        events.publish(RequestEvent::WorkflowReset {
                            request_id,
                            workflow_id: old,
                        });
                    }
                    if let Some(step) = snapshot.request.state() {
                        events.publish(RequestEvent::WorkflowInitialized {
                            request_id,
                            workflow_id: snapshot.workflow.id(),
                            step: step.clone(),
                        });
                    }
                    Ok(())
                },
            )
            .await
    }

    /// Approves the current step and advances the request to the next one.
    ///
    /// Authorization for the exact `current -> next` transition and the
    /// action gate for the actor's party are re-checked against fresh state
    /// on every attempt. Leaving the proposal step additionally requires the
    /// candidate list to be narrowed to one proposed person. Approving a
    /// terminal step completes the workflow.
    ///
    /// The call approves whichever step is current when it commits, not the
    /// step the caller last observed. A caller that loses a race retries
    /// against the re-read workflow and may therefore approve the step after
    /// the one it saw; the returned [`Approval::transition`] names the step
    /// actually approved. Callers that must approve one specific step check
    /// it first with [`Self::can_approve_step`] and compare the transition.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnauthorizedWorkflow`] when the oracle
    /// denies the transition, [`InvalidWorkflowError`] when the workflow is
    /// missing, not running, blocked or malformed,
    /// [`crate::request::domain::ValidationError::CandidatesNotNarrowed`]
    /// when the proposal was not narrowed, and [`LifecycleError::Conflict`]
    /// when concurrent writers exhausted the retry budget.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn approve(&self, request_id: RequestId, actor: &Actor) -> LifecycleResult<Approval> {
        let approval = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.approve_once(request_id, actor)
        })
        .await?;
        info!(
            from = %approval.transition.from,
            to = %approval.transition.target_state(),
            provisioning_requested = approval.provisioning_requested,
            "workflow step approved"
        );
        Ok(approval)
    }

    async fn approve_once(&self, request_id: RequestId, actor: &Actor) -> LifecycleResult<Approval> {
        let mut request = load_request(&*self.store, request_id).await?;
        let mut workflow = load_workflow(&*self.store, request_id).await?;
        let planned = workflow.plan_approval(&request)?;

        self.authorize_transition(&request, &planned, actor).await?;
        self.ensure_not_blocked(request_id, actor).await?;

        let template = self
            .catalog
            .resolve(request.request_type(), request.sub_type());
        if template.and_then(|found| found.proposal_step()) == Some(&planned.from) {
            request.proposal().ensure_narrowed(request_id)?;
        }
        let provisioning_requested = self.config.publish_provisioning_requests
            && reaches_provisioning_point(template, &planned);
        let mut opinions = if planned.completes_workflow()
            && self.config.close_second_opinions_on_completion
        {
            self.store.list_second_opinions(request_id).await?
        } else {
            Vec::new()
        };

        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    let transition = workflow.approve(&mut request, actor, clock)?;
                    tx.update_request(&mut request);
                    tx.update_workflow(&workflow);
                    let closed_responses = close_opinions(&mut opinions, tx);
                    Ok(Approval {
                        request,
                        workflow,
                        transition,
                        provisioning_requested,
                        closed_responses,
                    })
                },
                |approval, events| {
                    events.publish(RequestEvent::WorkflowStepApproved {
                        request_id,
                        from: approval.transition.from.clone(),
                        to: approval.transition.to.clone(),
                        approved_by: actor.person_id(),
                    });
                    if approval.transition.completes_workflow() {
                        events.publish(RequestEvent::WorkflowCompleted {
                            request_id,
                            workflow_id: approval.workflow.id(),
                        });
                    }
                    if approval.provisioning_requested {
                        events.publish(RequestEvent::ProvisioningRequested { request_id });
                    }
                    Ok(())
                },
            )
            .await
    }

    /// Checks whether `actor` could approve the transition `from -> to`
    /// without mutating anything.
    ///
    /// `to` equal to `completed` checks the approval of the final step.
    ///
    /// # Errors
    ///
    /// Returns the error the corresponding approval would fail with, plus
    /// [`InvalidWorkflowError::RequestTypeMismatch`] when `request_type`
    /// differs from the stored request and
    /// [`InvalidWorkflowError::StepMismatch`] when `from -> to` is not the
    /// pending transition.
    #[instrument(skip_all, fields(request_id = %request_id, from = %from, to = %to))]
    pub async fn can_approve_step(
        &self,
        request_id: RequestId,
        request_type: RequestType,
        from: &StepId,
        to: &StepId,
        actor: &Actor,
    ) -> LifecycleResult<()> {
        let request = load_request(&*self.store, request_id).await?;
        if request.request_type() != request_type {
            return Err(InvalidWorkflowError::RequestTypeMismatch {
                request_id,
                expected: request_type,
                actual: request.request_type(),
            }
            .into());
        }
        let workflow = load_workflow(&*self.store, request_id).await?;
        let planned = workflow.ensure_transition(&request, from, to)?;
        self.authorize_transition(&request, &planned, actor).await?;
        self.ensure_not_blocked(request_id, actor).await
    }

    /// Rejects the current step and terminates the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnauthorizedWorkflow`] when the oracle
    /// denies the rejection and [`InvalidWorkflowError`] when there is no
    /// running workflow or the current step is already decided.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn reject(
        &self,
        request_id: RequestId,
        actor: &Actor,
        reason: &str,
    ) -> LifecycleResult<WorkflowSnapshot> {
        let snapshot = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.reject_once(request_id, actor, reason)
        })
        .await?;
        info!(state = ?snapshot.request.state(), "workflow rejected");
        Ok(snapshot)
    }

    async fn reject_once(
        &self,
        request_id: RequestId,
        actor: &Actor,
        reason: &str,
    ) -> LifecycleResult<WorkflowSnapshot> {
        let mut request = load_request(&*self.store, request_id).await?;
        let mut workflow = load_workflow(&*self.store, request_id).await?;
        let step = workflow.current_step(&request)?.id.clone();

        let resource = ProtectedResource::WorkflowRejection {
            request_id,
            step: step.clone(),
        };
        let decision = self.oracle.authorize(actor, &resource).await?;
        if !decision.is_allowed() {
            warn!(%step, "rejection denied by authorization oracle");
            return Err(UnauthorizedWorkflowError {
                request_id,
                from: step.clone(),
                to: step,
                reason: decision.reason().unwrap_or("not authorized").to_owned(),
            }
            .into());
        }

        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    workflow.reject(&request, actor, reason, clock)?;
                    tx.update_request(&mut request);
                    tx.update_workflow(&workflow);
                    Ok(WorkflowSnapshot { request, workflow })
                },
                |_, events| {
                    events.publish(RequestEvent::WorkflowRejected {
                        request_id,
                        step,
                        rejected_by: actor.person_id(),
                    });
                    Ok(())
                },
            )
            .await
    }

    /// Discards the workflow and its steps so the request can be
    /// initialized again.
    ///
    /// Permitted whatever the workflow state; this is a recovery escape
    /// hatch, not a normal transition.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::NotInitialized`] when the request has
    /// no workflow.
    #[instrument(skip_all, fields(request_id = %request_id, actor = %actor))]
    pub async fn reset(&self, request_id: RequestId, actor: &Actor) -> LifecycleResult<Request> {
        let request = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.reset_once(request_id)
        })
        .await?;
        warn!("workflow reset");
        Ok(request)
    }

    async fn reset_once(&self, request_id: RequestId) -> LifecycleResult<Request> {
        let mut request = load_request(&*self.store, request_id).await?;
        let workflow = load_workflow(&*self.store, request_id).await?;
        let workflow_id = workflow.id();

        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    request.clear_workflow_state(clock);
                    tx.update_request(&mut request);
                    tx.delete_workflow(workflow_id);
                    Ok(request)
                },
                |_, events| {
                    events.publish(RequestEvent::WorkflowReset {
                        request_id,
                        workflow_id,
                    });
                    Ok(())
                },
            )
            .await
    }

    async fn authorize_transition(
        &self,
        request: &Request,
        transition: &StepTransition,
        actor: &Actor,
    ) -> LifecycleResult<()> {
        let to = transition.target_state();
        let resource = ProtectedResource::WorkflowTransition {
            request_id: request.id(),
            request_type: request.request_type(),
            from: transition.from.clone(),
            to: to.clone(),
        };
        let decision = self.oracle.authorize(actor, &resource).await?;
        if decision.is_allowed() {
            return Ok(());
        }
        warn!(from = %transition.from, %to, "transition denied by authorization oracle");
        Err(UnauthorizedWorkflowError {
            request_id: request.id(),
            from: transition.from.clone(),
            to,
            reason: decision.reason().unwrap_or("not authorized").to_owned(),
        }
        .into())
    }

    async fn ensure_not_blocked(&self, request_id: RequestId, actor: &Actor) -> LifecycleResult<()> {
        let count = self.gate.blocking_actions(request_id, actor.party()).await?;
        if count == 0 {
            return Ok(());
        }
        warn!(count, party = %actor.party(), "transition blocked by required actions");
        Err(InvalidWorkflowError::BlockedByActions { request_id, count }.into())
    }
}

fn close_opinions(
    opinions: &mut [SecondOpinion],
    tx: &mut StoreTransaction,
) -> usize {
    opinions
        .iter_mut()
        .map(|opinion| {
            let closed = opinion.close_unpublished();
            if closed > 0 {
                tx.put_second_opinion(opinion);
            }
            closed
        })
        .sum()
}
