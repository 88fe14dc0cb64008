//! Provisioning of approved requests into the external org chart.

use super::{
    LifecycleResult, ProvisioningError, TransactionCoordinator,
    lookup::{load_request, load_workflow},
    transaction::retry_on_conflict,
};
use crate::request::{
    config::LifecycleConfig,
    domain::{
        InvalidWorkflowError, ProvisioningState, ProvisioningStatus, Request, RequestEvent,
        RequestId, StepTransition, ValidationError, Workflow, WorkflowTemplate,
        WorkflowTemplateCatalog,
    },
    ports::{AllocationPush, NotificationSink, OrgChartClient, OrgChartError, RequestStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Returns whether `transition` reaches the provisioning point of
/// `template`.
///
/// Templates without a designated provisioning step provision on workflow
/// completion.
pub(crate) fn reaches_provisioning_point(
    template: Option<&WorkflowTemplate>,
    transition: &StepTransition,
) -> bool {
    match template.and_then(WorkflowTemplate::provisioning_step) {
        Some(step) => transition.to.as_ref() == Some(step),
        None => transition.completes_workflow(),
    }
}

/// Returns whether the workflow of `request` has reached the point where
/// the request may be provisioned.
#[must_use]
pub fn requires_provisioning(
    request: &Request,
    workflow: &Workflow,
    template: Option<&WorkflowTemplate>,
) -> bool {
    match template.and_then(WorkflowTemplate::provisioning_step) {
        Some(step) => workflow.has_reached(request, step),
        None => request.is_completed(),
    }
}

/// Result of trying to claim a push.
enum Claim {
    /// This caller owns the push.
    Acquired(Box<Request>),
    /// The request is provisioned or another caller is pushing it.
    Settled(ProvisioningStatus),
}

/// Pushes approved requests to the org chart and records the outcome.
pub struct ProvisioningCoordinator<S, N, O, C>
where
    S: RequestStore,
    N: NotificationSink,
    O: OrgChartClient,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    transactions: TransactionCoordinator<S, N>,
    org_chart: Arc<O>,
    catalog: Arc<WorkflowTemplateCatalog>,
    config: LifecycleConfig,
    clock: Arc<C>,
}

impl<S, N, O, C> ProvisioningCoordinator<S, N, O, C>
where
    S: RequestStore,
    N: NotificationSink,
    O: OrgChartClient,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator using the built-in template catalog.
    #[must_use]
    pub fn new(store: Arc<S>, sink: Arc<N>, org_chart: Arc<O>, clock: Arc<C>) -> Self {
        Self {
            transactions: TransactionCoordinator::new(Arc::clone(&store), sink),
            store,
            org_chart,
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

    /// Returns whether the request has reached its provisioning point.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] or
    /// [`InvalidWorkflowError::NotInitialized`] when the aggregates are
    /// missing.
    pub async fn requires_provisioning(&self, request_id: RequestId) -> LifecycleResult<bool> {
        let request = load_request(&*self.store, request_id).await?;
        let workflow = load_workflow(&*self.store, request_id).await?;
        let template = self
            .catalog
            .resolve(request.request_type(), request.sub_type());
        Ok(requires_provisioning(&request, &workflow, template))
    }

    /// Pushes the approved allocation to the org chart.
    ///
    /// Without `force`, a request that is already provisioned, or whose push
    /// another caller has claimed, is left untouched and its current status
    /// returned. The push is claimed with a versioned write first, so
    /// concurrent callers push at most once; the loser of the claim re-reads
    /// the request and settles on what it finds. The push itself happens
    /// outside any store transaction and its outcome is then recorded on
    /// the request. A claim left behind by a crashed caller is cleared with
    /// `force`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::NotProvisionable`] before the
    /// provisioning point, [`ValidationError::MissingOrgPosition`] or
    /// [`ValidationError::UnknownPosition`] when there is nothing to push
    /// to, and [`super::LifecycleError::Provisioning`] carrying the org-chart
    /// payload when the push fails. The failure is recorded before the
    /// error is returned.
    #[instrument(skip_all, fields(request_id = %request_id, force = force))]
    pub async fn provision(
        &self,
        request_id: RequestId,
        force: bool,
    ) -> LifecycleResult<ProvisioningStatus> {
        let snapshot = load_request(&*self.store, request_id).await?;
        let workflow = load_workflow(&*self.store, request_id).await?;
        let template = self
            .catalog
            .resolve(snapshot.request_type(), snapshot.sub_type());
        if !requires_provisioning(&snapshot, &workflow, template) {
            return Err(InvalidWorkflowError::NotProvisionable(request_id).into());
        }
        if !force && snapshot.provisioning().is_settled() {
            info!(state = %snapshot.provisioning().state(), "request already provisioned");
            return Ok(snapshot.provisioning().clone());
        }

        let org_position_id = snapshot
            .org_position_id()
            .ok_or(ValidationError::MissingOrgPosition(request_id))?;
        if self
            .org_chart
            .resolve_position(org_position_id)
            .await?
            .is_none()
        {
            return Err(ValidationError::UnknownPosition(org_position_id).into());
        }

        let claimed = retry_on_conflict(request_id, self.config.max_conflict_retries, || {
            self.claim(request_id, force)
        })
        .await?;
        let request = match claimed {
            Claim::Acquired(request) => request,
            Claim::Settled(status) => {
                info!(state = %status.state(), "push already claimed by another caller");
                return Ok(status);
            }
        };

        let push = AllocationPush {
            request_id,
            request_type: request.request_type(),
            org_position_id,
            person_id: request
                .proposal()
                .proposed_person()
                .map(|proposed| proposed.person_id),
            parameters: request.proposal().parameters().cloned(),
            proposed_changes: request.proposal().proposed_changes().cloned(),
        };
        let pushed = self.org_chart.push_allocation(&push).await;
        let previous = request.provisioning();
        let status = match pushed {
            Ok(position) => ProvisioningStatus::provisioned(position, self.clock.utc()),
            Err(OrgChartError::Rejected { message, payload }) => {
                ProvisioningStatus::failed(previous, message, payload)
            }
            Err(err @ OrgChartError::Unavailable(_)) => {
                ProvisioningStatus::unreachable(previous, err.to_string())
            }
        };

        let recorded = retry_on_conflict(request_id, self.config.max_conflict_retries, move || {
            self.record(request_id, status.clone())
        })
        .await?;

        if recorded.is_provisioned() {
            info!(org_position_id = ?recorded.org_position_id(), "request provisioned");
            return Ok(recorded);
        }
        let message = recorded
            .error_message()
            .unwrap_or("org chart did not confirm the allocation")
            .to_owned();
        error!(state = %recorded.state(), %message, "provisioning failed");
        Err(ProvisioningError {
            request_id,
            state: recorded.state(),
            message,
            payload: recorded.error_payload().cloned(),
        }
        .into())
    }

    /// Marks the push as in flight against freshly read state.
    async fn claim(&self, request_id: RequestId, force: bool) -> LifecycleResult<Claim> {
        let mut request = load_request(&*self.store, request_id).await?;
        if !force && request.provisioning().is_settled() {
            return Ok(Claim::Settled(request.provisioning().clone()));
        }
        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    let in_flight = ProvisioningStatus::in_progress(request.provisioning());
                    request.record_provisioning(in_flight, clock);
                    tx.update_request(&mut request);
                    Ok(Claim::Acquired(Box::new(request)))
                },
                |_, _| Ok(()),
            )
            .await
    }

    async fn record(
        &self,
        request_id: RequestId,
        status: ProvisioningStatus,
    ) -> LifecycleResult<ProvisioningStatus> {
        let mut request = load_request(&*self.store, request_id).await?;
        let clock = &*self.clock;
        self.transactions
            .run_atomically(
                move |tx| {
                    request.record_provisioning(status, clock);
                    tx.update_request(&mut request);
                    Ok(request.provisioning().clone())
                },
                |recorded, events| {
                    match (recorded.state(), recorded.org_position_id()) {
                        (ProvisioningState::Provisioned, Some(org_position_id)) => {
                            events.publish(RequestEvent::RequestProvisioned {
                                request_id,
                                org_position_id,
                            });
                        }
                        (state, _) => {
                            warn!(%state, "recording provisioning failure");
                            events.publish(RequestEvent::ProvisioningFailed {
                                request_id,
                                state,
                                message: recorded.error_message().unwrap_or_default().to_owned(),
                            });
                        }
                    }
                    Ok(())
                },
            )
            .await
    }
}
