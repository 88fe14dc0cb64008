//! Workflow aggregate: the per-request step state machine.
//!
//! A workflow is instantiated from a [`WorkflowTemplate`] and afterwards only
//! walks the `next_step` pointers copied onto its steps. Exactly one step is
//! current at any time: the step whose identifier equals the request state.
//! Every transition updates the step and the request together.

use super::{
    Actor, InvalidWorkflowError, ParseEnumError, PersonId, Request, RequestId, RequestType,
    StepId, WorkflowId, WorkflowTemplate,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Steps are being worked through.
    Running,
    /// The terminal step was approved.
    Completed,
    /// The workflow was stopped before completion.
    Terminated,
}

impl WorkflowState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkflowState {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "terminated" => Ok(Self::Terminated),
            _ => Err(ParseEnumError::new("workflow state", value)),
        }
    }
}

/// State of a single workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// The step has not been decided yet.
    NotStarted,
    /// The step was approved.
    Approved,
    /// The step was rejected.
    Rejected,
    /// The step was skipped.
    Skipped,
}

impl StepState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }

    /// Returns whether the step has been decided.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StepState {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_started" | "notstarted" => Ok(Self::NotStarted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "skipped" => Ok(Self::Skipped),
            _ => Err(ParseEnumError::new("step state", value)),
        }
    }
}

/// One step of a workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Stable step identifier; doubles as the request state name.
    pub id: StepId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Decision state.
    pub state: StepState,
    /// Step pointing at this one.
    pub previous_step: Option<StepId>,
    /// Step that follows this one; `None` for terminal steps.
    pub next_step: Option<StepId>,
    /// Days the step may stay open once started.
    pub due_in_days: Option<u32>,
    /// When the step became current.
    pub started: Option<DateTime<Utc>>,
    /// When the step was decided.
    pub completed: Option<DateTime<Utc>>,
    /// Who decided the step.
    pub completed_by: Option<PersonId>,
    /// When the step should be decided by.
    pub due_date: Option<DateTime<Utc>>,
    /// Free-text reason recorded on rejection or skip.
    pub reason: Option<String>,
}

impl WorkflowStep {
    fn begin(&mut self, at: DateTime<Utc>) {
        self.started = Some(at);
        self.due_date = self
            .due_in_days
            .and_then(|days| TimeDelta::try_days(i64::from(days)))
            .and_then(|delta| at.checked_add_signed(delta));
    }

    fn decide(&mut self, state: StepState, actor: &Actor, at: DateTime<Utc>) {
        self.state = state;
        self.completed = Some(at);
        self.completed_by = Some(actor.person_id());
    }
}

/// A single step transition produced by an approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTransition {
    /// Step that was current before the transition.
    pub from: StepId,
    /// Step that became current; `None` when the workflow completed.
    pub to: Option<StepId>,
}

impl StepTransition {
    /// Returns whether the transition completes the workflow.
    #[must_use]
    pub const fn completes_workflow(&self) -> bool {
        self.to.is_none()
    }

    /// Returns the target state name, using `completed` for the end of the
    /// workflow.
    #[must_use]
    pub fn target_state(&self) -> StepId {
        self.to.clone().unwrap_or_else(StepId::completed)
    }
}

/// Workflow instance owned by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    id: WorkflowId,
    request_id: RequestId,
    request_type: RequestType,
    state: WorkflowState,
    steps: Vec<WorkflowStep>,
    created: DateTime<Utc>,
    completed: Option<DateTime<Utc>>,
    terminated_by: Option<PersonId>,
}

/// Parameter object for reconstructing a persisted workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedWorkflowData {
    /// Persisted workflow identifier.
    pub id: WorkflowId,
    /// Owning request.
    pub request_id: RequestId,
    /// Request type, part of the uniqueness key.
    pub request_type: RequestType,
    /// Persisted workflow state.
    pub state: WorkflowState,
    /// Persisted steps.
    pub steps: Vec<WorkflowStep>,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Completion or termination timestamp.
    pub completed: Option<DateTime<Utc>>,
    /// Person who terminated the workflow.
    pub terminated_by: Option<PersonId>,
}

impl Workflow {
    /// Instantiates a workflow for `request` from `template` and makes its
    /// entry step current.
    ///
    /// Sets the request state to the entry step and clears the draft flag.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::TemplateNotFound`] when the template
    /// does not apply to the request or has no steps.
    pub fn start(
        request: &mut Request,
        template: &WorkflowTemplate,
        clock: &impl Clock,
    ) -> Result<Self, InvalidWorkflowError> {
        let not_found = || InvalidWorkflowError::TemplateNotFound {
            request_type: request.request_type(),
            sub_type: request.sub_type().clone(),
        };
        if !template.matches(request.request_type(), request.sub_type()) {
            return Err(not_found());
        }
        let first = template.first_step().ok_or_else(not_found)?.id.clone();

        let now = clock.utc();
        let mut steps: Vec<WorkflowStep> = template
            .steps()
            .iter()
            .map(|definition| WorkflowStep {
                id: definition.id.clone(),
                name: definition.name.clone(),
                description: definition.description.clone(),
                state: StepState::NotStarted,
                previous_step: template.previous_of(&definition.id).cloned(),
                next_step: definition.next_step.clone(),
                due_in_days: definition.due_in_days,
                started: None,
                completed: None,
                completed_by: None,
                due_date: None,
                reason: None,
            })
            .collect();
        if let Some(entry) = steps.iter_mut().find(|step| step.id == first) {
            entry.begin(now);
        }

        request.enter_step(first, clock);
        Ok(Self {
            id: WorkflowId::new(),
            request_id: request.id(),
            request_type: request.request_type(),
            state: WorkflowState::Running,
            steps,
            created: now,
            completed: None,
            terminated_by: None,
        })
    }

    /// Reconstructs a workflow from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedWorkflowData) -> Self {
        Self {
            id: data.id,
            request_id: data.request_id,
            request_type: data.request_type,
            state: data.state,
            steps: data.steps,
            created: data.created,
            completed: data.completed,
            terminated_by: data.terminated_by,
        }
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the owning request.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request type the workflow was created for.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Returns the workflow state.
    #[must_use]
    pub const fn state(&self) -> WorkflowState {
        self.state
    }

    /// Returns whether the workflow is still running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, WorkflowState::Running)
    }

    /// Returns whether the workflow was terminated.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self.state, WorkflowState::Terminated)
    }

    /// Returns the steps in template order.
    #[must_use]
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Looks up a step by identifier.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| &step.id == id)
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns the completion or termination timestamp.
    #[must_use]
    pub const fn completed(&self) -> Option<DateTime<Utc>> {
        self.completed
    }

    /// Returns who terminated the workflow.
    #[must_use]
    pub const fn terminated_by(&self) -> Option<PersonId> {
        self.terminated_by
    }

    /// Returns the step named by the request state.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::NotRunning`] for completed or
    /// terminated workflows and [`InvalidWorkflowError::NoCurrentStep`] when
    /// the request state names no step.
    pub fn current_step(&self, request: &Request) -> Result<&WorkflowStep, InvalidWorkflowError> {
        if !self.is_running() {
            return Err(InvalidWorkflowError::NotRunning(self.request_id));
        }
        request
            .state()
            .and_then(|state| self.step(state))
            .ok_or(InvalidWorkflowError::NoCurrentStep(self.request_id))
    }

    /// Computes the transition an approval would apply, without mutating.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError`] when the workflow is not running, the
    /// current step is already decided, or its `next_step` is dangling.
    pub fn plan_approval(&self, request: &Request) -> Result<StepTransition, InvalidWorkflowError> {
        let current = self.current_step(request)?;
        if current.state.is_terminal() {
            return Err(InvalidWorkflowError::StepAlreadyTerminal {
                request_id: self.request_id,
                step: current.id.clone(),
            });
        }
        if let Some(next) = &current.next_step {
            if self.step(next).is_none() {
                return Err(InvalidWorkflowError::StepNotFound {
                    request_id: self.request_id,
                    step: next.clone(),
                });
            }
        }
        Ok(StepTransition {
            from: current.id.clone(),
            to: current.next_step.clone(),
        })
    }

    /// Ensures the workflow would move from `from` to `to` on approval.
    ///
    /// `to` equal to the reserved `completed` state checks the final step.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError::StepMismatch`] when the pointers do
    /// not match, or any error from [`Self::plan_approval`].
    pub fn ensure_transition(
        &self,
        request: &Request,
        from: &StepId,
        to: &StepId,
    ) -> Result<StepTransition, InvalidWorkflowError> {
        let planned = self.plan_approval(request)?;
        if &planned.from != from || &planned.target_state() != to {
            return Err(InvalidWorkflowError::StepMismatch {
                request_id: self.request_id,
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(planned)
    }

    /// Approves the current step and advances the request.
    ///
    /// When the current step is terminal the workflow completes and the
    /// request moves to the reserved `completed` state.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::plan_approval`]; nothing is mutated on
    /// failure.
    pub fn approve(
        &mut self,
        request: &mut Request,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<StepTransition, InvalidWorkflowError> {
        let transition = self.plan_approval(request)?;
        let now = clock.utc();

        if let Some(step) = self.step_mut(&transition.from) {
            step.decide(StepState::Approved, actor, now);
        }
        match &transition.to {
            Some(next) => {
                if let Some(step) = self.step_mut(next) {
                    step.begin(now);
                }
                request.enter_step(next.clone(), clock);
            }
            None => {
                self.state = WorkflowState::Completed;
                self.completed = Some(now);
                request.mark_completed(clock);
            }
        }
        Ok(transition)
    }

    /// Rejects the current step and terminates the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWorkflowError`] when the workflow is not running or
    /// the current step is already decided.
    pub fn reject(
        &mut self,
        request: &Request,
        actor: &Actor,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<StepId, InvalidWorkflowError> {
        let current = self.current_step(request)?;
        if current.state.is_terminal() {
            return Err(InvalidWorkflowError::StepAlreadyTerminal {
                request_id: self.request_id,
                step: current.id.clone(),
            });
        }
        let rejected = current.id.clone();
        let now = clock.utc();
        if let Some(step) = self.step_mut(&rejected) {
            step.decide(StepState::Rejected, actor, now);
            step.reason = Some(reason.into());
        }
        self.state = WorkflowState::Terminated;
        self.completed = Some(now);
        self.terminated_by = Some(actor.person_id());
        Ok(rejected)
    }

    /// Returns whether the workflow has reached `step`: it is current or
    /// already approved.
    #[must_use]
    pub fn has_reached(&self, request: &Request, step: &StepId) -> bool {
        let is_current = self.is_running() && request.state() == Some(step);
        let is_approved = self
            .step(step)
            .is_some_and(|found| found.state == StepState::Approved);
        is_current || is_approved
    }

    fn step_mut(&mut self, id: &StepId) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|step| &step.id == id)
    }
}
