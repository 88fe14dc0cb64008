//! Workflow templates: the per request type step definitions a workflow is
//! instantiated from.
//!
//! The engine itself is template-agnostic; it only walks the `next_step`
//! pointers recorded here. Templates are external configuration, loaded from
//! JSON or taken from the built-in catalog.

use super::{RequestDomainError, RequestType, StepId, SubType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Definition of one step in a workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Stable step identifier, mirrored onto the request state.
    pub id: StepId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Step that follows this one. `None` marks a terminal step.
    #[serde(default)]
    pub next_step: Option<StepId>,
    /// Days after the step starts by which it should be completed.
    #[serde(default)]
    pub due_in_days: Option<u32>,
}

impl StepDefinition {
    fn builtin(id: &str, name: &str, next_step: Option<&str>) -> Self {
        Self {
            id: StepId::trusted(id),
            name: name.to_owned(),
            description: None,
            next_step: next_step.map(StepId::trusted),
            due_in_days: None,
        }
    }
}

/// Serialised shape of a workflow template before validation.
#[derive(Debug, Clone, Deserialize)]
struct WorkflowTemplateDefinition {
    request_type: RequestType,
    #[serde(default)]
    sub_type: Option<SubType>,
    steps: Vec<StepDefinition>,
    #[serde(default)]
    proposal_step: Option<StepId>,
    #[serde(default)]
    unset_proposal_states: Vec<StepId>,
    #[serde(default)]
    provisioning_step: Option<StepId>,
}

/// Validated workflow template for one request type and sub type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WorkflowTemplateDefinition")]
pub struct WorkflowTemplate {
    request_type: RequestType,
    sub_type: Option<SubType>,
    steps: Vec<StepDefinition>,
    proposal_step: Option<StepId>,
    unset_proposal_states: Vec<StepId>,
    provisioning_step: Option<StepId>,
}

impl TryFrom<WorkflowTemplateDefinition> for WorkflowTemplate {
    type Error = RequestDomainError;

    fn try_from(definition: WorkflowTemplateDefinition) -> Result<Self, Self::Error> {
        let template = Self {
            request_type: definition.request_type,
            sub_type: definition.sub_type,
            steps: definition.steps,
            proposal_step: definition.proposal_step,
            unset_proposal_states: definition.unset_proposal_states,
            provisioning_step: definition.provisioning_step,
        };
        template.validate()?;
        Ok(template)
    }
}

/// Builder-style parameters for constructing a template in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTemplateParams {
    /// Request type the template applies to.
    pub request_type: RequestType,
    /// Sub type the template applies to; `None` matches every sub type.
    pub sub_type: Option<SubType>,
    /// Step definitions; the first entry is the workflow's entry step.
    pub steps: Vec<StepDefinition>,
    /// Step in which candidates are narrowed to one proposed person.
    pub proposal_step: Option<StepId>,
    /// States in which the proposed person may still be cleared.
    pub unset_proposal_states: Vec<StepId>,
    /// Step whose arrival makes the request eligible for provisioning;
    /// `None` means workflow completion.
    pub provisioning_step: Option<StepId>,
}

impl WorkflowTemplate {
    /// Creates a validated template.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::InvalidTemplate`] when the step graph
    /// is empty, contains duplicates, dangling pointers or cycles, or the
    /// designated steps are unknown.
    pub fn new(params: WorkflowTemplateParams) -> Result<Self, RequestDomainError> {
        let template = Self {
            request_type: params.request_type,
            sub_type: params.sub_type,
            steps: params.steps,
            proposal_step: params.proposal_step,
            unset_proposal_states: params.unset_proposal_states,
            provisioning_step: params.provisioning_step,
        };
        template.validate()?;
        Ok(template)
    }

    /// Returns the request type the template applies to.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Returns the sub type the template applies to, if restricted.
    #[must_use]
    pub const fn sub_type(&self) -> Option<&SubType> {
        self.sub_type.as_ref()
    }

    /// Returns all step definitions.
    #[must_use]
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Returns the entry step.
    #[must_use]
    pub fn first_step(&self) -> Option<&StepDefinition> {
        self.steps.first()
    }

    /// Looks up a step definition.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| &step.id == id)
    }

    /// Returns the first step whose `next_step` points at `id`.
    #[must_use]
    pub fn previous_of(&self, id: &StepId) -> Option<&StepId> {
        self.steps
            .iter()
            .find(|step| step.next_step.as_ref() == Some(id))
            .map(|step| &step.id)
    }

    /// Returns the designated proposal step.
    #[must_use]
    pub const fn proposal_step(&self) -> Option<&StepId> {
        self.proposal_step.as_ref()
    }

    /// Returns the designated provisioning step.
    #[must_use]
    pub const fn provisioning_step(&self) -> Option<&StepId> {
        self.provisioning_step.as_ref()
    }

    /// Returns whether the proposed person may be cleared in `state`.
    #[must_use]
    pub fn allows_unset_proposal_in(&self, state: &StepId) -> bool {
        self.unset_proposal_states.contains(state)
    }

    /// Returns whether the template applies to the given classification.
    #[must_use]
    pub fn matches(&self, request_type: RequestType, sub_type: &SubType) -> bool {
        self.request_type == request_type
            && self.sub_type.as_ref().is_none_or(|own| own == sub_type)
    }

    pub(crate) fn validate(&self) -> Result<(), RequestDomainError> {
        let first = self
            .steps
            .first()
            .ok_or_else(|| self.invalid("template has no steps"))?;

        let mut ids = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            if step.id.is_completed() {
                return Err(self.invalid(format!("step id '{}' is reserved", step.id)));
            }
            if !ids.insert(&step.id) {
                return Err(self.invalid(format!("duplicate step id '{}'", step.id)));
            }
        }

        for step in &self.steps {
            if let Some(next) = &step.next_step {
                if !ids.contains(next) {
                    return Err(self.invalid(format!(
                        "step '{}' points to unknown step '{next}'",
                        step.id
                    )));
                }
            }
        }

        if self.previous_of(&first.id).is_some() {
            return Err(self.invalid(format!("entry step '{}' has a predecessor", first.id)));
        }

        for step in &self.steps {
            self.ensure_terminates(&step.id)?;
        }

        let designated = self
            .proposal_step
            .iter()
            .chain(self.provisioning_step.iter())
            .chain(self.unset_proposal_states.iter());
        for id in designated {
            if !ids.contains(id) {
                return Err(self.invalid(format!("designated step '{id}' does not exist")));
            }
        }
        Ok(())
    }

    /// Walks `next_step` pointers from `start`, failing on a cycle.
    fn ensure_terminates(&self, start: &StepId) -> Result<(), RequestDomainError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(self.invalid(format!("step graph has a cycle through '{id}'")));
            }
            cursor = self.step(id).and_then(|step| step.next_step.as_ref());
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> RequestDomainError {
        RequestDomainError::InvalidTemplate {
            request_type: self.request_type,
            sub_type: self
                .sub_type
                .as_ref()
                .map_or_else(|| "*".to_owned(), ToString::to_string),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDefinition {
    templates: Vec<WorkflowTemplate>,
}

/// Registry of workflow templates keyed by request type and sub type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTemplateCatalog {
    templates: Vec<WorkflowTemplate>,
}

impl WorkflowTemplateCatalog {
    /// Creates a catalog from validated templates.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::InvalidTemplate`] when two templates are
    /// registered for the same type and sub type.
    pub fn new(templates: Vec<WorkflowTemplate>) -> Result<Self, RequestDomainError> {
        let mut keys = HashSet::with_capacity(templates.len());
        for template in &templates {
            if !keys.insert((template.request_type, template.sub_type.clone())) {
                return Err(template.invalid("template registered twice"));
            }
        }
        Ok(Self { templates })
    }

    /// Decodes and validates a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RequestDomainError::TemplateDecoding`] when the JSON is
    /// malformed or a template fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, RequestDomainError> {
        let definition: CatalogDefinition = serde_json::from_str(json)
            .map_err(|err| RequestDomainError::TemplateDecoding(err.to_string()))?;
        Self::new(definition.templates)
    }

    /// Returns the built-in template catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let early = || vec![StepId::trusted("created"), StepId::trusted("proposal")];
        let direct = |sub_type: &str| WorkflowTemplate {
            request_type: RequestType::Allocation,
            sub_type: Some(SubType::trusted(sub_type)),
            steps: vec![
                StepDefinition::builtin("created", "Created", Some("approval")),
                StepDefinition::builtin("approval", "Approval", None),
            ],
            proposal_step: None,
            unset_proposal_states: vec![StepId::trusted("created")],
            provisioning_step: None,
        };

        Self {
            templates: vec![
                WorkflowTemplate {
                    request_type: RequestType::Allocation,
                    sub_type: Some(SubType::normal()),
                    steps: vec![
                        StepDefinition::builtin("created", "Created", Some("proposal")),
                        StepDefinition::builtin("proposal", "Proposal", Some("approval")),
                        StepDefinition::builtin("approval", "Approval", None),
                    ],
                    proposal_step: Some(StepId::trusted("proposal")),
                    unset_proposal_states: early(),
                    provisioning_step: None,
                },
                direct("direct"),
                direct("joint_venture"),
                WorkflowTemplate {
                    request_type: RequestType::ChangeRequest,
                    sub_type: None,
                    steps: vec![
                        StepDefinition::builtin("created", "Created", Some("proposal")),
                        StepDefinition::builtin("proposal", "Proposal", Some("accepted")),
                        StepDefinition::builtin("accepted", "Accepted", None),
                    ],
                    proposal_step: Some(StepId::trusted("proposal")),
                    unset_proposal_states: early(),
                    provisioning_step: None,
                },
            ],
        }
    }

    /// Resolves the template for a request classification.
    ///
    /// Exact sub type matches win over wildcard templates.
    #[must_use]
    pub fn resolve(&self, request_type: RequestType, sub_type: &SubType) -> Option<&WorkflowTemplate> {
        self.templates
            .iter()
            .find(|template| {
                template.request_type == request_type && template.sub_type.as_ref() == Some(sub_type)
            })
            .or_else(|| {
                self.templates.iter().find(|template| {
                    template.request_type == request_type && template.sub_type.is_none()
                })
            })
    }

    /// Returns all registered templates.
    #[must_use]
    pub fn templates(&self) -> &[WorkflowTemplate] {
        &self.templates
    }
}

impl Default for WorkflowTemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
