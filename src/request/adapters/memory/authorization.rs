//! Rule-based authorization oracle for tests and local wiring.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::request::{
    domain::{Actor, PersonId, StepId},
    ports::{
        AuthorizationDecision, AuthorizationError, AuthorizationOracle, AuthorizationResult,
        ProtectedResource,
    },
};

#[derive(Debug, Clone)]
struct DenyRule {
    person_id: Option<PersonId>,
    step: Option<StepId>,
    reason: String,
}

impl DenyRule {
    fn matches(&self, actor: &Actor, resource: &ProtectedResource) -> bool {
        let target = match resource {
            ProtectedResource::WorkflowTransition { to, .. } => to,
            ProtectedResource::WorkflowRejection { step, .. } => step,
        };
        self.person_id.is_none_or(|person| person == actor.person_id())
            && self.step.as_ref().is_none_or(|step| step == target)
    }
}

/// Oracle that allows everything except explicitly denied combinations.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizationOracle {
    rules: Arc<RwLock<Vec<DenyRule>>>,
}

impl StaticAuthorizationOracle {
    /// Creates an oracle that allows every request.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Denies transitions into (or rejections of) `step`, optionally only
    /// for `person_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Unavailable`] when the lock is
    /// poisoned.
    pub fn deny(
        &self,
        person_id: Option<PersonId>,
        step: Option<StepId>,
        reason: impl Into<String>,
    ) -> AuthorizationResult<()> {
        self.rules
            .write()
            .map_err(|err| AuthorizationError::unavailable(std::io::Error::other(err.to_string())))?
            .push(DenyRule {
                person_id,
                step,
                reason: reason.into(),
            });
        Ok(())
    }

    /// Removes every deny rule.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Unavailable`] when the lock is
    /// poisoned.
    pub fn clear(&self) -> AuthorizationResult<()> {
        self.rules
            .write()
            .map_err(|err| AuthorizationError::unavailable(std::io::Error::other(err.to_string())))?
            .clear();
        Ok(())
    }
}

#[async_trait]
impl AuthorizationOracle for StaticAuthorizationOracle {
    async fn authorize(
        &self,
        actor: &Actor,
        resource: &ProtectedResource,
    ) -> AuthorizationResult<AuthorizationDecision> {
        let rules = self
            .rules
            .read()
            .map_err(|err| AuthorizationError::unavailable(std::io::Error::other(err.to_string())))?;
        Ok(rules
            .iter()
            .find(|rule| rule.matches(actor, resource))
            .map_or_else(AuthorizationDecision::allow, |rule| {
                AuthorizationDecision::deny(rule.reason.clone())
            }))
    }
}
