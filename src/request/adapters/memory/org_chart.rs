//! In-memory org chart with scripted push outcomes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::request::{
    domain::OrgPositionId,
    ports::{AllocationPush, OrgChartClient, OrgChartError, OrgChartResult, PositionSnapshot},
};

#[derive(Debug, Clone)]
enum PushOutcome {
    Accept,
    Reject {
        message: String,
        payload: Option<Value>,
    },
    Unavailable,
}

#[derive(Debug)]
struct OrgChartState {
    positions: HashMap<OrgPositionId, PositionSnapshot>,
    pushes: Vec<AllocationPush>,
    outcome: PushOutcome,
}

impl Default for OrgChartState {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            pushes: Vec::new(),
            outcome: PushOutcome::Accept,
        }
    }
}

/// Thread-safe in-memory org chart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrgChart {
    state: Arc<RwLock<OrgChartState>>,
}

impl InMemoryOrgChart {
    /// Creates an empty org chart that accepts every push.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a position.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Unavailable`] when the lock is poisoned.
    pub fn add_position(&self, position: PositionSnapshot) -> OrgChartResult<()> {
        self.write()?.positions.insert(position.id, position);
        Ok(())
    }

    /// Makes subsequent pushes succeed.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Unavailable`] when the lock is poisoned.
    pub fn accept_pushes(&self) -> OrgChartResult<()> {
        self.write()?.outcome = PushOutcome::Accept;
        Ok(())
    }

    /// Makes subsequent pushes fail with a rejection.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Unavailable`] when the lock is poisoned.
    pub fn reject_pushes(
        &self,
        message: impl Into<String>,
        payload: Option<Value>,
    ) -> OrgChartResult<()> {
        self.write()?.outcome = PushOutcome::Reject {
            message: message.into(),
            payload,
        };
        Ok(())
    }

    /// Makes subsequent pushes fail as if the org chart were unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Unavailable`] when the lock is poisoned.
    pub fn make_unavailable(&self) -> OrgChartResult<()> {
        self.write()?.outcome = PushOutcome::Unavailable;
        Ok(())
    }

    /// Returns every push received, including failed ones.
    ///
    /// # Errors
    ///
    /// Returns [`OrgChartError::Unavailable`] when the lock is poisoned.
    pub fn pushes(&self) -> OrgChartResult<Vec<AllocationPush>> {
        Ok(self.read()?.pushes.clone())
    }

    fn read(&self) -> OrgChartResult<RwLockReadGuard<'_, OrgChartState>> {
        self.state
            .read()
            .map_err(|err| OrgChartError::unavailable(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> OrgChartResult<RwLockWriteGuard<'_, OrgChartState>> {
        self.state
            .write()
            .map_err(|err| OrgChartError::unavailable(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl OrgChartClient for InMemoryOrgChart {
    async fn resolve_position(&self, id: OrgPositionId) -> OrgChartResult<Option<PositionSnapshot>> {
        Ok(self.read()?.positions.get(&id).cloned())
    }

    async fn push_allocation(&self, push: &AllocationPush) -> OrgChartResult<OrgPositionId> {
        let mut state = self.write()?;
        state.pushes.push(push.clone());
        match state.outcome.clone() {
            PushOutcome::Accept => Ok(push.org_position_id),
            PushOutcome::Reject { message, payload } => {
                Err(OrgChartError::Rejected { message, payload })
            }
            PushOutcome::Unavailable => Err(OrgChartError::unavailable(std::io::Error::other(
                "org chart unreachable",
            ))),
        }
    }
}
