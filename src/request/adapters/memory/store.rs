//! In-memory request store for lifecycle tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::request::{
    domain::{
        Action, ActionId, PersonId, Request, RequestId, RequestNumber, ResponseId, SecondOpinion,
        SecondOpinionId, ShareId, SharedRequest, Workflow, WorkflowId,
    },
    ports::{RequestStore, StagedWrite, StoreError, StoreResult, StoreTransaction},
};

/// Thread-safe in-memory request store.
///
/// Commits are applied to a copy of the tables and swapped in only when
/// every staged write succeeded. Commit and rollback calls are recorded, and
/// failures can be injected for the next commits.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    requests: HashMap<RequestId, Request>,
    workflows: HashMap<WorkflowId, Workflow>,
    actions: Vec<Action>,
    second_opinions: Vec<SecondOpinion>,
    shares: Vec<SharedRequest>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    tables: Tables,
    last_request_number: u64,
    committed: Vec<Uuid>,
    rolled_back: Vec<Uuid>,
    failing_commits: u32,
    conflicting_commits: u32,
}

impl InMemoryRequestStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifiers of committed transactions in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lock is poisoned.
    pub fn committed_transactions(&self) -> StoreResult<Vec<Uuid>> {
        Ok(self.read()?.committed.clone())
    }

    /// Returns the identifiers of rolled-back transactions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lock is poisoned.
    pub fn rolled_back_transactions(&self) -> StoreResult<Vec<Uuid>> {
        Ok(self.read()?.rolled_back.clone())
    }

    /// Makes the next `count` commits fail with a persistence error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lock is poisoned.
    pub fn fail_next_commits(&self, count: u32) -> StoreResult<()> {
        self.write()?.failing_commits = count;
        Ok(())
    }

    /// Makes the next `count` commits that update a request fail with
    /// [`StoreError::VersionConflict`], as if another writer won the race.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the lock is poisoned.
    pub fn conflict_next_commits(&self, count: u32) -> StoreResult<()> {
        self.write()?.conflicting_commits = count;
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

fn injected_conflict(writes: &[StagedWrite]) -> Option<StoreError> {
    writes.iter().find_map(|write| match write {
        StagedWrite::UpdateRequest {
            request,
            expected_version,
        } => Some(StoreError::VersionConflict {
            request_id: request.id(),
            expected: *expected_version,
            actual: expected_version.saturating_add(1),
        }),
        _ => None,
    })
}

fn ensure_request(tables: &Tables, id: RequestId) -> StoreResult<()> {
    if tables.requests.contains_key(&id) {
        Ok(())
    } else {
        Err(StoreError::RequestNotFound(id))
    }
}

fn upsert<T>(rows: &mut Vec<T>, row: T, same: impl Fn(&T) -> bool) {
    if let Some(existing) = rows.iter_mut().find(|candidate| same(candidate)) {
        *existing = row;
    } else {
        rows.push(row);
    }
}

fn apply(tables: &mut Tables, write: StagedWrite) -> StoreResult<()> {
    match write {
        StagedWrite::InsertRequest(request) => {
            let id = request.id();
            let taken = tables.requests.contains_key(&id)
                || tables
                    .requests
                    .values()
                    .any(|existing| existing.number() == request.number());
            if taken {
                return Err(StoreError::DuplicateRequest(id));
            }
            tables.requests.insert(id, request);
        }
        StagedWrite::UpdateRequest {
            request,
            expected_version,
        } => {
            let id = request.id();
            let stored = tables
                .requests
                .get(&id)
                .ok_or(StoreError::RequestNotFound(id))?;
            if stored.version() != expected_version {
                return Err(StoreError::VersionConflict {
                    request_id: id,
                    expected: expected_version,
                    actual: stored.version(),
                });
            }
            tables.requests.insert(id, request);
        }
        StagedWrite::DeleteRequest(id) => {
            tables
                .requests
                .remove(&id)
                .ok_or(StoreError::RequestNotFound(id))?;
            tables.workflows.retain(|_, workflow| workflow.request_id() != id);
            tables.actions.retain(|action| action.request_id() != id);
            tables
                .second_opinions
                .retain(|opinion| opinion.request_id() != id);
        }
        StagedWrite::InsertWorkflow(workflow) => {
            ensure_request(tables, workflow.request_id())?;
            let duplicate = tables.workflows.values().any(|existing| {
                existing.request_id() == workflow.request_id()
                    && existing.request_type() == workflow.request_type()
            });
            if duplicate {
                return Err(StoreError::DuplicateWorkflow(workflow.request_id()));
            }
            tables.workflows.insert(workflow.id(), workflow);
        }
        StagedWrite::UpdateWorkflow(workflow) => {
            let id = workflow.id();
            if !tables.workflows.contains_key(&id) {
                return Err(StoreError::WorkflowNotFound(id));
            }
            tables.workflows.insert(id, workflow);
        }
        StagedWrite::DeleteWorkflow(id) => {
            tables.workflows.remove(&id);
        }
        StagedWrite::PutAction(action) => {
            ensure_request(tables, action.request_id())?;
            let id = action.id();
            upsert(&mut tables.actions, action, |existing| existing.id() == id);
        }
        StagedWrite::PutSecondOpinion(opinion) => {
            ensure_request(tables, opinion.request_id())?;
            let id = opinion.id();
            upsert(&mut tables.second_opinions, opinion, |existing| {
                existing.id() == id
            });
        }
        StagedWrite::DeleteSecondOpinion(id) => {
            tables.second_opinions.retain(|opinion| opinion.id() != id);
        }
        StagedWrite::PutShare(share) => {
            ensure_request(tables, share.request_id())?;
            let id = share.id();
            upsert(&mut tables.shares, share, |existing| existing.id() == id);
        }
    }
    Ok(())
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn begin(&self) -> StoreResult<StoreTransaction> {
        Ok(StoreTransaction::new())
    }

    async fn commit(&self, transaction: StoreTransaction) -> StoreResult<()> {
        let mut state = self.write()?;
        let transaction_id = transaction.id();

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::persistence(std::io::Error::other(
                "injected commit failure",
            )));
        }
        if state.conflicting_commits > 0 {
            if let Some(conflict) = injected_conflict(transaction.writes()) {
                state.conflicting_commits -= 1;
                return Err(conflict);
            }
        }

        let mut tables = state.tables.clone();
        for write in transaction.into_writes() {
            apply(&mut tables, write)?;
        }
        state.tables = tables;
        state.committed.push(transaction_id);
        Ok(())
    }

    async fn rollback(&self, transaction: StoreTransaction) -> StoreResult<()> {
        self.write()?.rolled_back.push(transaction.id());
        Ok(())
    }

    async fn next_request_number(&self) -> StoreResult<RequestNumber> {
        let mut state = self.write()?;
        let next = state.last_request_number.saturating_add(1);
        let number = RequestNumber::new(next)
            .map_err(|err| StoreError::InvalidPersistedData(err.to_string()))?;
        state.last_request_number = next;
        Ok(number)
    }

    async fn find_request(&self, id: RequestId) -> StoreResult<Option<Request>> {
        Ok(self.read()?.tables.requests.get(&id).cloned())
    }

    async fn find_workflow(&self, request_id: RequestId) -> StoreResult<Option<Workflow>> {
        let state = self.read()?;
        Ok(state
            .tables
            .workflows
            .values()
            .find(|workflow| workflow.request_id() == request_id)
            .cloned())
    }

    async fn list_actions(&self, request_id: RequestId) -> StoreResult<Vec<Action>> {
        let state = self.read()?;
        Ok(state
            .tables
            .actions
            .iter()
            .filter(|action| action.request_id() == request_id)
            .cloned()
            .collect())
    }

    async fn find_action(&self, id: ActionId) -> StoreResult<Option<Action>> {
        let state = self.read()?;
        Ok(state
            .tables
            .actions
            .iter()
            .find(|action| action.id() == id)
            .cloned())
    }

    async fn list_second_opinions(
        &self,
        request_id: RequestId,
    ) -> StoreResult<Vec<SecondOpinion>> {
        let state = self.read()?;
        Ok(state
            .tables
            .second_opinions
            .iter()
            .filter(|opinion| opinion.request_id() == request_id)
            .cloned()
            .collect())
    }

    async fn find_second_opinion(
        &self,
        id: SecondOpinionId,
    ) -> StoreResult<Option<SecondOpinion>> {
        let state = self.read()?;
        Ok(state
            .tables
            .second_opinions
            .iter()
            .find(|opinion| opinion.id() == id)
            .cloned())
    }

    async fn find_second_opinion_by_response(
        &self,
        response_id: ResponseId,
    ) -> StoreResult<Option<SecondOpinion>> {
        let state = self.read()?;
        Ok(state
            .tables
            .second_opinions
            .iter()
            .find(|opinion| opinion.response(response_id).is_some())
            .cloned())
    }

    async fn list_shares(&self, request_id: RequestId) -> StoreResult<Vec<SharedRequest>> {
        let state = self.read()?;
        Ok(state
            .tables
            .shares
            .iter()
            .filter(|share| share.request_id() == request_id)
            .cloned()
            .collect())
    }

    async fn find_share(&self, id: ShareId) -> StoreResult<Option<SharedRequest>> {
        let state = self.read()?;
        Ok(state
            .tables
            .shares
            .iter()
            .find(|share| share.id() == id)
            .cloned())
    }

    async fn list_shares_for_person(
        &self,
        person_id: PersonId,
    ) -> StoreResult<Vec<SharedRequest>> {
        let state = self.read()?;
        Ok(state
            .tables
            .shares
            .iter()
            .filter(|share| share.shared_with() == person_id)
            .cloned()
            .collect())
    }
}
