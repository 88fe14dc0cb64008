//! Unit-of-work port for the request system of record.
//!
//! Reads go straight to the store. Writes are staged on a
//! [`StoreTransaction`] and applied all-or-nothing by
//! [`RequestStore::commit`], which also enforces the optimistic version check
//! on requests and the one-workflow-per-request constraint.

use crate::request::domain::{
    Action, ActionId, PersonId, Request, RequestId, RequestNumber, ResponseId, SecondOpinion,
    SecondOpinionId, ShareId, SharedRequest, Workflow, WorkflowId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A single write staged on a [`StoreTransaction`].
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    /// Insert a new request.
    InsertRequest(Request),
    /// Replace a request whose stored version must still be
    /// `expected_version`.
    UpdateRequest {
        /// Request state to persist, already carrying the next version.
        request: Request,
        /// Version the change was computed against.
        expected_version: u64,
    },
    /// Delete a request and every record it owns except sharing grants,
    /// which outlive the request for audit.
    DeleteRequest(RequestId),
    /// Insert a workflow; fails when the request already has one.
    InsertWorkflow(Workflow),
    /// Replace a workflow and its steps.
    UpdateWorkflow(Workflow),
    /// Delete a workflow and its steps.
    DeleteWorkflow(WorkflowId),
    /// Insert or replace an action.
    PutAction(Action),
    /// Insert or replace a second opinion with exactly the given responses.
    PutSecondOpinion(SecondOpinion),
    /// Delete a second opinion and its responses.
    DeleteSecondOpinion(SecondOpinionId),
    /// Insert or replace a sharing grant.
    PutShare(SharedRequest),
}

/// Writes staged for one atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreTransaction {
    id: Uuid,
    writes: Vec<StagedWrite>,
}

impl StoreTransaction {
    /// Opens an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            writes: Vec::new(),
        }
    }

    /// Returns the transaction identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the staged writes in order.
    #[must_use]
    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    /// Consumes the transaction, returning its staged writes.
    #[must_use]
    pub fn into_writes(self) -> Vec<StagedWrite> {
        self.writes
    }

    /// Returns whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Stages insertion of a new request.
    pub fn insert_request(&mut self, request: &Request) {
        self.writes.push(StagedWrite::InsertRequest(request.clone()));
    }

    /// Stages an update of `request` and advances its version.
    ///
    /// The commit fails with [`StoreError::VersionConflict`] when another
    /// writer committed first.
    pub fn update_request(&mut self, request: &mut Request) {
        let expected_version = request.advance_version();
        self.writes.push(StagedWrite::UpdateRequest {
            request: request.clone(),
            expected_version,
        });
    }

    /// Stages deletion of a request and the records it owns.
    pub fn delete_request(&mut self, id: RequestId) {
        self.writes.push(StagedWrite::DeleteRequest(id));
    }

    /// Stages insertion of a workflow.
    pub fn insert_workflow(&mut self, workflow: &Workflow) {
        self.writes.push(StagedWrite::InsertWorkflow(workflow.clone()));
    }

    /// Stages replacement of a workflow.
    pub fn update_workflow(&mut self, workflow: &Workflow) {
        self.writes.push(StagedWrite::UpdateWorkflow(workflow.clone()));
    }

    /// Stages deletion of a workflow.
    pub fn delete_workflow(&mut self, id: WorkflowId) {
        self.writes.push(StagedWrite::DeleteWorkflow(id));
    }

    /// Stages an action upsert.
    pub fn put_action(&mut self, action: &Action) {
        self.writes.push(StagedWrite::PutAction(action.clone()));
    }

    /// Stages a second-opinion upsert.
    pub fn put_second_opinion(&mut self, opinion: &SecondOpinion) {
        self.writes
            .push(StagedWrite::PutSecondOpinion(opinion.clone()));
    }

    /// Stages deletion of a second opinion.
    pub fn delete_second_opinion(&mut self, id: SecondOpinionId) {
        self.writes.push(StagedWrite::DeleteSecondOpinion(id));
    }

    /// Stages a sharing-grant upsert.
    pub fn put_share(&mut self, share: &SharedRequest) {
        self.writes.push(StagedWrite::PutShare(share.clone()));
    }
}

impl Default for StoreTransaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Request system-of-record contract.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Opens a unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store is unavailable.
    async fn begin(&self) -> StoreResult<StoreTransaction>;

    /// Applies every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] when a staged request update
    /// was computed against a stale version,
    /// [`StoreError::DuplicateWorkflow`] when a second workflow would be
    /// inserted for a request, and [`StoreError::RequestNotFound`] when an
    /// update targets a missing request. Nothing is applied on error.
    async fn commit(&self, transaction: StoreTransaction) -> StoreResult<()>;

    /// Discards every staged write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store is unavailable.
    async fn rollback(&self, transaction: StoreTransaction) -> StoreResult<()>;

    /// Allocates the next request number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when allocation fails.
    async fn next_request_number(&self) -> StoreResult<RequestNumber>;

    /// Finds a request by identifier.
    async fn find_request(&self, id: RequestId) -> StoreResult<Option<Request>>;

    /// Finds the workflow owned by a request, whatever its state.
    async fn find_workflow(&self, request_id: RequestId) -> StoreResult<Option<Workflow>>;

    /// Lists the actions of a request in creation order.
    async fn list_actions(&self, request_id: RequestId) -> StoreResult<Vec<Action>>;

    /// Finds an action by identifier.
    async fn find_action(&self, id: ActionId) -> StoreResult<Option<Action>>;

    /// Lists the second opinions of a request in creation order.
    async fn list_second_opinions(&self, request_id: RequestId)
    -> StoreResult<Vec<SecondOpinion>>;

    /// Finds a second opinion by identifier.
    async fn find_second_opinion(&self, id: SecondOpinionId)
    -> StoreResult<Option<SecondOpinion>>;

    /// Finds the second opinion owning a response.
    async fn find_second_opinion_by_response(
        &self,
        response_id: ResponseId,
    ) -> StoreResult<Option<SecondOpinion>>;

    /// Lists every sharing grant of a request, revoked ones included.
    async fn list_shares(&self, request_id: RequestId) -> StoreResult<Vec<SharedRequest>>;

    /// Finds a sharing grant by identifier.
    async fn find_share(&self, id: ShareId) -> StoreResult<Option<SharedRequest>>;

    /// Lists every sharing grant made to a person, revoked ones included.
    async fn list_shares_for_person(
        &self,
        person_id: PersonId,
    ) -> StoreResult<Vec<SharedRequest>>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another writer updated the request first.
    #[error("request {request_id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        /// Request identifier.
        request_id: RequestId,
        /// Version the change was computed against.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The request already owns a workflow.
    #[error("request {0} already has a workflow")]
    DuplicateWorkflow(RequestId),

    /// A request with the same identifier or number already exists.
    #[error("duplicate request: {0}")]
    DuplicateRequest(RequestId),

    /// A staged write references a request that does not exist.
    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// A staged write references a workflow that does not exist.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// A stored row could not be mapped back to the domain.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
