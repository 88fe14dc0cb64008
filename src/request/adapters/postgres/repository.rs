//! `PostgreSQL` store implementation for the request lifecycle.

use super::{
    models::{
        ActionRow, NextNumberRow, RequestRow, ResponseRow, SecondOpinionRow, ShareRow,
        WorkflowRow, WorkflowStepRow,
    },
    schema::{
        actions, requests, second_opinion_responses, second_opinions, shared_requests,
        workflow_steps, workflows,
    },
};
use crate::request::{
    domain::{
        Action, ActionId, CorrelationId, OrgPositionId, Party, PersistedActionData,
        PersistedRequestData, PersistedResponseData, PersistedSecondOpinionData,
        PersistedShareData, PersistedWorkflowData, PersonId, Request, RequestId, RequestNumber,
        RequestType, ResponseId, ResponseState, Responsible, SecondOpinion, SecondOpinionId,
        SecondOpinionResponse, ShareId, ShareSource, SharedRequest, StepId, StepState, SubType,
        Workflow, WorkflowId, WorkflowState, WorkflowStep,
    },
    ports::{RequestStore, StagedWrite, StoreError, StoreResult, StoreTransaction},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use std::fmt::Display;

/// `PostgreSQL` connection pool type used by request adapters.
pub type RequestPgPool = Pool<ConnectionManager<PgConnection>>;

const WORKFLOW_UNIQUE_CONSTRAINT: &str = "idx_workflows_request_type_unique";

/// `PostgreSQL`-backed request store.
///
/// Staged writes are applied inside one database transaction on commit, so
/// a failed write leaves no trace.
#[derive(Debug, Clone)]
pub struct PostgresRequestStore {
    pool: RequestPgPool,
}

impl PostgresRequestStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: RequestPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl RequestStore for PostgresRequestStore {
    async fn begin(&self) -> StoreResult<StoreTransaction> {
        Ok(StoreTransaction::new())
    }

    async fn commit(&self, transaction: StoreTransaction) -> StoreResult<()> {
        let writes = transaction.into_writes();
        self.run_blocking(move |connection| {
            connection.transaction::<_, StoreError, _>(|tx| {
                for write in writes {
                    apply_write(tx, write)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn rollback(&self, transaction: StoreTransaction) -> StoreResult<()> {
        drop(transaction);
        Ok(())
    }

    async fn next_request_number(&self) -> StoreResult<RequestNumber> {
        self.run_blocking(|connection| {
            let row = diesel::sql_query("SELECT nextval('request_number_seq') AS value")
                .get_result::<NextNumberRow>(connection)?;
            let value = u64::try_from(row.value).map_err(invalid)?;
            RequestNumber::new(value).map_err(invalid)
        })
        .await
    }

    async fn find_request(&self, id: RequestId) -> StoreResult<Option<Request>> {
        self.run_blocking(move |connection| {
            let row = requests::table
                .filter(requests::id.eq(id.into_inner()))
                .select(RequestRow::as_select())
                .first::<RequestRow>(connection)
                .optional()?;
            row.map(row_to_request).transpose()
        })
        .await
    }

    async fn find_workflow(&self, request_id: RequestId) -> StoreResult<Option<Workflow>> {
        self.run_blocking(move |connection| {
            let row = workflows::table
                .filter(workflows::request_id.eq(request_id.into_inner()))
                .select(WorkflowRow::as_select())
                .first::<WorkflowRow>(connection)
                .optional()?;
            row.map(|found| load_workflow(connection, found)).transpose()
        })
        .await
    }

    async fn list_actions(&self, request_id: RequestId) -> StoreResult<Vec<Action>> {
        self.run_blocking(move |connection| {
            actions::table
                .filter(actions::request_id.eq(request_id.into_inner()))
                .order(actions::created_at.asc())
                .select(ActionRow::as_select())
                .load::<ActionRow>(connection)?
                .into_iter()
                .map(row_to_action)
                .collect()
        })
        .await
    }

    async fn find_action(&self, id: ActionId) -> StoreResult<Option<Action>> {
        self.run_blocking(move |connection| {
            let row = actions::table
                .filter(actions::id.eq(id.into_inner()))
                .select(ActionRow::as_select())
                .first::<ActionRow>(connection)
                .optional()?;
            row.map(row_to_action).transpose()
        })
        .await
    }

    async fn list_second_opinions(
        &self,
        request_id: RequestId,
    ) -> StoreResult<Vec<SecondOpinion>> {
        self.run_blocking(move |connection| {
            let rows = second_opinions::table
                .filter(second_opinions::request_id.eq(request_id.into_inner()))
                .order(second_opinions::created_at.asc())
                .select(SecondOpinionRow::as_select())
                .load::<SecondOpinionRow>(connection)?;
            rows.into_iter()
                .map(|row| load_second_opinion(connection, row))
                .collect()
        })
        .await
    }

    async fn find_second_opinion(
        &self,
        id: SecondOpinionId,
    ) -> StoreResult<Option<SecondOpinion>> {
        self.run_blocking(move |connection| {
            let row = second_opinions::table
                .filter(second_opinions::id.eq(id.into_inner()))
                .select(SecondOpinionRow::as_select())
                .first::<SecondOpinionRow>(connection)
                .optional()?;
            row.map(|found| load_second_opinion(connection, found))
                .transpose()
        })
        .await
    }

    async fn find_second_opinion_by_response(
        &self,
        response_id: ResponseId,
    ) -> StoreResult<Option<SecondOpinion>> {
        self.run_blocking(move |connection| {
            let row = second_opinions::table
                .inner_join(second_opinion_responses::table)
                .filter(second_opinion_responses::id.eq(response_id.into_inner()))
                .select(SecondOpinionRow::as_select())
                .first::<SecondOpinionRow>(connection)
                .optional()?;
            row.map(|found| load_second_opinion(connection, found))
                .transpose()
        })
        .await
    }

    async fn list_shares(&self, request_id: RequestId) -> StoreResult<Vec<SharedRequest>> {
        self.run_blocking(move |connection| {
            shared_requests::table
                .filter(shared_requests::request_id.eq(request_id.into_inner()))
                .order(shared_requests::granted_at.asc())
                .select(ShareRow::as_select())
                .load::<ShareRow>(connection)?
                .into_iter()
                .map(row_to_share)
                .collect()
        })
        .await
    }

    async fn find_share(&self, id: ShareId) -> StoreResult<Option<SharedRequest>> {
        self.run_blocking(move |connection| {
            let row = shared_requests::table
                .filter(shared_requests::id.eq(id.into_inner()))
                .select(ShareRow::as_select())
                .first::<ShareRow>(connection)
                .optional()?;
            row.map(row_to_share).transpose()
        })
        .await
    }

    async fn list_shares_for_person(
        &self,
        person_id: PersonId,
    ) -> StoreResult<Vec<SharedRequest>> {
        self.run_blocking(move |connection| {
            shared_requests::table
                .filter(shared_requests::shared_with.eq(person_id.into_inner()))
                .order(shared_requests::granted_at.asc())
                .select(ShareRow::as_select())
                .load::<ShareRow>(connection)?
                .into_iter()
                .map(row_to_share)
                .collect()
        })
        .await
    }
}

fn apply_write(connection: &mut PgConnection, write: StagedWrite) -> StoreResult<()> {
    match write {
        StagedWrite::InsertRequest(request) => {
            let id = request.id();
            diesel::insert_into(requests::table)
                .values(&request_to_row(&request)?)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateRequest(id)
                    }
                    _ => StoreError::persistence(err),
                })?;
        }
        StagedWrite::UpdateRequest {
            request,
            expected_version,
        } => update_request(connection, &request, expected_version)?,
        StagedWrite::DeleteRequest(id) => {
            let deleted = diesel::delete(requests::table.filter(requests::id.eq(id.into_inner())))
                .execute(connection)?;
            if deleted == 0 {
                return Err(StoreError::RequestNotFound(id));
            }
        }
        StagedWrite::InsertWorkflow(workflow) => {
            let request_id = workflow.request_id();
            diesel::insert_into(workflows::table)
                .values(&workflow_to_row(&workflow))
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_workflow_unique_violation(info.as_ref()) =>
                    {
                        StoreError::DuplicateWorkflow(request_id)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        StoreError::RequestNotFound(request_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            insert_steps(connection, &workflow)?;
        }
        StagedWrite::UpdateWorkflow(workflow) => {
            let id = workflow.id();
            let updated = diesel::update(workflows::table.filter(workflows::id.eq(id.into_inner())))
                .set(&workflow_to_row(&workflow))
                .execute(connection)?;
            if updated == 0 {
                return Err(StoreError::WorkflowNotFound(id));
            }
            diesel::delete(
                workflow_steps::table.filter(workflow_steps::workflow_id.eq(id.into_inner())),
            )
            .execute(connection)?;
            insert_steps(connection, &workflow)?;
        }
        StagedWrite::DeleteWorkflow(id) => {
            diesel::delete(workflows::table.filter(workflows::id.eq(id.into_inner())))
                .execute(connection)?;
        }
        StagedWrite::PutAction(action) => {
            let row = action_to_row(&action)?;
            diesel::insert_into(actions::table)
                .values(&row)
                .on_conflict(actions::id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(|err| foreign_key_to_not_found(err, action.request_id()))?;
        }
        StagedWrite::PutSecondOpinion(opinion) => put_second_opinion(connection, &opinion)?,
        StagedWrite::DeleteSecondOpinion(id) => {
            diesel::delete(second_opinions::table.filter(second_opinions::id.eq(id.into_inner())))
                .execute(connection)?;
        }
        StagedWrite::PutShare(share) => {
            ensure_request_exists(connection, share.request_id())?;
            let row = share_to_row(&share);
            diesel::insert_into(shared_requests::table)
                .values(&row)
                .on_conflict(shared_requests::id)
                .do_update()
                .set(&row)
                .execute(connection)?;
        }
    }
    Ok(())
}

// Grants carry no foreign key, so the request is checked explicitly.
fn ensure_request_exists(connection: &mut PgConnection, id: RequestId) -> StoreResult<()> {
    let found = diesel::select(diesel::dsl::exists(
        requests::table.filter(requests::id.eq(id.into_inner())),
    ))
    .get_result::<bool>(connection)?;
    if found {
        Ok(())
    } else {
        Err(StoreError::RequestNotFound(id))
    }
}

fn update_request(
    connection: &mut PgConnection,
    request: &Request,
    expected_version: u64,
) -> StoreResult<()> {
    let id = request.id();
    let expected = i64::try_from(expected_version).map_err(invalid)?;
    let updated = diesel::update(
        requests::table
            .filter(requests::id.eq(id.into_inner()))
            .filter(requests::version.eq(expected)),
    )
    .set(&request_to_row(request)?)
    .execute(connection)?;
    if updated > 0 {
        return Ok(());
    }

    let stored = requests::table
        .filter(requests::id.eq(id.into_inner()))
        .select(requests::version)
        .first::<i64>(connection)
        .optional()?;
    match stored {
        None => Err(StoreError::RequestNotFound(id)),
        Some(actual) => Err(StoreError::VersionConflict {
            request_id: id,
            expected: expected_version,
            actual: u64::try_from(actual).map_err(invalid)?,
        }),
    }
}

fn put_second_opinion(connection: &mut PgConnection, opinion: &SecondOpinion) -> StoreResult<()> {
    let row = second_opinion_to_row(opinion);
    diesel::insert_into(second_opinions::table)
        .values(&row)
        .on_conflict(second_opinions::id)
        .do_update()
        .set(&row)
        .execute(connection)
        .map_err(|err| foreign_key_to_not_found(err, opinion.request_id()))?;

    diesel::delete(
        second_opinion_responses::table
            .filter(second_opinion_responses::second_opinion_id.eq(opinion.id().into_inner())),
    )
    .execute(connection)?;

    let responses = opinion
        .responses()
        .iter()
        .enumerate()
        .map(|(position, response)| response_to_row(position, response))
        .collect::<StoreResult<Vec<_>>>()?;
    if !responses.is_empty() {
        diesel::insert_into(second_opinion_responses::table)
            .values(&responses)
            .execute(connection)?;
    }
    Ok(())
}

fn insert_steps(connection: &mut PgConnection, workflow: &Workflow) -> StoreResult<()> {
    let rows = workflow
        .steps()
        .iter()
        .enumerate()
        .map(|(position, step)| step_to_row(workflow.id(), position, step))
        .collect::<StoreResult<Vec<_>>>()?;
    if !rows.is_empty() {
        diesel::insert_into(workflow_steps::table)
            .values(&rows)
            .execute(connection)?;
    }
    Ok(())
}

fn load_workflow(connection: &mut PgConnection, row: WorkflowRow) -> StoreResult<Workflow> {
    let step_rows = workflow_steps::table
        .filter(workflow_steps::workflow_id.eq(row.id))
        .order(workflow_steps::position.asc())
        .select(WorkflowStepRow::as_select())
        .load::<WorkflowStepRow>(connection)?;
    let steps = step_rows
        .into_iter()
        .map(row_to_step)
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Workflow::from_persisted(PersistedWorkflowData {
        id: WorkflowId::from_uuid(row.id),
        request_id: RequestId::from_uuid(row.request_id),
        request_type: RequestType::try_from(row.request_type.as_str()).map_err(invalid)?,
        state: WorkflowState::try_from(row.state.as_str()).map_err(invalid)?,
        steps,
        created: row.created,
        completed: row.completed,
        terminated_by: row.terminated_by.map(PersonId::from_uuid),
    }))
}

fn load_second_opinion(
    connection: &mut PgConnection,
    row: SecondOpinionRow,
) -> StoreResult<SecondOpinion> {
    let response_rows = second_opinion_responses::table
        .filter(second_opinion_responses::second_opinion_id.eq(row.id))
        .order(second_opinion_responses::position.asc())
        .select(ResponseRow::as_select())
        .load::<ResponseRow>(connection)?;
    let responses = response_rows
        .into_iter()
        .map(row_to_response)
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(SecondOpinion::from_persisted(PersistedSecondOpinionData {
        id: SecondOpinionId::from_uuid(row.id),
        request_id: RequestId::from_uuid(row.request_id),
        title: row.title,
        description: row.description,
        created_by: PersonId::from_uuid(row.created_by),
        created_at: row.created_at,
        responses,
    }))
}

fn request_to_row(request: &Request) -> StoreResult<RequestRow> {
    Ok(RequestRow {
        id: request.id().into_inner(),
        number: i64::try_from(request.number().value()).map_err(invalid)?,
        request_type: request.request_type().as_str().to_owned(),
        sub_type: request.sub_type().as_str().to_owned(),
        state: request.state().map(|state| state.as_str().to_owned()),
        is_draft: request.is_draft(),
        assigned_department: request.assigned_department().map(str::to_owned),
        correlation_id: request.correlation_id().map(CorrelationId::into_inner),
        org_position_id: request.org_position_id().map(OrgPositionId::into_inner),
        created_by: request.created_by().into_inner(),
        proposal: serde_json::to_value(request.proposal()).map_err(StoreError::persistence)?,
        provisioning: serde_json::to_value(request.provisioning())
            .map_err(StoreError::persistence)?,
        version: i64::try_from(request.version()).map_err(invalid)?,
        created_at: request.created_at(),
        updated_at: request.updated_at(),
    })
}

fn row_to_request(row: RequestRow) -> StoreResult<Request> {
    let number = u64::try_from(row.number).map_err(invalid)?;
    Ok(Request::from_persisted(PersistedRequestData {
        id: RequestId::from_uuid(row.id),
        number: RequestNumber::new(number).map_err(invalid)?,
        request_type: RequestType::try_from(row.request_type.as_str()).map_err(invalid)?,
        sub_type: SubType::new(row.sub_type).map_err(invalid)?,
        state: row.state.map(StepId::new).transpose().map_err(invalid)?,
        is_draft: row.is_draft,
        assigned_department: row.assigned_department,
        correlation_id: row.correlation_id.map(CorrelationId::from_uuid),
        org_position_id: row.org_position_id.map(OrgPositionId::from_uuid),
        created_by: PersonId::from_uuid(row.created_by),
        proposal: serde_json::from_value(row.proposal).map_err(invalid)?,
        provisioning: serde_json::from_value(row.provisioning).map_err(invalid)?,
        version: u64::try_from(row.version).map_err(invalid)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn workflow_to_row(workflow: &Workflow) -> WorkflowRow {
    WorkflowRow {
        id: workflow.id().into_inner(),
        request_id: workflow.request_id().into_inner(),
        request_type: workflow.request_type().as_str().to_owned(),
        state: workflow.state().as_str().to_owned(),
        created: workflow.created(),
        completed: workflow.completed(),
        terminated_by: workflow.terminated_by().map(PersonId::into_inner),
    }
}

fn step_to_row(
    workflow_id: WorkflowId,
    position: usize,
    step: &WorkflowStep,
) -> StoreResult<WorkflowStepRow> {
    Ok(WorkflowStepRow {
        workflow_id: workflow_id.into_inner(),
        step_id: step.id.as_str().to_owned(),
        position: i32::try_from(position).map_err(invalid)?,
        name: step.name.clone(),
        description: step.description.clone(),
        state: step.state.as_str().to_owned(),
        previous_step: step.previous_step.as_ref().map(|id| id.as_str().to_owned()),
        next_step: step.next_step.as_ref().map(|id| id.as_str().to_owned()),
        due_in_days: step
            .due_in_days
            .map(i32::try_from)
            .transpose()
            .map_err(invalid)?,
        started: step.started,
        completed: step.completed,
        completed_by: step.completed_by.map(PersonId::into_inner),
        due_date: step.due_date,
        reason: step.reason.clone(),
    })
}

fn row_to_step(row: WorkflowStepRow) -> StoreResult<WorkflowStep> {
    Ok(WorkflowStep {
        id: StepId::new(row.step_id).map_err(invalid)?,
        name: row.name,
        description: row.description,
        state: StepState::try_from(row.state.as_str()).map_err(invalid)?,
        previous_step: row.previous_step.map(StepId::new).transpose().map_err(invalid)?,
        next_step: row.next_step.map(StepId::new).transpose().map_err(invalid)?,
        due_in_days: row.due_in_days.map(u32::try_from).transpose().map_err(invalid)?,
        started: row.started,
        completed: row.completed,
        completed_by: row.completed_by.map(PersonId::from_uuid),
        due_date: row.due_date,
        reason: row.reason,
    })
}

fn action_to_row(action: &Action) -> StoreResult<ActionRow> {
    Ok(ActionRow {
        id: action.id().into_inner(),
        request_id: action.request_id().into_inner(),
        title: action.title().to_owned(),
        body: action.body().map(str::to_owned),
        action_type: action.action_type().to_owned(),
        sub_type: action.sub_type().map(str::to_owned),
        source: action.source().as_str().to_owned(),
        responsible: action.responsible().as_str().to_owned(),
        is_required: action.is_required(),
        is_resolved: action.is_resolved(),
        resolved_at: action.resolved_at(),
        resolved_by: action.resolved_by().map(PersonId::into_inner),
        sent_by: action.sent_by().into_inner(),
        properties: serde_json::to_value(action.properties()).map_err(StoreError::persistence)?,
        created_at: action.created_at(),
        updated_at: action.updated_at(),
    })
}

fn row_to_action(row: ActionRow) -> StoreResult<Action> {
    Ok(Action::from_persisted(PersistedActionData {
        id: ActionId::from_uuid(row.id),
        request_id: RequestId::from_uuid(row.request_id),
        title: row.title,
        body: row.body,
        action_type: row.action_type,
        sub_type: row.sub_type,
        source: Party::try_from(row.source.as_str()).map_err(invalid)?,
        responsible: Responsible::try_from(row.responsible.as_str()).map_err(invalid)?,
        is_required: row.is_required,
        is_resolved: row.is_resolved,
        resolved_at: row.resolved_at,
        resolved_by: row.resolved_by.map(PersonId::from_uuid),
        sent_by: PersonId::from_uuid(row.sent_by),
        properties: serde_json::from_value(row.properties).map_err(invalid)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn second_opinion_to_row(opinion: &SecondOpinion) -> SecondOpinionRow {
    SecondOpinionRow {
        id: opinion.id().into_inner(),
        request_id: opinion.request_id().into_inner(),
        title: opinion.title().to_owned(),
        description: opinion.description().map(str::to_owned),
        created_by: opinion.created_by().into_inner(),
        created_at: opinion.created_at(),
    }
}

fn response_to_row(position: usize, response: &SecondOpinionResponse) -> StoreResult<ResponseRow> {
    Ok(ResponseRow {
        id: response.id().into_inner(),
        second_opinion_id: response.second_opinion_id().into_inner(),
        position: i32::try_from(position).map_err(invalid)?,
        assigned_to: response.assigned_to().into_inner(),
        created_at: response.created_at(),
        answered_at: response.answered_at(),
        comment: response.stored_comment().map(str::to_owned),
        state: response.state().as_str().to_owned(),
    })
}

fn row_to_response(row: ResponseRow) -> StoreResult<SecondOpinionResponse> {
    Ok(SecondOpinionResponse::from_persisted(PersistedResponseData {
        id: ResponseId::from_uuid(row.id),
        second_opinion_id: SecondOpinionId::from_uuid(row.second_opinion_id),
        assigned_to: PersonId::from_uuid(row.assigned_to),
        created_at: row.created_at,
        answered_at: row.answered_at,
        comment: row.comment,
        state: ResponseState::try_from(row.state.as_str()).map_err(invalid)?,
    }))
}

fn share_to_row(share: &SharedRequest) -> ShareRow {
    ShareRow {
        id: share.id().into_inner(),
        request_id: share.request_id().into_inner(),
        shared_with: share.shared_with().into_inner(),
        shared_by: share.shared_by().into_inner(),
        scope: share.scope().to_owned(),
        source: share.source().as_str().to_owned(),
        reason: share.reason().map(str::to_owned),
        granted_at: share.granted_at(),
        is_revoked: share.is_revoked(),
        revoked_at: share.revoked_at(),
    }
}

fn row_to_share(row: ShareRow) -> StoreResult<SharedRequest> {
    Ok(SharedRequest::from_persisted(PersistedShareData {
        id: ShareId::from_uuid(row.id),
        request_id: RequestId::from_uuid(row.request_id),
        shared_with: PersonId::from_uuid(row.shared_with),
        shared_by: PersonId::from_uuid(row.shared_by),
        scope: row.scope,
        source: ShareSource::try_from(row.source.as_str()).map_err(invalid)?,
        reason: row.reason,
        granted_at: row.granted_at,
        is_revoked: row.is_revoked,
        revoked_at: row.revoked_at,
    }))
}

fn invalid(err: impl Display) -> StoreError {
    StoreError::InvalidPersistedData(err.to_string())
}

fn foreign_key_to_not_found(err: DieselError, request_id: RequestId) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            StoreError::RequestNotFound(request_id)
        }
        _ => StoreError::persistence(err),
    }
}

fn is_workflow_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == WORKFLOW_UNIQUE_CONSTRAINT)
}
