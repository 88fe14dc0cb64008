//! Diesel row models for request lifecycle persistence.

use super::schema::{
    actions, requests, second_opinion_responses, second_opinions, shared_requests,
    workflow_steps, workflows,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Request row, used for reads, inserts and versioned updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct RequestRow {
    /// Request identifier.
    pub id: Uuid,
    /// Request number.
    pub number: i64,
    /// Request type.
    pub request_type: String,
    /// Request sub type.
    pub sub_type: String,
    /// Workflow state name.
    pub state: Option<String>,
    /// Draft flag.
    pub is_draft: bool,
    /// Department routing.
    pub assigned_department: Option<String>,
    /// Batch correlation identifier.
    pub correlation_id: Option<Uuid>,
    /// Target position.
    pub org_position_id: Option<Uuid>,
    /// Creator.
    pub created_by: Uuid,
    /// Proposal payload.
    pub proposal: Value,
    /// Provisioning payload.
    pub provisioning: Value,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Workflow row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct WorkflowRow {
    /// Workflow identifier.
    pub id: Uuid,
    /// Owning request.
    pub request_id: Uuid,
    /// Request type.
    pub request_type: String,
    /// Workflow state.
    pub state: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Completion timestamp.
    pub completed: Option<DateTime<Utc>>,
    /// Terminating person.
    pub terminated_by: Option<Uuid>,
}

/// Workflow step row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflow_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowStepRow {
    /// Owning workflow.
    pub workflow_id: Uuid,
    /// Step identifier.
    pub step_id: String,
    /// Template order.
    pub position: i32,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Step state.
    pub state: String,
    /// Previous step.
    pub previous_step: Option<String>,
    /// Next step.
    pub next_step: Option<String>,
    /// Days the step may stay open.
    pub due_in_days: Option<i32>,
    /// Start timestamp.
    pub started: Option<DateTime<Utc>>,
    /// Decision timestamp.
    pub completed: Option<DateTime<Utc>>,
    /// Decider.
    pub completed_by: Option<Uuid>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Rejection or skip reason.
    pub reason: Option<String>,
}

/// Action row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = actions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ActionRow {
    /// Action identifier.
    pub id: Uuid,
    /// Owning request.
    pub request_id: Uuid,
    /// Title.
    pub title: String,
    /// Body.
    pub body: Option<String>,
    /// Action type.
    pub action_type: String,
    /// Action sub type.
    pub sub_type: Option<String>,
    /// Creating party.
    pub source: String,
    /// Responsible party.
    pub responsible: String,
    /// Required flag.
    pub is_required: bool,
    /// Resolution flag.
    pub is_resolved: bool,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Resolver.
    pub resolved_by: Option<Uuid>,
    /// Sender.
    pub sent_by: Uuid,
    /// Properties payload.
    pub properties: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Second-opinion row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = second_opinions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct SecondOpinionRow {
    /// Second-opinion identifier.
    pub id: Uuid,
    /// Owning request.
    pub request_id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Creator.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Second-opinion response row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = second_opinion_responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResponseRow {
    /// Response identifier.
    pub id: Uuid,
    /// Owning second opinion.
    pub second_opinion_id: Uuid,
    /// Assignment order.
    pub position: i32,
    /// Assigned reviewer.
    pub assigned_to: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Publication timestamp.
    pub answered_at: Option<DateTime<Utc>>,
    /// Comment.
    pub comment: Option<String>,
    /// Response state.
    pub state: String,
}

/// Sharing grant row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = shared_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ShareRow {
    /// Grant identifier.
    pub id: Uuid,
    /// Shared request.
    pub request_id: Uuid,
    /// Person receiving visibility.
    pub shared_with: Uuid,
    /// Granting person.
    pub shared_by: Uuid,
    /// Scope.
    pub scope: String,
    /// Origin.
    pub source: String,
    /// Justification.
    pub reason: Option<String>,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
    /// Revocation flag.
    pub is_revoked: bool,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Result row of the request-number sequence.
#[derive(Debug, Clone, QueryableByName)]
pub struct NextNumberRow {
    /// Allocated value.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub value: i64,
}
