//! Diesel schema for request lifecycle persistence.

diesel::table! {
    /// Resource-allocation requests with embedded proposal and provisioning
    /// data.
    requests (id) {
        /// Request identifier.
        id -> Uuid,
        /// Human-facing request number.
        number -> Int8,
        /// Request type.
        #[max_length = 50]
        request_type -> Varchar,
        /// Request sub type.
        #[max_length = 100]
        sub_type -> Varchar,
        /// Current workflow state name.
        #[max_length = 100]
        state -> Nullable<Varchar>,
        /// Draft flag.
        is_draft -> Bool,
        /// Department routing.
        #[max_length = 255]
        assigned_department -> Nullable<Varchar>,
        /// Batch correlation identifier.
        correlation_id -> Nullable<Uuid>,
        /// Target org-chart position.
        org_position_id -> Nullable<Uuid>,
        /// Creator.
        created_by -> Uuid,
        /// Embedded proposal payload.
        proposal -> Jsonb,
        /// Embedded provisioning status payload.
        provisioning -> Jsonb,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Workflow instances, at most one per request and request type.
    workflows (id) {
        /// Workflow identifier.
        id -> Uuid,
        /// Owning request.
        request_id -> Uuid,
        /// Request type the workflow was created for.
        #[max_length = 50]
        request_type -> Varchar,
        /// Workflow state.
        #[max_length = 50]
        state -> Varchar,
        /// Creation timestamp.
        created -> Timestamptz,
        /// Completion or termination timestamp.
        completed -> Nullable<Timestamptz>,
        /// Person who terminated the workflow.
        terminated_by -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// Workflow steps keyed by workflow and step identifier.
    workflow_steps (workflow_id, step_id) {
        /// Owning workflow.
        workflow_id -> Uuid,
        /// Step identifier.
        #[max_length = 100]
        step_id -> Varchar,
        /// Template order.
        position -> Int4,
        /// Display name.
        #[max_length = 255]
        name -> Varchar,
        /// Optional description.
        description -> Nullable<Text>,
        /// Step state.
        #[max_length = 50]
        state -> Varchar,
        /// Previous step.
        #[max_length = 100]
        previous_step -> Nullable<Varchar>,
        /// Next step.
        #[max_length = 100]
        next_step -> Nullable<Varchar>,
        /// Days the step may stay open.
        due_in_days -> Nullable<Int4>,
        /// When the step became current.
        started -> Nullable<Timestamptz>,
        /// When the step was decided.
        completed -> Nullable<Timestamptz>,
        /// Who decided the step.
        completed_by -> Nullable<Uuid>,
        /// Due date.
        due_date -> Nullable<Timestamptz>,
        /// Rejection or skip reason.
        reason -> Nullable<Text>,
    }
}

diesel::table! {
    /// Actions (tasks) attached to requests.
    actions (id) {
        /// Action identifier.
        id -> Uuid,
        /// Owning request.
        request_id -> Uuid,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Body text.
        body -> Nullable<Text>,
        /// Action type.
        #[max_length = 100]
        action_type -> Varchar,
        /// Action sub type.
        #[max_length = 100]
        sub_type -> Nullable<Varchar>,
        /// Creating party.
        #[max_length = 50]
        source -> Varchar,
        /// Responsible party.
        #[max_length = 50]
        responsible -> Varchar,
        /// Required flag.
        is_required -> Bool,
        /// Resolution flag.
        is_resolved -> Bool,
        /// Resolution timestamp.
        resolved_at -> Nullable<Timestamptz>,
        /// Resolver.
        resolved_by -> Nullable<Uuid>,
        /// Sender.
        sent_by -> Uuid,
        /// Free-form properties.
        properties -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Second-opinion reviews attached to requests.
    second_opinions (id) {
        /// Second-opinion identifier.
        id -> Uuid,
        /// Owning request.
        request_id -> Uuid,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Description.
        description -> Nullable<Text>,
        /// Creator.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reviewer responses to second opinions.
    second_opinion_responses (id) {
        /// Response identifier.
        id -> Uuid,
        /// Owning second opinion.
        second_opinion_id -> Uuid,
        /// Assignment order.
        position -> Int4,
        /// Assigned reviewer.
        assigned_to -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Publication timestamp.
        answered_at -> Nullable<Timestamptz>,
        /// Reviewer comment.
        comment -> Nullable<Text>,
        /// Response state.
        #[max_length = 50]
        state -> Varchar,
    }
}

diesel::table! {
    /// Person-level sharing grants; never deleted, only revoked.
    shared_requests (id) {
        /// Grant identifier.
        id -> Uuid,
        /// Shared request.
        request_id -> Uuid,
        /// Person receiving visibility.
        shared_with -> Uuid,
        /// Person granting visibility.
        shared_by -> Uuid,
        /// Visibility scope.
        #[max_length = 100]
        scope -> Varchar,
        /// Grant origin.
        #[max_length = 50]
        source -> Varchar,
        /// Justification.
        reason -> Nullable<Text>,
        /// Grant timestamp.
        granted_at -> Timestamptz,
        /// Revocation flag.
        is_revoked -> Bool,
        /// Revocation timestamp.
        revoked_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(workflows -> requests (request_id));
diesel::joinable!(workflow_steps -> workflows (workflow_id));
diesel::joinable!(actions -> requests (request_id));
diesel::joinable!(second_opinions -> requests (request_id));
diesel::joinable!(second_opinion_responses -> second_opinions (second_opinion_id));

diesel::allow_tables_to_appear_in_same_query!(
    requests,
    workflows,
    workflow_steps,
    actions,
    second_opinions,
    second_opinion_responses,
    shared_requests,
);
