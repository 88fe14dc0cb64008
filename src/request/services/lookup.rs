//! Shared aggregate loading for services.

use super::{LifecycleError, LifecycleResult};
use crate::request::{
    domain::{
        InvalidWorkflowError, PersonId, Request, RequestId, ValidationError, Workflow,
        WorkflowTemplate, WorkflowTemplateCatalog,
    },
    ports::{ProfileResolver, RequestStore},
};

pub(crate) async fn load_request<S>(store: &S, id: RequestId) -> LifecycleResult<Request>
where
    S: RequestStore + ?Sized,
{
    store
        .find_request(id)
        .await?
        .ok_or(LifecycleError::RequestNotFound(id))
}

pub(crate) async fn load_workflow<S>(store: &S, request_id: RequestId) -> LifecycleResult<Workflow>
where
    S: RequestStore + ?Sized,
{
    store
        .find_workflow(request_id)
        .await?
        .ok_or_else(|| InvalidWorkflowError::NotInitialized(request_id).into())
}

pub(crate) fn resolve_template<'a>(
    catalog: &'a WorkflowTemplateCatalog,
    request: &Request,
) -> Result<&'a WorkflowTemplate, InvalidWorkflowError> {
    catalog
        .resolve(request.request_type(), request.sub_type())
        .ok_or_else(|| InvalidWorkflowError::TemplateNotFound {
            request_type: request.request_type(),
            sub_type: request.sub_type().clone(),
        })
}

pub(crate) async fn ensure_person<P>(profiles: &P, person_id: PersonId) -> LifecycleResult<()>
where
    P: ProfileResolver + ?Sized,
{
    match profiles.resolve_person(person_id).await? {
        Some(_) => Ok(()),
        None => Err(ValidationError::UnknownPerson(person_id).into()),
    }
}
