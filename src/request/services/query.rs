//! Read-only queries. Nothing here writes to the store.

use super::{
    LifecycleResult,
    lookup::{load_request, load_workflow},
};
use crate::request::{
    domain::{Action, PersonId, RequestId, RequestView, SecondOpinionView, Workflow},
    ports::RequestStore,
};
use std::sync::Arc;

/// Audience of a request projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Callers allowed to see proposals at every stage.
    Internal,
    /// Callers subject to the public proposal-masking rule.
    Public,
}

/// Serves the query operations of the request lifecycle.
pub struct RequestQueryService<S>
where
    S: RequestStore,
{
    store: Arc<S>,
}

impl<S> RequestQueryService<S>
where
    S: RequestStore,
{
    /// Creates a query service reading from `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns a request projected for `audience`.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] for unknown
    /// requests.
    pub async fn get_request(
        &self,
        request_id: RequestId,
        audience: Audience,
    ) -> LifecycleResult<RequestView> {
        let request = load_request(&*self.store, request_id).await?;
        Ok(match audience {
            Audience::Internal => RequestView::internal(&request),
            Audience::Public => RequestView::public(&request),
        })
    }

    /// Returns the workflow of a request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::request::domain::InvalidWorkflowError::NotInitialized`]
    /// when the request has no workflow.
    pub async fn get_workflow(&self, request_id: RequestId) -> LifecycleResult<Workflow> {
        load_workflow(&*self.store, request_id).await
    }

    /// Returns the actions of a request in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] for unknown
    /// requests.
    pub async fn get_actions(&self, request_id: RequestId) -> LifecycleResult<Vec<Action>> {
        load_request(&*self.store, request_id).await?;
        Ok(self.store.list_actions(request_id).await?)
    }

    /// Returns the second opinions of a request as seen by `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`super::LifecycleError::RequestNotFound`] for unknown
    /// requests.
    pub async fn get_second_opinions(
        &self,
        request_id: RequestId,
        reader: PersonId,
    ) -> LifecycleResult<Vec<SecondOpinionView>> {
        load_request(&*self.store, request_id).await?;
        let opinions = self.store.list_second_opinions(request_id).await?;
        Ok(opinions
            .iter()
            .map(|opinion| SecondOpinionView::for_reader(opinion, reader))
            .collect())
    }
}
