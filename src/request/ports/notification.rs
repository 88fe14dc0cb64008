//! Transactional notification sink port.

use crate::request::domain::RequestEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for notification sink operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Events staged for one atomic publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTransaction {
    id: Uuid,
    events: Vec<RequestEvent>,
}

impl NotificationTransaction {
    /// Opens an empty notification transaction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            events: Vec::new(),
        }
    }

    /// Returns the transaction identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Stages an event.
    pub fn publish(&mut self, event: RequestEvent) {
        self.events.push(event);
    }

    /// Returns the staged events in order.
    #[must_use]
    pub fn events(&self) -> &[RequestEvent] {
        &self.events
    }

    /// Consumes the transaction, returning its events.
    #[must_use]
    pub fn into_events(self) -> Vec<RequestEvent> {
        self.events
    }
}

impl Default for NotificationTransaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification and event system with transactional delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Opens a notification transaction.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when the sink is unavailable.
    async fn begin_transaction(&self) -> NotificationResult<NotificationTransaction>;

    /// Publishes every staged event.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when publication fails; nothing is
    /// delivered in that case.
    async fn commit(&self, transaction: NotificationTransaction) -> NotificationResult<()>;

    /// Discards every staged event.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when the sink is unavailable.
    async fn rollback(&self, transaction: NotificationTransaction) -> NotificationResult<()>;
}

/// Errors returned by notification sinks.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The sink refused the transaction.
    #[error("notification sink rejected transaction {transaction_id}: {reason}")]
    Rejected {
        /// Rejected transaction.
        transaction_id: Uuid,
        /// Rejection reason.
        reason: String,
    },

    /// Transport-layer failure.
    #[error("notification transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
