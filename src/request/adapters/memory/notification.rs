//! In-memory notification sink that records its transaction calls.

use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::request::{
    domain::RequestEvent,
    ports::{NotificationError, NotificationResult, NotificationSink, NotificationTransaction},
};

/// Call made against the sink, in order of arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    /// A transaction was opened.
    Begin(Uuid),
    /// A transaction was committed.
    Commit(Uuid),
    /// A transaction was rolled back.
    Rollback(Uuid),
}

/// Thread-safe in-memory notification sink.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<SinkState>>,
}

#[derive(Debug, Default)]
struct SinkState {
    calls: Vec<SinkCall>,
    published: Vec<RequestEvent>,
    failing_begins: u32,
    failing_commits: u32,
}

impl InMemoryNotificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call made against the sink.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn calls(&self) -> NotificationResult<Vec<SinkCall>> {
        Ok(self.read()?.calls.clone())
    }

    /// Returns every event published by committed transactions.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn published_events(&self) -> NotificationResult<Vec<RequestEvent>> {
        Ok(self.read()?.published.clone())
    }

    /// Returns how many transactions were committed.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn commit_count(&self) -> NotificationResult<usize> {
        self.count(|call| matches!(call, SinkCall::Commit(_)))
    }

    /// Returns how many transactions were rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn rollback_count(&self) -> NotificationResult<usize> {
        self.count(|call| matches!(call, SinkCall::Rollback(_)))
    }

    /// Makes the next `count` commits fail.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn fail_next_commits(&self, count: u32) -> NotificationResult<()> {
        self.write()?.failing_commits = count;
        Ok(())
    }

    /// Makes the next `count` transaction openings fail.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] when the lock is poisoned.
    pub fn fail_next_begins(&self, count: u32) -> NotificationResult<()> {
        self.write()?.failing_begins = count;
        Ok(())
    }

    fn count(&self, predicate: impl Fn(&SinkCall) -> bool) -> NotificationResult<usize> {
        Ok(self.read()?.calls.iter().filter(|call| predicate(call)).count())
    }

    fn read(&self) -> NotificationResult<RwLockReadGuard<'_, SinkState>> {
        self.state
            .read()
            .map_err(|err| NotificationError::transport(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> NotificationResult<RwLockWriteGuard<'_, SinkState>> {
        self.state
            .write()
            .map_err(|err| NotificationError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn begin_transaction(&self) -> NotificationResult<NotificationTransaction> {
        let mut state = self.write()?;
        if state.failing_begins > 0 {
            state.failing_begins -= 1;
            return Err(NotificationError::transport(std::io::Error::other(
                "injected begin failure",
            )));
        }
        let transaction = NotificationTransaction::new();
        state.calls.push(SinkCall::Begin(transaction.id()));
        Ok(transaction)
    }

    async fn commit(&self, transaction: NotificationTransaction) -> NotificationResult<()> {
        let mut state = self.write()?;
        let transaction_id = transaction.id();
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(NotificationError::Rejected {
                transaction_id,
                reason: "injected commit failure".to_owned(),
            });
        }
        state.calls.push(SinkCall::Commit(transaction_id));
        state.published.extend(transaction.into_events());
        Ok(())
    }

    async fn rollback(&self, transaction: NotificationTransaction) -> NotificationResult<()> {
        self.write()?.calls.push(SinkCall::Rollback(transaction.id()));
        Ok(())
    }
}
