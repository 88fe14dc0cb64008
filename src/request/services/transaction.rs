//! Dual-transaction coordination between the store and the notification
//! sink.
//!
//! The store always commits first. A notification lost after the store
//! committed can be replayed from state; a notification for state that never
//! committed cannot be taken back.

use super::{LifecycleError, LifecycleResult, PartialCommitError};
use crate::request::{
    domain::RequestId,
    ports::{NotificationSink, NotificationTransaction, RequestStore, StoreTransaction},
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Runs units of work across the store and the notification sink with
/// all-or-nothing semantics up to the store commit.
pub struct TransactionCoordinator<S, N>
where
    S: RequestStore,
    N: NotificationSink,
{
    store: Arc<S>,
    sink: Arc<N>,
}

impl<S, N> Clone for TransactionCoordinator<S, N>
where
    S: RequestStore,
    N: NotificationSink,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S, N> TransactionCoordinator<S, N>
where
    S: RequestStore,
    N: NotificationSink,
{
    /// Creates a coordinator over `store` and `sink`.
    #[must_use]
    pub const fn new(store: Arc<S>, sink: Arc<N>) -> Self {
        Self { store, sink }
    }

    /// Returns the underlying store for reads.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `db_work` and `notify_work` atomically.
    ///
    /// Both transactions are opened before either closure runs. When either
    /// closure fails, both transactions are rolled back and nothing becomes
    /// observable. Otherwise the store commits, then the sink commits.
    ///
    /// # Errors
    ///
    /// Returns the closure's error when a unit of work fails,
    /// [`LifecycleError::Store`] when the store commit fails (the sink is
    /// rolled back), and [`LifecycleError::PartialCommit`] when the sink
    /// commit fails after the store committed.
    pub async fn run_atomically<T, D, W>(&self, db_work: D, notify_work: W) -> LifecycleResult<T>
    where
        D: FnOnce(&mut StoreTransaction) -> LifecycleResult<T>,
        W: FnOnce(&T, &mut NotificationTransaction) -> LifecycleResult<()>,
    {
        let mut store_tx = self.store.begin().await?;
        debug!(transaction = %store_tx.id(), "store transaction opened");
        let mut notify_tx = match self.sink.begin_transaction().await {
            Ok(transaction) => transaction,
            Err(err) => {
                self.rollback_store(store_tx).await;
                return Err(err.into());
            }
        };
        debug!(transaction = %notify_tx.id(), "notification transaction opened");

        let outcome = db_work(&mut store_tx)
            .and_then(|value| notify_work(&value, &mut notify_tx).map(|()| value));
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                self.rollback_both(store_tx, notify_tx).await;
                return Err(err);
            }
        };

        let store_tx_id = store_tx.id();
        if let Err(err) = self.store.commit(store_tx).await {
            debug!(transaction = %store_tx_id, error = %err, "store commit failed");
            self.rollback_sink(notify_tx).await;
            return Err(err.into());
        }
        debug!(transaction = %store_tx_id, "store transaction committed");

        let notify_tx_id = notify_tx.id();
        if let Err(err) = self.sink.commit(notify_tx).await {
            error!(
                store_transaction = %store_tx_id,
                notification_transaction = %notify_tx_id,
                error = %err,
                "store committed but notifications were not delivered"
            );
            return Err(LifecycleError::PartialCommit(PartialCommitError {
                store_transaction: store_tx_id,
                notification_transaction: notify_tx_id,
                source: err,
            }));
        }
        debug!(transaction = %notify_tx_id, "notification transaction committed");
        Ok(value)
    }

    async fn rollback_both(&self, store_tx: StoreTransaction, notify_tx: NotificationTransaction) {
        self.rollback_sink(notify_tx).await;
        self.rollback_store(store_tx).await;
    }

    async fn rollback_store(&self, transaction: StoreTransaction) {
        let id = transaction.id();
        match self.store.rollback(transaction).await {
            Ok(()) => debug!(transaction = %id, "store transaction rolled back"),
            Err(err) => warn!(transaction = %id, error = %err, "store rollback failed"),
        }
    }

    async fn rollback_sink(&self, transaction: NotificationTransaction) {
        let id = transaction.id();
        match self.sink.rollback(transaction).await {
            Ok(()) => debug!(transaction = %id, "notification transaction rolled back"),
            Err(err) => warn!(transaction = %id, error = %err, "notification rollback failed"),
        }
    }
}

/// Re-runs `operation` while it fails with a version conflict.
///
/// Each attempt must re-read the state it acts on. After `max_retries`
/// retries the conflict surfaces as [`LifecycleError::Conflict`].
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    request_id: RequestId,
    max_retries: u32,
    mut operation: F,
) -> LifecycleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LifecycleResult<T>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match operation().await {
            Err(err) if err.is_retryable_conflict() => {
                if attempts > max_retries {
                    warn!(%request_id, attempts, "giving up after repeated version conflicts");
                    return Err(LifecycleError::Conflict {
                        request_id,
                        attempts,
                    });
                }
                warn!(%request_id, attempts, "version conflict, retrying against fresh state");
            }
            outcome => return outcome,
        }
    }
}
