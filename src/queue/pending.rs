//! Pending queue: in-process working copy of the remote pending list.
//!
//! Shared (via `Arc`) by the sync loop, which replaces it every cycle, and the
//! commit path, which removes committed transactions and pushes the result to
//! the cache. Both mutations run under one async mutex that is held across the
//! cache write, so a remove-and-write is a single critical section.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::CacheWriteError;
use crate::remote::QueueCacheWriter;
use crate::transaction::Transaction;

#[derive(Default)]
struct QueueState {
    pending: Vec<Transaction>,
    /// Committed downstream, but the cache write dropping them failed.
    unsynced: HashSet<String>,
}

pub struct PendingQueue {
    writer: Arc<dyn QueueCacheWriter>,
    state: Mutex<QueueState>,
}

impl PendingQueue {
    pub fn new(writer: Arc<dyn QueueCacheWriter>) -> Arc<Self> {
        Arc::new(Self {
            writer,
            state: Mutex::new(QueueState::default()),
        })
    }

    /// Replace the working copy with a freshly fetched list.
    ///
    /// Transactions already committed but still present remotely (an earlier
    /// cache write failed) are filtered out and the cache write is retried.
    /// Returns the transactions that are genuinely pending, in fetch order.
    pub async fn replace(&self, fetched: Vec<Transaction>) -> Vec<Transaction> {
        let mut state = self.state.lock().await;

        let fetched_ids: HashSet<&str> = fetched.iter().map(|t| t.uuid.as_str()).collect();
        // Anything unsynced that the source no longer returns is gone remotely.
        state.unsynced.retain(|uuid| fetched_ids.contains(uuid.as_str()));

        let pending: Vec<Transaction> = fetched
            .into_iter()
            .filter(|t| !state.unsynced.contains(&t.uuid))
            .collect();

        if !state.unsynced.is_empty() {
            let count = state.unsynced.len();
            warn!(count, "Retrying cache sync for committed transactions still listed as pending");
            match self.writer.write_pending(&pending).await {
                Ok(()) => {
                    info!(count, "Deferred cache sync succeeded");
                    state.unsynced.clear();
                }
                Err(e) => error!(count, "Deferred cache sync failed: {e}"),
            }
        }

        state.pending = pending.clone();
        pending
    }

    /// Drop a committed transaction and overwrite the cache with what remains.
    ///
    /// Idempotent: resolving an absent uuid rewrites the current list. The
    /// in-process copy drops the transaction even if the write fails; the
    /// write is then retried on the next [`replace`](Self::replace).
    pub async fn resolve(&self, uuid: &str) -> Result<(), CacheWriteError> {
        let mut state = self.state.lock().await;

        let remaining: Vec<Transaction> = state
            .pending
            .iter()
            .filter(|t| t.uuid != uuid)
            .cloned()
            .collect();

        let result = self.writer.write_pending(&remaining).await;
        state.pending = remaining;

        match result {
            // The list just written excludes every unsynced uuid too.
            Ok(()) => {
                state.unsynced.clear();
                Ok(())
            }
            Err(e) => {
                error!(uuid, "Cache write after commit failed: {e}");
                state.unsynced.insert(uuid.to_string());
                Err(e)
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<Transaction> {
        self.state.lock().await.pending.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Committed transactions whose removal has not reached the cache yet.
    pub async fn unsynced(&self) -> Vec<String> {
        self.state.lock().await.unsynced.iter().cloned().collect()
    }
}
