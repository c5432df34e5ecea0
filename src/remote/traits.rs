//! Ports for the remote collaborators: the edge cache and the commit webhook.

use async_trait::async_trait;

use crate::error::{CacheWriteError, DispatchError, FetchError};
use crate::transaction::Transaction;

/// Source of the pending-transaction list.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch the full pending list, in source order.
    async fn fetch_pending(&self) -> Result<Vec<Transaction>, FetchError>;
}

/// Overwrites the remotely cached pending list.
#[async_trait]
pub trait QueueCacheWriter: Send + Sync {
    /// Replace the stored list with `pending` in one request.
    async fn write_pending(&self, pending: &[Transaction]) -> Result<(), CacheWriteError>;
}

/// Sends finalized transactions downstream.
#[async_trait]
pub trait CommitDispatcher: Send + Sync {
    /// Deliver a categorized transaction. Returns only once the endpoint accepted it.
    async fn dispatch(&self, transaction: &Transaction) -> Result<(), DispatchError>;
}
