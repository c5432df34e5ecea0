//! Remote collaborators reached over HTTP.

pub mod edge_cache;
pub mod traits;
pub mod webhook;

pub use edge_cache::EdgeCacheClient;
pub use traits::{CommitDispatcher, QueueCacheWriter, TransactionSource};
pub use webhook::WebhookDispatcher;
