//! Periodic refresh of the pending queue.

pub mod queue_sync;

pub use queue_sync::{CycleReport, QueueSync};
