//! Pending-transaction queue shared by the sync loop and the commit path.

pub mod pending;

pub use pending::PendingQueue;
