//! Transaction triage bot: categorize pending transactions over chat.

pub mod channels;
pub mod config;
pub mod error;
pub mod queue;
pub mod remote;
pub mod sync;
pub mod transaction;
pub mod triage;
