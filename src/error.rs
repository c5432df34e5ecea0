//! Error types for the triage bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Cache write error: {0}")]
    CacheWrite(#[from] CacheWriteError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Triage error: {0}")]
    Triage(#[from] TriageError),
}

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Fetching the pending list from the transaction source failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Transaction source unreachable: {0}")]
    Transport(String),

    #[error("Transaction source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed transaction list: {0}")]
    Malformed(String),
}

/// The downstream commit endpoint rejected or never received a transaction.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Commit endpoint unreachable: {0}")]
    Transport(String),

    #[error("Commit endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Overwriting the remote pending list failed.
#[derive(Debug, thiserror::Error)]
pub enum CacheWriteError {
    #[error("Cache endpoint unreachable: {0}")]
    Transport(String),

    #[error("Cache endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Chat-surface errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send prompt on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to edit prompt {prompt_id} on channel {name}: {reason}")]
    EditFailed {
        name: String,
        prompt_id: String,
        reason: String,
    },
}

/// Rejections raised by a categorization state machine.
///
/// None of these are shown to the operator; the engine logs and drops them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    #[error("Interaction on prompt {prompt_id} is stale (state: {state})")]
    StaleInteraction { prompt_id: String, state: String },

    #[error("Option {value:?} is not offered in state {state}")]
    InvalidOption { value: String, state: String },

    #[error("Remarks must not be empty")]
    EmptyRemark,

    #[error("Subcategory {subcategory:?} does not belong to {category}")]
    UnknownSubcategory {
        category: String,
        subcategory: String,
    },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
