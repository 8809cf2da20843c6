//! Error types for Intake Assist.

/// Top-level error type for the triage service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Roster loading errors.
///
/// Only I/O and CSV-shape failures surface here. Rows that merely lack a
/// case label or attorney are skipped during index build, logged, never
/// propagated.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Failed to read roster file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed roster CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Roster is empty after filtering: {path}")]
    Empty { path: String },
}

/// Errors from the messaging-platform collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("API returned {status} for {endpoint}: {body}")]
    ApiStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response shape from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("No platform user found matching '{name}'")]
    UnknownAssignee { name: String },
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Conversation fetch failed: {0}")]
    Fetch(String),

    #[error("Assignment emit failed for conversation {conversation_id}: {reason}")]
    Emit {
        conversation_id: String,
        reason: String,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
