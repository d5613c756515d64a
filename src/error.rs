//! Error types for the mail relay.

/// Top-level error type, surfaced from startup and `main`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the mail transport (building or delivering a message).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("SMTP relay setup failed: {0}")]
    Setup(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Smtp(String),
}

/// Per-request failures of the relay handler.
///
/// Everything except `Transport` is a client error and is raised before any
/// send attempt.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Mail transport failed: {0}")]
    Transport(#[from] TransportError),
}

impl SendError {
    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SendError::Transport(_))
    }
}

/// Result type alias for startup paths.
pub type Result<T> = std::result::Result<T, Error>;
