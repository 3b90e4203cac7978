//! Error types shared across the workspace.

/// Top-level ShelfShare error.
#[derive(Debug, thiserror::Error)]
pub enum ShelfShareError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Input rejected before any I/O
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Remote Store request failed
    #[error("remote error: {0}")]
    Remote(String),

    /// No authenticated user for an operation that needs one
    #[error("not authenticated")]
    Unauthenticated,

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is out of range or malformed
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required identifier was empty or whitespace
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// An identifier exceeded the maximum length
    #[error("{field} too long: {len} bytes (max: {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
