//! CLI-specific error types and exit code mapping

use shelfshare_core::error::ShelfShareError;
use shelfshare_favorites::FavoritesError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The Remote Store did not answer the health check.
    #[error("remote store not reachable: {0}")]
    RemoteUnavailable(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Favorites operation failed.
    #[error("favorites error: {0}")]
    Favorites(#[from] FavoritesError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Remote Store unreachable (health)|
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Favorites(FavoritesError::Config { .. }) => 2,
            Self::RemoteUnavailable(_) => 3,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Favorites(_) => 1,
        }
    }
}

impl From<ShelfShareError> for CliError {
    fn from(e: ShelfShareError) -> Self {
        match e {
            ShelfShareError::Config(e) => Self::Config(e.to_string()),
            ShelfShareError::Io(e) => Self::Io(e),
            other => Self::Command(other.to_string()),
        }
    }
}
