//! Favorites error type.
//!
//! [`FavoritesError`] converts into [`ShelfShareError`] so callers above this
//! crate can propagate with `?`.

use shelfshare_core::error::{ConfigError, ShelfShareError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    /// Identifier rejected before any I/O
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation needs a logged-in user
    #[error("not authenticated: log in before changing favorites")]
    Unauthenticated,

    /// Connection refused, DNS failure, reset, ...
    #[error("remote store unreachable: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("remote store timed out: {0}")]
    Timeout(String),

    /// Non-2xx response
    #[error("remote store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx response with `success: false`
    #[error("remote store rejected request: {0}")]
    Rejected(String),

    /// Body could not be decoded, or a toggle reported no usable action
    #[error("malformed remote response: {0}")]
    MalformedResponse(String),

    #[error("config error: {field}: {reason}")]
    Config { field: String, reason: String },
}

impl FavoritesError {
    /// Whether the error means "the Remote Store could not serve this
    /// request", which triggers the local cache fallback.
    ///
    /// Malformed responses are not remote failures: the store answered, but
    /// with something the controller refuses to apply.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Http { .. } | Self::Rejected(_)
        )
    }
}

impl From<FavoritesError> for ShelfShareError {
    fn from(err: FavoritesError) -> Self {
        match err {
            FavoritesError::Validation(e) => ShelfShareError::Validation(e),
            FavoritesError::Unauthenticated => ShelfShareError::Unauthenticated,
            FavoritesError::Config { field, reason } => {
                ShelfShareError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => ShelfShareError::Remote(other.to_string()),
        }
    }
}
