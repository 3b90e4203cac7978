//! Favorites configuration.
//!
//! Derived from the core `[remote]` and `[cache]` sections, plus a few
//! client-only knobs that have no place in `shelfshare.toml`.
//!
//! ```ignore
//! use shelfshare_core::config::ShelfShareConfig;
//! use shelfshare_favorites::FavoritesConfig;
//!
//! let config = FavoritesConfig::from_core(&ShelfShareConfig::default());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelfshare_core::config::ShelfShareConfig;

use crate::error::FavoritesError;

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// API root the favorites paths are resolved against
    pub base_url: String,
    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,
    pub user_agent: String,
    /// File-backed cache when true, in-memory otherwise
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,

    // --- client-only ---
    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Error bodies longer than this are truncated in error messages
    pub max_error_body_bytes: usize,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self::from_core(&ShelfShareConfig::default())
    }
}

impl FavoritesConfig {
    pub fn from_core(core: &ShelfShareConfig) -> Self {
        Self {
            base_url: core.remote.base_url.clone(),
            timeout_secs: core.remote.timeout_secs,
            user_agent: core.remote.user_agent.clone(),
            cache_enabled: core.cache.enabled,
            cache_dir: PathBuf::from(&core.cache.dir),
            // never longer than the whole request
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS.min(core.remote.timeout_secs),
            max_error_body_bytes: 512,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), FavoritesError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FavoritesError::Config {
                field: "base_url".to_owned(),
                reason: "must start with http:// or https://".to_owned(),
            });
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(FavoritesError::Config {
                field: "timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > self.timeout_secs {
            return Err(FavoritesError::Config {
                field: "connect_timeout_secs".to_owned(),
                reason: "must be at least 1 and not exceed timeout_secs".to_owned(),
            });
        }

        if self.max_error_body_bytes > MAX_ERROR_BODY_BYTES {
            return Err(FavoritesError::Config {
                field: "max_error_body_bytes".to_owned(),
                reason: format!("must be 0-{MAX_ERROR_BODY_BYTES}"),
            });
        }

        if self.cache_enabled && self.cache_dir.as_os_str().is_empty() {
            return Err(FavoritesError::Config {
                field: "cache_dir".to_owned(),
                reason: "cache_dir must not be empty when the cache is enabled".to_owned(),
            });
        }

        Ok(())
    }
}
