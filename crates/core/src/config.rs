//! Configuration: `shelfshare.toml` parsing and runtime settings.
//!
//! [`ShelfShareConfig`] holds every section; each crate reads only its own.
//!
//! # Load order
//! 1. CLI flags (highest)
//! 2. Environment (`SHELFSHARE_REMOTE_BASE_URL=https://...`)
//! 3. Config file (`shelfshare.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), shelfshare_core::error::ShelfShareError> {
//! use shelfshare_core::config::ShelfShareConfig;
//!
//! let config = ShelfShareConfig::load("shelfshare.toml").await?;
//! let config = ShelfShareConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ShelfShareError};

/// Upper bound for `remote.timeout_secs`.
const MAX_TIMEOUT_SECS: u64 = 300;

/// Top-level config, mirroring the sections of `shelfshare.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfShareConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ShelfShareConfig {
    /// Loads a TOML file, applies environment overrides, then validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ShelfShareError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields defaults
    /// (still subject to environment overrides and validation).
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ShelfShareError> {
        match Self::load(path).await {
            Err(ShelfShareError::Config(ConfigError::FileNotFound { path })) => {
                warn!(path = %path, "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ShelfShareError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShelfShareError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ShelfShareError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ShelfShareError> {
        toml::from_str(toml_str).map_err(|e| {
            ShelfShareError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `SHELFSHARE_{SECTION}_{FIELD}` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "SHELFSHARE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SHELFSHARE_GENERAL_LOG_FORMAT");

        override_string(&mut self.remote.base_url, "SHELFSHARE_REMOTE_BASE_URL");
        override_u64(
            &mut self.remote.timeout_secs,
            "SHELFSHARE_REMOTE_TIMEOUT_SECS",
        );
        override_string(&mut self.remote.user_agent, "SHELFSHARE_REMOTE_USER_AGENT");

        override_bool(&mut self.cache.enabled, "SHELFSHARE_CACHE_ENABLED");
        override_string(&mut self.cache.dir, "SHELFSHARE_CACHE_DIR");
    }

    pub fn validate(&self) -> Result<(), ShelfShareError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        let base_url = self.remote.base_url.as_str();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "remote.base_url".to_owned(),
                reason: "must start with http:// or https://".to_owned(),
            }
            .into());
        }

        if self.remote.timeout_secs == 0 || self.remote.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "remote.timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.remote.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote.user_agent".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.cache.enabled && self.cache.dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.dir".to_owned(),
                reason: "dir must not be empty when the cache is enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// `[general]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// `[remote]`: where the favorites API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root; `/favorites/...` and `/health` are resolved against it
    pub base_url: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_owned(),
            timeout_secs: 10,
            user_agent: "shelfshare-cli".to_owned(),
        }
    }
}

/// `[cache]`: local fallback copy of each user's favorites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the cache lives in memory only
    pub enabled: bool,
    /// Directory holding one JSON file per user
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: ".shelfshare/cache".to_owned(),
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
