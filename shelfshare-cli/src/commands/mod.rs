//! Command handlers -- one module per subcommand

pub mod config;
pub mod favorites;
pub mod health;

use std::path::Path;

use shelfshare_core::config::ShelfShareConfig;

use crate::error::CliError;

/// Loads the effective configuration.
///
/// A missing file is only tolerated at the default path.
pub async fn load_config(path: &Path, explicit: bool) -> Result<ShelfShareConfig, CliError> {
    let config = if explicit {
        ShelfShareConfig::load(path).await?
    } else {
        ShelfShareConfig::load_or_default(path).await?
    };
    Ok(config)
}
