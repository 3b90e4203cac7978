//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "shelfshare.toml";

/// ShelfShare -- manage book favorites against the ShelfShare API.
///
/// Use `shelfshare <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "shelfshare", version, about, long_about = None)]
pub struct Cli {
    /// Path to the shelfshare.toml configuration file [default: shelfshare.toml].
    ///
    /// A missing file at the default path falls back to built-in defaults;
    /// an explicitly given path must exist.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The config path to read, and whether the user chose it explicitly.
    pub fn config_source(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, check and change a user's favorites.
    Favorites(FavoritesArgs),

    /// Check that the Remote Store answers.
    Health,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- favorites ----

#[derive(Args, Debug)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub action: FavoritesAction,
}

/// User and item for single-item operations.
#[derive(Args, Debug, Clone)]
pub struct ItemTarget {
    /// User identifier (e.g. auth0|abc).
    #[arg(short, long)]
    pub user: String,

    /// Book identifier.
    pub item: String,
}

#[derive(Subcommand, Debug)]
pub enum FavoritesAction {
    /// Load the user's favorites (falls back to the local cache).
    Load {
        /// User identifier.
        #[arg(short, long)]
        user: String,
    },
    /// Flip an item's favorite status.
    Toggle(ItemTarget),
    /// Mark an item as favorite.
    Add(ItemTarget),
    /// Unmark an item.
    Remove(ItemTarget),
    /// Report whether an item is a favorite.
    Check(ItemTarget),
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, remote, cache).
        section: Option<String>,
    },
}
