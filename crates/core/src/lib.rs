#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- re-exports ---

pub use error::{ConfigError, ShelfShareError, ValidationError};

pub use config::ShelfShareConfig;

pub use types::{FavoriteSet, ItemId, SyncStatus, ToggleAction, UserId};
