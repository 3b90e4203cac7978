#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`FavoritesError`)
//! - [`config`]: Client configuration (`FavoritesConfig`)
//! - [`remote`]: Remote Store abstraction (`RemoteStore` trait, `HttpRemoteStore`)
//! - [`cache`]: Local cache adapters (`LocalCache` trait, `FileCache`, `MemoryCache`)
//! - [`controller`]: In-memory state and arbitration (`FavoritesController`)
//! - [`session`]: Login-scoped controller lifecycle (`FavoritesSession`)
//!
//! # Architecture
//!
//! ```text
//! FavoritesSession --login--> FavoritesController
//!                                  |          |
//!                             RemoteStore  LocalCache
//!                                  |          |
//!                         /favorites/{user}  shelfshare.favorites.<user>
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod remote;
pub mod session;

// --- Public API Re-exports ---

// Controller
pub use controller::{FavoritesController, LoadOutcome, MutationOutcome};

// Session
pub use session::FavoritesSession;

// Configuration
pub use config::FavoritesConfig;

// Error
pub use error::FavoritesError;

// Remote Store
pub use remote::{FavoritesPayload, HttpRemoteStore, RemoteStore};

// Local cache
pub use cache::{ConfiguredCache, FileCache, LocalCache, MemoryCache, cache_key};
