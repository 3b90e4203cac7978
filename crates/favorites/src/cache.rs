//! Local cache of each user's favorites.
//!
//! Best-effort fallback copy, never the system of record: reads never fail
//! (absent or corrupt entries read as empty) and write failures are logged
//! and dropped.
//!
//! Key layout: one entry per user under `shelfshare.favorites.<user>`,
//! holding a JSON array of item id strings.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use metrics::counter;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use shelfshare_core::metrics::{
    FAVORITES_CACHE_CORRUPT_TOTAL, FAVORITES_CACHE_WRITE_FAILURES_TOTAL,
};
use shelfshare_core::types::{ItemId, UserId};

use crate::config::FavoritesConfig;

const CACHE_KEY_PREFIX: &str = "shelfshare.favorites.";

/// Per-user persisted list of item ids.
///
/// Entries are scoped by [`UserId`]; one user's entry is never visible
/// through another's key.
pub trait LocalCache: Send + Sync + 'static {
    /// Returns the cached list, or empty if absent or unreadable.
    fn read(&self, user: &UserId) -> Vec<ItemId>;

    /// Replaces the cached list. Failures are logged, not returned.
    fn write(&self, user: &UserId, items: &[ItemId]);
}

/// Storage key for `user`.
pub fn cache_key(user: &UserId) -> String {
    format!("{CACHE_KEY_PREFIX}{user}")
}

fn encode_entry(items: &[ItemId]) -> Result<String, serde_json::Error> {
    let raw: Vec<&str> = items.iter().map(ItemId::as_str).collect();
    serde_json::to_string(&raw)
}

/// Parses a stored entry. Invalid ids inside an otherwise valid array are
/// dropped; an unparsable entry reads as empty.
fn decode_entry(user: &UserId, raw: &str) -> Vec<ItemId> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(values) => values
            .into_iter()
            .filter_map(|value| ItemId::new(value).ok())
            .collect(),
        Err(e) => {
            counter!(FAVORITES_CACHE_CORRUPT_TOTAL).increment(1);
            warn!(user = %user, error = %e, "corrupt favorites cache entry, treating as empty");
            Vec::new()
        }
    }
}

fn record_write_failure(user: &UserId, error: &dyn std::fmt::Display) {
    counter!(FAVORITES_CACHE_WRITE_FAILURES_TOTAL).increment(1);
    warn!(user = %user, error = %error, "failed to write favorites cache, dropping");
}

/// One JSON file per user under a cache directory.
///
/// File names are derived from [`cache_key`] with every byte outside
/// `[A-Za-z0-9._-]` written as `%XX`, so `/` or `..` in a user id cannot
/// escape the directory. Each write goes to its own temp file in the same
/// directory and is renamed into place, so concurrent writers from other
/// processes never share a partially written file.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Does not touch the filesystem; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, user: &UserId) -> PathBuf {
        self.dir
            .join(format!("{}.json", encode_file_name(&cache_key(user))))
    }

    fn try_write(&self, user: &UserId, items: &[ItemId]) -> io::Result<()> {
        let json = encode_entry(items).map_err(io::Error::other)?;
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.path_for(user))?;
        Ok(())
    }
}

fn encode_file_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl LocalCache for FileCache {
    fn read(&self, user: &UserId) -> Vec<ItemId> {
        let path = self.path_for(user);
        match fs::read_to_string(&path) {
            Ok(raw) => decode_entry(user, &raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(user = %user, "no favorites cache entry");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read favorites cache");
                Vec::new()
            }
        }
    }

    fn write(&self, user: &UserId, items: &[ItemId]) {
        match self.try_write(user, items) {
            Ok(()) => debug!(user = %user, count = items.len(), "favorites cache written"),
            Err(e) => record_write_failure(user, &e),
        }
    }
}

/// Process-local cache holding raw JSON strings.
///
/// Used when the file cache is disabled, and in tests (raw entries can be
/// seeded to exercise corrupt-entry handling).
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `raw` verbatim under `user`'s key.
    pub fn insert_raw(&self, user: &UserId, raw: impl Into<String>) {
        self.lock().insert(cache_key(user), raw.into());
    }

    /// The stored string for `user`, if any.
    pub fn raw(&self, user: &UserId) -> Option<String> {
        self.lock().get(&cache_key(user)).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, user: &UserId) -> Vec<ItemId> {
        match self.raw(user) {
            Some(raw) => decode_entry(user, &raw),
            None => Vec::new(),
        }
    }

    fn write(&self, user: &UserId, items: &[ItemId]) {
        match encode_entry(items) {
            Ok(json) => {
                self.lock().insert(cache_key(user), json);
            }
            Err(e) => record_write_failure(user, &e),
        }
    }
}

/// Cache selected by configuration.
#[derive(Debug)]
pub enum ConfiguredCache {
    File(FileCache),
    Memory(MemoryCache),
}

impl ConfiguredCache {
    pub fn from_config(config: &FavoritesConfig) -> Self {
        if config.cache_enabled {
            Self::File(FileCache::new(&config.cache_dir))
        } else {
            Self::Memory(MemoryCache::new())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory(_) => "memory",
        }
    }
}

impl LocalCache for ConfiguredCache {
    fn read(&self, user: &UserId) -> Vec<ItemId> {
        match self {
            Self::File(cache) => cache.read(user),
            Self::Memory(cache) => cache.read(user),
        }
    }

    fn write(&self, user: &UserId, items: &[ItemId]) {
        match self {
            Self::File(cache) => cache.write(user, items),
            Self::Memory(cache) => cache.write(user, items),
        }
    }
}
