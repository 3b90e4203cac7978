//! Remote Store abstraction.
//!
//! The [`RemoteStore`] trait is the seam between the controller and the
//! favorites REST API. Production code uses [`HttpRemoteStore`]; unit tests
//! use `MockRemoteStore`.
//!
//! ```text
//! ┌──────────────────────┐
//! │ FavoritesController  │
//! └──────────┬───────────┘
//!            ▼
//!     ┌─────────────┐
//!     │ RemoteStore │ (trait)
//!     └─────────────┘
//!        │       │
//!        ▼       ▼
//!    ┌──────┐ ┌──────┐
//!    │ Http │ │ Mock │
//!    └──┬───┘ └──────┘
//!       ▼
//!  /favorites/{user}
//! ```
//!
//! Every method returns the resulting full list as a normalized
//! [`FavoritesPayload`]. The server creates unknown users lazily on first
//! read, so no registration call exists.

mod http;
mod payload;

use std::future::Future;

use shelfshare_core::types::{ItemId, UserId};

use crate::error::FavoritesError;

pub use http::HttpRemoteStore;
pub use payload::{FavoritesPayload, normalize};

pub trait RemoteStore: Send + Sync + 'static {
    /// `GET /favorites/{user}`
    fn fetch(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<FavoritesPayload, FavoritesError>> + Send;

    /// `POST /favorites/{user}`
    fn add(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> impl Future<Output = Result<FavoritesPayload, FavoritesError>> + Send;

    /// `DELETE /favorites/{user}/{item}`. The server answers 404 when the
    /// user does not exist.
    fn remove(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> impl Future<Output = Result<FavoritesPayload, FavoritesError>> + Send;

    /// `PUT /favorites/{user}/toggle`. The payload's `action` reports
    /// which way the toggle went; callers must treat a missing action as a
    /// malformed response.
    fn toggle(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> impl Future<Output = Result<FavoritesPayload, FavoritesError>> + Send;

    /// `GET /health`. Liveness only.
    fn ping(&self) -> impl Future<Output = Result<(), FavoritesError>> + Send;
}

/// In-memory Remote Store for unit tests.
///
/// Can be switched offline at runtime, and can be told to answer toggles
/// without an action tag.
#[cfg(test)]
#[derive(Default)]
pub struct MockRemoteStore {
    favorites: std::sync::Mutex<std::collections::HashMap<UserId, shelfshare_core::FavoriteSet>>,
    offline: std::sync::atomic::AtomicBool,
    malformed_toggle: std::sync::atomic::AtomicBool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the server-side list for `user`.
    pub fn with_favorites(self, user: &UserId, items: &[&str]) -> Self {
        let set = items
            .iter()
            .map(|raw| ItemId::new(*raw).expect("valid item id"))
            .collect();
        self.lock().insert(user.clone(), set);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline
            .store(offline, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_malformed_toggle(&self, malformed: bool) {
        self.malformed_toggle
            .store(malformed, std::sync::atomic::Ordering::SeqCst);
    }

    /// Server-side list, sorted.
    pub fn stored(&self, user: &UserId) -> Vec<ItemId> {
        self.lock()
            .get(user)
            .map(|set| set.to_sorted_vec())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, std::collections::HashMap<UserId, shelfshare_core::FavoriteSet>>
    {
        self.favorites.lock().expect("mock lock poisoned")
    }

    fn begin(&self) -> Result<(), FavoritesError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.offline.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(FavoritesError::Network("mock remote offline".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
impl RemoteStore for MockRemoteStore {
    async fn fetch(&self, user: &UserId) -> Result<FavoritesPayload, FavoritesError> {
        self.begin()?;
        let mut map = self.lock();
        let set = map.entry(user.clone()).or_default();
        Ok(FavoritesPayload::new(set.to_sorted_vec()))
    }

    async fn add(&self, user: &UserId, item: &ItemId) -> Result<FavoritesPayload, FavoritesError> {
        self.begin()?;
        let mut map = self.lock();
        let set = map.entry(user.clone()).or_default();
        set.insert(item.clone());
        Ok(FavoritesPayload::new(set.to_sorted_vec()))
    }

    async fn remove(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<FavoritesPayload, FavoritesError> {
        self.begin()?;
        let mut map = self.lock();
        let Some(set) = map.get_mut(user) else {
            return Err(FavoritesError::Http {
                status: 404,
                body: "user not found".to_owned(),
            });
        };
        set.remove(item);
        Ok(FavoritesPayload::new(set.to_sorted_vec()))
    }

    async fn toggle(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<FavoritesPayload, FavoritesError> {
        self.begin()?;
        if self
            .malformed_toggle
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Ok(FavoritesPayload::new(self.stored(user)));
        }
        let mut map = self.lock();
        let set = map.entry(user.clone()).or_default();
        let action = set.toggle(item);
        Ok(FavoritesPayload::new(set.to_sorted_vec()).with_action(action))
    }

    async fn ping(&self) -> Result<(), FavoritesError> {
        self.begin()
    }
}
