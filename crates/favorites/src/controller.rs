//! Favorites controller: in-memory favorites plus Remote Store / local cache
//! arbitration.
//!
//! # Flow
//! ```text
//! toggle/add/remove ──> RemoteStore ──ok──> apply to memory ──> mirror to LocalCache   (synced)
//!                            │
//!                          failed
//!                            └──> apply to memory ──> write LocalCache           (offline-pending)
//!
//! load ──> RemoteStore ──ok──> replace memory ──> overwrite LocalCache            (synced)
//!               └──failed──> read LocalCache ──> replace memory                    (offline-pending)
//! ```
//!
//! Every mutation falls back to the local cache when the Remote Store cannot
//! serve it, and reports the underlying error in
//! [`MutationOutcome::remote_error`]. Malformed responses are not a fallback
//! case: the operation fails and the favorite set is left untouched.
//!
//! Mutations of the same item are serialized through a per-item lock, so
//! overlapping toggles apply in call order. Different items proceed
//! concurrently; each applies only its own add/remove.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::counter;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use shelfshare_core::metrics::{
    FAVORITES_MALFORMED_RESPONSES_TOTAL, FAVORITES_OFFLINE_FALLBACKS_TOTAL, LABEL_OPERATION,
};
use shelfshare_core::types::{FavoriteSet, ItemId, SyncStatus, ToggleAction, UserId};

use crate::cache::LocalCache;
use crate::error::FavoritesError;
use crate::remote::RemoteStore;

/// Result of [`FavoritesController::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub user: UserId,
    /// Sorted
    pub items: Vec<ItemId>,
    pub status: SyncStatus,
    /// Set when the list came from the local cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of a successful toggle, add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub item: ItemId,
    pub action: ToggleAction,
    /// Membership after the operation
    pub favorite: bool,
    pub status: SyncStatus,
    /// Why the Remote Store could not confirm the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

impl MutationOutcome {
    /// Applied to the local cache only.
    pub fn is_degraded(&self) -> bool {
        self.remote_error.is_some()
    }
}

#[derive(Debug)]
struct FavoritesState {
    user: Option<UserId>,
    items: FavoriteSet,
    status: SyncStatus,
}

impl Default for FavoritesState {
    fn default() -> Self {
        Self {
            user: None,
            items: FavoriteSet::new(),
            status: SyncStatus::OfflinePending,
        }
    }
}

type ItemLocks = std::sync::Mutex<HashMap<(UserId, ItemId), Arc<Mutex<()>>>>;

/// Single source of truth for "is item X a favorite".
///
/// Holds one user's favorites at a time. Operating on another user first
/// re-seeds memory from that user's cache entry.
///
/// # Example
/// ```ignore
/// let controller = FavoritesController::new(Arc::new(remote), Arc::new(cache));
/// let loaded = controller.load(&user).await;
/// let outcome = controller.toggle(&user, &item).await?;
/// assert_eq!(controller.is_favorite(&item), outcome.favorite);
/// ```
pub struct FavoritesController<R: RemoteStore, C: LocalCache> {
    remote: Arc<R>,
    cache: Arc<C>,
    state: RwLock<FavoritesState>,
    item_locks: ItemLocks,
}

impl<R: RemoteStore, C: LocalCache> FavoritesController<R, C> {
    pub fn new(remote: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            remote,
            cache,
            state: RwLock::new(FavoritesState::default()),
            item_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    // --- reads ---

    /// Pure in-memory lookup.
    pub fn is_favorite(&self, item: &ItemId) -> bool {
        self.read_state().items.contains(item)
    }

    /// Sorted snapshot of the in-memory set.
    pub fn favorites(&self) -> Vec<ItemId> {
        self.read_state().items.to_sorted_vec()
    }

    pub fn status(&self) -> SyncStatus {
        self.read_state().status
    }

    /// The user the in-memory set belongs to.
    pub fn user(&self) -> Option<UserId> {
        self.read_state().user.clone()
    }

    // --- operations ---

    /// Loads `user`'s favorites, preferring the Remote Store.
    ///
    /// Never fails: on any remote error the local cache entry is used (empty
    /// if absent) and the outcome carries a warning.
    pub async fn load(&self, user: &UserId) -> LoadOutcome {
        match self.remote.fetch(user).await {
            Ok(payload) => {
                let items: FavoriteSet = payload.items.into_iter().collect();
                let sorted = items.to_sorted_vec();
                {
                    let mut state = self.write_state();
                    state.user = Some(user.clone());
                    state.items = items;
                    state.status = SyncStatus::Synced;
                    self.cache.write(user, &sorted);
                }
                info!(user = %user, count = sorted.len(), "favorites loaded");
                LoadOutcome {
                    user: user.clone(),
                    items: sorted,
                    status: SyncStatus::Synced,
                    warning: None,
                }
            }
            Err(e) => {
                counter!(FAVORITES_OFFLINE_FALLBACKS_TOTAL, LABEL_OPERATION => "load").increment(1);
                warn!(user = %user, error = %e, "remote load failed, serving favorites from local cache");
                let cached = self.cache.read(user);
                let items: FavoriteSet = cached.into_iter().collect();
                let sorted = items.to_sorted_vec();
                {
                    let mut state = self.write_state();
                    state.user = Some(user.clone());
                    state.items = items;
                    state.status = SyncStatus::OfflinePending;
                }
                LoadOutcome {
                    user: user.clone(),
                    items: sorted,
                    status: SyncStatus::OfflinePending,
                    warning: Some(format!("favorites served from local cache: {e}")),
                }
            }
        }
    }

    /// Flips membership of `item`.
    ///
    /// # Errors
    ///
    /// `MalformedResponse` when the Remote Store answers without an
    /// `added`/`removed` action. Remote failures do not error; see the
    /// module docs.
    pub async fn toggle(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<MutationOutcome, FavoritesError> {
        let guard = self.lock_item(user, item).await;
        self.ensure_user(user);

        let outcome = match self.remote.toggle(user, item).await {
            Ok(payload) => match payload.action {
                Some(action) => {
                    self.mutate(user, SyncStatus::Synced, |set| set.apply(action, item));
                    Ok(self.confirmed(item, action))
                }
                None => Err(self.reject_malformed(
                    "toggle",
                    "toggle response reported neither added nor removed",
                )),
            },
            Err(e) if e.is_remote_failure() => {
                let action = self.mutate(user, SyncStatus::OfflinePending, |set| set.toggle(item));
                Ok(self.fallback("toggle", user, item, action, e))
            }
            Err(e) => Err(self.reject(e)),
        };

        drop(guard);
        if let Ok(outcome) = &outcome {
            self.log_outcome("toggle", user, outcome);
        }
        outcome
    }

    /// Marks `item` as a favorite.
    pub async fn add(&self, user: &UserId, item: &ItemId) -> Result<MutationOutcome, FavoritesError> {
        self.set_membership(user, item, ToggleAction::Added).await
    }

    /// Unmarks `item`.
    pub async fn remove(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<MutationOutcome, FavoritesError> {
        self.set_membership(user, item, ToggleAction::Removed).await
    }

    /// Forgets the in-memory state. The local cache is kept.
    pub fn clear(&self) {
        *self.write_state() = FavoritesState::default();
        self.item_locks_map().clear();
    }

    async fn set_membership(
        &self,
        user: &UserId,
        item: &ItemId,
        action: ToggleAction,
    ) -> Result<MutationOutcome, FavoritesError> {
        let operation = action_operation(action);
        let guard = self.lock_item(user, item).await;
        self.ensure_user(user);

        let result = match action {
            ToggleAction::Added => self.remote.add(user, item).await,
            ToggleAction::Removed => self.remote.remove(user, item).await,
        };

        let outcome = match result {
            Ok(_) => {
                self.mutate(user, SyncStatus::Synced, |set| set.apply(action, item));
                Ok(self.confirmed(item, action))
            }
            Err(e) if e.is_remote_failure() => {
                self.mutate(user, SyncStatus::OfflinePending, |set| set.apply(action, item));
                Ok(self.fallback(operation, user, item, action, e))
            }
            Err(e) => Err(self.reject(e)),
        };

        drop(guard);
        if let Ok(outcome) = &outcome {
            self.log_outcome(operation, user, outcome);
        }
        outcome
    }

    // --- helpers ---

    fn confirmed(&self, item: &ItemId, action: ToggleAction) -> MutationOutcome {
        MutationOutcome {
            item: item.clone(),
            action,
            favorite: action == ToggleAction::Added,
            status: SyncStatus::Synced,
            remote_error: None,
        }
    }

    fn fallback(
        &self,
        operation: &'static str,
        user: &UserId,
        item: &ItemId,
        action: ToggleAction,
        error: FavoritesError,
    ) -> MutationOutcome {
        counter!(FAVORITES_OFFLINE_FALLBACKS_TOTAL, LABEL_OPERATION => operation).increment(1);
        warn!(
            user = %user,
            item = %item,
            operation,
            error = %error,
            "remote store unavailable, applied to local cache"
        );
        MutationOutcome {
            item: item.clone(),
            action,
            favorite: action == ToggleAction::Added,
            status: SyncStatus::OfflinePending,
            remote_error: Some(error.to_string()),
        }
    }

    fn reject_malformed(&self, operation: &'static str, reason: &str) -> FavoritesError {
        counter!(FAVORITES_MALFORMED_RESPONSES_TOTAL, LABEL_OPERATION => operation).increment(1);
        self.reject(FavoritesError::MalformedResponse(reason.to_owned()))
    }

    /// Marks the status `error`; the favorite set is not touched.
    fn reject(&self, error: FavoritesError) -> FavoritesError {
        warn!(error = %error, "favorites operation rejected");
        self.write_state().status = SyncStatus::Error;
        error
    }

    fn log_outcome(&self, operation: &'static str, user: &UserId, outcome: &MutationOutcome) {
        debug!(
            user = %user,
            item = %outcome.item,
            operation,
            action = %outcome.action,
            status = %outcome.status,
            "favorites mutation applied"
        );
    }

    /// Switches the in-memory set to `user`, seeding it from the cache.
    fn ensure_user(&self, user: &UserId) {
        let mut state = self.write_state();
        if state.user.as_ref() == Some(user) {
            return;
        }
        debug!(user = %user, "switching favorites user, seeding from local cache");
        state.user = Some(user.clone());
        state.items = self.cache.read(user).into_iter().collect();
        state.status = SyncStatus::OfflinePending;
    }

    /// Applies `f` to `user`'s set and mirrors the result into the cache
    /// under the same lock, so concurrent mutations of different items
    /// cannot write stale snapshots.
    ///
    /// If memory was switched to another user while the request was in
    /// flight, `f` is applied to `user`'s cache entry instead.
    fn mutate<T>(
        &self,
        user: &UserId,
        status: SyncStatus,
        f: impl FnOnce(&mut FavoriteSet) -> T,
    ) -> T {
        let mut state = self.write_state();
        if state.user.as_ref() == Some(user) {
            let out = f(&mut state.items);
            state.status = status;
            self.cache.write(user, &state.items.to_sorted_vec());
            out
        } else {
            let mut set: FavoriteSet = self.cache.read(user).into_iter().collect();
            let out = f(&mut set);
            self.cache.write(user, &set.to_sorted_vec());
            out
        }
    }

    /// Waits for exclusive use of `(user, item)`.
    ///
    /// The returned guard removes the map entry when dropped, including when
    /// the calling future is cancelled while waiting or while holding it.
    async fn lock_item(&self, user: &UserId, item: &ItemId) -> ItemLockGuard<'_> {
        let mut slot = ItemLockGuard {
            locks: &self.item_locks,
            key: (user.clone(), item.clone()),
            held: None,
        };
        let lock = {
            let mut locks = self.item_locks_map();
            Arc::clone(
                locks
                    .entry(slot.key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        slot.held = Some(lock.lock_owned().await);
        slot
    }

    fn item_locks_map(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(UserId, ItemId), Arc<Mutex<()>>>> {
        self.item_locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FavoritesState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FavoritesState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive use of one `(user, item)` pair.
struct ItemLockGuard<'a> {
    locks: &'a ItemLocks,
    key: (UserId, ItemId),
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for ItemLockGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // the map's own reference is the last one: nobody holds or waits
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

fn action_operation(action: ToggleAction) -> &'static str {
    match action {
        ToggleAction::Added => "add",
        ToggleAction::Removed => "remove",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::remote::MockRemoteStore;
    use proptest::prelude::*;

    type TestController = FavoritesController<MockRemoteStore, MemoryCache>;

    fn user(raw: &str) -> UserId {
        UserId::new(raw).unwrap()
    }

    fn item(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|r| item(r)).collect()
    }

    fn make(remote: MockRemoteStore) -> (TestController, Arc<MockRemoteStore>, Arc<MemoryCache>) {
        let remote = Arc::new(remote);
        let cache = Arc::new(MemoryCache::new());
        let controller = FavoritesController::new(Arc::clone(&remote), Arc::clone(&cache));
        (controller, remote, cache)
    }

    // --- load ---

    #[tokio::test]
    async fn load_replaces_memory_and_overwrites_cache() {
        let u1 = user("u1");
        let (controller, _remote, cache) =
            make(MockRemoteStore::new().with_favorites(&u1, &["b2", "b1"]));
        cache.write(&u1, &ids(&["stale"]));

        let outcome = controller.load(&u1).await;

        assert_eq!(outcome.items, ids(&["b1", "b2"]));
        assert_eq!(outcome.status, SyncStatus::Synced);
        assert!(outcome.warning.is_none());
        assert_eq!(controller.status(), SyncStatus::Synced);
        assert_eq!(controller.user(), Some(u1.clone()));
        assert!(controller.is_favorite(&item("b1")));
        assert!(!controller.is_favorite(&item("stale")));
        assert_eq!(cache.read(&u1), ids(&["b1", "b2"]));
    }

    #[tokio::test]
    async fn load_unknown_user_is_created_empty() {
        let (controller, remote, _cache) = make(MockRemoteStore::new());
        let outcome = controller.load(&user("fresh")).await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.status, SyncStatus::Synced);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn load_falls_back_to_cache_when_remote_unreachable() {
        let u2 = user("u2");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        remote.set_offline(true);
        cache.write(&u2, &ids(&["book-7"]));

        let outcome = controller.load(&u2).await;

        assert_eq!(outcome.items, ids(&["book-7"]));
        assert_eq!(outcome.status, SyncStatus::OfflinePending);
        assert!(outcome.warning.is_some());
        assert!(controller.is_favorite(&item("book-7")));
    }

    #[tokio::test]
    async fn load_offline_with_corrupt_cache_is_empty() {
        let u1 = user("u1");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        remote.set_offline(true);
        cache.insert_raw(&u1, "{{{");

        let outcome = controller.load(&u1).await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.status, SyncStatus::OfflinePending);
    }

    // --- toggle ---

    #[tokio::test]
    async fn toggle_scenario_added_then_removed() {
        let u1 = user("u1");
        let book = item("book-42");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        controller.load(&u1).await;

        let first = controller.toggle(&u1, &book).await.unwrap();
        assert_eq!(first.action, ToggleAction::Added);
        assert!(first.favorite);
        assert!(!first.is_degraded());
        assert!(controller.is_favorite(&book));
        assert_eq!(cache.read(&u1), ids(&["book-42"]));

        let second = controller.toggle(&u1, &book).await.unwrap();
        assert_eq!(second.action, ToggleAction::Removed);
        assert!(!second.favorite);
        assert!(!controller.is_favorite(&book));
        assert!(cache.read(&u1).is_empty());
        assert!(remote.stored(&u1).is_empty());
    }

    #[tokio::test]
    async fn toggle_offline_flips_locally_and_mirrors_cache() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, remote, cache) =
            make(MockRemoteStore::new().with_favorites(&u1, &["b0"]));
        controller.load(&u1).await;
        remote.set_offline(true);

        let outcome = controller.toggle(&u1, &b1).await.unwrap();

        assert_eq!(outcome.action, ToggleAction::Added);
        assert_eq!(outcome.status, SyncStatus::OfflinePending);
        assert!(outcome.is_degraded());
        assert!(controller.is_favorite(&b1));
        assert_eq!(controller.status(), SyncStatus::OfflinePending);
        assert_eq!(cache.read(&u1), ids(&["b0", "b1"]));
        assert_eq!(cache.read(&u1), controller.favorites());
        // server never saw it
        assert_eq!(remote.stored(&u1), ids(&["b0"]));
    }

    #[tokio::test]
    async fn toggle_without_action_fails_without_state_change() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, remote, cache) =
            make(MockRemoteStore::new().with_favorites(&u1, &["b0"]));
        controller.load(&u1).await;
        remote.set_malformed_toggle(true);

        let err = controller.toggle(&u1, &b1).await.unwrap_err();

        assert!(matches!(err, FavoritesError::MalformedResponse(_)));
        assert_eq!(controller.favorites(), ids(&["b0"]));
        assert_eq!(cache.read(&u1), ids(&["b0"]));
        assert_eq!(controller.status(), SyncStatus::Error);
    }

    #[tokio::test]
    async fn status_resets_on_next_successful_operation() {
        let u1 = user("u1");
        let (controller, remote, _cache) = make(MockRemoteStore::new());
        remote.set_malformed_toggle(true);
        let _ = controller.toggle(&u1, &item("b1")).await;
        assert_eq!(controller.status(), SyncStatus::Error);

        remote.set_malformed_toggle(false);
        controller.toggle(&u1, &item("b1")).await.unwrap();
        assert_eq!(controller.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn toggle_without_load_seeds_from_cache() {
        let u1 = user("u1");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        remote.set_offline(true);
        cache.write(&u1, &ids(&["b1"]));

        let outcome = controller.toggle(&u1, &item("b1")).await.unwrap();
        assert_eq!(outcome.action, ToggleAction::Removed);
        assert!(cache.read(&u1).is_empty());
    }

    // --- add / remove ---

    #[tokio::test]
    async fn add_then_remove_updates_membership() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, remote, _cache) = make(MockRemoteStore::new());
        controller.load(&u1).await;

        let added = controller.add(&u1, &b1).await.unwrap();
        assert_eq!(added.action, ToggleAction::Added);
        assert!(controller.is_favorite(&b1));
        assert_eq!(remote.stored(&u1), ids(&["b1"]));

        let removed = controller.remove(&u1, &b1).await.unwrap();
        assert_eq!(removed.action, ToggleAction::Removed);
        assert!(!controller.is_favorite(&b1));
        assert!(remote.stored(&u1).is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, _remote, _cache) = make(MockRemoteStore::new());
        controller.add(&u1, &b1).await.unwrap();
        controller.add(&u1, &b1).await.unwrap();
        assert_eq!(controller.favorites(), ids(&["b1"]));
    }

    #[tokio::test]
    async fn add_offline_surfaces_error_and_applies_locally() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        remote.set_offline(true);

        let outcome = controller.add(&u1, &b1).await.unwrap();

        let error = outcome.remote_error.as_deref().unwrap();
        assert!(error.contains("unreachable"));
        assert_eq!(outcome.status, SyncStatus::OfflinePending);
        assert!(controller.is_favorite(&b1));
        assert_eq!(cache.read(&u1), ids(&["b1"]));
    }

    #[tokio::test]
    async fn remove_for_unknown_server_user_falls_back() {
        let u1 = user("u1");
        let b1 = item("b1");
        let (controller, _remote, cache) = make(MockRemoteStore::new());
        cache.write(&u1, &ids(&["b1", "b2"]));

        let outcome = controller.remove(&u1, &b1).await.unwrap();

        assert!(outcome.remote_error.as_deref().unwrap().contains("404"));
        assert!(!controller.is_favorite(&b1));
        assert_eq!(cache.read(&u1), ids(&["b2"]));
    }

    // --- user scoping ---

    #[tokio::test]
    async fn switching_user_does_not_leak_favorites() {
        let u1 = user("u1");
        let u2 = user("u2");
        let (controller, _remote, cache) =
            make(MockRemoteStore::new().with_favorites(&u1, &["b1"]));
        controller.load(&u1).await;
        assert!(controller.is_favorite(&item("b1")));

        controller.toggle(&u2, &item("b2")).await.unwrap();

        assert_eq!(controller.user(), Some(u2.clone()));
        assert!(!controller.is_favorite(&item("b1")));
        assert!(controller.is_favorite(&item("b2")));
        assert_eq!(cache.read(&u1), ids(&["b1"]));
        assert_eq!(cache.read(&u2), ids(&["b2"]));
    }

    #[tokio::test]
    async fn clear_forgets_memory_but_keeps_cache() {
        let u1 = user("u1");
        let (controller, _remote, cache) =
            make(MockRemoteStore::new().with_favorites(&u1, &["b1"]));
        controller.load(&u1).await;

        controller.clear();

        assert_eq!(controller.user(), None);
        assert!(controller.favorites().is_empty());
        assert_eq!(cache.read(&u1), ids(&["b1"]));
    }

    // --- concurrency ---

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_of_same_item_serialize() {
        let u1 = user("u1");
        let book = item("book-42");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        let controller = Arc::new(controller);
        controller.load(&u1).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let controller = Arc::clone(&controller);
            let (u1, book) = (u1.clone(), book.clone());
            handles.push(tokio::spawn(async move {
                controller.toggle(&u1, &book).await.unwrap()
            }));
        }
        let mut added = 0;
        for handle in handles {
            if handle.await.unwrap().action == ToggleAction::Added {
                added += 1;
            }
        }

        // even number of toggles, applied one at a time
        assert_eq!(added, 5);
        assert!(!controller.is_favorite(&book));
        assert!(remote.stored(&u1).is_empty());
        assert!(cache.read(&u1).is_empty());
        assert!(controller.item_locks_map().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_of_different_items_all_land() {
        let u1 = user("u1");
        let (controller, remote, cache) = make(MockRemoteStore::new());
        let controller = Arc::new(controller);
        controller.load(&u1).await;

        let mut handles = Vec::new();
        for n in 0..20 {
            let controller = Arc::clone(&controller);
            let u1 = u1.clone();
            handles.push(tokio::spawn(async move {
                controller.add(&u1, &item(&format!("b{n:02}"))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(controller.favorites().len(), 20);
        assert_eq!(cache.read(&u1), controller.favorites());
        assert_eq!(remote.stored(&u1), controller.favorites());
    }

    #[tokio::test]
    async fn dropped_item_lock_releases_its_entry() {
        let (controller, _remote, _cache) = make(MockRemoteStore::new());

        let guard = controller.lock_item(&user("u1"), &item("book-42")).await;
        assert_eq!(controller.item_locks_map().len(), 1);

        drop(guard);
        assert!(controller.item_locks_map().is_empty());
    }

    #[tokio::test]
    async fn cancelled_toggle_does_not_leak_lock_entries() {
        let u1 = user("u1");
        let book = item("book-42");
        let (controller, remote, _cache) = make(MockRemoteStore::new());

        let held = controller.lock_item(&u1, &book).await;
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            controller.toggle(&u1, &book),
        )
        .await;
        assert!(waited.is_err(), "toggle should still be waiting for the item");
        assert_eq!(remote.calls(), 0);

        drop(held);
        assert!(controller.item_locks_map().is_empty());
        assert!(!controller.is_favorite(&book));
    }

    // --- properties ---

    proptest! {
        #[test]
        fn toggling_twice_restores_membership(
            raw_user in "[a-z0-9|]{1,16}",
            raw_item in "[a-z0-9-]{1,16}",
            initially_favorite in any::<bool>(),
            offline in any::<bool>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let u = user(&raw_user);
                let i = item(&raw_item);
                let seed: &[&str] = if initially_favorite { &[raw_item.as_str()] } else { &[] };
                let (controller, remote, cache) =
                    make(MockRemoteStore::new().with_favorites(&u, seed));
                controller.load(&u).await;
                remote.set_offline(offline);

                let first = controller.toggle(&u, &i).await.unwrap();
                let second = controller.toggle(&u, &i).await.unwrap();

                prop_assert_ne!(first.action, second.action);
                prop_assert_eq!(controller.is_favorite(&i), initially_favorite);
                prop_assert_eq!(cache.read(&u), controller.favorites());
                Ok(())
            })?;
        }
    }
}
