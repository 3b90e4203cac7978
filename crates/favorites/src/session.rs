//! Login-scoped favorites state.
//!
//! A [`FavoritesSession`] owns at most one [`FavoritesController`], created
//! on [`login`](FavoritesSession::login) and dropped on
//! [`logout`](FavoritesSession::logout). Every mutation goes through the
//! session so that a logged-out caller gets `Unauthenticated` before any
//! I/O happens.

use std::sync::Arc;

use tracing::info;

use shelfshare_core::types::{ItemId, SyncStatus, UserId};

use crate::cache::LocalCache;
use crate::controller::{FavoritesController, LoadOutcome, MutationOutcome};
use crate::error::FavoritesError;
use crate::remote::RemoteStore;

struct ActiveUser<R: RemoteStore, C: LocalCache> {
    user: UserId,
    controller: Arc<FavoritesController<R, C>>,
}

pub struct FavoritesSession<R: RemoteStore, C: LocalCache> {
    remote: Arc<R>,
    cache: Arc<C>,
    active: Option<ActiveUser<R, C>>,
}

impl<R: RemoteStore, C: LocalCache> FavoritesSession<R, C> {
    /// Starts logged out.
    pub fn new(remote: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            remote,
            cache,
            active: None,
        }
    }

    /// Binds a fresh controller to `user` and loads its favorites.
    ///
    /// Replaces any previous login. The load itself never fails; only an
    /// invalid user id is an error.
    pub async fn login(&mut self, user: &str) -> Result<LoadOutcome, FavoritesError> {
        let user = UserId::new(user)?;
        if let Some(previous) = self.logout() {
            info!(previous = %previous, user = %user, "replacing favorites session");
        }

        let controller = Arc::new(FavoritesController::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.cache),
        ));
        let outcome = controller.load(&user).await;
        info!(user = %user, status = %outcome.status, "favorites session started");

        self.active = Some(ActiveUser { user, controller });
        Ok(outcome)
    }

    /// Drops the controller. Returns the user that was logged in.
    pub fn logout(&mut self) -> Option<UserId> {
        let active = self.active.take()?;
        active.controller.clear();
        info!(user = %active.user, "favorites session ended");
        Some(active.user)
    }

    pub fn user(&self) -> Option<&UserId> {
        self.active.as_ref().map(|active| &active.user)
    }

    pub fn controller(&self) -> Option<&Arc<FavoritesController<R, C>>> {
        self.active.as_ref().map(|active| &active.controller)
    }

    /// Status of the logged-in controller; `None` when logged out.
    pub fn status(&self) -> Option<SyncStatus> {
        self.controller().map(|controller| controller.status())
    }

    /// Re-runs `load` for the logged-in user.
    pub async fn reload(&self) -> Result<LoadOutcome, FavoritesError> {
        let (user, controller) = self.active()?;
        Ok(controller.load(user).await)
    }

    pub async fn toggle(&self, item: &str) -> Result<MutationOutcome, FavoritesError> {
        let (user, controller) = self.active()?;
        let item = ItemId::new(item)?;
        controller.toggle(user, &item).await
    }

    pub async fn add(&self, item: &str) -> Result<MutationOutcome, FavoritesError> {
        let (user, controller) = self.active()?;
        let item = ItemId::new(item)?;
        controller.add(user, &item).await
    }

    pub async fn remove(&self, item: &str) -> Result<MutationOutcome, FavoritesError> {
        let (user, controller) = self.active()?;
        let item = ItemId::new(item)?;
        controller.remove(user, &item).await
    }

    /// False when logged out or when `item` is not a valid id.
    pub fn is_favorite(&self, item: &str) -> bool {
        let Some(controller) = self.controller() else {
            return false;
        };
        ItemId::new(item).is_ok_and(|item| controller.is_favorite(&item))
    }

    fn active(&self) -> Result<(&UserId, &FavoritesController<R, C>), FavoritesError> {
        self.active
            .as_ref()
            .map(|active| (&active.user, active.controller.as_ref()))
            .ok_or(FavoritesError::Unauthenticated)
    }
}
