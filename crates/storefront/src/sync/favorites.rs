//! Favorites synchronizer.
//!
//! Same local-first shape as the cart synchronizer, over a flat list of
//! [`FavoriteEntry`] values keyed by `item_id`. The login reconciliation is
//! simpler than the cart's: the server-side list wholesale replaces the
//! local one, because favorites carry no quantities to merge.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use tamarind_core::ProductId;

use crate::api::{ApiError, FavoritesApi};
use crate::models::FavoriteEntry;
use crate::session::SessionHandle;
use crate::store::{self, LocalStore, keys};

/// The outcome of a [`FavoritesSync::toggle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Favorites synchronizer service. Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct FavoritesSync<A: FavoritesApi> {
    inner: Arc<FavoritesSyncInner<A>>,
}

struct FavoritesSyncInner<A> {
    favorites: Mutex<Vec<FavoriteEntry>>,
    changed: watch::Sender<Vec<FavoriteEntry>>,
    store: Arc<dyn LocalStore>,
    api: A,
    session: SessionHandle,
}

#[derive(Debug)]
enum MirrorOp {
    Add(ProductId),
    Remove(ProductId),
}

impl<A: FavoritesApi> FavoritesSync<A> {
    /// Create a synchronizer, loading any favorites persisted in the store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, api: A, session: SessionHandle) -> Self {
        let favorites: Vec<FavoriteEntry> =
            store::load_json(&*store, keys::FAVORITES).unwrap_or_default();
        let (changed, _) = watch::channel(favorites.clone());
        Self {
            inner: Arc::new(FavoritesSyncInner {
                favorites: Mutex::new(favorites),
                changed,
                store,
                api,
                session,
            }),
        }
    }

    /// Snapshot of the current favorites, in insertion order.
    #[must_use]
    pub fn favorites(&self) -> Vec<FavoriteEntry> {
        self.lock_favorites().clone()
    }

    /// Whether the item is currently favorited.
    #[must_use]
    pub fn is_favorite(&self, item_id: &str) -> bool {
        self.lock_favorites().iter().any(|f| f.item_id == item_id)
    }

    /// Subscribe to favorites changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteEntry>> {
        self.inner.changed.subscribe()
    }

    /// Flip the favorited state of an item.
    ///
    /// If an entry with the same `item_id` exists it is removed, otherwise
    /// the given entry is appended. The mirror call is keyed by product ID;
    /// entries whose `item_id` no longer parses as one stay local-only.
    pub fn toggle(&self, entry: FavoriteEntry) -> ToggleOutcome {
        let product_id = entry.product_id();
        let (snapshot, outcome) = {
            let mut favorites = self.lock_favorites();
            let outcome = match favorites.iter().position(|f| f.item_id == entry.item_id) {
                Some(pos) => {
                    favorites.remove(pos);
                    ToggleOutcome::Removed
                }
                None => {
                    favorites.push(entry);
                    ToggleOutcome::Added
                }
            };
            (favorites.clone(), outcome)
        };

        self.commit(&snapshot);
        if let Some(product_id) = product_id {
            self.mirror(match outcome {
                ToggleOutcome::Added => MirrorOp::Add(product_id),
                ToggleOutcome::Removed => MirrorOp::Remove(product_id),
            });
        }
        outcome
    }

    /// Add an item if absent. Returns whether anything changed; adding an
    /// already-favorited item is a no-op with no mirror.
    pub fn add(&self, entry: FavoriteEntry) -> bool {
        let product_id = entry.product_id();
        let snapshot = {
            let mut favorites = self.lock_favorites();
            if favorites.iter().any(|f| f.item_id == entry.item_id) {
                return false;
            }
            favorites.push(entry);
            favorites.clone()
        };
        self.commit(&snapshot);
        if let Some(product_id) = product_id {
            self.mirror(MirrorOp::Add(product_id));
        }
        true
    }

    /// Remove an item if present. Absent items are a no-op with no mirror.
    pub fn remove(&self, item_id: &str) {
        let (snapshot, removed) = {
            let mut favorites = self.lock_favorites();
            let Some(pos) = favorites.iter().position(|f| f.item_id == item_id) else {
                return;
            };
            let removed = favorites.remove(pos);
            (favorites.clone(), removed)
        };
        self.commit(&snapshot);
        if let Some(product_id) = removed.product_id() {
            self.mirror(MirrorOp::Remove(product_id));
        }
    }

    /// One-time reconciliation on login: the server-side list replaces the
    /// local one entirely.
    ///
    /// # Errors
    ///
    /// Returns the fetch error unchanged; local favorites are untouched.
    pub async fn replace_from_remote(&self) -> Result<Vec<FavoriteEntry>, ApiError> {
        let remote = self.inner.api.fetch_favorites().await?;
        let entries: Vec<FavoriteEntry> = remote
            .into_iter()
            .map(|f| FavoriteEntry::new(f.product_id, f.name, f.price, f.image))
            .collect();

        let snapshot = {
            let mut favorites = self.lock_favorites();
            *favorites = entries;
            favorites.clone()
        };
        self.commit(&snapshot);
        Ok(snapshot)
    }

    /// Empty the local list without contacting the backend (logout path).
    pub fn clear_local(&self) {
        let snapshot = {
            let mut favorites = self.lock_favorites();
            favorites.clear();
            favorites.clone()
        };
        self.commit(&snapshot);
    }

    /// Explicit "clear favorites" user action: delete server-side, then
    /// locally. Remote failure is logged and the local clear proceeds.
    pub async fn clear_remote_and_local(&self) {
        if self.inner.session.token().is_some()
            && let Err(e) = self.inner.api.push_favorites_clear().await
        {
            tracing::warn!(error = %e, "Remote favorites clear failed; clearing locally anyway");
        }
        self.clear_local();
    }

    /// Re-read favorites from the store (another handle wrote them).
    pub(crate) fn refresh_from_store(&self) {
        let Some(loaded) =
            store::load_json::<Vec<FavoriteEntry>>(&*self.inner.store, keys::FAVORITES)
        else {
            return;
        };
        let snapshot = {
            let mut favorites = self.lock_favorites();
            *favorites = loaded;
            favorites.clone()
        };
        let _ = self.inner.changed.send(snapshot);
    }

    fn lock_favorites(&self) -> MutexGuard<'_, Vec<FavoriteEntry>> {
        self.inner
            .favorites
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn commit(&self, snapshot: &[FavoriteEntry]) {
        store::save_json(&*self.inner.store, keys::FAVORITES, &snapshot);
        let _ = self.inner.changed.send(snapshot.to_vec());
    }

    /// Mirror a mutation to the backend, fire-and-forget. Skipped for
    /// anonymous sessions; failures are logged and never rolled back.
    fn mirror(&self, op: MirrorOp) {
        if self.inner.session.token().is_none() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime; skipping remote favorites mirror");
            return;
        };
        let api = self.inner.api.clone();
        handle.spawn(async move {
            let result = match op {
                MirrorOp::Add(id) => api.push_favorite_add(id).await,
                MirrorOp::Remove(id) => api.push_favorite_remove(id).await,
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "Remote favorites mirror call failed; keeping local state");
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::mock::{MockApi, RecordedCall};
    use crate::api::types::RemoteFavorite;
    use crate::models::{Session, UserProfile};
    use crate::store::MemoryStore;
    use tamarind_core::UserId;

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn entry(product_id: i64) -> FavoriteEntry {
        FavoriteEntry::new(
            ProductId::new(product_id),
            format!("Product {product_id}"),
            "12.00".parse().unwrap(),
            String::new(),
        )
    }

    fn anonymous_sync() -> (FavoritesSync<MockApi>, MockApi) {
        let api = MockApi::new();
        let sync = FavoritesSync::new(Arc::new(MemoryStore::new()), api.clone(), SessionHandle::new());
        (sync, api)
    }

    fn authenticated_sync() -> (FavoritesSync<MockApi>, MockApi) {
        let api = MockApi::new();
        let handle = SessionHandle::new();
        handle.set(Session {
            user: UserProfile {
                id: UserId::new(1),
                name: "Ada".to_owned(),
                email: "ada@example.com".to_owned(),
                avatar: None,
            },
            token: "token-1".to_owned(),
        });
        let sync = FavoritesSync::new(Arc::new(MemoryStore::new()), api.clone(), handle);
        (sync, api)
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let (sync, _) = anonymous_sync();
        assert_eq!(sync.toggle(entry(1)), ToggleOutcome::Added);
        assert!(sync.is_favorite("1"));
        assert_eq!(sync.toggle(entry(1)), ToggleOutcome::Removed);
        assert!(!sync.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_no_duplicate_entries() {
        let (sync, _) = anonymous_sync();
        sync.toggle(entry(1));
        sync.toggle(entry(2));
        sync.toggle(entry(1));
        sync.toggle(entry(1));
        let ids: Vec<_> = sync.favorites().iter().map(|f| f.item_id.clone()).collect();
        // The third toggle removed item 1 and the fourth re-appended it,
        // so it now follows item 2. No duplicates either way.
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_add_is_noop_when_present() {
        let (sync, api) = authenticated_sync();
        assert!(sync.add(entry(1)));
        settle().await;
        assert!(!sync.add(entry(1)));
        settle().await;

        assert_eq!(sync.favorites().len(), 1);
        let adds = api
            .calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::FavoriteAdd(_)))
            .count();
        assert_eq!(adds, 1, "duplicate add never reaches the backend");
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (sync, api) = authenticated_sync();
        sync.remove("99");
        settle().await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_authenticated_toggle_mirrors() {
        let (sync, api) = authenticated_sync();
        sync.toggle(entry(1));
        settle().await;
        sync.toggle(entry(1));
        settle().await;

        let calls = api.calls();
        assert!(calls.contains(&RecordedCall::FavoriteAdd(ProductId::new(1))));
        assert!(calls.contains(&RecordedCall::FavoriteRemove(ProductId::new(1))));
    }

    #[tokio::test]
    async fn test_anonymous_toggle_stays_local() {
        let (sync, api) = anonymous_sync();
        sync.toggle(entry(1));
        settle().await;
        assert!(api.calls().is_empty());
        assert!(sync.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_unparseable_item_id_stays_local() {
        let (sync, api) = authenticated_sync();
        sync.toggle(FavoriteEntry {
            item_id: "legacy-slug".to_owned(),
            name: String::new(),
            price: rust_decimal::Decimal::ZERO,
            image: String::new(),
        });
        settle().await;
        assert!(api.calls().is_empty());
        assert!(sync.is_favorite("legacy-slug"));
    }

    #[tokio::test]
    async fn test_replace_from_remote_is_wholesale() {
        let (sync, api) = authenticated_sync();
        sync.toggle(entry(1));
        api.set_remote_favorites(vec![RemoteFavorite {
            product_id: ProductId::new(7),
            name: "Remote".to_owned(),
            price: "3.00".parse().unwrap(),
            image: String::new(),
        }]);

        let favorites = sync.replace_from_remote().await.unwrap();

        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites.first().unwrap().item_id, "7");
        assert!(!sync.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_local_state() {
        let (sync, api) = authenticated_sync();
        api.fail_mutations(true);
        sync.toggle(entry(1));
        settle().await;
        assert!(sync.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_clear_remote_and_local() {
        let (sync, api) = authenticated_sync();
        sync.toggle(entry(1));
        sync.clear_remote_and_local().await;

        assert!(sync.favorites().is_empty());
        assert!(api.calls().contains(&RecordedCall::FavoritesClear));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let store = Arc::new(MemoryStore::new());
        let sync = FavoritesSync::new(store.clone(), MockApi::new(), SessionHandle::new());
        sync.toggle(entry(1));

        let reloaded = FavoritesSync::new(store, MockApi::new(), SessionHandle::new());
        assert!(reloaded.is_favorite("1"));
    }

    #[tokio::test]
    async fn test_corrupt_store_treated_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.write(keys::FAVORITES, "[{broken");
        let sync = FavoritesSync::new(store, MockApi::new(), SessionHandle::new());
        assert!(sync.favorites().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_observes_toggle() {
        let (sync, _) = anonymous_sync();
        let mut rx = sync.subscribe();
        sync.toggle(entry(1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
