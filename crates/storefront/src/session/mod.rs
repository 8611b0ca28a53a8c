//! Session lifecycle: login, registration, OAuth completion, rehydration,
//! logout, and forced invalidation.
//!
//! # State machine
//!
//! The session is either anonymous or authenticated, and the transitions
//! are owned by [`SessionManager`]:
//!
//! - `login` / `register` / `complete_oauth` move to authenticated, then
//!   reconcile the local cart and favorites with the server-side
//!   collections (merge-on-login)
//! - `logout` and the forced variant move back to anonymous and tear down
//!   all locally persisted user state
//! - `rehydrate` restores a persisted session on startup, then runs the
//!   same reconciliation detached so stale local collections catch up
//!
//! A rejected bearer token anywhere in the API client broadcasts a
//! process-wide signal; the watcher spawned by
//! [`SessionManager::spawn_watchers`] turns that into exactly one forced
//! logout, no matter how many in-flight calls saw the 401. The
//! [`SessionHandle`] transition methods return whether the state actually
//! changed, and teardown only runs on a real transition.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, AuthApi, CartApi, FavoritesApi};
use crate::models::{Session, UserProfile};
use crate::store::{self, LocalStore, StoreChange, keys};
use crate::sync::{CartSync, FavoritesSync};

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The backend returned a session without a usable token.
    #[error("Backend returned a session without a token")]
    InvalidSession,
}

/// A session state transition, broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserProfile),
    LoggedOut,
}

// =============================================================================
// SessionHandle
// =============================================================================

/// Shared, cheaply cloneable view of the current session.
///
/// The handle is the single source of truth for "who is logged in right
/// now" within a process: the API client reads the bearer token from it on
/// every request, and the synchronizers consult it to decide whether to
/// mirror mutations. Transitions go through [`SessionManager`]; the handle
/// itself only stores.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Option<Session>>>,
}

impl SessionHandle {
    /// Create an anonymous handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// The current session, if authenticated.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// The current bearer token, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.token.clone())
    }

    /// The current user profile, if authenticated.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().as_ref().map(|s| s.user.clone())
    }

    /// Whether a session is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// Install a session. Returns `true` when this was a transition from
    /// anonymous (a token refresh over an existing session returns `false`).
    pub fn set(&self, session: Session) -> bool {
        let mut guard = self.lock();
        let was_anonymous = guard.is_none();
        *guard = Some(session);
        was_anonymous
    }

    /// Drop the session. Returns `true` only when a session was present,
    /// so concurrent teardown paths collapse to a single real transition.
    pub fn clear(&self) -> bool {
        self.lock().take().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Owns session transitions and the merge-on-login choreography.
///
/// Cheaply cloneable; clones share state. Requires the full API surface
/// because a login touches auth, cart, and favorites endpoints.
#[derive(Clone)]
pub struct SessionManager<A: CartApi + FavoritesApi + AuthApi> {
    inner: Arc<SessionManagerInner<A>>,
}

struct SessionManagerInner<A: CartApi + FavoritesApi + AuthApi> {
    handle: SessionHandle,
    store: Arc<dyn LocalStore>,
    api: A,
    cart: CartSync<A>,
    favorites: FavoritesSync<A>,
    events: broadcast::Sender<SessionEvent>,
}

impl<A: CartApi + FavoritesApi + AuthApi> SessionManager<A> {
    /// Create a manager over already-constructed synchronizers.
    ///
    /// The handle must be the same one the synchronizers and API client
    /// were built with.
    #[must_use]
    pub fn new(
        handle: SessionHandle,
        store: Arc<dyn LocalStore>,
        api: A,
        cart: CartSync<A>,
        favorites: FavoritesSync<A>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionManagerInner {
                handle,
                store,
                api,
                cart,
                favorites,
                events,
            }),
        }
    }

    /// The shared session handle.
    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.inner.handle
    }

    /// Subscribe to session transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Transitions to authenticated
    // =========================================================================

    /// Log in with credentials, then reconcile local state with the
    /// server-side collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the call fails.
    /// A failure during the post-login merge does not fail the login; it is
    /// logged, local state stays authoritative, and [`Self::resync`] offers
    /// the retry.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: String, password: String) -> Result<UserProfile, SessionError> {
        let session = self.inner.api.login(email, password).await?;
        self.on_authenticated(session).await
    }

    /// Create an account and start a session with the result.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or the call fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<UserProfile, SessionError> {
        let session = self.inner.api.register(name, email, password).await?;
        self.on_authenticated(session).await
    }

    /// Complete a redirect-based OAuth flow with the token the callback
    /// carried, fetching the profile the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected by the backend.
    #[instrument(skip(self, token))]
    pub async fn complete_oauth(&self, token: String) -> Result<UserProfile, SessionError> {
        let user = self.inner.api.current_user(token.clone()).await?;
        self.on_authenticated(Session { user, token }).await
    }

    /// Shared post-authentication choreography: persist the session, drop
    /// anonymous remnants from storage, and reconcile with the backend.
    ///
    /// Only the *stored* cart/favorites keys are removed before the merge;
    /// the in-memory state is deliberately kept so items picked while
    /// anonymous survive into the merged cart.
    async fn on_authenticated(&self, session: Session) -> Result<UserProfile, SessionError> {
        if !session.is_valid() {
            return Err(SessionError::InvalidSession);
        }
        let user = session.user.clone();

        self.inner.store.remove(keys::CART);
        self.inner.store.remove(keys::FAVORITES);
        self.inner.handle.set(session.clone());
        store::save_json(&*self.inner.store, keys::SESSION, &session);
        info!(user_id = %user.id, "Session established");

        self.resync().await;
        let _ = self.inner.events.send(SessionEvent::LoggedIn(user.clone()));
        Ok(user)
    }

    /// Re-run the login reconciliation: merge the server-side cart into the
    /// local one and replace local favorites with the server-side list.
    ///
    /// Failures are logged and leave local state untouched; callers may
    /// invoke this again as the retry affordance.
    pub async fn resync(&self) {
        if let Err(e) = self.inner.cart.merge_from_remote().await {
            warn!(error = %e, "Cart merge after login failed; local cart kept as-is");
        }
        if let Err(e) = self.inner.favorites.replace_from_remote().await {
            warn!(error = %e, "Favorites fetch after login failed; local favorites kept as-is");
        }
    }

    // =========================================================================
    // Rehydration
    // =========================================================================

    /// Restore a persisted session on startup. Corrupt or tokenless stored
    /// sessions are discarded.
    ///
    /// A restored session triggers the login reconciliation
    /// ([`Self::resync`]) without being awaited, so the cart merge and the
    /// authoritative favorites fetch happen on startup too, not only after
    /// a credential login. Outside a Tokio runtime the reconciliation is
    /// skipped; a stale token in the stored session surfaces through the
    /// 401 path like any other authenticated call.
    pub fn rehydrate(&self) -> Option<UserProfile> {
        let session: Session = store::load_json(&*self.inner.store, keys::SESSION)?;
        if !session.is_valid() {
            warn!("Discarding stored session without a token");
            self.inner.store.remove(keys::SESSION);
            return None;
        }
        let user = session.user.clone();
        if self.inner.handle.set(session) {
            let _ = self.inner.events.send(SessionEvent::LoggedIn(user.clone()));
            self.spawn_resync();
        }
        Some(user)
    }

    /// Run [`Self::resync`] as a detached task.
    fn spawn_resync(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let manager = self.clone();
                runtime.spawn(async move { manager.resync().await });
            }
            Err(_) => warn!("No async runtime; skipping startup reconciliation"),
        }
    }

    // =========================================================================
    // Transitions to anonymous
    // =========================================================================

    /// Log out: drop the session and erase all locally persisted user
    /// state. Purely local; the bearer token simply stops being used.
    pub fn logout(&self) {
        self.teardown("User logged out");
    }

    /// Teardown on a rejected token. Same effect as [`Self::logout`] with
    /// distinct logging, used by the unauthorized watcher.
    pub fn force_logout(&self) {
        self.teardown("Session invalidated by backend");
    }

    fn teardown(&self, reason: &str) {
        // The handle transition is the gate: concurrent teardown paths
        // (multiple 401s, logout racing the watcher, the cross-handle store
        // notification) all funnel through here and only the first one
        // past the gate runs the side effects.
        if !self.inner.handle.clear() {
            return;
        }
        info!(reason, "Tearing down session");
        self.inner.store.remove(keys::SESSION);
        self.inner.cart.clear_local();
        self.inner.favorites.clear_local();
        let _ = self.inner.events.send(SessionEvent::LoggedOut);
    }

    // =========================================================================
    // Watchers
    // =========================================================================

    /// Spawn the background watchers: one turning the API client's
    /// unauthorized signal into a forced logout, one applying store changes
    /// made through other handles to the same store.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_watchers(&self) {
        let manager = self.clone();
        let mut unauthorized = self.inner.api.subscribe_unauthorized();
        tokio::spawn(async move {
            loop {
                match unauthorized.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        manager.force_logout();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let manager = self.clone();
        let mut changes = self.inner.store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => manager.apply_store_change(&change),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Store watcher lagged; refreshing from store");
                        manager.inner.cart.refresh_from_store();
                        manager.inner.favorites.refresh_from_store();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Apply one store change notification.
    ///
    /// Writes re-derive state from the store, so self-delivered changes are
    /// harmless overwrite-with-same-value operations. Cart and favorites
    /// removals are ignored: they only occur inside transitions whose final
    /// state arrives as a separate write. A session removal is a logout
    /// performed through another handle, funneled through the same
    /// idempotent teardown gate.
    fn apply_store_change(&self, change: &StoreChange) {
        match (change.key.as_str(), &change.value) {
            (keys::CART, Some(_)) => self.inner.cart.refresh_from_store(),
            (keys::FAVORITES, Some(_)) => self.inner.favorites.refresh_from_store(),
            (keys::SESSION, Some(raw)) => match serde_json::from_str::<Session>(raw) {
                Ok(session) if session.is_valid() => {
                    let user = session.user.clone();
                    if self.inner.handle.set(session) {
                        let _ = self.inner.events.send(SessionEvent::LoggedIn(user));
                    }
                }
                Ok(_) | Err(_) => {
                    warn!("Ignoring invalid session written to store");
                }
            },
            (keys::SESSION, None) => self.teardown("Session removed from store"),
            _ => {}
        }
    }
}
