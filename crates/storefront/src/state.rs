//! Application state wiring the storefront subsystems together.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::{SessionHandle, SessionManager};
use crate::store::{FileStore, LocalStore, MemoryStore};
use crate::sync::{CartSync, FavoritesSync};

/// Fully wired storefront client state.
///
/// Cheaply cloneable via `Arc`. Construction wires one shared
/// [`SessionHandle`] through the API client and both synchronizers, picks
/// the store backend from the configuration, and rehydrates any persisted
/// session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: ApiClient,
    cart: CartSync<ApiClient>,
    favorites: FavoritesSync<ApiClient>,
    session: SessionManager<ApiClient>,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// Uses a [`FileStore`] under `config.data_dir` when set, otherwise an
    /// in-memory store that lasts for the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let store: Arc<dyn LocalStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };

        let handle = SessionHandle::new();
        let api = ApiClient::new(&config, handle.clone());
        let cart = CartSync::new(store.clone(), api.clone(), handle.clone());
        let favorites = FavoritesSync::new(store.clone(), api.clone(), handle.clone());
        let session = SessionManager::new(handle, store, api.clone(), cart.clone(), favorites.clone());
        session.rehydrate();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart,
                favorites,
                session,
            }),
        })
    }

    /// Spawn the session background watchers. Must be called from within a
    /// Tokio runtime; typically once at startup.
    pub fn start_watchers(&self) {
        self.inner.session.spawn_watchers();
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the cart synchronizer.
    #[must_use]
    pub fn cart(&self) -> &CartSync<ApiClient> {
        &self.inner.cart
    }

    /// Get a reference to the favorites synchronizer.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesSync<ApiClient> {
        &self.inner.favorites
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn session(&self) -> &SessionManager<ApiClient> {
        &self.inner.session
    }
}
