//! Recording mock of the remote API seams, shared by synchronizer and
//! session tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use tamarind_core::ProductId;

use crate::models::{LineKey, Session, UserProfile};

use super::types::{CartLinePayload, RemoteCartLine, RemoteFavorite};
use super::{ApiError, AuthApi, CartApi, FavoritesApi, Unauthorized};

/// One remote call observed by the mock, with the arguments tests care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordedCall {
    FetchCart,
    CartAdd(ProductId, u32),
    CartUpdate(ProductId, u32),
    CartRemove(ProductId),
    CartClear,
    FetchFavorites,
    FavoriteAdd(ProductId),
    FavoriteRemove(ProductId),
    FavoritesClear,
    Login,
    Register,
    Me,
}

/// In-memory stand-in for the backend.
///
/// Records every call, keeps a mutable server-side cart/favorites state,
/// and can be switched into failure or reject-everything (401) modes.
#[derive(Clone)]
pub(crate) struct MockApi {
    inner: Arc<MockApiInner>,
}

struct MockApiInner {
    remote_cart: Mutex<Vec<RemoteCartLine>>,
    remote_favorites: Mutex<Vec<RemoteFavorite>>,
    session: Mutex<Option<Session>>,
    calls: Mutex<Vec<RecordedCall>>,
    fail_mutations: AtomicBool,
    reject_all: AtomicBool,
    unauthorized: broadcast::Sender<Unauthorized>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        let (unauthorized, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(MockApiInner {
                remote_cart: Mutex::new(Vec::new()),
                remote_favorites: Mutex::new(Vec::new()),
                session: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                fail_mutations: AtomicBool::new(false),
                reject_all: AtomicBool::new(false),
                unauthorized,
            }),
        }
    }

    pub(crate) fn set_remote_cart(&self, lines: Vec<RemoteCartLine>) {
        *self.inner.remote_cart.lock().unwrap() = lines;
    }

    pub(crate) fn remote_cart(&self) -> Vec<RemoteCartLine> {
        self.inner.remote_cart.lock().unwrap().clone()
    }

    pub(crate) fn set_remote_favorites(&self, favorites: Vec<RemoteFavorite>) {
        *self.inner.remote_favorites.lock().unwrap() = favorites;
    }

    pub(crate) fn set_session(&self, session: Session) {
        *self.inner.session.lock().unwrap() = Some(session);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Make every mutation call fail with an HTTP 500.
    pub(crate) fn fail_mutations(&self, fail: bool) {
        self.inner.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail with 401 and broadcast the unauthorized signal,
    /// as a live client would.
    pub(crate) fn reject_all(&self, reject: bool) {
        self.inner.reject_all.store(reject, Ordering::SeqCst);
    }

    fn record(&self, call: RecordedCall) -> Result<(), ApiError> {
        self.inner.calls.lock().unwrap().push(call);
        if self.inner.reject_all.load(Ordering::SeqCst) {
            let _ = self.inner.unauthorized.send(Unauthorized);
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    fn mutation_guard(&self) -> Result<(), ApiError> {
        if self.inner.fail_mutations.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                message: "mock mutation failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl CartApi for MockApi {
    async fn fetch_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError> {
        self.record(RecordedCall::FetchCart)?;
        Ok(self.remote_cart())
    }

    async fn push_cart_add(&self, line: CartLinePayload) -> Result<(), ApiError> {
        self.record(RecordedCall::CartAdd(line.product_id, line.quantity))?;
        self.mutation_guard()?;
        let mut cart = self.inner.remote_cart.lock().unwrap();
        if let Some(existing) = cart.iter_mut().find(|l| {
            l.product_id == line.product_id
                && l.size == line.size
                && l.color == line.color
                && l.variant_id == line.variant_id
        }) {
            existing.quantity += line.quantity;
        } else {
            cart.push(RemoteCartLine {
                product_id: line.product_id,
                quantity: line.quantity,
                size: line.size,
                color: line.color,
                variant_id: line.variant_id,
                name: String::new(),
                price: rust_decimal::Decimal::ZERO,
                image: String::new(),
                variant_label: None,
            });
        }
        Ok(())
    }

    async fn push_cart_update(&self, key: LineKey, quantity: u32) -> Result<(), ApiError> {
        self.record(RecordedCall::CartUpdate(key.product_id, quantity))?;
        self.mutation_guard()?;
        let mut cart = self.inner.remote_cart.lock().unwrap();
        if let Some(existing) = cart.iter_mut().find(|l| {
            l.product_id == key.product_id
                && l.size == key.size
                && l.color == key.color
                && l.variant_id == key.variant_id
        }) {
            existing.quantity = quantity;
        }
        Ok(())
    }

    async fn push_cart_remove(&self, key: LineKey) -> Result<(), ApiError> {
        self.record(RecordedCall::CartRemove(key.product_id))?;
        self.mutation_guard()?;
        self.inner.remote_cart.lock().unwrap().retain(|l| {
            !(l.product_id == key.product_id
                && l.size == key.size
                && l.color == key.color
                && l.variant_id == key.variant_id)
        });
        Ok(())
    }

    async fn push_cart_clear(&self) -> Result<(), ApiError> {
        self.record(RecordedCall::CartClear)?;
        self.mutation_guard()?;
        self.inner.remote_cart.lock().unwrap().clear();
        Ok(())
    }
}

impl FavoritesApi for MockApi {
    async fn fetch_favorites(&self) -> Result<Vec<RemoteFavorite>, ApiError> {
        self.record(RecordedCall::FetchFavorites)?;
        Ok(self.inner.remote_favorites.lock().unwrap().clone())
    }

    async fn push_favorite_add(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.record(RecordedCall::FavoriteAdd(product_id))?;
        self.mutation_guard()
    }

    async fn push_favorite_remove(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.record(RecordedCall::FavoriteRemove(product_id))?;
        self.mutation_guard()
    }

    async fn push_favorites_clear(&self) -> Result<(), ApiError> {
        self.record(RecordedCall::FavoritesClear)?;
        self.mutation_guard()
    }
}

impl AuthApi for MockApi {
    async fn login(&self, _email: String, _password: String) -> Result<Session, ApiError> {
        self.record(RecordedCall::Login)?;
        self.inner
            .session
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Status {
                status: 400,
                message: "invalid credentials".to_owned(),
            })
    }

    async fn register(
        &self,
        _name: String,
        _email: String,
        _password: String,
    ) -> Result<Session, ApiError> {
        self.record(RecordedCall::Register)?;
        self.inner
            .session
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Status {
                status: 400,
                message: "registration rejected".to_owned(),
            })
    }

    async fn current_user(&self, token: String) -> Result<UserProfile, ApiError> {
        self.record(RecordedCall::Me)?;
        let session = self.inner.session.lock().unwrap().clone();
        match session {
            Some(s) if s.token == token => Ok(s.user),
            _ => Err(ApiError::Unauthorized),
        }
    }

    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.inner.unauthorized.subscribe()
    }
}
