//! Cart synchronizer.
//!
//! Owns the canonical in-memory [`Cart`]. Every mutation updates memory and
//! the local store synchronously (optimistic-local-first), then — if a
//! session token is present — mirrors the change to the backend without
//! awaiting it. The backend keys cart lines by (product, size, color,
//! variant), so mirror calls translate the client's line IDs into that key.
//!
//! The only moment local and remote state are reconciled is the one-time
//! merge on login ([`CartSync::merge_from_remote`]); there is no background
//! re-sync.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use uuid::Uuid;

use tamarind_core::LineId;

use crate::api::types::{CartLinePayload, RemoteCartLine};
use crate::api::{ApiError, CartApi};
use crate::models::{Cart, CartLine, LineDraft, LineKey};
use crate::session::SessionHandle;
use crate::store::{self, LocalStore, keys};

/// A remote mutation to mirror after a local cart change.
#[derive(Debug)]
enum MirrorOp {
    Add(CartLinePayload),
    Update(LineKey, u32),
    Remove(LineKey),
}

/// Cart synchronizer service.
///
/// Cheaply cloneable; clones share the same cart. Mutation methods return
/// the updated cart immediately — the remote mirror call, when one is
/// issued, is fire-and-forget and must run inside a Tokio runtime.
#[derive(Clone)]
pub struct CartSync<A: CartApi> {
    inner: Arc<CartSyncInner<A>>,
}

struct CartSyncInner<A> {
    cart: Mutex<Cart>,
    changed: watch::Sender<Cart>,
    store: Arc<dyn LocalStore>,
    api: A,
    session: SessionHandle,
}

impl<A: CartApi> CartSync<A> {
    /// Create a synchronizer, loading any cart persisted in the store.
    ///
    /// The stored total is never trusted; it is recomputed from the lines.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, api: A, session: SessionHandle) -> Self {
        let mut cart: Cart = store::load_json(&*store, keys::CART).unwrap_or_default();
        cart.recompute_total();
        let (changed, _) = watch::channel(cart.clone());
        Self {
            inner: Arc::new(CartSyncInner {
                cart: Mutex::new(cart),
                changed,
                store,
                api,
                session,
            }),
        }
    }

    /// Snapshot of the current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.lock_cart().clone()
    }

    /// Subscribe to cart changes. The receiver always holds the latest
    /// snapshot; intermediate states may be skipped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.changed.subscribe()
    }

    // =========================================================================
    // Mutations (optimistic, local-first)
    // =========================================================================

    /// Add `quantity` of a product/variant combination.
    ///
    /// If a line with the same (product, size, color, variant) identity
    /// already exists its quantity is incremented; otherwise a new line is
    /// appended with a freshly generated line ID. Adding zero is a no-op.
    pub fn add_line(&self, draft: LineDraft, quantity: u32) -> Cart {
        if quantity == 0 {
            return self.cart();
        }

        let key = draft.key();
        let snapshot = {
            let mut cart = self.lock_cart();
            match cart.position_of_key(&key) {
                Some(pos) => {
                    if let Some(line) = cart.lines.get_mut(pos) {
                        line.quantity += quantity;
                    }
                }
                None => {
                    let line_id = LineId::new(Uuid::new_v4().to_string());
                    cart.lines.push(draft.into_line(line_id, quantity));
                }
            }
            cart.recompute_total();
            cart.clone()
        };

        self.commit(&snapshot);
        self.mirror(MirrorOp::Add(CartLinePayload::from_key(&key, quantity)));
        snapshot
    }

    /// Overwrite a line's quantity. Zero removes the line entirely.
    ///
    /// Unknown line IDs are ignored (the line may already have been removed
    /// through another handle).
    pub fn set_quantity(&self, line_id: &LineId, quantity: u32) -> Cart {
        let (snapshot, op) = {
            let mut cart = self.lock_cart();
            let Some(pos) = cart.position_of_line(line_id) else {
                return cart.clone();
            };
            let op = if quantity == 0 {
                let removed = cart.lines.remove(pos);
                Some(MirrorOp::Remove(removed.key()))
            } else {
                cart.lines.get_mut(pos).map(|line| {
                    line.quantity = quantity;
                    MirrorOp::Update(line.key(), quantity)
                })
            };
            cart.recompute_total();
            (cart.clone(), op)
        };

        self.commit(&snapshot);
        if let Some(op) = op {
            self.mirror(op);
        }
        snapshot
    }

    /// Remove a line entirely.
    pub fn remove_line(&self, line_id: &LineId) -> Cart {
        self.set_quantity(line_id, 0)
    }

    /// One-time reconciliation with the server-side cart, called on login.
    ///
    /// For each remote line, a local line matching on (product, size,
    /// color) takes the **maximum** of the two quantities — never the sum,
    /// which would double-count items added both before and after login.
    /// Remote-only lines are appended; local-only lines are kept as-is and
    /// reach the backend on their next mutation, not eagerly.
    ///
    /// # Errors
    ///
    /// Returns the fetch error unchanged; the local cart is untouched in
    /// that case. Callers surface this with a retry affordance.
    pub async fn merge_from_remote(&self) -> Result<Cart, ApiError> {
        let remote = self.inner.api.fetch_cart().await?;

        let snapshot = {
            let mut cart = self.lock_cart();
            for remote_line in remote {
                let existing = cart.lines.iter_mut().find(|l| {
                    l.matches_merge_key(
                        remote_line.product_id,
                        remote_line.size.as_deref(),
                        remote_line.color.as_deref(),
                    )
                });
                match existing {
                    Some(local) => local.quantity = local.quantity.max(remote_line.quantity),
                    None if remote_line.quantity > 0 => {
                        cart.lines.push(line_from_remote(remote_line));
                    }
                    None => {}
                }
            }
            cart.recompute_total();
            cart.clone()
        };

        self.commit(&snapshot);
        Ok(snapshot)
    }

    /// Empty the local cart without contacting the backend (logout path).
    pub fn clear_local(&self) -> Cart {
        let snapshot = {
            let mut cart = self.lock_cart();
            *cart = Cart::default();
            cart.clone()
        };
        self.commit(&snapshot);
        snapshot
    }

    /// Explicit "empty cart" user action: delete the server-side cart,
    /// then clear locally. The remote failure policy matches every other
    /// mutation — logged, swallowed, local clear proceeds.
    pub async fn clear_remote_and_local(&self) -> Cart {
        if self.inner.session.token().is_some()
            && let Err(e) = self.inner.api.push_cart_clear().await
        {
            tracing::warn!(error = %e, "Remote cart clear failed; clearing locally anyway");
        }
        self.clear_local()
    }

    /// Re-read the cart from the store (another handle wrote it).
    pub(crate) fn refresh_from_store(&self) {
        let Some(mut loaded) = store::load_json::<Cart>(&*self.inner.store, keys::CART) else {
            return;
        };
        loaded.recompute_total();
        let snapshot = {
            let mut cart = self.lock_cart();
            *cart = loaded;
            cart.clone()
        };
        let _ = self.inner.changed.send(snapshot);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_cart(&self) -> MutexGuard<'_, Cart> {
        self.inner
            .cart
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Persist a snapshot and notify observers. Called without the lock.
    fn commit(&self, snapshot: &Cart) {
        store::save_json(&*self.inner.store, keys::CART, snapshot);
        let _ = self.inner.changed.send(snapshot.clone());
    }

    /// Mirror a mutation to the backend, fire-and-forget.
    ///
    /// Skipped entirely for anonymous sessions. Failures are logged and
    /// never undo the local mutation; rejected tokens surface through the
    /// API client's global unauthorized signal, not here.
    fn mirror(&self, op: MirrorOp) {
        if self.inner.session.token().is_none() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime; skipping remote cart mirror");
            return;
        };
        let api = self.inner.api.clone();
        handle.spawn(async move {
            let result = match op {
                MirrorOp::Add(payload) => api.push_cart_add(payload).await,
                MirrorOp::Update(key, quantity) => api.push_cart_update(key, quantity).await,
                MirrorOp::Remove(key) => api.push_cart_remove(key).await,
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "Remote cart mirror call failed; keeping local state");
            }
        });
    }
}

/// Materialize a remote-only line locally, generating a fresh line ID.
fn line_from_remote(remote: RemoteCartLine) -> CartLine {
    CartLine {
        line_id: LineId::new(Uuid::new_v4().to_string()),
        product_id: remote.product_id,
        name: remote.name,
        unit_price: remote.price,
        image: remote.image,
        quantity: remote.quantity,
        size: remote.size,
        color: remote.color,
        variant_id: remote.variant_id,
        variant_label: remote.variant_label,
    }
}
