//! Tamarind Market storefront client core.
//!
//! This crate implements the state layer of the customer-facing storefront:
//! a local-first cart and favorites model reconciled with a remote REST
//! backend, gated by a single session state.
//!
//! # Architecture
//!
//! - [`store`] - durable key-value store with a change-notification channel
//!   (the browser-localStorage role, backend-agnostic)
//! - [`api`] - REST client for the backend (cart, favorites, auth, catalog,
//!   orders), with the remote seams expressed as traits
//! - [`sync`] - the cart and favorites synchronizers: every mutation lands
//!   in the local store first, then mirrors to the backend when a session
//!   token is present, without ever rolling back the local change
//! - [`session`] - authenticated/anonymous state machine driving the
//!   merge-on-login and clear-on-logout transitions
//! - [`catalog`] - product browsing parameters and image URL normalization
//! - [`state`] - `AppState` wiring the above into one cloneable handle
//!
//! # Consistency model
//!
//! Local store writes are synchronous and strictly ordered per handle.
//! Remote mirror calls are fire-and-forget and may resolve out of order;
//! the backend converges at the next explicit sync point (login merge or a
//! subsequent mutation). This is a deliberate availability-over-consistency
//! trade: a shopping cart tolerates approximate remote state.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use state::AppState;
