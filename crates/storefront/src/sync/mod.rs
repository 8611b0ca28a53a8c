//! Local-first synchronizers for the cart and favorites collections.
//!
//! Both synchronizers follow the same shape: the in-memory value is the
//! canonical state for this process, every mutation is persisted to the
//! local store before returning, and — only when a session token is
//! present — mirrored to the backend as a fire-and-forget call. A failed
//! mirror call is logged and swallowed; the local state is never rolled
//! back. Consumers observe changes through a `watch` channel.

pub mod cart;
pub mod favorites;

pub use cart::CartSync;
pub use favorites::FavoritesSync;
