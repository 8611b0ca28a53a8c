//! Domain models for the storefront client.

pub mod cart;
pub mod favorites;
pub mod session;

pub use cart::{Cart, CartLine, LineDraft, LineKey};
pub use favorites::FavoriteEntry;
pub use session::{Session, UserProfile};
