//! Persistent local key-value store.
//!
//! Plays the role browser `localStorage` plays for the storefront: a small,
//! synchronous, durable map caching the cart, favorites, and session across
//! restarts. Change notification is a generic pub/sub channel scoped to the
//! stored keys, so any consumer holding a handle to the same store observes
//! writes made through other handles (the "other tab" case).
//!
//! Failure semantics follow the localStorage contract: reads of malformed
//! stored JSON are logged and treated as absent, and write failures are
//! logged and swallowed. Callers never crash on corrupt local data.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the change-notification channel.
///
/// Slow subscribers that lag past this many events miss the intermediate
/// states and re-derive from the store on the next event they do receive.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Well-known storage keys.
pub mod keys {
    /// Serialized [`crate::models::Cart`].
    pub const CART: &str = "cart";
    /// Serialized favorites list.
    pub const FAVORITES: &str = "favorites";
    /// Serialized [`crate::models::Session`].
    pub const SESSION: &str = "session";
}

/// Errors that can occur when opening a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing directory could not be created or accessed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A change observed on the store: the key and its new value
/// (`None` when the key was removed).
#[derive(Debug, Clone)]
pub struct StoreChange {
    /// The key that changed.
    pub key: String,
    /// The new value, or `None` for a removal.
    pub value: Option<String>,
}

/// Durable, synchronous key-value storage with change notification.
///
/// Implementations must deliver a [`StoreChange`] to all subscribers for
/// every `write` and `remove`, including ones made through the same handle
/// (consumers are expected to treat self-delivered changes idempotently).
pub trait LocalStore: Send + Sync {
    /// Read the raw value for a key, or `None` if absent.
    fn read(&self, key: &str) -> Option<String>;

    /// Overwrite the value for a key. No partial updates.
    fn write(&self, key: &str, value: &str);

    /// Remove a key. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Subscribe to change notifications for all keys.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Load and deserialize a stored JSON value.
///
/// Malformed JSON is logged at WARN and treated as absent rather than
/// propagated; local corruption must never surface as an error.
pub fn load_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.read(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding corrupt stored value");
            None
        }
    }
}

/// Serialize and store a JSON value.
///
/// Serialization failure is logged and swallowed; the in-memory state
/// remains authoritative for this process either way.
pub fn save_json<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.write(key, &raw),
        Err(e) => tracing::error!(key, error = %e, "Failed to serialize value for storage"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn test_load_json_roundtrip() {
        let store = MemoryStore::new();
        save_json(&store, "sample", &Sample { n: 7 });
        let loaded: Option<Sample> = load_json(&store, "sample");
        assert_eq!(loaded, Some(Sample { n: 7 }));
    }

    #[test]
    fn test_load_json_corrupt_treated_as_absent() {
        let store = MemoryStore::new();
        store.write("sample", "{not json");
        let loaded: Option<Sample> = load_json(&store, "sample");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_json_absent() {
        let store = MemoryStore::new();
        let loaded: Option<Sample> = load_json(&store, "missing");
        assert!(loaded.is_none());
    }
}
