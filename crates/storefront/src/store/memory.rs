//! In-memory store backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::{CHANGE_CHANNEL_CAPACITY, LocalStore, StoreChange};

/// Volatile [`LocalStore`] backed by a `HashMap`.
///
/// Used for tests and for runs without a configured data directory.
/// Cloned handles share the same map and change channel, which models
/// multiple tabs over one origin's storage.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    values: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryStoreInner {
                values: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    fn notify(&self, key: &str, value: Option<String>) {
        // No subscribers is fine; the send error is irrelevant.
        let _ = self.inner.changes.send(StoreChange {
            key: key.to_owned(),
            value,
        });
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Poisoning only happens if a writer panicked; the map itself is
        // still coherent for last-write-wins storage.
        self.inner
            .values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.lock_values().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.lock_values().insert(key.to_owned(), value.to_owned());
        self.notify(key, Some(value.to_owned()));
    }

    fn remove(&self, key: &str) {
        let existed = self.lock_values().remove(key).is_some();
        if existed {
            self.notify(key, None);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_remove() {
        let store = MemoryStore::new();
        assert!(store.read("k").is_none());

        store.write("k", "v1");
        assert_eq!(store.read("k").as_deref(), Some("v1"));

        store.write("k", "v2");
        assert_eq!(store.read("k").as_deref(), Some("v2"));

        store.remove("k");
        assert!(store.read("k").is_none());
    }

    #[tokio::test]
    async fn test_change_notification_across_handles() {
        let store = MemoryStore::new();
        let other_tab = store.clone();
        let mut changes = other_tab.subscribe();

        store.write("cart", "[]");
        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, "cart");
        assert_eq!(change.value.as_deref(), Some("[]"));

        store.remove("cart");
        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, "cart");
        assert!(change.value.is_none());
    }

    #[tokio::test]
    async fn test_removing_absent_key_emits_nothing() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();
        store.remove("missing");
        assert!(changes.try_recv().is_err());
    }
}
