//! File-backed store backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use super::{CHANGE_CHANNEL_CAPACITY, LocalStore, StoreChange, StoreError};

/// Durable [`LocalStore`] keeping one JSON document per key under a data
/// directory (`{dir}/{key}.json`).
///
/// Writes are synchronous and last-write-wins; there is no locking across
/// processes. Change notification covers handles cloned from this one
/// (handles within the same process); a separate process over the same
/// directory sees the files but not the events.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    dir: PathBuf,
    changes: broadcast::Sender<StoreChange>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(FileStoreInner {
                dir: dir.to_owned(),
                changes,
            }),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal constants (see `store::keys`), not user input.
        self.inner.dir.join(format!("{key}.json"))
    }

    fn notify(&self, key: &str, value: Option<String>) {
        let _ = self.inner.changes.send(StoreChange {
            key: key.to_owned(),
            value,
        });
    }
}

impl LocalStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        if let Err(e) = std::fs::write(&path, value) {
            // localStorage semantics: a failed write is logged, not raised.
            tracing::error!(key, path = %path.display(), error = %e, "Failed to persist value");
            return;
        }
        self.notify(key, Some(value.to_owned()));
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => self.notify(key, None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(key, path = %path.display(), error = %e, "Failed to remove value");
            }
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

    fn temp_store() -> (FileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("tamarind-store-{}", uuid::Uuid::new_v4()));
        (FileStore::open(&dir).unwrap(), dir)
    }

    #[test]
    fn test_read_write_remove_roundtrip() {
        let (store, dir) = temp_store();
        assert!(store.read("cart").is_none());

        store.write("cart", "{\"lines\":[]}");
        assert_eq!(store.read("cart").as_deref(), Some("{\"lines\":[]}"));
        assert!(dir.join("cart.json").exists());

        store.remove("cart");
        assert!(store.read("cart").is_none());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_survives_reopen() {
        let (store, dir) = temp_store();
        store.write("session", "{}");
        drop(store);

        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(reopened.read("session").as_deref(), Some("{}"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_change_notification() {
        let (store, dir) = temp_store();
        let mut changes = store.subscribe();

        store.write("favorites", "[]");
        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, "favorites");
        assert_eq!(change.value.as_deref(), Some("[]"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
