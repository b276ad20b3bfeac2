//! Raw key/value storage contract and the in-memory implementation.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failure reported by a [`StorageBackend`].
pub enum StorageError {
    /// The persistent store does not exist or is disabled.
    #[error("persistent storage unavailable")]
    Unavailable,
    /// Writing a key failed (quota exceeded, storage revoked mid-session).
    #[error("write `{key}` failed: {reason}")]
    Write {
        /// Key being written.
        key: String,
        /// Backend-specific description.
        reason: String,
    },
    /// Removing a key failed.
    #[error("remove `{key}` failed: {reason}")]
    Remove {
        /// Key being removed.
        key: String,
        /// Backend-specific description.
        reason: String,
    },
    /// The capability probe read back something other than what it wrote.
    #[error("capability probe failed: {reason}")]
    Probe {
        /// What went wrong.
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Change made to the backing store by another execution context (another tab).
pub struct ExternalChange {
    /// Changed key, or `None` when the whole store was cleared.
    pub key: Option<String>,
    /// Raw content now stored under `key`; `None` when it was removed.
    pub new_raw: Option<String>,
}

impl ExternalChange {
    /// A single key changed or was removed.
    pub fn key(key: impl Into<String>, new_raw: Option<String>) -> Self {
        Self {
            key: Some(key.into()),
            new_raw,
        }
    }

    /// Every key was removed.
    pub fn cleared() -> Self {
        Self {
            key: None,
            new_raw: None,
        }
    }
}

/// Callback receiving [`ExternalChange`] notifications.
pub type ExternalChangeListener = Rc<dyn Fn(&ExternalChange)>;

/// Synchronous raw string storage keyed by string.
pub trait StorageBackend {
    /// Reads the raw string stored under `key`.
    fn read(&self, key: &str) -> Option<String>;

    /// Stores `raw` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write.
    fn write(&self, key: &str, raw: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Registers a listener for changes made outside the current execution context.
    ///
    /// Backends without cross-context notifications drop the listener.
    fn on_external_change(&self, listener: ExternalChangeListener) {
        let _ = listener;
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Rc<B> {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        (**self).write(key, raw)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn on_external_change(&self, listener: ExternalChangeListener) {
        (**self).on_external_change(listener);
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory raw store keyed by string. Never fails and never fires external changes.
pub struct MemoryStorage {
    inner: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.inner.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        self.inner
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn memory_storage_round_trip_and_remove() {
        let store = MemoryStorage::default();
        let store_obj: &dyn StorageBackend = &store;

        store_obj.write("pref.key", "{\"k\":1}").expect("write");
        assert_eq!(store_obj.read("pref.key"), Some("{\"k\":1}".to_string()));
        store_obj.remove("pref.key").expect("remove");
        assert_eq!(store_obj.read("pref.key"), None);
        store_obj.remove("pref.key").expect("remove missing");
        assert!(store.is_empty());
    }

    #[test]
    fn memory_storage_clones_share_entries() {
        let store = MemoryStorage::default();
        let clone = store.clone();
        store.write("a", "1").expect("write");
        assert_eq!(clone.read("a"), Some("1".to_string()));
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn memory_storage_drops_external_listeners() {
        let store = MemoryStorage::default();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        store.on_external_change(Rc::new(move |_| flag.set(true)));
        store.write("a", "1").expect("write");
        assert!(!fired.get());
        assert_eq!(Rc::strong_count(&fired), 1);
    }

    #[test]
    fn storage_errors_render_context() {
        let err = StorageError::Write {
            key: "theme".to_string(),
            reason: "QuotaExceededError".to_string(),
        };
        assert_eq!(err.to_string(), "write `theme` failed: QuotaExceededError");
    }
}
