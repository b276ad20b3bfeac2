//! One-shot capability probe and persistent/in-memory backend selection.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::backend::{ExternalChangeListener, MemoryStorage, StorageBackend, StorageError};

/// Reserved key written and removed by [`probe_backend`]. Never valid as an item key.
pub const PROBE_KEY: &str = "__local_item_probe__";
const PROBE_VALUE: &str = "probe";

/// Checks that `backend` can write, read back and remove a value.
///
/// # Errors
///
/// Returns the first failure, including a panic raised by the backend.
pub fn probe_backend<B: StorageBackend + ?Sized>(backend: &B) -> Result<(), StorageError> {
    catch_unwind(AssertUnwindSafe(|| {
        backend.write(PROBE_KEY, PROBE_VALUE)?;
        let read_back = backend.read(PROBE_KEY);
        backend.remove(PROBE_KEY)?;
        if read_back.as_deref() == Some(PROBE_VALUE) {
            Ok(())
        } else {
            Err(StorageError::Probe {
                reason: format!("read back {read_back:?} after writing {PROBE_VALUE:?}"),
            })
        }
    }))
    .unwrap_or_else(|_| {
        Err(StorageError::Probe {
            reason: "backend panicked".to_string(),
        })
    })
}

/// Backend chosen by [`select_backend`]: the persistent candidate or the in-memory fallback.
#[derive(Debug, Clone)]
pub enum StorageAdapter<P> {
    /// Persistent backend that passed the probe.
    Persistent(P),
    /// In-memory fallback.
    Memory(MemoryStorage),
}

impl<P> StorageAdapter<P> {
    /// Returns `true` when values survive a reload.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl<P: StorageBackend> StorageBackend for StorageAdapter<P> {
    fn read(&self, key: &str) -> Option<String> {
        match self {
            Self::Persistent(store) => store.read(key),
            Self::Memory(store) => store.read(key),
        }
    }

    fn write(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        match self {
            Self::Persistent(store) => store.write(key, raw),
            Self::Memory(store) => store.write(key, raw),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Persistent(store) => store.remove(key),
            Self::Memory(store) => store.remove(key),
        }
    }

    fn on_external_change(&self, listener: ExternalChangeListener) {
        match self {
            Self::Persistent(store) => store.on_external_change(listener),
            Self::Memory(store) => store.on_external_change(listener),
        }
    }
}

#[derive(Debug, Clone)]
/// Outcome of backend selection.
pub struct BackendSelection<P> {
    /// Backend to use for the rest of the process.
    pub backend: StorageAdapter<P>,
    /// Why the persistent candidate was rejected, when it was.
    pub fallback_reason: Option<StorageError>,
}

/// Probes `candidate` and falls back to [`MemoryStorage`] on any failure.
pub fn select_backend<P: StorageBackend>(
    candidate: Result<P, StorageError>,
) -> BackendSelection<P> {
    let probed = candidate.and_then(|store| probe_backend(&store).map(|()| store));
    match probed {
        Ok(store) => BackendSelection {
            backend: StorageAdapter::Persistent(store),
            fallback_reason: None,
        },
        Err(err) => BackendSelection {
            backend: StorageAdapter::Memory(MemoryStorage::default()),
            fallback_reason: Some(err),
        },
    }
}
