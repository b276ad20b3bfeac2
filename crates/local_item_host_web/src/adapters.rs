use local_item_host::{select_backend, BackendSelection, MemoryStorage, StorageAdapter};

use crate::WebLocalStorage;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Compile-time selected backend strategy.
pub enum BackendStrategy {
    /// Probe `localStorage` and fall back to memory when it is unusable.
    LocalStorage,
    /// Always use the in-memory store.
    Memory,
}

/// Returns the compile-time selected backend strategy for the active build.
pub const fn selected_backend_strategy() -> BackendStrategy {
    #[cfg(feature = "memory-storage")]
    {
        BackendStrategy::Memory
    }

    #[cfg(not(feature = "memory-storage"))]
    {
        BackendStrategy::LocalStorage
    }
}

/// Browser backend adapter: probed `localStorage` or the in-memory fallback.
pub type LocalStorageAdapter = StorageAdapter<WebLocalStorage>;

/// Selects the backend for this process.
///
/// With the [`BackendStrategy::LocalStorage`] strategy this opens and probes `localStorage`;
/// any failure selects [`MemoryStorage`] and records the reason. Call once and keep the result.
pub fn local_storage_backend() -> BackendSelection<WebLocalStorage> {
    match selected_backend_strategy() {
        BackendStrategy::LocalStorage => select_backend(WebLocalStorage::open()),
        BackendStrategy::Memory => BackendSelection {
            backend: StorageAdapter::Memory(MemoryStorage::default()),
            fallback_reason: None,
        },
    }
}

/// Stable string token naming the backend a selection resolved to.
pub fn backend_strategy_name(selection: &BackendSelection<WebLocalStorage>) -> &'static str {
    match (&selection.backend, &selection.fallback_reason) {
        (StorageAdapter::Persistent(_), _) => "local-storage",
        (StorageAdapter::Memory(_), Some(_)) => "memory-fallback",
        (StorageAdapter::Memory(_), None) => "memory",
    }
}
