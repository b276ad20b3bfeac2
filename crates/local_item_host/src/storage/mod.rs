//! Raw storage backends and backend selection.

pub mod backend;
pub mod probe;

pub use backend::{
    ExternalChange, ExternalChangeListener, MemoryStorage, StorageBackend, StorageError,
};
pub use probe::{probe_backend, select_backend, BackendSelection, StorageAdapter, PROBE_KEY};
