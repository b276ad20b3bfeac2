//! Browser (`wasm32`) storage backend for [`local_item_host`].
//!
//! Provides the `localStorage` adapter, its cross-tab change listener, and the one-shot
//! probe-based selection between `localStorage` and the in-memory fallback. Off `wasm32` the
//! browser backend reports itself unavailable, so selection always lands on memory.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Compile-time strategy selection and probe-based backend factory.
pub mod adapters;
pub mod storage;

pub use adapters::{
    backend_strategy_name, local_storage_backend, selected_backend_strategy, BackendStrategy,
    LocalStorageAdapter,
};
pub use storage::local_storage::WebLocalStorage;
