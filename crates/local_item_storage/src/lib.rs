//! Reactive, schema-validated local items for Leptos components.
//!
//! This crate binds the shared per-key cells of [`local_item_host`] to Leptos signals. Keys are
//! declared once with a codec, turned into hooks with [`make_use_local_item`] or
//! [`make_defaulted_use_local_item`], and every component calling the same hook observes the
//! same value. The backend is `localStorage` when it passes a write/read/remove probe and an
//! in-memory store otherwise.
//!
//! # Example
//!
//! ```rust
//! use local_item_storage::{
//!     json_with, make_defaulted_use_local_item, ItemKeys, LiteralUnion,
//! };
//! use leptos::SignalGetUntracked;
//!
//! let _runtime = leptos::create_runtime();
//! let mut keys = ItemKeys::new();
//! let theme = keys
//!     .declare("theme", json_with(LiteralUnion::new(["light", "dark"])))
//!     .expect("theme key should be unique");
//! let use_theme = make_defaulted_use_local_item(theme, || "light".to_string());
//!
//! let item = use_theme();
//! assert_eq!(item.value.get_untracked(), Ok("light".to_string()));
//! item.writer.set("dark".to_string()).expect("memory fallback accepts writes");
//! assert_eq!(item.value.get_untracked(), Ok("dark".to_string()));
//! ```

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

mod host_adapters;
pub mod hooks;

pub use hooks::{
    make_defaulted_use_local_item, make_use_local_item, provide_item_registry,
    use_defaulted_local_item_in, use_local_item_in, DefaultedLocalItem, LocalItem,
    LocalItemWriter,
};
pub use local_item_host::{
    json, json_with, Defaulted, EncodeError, ItemKey, ItemKeys, ItemRegistry, JsonKind, JsonText,
    LiteralUnion, LocalValue, RecordSchema, RegistryError, Schema, SchemaExt, SerdeValue,
    StorageError, ValidationError, ValidationErrors, WriteError,
};

/// Returns the process-wide item registry, selecting the storage backend on first use.
pub fn item_registry() -> ItemRegistry {
    host_adapters::item_registry()
}

/// Names the backend the process-wide registry uses.
///
/// One of `"local-storage"`, `"memory"` (forced by the `memory-storage` feature), or
/// `"memory-fallback"` (the probe failed or no browser window exists).
pub fn storage_backend_name() -> &'static str {
    host_adapters::storage_strategy()
}
