//! Validated, subscribable access to raw key/value storage.
//!
//! Stored strings are untrusted: every read runs through a codec and lands in a tri-state
//! [`LocalValue`] (absent, invalid with every validation error, or valid). One shared
//! [`ItemCell`] per key owns that value, persists writes through a [`StorageBackend`] and fans
//! changes out to subscribers. Concrete browser storage lives in `local_item_host_web`; UI
//! bindings live in `local_item_storage`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod cell;
pub mod codec;
pub mod keys;
pub mod registry;
pub mod storage;
pub mod value;

pub use cell::{FaultSink, ItemCell, Subscriber, SubscriberToken, Subscription, WriteError};
pub use codec::{
    decode_raw, encode_value, json, json_with, EncodeError, JsonKind, JsonText, LiteralUnion,
    Pipe, RecordSchema, Schema, SchemaExt, SerdeValue, SharedCodec, StorageCodec,
};
pub use keys::{ItemKey, ItemKeys, RegistryError};
pub use registry::ItemRegistry;
pub use storage::{
    probe_backend, select_backend, BackendSelection, ExternalChange, ExternalChangeListener,
    MemoryStorage, StorageAdapter, StorageBackend, StorageError, PROBE_KEY,
};
pub use value::{
    Defaulted, EmptyValidationErrors, LocalValue, ValidationError, ValidationErrors,
};
