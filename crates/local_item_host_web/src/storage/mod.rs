//! Browser storage backends.

pub mod local_storage;
