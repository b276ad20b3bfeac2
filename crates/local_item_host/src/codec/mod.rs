//! Decode/validate and encode pipeline between raw stored strings and typed values.
//!
//! A [`Schema`] converts one representation into another and back. Schemas compose left to
//! right with [`SchemaExt::pipe`]; decoding short-circuits on the first stage that rejects its
//! input. The storage-facing entry points [`decode_raw`] and [`encode_value`] never panic: a
//! panicking schema is caught at this boundary and reported as data.

pub mod json;
pub mod literal;
pub mod record;

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

use thiserror::Error;

use crate::value::{LocalValue, ValidationError, ValidationErrors};

pub use json::{json, json_with, JsonKind, JsonText, SerdeValue};
pub use literal::LiteralUnion;
pub use record::RecordSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("encode failed: {0}")]
/// A value could not be encoded for storage.
pub struct EncodeError(pub String);

/// Paired decode/encode conversion between an input representation and a typed output.
pub trait Schema {
    /// Representation consumed by [`Schema::decode`] and produced by [`Schema::encode`].
    type Input;
    /// Typed value produced by a successful decode.
    type Output;

    /// Parses and validates `input`, reporting every violation found.
    fn decode(&self, input: Self::Input) -> Result<Self::Output, ValidationErrors>;

    /// Converts a value back into the input representation.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` does not satisfy this schema's runtime predicate.
    fn encode(&self, value: &Self::Output) -> Result<Self::Input, EncodeError>;
}

/// Schema whose input is the raw string held by a storage backend.
pub type StorageCodec<V> = dyn Schema<Input = String, Output = V>;

/// Shared handle to a [`StorageCodec`].
pub type SharedCodec<V> = Rc<StorageCodec<V>>;

/// Composition helpers available on every [`Schema`].
pub trait SchemaExt: Schema + Sized {
    /// Chains `next` after `self`: decode runs `self` first, encode runs `next` first.
    fn pipe<B>(self, next: B) -> Pipe<Self, B>
    where
        B: Schema<Input = Self::Output>,
    {
        Pipe {
            first: self,
            second: next,
        }
    }
}

impl<S: Schema> SchemaExt for S {}

#[derive(Debug, Clone)]
/// Two schemas run in sequence. Built with [`SchemaExt::pipe`].
pub struct Pipe<A, B> {
    first: A,
    second: B,
}

impl<A, B> Schema for Pipe<A, B>
where
    A: Schema,
    B: Schema<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn decode(&self, input: Self::Input) -> Result<Self::Output, ValidationErrors> {
        let middle = self.first.decode(input)?;
        self.second.decode(middle)
    }

    fn encode(&self, value: &Self::Output) -> Result<Self::Input, EncodeError> {
        let middle = self.second.encode(value)?;
        self.first.encode(&middle)
    }
}

/// Decodes raw storage content into a [`LocalValue`].
///
/// `None` yields `Absent`. A panicking codec yields a single `Invalid` entry.
pub fn decode_raw<V>(codec: &StorageCodec<V>, raw: Option<String>) -> LocalValue<V> {
    let Some(raw) = raw else {
        return LocalValue::Absent;
    };
    match catch_unwind(AssertUnwindSafe(|| codec.decode(raw))) {
        Ok(result) => result.into(),
        Err(payload) => LocalValue::Invalid(ValidationErrors::single(ValidationError::root(
            format!("codec panicked during decode: {}", panic_message(payload.as_ref())),
        ))),
    }
}

/// Encodes a typed value into raw storage content.
///
/// # Errors
///
/// Returns an error when the codec rejects `value` or panics while encoding it.
pub fn encode_value<V>(codec: &StorageCodec<V>, value: &V) -> Result<String, EncodeError> {
    match catch_unwind(AssertUnwindSafe(|| codec.encode(value))) {
        Ok(result) => result,
        Err(payload) => Err(EncodeError(format!(
            "codec panicked during encode: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
