//! JSON text codecs.

use std::{fmt, marker::PhantomData};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use serde_path_to_error::Segment;

use super::{EncodeError, Pipe, Schema, SchemaExt};
use crate::value::{ValidationError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Top-level shape of a JSON value.
pub enum JsonKind {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// Any JSON number.
    Number,
    /// A JSON string.
    String,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl JsonKind {
    /// Returns the kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns `true` when `value` has this kind.
    pub fn matches(self, value: &Value) -> bool {
        Self::of(value) == self
    }

    /// Stable lowercase name used in validation messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts any value of this kind unchanged.
impl Schema for JsonKind {
    type Input = Value;
    type Output = Value;

    fn decode(&self, input: Value) -> Result<Value, ValidationErrors> {
        if self.matches(&input) {
            Ok(input)
        } else {
            let found = JsonKind::of(&input);
            Err(ValidationError::root(format!("expected {self}, found {found}")).into())
        }
    }

    fn encode(&self, value: &Value) -> Result<Value, EncodeError> {
        if self.matches(value) {
            Ok(value.clone())
        } else {
            Err(EncodeError(format!("expected {self}, found {}", JsonKind::of(value))))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Raw string <-> [`serde_json::Value`] using standard JSON syntax.
pub struct JsonText;

impl Schema for JsonText {
    type Input = String;
    type Output = Value;

    fn decode(&self, input: String) -> Result<Value, ValidationErrors> {
        serde_json::from_str(&input)
            .map_err(|e| ValidationError::root(format!("invalid JSON: {e}")).into())
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        serde_json::to_string(value).map_err(|e| EncodeError(e.to_string()))
    }
}

/// [`serde_json::Value`] <-> `T` through the type's serde implementations.
pub struct SerdeValue<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeValue<T> {
    /// Creates the schema.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeValue<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeValue")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> Schema for SerdeValue<T> {
    type Input = Value;
    type Output = T;

    fn decode(&self, input: Value) -> Result<T, ValidationErrors> {
        deserialize_all(input, Vec::new()).map_err(collected)
    }

    fn encode(&self, value: &T) -> Result<Value, EncodeError> {
        serde_json::to_value(value).map_err(|e| EncodeError(e.to_string()))
    }
}

enum Step {
    Key(String),
    Index(usize),
    Opaque,
}

impl From<&Segment> for Step {
    fn from(segment: &Segment) -> Self {
        match segment {
            Segment::Map { key } => Self::Key(key.clone()),
            Segment::Seq { index } => Self::Index(*index),
            _ => Self::Opaque,
        }
    }
}

fn join_steps(steps: &[Step]) -> String {
    steps
        .iter()
        .map(|step| match step {
            Step::Key(key) => key.clone(),
            Step::Index(index) => index.to_string(),
            Step::Opaque => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Removes the object member `steps` points at. Returns `false` when there is none.
fn prune(input: &mut Value, steps: &[Step]) -> bool {
    let Some((Step::Key(last), parents)) = steps.split_last() else {
        return false;
    };
    let mut node = input;
    for step in parents {
        node = match (step, node) {
            (Step::Key(key), Value::Object(map)) => match map.get_mut(key) {
                Some(child) => child,
                None => return false,
            },
            (Step::Index(index), Value::Array(items)) => match items.get_mut(*index) {
                Some(child) => child,
                None => return false,
            },
            _ => return false,
        };
    }
    match node {
        Value::Object(map) => map.remove(last).is_some(),
        _ => false,
    }
}

fn reports_pruned_member(message: &str, parent: &str, pruned: &[String]) -> bool {
    let Some(name) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
    else {
        return false;
    };
    let path = if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    };
    pruned.contains(&path)
}

/// Deserializes `input` into `T`, reporting every member serde rejects with its dotted path.
///
/// Each rejected object member is removed and deserialization retried, so later violations
/// are still found. `pruned` lists paths already reported and removed by the caller; serde's
/// complaints about those members being missing are not repeated, so the error list may be
/// empty when the caller already reported everything.
pub(crate) fn deserialize_all<T: DeserializeOwned>(
    mut input: Value,
    mut pruned: Vec<String>,
) -> Result<T, Vec<ValidationError>> {
    let mut errors = Vec::new();
    loop {
        let failure = match serde_path_to_error::deserialize::<_, T>(&input) {
            Ok(value) if errors.is_empty() => return Ok(value),
            Ok(_) => return Err(errors),
            Err(failure) => failure,
        };
        let steps: Vec<Step> = failure.path().iter().map(Step::from).collect();
        let message = failure.into_inner().to_string();
        let path = join_steps(&steps);
        if reports_pruned_member(&message, &path, &pruned) {
            break;
        }
        errors.push(ValidationError::new(path.clone(), message));
        if !prune(&mut input, &steps) {
            break;
        }
        pruned.push(path);
    }
    Err(errors)
}

/// Wraps errors from [`deserialize_all`] when no earlier stage reported anything.
pub(crate) fn collected(errors: Vec<ValidationError>) -> ValidationErrors {
    ValidationErrors::from_vec(errors)
        .unwrap_or_else(|| ValidationError::root("rejected by deserializer").into())
}

/// JSON text codec for any serde type.
pub type Json<T> = Pipe<JsonText, SerdeValue<T>>;

/// Returns a codec storing `T` as JSON text.
pub fn json<T: Serialize + DeserializeOwned>() -> Json<T> {
    JsonText.pipe(SerdeValue::new())
}

/// Returns a codec that parses JSON text and then validates it with `schema`.
pub fn json_with<S>(schema: S) -> Pipe<JsonText, S>
where
    S: Schema<Input = Value>,
{
    JsonText.pipe(schema)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json as json_value;

    use super::*;
    use crate::codec::decode_raw;

    #[test]
    fn json_text_rejects_malformed_input() {
        let err = JsonText.decode("{\"a\":".to_string()).expect_err("malformed");
        assert_eq!(err.len(), 1);
        assert!(err.first().message.starts_with("invalid JSON"));
        assert_eq!(err.first().path, "");
    }

    #[test]
    fn json_text_encodes_compactly() {
        let raw = JsonText
            .encode(&json_value!({"a": [1, 2]}))
            .expect("encode");
        assert_eq!(raw, "{\"a\":[1,2]}");
    }

    #[test]
    fn serde_value_reports_type_mismatch() {
        let err = SerdeValue::<u8>::new()
            .decode(json_value!("seven"))
            .expect_err("mismatch");
        assert_eq!(err.len(), 1);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Window {
        width: u32,
        height: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Prefs {
        font_size: u32,
        theme: String,
        window: Window,
        #[serde(default)]
        recent: Vec<Window>,
    }

    fn paths(err: &ValidationErrors) -> Vec<&str> {
        err.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn json_codec_reports_every_tampered_field() {
        let raw = r#"{"font_size":"big","theme":5,"window":{"width":-1,"height":"tall"}}"#;
        let err = decode_raw(&json::<Prefs>(), Some(raw.to_string()))
            .errors()
            .cloned()
            .expect("invalid");
        assert_eq!(
            paths(&err),
            vec!["font_size", "theme", "window.height", "window.width"]
        );
        assert_eq!(
            err.first().message,
            "invalid type: string \"big\", expected u32"
        );
        assert!(err.as_slice()[3].message.contains("-1"));
    }

    #[test]
    fn json_codec_reports_paths_inside_arrays() {
        let raw = r#"{"font_size":12,"theme":"dark","window":{"width":800,"height":600},
            "recent":[{"width":1,"height":2},{"width":"x","height":2}]}"#;
        let err = decode_raw(&json::<Prefs>(), Some(raw.to_string()))
            .errors()
            .cloned()
            .expect("invalid");
        assert_eq!(paths(&err), vec!["recent.1.width"]);
    }

    #[test]
    fn rejected_member_is_not_also_reported_missing() {
        let err = SerdeValue::<Window>::new()
            .decode(json_value!({"width": "wide"}))
            .expect_err("invalid");
        assert_eq!(paths(&err), vec!["width"]);
    }

    #[test]
    fn json_kind_checks_shape() {
        assert_eq!(
            JsonKind::Array.decode(json_value!([1])).expect("array"),
            json_value!([1])
        );
        assert_eq!(
            JsonKind::Number.decode(json_value!("1")).expect_err("string"),
            ValidationErrors::single(ValidationError::root("expected number, found string"))
        );
    }

    #[test]
    fn json_kind_names_values() {
        assert_eq!(JsonKind::of(&json_value!(null)), JsonKind::Null);
        assert_eq!(JsonKind::of(&json_value!([1])).name(), "array");
        assert!(JsonKind::Number.matches(&json_value!(1.5)));
        assert_eq!(JsonKind::Bool.to_string(), "boolean");
    }
}
