//! Object schema that checks every declared field before deserializing.

use std::{fmt, marker::PhantomData, rc::Rc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{
    json::{collected, deserialize_all},
    EncodeError, JsonKind, Schema,
};
use crate::value::{ValidationError, ValidationErrors};

type FieldCheck = Rc<dyn Fn(Value) -> Result<(), ValidationErrors>>;

#[derive(Clone)]
struct FieldRule {
    name: String,
    required: bool,
    check: FieldCheck,
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// [`serde_json::Value`] object <-> `T`, reporting every field violation at once.
///
/// Each declared field is validated by its own schema and violations are collected with the
/// field name prefixed to their paths, so nested records report dotted paths. Fields that
/// pass are then deserialized into `T`, which reports any remaining serde violations the same
/// way.
pub struct RecordSchema<T> {
    fields: Vec<FieldRule>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RecordSchema<T> {
    /// Creates a schema with no field rules.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares a field that must be present and accepted by `schema`.
    #[must_use]
    pub fn field<S>(self, name: impl Into<String>, schema: S) -> Self
    where
        S: Schema<Input = Value> + 'static,
    {
        self.rule(name.into(), true, schema)
    }

    /// Declares a field that may be missing or `null`, and is otherwise accepted by `schema`.
    #[must_use]
    pub fn optional_field<S>(self, name: impl Into<String>, schema: S) -> Self
    where
        S: Schema<Input = Value> + 'static,
    {
        self.rule(name.into(), false, schema)
    }

    /// Declares a field that must be present with the given kind.
    #[must_use]
    pub fn required(self, name: impl Into<String>, kind: JsonKind) -> Self {
        self.field(name, kind)
    }

    /// Declares a field that may be missing or `null`, and otherwise has the given kind.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, kind: JsonKind) -> Self {
        self.optional_field(name, kind)
    }

    fn rule<S>(mut self, name: String, required: bool, schema: S) -> Self
    where
        S: Schema<Input = Value> + 'static,
    {
        self.fields.push(FieldRule {
            name,
            required,
            check: Rc::new(move |value| schema.decode(value).map(drop)),
        });
        self
    }

    fn check_fields(&self, input: &Value) -> Result<FieldReport, ValidationErrors> {
        let Value::Object(map) = input else {
            let found = JsonKind::of(input);
            return Err(ValidationError::root(format!("expected object, found {found}")).into());
        };

        let mut report = FieldReport::default();
        for rule in &self.fields {
            match map.get(&rule.name) {
                None if rule.required => {
                    report
                        .errors
                        .push(ValidationError::new(&rule.name, "missing required field"));
                    report.covered.push(rule.name.clone());
                }
                None => {}
                Some(Value::Null) if !rule.required => {}
                Some(value) => {
                    if let Err(nested) = (rule.check)(value.clone()) {
                        report
                            .errors
                            .extend(nested.nested_under(&rule.name).into_vec());
                        report.covered.push(rule.name.clone());
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Field violations plus the names of the fields they cover.
#[derive(Default)]
struct FieldReport {
    errors: Vec<ValidationError>,
    covered: Vec<String>,
}

impl<T> Default for RecordSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordSchema<T> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RecordSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("type", &std::any::type_name::<T>())
            .field("fields", &self.fields)
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> Schema for RecordSchema<T> {
    type Input = Value;
    type Output = T;

    fn decode(&self, input: Value) -> Result<T, ValidationErrors> {
        let report = self.check_fields(&input)?;

        // Covered fields are dropped so serde only adds violations not reported yet.
        let mut input = input;
        if let Value::Object(map) = &mut input {
            for name in &report.covered {
                map.remove(name);
            }
        }
        let deserialized = deserialize_all::<T>(input, report.covered);
        match (ValidationErrors::from_vec(report.errors), deserialized) {
            (None, Ok(value)) => Ok(value),
            (None, Err(more)) => Err(collected(more)),
            (Some(errors), Ok(_)) => Err(errors),
            (Some(mut errors), Err(more)) => {
                if let Some(more) = ValidationErrors::from_vec(more) {
                    errors.extend(more);
                }
                Err(errors)
            }
        }
    }

    fn encode(&self, value: &T) -> Result<Value, EncodeError> {
        let encoded = serde_json::to_value(value).map_err(|e| EncodeError(e.to_string()))?;
        let report = self
            .check_fields(&encoded)
            .map_err(|errors| EncodeError(errors.to_string()))?;
        match ValidationErrors::from_vec(report.errors) {
            Some(errors) => Err(EncodeError(errors.to_string())),
            None => Ok(encoded),
        }
    }
}
