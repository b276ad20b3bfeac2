//! Tri-state stored value model and validation error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// One data-shape violation found while decoding a stored value.
pub struct ValidationError {
    /// Dotted path of the offending field; empty for the value root.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error for the value root.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }

    /// Returns a copy of this error with `prefix` prepended to its path.
    pub fn nested_under(mut self, prefix: &str) -> Self {
        self.path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.path)
        };
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ValidationError>", into = "Vec<ValidationError>")]
/// Ordered, non-empty sequence of [`ValidationError`] values.
///
/// Serialized as a plain list; an empty list is rejected on deserialization.
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("validation error list must not be empty")]
/// Rejection of an empty list converted into [`ValidationErrors`].
pub struct EmptyValidationErrors;

impl ValidationErrors {
    /// Creates a sequence holding exactly one error.
    pub fn single(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Builds a sequence from collected errors, returning `None` when nothing was collected.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Returns the errors in the order they were found.
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns the first error.
    pub fn first(&self) -> &ValidationError {
        &self.errors[0]
    }

    /// Number of errors; always at least one.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Appends the errors of `other` after the errors of `self`.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Iterates the errors in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Consumes the sequence into its inner vector.
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Prepends `prefix` to the path of every error.
    pub fn nested_under(self, prefix: &str) -> Self {
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|error| error.nested_under(prefix))
                .collect(),
        }
    }
}

impl TryFrom<Vec<ValidationError>> for ValidationErrors {
    type Error = EmptyValidationErrors;

    fn try_from(errors: Vec<ValidationError>) -> Result<Self, Self::Error> {
        Self::from_vec(errors).ok_or(EmptyValidationErrors)
    }
}

impl From<ValidationErrors> for Vec<ValidationError> {
    fn from(errors: ValidationErrors) -> Self {
        errors.errors
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self::single(error)
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Result of [`LocalValue::to_defaulted`]: `Err` for invalid data, `Ok` for a value or default.
pub type Defaulted<V> = Result<V, ValidationErrors>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Decoded state of one storage slot.
///
/// Values are replaced wholesale on every read or write and never mutated in place.
pub enum LocalValue<V> {
    /// Nothing is stored under the key.
    Absent,
    /// Something is stored but it failed decoding or validation.
    Invalid(ValidationErrors),
    /// The stored content decoded into a well-typed value.
    Valid(V),
}

impl<V> LocalValue<V> {
    /// Collapses the value by handling each state explicitly.
    pub fn fold<R>(
        self,
        on_absent: impl FnOnce() -> R,
        on_invalid: impl FnOnce(ValidationErrors) -> R,
        on_valid: impl FnOnce(V) -> R,
    ) -> R {
        match self {
            Self::Absent => on_absent(),
            Self::Invalid(errors) => on_invalid(errors),
            Self::Valid(value) => on_valid(value),
        }
    }

    /// Transforms the `Valid` payload, leaving `Absent` and `Invalid` untouched.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> LocalValue<U> {
        match self {
            Self::Absent => LocalValue::Absent,
            Self::Invalid(errors) => LocalValue::Invalid(errors),
            Self::Valid(value) => LocalValue::Valid(f(value)),
        }
    }

    /// Borrows the payload.
    pub fn as_ref(&self) -> LocalValue<&V> {
        match self {
            Self::Absent => LocalValue::Absent,
            Self::Invalid(errors) => LocalValue::Invalid(errors.clone()),
            Self::Valid(value) => LocalValue::Valid(value),
        }
    }

    /// Returns `true` only for `Valid`.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns `true` only for `Absent`.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` only for `Invalid`.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Returns the valid payload, if any.
    pub fn valid(&self) -> Option<&V> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Absent | Self::Invalid(_) => None,
        }
    }

    /// Returns the validation errors, if any.
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Absent | Self::Valid(_) => None,
        }
    }

    /// Structural equality with a caller-supplied comparison for `Valid` payloads.
    pub fn eq_by(&self, other: &Self, mut eq: impl FnMut(&V, &V) -> bool) -> bool {
        match (self, other) {
            (Self::Absent, Self::Absent) => true,
            (Self::Invalid(left), Self::Invalid(right)) => left == right,
            (Self::Valid(left), Self::Valid(right)) => eq(left, right),
            _ => false,
        }
    }

    /// Substitutes `default` for `Absent`, downgrading to a two-state result.
    pub fn to_defaulted(self, default: V) -> Defaulted<V> {
        self.to_defaulted_with(|| default)
    }

    /// Like [`LocalValue::to_defaulted`], but only builds the default when it is needed.
    pub fn to_defaulted_with(self, default: impl FnOnce() -> V) -> Defaulted<V> {
        match self {
            Self::Absent => Ok(default()),
            Self::Invalid(errors) => Err(errors),
            Self::Valid(value) => Ok(value),
        }
    }
}

impl<V> From<Result<V, ValidationErrors>> for LocalValue<V> {
    fn from(result: Result<V, ValidationErrors>) -> Self {
        match result {
            Ok(value) => Self::Valid(value),
            Err(errors) => Self::Invalid(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn errors(message: &str) -> ValidationErrors {
        ValidationErrors::single(ValidationError::root(message))
    }

    #[test]
    fn fold_visits_exactly_one_branch() {
        let describe = |value: LocalValue<u32>| {
            value.fold(
                || "absent".to_string(),
                |errors| format!("invalid: {errors}"),
                |value| format!("valid: {value}"),
            )
        };

        assert_eq!(describe(LocalValue::Absent), "absent");
        assert_eq!(describe(LocalValue::Invalid(errors("bad"))), "invalid: bad");
        assert_eq!(describe(LocalValue::Valid(7)), "valid: 7");
    }

    #[test]
    fn map_only_touches_valid_payload() {
        assert_eq!(LocalValue::Valid(2).map(|v| v * 10), LocalValue::Valid(20));
        assert_eq!(LocalValue::<u32>::Absent.map(|v| v * 10), LocalValue::Absent);
        assert_eq!(
            LocalValue::<u32>::Invalid(errors("bad")).map(|v| v * 10),
            LocalValue::Invalid(errors("bad"))
        );
    }

    #[test]
    fn defaulted_collapse_maps_each_state() {
        assert_eq!(LocalValue::<&str>::Absent.to_defaulted("light"), Ok("light"));
        assert_eq!(LocalValue::Valid("dark").to_defaulted("light"), Ok("dark"));
        assert_eq!(
            LocalValue::<&str>::Invalid(errors("bad")).to_defaulted("light"),
            Err(errors("bad"))
        );
    }

    #[test]
    fn defaulted_thunk_runs_only_for_absent() {
        let mut calls = 0;
        let _ = LocalValue::Valid(1).to_defaulted_with(|| {
            calls += 1;
            0
        });
        assert_eq!(calls, 0);
        let _ = LocalValue::<u32>::Absent.to_defaulted_with(|| {
            calls += 1;
            0
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn equality_is_structural_per_state() {
        assert_eq!(LocalValue::<u32>::Absent, LocalValue::Absent);
        assert_ne!(LocalValue::<u32>::Absent, LocalValue::Valid(0));
        assert_ne!(
            LocalValue::<u32>::Invalid(errors("a")),
            LocalValue::Invalid(errors("b"))
        );

        let left = LocalValue::Valid("Light".to_string());
        let right = LocalValue::Valid("light".to_string());
        assert!(left != right);
        assert!(left.eq_by(&right, |a, b| a.eq_ignore_ascii_case(b)));
        assert!(!left.eq_by(&LocalValue::Absent, |_, _| true));
    }

    #[test]
    fn validation_errors_are_never_empty() {
        assert!(ValidationErrors::from_vec(Vec::new()).is_none());
        let errors = ValidationErrors::from_vec(vec![
            ValidationError::new("theme", "expected string"),
            ValidationError::new("size", "expected number"),
        ])
        .expect("non-empty");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first().path, "theme");
        assert_eq!(
            errors.to_string(),
            "theme: expected string; size: expected number"
        );
    }

    #[test]
    fn nested_paths_are_dotted() {
        let error = ValidationError::new("mode", "bad").nested_under("prefs");
        assert_eq!(error.path, "prefs.mode");
        assert_eq!(ValidationError::root("bad").nested_under("prefs").path, "prefs");
    }

    #[test]
    fn empty_error_list_does_not_deserialize() {
        assert!(serde_json::from_str::<ValidationErrors>("[]").is_err());
        assert!(serde_json::from_str::<ValidationErrors>(r#"{"errors":[]}"#).is_err());

        let errors = ValidationErrors::single(ValidationError::new("theme", "expected string"));
        let raw = serde_json::to_string(&errors).expect("serialize");
        assert_eq!(raw, r#"[{"path":"theme","message":"expected string"}]"#);
        let back: ValidationErrors = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back.first().path, "theme");
    }

    #[test]
    fn nested_error_lists_prefix_every_path() {
        let errors = ValidationErrors::from_vec(vec![
            ValidationError::new("width", "bad"),
            ValidationError::root("worse"),
        ])
        .expect("non-empty")
        .nested_under("window");
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["window.width", "window"]);
    }
}
