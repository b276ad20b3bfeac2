//! Closed set of string literals.

use serde_json::Value;

use super::{EncodeError, JsonKind, Schema};
use crate::value::{ValidationError, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Accepts a JSON string only when it is one of a fixed set of members.
pub struct LiteralUnion {
    members: Vec<String>,
}

impl LiteralUnion {
    /// Creates a union of the given members, keeping their declaration order.
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the declared members.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns `true` when `candidate` is a member.
    pub fn contains(&self, candidate: &str) -> bool {
        self.members.iter().any(|member| member == candidate)
    }

    fn not_a_member(&self) -> String {
        format!("not a member of {{{}}}", self.members.join(", "))
    }
}

impl Schema for LiteralUnion {
    type Input = Value;
    type Output = String;

    fn decode(&self, input: Value) -> Result<String, ValidationErrors> {
        match input {
            Value::String(text) if self.contains(&text) => Ok(text),
            Value::String(_) => Err(ValidationError::root(self.not_a_member()).into()),
            other => Err(ValidationError::root(format!(
                "expected string, found {}",
                JsonKind::of(&other)
            ))
            .into()),
        }
    }

    fn encode(&self, value: &String) -> Result<Value, EncodeError> {
        if self.contains(value) {
            Ok(Value::String(value.clone()))
        } else {
            Err(EncodeError(format!("`{value}` is {}", self.not_a_member())))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        codec::{decode_raw, encode_value, json_with},
        value::LocalValue,
    };

    fn theme() -> LiteralUnion {
        LiteralUnion::new(["light", "dark"])
    }

    #[test]
    fn theme_scenario_decodes_each_state() {
        let codec = json_with(theme());

        assert_eq!(
            decode_raw(&codec, Some("\"light\"".to_string())),
            LocalValue::Valid("light".to_string())
        );
        assert_eq!(
            decode_raw(&codec, Some("\"blue\"".to_string())),
            LocalValue::Invalid(ValidationErrors::single(ValidationError::new(
                "",
                "not a member of {light, dark}"
            )))
        );
        assert_eq!(decode_raw(&codec, None), LocalValue::Absent);
        assert_eq!(
            decode_raw(&codec, None).to_defaulted("light".to_string()),
            Ok("light".to_string())
        );
    }

    #[test]
    fn non_string_input_names_found_kind() {
        let err = theme().decode(Value::Bool(true)).expect_err("bool");
        assert_eq!(err.first().message, "expected string, found boolean");
    }

    #[test]
    fn encode_refuses_non_members() {
        let codec = json_with(theme());
        assert_eq!(
            encode_value(&codec, &"dark".to_string()),
            Ok("\"dark\"".to_string())
        );
        assert!(encode_value(&codec, &"blue".to_string()).is_err());
    }
}
