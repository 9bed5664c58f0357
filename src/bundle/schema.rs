//! JSON-schema-like type definitions and value conversion.

use crate::value::ParameterValue;
use serde::{Deserialize, Serialize};

/// Primitive type declared by a bundle definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Null => "null",
        }
    }
}

/// A named definition referenced by parameters and outputs.
///
/// Only the subset of JSON schema the sanitizer cares about is modelled:
/// the declared type and the `writeOnly` flag that marks a value sensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParameterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
}

impl Schema {
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Mark the definition write-only (sensitive).
    pub fn sensitive(mut self) -> Self {
        self.write_only = Some(true);
        self
    }

    pub fn is_write_only(&self) -> bool {
        self.write_only.unwrap_or(false)
    }

    /// Parse a raw string into the value shape this definition declares.
    pub fn convert(&self, raw: &str) -> Result<ParameterValue, String> {
        let Some(schema_type) = self.schema_type else {
            // Untyped definitions take JSON when it parses, the raw string otherwise.
            return Ok(serde_json::from_str::<serde_json::Value>(raw)
                .map(ParameterValue::from)
                .unwrap_or_else(|_| ParameterValue::String(raw.to_string())));
        };

        match schema_type {
            SchemaType::String => Ok(ParameterValue::String(raw.to_string())),
            SchemaType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ParameterValue::Integer)
                .map_err(|e| format!("{raw:?} is not an integer: {e}")),
            SchemaType::Number => raw
                .trim()
                .parse::<f64>()
                .map(ParameterValue::Number)
                .map_err(|e| format!("{raw:?} is not a number: {e}")),
            SchemaType::Boolean => match raw.trim() {
                "true" => Ok(ParameterValue::Bool(true)),
                "false" => Ok(ParameterValue::Bool(false)),
                other => Err(format!("{other:?} is not a boolean")),
            },
            SchemaType::Null => match raw.trim() {
                "" | "null" => Ok(ParameterValue::Null),
                other => Err(format!("{other:?} is not null")),
            },
            SchemaType::Object | SchemaType::Array => {
                let parsed: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| format!("invalid JSON for {}: {e}", schema_type.as_str()))?;
                let value = ParameterValue::from(parsed);
                if self.matches_type(&value) {
                    Ok(value)
                } else {
                    Err(format!(
                        "expected {}, got {}",
                        schema_type.as_str(),
                        value.type_name()
                    ))
                }
            }
        }
    }

    /// Render a value to the canonical string the parameter provider stores.
    pub fn render(&self, value: &ParameterValue) -> Result<String, String> {
        if let ParameterValue::String(s) = value {
            // A string is already raw form; it still has to parse as the declared type.
            self.convert(s)?;
            return Ok(s.clone());
        }

        if !self.matches_type(value) {
            let expected = self.schema_type.map(|t| t.as_str()).unwrap_or("any");
            return Err(format!("expected {expected}, got {}", value.type_name()));
        }

        Ok(value.to_string())
    }

    fn matches_type(&self, value: &ParameterValue) -> bool {
        match (self.schema_type, value) {
            (None, _) => true,
            (Some(SchemaType::String), ParameterValue::String(_)) => true,
            (Some(SchemaType::Integer), ParameterValue::Integer(_)) => true,
            (Some(SchemaType::Number), ParameterValue::Integer(_) | ParameterValue::Number(_)) => {
                true
            }
            (Some(SchemaType::Boolean), ParameterValue::Bool(_)) => true,
            (Some(SchemaType::Object), ParameterValue::Object(_)) => true,
            (Some(SchemaType::Array), ParameterValue::Array(_)) => true,
            (Some(SchemaType::Null), ParameterValue::Null) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convert_typed_scalars() {
        assert_eq!(
            Schema::of_type(SchemaType::Integer).convert("12").unwrap(),
            ParameterValue::Integer(12)
        );
        assert_eq!(
            Schema::of_type(SchemaType::Number).convert("0.5").unwrap(),
            ParameterValue::Number(0.5)
        );
        assert_eq!(
            Schema::of_type(SchemaType::Boolean).convert("true").unwrap(),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            Schema::of_type(SchemaType::String).convert("12").unwrap(),
            ParameterValue::String("12".into())
        );
    }

    #[test]
    fn convert_rejects_mismatched_input() {
        assert!(Schema::of_type(SchemaType::Integer).convert("twelve").is_err());
        assert!(Schema::of_type(SchemaType::Boolean).convert("yes").is_err());
        assert!(Schema::of_type(SchemaType::Object).convert("[1,2]").is_err());
    }

    #[test]
    fn convert_untyped_prefers_json() {
        let schema = Schema::default();
        assert_eq!(schema.convert("3").unwrap(), ParameterValue::Integer(3));
        assert_eq!(
            schema.convert("plain text").unwrap(),
            ParameterValue::String("plain text".into())
        );
    }

    #[test]
    fn render_structures_as_json() {
        let schema = Schema::of_type(SchemaType::Object);
        let value = ParameterValue::from(json!({"a": [1, 2]}));
        assert_eq!(schema.render(&value).unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn render_checks_declared_type() {
        let schema = Schema::of_type(SchemaType::Integer);
        assert_eq!(schema.render(&ParameterValue::Integer(5)).unwrap(), "5");
        assert_eq!(schema.render(&ParameterValue::from("5")).unwrap(), "5");
        assert!(schema.render(&ParameterValue::Bool(true)).is_err());
        assert!(schema.render(&ParameterValue::from("five")).is_err());
    }

    #[test]
    fn number_accepts_integers() {
        let schema = Schema::of_type(SchemaType::Number);
        assert_eq!(schema.render(&ParameterValue::Integer(2)).unwrap(), "2");
    }

    #[test]
    fn write_only_marks_sensitive() {
        assert!(!Schema::of_type(SchemaType::String).is_write_only());
        assert!(Schema::of_type(SchemaType::String).sensitive().is_write_only());
    }
}
