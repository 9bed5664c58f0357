//! Bundle definitions and the metadata queries the sanitizer relies on.
//!
//! The sanitizer never decides on its own what is sensitive. It asks a
//! [`BundleMetadata`] implementation, which for an embedded [`Bundle`] means
//! looking at the `writeOnly` flag of the definition a parameter or output
//! points to.

mod schema;

pub use schema::{Schema, SchemaType};

use crate::value::ParameterValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by bundle metadata queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BundleError {
    #[error("parameter {0:?} is not defined in the bundle")]
    UnknownParameter(String),

    #[error("output {0:?} is not defined in the bundle")]
    UnknownOutput(String),

    #[error("action {0:?} is not defined in the bundle")]
    UnknownAction(String),

    #[error("definition {definition:?} referenced by {name:?} does not exist")]
    MissingDefinition { name: String, definition: String },

    #[error("invalid value for parameter {name:?}: {reason}")]
    Conversion { name: String, reason: String },
}

/// Declared semantics of a custom bundle action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// The action changes resources managed by the bundle.
    #[serde(default)]
    pub modifies: bool,
    /// The action needs neither an existing installation nor credentials.
    #[serde(default)]
    pub stateless: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply_to: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDefinition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// An owned bundle definition.
///
/// Runs embed a full copy, so this type is plain data with no references to
/// shared installation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default)]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub definitions: BTreeMap<String, Schema>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterDefinition>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputDefinition>,
    #[serde(default)]
    pub actions: BTreeMap<String, Action>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Declare a parameter backed by its own definition of the same name.
    pub fn with_parameter(mut self, name: &str, schema: Schema) -> Self {
        self.definitions.insert(name.to_string(), schema);
        self.parameters.insert(
            name.to_string(),
            ParameterDefinition {
                definition: name.to_string(),
                ..ParameterDefinition::default()
            },
        );
        self
    }

    /// Declare an output backed by its own definition of the same name.
    pub fn with_output(mut self, name: &str, schema: Schema) -> Self {
        self.definitions.insert(name.to_string(), schema);
        self.outputs.insert(
            name.to_string(),
            OutputDefinition {
                definition: name.to_string(),
                ..OutputDefinition::default()
            },
        );
        self
    }

    pub fn with_action(mut self, name: &str, action: Action) -> Self {
        self.actions.insert(name.to_string(), action);
        self
    }

    fn parameter_schema(&self, name: &str) -> Result<&Schema, BundleError> {
        let param = self
            .parameters
            .get(name)
            .ok_or_else(|| BundleError::UnknownParameter(name.to_string()))?;
        self.definitions
            .get(&param.definition)
            .ok_or_else(|| BundleError::MissingDefinition {
                name: name.to_string(),
                definition: param.definition.clone(),
            })
    }
}

/// Metadata queries answered by a bundle.
///
/// Every sanitize and resolve call goes through these methods instead of
/// caching sensitivity on stored records, so a metadata change applies to
/// existing history immediately.
pub trait BundleMetadata: Send + Sync {
    fn is_sensitive_parameter(&self, name: &str) -> Result<bool, BundleError>;

    fn is_output_sensitive(&self, name: &str) -> Result<bool, BundleError>;

    /// Render a typed value to the canonical string stored in a strategy.
    fn write_parameter_to_string(
        &self,
        name: &str,
        value: &ParameterValue,
    ) -> Result<String, BundleError>;

    /// Parse a resolved raw string back into its declared type.
    fn convert_parameter_value(&self, name: &str, raw: &str)
        -> Result<ParameterValue, BundleError>;

    fn get_action(&self, name: &str) -> Result<Action, BundleError>;
}

impl BundleMetadata for Bundle {
    fn is_sensitive_parameter(&self, name: &str) -> Result<bool, BundleError> {
        // Parameters the bundle does not declare carry no sensitivity.
        if !self.parameters.contains_key(name) {
            return Ok(false);
        }
        Ok(self.parameter_schema(name)?.is_write_only())
    }

    fn is_output_sensitive(&self, name: &str) -> Result<bool, BundleError> {
        let output = self
            .outputs
            .get(name)
            .ok_or_else(|| BundleError::UnknownOutput(name.to_string()))?;
        let schema =
            self.definitions
                .get(&output.definition)
                .ok_or_else(|| BundleError::MissingDefinition {
                    name: name.to_string(),
                    definition: output.definition.clone(),
                })?;
        Ok(schema.is_write_only())
    }

    fn write_parameter_to_string(
        &self,
        name: &str,
        value: &ParameterValue,
    ) -> Result<String, BundleError> {
        self.parameter_schema(name)?
            .render(value)
            .map_err(|reason| BundleError::Conversion {
                name: name.to_string(),
                reason,
            })
    }

    fn convert_parameter_value(
        &self,
        name: &str,
        raw: &str,
    ) -> Result<ParameterValue, BundleError> {
        self.parameter_schema(name)?
            .convert(raw)
            .map_err(|reason| BundleError::Conversion {
                name: name.to_string(),
                reason,
            })
    }

    fn get_action(&self, name: &str) -> Result<Action, BundleError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| BundleError::UnknownAction(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> Bundle {
        Bundle::new("mysql", "0.1.0")
            .with_parameter("password", Schema::of_type(SchemaType::String).sensitive())
            .with_parameter("port", Schema::of_type(SchemaType::Integer))
            .with_output("connstr", Schema::of_type(SchemaType::String).sensitive())
            .with_output("host", Schema::of_type(SchemaType::String))
            .with_action(
                "logs",
                Action {
                    modifies: false,
                    stateless: true,
                    description: None,
                },
            )
    }

    #[test]
    fn parameter_sensitivity_follows_write_only() {
        let b = bundle();
        assert!(b.is_sensitive_parameter("password").unwrap());
        assert!(!b.is_sensitive_parameter("port").unwrap());
        assert!(!b.is_sensitive_parameter("undeclared").unwrap());
    }

    #[test]
    fn dangling_definition_is_an_error() {
        let mut b = bundle();
        b.definitions.remove("password");
        assert_eq!(
            b.is_sensitive_parameter("password"),
            Err(BundleError::MissingDefinition {
                name: "password".into(),
                definition: "password".into(),
            })
        );
    }

    #[test]
    fn output_sensitivity_requires_declared_output() {
        let b = bundle();
        assert!(b.is_output_sensitive("connstr").unwrap());
        assert!(!b.is_output_sensitive("host").unwrap());
        assert_eq!(
            b.is_output_sensitive("missing"),
            Err(BundleError::UnknownOutput("missing".into()))
        );
    }

    #[test]
    fn write_and_convert_use_declared_type() {
        let b = bundle();
        assert_eq!(
            b.write_parameter_to_string("port", &ParameterValue::Integer(3306))
                .unwrap(),
            "3306"
        );
        assert_eq!(
            b.convert_parameter_value("port", "3306").unwrap(),
            ParameterValue::Integer(3306)
        );
        assert!(matches!(
            b.write_parameter_to_string("port", &ParameterValue::Bool(true)),
            Err(BundleError::Conversion { .. })
        ));
    }

    #[test]
    fn get_action_only_knows_custom_actions() {
        let b = bundle();
        assert!(b.get_action("logs").unwrap().stateless);
        assert_eq!(
            b.get_action("install"),
            Err(BundleError::UnknownAction("install".into()))
        );
    }

    #[test]
    fn bundle_deserializes_from_camel_case_json() {
        let raw = serde_json::json!({
            "schemaVersion": "v1.2.0",
            "name": "wordpress",
            "version": "1.0.0",
            "definitions": {"pw": {"type": "string", "writeOnly": true}},
            "parameters": {"admin-password": {"definition": "pw", "required": true}},
            "actions": {"dry-run": {"modifies": false, "stateless": true}}
        });
        let b: Bundle = serde_json::from_value(raw).unwrap();
        assert!(b.is_sensitive_parameter("admin-password").unwrap());
        assert!(b.parameters["admin-password"].required);
        assert!(!b.get_action("dry-run").unwrap().modifies);
    }
}
