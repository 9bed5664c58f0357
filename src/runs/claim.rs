//! Record shapes exchanged with the bundle execution collaborator.

use super::result::{OutputMetadata, Status};
use crate::bundle::Bundle;
use crate::value::ParameterValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Schema version stamped on claims handed to the executor.
pub const CLAIM_SCHEMA_VERSION: &str = "cnab-claim-1.0.0";

/// Separator joining namespace and installation into the claim's single
/// installation field.
pub const IDENTITY_SEPARATOR: char = '/';

/// The executor's view of a run.
///
/// Carries resolved plaintext parameters, so it is built right before an
/// action executes and is not persisted by this crate.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub schema_version: String,
    pub id: String,
    pub installation: String,
    pub revision: String,
    pub created: DateTime<Utc>,
    pub action: String,
    pub bundle: Bundle,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bundle_reference: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub custom: serde_json::Value,
}

impl Claim {
    /// Split the joined installation field back into namespace and name.
    pub fn namespace_and_installation(&self) -> (&str, &str) {
        match self.installation.split_once(IDENTITY_SEPARATOR) {
            Some((namespace, installation)) => (namespace, installation),
            None => ("", self.installation.as_str()),
        }
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("id", &self.id)
            .field("installation", &self.installation)
            .field("revision", &self.revision)
            .field("action", &self.action)
            .field("bundle", &self.bundle.name)
            .field("parameters", &self.parameters.keys())
            .finish_non_exhaustive()
    }
}

/// What the executor reports back after running an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub id: String,
    pub claim_id: String,
    pub created: DateTime<Utc>,
    pub status: Status,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output_metadata: OutputMetadata,
    #[serde(default)]
    pub custom: serde_json::Value,
}
