//! Run lifecycle: one recorded execution attempt of an action.

pub mod claim;
pub mod output;
pub mod result;

pub use claim::{Claim, ExecutionResult, CLAIM_SCHEMA_VERSION, IDENTITY_SEPARATOR};
pub use output::{Output, Outputs};
pub use result::{OutputMetadata, RunResult, Status};

use crate::bundle::{Bundle, BundleMetadata};
use crate::parameters::{ParameterProvider, ParameterSet, ProviderError};
use crate::secrets::{secret_key, Source, SourceKind};
use crate::value::ParameterValue;
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lookup filter a document store uses to find a record by identity.
pub trait Document {
    fn default_document_filter(&self) -> serde_json::Value;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("installation name must not be empty")]
    EmptyInstallation,

    #[error("{field} {value:?} must not contain '/'")]
    InvalidIdentity { field: &'static str, value: String },

    #[error("run {run_id} already has internal parameter set {existing:?}")]
    DuplicateInternalParameterSet { run_id: String, existing: String },
}

/// One execution attempt of an action against an installation.
///
/// A run is a snapshot: it owns its bundle and parameter sets, and its
/// resolved `parameters` exist only in memory. Sensitive parameter values
/// are persisted as secret store keys, never as plaintext.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(default)]
    pub schema_version: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub namespace: String,
    pub installation: String,
    pub revision: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub bundle: Bundle,
    #[serde(default)]
    pub bundle_reference: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bundle_digest: String,
    /// Values supplied for this run only. Not persisted; orchestrators fold
    /// them into the internal parameter set through the sanitizer.
    #[serde(skip)]
    pub parameter_overrides: BTreeMap<String, ParameterValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credential_sets: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_parameter_sets"
    )]
    parameter_sets: Vec<ParameterSet>,
    /// Resolved values for the current execution. Never persisted.
    #[serde(skip)]
    pub parameters: BTreeMap<String, ParameterValue>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub custom: serde_json::Value,
}

impl Run {
    /// Create a run with a fresh ID and revision.
    pub fn new(namespace: &str, installation: &str) -> Result<Self, RunError> {
        validate_identity(namespace, installation)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            id: Uuid::now_v7().to_string(),
            created: Utc::now(),
            namespace: namespace.to_string(),
            installation: installation.to_string(),
            revision: Uuid::now_v7().to_string(),
            action: String::new(),
            bundle: Bundle::default(),
            bundle_reference: String::new(),
            bundle_digest: String::new(),
            parameter_overrides: BTreeMap::new(),
            credential_sets: Vec::new(),
            parameter_sets: Vec::new(),
            parameters: BTreeMap::new(),
            custom: serde_json::Value::Null,
        })
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = action.to_string();
        self
    }

    pub fn with_bundle(mut self, bundle: Bundle, reference: &str) -> Self {
        self.bundle = bundle;
        self.bundle_reference = reference.to_string();
        self
    }

    pub fn parameter_sets(&self) -> &[ParameterSet] {
        &self.parameter_sets
    }

    pub fn internal_parameter_set(&self) -> Option<&ParameterSet> {
        self.parameter_sets.iter().find(|s| s.is_internal())
    }

    /// Attach a parameter set. A run holds at most one internal set.
    pub fn add_parameter_set(&mut self, set: ParameterSet) -> Result<(), RunError> {
        if set.is_internal() {
            if let Some(existing) = self.internal_parameter_set() {
                return Err(RunError::DuplicateInternalParameterSet {
                    run_id: self.id.clone(),
                    existing: existing.name.clone(),
                });
            }
        }
        self.parameter_sets.push(set);
        Ok(())
    }

    /// Install `set` as the internal set, replacing any existing one in place.
    pub fn replace_internal_parameter_set(&mut self, mut set: ParameterSet) {
        set.internal = true;
        match self.parameter_sets.iter_mut().find(|s| s.is_internal()) {
            Some(existing) => *existing = set,
            None => self.parameter_sets.push(set),
        }
    }

    /// Whether this run belongs in the installation history.
    ///
    /// Only actions the bundle declares as both non-modifying and stateless
    /// (docs, dry-run and the like) are skipped. Actions the bundle does not
    /// declare are always recorded.
    pub fn should_record(&self) -> bool {
        match self.bundle.get_action(&self.action) {
            Ok(action) => action.modifies || !action.stateless,
            Err(_) => true,
        }
    }

    /// Point sensitive entries of the internal parameter set at the secret store.
    ///
    /// Each sensitive strategy's source becomes `secret:<run id><name>`. An
    /// entry whose sensitivity cannot be determined is treated as sensitive.
    /// No plaintext is written here; the sanitizer stores it separately.
    /// Returns the rewritten set, or `None` when the run has no internal set.
    pub fn encode_internal_parameter_set(&mut self) -> Option<ParameterSet> {
        let run_id = self.id.clone();
        let bundle = &self.bundle;
        let set = self.parameter_sets.iter_mut().find(|s| s.is_internal())?;

        for strategy in set.parameters.iter_mut() {
            let sensitive = bundle
                .is_sensitive_parameter(&strategy.name)
                .unwrap_or_else(|e| {
                    warn!(
                        "Cannot determine sensitivity of parameter '{}', encoding as secret: {}",
                        strategy.name, e
                    );
                    true
                });
            if sensitive {
                strategy.source =
                    Source::new(SourceKind::Secret, secret_key(&run_id, &strategy.name));
            }
        }

        debug!(run = %run_id, set = %set.name, "Encoded internal parameter set");
        Some(set.clone())
    }

    /// Resolve every parameter set into the transient `parameters` map.
    ///
    /// Sets are merged in order, so a later set wins on a name collision.
    /// Overrides are applied last.
    pub async fn resolve_sensitive_data(
        &mut self,
        provider: &dyn ParameterProvider,
    ) -> Result<(), ProviderError> {
        let mut resolved = BTreeMap::new();
        for set in &self.parameter_sets {
            let values = set.resolve(provider, &self.bundle).await?;
            resolved.extend(values);
        }

        resolved.extend(
            self.parameter_overrides
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        debug!(run = %self.id, count = resolved.len(), "Resolved run parameters");
        self.parameters = resolved;
        Ok(())
    }

    /// Project into the executor's record shape.
    pub fn to_claim(&self) -> Claim {
        Claim {
            schema_version: CLAIM_SCHEMA_VERSION.to_string(),
            id: self.id.clone(),
            installation: format!(
                "{}{}{}",
                self.namespace, IDENTITY_SEPARATOR, self.installation
            ),
            revision: self.revision.clone(),
            created: self.created,
            action: self.action.clone(),
            bundle: self.bundle.clone(),
            bundle_reference: self.bundle_reference.clone(),
            parameters: self.parameters.clone(),
            custom: self.custom.clone(),
        }
    }

    /// A new result for this run.
    pub fn new_result(&self, status: Status) -> RunResult {
        let mut result = RunResult::new(status);
        result.run_id = self.id.clone();
        result.namespace = self.namespace.clone();
        result.installation = self.installation.clone();
        result
    }

    /// A result built from what the executor reported.
    pub fn new_result_from(&self, outcome: &ExecutionResult) -> RunResult {
        RunResult {
            schema_version: SCHEMA_VERSION.to_string(),
            id: outcome.id.clone(),
            namespace: self.namespace.clone(),
            installation: self.installation.clone(),
            run_id: self.id.clone(),
            created: outcome.created,
            status: outcome.status,
            message: outcome.message.clone(),
            output_metadata: outcome.output_metadata.clone(),
            custom: outcome.custom.clone(),
        }
    }

    /// An output of this run, stamped with the run's identity.
    pub fn new_output(&self, result: &RunResult, name: &str, value: impl Into<Vec<u8>>) -> Output {
        let mut output = Output::new(name, value);
        output.namespace = self.namespace.clone();
        output.installation = self.installation.clone();
        output.run_id = self.id.clone();
        output.result_id = result.id.clone();
        output
    }
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Resolved values and overrides are plaintext; only their names are shown.
        f.debug_struct("Run")
            .field("id", &self.id)
            .field("revision", &self.revision)
            .field("namespace", &self.namespace)
            .field("installation", &self.installation)
            .field("action", &self.action)
            .field("bundle", &self.bundle.name)
            .field("bundle_reference", &self.bundle_reference)
            .field("parameter_sets", &self.parameter_sets)
            .field("parameter_overrides", &self.parameter_overrides.keys())
            .field("parameters", &self.parameters.keys())
            .finish_non_exhaustive()
    }
}

impl Document for Run {
    fn default_document_filter(&self) -> serde_json::Value {
        serde_json::json!({ "_id": self.id })
    }
}

fn validate_identity(namespace: &str, installation: &str) -> Result<(), RunError> {
    if installation.is_empty() {
        return Err(RunError::EmptyInstallation);
    }
    for (field, value) in [("namespace", namespace), ("installation", installation)] {
        if value.contains(IDENTITY_SEPARATOR) {
            return Err(RunError::InvalidIdentity {
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn deserialize_parameter_sets<'de, D>(deserializer: D) -> Result<Vec<ParameterSet>, D::Error>
where
    D: Deserializer<'de>,
{
    let sets = Vec::<ParameterSet>::deserialize(deserializer)?;
    if sets.iter().filter(|s| s.is_internal()).count() > 1 {
        return Err(serde::de::Error::custom(
            "a run may hold at most one internal parameter set",
        ));
    }
    Ok(sets)
}
