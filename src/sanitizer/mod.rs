//! Sanitizer service: moves sensitive values into the secret store and back.
//!
//! Nothing here decides what is sensitive. Every call asks the bundle again,
//! and every sensitive value is written under `run id + name` so the stored
//! record only ever holds the key.

use crate::bundle::{BundleError, BundleMetadata};
use crate::parameters::{ParameterProvider, ParameterSet, ProviderError};
use crate::runs::{Output, Outputs, Run};
use crate::secrets::{
    default_strategy, encode, secret_key, SecretStore, SourceKind, StoreError, Strategy,
};
use crate::value::ParameterValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("failed to save sensitive parameter {parameter:?} to the secret store")]
    StoreParameter {
        parameter: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to save sensitive output {output:?} to the secret store under {key:?}")]
    StoreOutput {
        output: String,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("sensitive output {output:?} is not valid UTF-8 and cannot be stored as a secret")]
    NonUtf8Output { output: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to resolve output {output:?} using key {key:?}")]
    ResolveOutput {
        output: String,
        key: String,
        #[source]
        source: ResolveError,
    },
}

/// A secret store lookup for an output failed.
#[derive(Debug, Error)]
#[error("could not resolve secret {key:?}")]
pub struct ResolveError {
    pub key: String,
    #[source]
    pub source: StoreError,
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

/// Sanitizing an output failed.
///
/// Carries the output as it stood when the failure happened: unchanged if the
/// sensitivity check failed, already encoded if the store write failed.
#[derive(Debug, Error)]
#[error("failed to sanitize output {:?}", .output.name)]
pub struct OutputSanitizeError {
    pub output: Output,
    #[source]
    pub source: SanitizeError,
}

impl OutputSanitizeError {
    pub fn into_output(self) -> Output {
        self.output
    }
}

// ============================================================================
// Service
// ============================================================================

/// Sanitizes run data against a secret store and resolves it back.
#[derive(Clone)]
pub struct Service {
    parameters: Arc<dyn ParameterProvider>,
    secrets: Arc<dyn SecretStore>,
}

impl Service {
    pub fn new(parameters: Arc<dyn ParameterProvider>, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            parameters,
            secrets,
        }
    }

    /// Render typed values to strategies, storing the sensitive ones.
    ///
    /// Values are processed in name order.
    pub async fn raw_parameters(
        &self,
        raw: &BTreeMap<String, ParameterValue>,
        bundle: &dyn BundleMetadata,
        run_id: &str,
    ) -> Result<Vec<Strategy>, SanitizeError> {
        let mut strategies = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            let rendered = bundle.write_parameter_to_string(name, value)?;
            strategies.push(default_strategy(name, &rendered));
        }

        Ok(self
            .parameters(strategies, bundle, run_id)
            .await?
            .unwrap_or_default())
    }

    /// Rebuild strategies as plain values, pushing sensitive ones to the store.
    ///
    /// Any prior indirection is dropped; each entry is rebuilt from its name
    /// and in-memory value. Sensitive entries are written under
    /// `run_id + name` and encoded to point there. Returns `None` for empty
    /// input. The first failure aborts; secrets already written stay written.
    pub async fn parameters(
        &self,
        strategies: Vec<Strategy>,
        bundle: &dyn BundleMetadata,
        run_id: &str,
    ) -> Result<Option<Vec<Strategy>>, SanitizeError> {
        if strategies.is_empty() {
            return Ok(None);
        }

        let mut sanitized = Vec::with_capacity(strategies.len());
        let mut stored = 0usize;
        for param in strategies {
            let mut strategy = default_strategy(&param.name, &param.value);

            if bundle.is_sensitive_parameter(&param.name)? {
                strategy = encode(strategy, run_id);
                debug!("Storing sensitive parameter '{}'", strategy.name);
                self.secrets
                    .create(strategy.source.key, &strategy.source.value, &strategy.value)
                    .await
                    .map_err(|source| {
                        error!(
                            "Failed to store sensitive parameter '{}': {}",
                            strategy.name, source
                        );
                        SanitizeError::StoreParameter {
                            parameter: strategy.name.clone(),
                            source,
                        }
                    })?;
                stored += 1;
            }

            sanitized.push(strategy);
        }

        info!(
            "Sanitized {} parameter(s) for run {} ({} stored as secrets)",
            sanitized.len(),
            run_id,
            stored
        );
        Ok(Some(sanitized))
    }

    /// Resolve a parameter set and convert values to their declared types.
    pub async fn resolve_parameter_set(
        &self,
        set: &ParameterSet,
        bundle: &dyn BundleMetadata,
    ) -> Result<BTreeMap<String, ParameterValue>, SanitizeError> {
        Ok(set.resolve(self.parameters.as_ref(), bundle).await?)
    }

    /// Sanitize one output for persistence.
    pub async fn output(
        &self,
        output: Output,
        bundle: &dyn BundleMetadata,
    ) -> Result<Output, OutputSanitizeError> {
        match bundle.is_output_sensitive(&output.name) {
            Ok(false) => return Ok(output),
            Ok(true) => {}
            Err(e) => {
                return Err(OutputSanitizeError {
                    output,
                    source: e.into(),
                })
            }
        }

        // The store holds strings, so the payload has to be text.
        let plaintext = match String::from_utf8(output.value.clone()) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                let source = SanitizeError::NonUtf8Output {
                    output: output.name.clone(),
                };
                return Err(OutputSanitizeError { output, source });
            }
        };
        let encoded = output.encode();
        let stored = self
            .secrets
            .create(SourceKind::Secret, &encoded.key, &plaintext)
            .await;

        match stored {
            Ok(()) => {
                debug!("Stored sensitive output '{}'", encoded.name);
                Ok(encoded)
            }
            Err(source) => {
                error!(
                    "Failed to store sensitive output '{}': {}",
                    encoded.name, source
                );
                let err = SanitizeError::StoreOutput {
                    output: encoded.name.clone(),
                    key: encoded.key.clone(),
                    source,
                };
                Err(OutputSanitizeError {
                    output: encoded,
                    source: err,
                })
            }
        }
    }

    /// Replace the values of sensitive outputs with their stored plaintext.
    ///
    /// Outputs that are not sensitive, or whose sensitivity cannot be
    /// determined, pass through unchanged.
    pub async fn resolve_outputs(
        &self,
        outputs: Outputs,
        bundle: &dyn BundleMetadata,
    ) -> Result<Outputs, SanitizeError> {
        let mut resolved = Vec::with_capacity(outputs.len());
        for output in outputs {
            match bundle.is_output_sensitive(&output.name) {
                Ok(true) => {}
                Ok(false) => {
                    resolved.push(output);
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Cannot determine sensitivity of output '{}', passing through: {}",
                        output.name, e
                    );
                    resolved.push(output);
                    continue;
                }
            }

            let name = output.name.clone();
            let key = output.key.clone();
            let output = self
                .resolve_output(output)
                .await
                .map_err(|source| SanitizeError::ResolveOutput {
                    output: name,
                    key,
                    source,
                })?;
            resolved.push(output);
        }

        Ok(Outputs::new(resolved))
    }

    /// Load a sensitive output's plaintext from the secret store.
    pub async fn resolve_output(&self, mut output: Output) -> Result<Output, ResolveError> {
        let plaintext = self
            .secrets
            .resolve(SourceKind::Secret, &output.key)
            .await
            .map_err(|source| ResolveError {
                key: output.key.clone(),
                source,
            })?;

        output.value = plaintext.into_bytes();
        Ok(output)
    }

    /// Fold a run's overrides into a sanitized internal parameter set.
    ///
    /// The new set replaces any internal set the run already has. Sensitive
    /// values end up in the secret store keyed by the run ID.
    pub async fn sanitize_run(&self, run: &mut Run) -> Result<(), SanitizeError> {
        let strategies = self
            .raw_parameters(&run.parameter_overrides, &run.bundle, &run.id)
            .await?;
        let set = ParameterSet::new_internal(&run.namespace, &run.id, strategies);
        run.replace_internal_parameter_set(set);
        Ok(())
    }

    /// Secret store key a run's sensitive value is written under.
    pub fn secret_key_for(run: &Run, name: &str) -> String {
        secret_key(&run.id, name)
    }
}
