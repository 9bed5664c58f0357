//! Parameter sets and the provider that resolves their indirections.

use crate::bundle::BundleMetadata;
use crate::secrets::{SourceKind, Strategy};
use crate::value::ParameterValue;
use crate::SCHEMA_VERSION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while resolving a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("no provider registered for {kind} sources (parameter {name:?})")]
    NoProvider { name: String, kind: SourceKind },

    #[error("provider {provider:?} is not available (parameter {name:?})")]
    Unavailable { name: String, provider: String },

    #[error("could not resolve parameter {name:?} from {kind} source: {reason}")]
    Unresolved {
        name: String,
        kind: SourceKind,
        reason: String,
    },

    #[error("parameter provider error: {0}")]
    Other(String),
}

/// Resolves every strategy in a set to its raw string value.
#[async_trait]
pub trait ParameterProvider: Send + Sync {
    async fn resolve_all(
        &self,
        set: &ParameterSet,
    ) -> Result<BTreeMap<String, String>, ProviderError>;
}

/// A named, ordered collection of parameter strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Generated by the system for a single run rather than authored by a user.
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub parameters: Vec<Strategy>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl ParameterSet {
    pub fn new(namespace: &str, name: &str, parameters: Vec<Strategy>) -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            labels: BTreeMap::new(),
            internal: false,
            parameters,
            created: now,
            modified: now,
        }
    }

    /// Build the system-generated set that carries a run's resolved values.
    pub fn new_internal(namespace: &str, run_id: &str, parameters: Vec<Strategy>) -> Self {
        let mut set = Self::new(namespace, &format!("internal-parameter-set-{run_id}"), parameters);
        set.internal = true;
        set
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.parameters.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Resolve every strategy and convert the raw values to their declared types.
    ///
    /// Values the bundle cannot convert are kept as raw strings rather than
    /// failing the whole set.
    pub async fn resolve(
        &self,
        provider: &dyn ParameterProvider,
        bundle: &dyn BundleMetadata,
    ) -> Result<BTreeMap<String, ParameterValue>, ProviderError> {
        let raw = provider.resolve_all(self).await?;
        debug!(set = %self.name, count = raw.len(), "Resolved parameter set");

        let resolved = raw
            .into_iter()
            .map(|(name, value)| {
                let converted = match bundle.convert_parameter_value(&name, &value) {
                    Ok(converted) => converted,
                    Err(e) => {
                        warn!(parameter = %name, error = %e, "Keeping raw parameter value");
                        ParameterValue::String(value)
                    }
                };
                (name, converted)
            })
            .collect();

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Bundle, Schema, SchemaType};
    use crate::secrets::default_strategy;

    /// Resolves every strategy to its source locator.
    struct EchoProvider;

    #[async_trait]
    impl ParameterProvider for EchoProvider {
        async fn resolve_all(
            &self,
            set: &ParameterSet,
        ) -> Result<BTreeMap<String, String>, ProviderError> {
            Ok(set
                .parameters
                .iter()
                .map(|s| (s.name.clone(), s.source.value.clone()))
                .collect())
        }
    }

    #[test]
    fn internal_set_is_flagged_and_named_after_run() {
        let set = ParameterSet::new_internal("dev", "01RUN", vec![]);
        assert!(set.is_internal());
        assert_eq!(set.name, "internal-parameter-set-01RUN");
        assert!(!ParameterSet::new("dev", "mine", vec![]).is_internal());
    }

    #[test]
    fn get_finds_strategy_by_name() {
        let set = ParameterSet::new("dev", "mine", vec![default_strategy("port", "80")]);
        assert_eq!(set.get("port").unwrap().value, "80");
        assert!(set.get("host").is_none());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn resolve_converts_declared_types() {
        let bundle = Bundle::new("b", "1.0.0").with_parameter("port", Schema::of_type(SchemaType::Integer));
        let set = ParameterSet::new("dev", "mine", vec![default_strategy("port", "8080")]);

        let resolved = set.resolve(&EchoProvider, &bundle).await.unwrap();
        assert_eq!(resolved["port"], ParameterValue::Integer(8080));
    }

    #[tokio::test]
    async fn resolve_keeps_raw_value_when_conversion_fails() {
        let bundle = Bundle::new("b", "1.0.0").with_parameter("port", Schema::of_type(SchemaType::Integer));
        let set = ParameterSet::new(
            "dev",
            "mine",
            vec![
                default_strategy("port", "eighty"),
                default_strategy("undeclared", "x"),
            ],
        );

        let resolved = set.resolve(&EchoProvider, &bundle).await.unwrap();
        assert_eq!(resolved["port"], ParameterValue::String("eighty".into()));
        assert_eq!(resolved["undeclared"], ParameterValue::String("x".into()));
    }

    #[test]
    fn serialized_set_round_trips_sources_only() {
        let set = ParameterSet::new("dev", "mine", vec![default_strategy("port", "80")]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["parameters"][0]["source"]["key"], "value");
        assert_eq!(json["parameters"][0]["source"]["value"], "80");
        assert!(json["parameters"][0].get("value").is_none());
    }
}
