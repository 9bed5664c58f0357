//! Strategy resolver: routes each strategy to the provider for its source kind.

use super::command_provider::CommandSourceProvider;
use super::env_provider::EnvSourceProvider;
use super::path_provider::PathSourceProvider;
use super::secret_provider::{SecretStoreSourceProvider, ValueSourceProvider};
use super::store::SecretStore;
use super::strategy::Strategy;
use super::types::{SourceKind, SourceProvider, SourceResolution};
use crate::config::Config;
use crate::parameters::{ParameterProvider, ParameterSet, ProviderError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default parameter provider backed by one [`SourceProvider`] per kind.
pub struct SourceResolver {
    providers: HashMap<SourceKind, Box<dyn SourceProvider>>,
}

impl SourceResolver {
    /// A resolver with no providers registered.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Literal values plus secrets from `store`.
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self::empty()
            .with_provider(Box::new(ValueSourceProvider))
            .with_provider(Box::new(SecretStoreSourceProvider::new(store)))
    }

    /// Build the provider set enabled in the configuration.
    pub fn from_config(config: &Config, store: Arc<dyn SecretStore>) -> Self {
        let providers = &config.providers;
        let mut resolver = Self::new(store);

        if providers.env.enabled {
            resolver = resolver.with_provider(Box::new(EnvSourceProvider::new()));
        }

        if providers.path.enabled {
            resolver = resolver.with_provider(Box::new(PathSourceProvider::new(
                providers.path.base_dir.clone(),
            )));
        }

        if providers.command.enabled {
            resolver = resolver.with_provider(Box::new(
                CommandSourceProvider::new(providers.command.cwd.clone())
                    .with_timeout(Duration::from_secs(providers.command.timeout_secs))
                    .with_max_output_bytes(providers.command.max_output_bytes),
            ));
        }

        resolver
    }

    /// Register a provider, replacing any existing one for the same kind.
    pub fn with_provider(mut self, provider: Box<dyn SourceProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn handles(&self, kind: SourceKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Resolve a single strategy through its provider.
    pub async fn resolve_strategy(&self, strategy: &Strategy) -> Result<String, ProviderError> {
        let kind = strategy.source.key;
        let provider = self
            .providers
            .get(&kind)
            .ok_or_else(|| ProviderError::NoProvider {
                name: strategy.name.clone(),
                kind,
            })?;

        if !provider.is_available() {
            return Err(ProviderError::Unavailable {
                name: strategy.name.clone(),
                provider: provider.name().to_string(),
            });
        }

        debug!(
            "Resolving {} source for '{}' via provider '{}'",
            kind,
            strategy.name,
            provider.name()
        );

        match provider.resolve(&strategy.source.value).await {
            SourceResolution::Resolved(value) => Ok(value),
            SourceResolution::Failed(reason) => {
                error!(
                    "Failed to resolve {} source for '{}': {}",
                    kind, strategy.name, reason
                );
                Err(ProviderError::Unresolved {
                    name: strategy.name.clone(),
                    kind,
                    reason,
                })
            }
            SourceResolution::NotFound(reason) => {
                warn!(
                    "{} source for '{}' not found: {}",
                    kind, strategy.name, reason
                );
                Err(ProviderError::Unresolved {
                    name: strategy.name.clone(),
                    kind,
                    reason,
                })
            }
        }
    }
}

#[async_trait]
impl ParameterProvider for SourceResolver {
    async fn resolve_all(
        &self,
        set: &ParameterSet,
    ) -> Result<BTreeMap<String, String>, ProviderError> {
        let mut resolved = BTreeMap::new();
        for strategy in &set.parameters {
            let value = self.resolve_strategy(strategy).await?;
            resolved.insert(strategy.name.clone(), value);
        }

        info!(
            "Resolved {} parameter(s) from set '{}'",
            resolved.len(),
            set.name
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::store::InMemorySecretStore;
    use crate::secrets::strategy::{default_strategy, encode};
    use crate::secrets::types::Source;

    async fn store_with(key: &str, plaintext: &str) -> Arc<InMemorySecretStore> {
        let store = Arc::new(InMemorySecretStore::new());
        store
            .create(SourceKind::Secret, key, plaintext)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn resolves_literals_and_secrets() {
        let store = store_with("01RUNpassword", "hunter22").await;
        let resolver = SourceResolver::new(store);

        let set = ParameterSet::new(
            "dev",
            "mine",
            vec![
                default_strategy("port", "80"),
                encode(default_strategy("password", ""), "01RUN"),
            ],
        );

        let values = resolver.resolve_all(&set).await.unwrap();
        assert_eq!(values["port"], "80");
        assert_eq!(values["password"], "hunter22");
    }

    #[tokio::test]
    async fn missing_secret_fails_the_set() {
        let resolver = SourceResolver::new(Arc::new(InMemorySecretStore::new()));
        let set = ParameterSet::new(
            "dev",
            "mine",
            vec![encode(default_strategy("password", ""), "01RUN")],
        );

        let err = resolver.resolve_all(&set).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Unresolved { ref name, kind: SourceKind::Secret, .. } if name == "password"
        ));
    }

    #[tokio::test]
    async fn unregistered_kind_is_reported() {
        let resolver = SourceResolver::new(Arc::new(InMemorySecretStore::new()));
        let strategy = Strategy::new("token", Source::new(SourceKind::Command, "vault read x"));

        let err = resolver.resolve_strategy(&strategy).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::NoProvider {
                name: "token".into(),
                kind: SourceKind::Command,
            }
        );
    }

    #[tokio::test]
    async fn from_config_honours_enabled_flags() {
        let mut config = Config::default();
        config.providers.command.enabled = false;
        let resolver = SourceResolver::from_config(&config, Arc::new(InMemorySecretStore::new()));

        assert!(resolver.handles(SourceKind::Value));
        assert!(resolver.handles(SourceKind::Secret));
        assert!(resolver.handles(SourceKind::Env));
        assert!(resolver.handles(SourceKind::Path));
        assert!(!resolver.handles(SourceKind::Command));
    }

    #[tokio::test]
    async fn env_sources_resolve_through_config_resolver() {
        let resolver =
            SourceResolver::from_config(&Config::default(), Arc::new(InMemorySecretStore::new()));
        let strategy = Strategy::new("path", Source::new(SourceKind::Env, "PATH"));
        assert!(!resolver.resolve_strategy(&strategy).await.unwrap().is_empty());
    }
}
