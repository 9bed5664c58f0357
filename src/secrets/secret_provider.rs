//! Literal and secret-store source providers.

use super::store::{SecretStore, StoreError};
use super::types::{SourceKind, SourceProvider, SourceResolution};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves `value` sources: the locator is the value.
pub struct ValueSourceProvider;

#[async_trait]
impl SourceProvider for ValueSourceProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Value
    }

    fn name(&self) -> &str {
        "value"
    }

    async fn resolve(&self, locator: &str) -> SourceResolution {
        SourceResolution::Resolved(locator.to_string())
    }
}

/// Resolves `secret` sources through a secret store.
pub struct SecretStoreSourceProvider {
    store: Arc<dyn SecretStore>,
}

impl SecretStoreSourceProvider {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceProvider for SecretStoreSourceProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Secret
    }

    fn name(&self) -> &str {
        "secret-store"
    }

    async fn resolve(&self, locator: &str) -> SourceResolution {
        match self.store.resolve(SourceKind::Secret, locator).await {
            Ok(value) => SourceResolution::Resolved(value),
            Err(e @ StoreError::NotFound { .. }) => SourceResolution::NotFound(e.to_string()),
            Err(e) => SourceResolution::Failed(e.to_string()),
        }
    }
}
