//! Secret store contract and an in-memory implementation.

use super::types::SourceKind;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Errors returned by a secret store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("secret {key}:{value} not found")]
    NotFound { key: SourceKind, value: String },

    #[error("secret {key}:{value} already exists")]
    AlreadyExists { key: SourceKind, value: String },

    #[error("secret store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Key-addressed plaintext secret persistence.
///
/// Entries are addressed by a `(kind, value)` pair. Implementations must
/// reject `create` for a pair that already exists unless they deliberately
/// dedupe; the sanitizer does not absorb duplicates on their behalf.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn create(&self, key: SourceKind, value: &str, plaintext: &str)
        -> Result<(), StoreError>;

    async fn resolve(&self, key: SourceKind, value: &str) -> Result<String, StoreError>;
}

/// Process-local secret store.
///
/// Useful for embedding and tests; nothing survives the process.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<(SourceKind, String), String>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn contains(&self, key: SourceKind, value: &str) -> bool {
        self.secrets.contains_key(&(key, value.to_string()))
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn create(
        &self,
        key: SourceKind,
        value: &str,
        plaintext: &str,
    ) -> Result<(), StoreError> {
        match self.secrets.entry((key, value.to_string())) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                key,
                value: value.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(plaintext.to_string());
                debug!(%key, value, "Stored secret");
                Ok(())
            }
        }
    }

    async fn resolve(&self, key: SourceKind, value: &str) -> Result<String, StoreError> {
        self.secrets
            .get(&(key, value.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                key,
                value: value.to_string(),
            })
    }
}

impl std::fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySecretStore")
            .field("len", &self.secrets.len())
            .finish()
    }
}
