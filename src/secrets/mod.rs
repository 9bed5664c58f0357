//! Value indirection: strategies, sources, and the providers that resolve them.
//!
//! A strategy's `source` says where its real value lives. Sensitive values
//! are pointed at the secret store so only the key is ever persisted; other
//! sources (environment, files, commands) are resolved on demand.

pub mod command_provider;
pub mod env_provider;
pub mod path_provider;
pub mod resolver;
pub mod secret_provider;
pub mod store;
pub mod strategy;
pub mod types;

pub use resolver::SourceResolver;
pub use store::{InMemorySecretStore, SecretStore, StoreError};
pub use strategy::{default_strategy, encode, secret_key, Strategy};
pub use types::{redact_secret, Source, SourceKind, SourceProvider, SourceResolution};
