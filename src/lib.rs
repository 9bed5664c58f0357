//! Sensitive-data sanitization for bundle installation runs.
//!
//! Runs, their parameter sets and their outputs are recorded in an execution
//! history. This crate makes sure the sensitive parts of those records are
//! written to a secret store instead, leaving only a key behind, and resolves
//! them back to plaintext when an action needs them.

pub mod bundle;
pub mod config;
pub mod logging;
pub mod parameters;
pub mod runs;
pub mod sanitizer;
pub mod secrets;
pub mod value;

/// Schema version stamped on every record this crate creates.
pub const SCHEMA_VERSION: &str = "1.0.1";

pub use bundle::{Bundle, BundleError, BundleMetadata};
pub use config::Config;
pub use parameters::{ParameterProvider, ParameterSet, ProviderError};
pub use runs::{Document, Output, Outputs, Run, RunError, RunResult, Status};
pub use sanitizer::{OutputSanitizeError, ResolveError, SanitizeError, Service};
pub use secrets::{
    InMemorySecretStore, SecretStore, SourceKind, SourceResolver, StoreError, Strategy,
};
pub use value::ParameterValue;
