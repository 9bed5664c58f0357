//! `env` parameter sources.
//!
//! A strategy with source `{env, DB_PASSWORD}` takes its value from the
//! orchestrator's environment at resolve time. Nothing is read when the run
//! is sanitized; only the variable name is persisted.

use super::types::{SourceKind, SourceProvider, SourceResolution};
use async_trait::async_trait;
use std::env::VarError;

/// Reads parameter values from environment variables named by the locator.
pub struct EnvSourceProvider;

impl EnvSourceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvSourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// `std::env::var` may panic on these, so they are refused up front.
fn invalid_variable_name(locator: &str) -> bool {
    locator.is_empty() || locator.contains('=') || locator.contains('\0')
}

#[async_trait]
impl SourceProvider for EnvSourceProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Env
    }

    fn name(&self) -> &str {
        "env"
    }

    async fn resolve(&self, locator: &str) -> SourceResolution {
        if invalid_variable_name(locator) {
            return SourceResolution::Failed(format!(
                "env source {locator:?} is not a valid variable name"
            ));
        }
        match std::env::var(locator) {
            Ok(value) if !value.is_empty() => SourceResolution::Resolved(value),
            Ok(_) => SourceResolution::NotFound(format!(
                "env source '{locator}' is set but empty"
            )),
            Err(VarError::NotPresent) => {
                SourceResolution::NotFound(format!("env source '{locator}' is not set"))
            }
            Err(VarError::NotUnicode(_)) => SourceResolution::Failed(format!(
                "env source '{locator}' does not hold valid UTF-8"
            )),
        }
    }
}
