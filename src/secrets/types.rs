//! Core types for value indirection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source Types
// ============================================================================

/// Where the real value of a strategy lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Literal value carried in `Source::value`.
    Value,
    /// Environment variable named by `Source::value`.
    Env,
    /// File whose contents are the value.
    Path,
    /// External command whose stdout is the value.
    Command,
    /// Secret store entry keyed by `Source::value`.
    Secret,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Value => "value",
            SourceKind::Env => "env",
            SourceKind::Path => "path",
            SourceKind::Command => "command",
            SourceKind::Secret => "secret",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The indirection half of a strategy: a kind plus a kind-specific locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub key: SourceKind,
    pub value: String,
}

impl Source {
    pub fn new(key: SourceKind, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn is_secret(&self) -> bool {
        self.key == SourceKind::Secret
    }
}

/// Result of resolving a single source.
#[derive(Debug, Clone)]
pub enum SourceResolution {
    /// Successfully resolved to a value.
    Resolved(String),
    /// Resolution failed with a reason.
    Failed(String),
    /// The source does not exist (env var not set, secret missing, etc.).
    NotFound(String),
}

impl SourceResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SourceResolution::Resolved(_))
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            SourceResolution::Resolved(v) => Some(v),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SourceResolution::Failed(msg) | SourceResolution::NotFound(msg) => Some(msg),
            SourceResolution::Resolved(_) => None,
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Resolves sources of one kind to plaintext values.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// The kind of sources this provider handles.
    fn kind(&self) -> SourceKind;

    /// Display name for logging.
    fn name(&self) -> &str;

    /// Resolve the locator of a source to its value.
    async fn resolve(&self, locator: &str) -> SourceResolution;

    fn is_available(&self) -> bool {
        true
    }
}

/// Redact a secret value for display (show first 2 and last 2 chars).
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}
