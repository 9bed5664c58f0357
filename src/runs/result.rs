//! Outcome of a run.

use super::Document;
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Canceled,
    Running,
    Failed,
    Pending,
    Succeeded,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Canceled => "canceled",
            Status::Running => "running",
            Status::Failed => "failed",
            Status::Pending => "pending",
            Status::Succeeded => "succeeded",
            Status::Unknown => "unknown",
        }
    }

    /// The run will not change status again.
    pub fn is_final(&self) -> bool {
        matches!(self, Status::Canceled | Status::Failed | Status::Succeeded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CONTENT_DIGEST: &str = "contentDigest";
const GENERATED_BY_BUNDLE: &str = "generatedByBundle";

/// Per-output attributes recorded on a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMetadata(BTreeMap<String, BTreeMap<String, String>>);

impl OutputMetadata {
    pub fn get(&self, output: &str, attribute: &str) -> Option<&str> {
        self.0
            .get(output)
            .and_then(|attrs| attrs.get(attribute))
            .map(String::as_str)
    }

    pub fn set(&mut self, output: &str, attribute: &str, value: impl Into<String>) {
        self.0
            .entry(output.to_string())
            .or_default()
            .insert(attribute.to_string(), value.into());
    }

    pub fn content_digest(&self, output: &str) -> Option<&str> {
        self.get(output, CONTENT_DIGEST)
    }

    pub fn set_content_digest(&mut self, output: &str, digest: impl Into<String>) {
        self.set(output, CONTENT_DIGEST, digest);
    }

    /// Whether the output was declared by the bundle rather than injected by the tool.
    pub fn generated_by_bundle(&self, output: &str) -> Option<bool> {
        self.get(output, GENERATED_BY_BUNDLE)
            .and_then(|v| v.parse().ok())
    }

    pub fn set_generated_by_bundle(&mut self, output: &str, generated: bool) {
        self.set(output, GENERATED_BY_BUNDLE, generated.to_string());
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The result of executing a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    #[serde(default)]
    pub schema_version: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub namespace: String,
    pub installation: String,
    pub run_id: String,
    pub created: DateTime<Utc>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "OutputMetadata::is_empty")]
    pub output_metadata: OutputMetadata,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub custom: serde_json::Value,
}

impl RunResult {
    /// A fresh result with a new ID and the current time.
    pub fn new(status: Status) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            id: Uuid::now_v7().to_string(),
            namespace: String::new(),
            installation: String::new(),
            run_id: String::new(),
            created: Utc::now(),
            status,
            message: String::new(),
            output_metadata: OutputMetadata::default(),
            custom: serde_json::Value::Null,
        }
    }
}

impl Document for RunResult {
    fn default_document_filter(&self) -> serde_json::Value {
        serde_json::json!({ "_id": self.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Status::Succeeded).unwrap(), "succeeded");
        let s: Status = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(s, Status::Canceled);
        assert!(s.is_final());
        assert!(!Status::Running.is_final());
    }

    #[test]
    fn output_metadata_helpers() {
        let mut meta = OutputMetadata::default();
        assert!(meta.is_empty());
        meta.set_content_digest("kubeconfig", "sha256:abc");
        meta.set_generated_by_bundle("kubeconfig", true);

        assert_eq!(meta.content_digest("kubeconfig"), Some("sha256:abc"));
        assert_eq!(meta.generated_by_bundle("kubeconfig"), Some(true));
        assert_eq!(meta.generated_by_bundle("other"), None);
        assert_eq!(meta.outputs().collect::<Vec<_>>(), ["kubeconfig"]);
    }

    #[test]
    fn new_results_get_unique_ids() {
        let a = RunResult::new(Status::Running);
        let b = RunResult::new(Status::Running);
        assert_ne!(a.id, b.id);
        assert_eq!(a.default_document_filter(), serde_json::json!({"_id": a.id}));
    }

    #[test]
    fn result_serializes_id_as_document_key() {
        let result = RunResult::new(Status::Failed);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["_id"], result.id);
        assert_eq!(json["status"], "failed");
        assert!(json.get("custom").is_none());
    }
}
