//! Named values paired with the indirection that says where they live.

use super::types::{redact_secret, Source, SourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named value and its source.
///
/// `value` is the resolved plaintext and is never serialized: what gets
/// persisted is the `source`. A plain strategy carries its literal in a
/// `value` source; a sanitized strategy carries a secret-store key instead.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub name: String,
    pub source: Source,
    #[serde(skip)]
    pub value: String,
}

impl Strategy {
    pub fn new(name: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            source,
            value: String::new(),
        }
    }

    pub fn is_secret(&self) -> bool {
        self.source.is_secret()
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source_value = if self.source.key == SourceKind::Value {
            redact_secret(&self.source.value)
        } else {
            self.source.value.clone()
        };
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("source.key", &self.source.key)
            .field("source.value", &source_value)
            .field("value", &redact_secret(&self.value))
            .finish()
    }
}

/// Build a plain strategy whose value is its own literal source.
pub fn default_strategy(name: &str, value: &str) -> Strategy {
    Strategy {
        name: name.to_string(),
        source: Source::new(SourceKind::Value, value),
        value: value.to_string(),
    }
}

/// Secret-store key for a value produced by a run.
pub fn secret_key(run_id: &str, name: &str) -> String {
    format!("{run_id}{name}")
}

/// Point a strategy at the secret store entry `id + name`.
///
/// Nothing is written to the store here. The caller has to create the entry
/// under the same key before the strategy is persisted.
pub fn encode(mut strategy: Strategy, id: &str) -> Strategy {
    strategy.source = Source::new(SourceKind::Secret, secret_key(id, &strategy.name));
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_a_literal() {
        let s = default_strategy("port", "8080");
        assert_eq!(s.source, Source::new(SourceKind::Value, "8080"));
        assert_eq!(s.value, "8080");
        assert!(!s.is_secret());
    }

    #[test]
    fn encode_rewrites_source_and_keeps_value_in_memory() {
        let s = encode(default_strategy("password", "hunter22"), "01RUN");
        assert_eq!(s.source, Source::new(SourceKind::Secret, "01RUNpassword"));
        assert_eq!(s.value, "hunter22");
    }

    #[test]
    fn serialized_secret_strategy_has_no_plaintext() {
        let s = encode(default_strategy("password", "hunter22"), "01RUN");
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("hunter22"));
        assert!(json.contains("01RUNpassword"));
    }

    #[test]
    fn deserialized_strategy_has_empty_value() {
        let s: Strategy = serde_json::from_str(
            r#"{"name":"token","source":{"key":"env","value":"API_TOKEN"}}"#,
        )
        .unwrap();
        assert_eq!(s.source.key, SourceKind::Env);
        assert!(s.value.is_empty());
    }

    #[test]
    fn debug_output_redacts_values() {
        let s = default_strategy("password", "correct-horse-battery");
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("correct-horse-battery"));
        assert!(dbg.contains("co…ry"));
    }
}
