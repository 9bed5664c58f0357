//! Outputs produced by a bundle action.

use super::Document;
use crate::secrets::secret_key;
use crate::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single output value generated by a run.
///
/// A sensitive output is persisted with `value` cleared and `key` pointing
/// at its secret store entry. A non-sensitive output keeps `value` and leaves
/// `key` empty.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(default)]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub installation: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub result_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<u8>,
}

impl Output {
    pub fn new(name: &str, value: impl Into<Vec<u8>>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            name: name.to_string(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Secret store key this output is stored under when sensitive.
    pub fn secret_key(&self) -> String {
        secret_key(&self.run_id, &self.name)
    }

    /// Clear the value and point the output at its secret store key.
    pub(crate) fn encode(mut self) -> Self {
        self.key = self.secret_key();
        self.value = Vec::new();
        self
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("installation", &self.installation)
            .field("run_id", &self.run_id)
            .field("result_id", &self.result_id)
            .field("key", &self.key)
            .field("value", &format_args!("<{} bytes>", self.value.len()))
            .finish()
    }
}

impl Document for Output {
    fn default_document_filter(&self) -> serde_json::Value {
        serde_json::json!({ "resultId": self.result_id, "name": self.name })
    }
}

/// An ordered collection of outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(Vec<Output>);

impl Outputs {
    pub fn new(outputs: Vec<Output>) -> Self {
        Self(outputs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Output> {
        self.0.iter().find(|o| o.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Output> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Output> {
        self.0
    }
}

impl From<Vec<Output>> for Outputs {
    fn from(outputs: Vec<Output>) -> Self {
        Self(outputs)
    }
}

impl IntoIterator for Outputs {
    type Item = Output;
    type IntoIter = std::vec::IntoIter<Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Outputs {
    type Item = &'a Output;
    type IntoIter = std::slice::Iter<'a, Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> Output {
        let mut o = Output::new("connstr", "mysql://root:pw@db");
        o.run_id = "01RUN".into();
        o.result_id = "01RESULT".into();
        o
    }

    #[test]
    fn encode_clears_value_and_sets_key() {
        let encoded = output().encode();
        assert_eq!(encoded.key, "01RUNconnstr");
        assert!(encoded.value.is_empty());
    }

    #[test]
    fn value_serializes_as_base64() {
        let json = serde_json::to_value(output()).unwrap();
        assert_eq!(json["value"], "bXlzcWw6Ly9yb290OnB3QGRi");
        assert!(json.get("key").is_none());

        let back: Output = serde_json::from_value(json).unwrap();
        assert_eq!(back.value, b"mysql://root:pw@db");
    }

    #[test]
    fn encoded_output_serializes_without_value() {
        let json = serde_json::to_value(output().encode()).unwrap();
        assert!(json.get("value").is_none());
        assert_eq!(json["key"], "01RUNconnstr");
    }

    #[test]
    fn debug_hides_value() {
        let dbg = format!("{:?}", output());
        assert!(!dbg.contains("root:pw"));
        assert!(dbg.contains("18 bytes"));
    }

    #[test]
    fn outputs_lookup_by_name_keeps_order() {
        let outputs = Outputs::new(vec![Output::new("b", "2"), Output::new("a", "1")]);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs.get_by_name("a").unwrap().value, b"1");
        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn document_filter_uses_result_and_name() {
        assert_eq!(
            output().default_document_filter(),
            serde_json::json!({"resultId": "01RESULT", "name": "connstr"})
        );
    }
}
