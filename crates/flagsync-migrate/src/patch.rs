//! JSON Patch documents.

use serde::Serialize;
use serde_json::Value;

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOp {
    pub op: &'static str,
    pub path: String,
    pub value: Value,
}

/// An ordered list of patch operations, serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonPatch(Vec<PatchOp>);

impl JsonPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `replace` operation.
    pub fn replace(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push("replace", path, value)
    }

    /// Appends an `add` operation.
    pub fn add(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push("add", path, value)
    }

    /// Appends a `replace` operation when `value` is present.
    pub fn replace_opt<V: Into<Value>>(
        &mut self,
        path: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.replace(path, value);
        }
        self
    }

    fn push(&mut self, op: &'static str, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.push(PatchOp {
            op,
            path: path.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_array() {
        let mut patch = JsonPatch::new();
        patch
            .replace("/name", "Production")
            .add("/variations/0/name", "On")
            .replace_opt("/offVariation", None::<u64>)
            .replace_opt("/critical", Some(true));

        assert_eq!(patch.len(), 3);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                {"op": "replace", "path": "/name", "value": "Production"},
                {"op": "add", "path": "/variations/0/name", "value": "On"},
                {"op": "replace", "path": "/critical", "value": true}
            ])
        );
    }

    #[test]
    fn test_empty_patch() {
        let patch = JsonPatch::new();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "[]");
    }
}
