//! Targeting rules shared by flags and segments.
//!
//! Rules and clauses carry server-assigned `_id` fields that the API rejects
//! on write. They are read but never serialized back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SEGMENT_MATCH_OPS: [&str; 2] = ["segmentMatch", "not-segmentMatch"];

/// A rule clause. Fields other than attribute and op pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Clause {
    /// Whether the clause references another segment.
    #[must_use]
    pub fn is_segment_match(&self) -> bool {
        [&self.attribute, &self.op]
            .into_iter()
            .flatten()
            .any(|v| SEGMENT_MATCH_OPS.contains(&v.as_str()))
    }

    /// The clause as written back, without `_id`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.rest.clone();
        if let Some(attribute) = &self.attribute {
            map.insert("attribute".into(), Value::String(attribute.clone()));
        }
        if let Some(op) = &self.op {
            map.insert("op".into(), Value::String(op.clone()));
        }
        Value::Object(map)
    }
}

/// A targeting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Rule {
    /// Whether any clause references another segment.
    #[must_use]
    pub fn references_segments(&self) -> bool {
        self.clauses.iter().any(Clause::is_segment_match)
    }

    /// The rule as written back, without `_id` on the rule or its clauses.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.rest.clone();
        map.insert(
            "clauses".into(),
            Value::Array(self.clauses.iter().map(Clause::to_value).collect()),
        );
        Value::Object(map)
    }
}

/// Drops segment-match clauses, and rules that lose all their clauses.
#[must_use]
pub fn without_segment_clauses(rules: Vec<Rule>) -> Vec<Rule> {
    rules
        .into_iter()
        .filter_map(|mut rule| {
            if !rule.references_segments() {
                return Some(rule);
            }
            rule.clauses.retain(|c| !c.is_segment_match());
            (!rule.clauses.is_empty()).then_some(rule)
        })
        .collect()
}

/// Rules as a patch value.
#[must_use]
pub fn rules_value(rules: &[Rule]) -> Value {
    Value::Array(rules.iter().map(Rule::to_value).collect())
}
