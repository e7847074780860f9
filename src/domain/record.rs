//! Persisted project record
//!
//! This is the JSON shape exchanged with storage collaborators. It mirrors the
//! live [`Project`](super::Project) but flattens ownership: consumption sits on
//! each node, edges are a plain map, and derived state is never written.
//!
//! ```text
//! {
//!   "start": "2024-01-01", "end": "",
//!   "resources": { "r1": { "name": "Crew", "amount": 10, "concurrency": 2 } },
//!   "nodes": { "n1": { "name": "Design", "start": "", "end": "", "critical": false,
//!                      "resources": { "r1": 4 } } },
//!   "edges": { "e1": { "from": "n1", "to": "n2" } },
//!   "stats": { "createdAt": 1700000000000, "modifiedAt": null, "accessedAt": null },
//!   "original": { ... }        // present once the project is started
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::date::empty_as_none;
use super::id::{EdgeId, NodeId, ResourceId};
use super::milestone::{consumption_map, null_as_default, Edge, Milestone, Resource};

/// Project timestamps (epoch milliseconds in JSON)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub modified_at: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub accessed_at: Option<DateTime<Utc>>,
}

impl Stats {
    /// Stats for a project created right now
    pub fn created_now() -> Self {
        Self {
            created_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// A milestone as persisted, including its consumption map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, with = "empty_as_none")]
    pub start: Option<NaiveDate>,

    #[serde(default, with = "empty_as_none")]
    pub end: Option<NaiveDate>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub critical: bool,

    #[serde(default, deserialize_with = "consumption_map")]
    pub resources: BTreeMap<ResourceId, f64>,

    /// Presentation fields written by other collaborators
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeRecord {
    /// Joins a live milestone with its consumption map
    pub fn from_parts(milestone: &Milestone, resources: BTreeMap<ResourceId, f64>) -> Self {
        Self {
            name: milestone.name.clone(),
            start: milestone.start,
            end: milestone.end,
            critical: milestone.critical,
            resources,
            extra: milestone.extra.clone(),
        }
    }

    /// Splits off the live milestone
    pub fn milestone(&self) -> Milestone {
        Milestone {
            name: self.name.clone(),
            start: self.start,
            end: self.end,
            critical: self.critical,
            extra: self.extra.clone(),
        }
    }
}

/// The frozen state written to `original` when a project starts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, Resource>,

    #[serde(default)]
    pub nodes: BTreeMap<NodeId, NodeRecord>,

    #[serde(default)]
    pub edges: BTreeMap<EdgeId, Edge>,

    #[serde(default, with = "empty_as_none")]
    pub start: Option<NaiveDate>,

    #[serde(default, with = "empty_as_none")]
    pub end: Option<NaiveDate>,
}

/// The full persisted project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, with = "empty_as_none")]
    pub start: Option<NaiveDate>,

    #[serde(default, with = "empty_as_none")]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub resources: BTreeMap<ResourceId, Resource>,

    #[serde(default)]
    pub nodes: BTreeMap<NodeId, NodeRecord>,

    #[serde(default)]
    pub edges: BTreeMap<EdgeId, Edge>,

    #[serde(default)]
    pub stats: Stats,

    /// Baseline, present iff the project has been started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Snapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_format() {
        let json = r#"{
            "start": "2024-01-01",
            "end": "",
            "resources": {"r1": {"name": "Crew", "amount": 10, "concurrency": 0}},
            "nodes": {
                "n1": {"name": "Design", "top": 200, "left": 400, "start": "", "end": "2024-01-15",
                       "critical": true, "resources": {"r1": 4}}
            },
            "edges": {},
            "stats": {"createdAt": 1700000000000, "modifiedAt": null, "accessedAt": null}
        }"#;

        let record: ProjectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(record.end, None);
        assert!(record.original.is_none());
        assert!(record.stats.created_at.is_some());

        let node = &record.nodes[&NodeId::new(1)];
        assert_eq!(node.name, "Design");
        assert!(node.critical);
        assert_eq!(node.end, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(node.resources[&ResourceId::new(1)], 4.0);
        assert_eq!(node.extra["top"], serde_json::json!(200));
    }

    #[test]
    fn preserves_presentation_fields() {
        let json = r#"{"name": "Build", "left": 720, "top": 90}"#;
        let node: NodeRecord = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&node).unwrap();

        assert_eq!(back["left"], serde_json::json!(720));
        assert_eq!(back["top"], serde_json::json!(90));
        assert_eq!(back["start"], serde_json::json!(""));
        assert_eq!(back["critical"], serde_json::json!(false));
    }

    #[test]
    fn writes_original_only_when_present() {
        let record = ProjectRecord::default();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("original").is_none());
        assert_eq!(json["stats"]["createdAt"], serde_json::Value::Null);
    }
}
