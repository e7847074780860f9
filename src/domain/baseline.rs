//! Project baseline
//!
//! When a project starts, its resources, milestones, edges and dates are
//! frozen into a [`Baseline`]. The baseline is read-only: it exposes no
//! mutating methods and is only ever replaced wholesale when a record is
//! loaded. Historical IDs it contains are never handed out again.
//!
//! The baseline also powers two reports on started projects: the requirement
//! changes made since the start, and each milestone's date advancement.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::id::{EdgeId, NodeId, ResourceId, SeqId};
use super::milestone::{Edge, Resource};
use super::record::{NodeRecord, Snapshot};

/// Immutable snapshot taken when the project started
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline(Snapshot);

impl Baseline {
    pub(crate) fn freeze(snapshot: Snapshot) -> Self {
        Self(snapshot)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.0
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.0.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.0.end
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.0.nodes.get(&id)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.0.resources.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.0.edges.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.0.nodes.contains_key(&id)
    }

    pub fn has_resource(&self, id: ResourceId) -> bool {
        self.0.resources.contains_key(&id)
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.0.edges.contains_key(&id)
    }
}

/// Picks the lowest ID that no live entity holds and that the baseline (if
/// any) never held.
pub fn allocate_id<I: SeqId>(is_live: impl Fn(I) -> bool, in_baseline: impl Fn(I) -> bool) -> I {
    (1..=u32::MAX)
        .map(I::from_seq)
        .find(|candidate| !is_live(*candidate) && !in_baseline(*candidate))
        .unwrap_or_else(|| I::from_seq(u32::MAX))
}

/// One difference between the baseline and the live project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    ProjectDates { fields: Vec<&'static str> },
    NodeAdded { id: NodeId },
    NodeRemoved { id: NodeId },
    NodeChanged { id: NodeId, fields: Vec<String> },
    ResourceAdded { id: ResourceId },
    ResourceRemoved { id: ResourceId },
    ResourceChanged { id: ResourceId, fields: Vec<&'static str> },
    EdgeAdded { id: EdgeId, from: NodeId, to: NodeId },
    EdgeRemoved { id: EdgeId, from: NodeId, to: NodeId },
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::ProjectDates { fields } => write!(f, "project dates changed: {}", fields.join(", ")),
            Change::NodeAdded { id } => write!(f, "milestone {id} added"),
            Change::NodeRemoved { id } => write!(f, "milestone {id} removed"),
            Change::NodeChanged { id, fields } => {
                write!(f, "milestone {id} changed: {}", fields.join(", "))
            }
            Change::ResourceAdded { id } => write!(f, "resource {id} added"),
            Change::ResourceRemoved { id } => write!(f, "resource {id} removed"),
            Change::ResourceChanged { id, fields } => {
                write!(f, "resource {id} changed: {}", fields.join(", "))
            }
            Change::EdgeAdded { id, from, to } => write!(f, "dependency {id} ({from} -> {to}) added"),
            Change::EdgeRemoved { id, from, to } => {
                write!(f, "dependency {id} ({from} -> {to}) removed")
            }
        }
    }
}

/// Lists what changed between the baseline and the live snapshot
pub fn changes(baseline: &Baseline, live: &Snapshot) -> Vec<Change> {
    let base = baseline.snapshot();
    let mut changes = Vec::new();

    let mut date_fields = Vec::new();
    if base.start != live.start {
        date_fields.push("start");
    }
    if base.end != live.end {
        date_fields.push("end");
    }
    if !date_fields.is_empty() {
        changes.push(Change::ProjectDates {
            fields: date_fields,
        });
    }

    for id in union_keys(&base.nodes, &live.nodes) {
        match (base.nodes.get(&id), live.nodes.get(&id)) {
            (None, Some(_)) => changes.push(Change::NodeAdded { id }),
            (Some(_), None) => changes.push(Change::NodeRemoved { id }),
            (Some(before), Some(after)) => {
                let fields = node_fields_changed(before, after);
                if !fields.is_empty() {
                    changes.push(Change::NodeChanged { id, fields });
                }
            }
            (None, None) => {}
        }
    }

    for id in union_keys(&base.resources, &live.resources) {
        match (base.resources.get(&id), live.resources.get(&id)) {
            (None, Some(_)) => changes.push(Change::ResourceAdded { id }),
            (Some(_), None) => changes.push(Change::ResourceRemoved { id }),
            (Some(before), Some(after)) => {
                let mut fields = Vec::new();
                if before.name != after.name {
                    fields.push("name");
                }
                if before.amount != after.amount {
                    fields.push("amount");
                }
                if before.concurrency != after.concurrency {
                    fields.push("concurrency");
                }
                if !fields.is_empty() {
                    changes.push(Change::ResourceChanged { id, fields });
                }
            }
            (None, None) => {}
        }
    }

    for id in union_keys(&base.edges, &live.edges) {
        match (base.edges.get(&id), live.edges.get(&id)) {
            (None, Some(edge)) => changes.push(Change::EdgeAdded {
                id,
                from: edge.from,
                to: edge.to,
            }),
            (Some(edge), None) => changes.push(Change::EdgeRemoved {
                id,
                from: edge.from,
                to: edge.to,
            }),
            _ => {}
        }
    }

    changes
}

fn union_keys<K: Ord + Copy, V>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> BTreeSet<K> {
    a.keys().chain(b.keys()).copied().collect()
}

fn node_fields_changed(before: &NodeRecord, after: &NodeRecord) -> Vec<String> {
    let mut fields = Vec::new();
    if before.name != after.name {
        fields.push("name".to_string());
    }
    if before.start != after.start {
        fields.push("start".to_string());
    }
    if before.end != after.end {
        fields.push("end".to_string());
    }
    if before.critical != after.critical {
        fields.push("critical".to_string());
    }

    // Zero and absent consumption are the same thing
    let consumed = |record: &NodeRecord, id: &ResourceId| record.resources.get(id).copied().unwrap_or(0.0);
    for id in union_keys(&before.resources, &after.resources) {
        if consumed(before, &id) != consumed(after, &id) {
            fields.push(format!("resources.{id}"));
        }
    }
    fields
}

/// Where a started milestone stands relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    /// Ended before today
    Past,
    /// Today lies within its window
    Current,
    /// Starts after today
    Upcoming,
}

impl Progress {
    /// Classifies a milestone window. `None` if either date is missing.
    pub fn classify(today: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        let (start, end) = (start?, end?);
        Some(if today > end {
            Progress::Past
        } else if today < start {
            Progress::Upcoming
        } else {
            Progress::Current
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Progress::Past => "past",
            Progress::Current => "current",
            Progress::Upcoming => "upcoming",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn node(name: &str) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            ..NodeRecord::default()
        }
    }

    #[test]
    fn allocate_skips_live_and_baseline_ids() {
        let live = [NodeId::new(1), NodeId::new(3)];
        let historical = [NodeId::new(2), NodeId::new(4)];

        let id: NodeId = allocate_id(|c| live.contains(&c), |c| historical.contains(&c));
        assert_eq!(id, NodeId::new(5));

        let id: NodeId = allocate_id(|c| live.contains(&c), |_| false);
        assert_eq!(id, NodeId::new(2));
    }

    #[test]
    fn no_changes_against_identical_snapshot() {
        let mut snapshot = Snapshot::default();
        snapshot.nodes.insert(NodeId::new(1), node("Design"));
        let baseline = Baseline::freeze(snapshot.clone());

        assert!(changes(&baseline, &snapshot).is_empty());
    }

    #[test]
    fn reports_added_removed_and_changed() {
        let mut before = Snapshot::default();
        before.nodes.insert(NodeId::new(1), node("Design"));
        before.nodes.insert(NodeId::new(2), node("Build"));
        before
            .resources
            .insert(ResourceId::new(1), Resource::new("Crew", 10.0, 0));
        let baseline = Baseline::freeze(before.clone());

        let mut after = before;
        after.nodes.remove(&NodeId::new(2));
        after.nodes.insert(NodeId::new(3), node("Ship"));
        let design = after.nodes.get_mut(&NodeId::new(1)).unwrap();
        design.end = Some(d("2024-05-01"));
        design.resources.insert(ResourceId::new(1), 2.0);
        after.resources.get_mut(&ResourceId::new(1)).unwrap().amount = 12.0;
        after.end = Some(d("2024-06-01"));

        let found = changes(&baseline, &after);

        assert_eq!(
            found,
            vec![
                Change::ProjectDates { fields: vec!["end"] },
                Change::NodeChanged {
                    id: NodeId::new(1),
                    fields: vec!["end".to_string(), "resources.r1".to_string()],
                },
                Change::NodeRemoved { id: NodeId::new(2) },
                Change::NodeAdded { id: NodeId::new(3) },
                Change::ResourceChanged {
                    id: ResourceId::new(1),
                    fields: vec!["amount"],
                },
            ]
        );
    }

    #[test]
    fn zero_consumption_matches_absent() {
        let mut before = node("Design");
        before.resources.insert(ResourceId::new(1), 0.0);
        let after = node("Design");

        assert!(node_fields_changed(&before, &after).is_empty());
    }

    #[test]
    fn progress_classification() {
        let start = Some(d("2024-03-01"));
        let end = Some(d("2024-03-31"));

        assert_eq!(Progress::classify(d("2024-04-01"), start, end), Some(Progress::Past));
        assert_eq!(Progress::classify(d("2024-02-29"), start, end), Some(Progress::Upcoming));
        assert_eq!(Progress::classify(d("2024-03-01"), start, end), Some(Progress::Current));
        assert_eq!(Progress::classify(d("2024-03-31"), start, end), Some(Progress::Current));
        assert_eq!(Progress::classify(d("2024-03-15"), None, end), None);
    }

    #[test]
    fn change_display() {
        let change = Change::EdgeAdded {
            id: EdgeId::new(2),
            from: NodeId::new(1),
            to: NodeId::new(3),
        };
        assert_eq!(change.to_string(), "dependency e2 (n1 -> n3) added");
    }
}
