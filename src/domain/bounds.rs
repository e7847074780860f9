//! Date-bound propagation
//!
//! Derives, for every milestone and for the project, the tightest window each
//! start and end date may take given the graph and the dates already entered.
//! Bounds only inform validation and display; they never reject input.
//!
//! Two passes over the topological order:
//!
//! - **Forward**: a node's start may not precede the project start nor the
//!   effective end of any predecessor. Its end may not precede its own start
//!   (set, else the start bound). The limit handed on is its set end, else
//!   that end bound.
//! - **Backward**: the mirror image, propagating latest-allowed dates upstream
//!   from the project end.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::date::{earlier, later, DateRange};
use super::graph::{GraphStore, Neighbours};
use super::id::NodeId;
use super::milestone::Milestone;

/// Start and end windows of one milestone (or of the project)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeBounds {
    pub start: DateRange,
    pub end: DateRange,
}

/// The result of one propagation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub project: NodeBounds,
    pub nodes: BTreeMap<NodeId, NodeBounds>,
}

impl Bounds {
    /// Bounds of a milestone, open if the node is unknown
    pub fn node(&self, id: NodeId) -> NodeBounds {
        self.nodes.get(&id).copied().unwrap_or_default()
    }
}

/// Target of a bounds query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsTarget {
    Project,
    Node(NodeId),
}

/// Runs both passes. Pure: identical inputs give identical output.
pub fn propagate(
    graph: &GraphStore,
    nodes: &BTreeMap<NodeId, Milestone>,
    project_start: Option<NaiveDate>,
    project_end: Option<NaiveDate>,
) -> Bounds {
    let order = graph.topological_order();
    let mut bounds: BTreeMap<NodeId, NodeBounds> =
        order.iter().map(|id| (*id, NodeBounds::default())).collect();

    let milestone = |id: &NodeId| nodes.get(id).cloned().unwrap_or_default();
    let predecessors = |id: NodeId| graph.neighbours(id, Neighbours::Back, false).unwrap_or_default();
    let successors = |id: NodeId| graph.neighbours(id, Neighbours::Forward, false).unwrap_or_default();

    // Forward pass: earliest dates flow downstream.
    let mut handed_down: HashMap<NodeId, Option<NaiveDate>> = HashMap::new();
    for id in &order {
        let node = milestone(id);
        let inherited = predecessors(*id)
            .iter()
            .filter_map(|prev| handed_down.get(prev).copied())
            .fold(project_start, later);

        let entry = bounds.entry(*id).or_default();
        entry.start.min = inherited;
        entry.end.min = node.start.or(inherited);
        handed_down.insert(*id, node.end.or(entry.end.min));
    }

    // Backward pass: latest dates flow upstream.
    let mut handed_up: HashMap<NodeId, Option<NaiveDate>> = HashMap::new();
    for id in order.iter().rev() {
        let node = milestone(id);
        let inherited = successors(*id)
            .iter()
            .filter_map(|next| handed_up.get(next).copied())
            .fold(project_end, earlier);

        let entry = bounds.entry(*id).or_default();
        entry.end.max = inherited;
        entry.start.max = node.end.or(inherited);
        handed_up.insert(*id, node.start.or(entry.start.max));
    }

    // The project may not start after its earliest source nor end before its
    // latest sink.
    let project_start_max = graph
        .sources()
        .iter()
        .filter_map(|id| {
            let node = milestone(id);
            node.start
                .or(node.end)
                .or_else(|| bounds.get(id).and_then(|b| b.end.max))
        })
        .min();

    let project_end_min = graph
        .sinks()
        .iter()
        .filter_map(|id| {
            let node = milestone(id);
            node.end
                .or(node.start)
                .or_else(|| bounds.get(id).and_then(|b| b.start.min))
        })
        .max();

    Bounds {
        project: NodeBounds {
            start: DateRange {
                min: None,
                max: project_start_max,
            },
            end: DateRange {
                min: project_end_min,
                max: None,
            },
        },
        nodes: bounds,
    }
}
