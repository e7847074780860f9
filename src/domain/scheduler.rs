//! Resource conflict detection
//!
//! Two independent checks run per resource:
//!
//! 1. **Capacity**: consuming milestones are walked in date order, each one
//!    drawing from the resource's capacity. Every milestone reached once the
//!    balance is negative is flagged. A resource with no capacity but a slot
//!    limit still gets this walk, so each of its consumers is flagged.
//! 2. **Concurrency slots**: a sweep over start/end events holding a free
//!    slot counter. A start event that finds no free slot flags its milestone.
//!
//! The checks order milestones differently and may blame different ones; both
//! are reported separately.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::bounds::Bounds;
use super::id::{NodeId, ResourceId};
use super::ledger::ResourceLedger;
use super::milestone::Milestone;

/// Conflicts found for one (milestone, resource) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictFlags {
    /// The resource's capacity ran out before this milestone
    pub insufficient_resources: bool,
    /// No concurrency slot was free when this milestone started
    pub insufficient_concurrency: bool,
}

impl ConflictFlags {
    pub fn any(&self) -> bool {
        self.insufficient_resources || self.insufficient_concurrency
    }

    /// Human-readable reason, combining both checks when both fired
    pub fn message(&self) -> Option<&'static str> {
        match (self.insufficient_resources, self.insufficient_concurrency) {
            (true, true) => Some("Insufficient resources and concurrency"),
            (true, false) => Some("Insufficient resources"),
            (false, true) => Some("Insufficient concurrency"),
            (false, false) => None,
        }
    }
}

/// All flags of one scheduling run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    flags: BTreeMap<NodeId, BTreeMap<ResourceId, ConflictFlags>>,
}

impl ConflictReport {
    /// Flags of a milestone, per resource. Empty if it has no conflicts.
    pub fn for_node(&self, node: NodeId) -> BTreeMap<ResourceId, ConflictFlags> {
        self.flags.get(&node).cloned().unwrap_or_default()
    }

    /// Flags of a single pair
    pub fn get(&self, node: NodeId, resource: ResourceId) -> ConflictFlags {
        self.flags
            .get(&node)
            .and_then(|per_resource| per_resource.get(&resource))
            .copied()
            .unwrap_or_default()
    }

    /// Returns true if the milestone carries at least one flag
    pub fn is_deficient(&self, node: NodeId) -> bool {
        self.flags
            .get(&node)
            .is_some_and(|per_resource| per_resource.values().any(ConflictFlags::any))
    }

    /// Deficient milestones, ordered by ID
    pub fn deficient_nodes(&self) -> Vec<NodeId> {
        self.flags
            .keys()
            .copied()
            .filter(|node| self.is_deficient(*node))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn entry(&mut self, node: NodeId, resource: ResourceId) -> &mut ConflictFlags {
        self.flags.entry(node).or_default().entry(resource).or_default()
    }
}

/// The dates the scheduler uses for a milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: NaiveDate,
    end: NaiveDate,
}

/// Set dates first, then propagated bounds, then open-ended sentinels.
///
/// Intervals are half-open: a milestone ending on the day another starts does
/// not overlap it. An end before the start collapses to an empty interval.
fn effective_interval(milestone: &Milestone, bounds: &Bounds, node: NodeId) -> Interval {
    let window = bounds.node(node);
    let start = milestone
        .start
        .or(window.start.min)
        .unwrap_or(NaiveDate::MIN);
    let end = milestone.end.or(window.end.max).unwrap_or(NaiveDate::MAX);
    Interval {
        start,
        end: end.max(start),
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotEvent {
    node: NodeId,
    time: NaiveDate,
    is_start: bool,
    critical: bool,
    level: u32,
}

/// Sweep order: time, then ends before starts, then critical starts first,
/// then lower level, then node ID.
fn event_order(a: &SlotEvent, b: &SlotEvent) -> Ordering {
    a.time
        .cmp(&b.time)
        .then_with(|| a.is_start.cmp(&b.is_start))
        .then_with(|| {
            if a.is_start && b.is_start {
                b.critical.cmp(&a.critical)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.level.cmp(&b.level))
        .then_with(|| a.node.cmp(&b.node))
}

/// Runs both checks for every resource
pub fn detect_conflicts(
    nodes: &BTreeMap<NodeId, Milestone>,
    ledger: &ResourceLedger,
    bounds: &Bounds,
    levels: &BTreeMap<NodeId, u32>,
) -> ConflictReport {
    let mut report = ConflictReport::default();

    for (resource_id, resource) in ledger.resources() {
        if !resource.has_capacity() && !resource.has_slot_limit() {
            continue;
        }

        let consumers: Vec<(NodeId, f64, Interval, &Milestone)> = ledger
            .consumers(*resource_id)
            .filter_map(|(node, amount)| {
                let milestone = nodes.get(&node)?;
                Some((node, amount, effective_interval(milestone, bounds, node), milestone))
            })
            .collect();

        // Capacity walk
        let mut ordered: Vec<_> = consumers.iter().collect();
        ordered.sort_by(|a, b| {
            a.2.start
                .cmp(&b.2.start)
                .then_with(|| a.2.end.cmp(&b.2.end))
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut balance = resource.amount;
        for (node, amount, _, _) in ordered {
            balance -= amount;
            if balance < 0.0 {
                report.entry(*node, *resource_id).insufficient_resources = true;
            }
        }

        if resource.has_slot_limit() {
            let mut events: Vec<SlotEvent> = Vec::with_capacity(consumers.len() * 2);
            for (node, _, interval, milestone) in &consumers {
                let level = levels.get(node).copied().unwrap_or(1);
                for (time, is_start) in [(interval.start, true), (interval.end, false)] {
                    events.push(SlotEvent {
                        node: *node,
                        time,
                        is_start,
                        critical: milestone.critical,
                        level,
                    });
                }
            }
            events.sort_by(event_order);

            let mut free = i64::from(resource.concurrency);
            for event in events {
                if event.is_start {
                    free -= 1;
                    if free < 0 {
                        report.entry(event.node, *resource_id).insufficient_concurrency = true;
                    }
                } else {
                    free += 1;
                }
            }
        }
    }

    report
}
