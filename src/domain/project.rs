//! The project handle
//!
//! [`Project`] owns every engine component and is the only way to change
//! project state. Commands are all-or-nothing: anything that fails validation
//! returns an error before touching a single structure. Derived state (bounds,
//! levels, conflicts) is never stored; [`Project::analyze`] recomputes it from
//! scratch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::baseline::{self, allocate_id, Baseline, Change, Progress};
use super::bounds::{propagate, Bounds, BoundsTarget, NodeBounds};
use super::date::DateRange;
use super::graph::{GraphError, GraphStore, Neighbours};
use super::id::{EdgeId, NodeId, ResourceId};
use super::ledger::{add_cost, Cost, ResourceLedger};
use super::milestone::{clamp_amount, DateField, Edge, Milestone, Resource};
use super::record::{NodeRecord, ProjectRecord, Snapshot, Stats};
use super::scheduler::{detect_conflicts, ConflictFlags, ConflictReport};

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Dates missing for: {}", missing.join(", "))]
    IncompleteDates { missing: Vec<String> },

    #[error("Project has already been started")]
    AlreadyStarted,

    #[error("Milestone not found: {0}")]
    UnknownNode(NodeId),

    #[error("Resource not found: {0}")]
    UnknownResource(ResourceId),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid project record: {0}")]
    InvalidRecord(String),
}

/// Derived state of one recomputation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
    pub bounds: Bounds,
    pub levels: BTreeMap<NodeId, u32>,
    pub conflicts: ConflictReport,
}

/// A set date lying outside the range the graph allows for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateViolation {
    /// The milestone, or `None` for the project's own dates
    pub node: Option<NodeId>,
    pub field: DateField,
    pub date: NaiveDate,
    pub allowed: DateRange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ProjectRecord", into = "ProjectRecord")]
pub struct Project {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    nodes: BTreeMap<NodeId, Milestone>,
    graph: GraphStore,
    ledger: ResourceLedger,
    stats: Stats,
    baseline: Option<Baseline>,
}

fn valid_name(name: &str) -> Result<String, PlanError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PlanError::EmptyName);
    }
    Ok(trimmed.to_string())
}

impl Project {
    /// Creates an empty draft project stamped with the current time
    pub fn new() -> Self {
        Self {
            stats: Stats::created_now(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Milestone> {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&Milestone, PlanError> {
        self.nodes.get(&id).ok_or(PlanError::UnknownNode(id))
    }

    pub fn resources(&self) -> &BTreeMap<ResourceId, Resource> {
        self.ledger.resources()
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Resource, PlanError> {
        self.ledger
            .resource(id)
            .ok_or(PlanError::UnknownResource(id))
    }

    pub fn edges(&self) -> &BTreeMap<EdgeId, Edge> {
        self.graph.edges()
    }

    /// Positive consumption entries of a milestone
    pub fn consumption(&self, id: NodeId) -> BTreeMap<ResourceId, f64> {
        self.ledger.consumption_map(id)
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.baseline.is_some()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Adds an undated milestone and returns its new ID
    pub fn add_node(&mut self, name: &str) -> Result<NodeId, PlanError> {
        let name = valid_name(name)?;
        let id = allocate_id(
            |candidate| self.nodes.contains_key(&candidate),
            |candidate| self.baseline.as_ref().is_some_and(|b| b.has_node(candidate)),
        );

        self.graph.add_node(id);
        self.nodes.insert(id, Milestone::new(name));
        debug!(node = %id, "added milestone");
        Ok(id)
    }

    /// Deletes a milestone, its edges and its consumption
    pub fn delete_node(&mut self, id: NodeId) -> Result<Vec<EdgeId>, PlanError> {
        self.node(id)?;
        let removed = self.graph.remove_node(id)?;
        self.nodes.remove(&id);
        self.ledger.forget_node(id);
        debug!(node = %id, edges = removed.len(), "deleted milestone");
        Ok(removed)
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<(), PlanError> {
        let name = valid_name(name)?;
        let node = self.nodes.get_mut(&id).ok_or(PlanError::UnknownNode(id))?;
        node.name = name;
        debug!(node = %id, "renamed milestone");
        Ok(())
    }

    /// Adds the dependency `from -> to`, failing if it would close a cycle
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, PlanError> {
        self.node(from)?;
        self.node(to)?;

        let id = allocate_id(
            |candidate| self.graph.edge(candidate).is_some(),
            |candidate| self.baseline.as_ref().is_some_and(|b| b.has_edge(candidate)),
        );
        self.graph.connect(id, from, to)?;
        debug!(edge = %id, %from, %to, "connected milestones");
        Ok(id)
    }

    pub fn disconnect(&mut self, id: EdgeId) -> Result<Edge, PlanError> {
        let edge = self.graph.disconnect(id)?;
        debug!(edge = %id, "disconnected milestones");
        Ok(edge)
    }

    /// Sets or clears one of a milestone's dates. Never rejected by bounds.
    pub fn set_node_date(
        &mut self,
        id: NodeId,
        field: DateField,
        date: Option<NaiveDate>,
    ) -> Result<(), PlanError> {
        let node = self.nodes.get_mut(&id).ok_or(PlanError::UnknownNode(id))?;
        node.set_date(field, date);
        debug!(node = %id, field = field.as_str(), ?date, "set milestone date");
        Ok(())
    }

    pub fn set_critical(&mut self, id: NodeId, critical: bool) -> Result<(), PlanError> {
        let node = self.nodes.get_mut(&id).ok_or(PlanError::UnknownNode(id))?;
        node.critical = critical;
        debug!(node = %id, critical, "set critical flag");
        Ok(())
    }

    /// Sets how much of a resource a milestone consumes. Returns the clamped
    /// amount actually stored.
    pub fn set_node_resource(
        &mut self,
        id: NodeId,
        resource: ResourceId,
        amount: f64,
    ) -> Result<f64, PlanError> {
        self.node(id)?;
        let stored = self
            .ledger
            .set_consumption(id, resource, amount)
            .ok_or(PlanError::UnknownResource(resource))?;
        debug!(node = %id, %resource, amount = stored, "set consumption");
        Ok(stored)
    }

    pub fn set_project_date(&mut self, field: DateField, date: Option<NaiveDate>) {
        match field {
            DateField::Start => self.start = date,
            DateField::End => self.end = date,
        }
        debug!(field = field.as_str(), ?date, "set project date");
    }

    /// Adds a resource and returns its new ID
    pub fn add_resource(
        &mut self,
        name: &str,
        amount: f64,
        concurrency: u32,
    ) -> Result<ResourceId, PlanError> {
        let name = valid_name(name)?;
        let id = allocate_id(
            |candidate| self.ledger.contains_resource(candidate),
            |candidate| self.baseline.as_ref().is_some_and(|b| b.has_resource(candidate)),
        );

        self.ledger
            .insert_resource(id, Resource::new(name, amount, concurrency));
        debug!(resource = %id, "added resource");
        Ok(id)
    }

    /// Removes a resource and prunes it from every milestone
    pub fn remove_resource(&mut self, id: ResourceId) -> Result<Resource, PlanError> {
        let removed = self
            .ledger
            .remove_resource(id)
            .ok_or(PlanError::UnknownResource(id))?;
        debug!(resource = %id, "removed resource");
        Ok(removed)
    }

    pub fn rename_resource(&mut self, id: ResourceId, name: &str) -> Result<(), PlanError> {
        let name = valid_name(name)?;
        self.resource_mut(id)?.name = name;
        debug!(resource = %id, "renamed resource");
        Ok(())
    }

    /// Sets a resource's capacity, clamped to >= 0
    pub fn set_resource_amount(&mut self, id: ResourceId, amount: f64) -> Result<f64, PlanError> {
        let amount = clamp_amount(amount);
        self.resource_mut(id)?.amount = amount;
        debug!(resource = %id, amount, "set resource amount");
        Ok(amount)
    }

    /// Sets a resource's concurrency slot limit (0 = unlimited)
    pub fn set_resource_concurrency(
        &mut self,
        id: ResourceId,
        concurrency: u32,
    ) -> Result<(), PlanError> {
        self.resource_mut(id)?.concurrency = concurrency;
        debug!(resource = %id, concurrency, "set resource concurrency");
        Ok(())
    }

    fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource, PlanError> {
        self.ledger
            .resource_mut(id)
            .ok_or(PlanError::UnknownResource(id))
    }

    /// Freezes the current state as the baseline.
    ///
    /// Requires the project and every milestone to have both dates. A project
    /// can only be started once.
    pub fn start_project(&mut self) -> Result<(), PlanError> {
        if self.is_started() {
            return Err(PlanError::AlreadyStarted);
        }
        let missing = self.missing_dates();
        if !missing.is_empty() {
            return Err(PlanError::IncompleteDates { missing });
        }

        self.baseline = Some(Baseline::freeze(self.snapshot()));
        info!(nodes = self.nodes.len(), "project started");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Date bounds of the project or of one milestone
    pub fn bounds(&self, target: BoundsTarget) -> Result<NodeBounds, PlanError> {
        let bounds = self.propagate();
        match target {
            BoundsTarget::Project => Ok(bounds.project),
            BoundsTarget::Node(id) => {
                self.node(id)?;
                Ok(bounds.node(id))
            }
        }
    }

    pub fn neighbours(
        &self,
        id: NodeId,
        direction: Neighbours,
        recursive: bool,
    ) -> Result<Vec<NodeId>, PlanError> {
        Ok(self.graph.neighbours(id, direction, recursive)?)
    }

    /// 1 for a source, else one more than the deepest predecessor
    pub fn level(&self, id: NodeId) -> Result<u32, PlanError> {
        Ok(self.graph.level(id)?)
    }

    /// A milestone's own consumption, or with `recursive` the consumption of
    /// it and everything it depends on, each milestone counted once
    pub fn cost(&self, id: NodeId, recursive: bool) -> Result<Cost, PlanError> {
        self.node(id)?;
        let mut cost = self.ledger.cost(id);
        if recursive {
            let upstream = self.graph.neighbours(id, Neighbours::Back, true)?;
            add_cost(&mut cost, &self.ledger.cost_of(&upstream));
        }
        Ok(cost)
    }

    /// Consumption of every milestone starting on or before `date`.
    ///
    /// A milestone starts at its set start, else its set end, else its
    /// earliest allowed start. Milestones with none of these are left out.
    pub fn cost_until(&self, date: NaiveDate) -> Cost {
        let bounds = self.propagate();
        let starting: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, node)| {
                node.start
                    .or(node.end)
                    .or(bounds.node(**id).start.min)
                    .is_some_and(|start| start <= date)
            })
            .map(|(id, _)| *id)
            .collect();
        self.ledger.cost_of(&starting)
    }

    /// Consumption of the whole project
    pub fn total_cost(&self) -> Cost {
        self.ledger.cost_of(self.nodes.keys())
    }

    /// Conflict flags of one milestone, per resource
    pub fn conflict_flags(
        &self,
        id: NodeId,
    ) -> Result<BTreeMap<ResourceId, ConflictFlags>, PlanError> {
        self.node(id)?;
        Ok(self.analyze().conflicts.for_node(id))
    }

    /// Recomputes bounds, levels and conflicts
    pub fn analyze(&self) -> Analysis {
        let bounds = self.propagate();
        let levels = self.graph.levels();
        let conflicts = detect_conflicts(&self.nodes, &self.ledger, &bounds, &levels);
        Analysis {
            bounds,
            levels,
            conflicts,
        }
    }

    /// Requirement changes since the project started. Empty for drafts.
    pub fn changes(&self) -> Vec<Change> {
        self.baseline
            .as_ref()
            .map(|baseline| baseline::changes(baseline, &self.snapshot()))
            .unwrap_or_default()
    }

    /// Date advancement of each fully dated milestone. Empty for drafts.
    pub fn progress(&self, today: NaiveDate) -> BTreeMap<NodeId, Progress> {
        if !self.is_started() {
            return BTreeMap::new();
        }
        self.nodes
            .iter()
            .filter_map(|(id, node)| Some((*id, Progress::classify(today, node.start, node.end)?)))
            .collect()
    }

    /// Set dates that fall outside their computed bounds
    pub fn date_violations(&self) -> Vec<DateViolation> {
        let bounds = self.propagate();
        let mut violations = Vec::new();

        let mut check = |node: Option<NodeId>,
                         window: NodeBounds,
                         start: Option<NaiveDate>,
                         end: Option<NaiveDate>| {
            for (field, date, allowed) in [
                (DateField::Start, start, window.start),
                (DateField::End, end, window.end),
            ] {
                if let Some(date) = date {
                    if !allowed.contains(date) {
                        violations.push(DateViolation {
                            node,
                            field,
                            date,
                            allowed,
                        });
                    }
                }
            }
        };

        check(None, bounds.project, self.start, self.end);
        for (id, node) in &self.nodes {
            check(Some(*id), bounds.node(*id), node.start, node.end);
        }
        violations
    }

    /// IDs lacking a date, with `project` standing for the project itself
    pub fn missing_dates(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.start.is_none() || self.end.is_none() {
            missing.push("project".to_string());
        }
        missing.extend(
            self.nodes
                .iter()
                .filter(|(_, node)| !node.has_dates())
                .map(|(id, _)| id.to_string()),
        );
        missing
    }

    pub fn has_all_dates(&self) -> bool {
        self.missing_dates().is_empty()
    }

    /// A started project may only be saved while fully dated
    pub fn check_saveable(&self) -> Result<(), PlanError> {
        if self.is_started() {
            let missing = self.missing_dates();
            if !missing.is_empty() {
                return Err(PlanError::IncompleteDates { missing });
            }
        }
        Ok(())
    }

    fn propagate(&self) -> Bounds {
        propagate(&self.graph, &self.nodes, self.start, self.end)
    }

    // ========================================================================
    // Record conversion
    // ========================================================================

    /// The current resources, milestones, edges and dates
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            resources: self.ledger.resources().clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| (*id, NodeRecord::from_parts(node, self.ledger.consumption_map(*id))))
                .collect(),
            edges: self.graph.edges().clone(),
            start: self.start,
            end: self.end,
        }
    }

    pub fn to_record(&self) -> ProjectRecord {
        let snapshot = self.snapshot();
        ProjectRecord {
            start: snapshot.start,
            end: snapshot.end,
            resources: snapshot.resources,
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            stats: self.stats,
            original: self.baseline.as_ref().map(|b| b.snapshot().clone()),
        }
    }
}

impl TryFrom<ProjectRecord> for Project {
    type Error = PlanError;

    fn try_from(record: ProjectRecord) -> Result<Self, Self::Error> {
        let mut project = Project {
            start: record.start,
            end: record.end,
            stats: record.stats,
            baseline: record.original.map(Baseline::freeze),
            ..Project::default()
        };

        for (id, resource) in record.resources {
            project.ledger.insert_resource(id, resource);
        }

        for (id, node) in &record.nodes {
            project.graph.add_node(*id);
            project.nodes.insert(*id, node.milestone());
            for (resource, amount) in &node.resources {
                if project.ledger.set_consumption(*id, *resource, *amount).is_none() {
                    warn!(node = %id, %resource, "dropping consumption of unknown resource");
                }
            }
        }

        for (id, edge) in record.edges {
            project
                .graph
                .connect(id, edge.from, edge.to)
                .map_err(|e| PlanError::InvalidRecord(format!("edge {id}: {e}")))?;
        }

        Ok(project)
    }
}

impl From<Project> for ProjectRecord {
    fn from(project: Project) -> Self {
        project.to_record()
    }
}
