//! Domain models for the PERT planner
//!
//! Contains the dependency graph and the constraint/scheduling engine without
//! any I/O concerns.

mod baseline;
mod bounds;
pub mod date;
mod graph;
mod id;
mod ledger;
mod milestone;
mod project;
mod record;
mod scheduler;

pub use baseline::{Baseline, Change, Progress};
pub use bounds::{Bounds, BoundsTarget, NodeBounds};
pub use date::DateRange;
pub use graph::{GraphError, GraphStore, Neighbours};
pub use id::{EdgeId, IdError, NodeId, ResourceId, SeqId};
pub use ledger::{Cost, ResourceLedger};
pub use milestone::{DateField, Edge, Milestone, Resource};
pub use project::{Analysis, DateViolation, PlanError, Project};
pub use record::{NodeRecord, ProjectRecord, Snapshot, Stats};
pub use scheduler::{ConflictFlags, ConflictReport};
