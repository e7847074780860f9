//! pert - a local-first milestone planner
//!
//! A project is a dependency graph of milestones. Each milestone carries an
//! optional date window and consumes shared resources; the engine derives the
//! window every date may legally take, levels the graph, and flags milestones
//! that overdraw a resource's capacity or concurrency limit. Starting a
//! project freezes a baseline that later edits are compared against.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Analysis, NodeId, PlanError, Project, ResourceId};
