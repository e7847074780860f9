//! Shared plumbing for commands that work on one project

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::domain::{date, EdgeId, NodeId, Project, ResourceId};
use crate::storage::Workspace;

/// The workspace, the selected project's name and its loaded state
pub struct Session {
    pub workspace: Workspace,
    pub name: String,
    pub project: Project,
}

impl Session {
    /// Opens the project chosen by `--project`, the configured default or the
    /// most recently accessed one
    pub fn open(explicit: Option<&str>) -> Result<Self> {
        let workspace = Workspace::open_current()?;
        let name = workspace.resolve_project(explicit)?;
        let project = workspace
            .store()
            .open(&name)
            .with_context(|| format!("Failed to open project '{name}'"))?;

        Ok(Self {
            workspace,
            name,
            project,
        })
    }

    /// Writes the project back to the store
    pub fn save(&mut self) -> Result<()> {
        self.workspace.store().save(&self.name, &mut self.project)
    }
}

pub fn parse_node(s: &str) -> Result<NodeId> {
    s.parse()
        .with_context(|| format!("Invalid milestone ID '{s}'"))
}

pub fn parse_resource(s: &str) -> Result<ResourceId> {
    s.parse()
        .with_context(|| format!("Invalid resource ID '{s}'"))
}

pub fn parse_edge(s: &str) -> Result<EdgeId> {
    s.parse()
        .with_context(|| format!("Invalid dependency ID '{s}'"))
}

/// Parses a date argument. An empty string clears the date.
pub fn parse_date(s: &str) -> Result<Option<NaiveDate>> {
    date::parse_optional(s).with_context(|| format!("Invalid date '{s}' (expected YYYY-MM-DD)"))
}

/// Parses a date argument that must be present
pub fn parse_required_date(s: &str) -> Result<NaiveDate> {
    parse_date(s)?.ok_or_else(|| anyhow::anyhow!("A date is required"))
}
