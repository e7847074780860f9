//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::{parse_edge, parse_node, Session};

#[derive(Subcommand)]
pub enum EdgeCommands {
    /// Make one milestone depend on another
    ///
    /// Example:
    ///   pert edge add n1 n2     # n2 cannot start before n1 ends
    Add {
        /// Milestone that must happen first
        from: String,

        /// Milestone that depends on it
        to: String,
    },

    /// Remove a dependency
    Rm {
        /// Dependency ID
        id: String,
    },

    /// List dependencies
    List,
}

pub fn run(cmd: EdgeCommands, output: &Output, project: Option<&str>) -> Result<()> {
    match cmd {
        EdgeCommands::Add { from, to } => add_edge(output, project, &from, &to),
        EdgeCommands::Rm { id } => remove_edge(output, project, &id),
        EdgeCommands::List => list_edges(output, project),
    }
}

fn add_edge(output: &Output, project: Option<&str>, from: &str, to: &str) -> Result<()> {
    let from = parse_node(from)?;
    let to = parse_node(to)?;
    let mut session = Session::open(project)?;

    let id = session.project.connect(from, to)?;
    session.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "from": from, "to": to }));
    } else {
        output.success(&format!("Added dependency {}: {} -> {}", id, from, to));
    }
    Ok(())
}

fn remove_edge(output: &Output, project: Option<&str>, id: &str) -> Result<()> {
    let id = parse_edge(id)?;
    let mut session = Session::open(project)?;

    let edge = session.project.disconnect(id)?;
    session.save()?;

    output.success(&format!(
        "Removed dependency {}: {} -> {}",
        id, edge.from, edge.to
    ));
    Ok(())
}

fn list_edges(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let edges = session.project.edges();

    if output.is_json() {
        output.data(edges);
        return Ok(());
    }

    for (id, edge) in edges {
        output.row(&[&id.to_string(), &edge.from.to_string(), &edge.to.to_string()]);
    }
    Ok(())
}
