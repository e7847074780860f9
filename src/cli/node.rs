//! Milestone CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{amount_cell, date_cell, Output};
use super::session::{parse_date, parse_node, parse_resource, Session};
use crate::domain::{BoundsTarget, DateField, Neighbours};

#[derive(Subcommand)]
pub enum NodeCommands {
    /// Add a milestone
    ///
    /// Examples:
    ///   pert node add "Design"
    ///   pert node add "Build" --start 2024-02-01 --end 2024-03-15 --critical
    Add {
        /// Milestone name
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Mark the milestone as critical
        #[arg(long)]
        critical: bool,
    },

    /// Delete a milestone and its dependencies
    Rm {
        /// Milestone ID
        id: String,
    },

    /// Rename a milestone
    Rename {
        /// Milestone ID
        id: String,

        /// New name
        name: String,
    },

    /// Set or clear milestone dates (pass "" to clear)
    Dates {
        /// Milestone ID
        id: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Mark a milestone as critical
    Critical {
        /// Milestone ID
        id: String,

        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },

    /// Set how much of a resource a milestone consumes
    Use {
        /// Milestone ID
        id: String,

        /// Resource ID
        resource: String,

        /// Amount consumed (0 removes the entry)
        amount: f64,
    },

    /// List milestones
    List,

    /// Show milestone details
    Show {
        /// Milestone ID
        id: String,
    },
}

pub fn run(cmd: NodeCommands, output: &Output, project: Option<&str>) -> Result<()> {
    match cmd {
        NodeCommands::Add {
            name,
            start,
            end,
            critical,
        } => add_node(output, project, &name, start.as_deref(), end.as_deref(), critical),
        NodeCommands::Rm { id } => remove_node(output, project, &id),
        NodeCommands::Rename { id, name } => rename_node(output, project, &id, &name),
        NodeCommands::Dates { id, start, end } => {
            set_dates(output, project, &id, start.as_deref(), end.as_deref())
        }
        NodeCommands::Critical { id, off } => set_critical(output, project, &id, !off),
        NodeCommands::Use {
            id,
            resource,
            amount,
        } => use_resource(output, project, &id, &resource, amount),
        NodeCommands::List => list_nodes(output, project),
        NodeCommands::Show { id } => show_node(output, project, &id),
    }
}

fn add_node(
    output: &Output,
    project: Option<&str>,
    name: &str,
    start: Option<&str>,
    end: Option<&str>,
    critical: bool,
) -> Result<()> {
    let mut session = Session::open(project)?;

    // Parse everything before the first mutation
    let start = start.map(parse_date).transpose()?.flatten();
    let end = end.map(parse_date).transpose()?.flatten();

    let id = session.project.add_node(name)?;
    session.project.set_node_date(id, DateField::Start, start)?;
    session.project.set_node_date(id, DateField::End, end)?;
    session.project.set_critical(id, critical)?;
    session.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "name": session.project.node(id)?.name,
        }));
    } else {
        output.success(&format!("Added milestone: {} - {}", id, name.trim()));
    }
    Ok(())
}

fn remove_node(output: &Output, project: Option<&str>, id: &str) -> Result<()> {
    let id = parse_node(id)?;
    let mut session = Session::open(project)?;

    let edges = session.project.delete_node(id)?;
    session.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "removed_edges": edges }));
    } else {
        output.success(&format!(
            "Deleted milestone {} ({} dependencies removed)",
            id,
            edges.len()
        ));
    }
    Ok(())
}

fn rename_node(output: &Output, project: Option<&str>, id: &str, name: &str) -> Result<()> {
    let id = parse_node(id)?;
    let mut session = Session::open(project)?;

    session.project.rename_node(id, name)?;
    session.save()?;

    output.success(&format!("Renamed milestone {}", id));
    Ok(())
}

fn set_dates(
    output: &Output,
    project: Option<&str>,
    id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let id = parse_node(id)?;
    let start = start.map(parse_date).transpose()?;
    let end = end.map(parse_date).transpose()?;
    if start.is_none() && end.is_none() {
        anyhow::bail!("Nothing to change: pass --start and/or --end");
    }

    let mut session = Session::open(project)?;
    session.project.node(id)?;
    if let Some(start) = start {
        session.project.set_node_date(id, DateField::Start, start)?;
    }
    if let Some(end) = end {
        session.project.set_node_date(id, DateField::End, end)?;
    }
    session.save()?;

    let node = session.project.node(id)?;
    output.success(&format!(
        "Milestone {}: {} to {}",
        id,
        date_cell(node.start),
        date_cell(node.end)
    ));
    Ok(())
}

fn set_critical(output: &Output, project: Option<&str>, id: &str, critical: bool) -> Result<()> {
    let id = parse_node(id)?;
    let mut session = Session::open(project)?;

    session.project.set_critical(id, critical)?;
    session.save()?;

    let state = if critical { "critical" } else { "not critical" };
    output.success(&format!("Milestone {} is {}", id, state));
    Ok(())
}

fn use_resource(
    output: &Output,
    project: Option<&str>,
    id: &str,
    resource: &str,
    amount: f64,
) -> Result<()> {
    let id = parse_node(id)?;
    let resource = parse_resource(resource)?;
    let mut session = Session::open(project)?;

    let stored = session.project.set_node_resource(id, resource, amount)?;
    session.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "resource": resource, "amount": stored }));
    } else {
        output.success(&format!(
            "Milestone {} uses {} of {}",
            id,
            amount_cell(stored),
            resource
        ));
    }
    Ok(())
}

fn list_nodes(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let project = &session.project;
    let analysis = project.analyze();

    if output.is_json() {
        let items: Vec<_> = project
            .nodes()
            .iter()
            .map(|(id, node)| {
                serde_json::json!({
                    "id": id,
                    "name": node.name,
                    "start": node.start,
                    "end": node.end,
                    "critical": node.critical,
                    "level": analysis.levels.get(id),
                    "deficient": analysis.conflicts.is_deficient(*id),
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if project.nodes().is_empty() {
        output.success("No milestones yet");
        return Ok(());
    }

    for (id, node) in project.nodes() {
        let level = analysis.levels.get(id).copied().unwrap_or(1).to_string();
        let flags = match (node.critical, analysis.conflicts.is_deficient(*id)) {
            (true, true) => "critical,conflict",
            (true, false) => "critical",
            (false, true) => "conflict",
            (false, false) => "",
        };
        output.row(&[
            &id.to_string(),
            &node.name,
            &date_cell(node.start),
            &date_cell(node.end),
            &format!("L{}", level),
            flags,
        ]);
    }
    Ok(())
}

fn show_node(output: &Output, project: Option<&str>, id: &str) -> Result<()> {
    let id = parse_node(id)?;
    let session = Session::open(project)?;
    let project = &session.project;

    let node = project.node(id)?;
    let bounds = project.bounds(BoundsTarget::Node(id))?;
    let level = project.level(id)?;
    let predecessors = project.neighbours(id, Neighbours::Back, false)?;
    let successors = project.neighbours(id, Neighbours::Forward, false)?;
    let consumption = project.consumption(id);
    let conflicts = project.conflict_flags(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "name": node.name,
            "start": node.start,
            "end": node.end,
            "critical": node.critical,
            "level": level,
            "bounds": bounds,
            "predecessors": predecessors,
            "successors": successors,
            "resources": consumption,
            "conflicts": conflicts,
        }));
        return Ok(());
    }

    let join = |ids: &[crate::domain::NodeId]| {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        }
    };

    println!("Milestone:    {} - {}", id, node.name);
    println!(
        "Start:        {} (allowed {} .. {})",
        date_cell(node.start),
        date_cell(bounds.start.min),
        date_cell(bounds.start.max)
    );
    println!(
        "End:          {} (allowed {} .. {})",
        date_cell(node.end),
        date_cell(bounds.end.min),
        date_cell(bounds.end.max)
    );
    println!("Critical:     {}", if node.critical { "yes" } else { "no" });
    println!("Level:        {}", level);
    println!("Depends on:   {}", join(&predecessors));
    println!("Required by:  {}", join(&successors));

    if !consumption.is_empty() {
        println!();
        println!("Resources:");
        for (resource, amount) in &consumption {
            let name = project
                .resource(*resource)
                .map(|r| r.name.as_str())
                .unwrap_or_default();
            let message = conflicts
                .get(resource)
                .and_then(|flags| flags.message())
                .unwrap_or("");
            println!("  {}\t{}\t{}\t{}", resource, name, amount_cell(*amount), message);
        }
    }
    Ok(())
}
