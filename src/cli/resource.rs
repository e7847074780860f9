//! Resource CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{amount_cell, Output};
use super::session::{parse_resource, Session};

#[derive(Subcommand)]
pub enum ResourceCommands {
    /// Add a shared resource
    ///
    /// Examples:
    ///   pert resource add "Crew" --amount 10
    ///   pert resource add "Test rig" --concurrency 1
    Add {
        /// Resource name
        name: String,

        /// Total capacity (0 = unlimited)
        #[arg(long, default_value = "0")]
        amount: f64,

        /// Milestones that may use it at once (0 = unlimited)
        #[arg(long, default_value = "0")]
        concurrency: u32,
    },

    /// Remove a resource from the project and every milestone
    Rm {
        /// Resource ID
        id: String,
    },

    /// Rename a resource
    Rename {
        /// Resource ID
        id: String,

        /// New name
        name: String,
    },

    /// Change a resource's capacity or concurrency limit
    Set {
        /// Resource ID
        id: String,

        /// Total capacity (0 = unlimited)
        #[arg(long)]
        amount: Option<f64>,

        /// Milestones that may use it at once (0 = unlimited)
        #[arg(long)]
        concurrency: Option<u32>,
    },

    /// List resources
    List,
}

pub fn run(cmd: ResourceCommands, output: &Output, project: Option<&str>) -> Result<()> {
    match cmd {
        ResourceCommands::Add {
            name,
            amount,
            concurrency,
        } => add_resource(output, project, &name, amount, concurrency),
        ResourceCommands::Rm { id } => remove_resource(output, project, &id),
        ResourceCommands::Rename { id, name } => rename_resource(output, project, &id, &name),
        ResourceCommands::Set {
            id,
            amount,
            concurrency,
        } => set_resource(output, project, &id, amount, concurrency),
        ResourceCommands::List => list_resources(output, project),
    }
}

fn add_resource(
    output: &Output,
    project: Option<&str>,
    name: &str,
    amount: f64,
    concurrency: u32,
) -> Result<()> {
    let mut session = Session::open(project)?;

    let id = session.project.add_resource(name, amount, concurrency)?;
    session.save()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "resource": session.project.resource(id)?,
        }));
    } else {
        output.success(&format!("Added resource: {} - {}", id, name.trim()));
    }
    Ok(())
}

fn remove_resource(output: &Output, project: Option<&str>, id: &str) -> Result<()> {
    let id = parse_resource(id)?;
    let mut session = Session::open(project)?;

    let removed = session.project.remove_resource(id)?;
    session.save()?;

    output.success(&format!("Removed resource {} ({})", id, removed.name));
    Ok(())
}

fn rename_resource(output: &Output, project: Option<&str>, id: &str, name: &str) -> Result<()> {
    let id = parse_resource(id)?;
    let mut session = Session::open(project)?;

    session.project.rename_resource(id, name)?;
    session.save()?;

    output.success(&format!("Renamed resource {}", id));
    Ok(())
}

fn set_resource(
    output: &Output,
    project: Option<&str>,
    id: &str,
    amount: Option<f64>,
    concurrency: Option<u32>,
) -> Result<()> {
    let id = parse_resource(id)?;
    if amount.is_none() && concurrency.is_none() {
        anyhow::bail!("Nothing to change: pass --amount and/or --concurrency");
    }

    let mut session = Session::open(project)?;
    session.project.resource(id)?;
    if let Some(amount) = amount {
        session.project.set_resource_amount(id, amount)?;
    }
    if let Some(concurrency) = concurrency {
        session.project.set_resource_concurrency(id, concurrency)?;
    }
    session.save()?;

    let resource = session.project.resource(id)?;
    output.success(&format!(
        "Resource {}: amount {}, concurrency {}",
        id,
        amount_cell(resource.amount),
        resource.concurrency
    ));
    Ok(())
}

fn list_resources(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let resources = session.project.resources();

    if output.is_json() {
        output.data(resources);
        return Ok(());
    }

    if resources.is_empty() {
        output.success("No resources yet");
        return Ok(());
    }

    let total = session.project.total_cost();
    for (id, resource) in resources {
        let used = total.get(id).copied().unwrap_or(0.0);
        output.row(&[
            &id.to_string(),
            &resource.name,
            &format!("{}/{}", amount_cell(used), amount_cell(resource.amount)),
            &format!("x{}", resource.concurrency),
        ]);
    }
    Ok(())
}
