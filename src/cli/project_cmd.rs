//! Project CLI commands

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;

use super::output::{date_cell, Output};
use super::session::{parse_date, Session};
use crate::domain::DateField;
use crate::storage::Workspace;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create an empty project
    New {
        /// Project name
        name: String,
    },

    /// List projects, most recently used first
    List,

    /// Make a project the workspace default
    Use {
        /// Project name
        name: String,
    },

    /// Rename a project
    Rename {
        /// Current name
        from: String,

        /// New name
        to: String,
    },

    /// Delete a project
    Delete {
        /// Project name
        name: String,
    },

    /// Write the project to `<name>.pert`
    Export {
        /// Target directory (defaults to the configured export directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show project details
    Show,

    /// Set or clear the project dates (pass "" to clear)
    Dates {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Freeze the current plan as the baseline
    Start,

    /// List requirement changes since the project started
    Changes,

    /// Show which milestones are past, current or upcoming
    Progress {
        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<String>,
    },
}

pub fn run(cmd: ProjectCommands, output: &Output, project: Option<&str>) -> Result<()> {
    match cmd {
        ProjectCommands::New { name } => new_project(output, &name),
        ProjectCommands::List => list_projects(output),
        ProjectCommands::Use { name } => use_project(output, &name),
        ProjectCommands::Rename { from, to } => rename_project(output, &from, &to),
        ProjectCommands::Delete { name } => delete_project(output, &name),
        ProjectCommands::Export { dir } => export_project(output, project, dir),
        ProjectCommands::Show => show_project(output, project),
        ProjectCommands::Dates { start, end } => {
            set_dates(output, project, start.as_deref(), end.as_deref())
        }
        ProjectCommands::Start => start_project(output, project),
        ProjectCommands::Changes => list_changes(output, project),
        ProjectCommands::Progress { today } => show_progress(output, project, today.as_deref()),
    }
}

fn new_project(output: &Output, name: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    workspace.store().create(name)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "name": name }));
    } else {
        output.success(&format!("Created project: {}", name));
    }
    Ok(())
}

fn list_projects(output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let entries = workspace.store().list()?;

    if output.is_json() {
        output.data(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        output.success("No projects yet");
        return Ok(());
    }

    let default = workspace.config().workspace.default_project.as_deref();
    for entry in &entries {
        let marker = if Some(entry.name.as_str()) == default { "*" } else { " " };
        let state = if entry.started { "started" } else { "draft" };
        let accessed = entry
            .accessed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        output.row(&[marker, &entry.name, state, &accessed]);
    }
    Ok(())
}

fn use_project(output: &Output, name: &str) -> Result<()> {
    let mut workspace = Workspace::open_current()?;
    if !workspace.store().exists(name) {
        anyhow::bail!("Project not found: {}", name);
    }

    workspace.config_mut().workspace.default_project = Some(name.to_string());
    workspace.config().save_workspace()?;

    output.success(&format!("Using project: {}", name));
    Ok(())
}

fn rename_project(output: &Output, from: &str, to: &str) -> Result<()> {
    let mut workspace = Workspace::open_current()?;
    workspace.store().rename(from, to)?;

    let config = workspace.config_mut();
    if config.workspace.default_project.as_deref() == Some(from) {
        config.workspace.default_project = Some(to.to_string());
        config.save_workspace()?;
    }

    output.success(&format!("Renamed project {} to {}", from, to));
    Ok(())
}

fn delete_project(output: &Output, name: &str) -> Result<()> {
    let mut workspace = Workspace::open_current()?;
    workspace.store().delete(name)?;

    let config = workspace.config_mut();
    if config.workspace.default_project.as_deref() == Some(name) {
        config.workspace.default_project = None;
        config.save_workspace()?;
    }

    output.success(&format!("Deleted project: {}", name));
    Ok(())
}

fn export_project(output: &Output, project: Option<&str>, dir: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let name = workspace.resolve_project(project)?;
    let dir = dir.unwrap_or_else(|| workspace.export_dir());

    let path = workspace.store().export(&name, &dir)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "name": name, "path": path }));
    } else {
        output.success(&format!("Exported {} to {}", name, path.display()));
    }
    Ok(())
}

fn show_project(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let project = &session.project;

    if output.is_json() {
        output.data(&serde_json::json!({
            "name": session.name,
            "started": project.is_started(),
            "start": project.start(),
            "end": project.end(),
            "stats": project.stats(),
            "record": project.to_record(),
        }));
        return Ok(());
    }

    let state = if project.is_started() { "started" } else { "draft" };
    println!("Project:    {} ({})", session.name, state);
    println!("Start:      {}", date_cell(project.start()));
    println!("End:        {}", date_cell(project.end()));
    println!("Milestones: {}", project.nodes().len());
    println!("Resources:  {}", project.resources().len());
    println!("Edges:      {}", project.edges().len());
    if let Some(created) = project.stats().created_at {
        println!("Created:    {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(modified) = project.stats().modified_at {
        println!("Modified:   {}", modified.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn set_dates(
    output: &Output,
    project: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let mut session = Session::open(project)?;

    if start.is_none() && end.is_none() {
        if output.is_json() {
            output.data(&serde_json::json!({
                "start": session.project.start(),
                "end": session.project.end(),
            }));
        } else {
            output.row(&["start", &date_cell(session.project.start())]);
            output.row(&["end", &date_cell(session.project.end())]);
        }
        return Ok(());
    }

    if let Some(start) = start {
        session
            .project
            .set_project_date(DateField::Start, parse_date(start)?);
    }
    if let Some(end) = end {
        session
            .project
            .set_project_date(DateField::End, parse_date(end)?);
    }
    session.save()?;

    output.success(&format!(
        "Project dates: {} to {}",
        date_cell(session.project.start()),
        date_cell(session.project.end())
    ));
    Ok(())
}

fn start_project(output: &Output, project: Option<&str>) -> Result<()> {
    let mut session = Session::open(project)?;
    session.project.start_project()?;
    session.save()?;

    output.success(&format!("Started project: {}", session.name));
    Ok(())
}

fn list_changes(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    if !session.project.is_started() {
        anyhow::bail!("Project '{}' has not been started", session.name);
    }

    let changes = session.project.changes();
    if output.is_json() {
        output.data(&changes);
    } else if changes.is_empty() {
        output.success("No changes since the project started");
    } else {
        for change in &changes {
            println!("{}", change);
        }
    }
    Ok(())
}

fn show_progress(output: &Output, project: Option<&str>, today: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    if !session.project.is_started() {
        anyhow::bail!("Project '{}' has not been started", session.name);
    }

    let today = match today {
        Some(s) => super::session::parse_required_date(s)?,
        None => Local::now().date_naive(),
    };
    let progress = session.project.progress(today);

    if output.is_json() {
        output.data(&progress);
        return Ok(());
    }

    for (id, state) in &progress {
        let name = session
            .project
            .node(*id)
            .map(|node| node.name.as_str())
            .unwrap_or_default();
        output.row(&[&id.to_string(), state.as_str(), name]);
    }
    Ok(())
}
