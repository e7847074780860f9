//! Engine query commands: bounds, cost, conflicts, level, neighbours, status

use anyhow::Result;

use super::output::{amount_cell, date_cell, Output};
use super::session::{parse_node, parse_required_date, Session};
use crate::domain::{BoundsTarget, Cost, Neighbours, NodeBounds, Project};

fn print_bounds(label: &str, bounds: &NodeBounds) {
    println!(
        "{}\tstart {} .. {}\tend {} .. {}",
        label,
        date_cell(bounds.start.min),
        date_cell(bounds.start.max),
        date_cell(bounds.end.min),
        date_cell(bounds.end.max)
    );
}

/// Date windows of one milestone, or of the project and every milestone
pub fn bounds(output: &Output, project: Option<&str>, node: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;

    if let Some(node) = node {
        let id = parse_node(node)?;
        let bounds = session.project.bounds(BoundsTarget::Node(id))?;
        if output.is_json() {
            output.data(&bounds);
        } else {
            print_bounds(&id.to_string(), &bounds);
        }
        return Ok(());
    }

    let analysis = session.project.analyze();
    if output.is_json() {
        output.data(&analysis.bounds);
        return Ok(());
    }

    print_bounds("project", &analysis.bounds.project);
    for (id, bounds) in &analysis.bounds.nodes {
        print_bounds(&id.to_string(), bounds);
    }
    Ok(())
}

fn print_cost(output: &Output, project: &Project, cost: &Cost) {
    if output.is_json() {
        output.data(cost);
        return;
    }
    for (id, amount) in cost {
        let name = project
            .resource(*id)
            .map(|r| r.name.as_str())
            .unwrap_or_default();
        output.row(&[&id.to_string(), name, &amount_cell(*amount)]);
    }
}

/// Resource consumption of one milestone, or of everything starting by a
/// date. Without either, the date is the project end when set.
pub fn cost(
    output: &Output,
    project: Option<&str>,
    node: Option<&str>,
    recursive: bool,
    until: Option<&str>,
) -> Result<()> {
    let session = Session::open(project)?;

    let cost = match (node, until) {
        (Some(_), Some(_)) => anyhow::bail!("Use either a milestone or --until, not both"),
        (Some(node), None) => session.project.cost(parse_node(node)?, recursive)?,
        (None, Some(until)) => session.project.cost_until(parse_required_date(until)?),
        (None, None) => match session.project.end() {
            Some(end) => session.project.cost_until(end),
            None => session.project.total_cost(),
        },
    };

    print_cost(output, &session.project, &cost);
    Ok(())
}

/// Resource conflicts of one milestone, or of every deficient milestone
pub fn conflicts(output: &Output, project: Option<&str>, node: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let project = &session.project;

    if let Some(node) = node {
        let id = parse_node(node)?;
        let per_resource = project.conflict_flags(id)?;
        if output.is_json() {
            output.data(&per_resource);
            return Ok(());
        }
        for (resource, flags) in &per_resource {
            if let Some(message) = flags.message() {
                output.row(&[&resource.to_string(), message]);
            }
        }
        return Ok(());
    }

    let report = project.analyze().conflicts;
    let deficient = report.deficient_nodes();

    if output.is_json() {
        let items: Vec<_> = deficient
            .iter()
            .map(|id| serde_json::json!({ "id": id, "resources": report.for_node(*id) }))
            .collect();
        output.data(&items);
        return Ok(());
    }

    if deficient.is_empty() {
        output.success("No resource conflicts");
        return Ok(());
    }

    for id in deficient {
        let name = project
            .node(id)
            .map(|n| n.name.as_str())
            .unwrap_or_default();
        for (resource, flags) in report.for_node(id) {
            if let Some(message) = flags.message() {
                output.row(&[&id.to_string(), name, &resource.to_string(), message]);
            }
        }
    }
    Ok(())
}

pub fn level(output: &Output, project: Option<&str>, node: &str) -> Result<()> {
    let id = parse_node(node)?;
    let session = Session::open(project)?;
    let level = session.project.level(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "level": level }));
    } else {
        println!("{}", level);
    }
    Ok(())
}

pub fn neighbours(
    output: &Output,
    project: Option<&str>,
    node: &str,
    back: bool,
    recursive: bool,
) -> Result<()> {
    let id = parse_node(node)?;
    let direction = if back {
        Neighbours::Back
    } else {
        Neighbours::Forward
    };

    let session = Session::open(project)?;
    let found = session.project.neighbours(id, direction, recursive)?;

    if output.is_json() {
        output.data(&found);
        return Ok(());
    }

    for id in found {
        let name = session
            .project
            .node(id)
            .map(|n| n.name.as_str())
            .unwrap_or_default();
        output.row(&[&id.to_string(), name]);
    }
    Ok(())
}

/// Project overview
pub fn status(output: &Output, project: Option<&str>) -> Result<()> {
    let session = Session::open(project)?;
    let project = &session.project;
    let analysis = project.analyze();
    let deficient = analysis.conflicts.deficient_nodes();
    let violations = project.date_violations();
    let missing = project.missing_dates();

    if output.is_json() {
        output.data(&serde_json::json!({
            "name": session.name,
            "started": project.is_started(),
            "start": project.start(),
            "end": project.end(),
            "milestones": project.nodes().len(),
            "resources": project.resources().len(),
            "edges": project.edges().len(),
            "deficient": deficient,
            "date_violations": violations,
            "missing_dates": missing,
            "changes": project.changes().len(),
        }));
        return Ok(());
    }

    let state = if project.is_started() { "started" } else { "draft" };
    println!("{} ({})", session.name, state);
    println!(
        "  {} to {}",
        date_cell(project.start()),
        date_cell(project.end())
    );
    println!(
        "  {} milestones, {} dependencies, {} resources",
        project.nodes().len(),
        project.edges().len(),
        project.resources().len()
    );
    println!();

    println!("Resource conflicts: {}", deficient.len());
    for id in &deficient {
        println!("  {}", id);
    }

    println!("Dates out of range: {}", violations.len());
    for violation in &violations {
        let owner = violation
            .node
            .map_or_else(|| "project".to_string(), |id| id.to_string());
        println!(
            "  {} {} {} (allowed {} .. {})",
            owner,
            violation.field.as_str(),
            violation.date,
            date_cell(violation.allowed.min),
            date_cell(violation.allowed.max)
        );
    }

    if !missing.is_empty() {
        println!("Missing dates: {}", missing.join(", "));
    }
    if project.is_started() {
        println!("Changes since start: {}", project.changes().len());
    }
    Ok(())
}
