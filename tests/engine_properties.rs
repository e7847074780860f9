//! Property tests for the planning engine

use chrono::{Duration, NaiveDate};
use pert_cli::domain::{BoundsTarget, DateField, NodeId, Project};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

/// A project with `count` undated milestones and the given connect attempts
/// applied in order. Rejected attempts are ignored.
fn build(count: usize, attempts: &[(usize, usize)]) -> (Project, Vec<NodeId>) {
    let mut project = Project::new();
    let ids: Vec<NodeId> = (0..count)
        .map(|i| project.add_node(&format!("M{i}")).unwrap())
        .collect();
    for (from, to) in attempts {
        let _ = project.connect(ids[from % count], ids[to % count]);
    }
    (project, ids)
}

fn attempts() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..32, 0usize..32), 0..40)
}

/// Every milestone `id` depends on, found by walking the edge records
fn ancestors(project: &Project, id: NodeId) -> BTreeSet<NodeId> {
    let mut found = BTreeSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        for edge in project.edges().values() {
            if edge.to == current && found.insert(edge.from) {
                stack.push(edge.from);
            }
        }
    }
    found
}

proptest! {
    #[test]
    fn connect_keeps_graph_acyclic(count in 1usize..10, attempts in attempts()) {
        let (project, _) = build(count, &attempts);

        let order = project.graph().topological_order();
        prop_assert_eq!(order.len(), count);

        let position = |id: NodeId| order.iter().position(|n| *n == id).unwrap();
        let levels = project.graph().levels();
        for edge in project.edges().values() {
            prop_assert!(position(edge.from) < position(edge.to));
            prop_assert!(levels[&edge.from] < levels[&edge.to]);
        }
    }

    #[test]
    fn rejected_connect_leaves_edges_unchanged(count in 2usize..8, attempts in attempts()) {
        let (mut project, ids) = build(count, &attempts);
        let before = project.edges().clone();

        // Re-adding an existing edge or its reverse always fails
        if let Some(edge) = before.values().next().cloned() {
            prop_assert!(project.connect(edge.from, edge.to).is_err());
            prop_assert!(project.connect(edge.to, edge.from).is_err());
        }
        prop_assert!(project.connect(ids[0], ids[0]).is_err());
        prop_assert_eq!(project.edges(), &before);
    }

    #[test]
    fn bounds_respect_set_dates_across_edges(
        count in 2usize..8,
        attempts in attempts(),
        dates in prop::collection::vec((prop::option::of(0i64..60), prop::option::of(0i64..60)), 8),
    ) {
        let (mut project, ids) = build(count, &attempts);
        for (id, (start, end)) in ids.iter().zip(&dates) {
            project.set_node_date(*id, DateField::Start, start.map(day)).unwrap();
            project.set_node_date(*id, DateField::End, end.map(day)).unwrap();
        }

        let edges: Vec<_> = project.edges().values().cloned().collect();
        for edge in edges {
            let from = project.node(edge.from).unwrap().clone();
            let to = project.node(edge.to).unwrap().clone();
            let to_bounds = project.bounds(BoundsTarget::Node(edge.to)).unwrap();
            let from_bounds = project.bounds(BoundsTarget::Node(edge.from)).unwrap();

            if let Some(end) = from.end {
                prop_assert!(to_bounds.start.min.is_some_and(|min| min >= end));
            }
            if let Some(start) = to.start {
                prop_assert!(from_bounds.end.max.is_some_and(|max| max <= start));
            }
        }

        // Propagation is a pure function of the project
        prop_assert_eq!(project.analyze().bounds, project.analyze().bounds);
    }

    #[test]
    fn analysis_is_stable_across_recomputation(
        count in 1usize..8,
        attempts in attempts(),
        dates in prop::collection::vec((prop::option::of(0i64..30), prop::option::of(0i64..30)), 8),
        amounts in prop::collection::vec(0u32..6, 8),
        capacity in 0u32..12,
        slots in 0u32..3,
        critical in prop::collection::vec(any::<bool>(), 8),
    ) {
        let (mut project, ids) = build(count, &attempts);
        let crew = project.add_resource("Crew", f64::from(capacity), slots).unwrap();
        let rig = project.add_resource("Rig", 0.0, 1).unwrap();
        for (i, id) in ids.iter().enumerate() {
            let (start, end) = dates[i];
            project.set_node_date(*id, DateField::Start, start.map(day)).unwrap();
            project.set_node_date(*id, DateField::End, end.map(day)).unwrap();
            project.set_critical(*id, critical[i]).unwrap();
            project.set_node_resource(*id, crew, f64::from(amounts[i])).unwrap();
            if i % 2 == 0 {
                project.set_node_resource(*id, rig, 1.0).unwrap();
            }
        }

        let first = project.analyze();
        let second = project.analyze();
        prop_assert_eq!(&first, &second);

        // Every consumer of the zero-capacity rig overdraws it
        for (i, id) in ids.iter().enumerate() {
            prop_assert_eq!(first.conflicts.get(*id, rig).insufficient_resources, i % 2 == 0);
        }
    }

    #[test]
    fn recursive_cost_sums_each_ancestor_once(
        count in 1usize..8,
        attempts in attempts(),
        amounts in prop::collection::vec(0u32..20, 8),
    ) {
        let (mut project, ids) = build(count, &attempts);
        let resource = project.add_resource("Budget", 0.0, 0).unwrap();
        for (id, amount) in ids.iter().zip(&amounts) {
            project.set_node_resource(*id, resource, f64::from(*amount)).unwrap();
        }

        for (i, id) in ids.iter().enumerate() {
            let expected: f64 = ancestors(&project, *id)
                .iter()
                .map(|n| f64::from(amounts[ids.iter().position(|x| x == n).unwrap()]))
                .sum::<f64>()
                + f64::from(amounts[i]);

            let cost = project.cost(*id, true).unwrap();
            prop_assert_eq!(cost.get(&resource).copied().unwrap_or(0.0), expected);
        }
    }

    #[test]
    fn ids_are_never_reused_after_start(ops in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut project = Project::new();
        project.set_project_date(DateField::Start, Some(day(0)));
        project.set_project_date(DateField::End, Some(day(365)));

        let add = |project: &mut Project, seen: &mut HashSet<NodeId>| {
            let id = project.add_node("Milestone").unwrap();
            project.set_node_date(id, DateField::Start, Some(day(1))).unwrap();
            project.set_node_date(id, DateField::End, Some(day(2))).unwrap();
            assert!(seen.insert(id), "reused {id}");
        };

        let mut seen = HashSet::new();
        add(&mut project, &mut seen);
        add(&mut project, &mut seen);
        project.start_project().unwrap();

        for delete in ops {
            let live: Vec<NodeId> = project.nodes().keys().copied().collect();
            match (delete, live.first()) {
                (true, Some(id)) => {
                    project.delete_node(*id).unwrap();
                }
                _ => add(&mut project, &mut seen),
            }
        }
        prop_assert!(project.check_saveable().is_ok());
    }
}
