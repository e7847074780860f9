//! Milestone dependency graph
//!
//! Owns the edges of a project and keeps an adjacency index over them, with
//! cycle rejection at insertion time, neighbour and closure queries, and
//! leveling. Uses petgraph's `StableDiGraph` so indices survive removals.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, EdgeRef, Reversed};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::id::{EdgeId, NodeId};
use super::milestone::Edge;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Connecting {from} -> {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },

    #[error("Milestones {from} and {to} are already connected")]
    DuplicateEdge { from: NodeId, to: NodeId },

    #[error("Edge ID already in use: {0}")]
    EdgeIdTaken(EdgeId),

    #[error("Milestone not found: {0}")]
    UnknownNode(NodeId),

    #[error("Edge not found: {0}")]
    UnknownEdge(EdgeId),
}

/// Edge direction for neighbour queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbours {
    /// Successors, following outgoing edges
    Forward,
    /// Predecessors, following incoming edges
    Back,
}

impl From<Neighbours> for Direction {
    fn from(direction: Neighbours) -> Self {
        match direction {
            Neighbours::Forward => Direction::Outgoing,
            Neighbours::Back => Direction::Incoming,
        }
    }
}

/// The project's edges plus their adjacency index
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Edge records, the source of truth
    edges: BTreeMap<EdgeId, Edge>,

    /// Adjacency index over `edges`
    graph: StableDiGraph<NodeId, EdgeId>,

    node_map: HashMap<NodeId, NodeIndex>,
    edge_map: HashMap<EdgeId, EdgeIndex>,
}

impl GraphStore {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with no edges. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: NodeId) {
        if !self.node_map.contains_key(&id) {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
        }
    }

    /// Removes a node after disconnecting every edge touching it.
    ///
    /// Returns the removed edge IDs.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        let idx = self.index(id)?;

        let mut touching: Vec<EdgeId> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|edge| *edge.weight())
            .collect();
        touching.sort();

        for edge_id in &touching {
            self.disconnect(*edge_id)?;
        }

        self.graph.remove_node(idx);
        self.node_map.remove(&id);
        Ok(touching)
    }

    /// Adds the edge `from -> to` under the given ID.
    ///
    /// Rejected with no state change if `from` is already reachable from `to`
    /// (including `from == to`), or if the two are already connected.
    pub fn connect(&mut self, edge_id: EdgeId, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let from_idx = self.index(from)?;
        let to_idx = self.index(to)?;

        if self.edges.contains_key(&edge_id) {
            return Err(GraphError::EdgeIdTaken(edge_id));
        }
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return Err(GraphError::DuplicateEdge { from, to });
        }
        if has_path_connecting(&self.graph, to_idx, from_idx, None) {
            return Err(GraphError::Cycle { from, to });
        }

        let idx = self.graph.add_edge(from_idx, to_idx, edge_id);
        self.edge_map.insert(edge_id, idx);
        self.edges.insert(edge_id, Edge { from, to });
        Ok(())
    }

    /// Removes an edge from both endpoints and deletes its record
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let idx = self
            .edge_map
            .remove(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))?;
        self.graph.remove_edge(idx);
        self.edges
            .remove(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))
    }

    /// Returns direct neighbours, or with `recursive` the deduplicated
    /// transitive closure. The node itself is never included.
    pub fn neighbours(
        &self,
        id: NodeId,
        direction: Neighbours,
        recursive: bool,
    ) -> Result<Vec<NodeId>, GraphError> {
        let idx = self.index(id)?;

        let mut found: Vec<NodeId> = if recursive {
            let mut reached = Vec::new();
            match direction {
                Neighbours::Forward => {
                    let mut bfs = Bfs::new(&self.graph, idx);
                    while let Some(next) = bfs.next(&self.graph) {
                        if next != idx {
                            reached.push(self.graph[next]);
                        }
                    }
                }
                Neighbours::Back => {
                    let reversed = Reversed(&self.graph);
                    let mut bfs = Bfs::new(reversed, idx);
                    while let Some(next) = bfs.next(reversed) {
                        if next != idx {
                            reached.push(self.graph[next]);
                        }
                    }
                }
            }
            reached
        } else {
            self.graph
                .neighbors_directed(idx, direction.into())
                .map(|next| self.graph[next])
                .collect()
        };

        found.sort();
        Ok(found)
    }

    /// Edge IDs leaving the node
    pub fn forward_edges(&self, id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        self.edges_of(id, Direction::Outgoing)
    }

    /// Edge IDs entering the node
    pub fn back_edges(&self, id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        self.edges_of(id, Direction::Incoming)
    }

    fn edges_of(&self, id: NodeId, direction: Direction) -> Result<Vec<EdgeId>, GraphError> {
        let idx = self.index(id)?;
        let mut edges: Vec<EdgeId> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| *edge.weight())
            .collect();
        edges.sort();
        Ok(edges)
    }

    /// Nodes with no incoming edges
    pub fn sources(&self) -> Vec<NodeId> {
        self.nodes_without(Direction::Incoming)
    }

    /// Nodes with no outgoing edges
    pub fn sinks(&self) -> Vec<NodeId> {
        self.nodes_without(Direction::Outgoing)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph.neighbors_directed(*idx, direction).next().is_none())
            .map(|idx| self.graph[idx])
            .collect();
        ids.sort();
        ids
    }

    /// All nodes, predecessors before successors
    pub fn topological_order(&self) -> Vec<NodeId> {
        // Acyclicity is enforced by `connect`, so toposort cannot fail here.
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx]).collect())
            .unwrap_or_default()
    }

    /// Level of every node: 1 for sources, else 1 + the highest predecessor level
    pub fn levels(&self) -> BTreeMap<NodeId, u32> {
        let mut levels: BTreeMap<NodeId, u32> = BTreeMap::new();
        for id in self.topological_order() {
            let idx = self.node_map[&id];
            let level = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .filter_map(|prev| levels.get(&self.graph[prev]))
                .max()
                .map_or(1, |max| max + 1);
            levels.insert(id, level);
        }
        levels
    }

    /// Level of a single node
    pub fn level(&self, id: NodeId) -> Result<u32, GraphError> {
        self.index(id)?;
        Ok(self.levels().get(&id).copied().unwrap_or(1))
    }

    /// Returns the edge record
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All edge records, ordered by ID
    pub fn edges(&self) -> &BTreeMap<EdgeId, Edge> {
        &self.edges
    }

    /// Returns true if the graph contains the node
    pub fn contains(&self, id: NodeId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// Returns the number of nodes
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    fn index(&self, id: NodeId) -> Result<NodeIndex, GraphError> {
        self.node_map
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(seq: u32) -> NodeId {
        NodeId::new(seq)
    }

    fn e(seq: u32) -> EdgeId {
        EdgeId::new(seq)
    }

    fn graph_with(nodes: u32) -> GraphStore {
        let mut graph = GraphStore::new();
        for seq in 1..=nodes {
            graph.add_node(n(seq));
        }
        graph
    }

    /// a -> b, a -> c, b -> d, c -> d
    fn diamond() -> GraphStore {
        let mut graph = graph_with(4);
        graph.connect(e(1), n(1), n(2)).unwrap();
        graph.connect(e(2), n(1), n(3)).unwrap();
        graph.connect(e(3), n(2), n(4)).unwrap();
        graph.connect(e(4), n(3), n(4)).unwrap();
        graph
    }

    #[test]
    fn empty_graph() {
        let graph = GraphStore::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert!(graph.topological_order().is_empty());
    }

    #[test]
    fn connect_updates_both_endpoints() {
        let mut graph = graph_with(2);
        graph.connect(e(1), n(1), n(2)).unwrap();

        assert_eq!(graph.forward_edges(n(1)).unwrap(), vec![e(1)]);
        assert_eq!(graph.back_edges(n(2)).unwrap(), vec![e(1)]);
        assert!(graph.back_edges(n(1)).unwrap().is_empty());
        assert_eq!(graph.edge(e(1)), Some(&Edge { from: n(1), to: n(2) }));
    }

    #[test]
    fn edge_id_cannot_be_reused_for_another_pair() {
        let mut graph = graph_with(3);
        graph.connect(e(1), n(1), n(2)).unwrap();

        let result = graph.connect(e(1), n(2), n(3));
        assert_eq!(result, Err(GraphError::EdgeIdTaken(e(1))));
        assert!(graph.forward_edges(n(2)).unwrap().is_empty());
        assert_eq!(graph.edge(e(1)), Some(&Edge { from: n(1), to: n(2) }));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = graph_with(3);
        graph.connect(e(1), n(1), n(2)).unwrap();
        graph.connect(e(2), n(2), n(3)).unwrap();

        let result = graph.connect(e(3), n(3), n(1));
        assert_eq!(result, Err(GraphError::Cycle { from: n(3), to: n(1) }));
        assert_eq!(graph.edges().len(), 2);
        assert!(graph.edge(e(3)).is_none());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = graph_with(1);
        let result = graph.connect(e(1), n(1), n(1));
        assert!(matches!(result, Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut graph = graph_with(2);
        graph.connect(e(1), n(1), n(2)).unwrap();
        let result = graph.connect(e(2), n(1), n(2));
        assert!(matches!(result, Err(GraphError::DuplicateEdge { .. })));
    }

    #[test]
    fn unknown_node_returns_error() {
        let mut graph = graph_with(1);
        let result = graph.connect(e(1), n(1), n(9));
        assert_eq!(result, Err(GraphError::UnknownNode(n(9))));
    }

    #[test]
    fn disconnect_removes_edge() {
        let mut graph = graph_with(2);
        graph.connect(e(1), n(1), n(2)).unwrap();

        let edge = graph.disconnect(e(1)).unwrap();
        assert_eq!(edge.from, n(1));
        assert!(graph.forward_edges(n(1)).unwrap().is_empty());
        assert!(graph.edges().is_empty());
        assert_eq!(graph.disconnect(e(1)), Err(GraphError::UnknownEdge(e(1))));
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut graph = diamond();
        let removed = graph.remove_node(n(2)).unwrap();

        assert_eq!(removed, vec![e(1), e(3)]);
        assert!(!graph.contains(n(2)));
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.neighbours(n(4), Neighbours::Back, false).unwrap(), vec![n(3)]);
    }

    #[test]
    fn direct_and_recursive_neighbours() {
        let graph = diamond();

        assert_eq!(
            graph.neighbours(n(1), Neighbours::Forward, false).unwrap(),
            vec![n(2), n(3)]
        );
        assert_eq!(
            graph.neighbours(n(4), Neighbours::Back, false).unwrap(),
            vec![n(2), n(3)]
        );
        // n1 is reachable through both n2 and n3 but appears once
        assert_eq!(
            graph.neighbours(n(4), Neighbours::Back, true).unwrap(),
            vec![n(1), n(2), n(3)]
        );
        assert_eq!(
            graph.neighbours(n(1), Neighbours::Forward, true).unwrap(),
            vec![n(2), n(3), n(4)]
        );
    }

    #[test]
    fn sources_and_sinks() {
        let mut graph = diamond();
        graph.add_node(n(5));

        assert_eq!(graph.sources(), vec![n(1), n(5)]);
        assert_eq!(graph.sinks(), vec![n(4), n(5)]);
    }

    #[test]
    fn leveling() {
        let mut graph = graph_with(4);
        graph.connect(e(1), n(1), n(2)).unwrap();
        graph.connect(e(2), n(2), n(3)).unwrap();
        graph.connect(e(3), n(1), n(3)).unwrap();

        assert_eq!(graph.level(n(1)).unwrap(), 1);
        assert_eq!(graph.level(n(2)).unwrap(), 2);
        // Longest chain wins over the direct edge
        assert_eq!(graph.level(n(3)).unwrap(), 3);
        assert_eq!(graph.level(n(4)).unwrap(), 1);
        assert!(graph.level(n(9)).is_err());
    }

    #[test]
    fn topological_order() {
        let graph = diamond();
        let order = graph.topological_order();
        let pos = |id: NodeId| order.iter().position(|x| *x == id).unwrap();

        assert!(pos(n(1)) < pos(n(2)));
        assert!(pos(n(1)) < pos(n(3)));
        assert!(pos(n(2)) < pos(n(4)));
        assert!(pos(n(3)) < pos(n(4)));
    }

    #[test]
    fn performance_500_nodes() {
        use std::time::Instant;

        let mut graph = graph_with(500);
        for seq in 1..500 {
            graph.connect(e(seq), n(seq), n(seq + 1)).unwrap();
        }

        let start = Instant::now();
        let levels = graph.levels();
        let duration = start.elapsed();

        assert_eq!(levels[&n(500)], 500);
        assert!(duration.as_millis() < 50, "Leveling took {:?}", duration);
    }
}
