//! petgraph-based arena for a bot's component graph.
//!
//! Nodes are addressed by `NodeId`; relations live only in the edge list, so a
//! node never owns or points at its successors.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};

use super::types::{Bot, NodeId, NodeRecord};
use crate::error::CompilerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeLabel {
    /// Declared outgoing edge; `position` preserves declaration order.
    Next { position: usize },
    /// Markup cell wired to a successor.
    Button { row: usize, col: usize },
}

pub struct ComponentGraph {
    pub graph: DiGraph<NodeId, EdgeLabel>,
    pub node_indices: HashMap<NodeId, NodeIndex>,
    nodes: BTreeMap<NodeId, NodeRecord>,
}

impl ComponentGraph {
    pub fn build(bot: &Bot) -> Result<Self, Vec<CompilerError>> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut nodes = BTreeMap::new();
        let mut errors = Vec::new();

        // Add all nodes
        for node in &bot.nodes {
            if nodes.contains_key(&node.id) {
                errors.push(CompilerError::parse(
                    "P003",
                    format!("Duplicate node id {}", node.id),
                    Some(node.id.0),
                ));
                continue;
            }
            let idx = graph.add_node(node.id);
            node_indices.insert(node.id, idx);
            nodes.insert(node.id, node.clone());
        }

        // Add declared edges, then markup edges. Only the first record of a
        // duplicated id is wired.
        let mut wired = HashSet::new();
        for node in &bot.nodes {
            if !wired.insert(node.id) {
                continue;
            }
            let Some(&source) = node_indices.get(&node.id) else {
                continue;
            };
            for (position, edge) in node.outgoing.iter().enumerate() {
                match node_indices.get(&edge.target) {
                    Some(&target) => {
                        graph.add_edge(source, target, EdgeLabel::Next { position });
                    }
                    None => errors.push(CompilerError::parse(
                        "P002",
                        format!(
                            "Node {} references unknown successor {}",
                            node.id, edge.target
                        ),
                        Some(node.id.0),
                    )),
                }
            }

            let Some(markup) = &node.markup else { continue };
            for (row, cells) in markup.rows.iter().enumerate() {
                for (col, cell) in cells.iter().enumerate() {
                    let Some(target_id) = cell.target else { continue };
                    match node_indices.get(&target_id) {
                        Some(&target) => {
                            graph.add_edge(source, target, EdgeLabel::Button { row, col });
                        }
                        None => errors.push(CompilerError::parse(
                            "P004",
                            format!(
                                "Markup cell [{}][{}] '{}' of node {} references unknown node {}",
                                row, col, cell.text, node.id, target_id
                            ),
                            Some(node.id.0),
                        )),
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ComponentGraph {
            graph,
            node_indices,
            nodes,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Trigger nodes in ascending id order.
    pub fn triggers(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_trigger())
            .map(|n| n.id)
            .collect()
    }

    /// Declared successors in declaration order.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.node_indices.get(&id) else {
            return vec![];
        };
        let mut out: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match e.weight() {
                EdgeLabel::Next { position } => Some((*position, self.graph[e.target()])),
                EdgeLabel::Button { .. } => None,
            })
            .collect();
        out.sort_by_key(|(position, _)| *position);
        out.into_iter().map(|(_, n)| n).collect()
    }

    /// Markup targets in row-major order.
    pub fn button_targets(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.node_indices.get(&id) else {
            return vec![];
        };
        let mut out: Vec<((usize, usize), NodeId)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match e.weight() {
                EdgeLabel::Button { row, col } => Some(((*row, *col), self.graph[e.target()])),
                EdgeLabel::Next { .. } => None,
            })
            .collect();
        out.sort_by_key(|(cell, _)| *cell);
        out.into_iter().map(|(_, n)| n).collect()
    }

    pub fn incoming_count(&self, id: NodeId) -> usize {
        let Some(&idx) = self.node_indices.get(&id) else {
            return 0;
        };
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Every node reachable from `start` (inclusive) over both edge kinds.
    pub fn reachable_set(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut reachable = BTreeSet::new();
        let Some(&idx) = self.node_indices.get(&start) else {
            return reachable;
        };
        let mut bfs = Bfs::new(&self.graph, idx);
        while let Some(nx) = bfs.next(&self.graph) {
            reachable.insert(self.graph[nx]);
        }
        reachable
    }

    /// Depth-first post-order from `start`: successors (then button targets)
    /// before the node itself. Nodes already in `visited` are skipped, which
    /// both dedups across walks and terminates on cycles.
    pub fn post_order(&self, start: NodeId, visited: &mut HashSet<NodeId>) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.nodes.contains_key(&start) || !visited.insert(start) {
            return order;
        }

        let mut stack = vec![Frame::new(start, self.children(start))];
        loop {
            let next = match stack.last_mut() {
                None => break,
                Some(frame) => frame.advance(),
            };
            match next {
                Some(child) => {
                    if visited.insert(child) {
                        stack.push(Frame::new(child, self.children(child)));
                    }
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        order.push(frame.node);
                    }
                }
            }
        }
        order
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.successors(id);
        children.extend(self.button_targets(id));
        children
    }
}

struct Frame {
    node: NodeId,
    children: Vec<NodeId>,
    cursor: usize,
}

impl Frame {
    fn new(node: NodeId, children: Vec<NodeId>) -> Self {
        Frame {
            node,
            children,
            cursor: 0,
        }
    }

    fn advance(&mut self) -> Option<NodeId> {
        let child = self.children.get(self.cursor).copied();
        self.cursor += 1;
        child
    }
}
