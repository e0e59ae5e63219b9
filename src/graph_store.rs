//! Client-side mirror of the script graph.
//!
//! Nodes are kept in insertion order; the tree builder, validator and layout
//! all iterate in this order so their output is deterministic.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Edge, Node, NodeType, Position};

/// Ordered map of node id to node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStore {
    nodes: IndexMap<String, Node>,
}

/// A response edge together with the node it leaves from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRef<'a> {
    pub source_id: &'a str,
    pub index: usize,
    pub edge: &'a Edge,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from nodes in order; a later node replaces an earlier
    /// one with the same id but keeps the earlier slot.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut store = Self::new();
        for node in nodes {
            store.insert(node);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    /// Inserts or replaces a node. Replacing keeps the node's slot.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Inserts a node at `index` (clamped to the end), used to undo a delete.
    pub fn insert_at(&mut self, index: usize, node: Node) {
        if self.nodes.contains_key(&node.id) {
            self.insert(node);
            return;
        }
        let index = index.min(self.nodes.len());
        self.nodes.shift_insert(index, node.id.clone(), node);
    }

    /// Removes a node, returning its former slot along with it.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Node)> {
        self.nodes
            .shift_remove_full(id)
            .map(|(index, _, node)| (index, node))
    }

    pub fn replace_all(&mut self, nodes: impl IntoIterator<Item = Node>) {
        *self = Self::from_nodes(nodes);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn set_position(&mut self, id: &str, position: Option<Position>) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.nodes.values().flat_map(|node| {
            node.responses
                .iter()
                .enumerate()
                .map(move |(index, edge)| EdgeRef {
                    source_id: node.id.as_str(),
                    index,
                    edge,
                })
        })
    }

    /// Edges whose target is not in the store.
    pub fn dangling_edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.edges().filter(|e| !self.contains(&e.edge.target_id))
    }

    /// Number of edges arriving at each node, including self-loops.
    pub fn incoming_counts(&self) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> = self.ids().map(|id| (id, 0)).collect();
        for edge in self.edges() {
            if let Some(count) = counts.get_mut(edge.edge.target_id.as_str()) {
                *count += 1;
            }
        }
        counts
    }

    /// Ids of nodes (other than `id` itself) with at least one edge into `id`,
    /// in store order.
    pub fn referrers(&self, id: &str) -> Vec<String> {
        self.nodes
            .values()
            .filter(|node| node.id != id && node.references(id))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Every edge pointing at `id`, as `(source_id, response_index)`.
    pub fn incoming_edges(&self, id: &str) -> Vec<(String, usize)> {
        self.edges()
            .filter(|e| e.edge.target_id == id)
            .map(|e| (e.source_id.to_string(), e.index))
            .collect()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut by_type = BTreeMap::new();
        for node in self.iter() {
            *by_type.entry(node.node_type).or_insert(0) += 1;
        }
        GraphStats {
            node_count: self.len(),
            edge_count: self.edges().count(),
            dangling_edges: self.dangling_edges().count(),
            by_type,
        }
    }
}

impl FromIterator<Node> for GraphStore {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self::from_nodes(iter)
    }
}

/// Summary counts for a graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub dangling_edges: usize,
    pub by_type: BTreeMap<NodeType, usize>,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} edges ({} dangling)",
            self.node_count, self.edge_count, self.dangling_edges
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    fn sample() -> GraphStore {
        GraphStore::from_nodes(vec![
            Node::new("start", NodeType::Entry, "Hi", "Hello").with_response("go", "q1"),
            Node::new("q1", NodeType::Question, "Q", "Ask")
                .with_response("yes", "end")
                .with_response("again", "q1")
                .with_response("lost", "nowhere"),
            Node::new("end", NodeType::Success, "Done", "Bye"),
        ])
    }

    #[test]
    fn test_remove_and_insert_at_restores_order() {
        let mut store = sample();
        let (index, node) = store.remove("q1").unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["start", "end"]);

        store.insert_at(index, node);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["start", "q1", "end"]);
        assert_eq!(store, sample());
    }

    #[test]
    fn test_referrers_skip_self_loops() {
        let store = sample();
        assert_eq!(store.referrers("q1"), vec!["start".to_string()]);
        assert_eq!(
            store.incoming_edges("q1"),
            vec![("start".to_string(), 0), ("q1".to_string(), 1)]
        );
    }

    #[test]
    fn test_incoming_counts() {
        let store = sample();
        let counts = store.incoming_counts();
        assert_eq!(counts["start"], 0);
        assert_eq!(counts["q1"], 2);
        assert_eq!(counts["end"], 1);
        assert!(!counts.contains_key("nowhere"));
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 4);
        assert_eq!(stats.dangling_edges, 1);
        assert_eq!(stats.by_type[&NodeType::Question], 1);
        assert_eq!(stats.to_string(), "3 nodes, 4 edges (1 dangling)");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut store = sample();
        store.insert(Node::new("start", NodeType::Entry, "Hey", "Hello"));
        assert_eq!(store.index_of("start"), Some(0));
        assert_eq!(store.get("start").unwrap().title, "Hey");
    }
}
