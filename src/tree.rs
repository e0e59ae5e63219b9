//! Navigable forest derived from the graph.
//!
//! Every node appears exactly once as a full [`TreeItemKind::Node`] item.
//! Further edges into an already placed node become [`TreeItemKind::Link`]
//! placeholders, and edges to unknown ids become [`TreeItemKind::Missing`]
//! placeholders, so cycles and self-loops cannot recurse. Construction uses
//! an explicit stack.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph_store::GraphStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeItemKind {
    Node,
    /// Reference to a node shown elsewhere in the forest.
    Link,
    /// Edge target that does not exist.
    Missing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeItem {
    pub node_id: String,
    /// Label of the response that led here; `None` for roots.
    pub via_label: Option<String>,
    pub depth: usize,
    pub kind: TreeItemKind,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    fn new(node_id: &str, via_label: Option<&str>, depth: usize, kind: TreeItemKind) -> Self {
        Self {
            node_id: node_id.to_string(),
            via_label: via_label.map(str::to_string),
            depth,
            kind,
            children: Vec::new(),
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind == TreeItemKind::Link
    }

    pub fn is_missing(&self) -> bool {
        self.kind == TreeItemKind::Missing
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a TreeItem>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    fn path<'a>(&'a self, node_id: &str, trail: &mut Vec<&'a TreeItem>) -> bool {
        trail.push(self);
        if self.kind == TreeItemKind::Node && self.node_id == node_id {
            return true;
        }
        for child in &self.children {
            if child.path(node_id, trail) {
                return true;
            }
        }
        trail.pop();
        false
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Forest {
    pub roots: Vec<TreeItem>,
}

impl Forest {
    /// Pre-order listing of every item, for flat list widgets.
    pub fn flatten(&self) -> Vec<&TreeItem> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.walk(&mut out);
        }
        out
    }

    /// The full (non-placeholder) item for a node.
    pub fn find(&self, node_id: &str) -> Option<&TreeItem> {
        self.flatten()
            .into_iter()
            .find(|item| item.kind == TreeItemKind::Node && item.node_id == node_id)
    }

    /// Breadcrumb of node ids from a root down to `node_id`.
    pub fn path_to(&self, node_id: &str) -> Option<Vec<String>> {
        for root in &self.roots {
            let mut trail = Vec::new();
            if root.path(node_id, &mut trail) {
                return Some(trail.into_iter().map(|item| item.node_id.clone()).collect());
            }
        }
        None
    }

    /// Number of items including placeholders.
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Entry nodes and nodes nothing points at, in store order. Falls back to the
/// first node when neither exists.
pub fn root_ids(store: &GraphStore) -> Vec<String> {
    let incoming = store.incoming_counts();
    let mut roots: Vec<String> = store
        .iter()
        .filter(|node| node.node_type.is_entry() || incoming.get(node.id.as_str()) == Some(&0))
        .map(|node| node.id.clone())
        .collect();
    if roots.is_empty() {
        if let Some(first) = store.iter().next() {
            roots.push(first.id.clone());
        }
    }
    roots
}

struct Frame {
    item: TreeItem,
    edges: Vec<(String, String)>,
    next: usize,
}

impl Frame {
    fn open(store: &GraphStore, item: TreeItem) -> Self {
        let edges = store
            .get(&item.node_id)
            .map(|node| {
                node.responses
                    .iter()
                    .map(|e| (e.label.clone(), e.target_id.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            item,
            edges,
            next: 0,
        }
    }
}

fn expand(store: &GraphStore, root_id: &str, visited: &mut HashSet<String>) -> TreeItem {
    let mut stack = vec![Frame::open(
        store,
        TreeItem::new(root_id, None, 0, TreeItemKind::Node),
    )];

    while let Some(top) = stack.last_mut() {
        if top.next < top.edges.len() {
            let (label, target) = top.edges[top.next].clone();
            top.next += 1;
            let depth = top.item.depth + 1;
            if !store.contains(&target) {
                top.item.children.push(TreeItem::new(
                    &target,
                    Some(&label),
                    depth,
                    TreeItemKind::Missing,
                ));
            } else if visited.contains(&target) {
                top.item.children.push(TreeItem::new(
                    &target,
                    Some(&label),
                    depth,
                    TreeItemKind::Link,
                ));
            } else {
                visited.insert(target.clone());
                let child = TreeItem::new(&target, Some(&label), depth, TreeItemKind::Node);
                stack.push(Frame::open(store, child));
            }
            continue;
        }

        if let Some(done) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.item.children.push(done.item),
                None => return done.item,
            }
        }
    }

    TreeItem::new(root_id, None, 0, TreeItemKind::Node)
}

/// Derives the forest. Roots are expanded first; nodes still unplaced after
/// that (e.g. a cycle nothing points into) become extra roots in store order.
pub fn build_forest(store: &GraphStore) -> Forest {
    let roots = root_ids(store);
    let mut visited: HashSet<String> = roots.iter().cloned().collect();
    let mut forest = Forest::default();

    for root in &roots {
        forest.roots.push(expand(store, root, &mut visited));
    }

    let leftovers: Vec<String> = store
        .ids()
        .filter(|id| !visited.contains(*id))
        .map(str::to_string)
        .collect();
    for id in leftovers {
        if visited.insert(id.clone()) {
            forest.roots.push(expand(store, &id, &mut visited));
        }
    }

    tracing::debug!(
        roots = forest.roots.len(),
        nodes = store.len(),
        "Built script tree"
    );
    forest
}
