//! Structural checks over the script graph.
//!
//! Each check is a pure function over a [`GraphStore`]; [`Validator`] runs
//! the enabled ones in a fixed order and collects a [`ValidationReport`].
//! Findings are data, never errors: a script with issues can still be edited.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::graph_store::GraphStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Checks in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingEntryPoint,
    IncompleteNode,
    BrokenReference,
    DeadEnd,
    Orphan,
    Cycle,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::MissingEntryPoint,
        IssueKind::IncompleteNode,
        IssueKind::BrokenReference,
        IssueKind::DeadEnd,
        IssueKind::Orphan,
        IssueKind::Cycle,
    ];

    pub fn severity(self) -> Severity {
        match self {
            IssueKind::Orphan | IssueKind::Cycle => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Missing target of a broken reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Node ids along a cycle, starting where it was entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, node_id: Option<&str>, message: String) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            node_id: node_id.map(str::to_string),
            target_id: None,
            cycle: None,
            message,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

pub fn check_entry_point(store: &GraphStore) -> Vec<ValidationIssue> {
    if store.iter().any(|node| node.node_type.is_entry()) {
        return Vec::new();
    }
    vec![ValidationIssue::new(
        IssueKind::MissingEntryPoint,
        None,
        "Script has no entry node".to_string(),
    )]
}

pub fn check_incomplete(store: &GraphStore) -> Vec<ValidationIssue> {
    store
        .iter()
        .filter_map(|node| {
            let missing = node.missing_fields();
            if missing.is_empty() {
                return None;
            }
            Some(ValidationIssue::new(
                IssueKind::IncompleteNode,
                Some(&node.id),
                format!("Node '{}' is missing {}", node.id, missing.join(", ")),
            ))
        })
        .collect()
}

/// One issue per dangling edge.
pub fn check_broken_references(store: &GraphStore) -> Vec<ValidationIssue> {
    store
        .dangling_edges()
        .map(|edge| {
            let mut issue = ValidationIssue::new(
                IssueKind::BrokenReference,
                Some(edge.source_id),
                format!(
                    "Response '{}' on '{}' points to missing node '{}'",
                    edge.edge.label, edge.source_id, edge.edge.target_id
                ),
            );
            issue.target_id = Some(edge.edge.target_id.clone());
            issue
        })
        .collect()
}

pub fn check_dead_ends(store: &GraphStore) -> Vec<ValidationIssue> {
    store
        .iter()
        .filter(|node| node.behavior().requires_outgoing && node.responses.is_empty())
        .map(|node| {
            ValidationIssue::new(
                IssueKind::DeadEnd,
                Some(&node.id),
                format!(
                    "Node '{}' ({}) has no responses and is not an outcome",
                    node.id, node.node_type
                ),
            )
        })
        .collect()
}

/// Nodes that need an incoming edge but only have self-loops or nothing.
pub fn check_orphans(store: &GraphStore) -> Vec<ValidationIssue> {
    let mut referenced: HashSet<&str> = HashSet::new();
    for edge in store.edges() {
        if edge.source_id != edge.edge.target_id {
            referenced.insert(edge.edge.target_id.as_str());
        }
    }
    store
        .iter()
        .filter(|node| node.behavior().requires_incoming && !referenced.contains(node.id.as_str()))
        .map(|node| {
            ValidationIssue::new(
                IssueKind::Orphan,
                Some(&node.id),
                format!("Node '{}' is not reachable from any response", node.id),
            )
        })
        .collect()
}

pub fn check_cycles(store: &GraphStore) -> Vec<ValidationIssue> {
    find_cycles(store)
        .into_iter()
        .map(|cycle| {
            let mut rendered = cycle.clone();
            rendered.push(cycle[0].clone());
            let mut issue = ValidationIssue::new(
                IssueKind::Cycle,
                Some(&cycle[0]),
                format!("Cycle: {}", rendered.join(" -> ")),
            );
            issue.cycle = Some(cycle);
            issue
        })
        .collect()
}

/// Cycles reachable by DFS in store order, each reported once.
pub fn find_cycles(store: &GraphStore) -> Vec<Vec<String>> {
    let adj: HashMap<&str, Vec<&str>> = store
        .iter()
        .map(|node| {
            let targets = node.targets().filter(|t| store.contains(t)).collect();
            (node.id.as_str(), targets)
        })
        .collect();

    let mut cycles = Vec::new();
    let mut seen = HashSet::new();
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    fn detect_cycle_dfs<'a>(
        node: &'a str,
        adj: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        seen: &mut HashSet<Vec<&'a str>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(neighbors) = adj.get(node) {
            for &neighbor in neighbors {
                if !visited.contains(neighbor) {
                    detect_cycle_dfs(neighbor, adj, visited, rec_stack, path, seen, cycles);
                } else if rec_stack.contains(neighbor) {
                    if let Some(pos) = path.iter().position(|n| *n == neighbor) {
                        let cycle = &path[pos..];
                        if seen.insert(canonical(cycle)) {
                            cycles.push(cycle.iter().map(|id| id.to_string()).collect());
                        }
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
    }

    for node in store.ids() {
        if !visited.contains(node) {
            detect_cycle_dfs(
                node,
                &adj,
                &mut visited,
                &mut rec_stack,
                &mut path,
                &mut seen,
                &mut cycles,
            );
        }
    }

    cycles
}

/// Rotation of a cycle starting at its smallest id.
fn canonical<'a>(cycle: &[&'a str]) -> Vec<&'a str> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}

/// Runs a chosen set of checks.
#[derive(Clone, Debug)]
pub struct Validator {
    enabled: Vec<IssueKind>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            enabled: IssueKind::ALL.to_vec(),
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only(kinds: impl IntoIterator<Item = IssueKind>) -> Self {
        let wanted: HashSet<IssueKind> = kinds.into_iter().collect();
        Self {
            enabled: IssueKind::ALL
                .into_iter()
                .filter(|kind| wanted.contains(kind))
                .collect(),
        }
    }

    pub fn without(mut self, kind: IssueKind) -> Self {
        self.enabled.retain(|k| *k != kind);
        self
    }

    pub fn is_enabled(&self, kind: IssueKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn run(&self, store: &GraphStore) -> ValidationReport {
        let mut issues = Vec::new();
        for kind in &self.enabled {
            let found = match kind {
                IssueKind::MissingEntryPoint => check_entry_point(store),
                IssueKind::IncompleteNode => check_incomplete(store),
                IssueKind::BrokenReference => check_broken_references(store),
                IssueKind::DeadEnd => check_dead_ends(store),
                IssueKind::Orphan => check_orphans(store),
                IssueKind::Cycle => check_cycles(store),
            };
            issues.extend(found);
        }
        tracing::debug!(issues = issues.len(), nodes = store.len(), "Validated script");
        ValidationReport { issues }
    }
}

/// Runs every check.
pub fn validate(store: &GraphStore) -> ValidationReport {
    Validator::new().run(store)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues
            .iter()
            .filter(move |i| i.node_id.as_deref() == Some(node_id))
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
