//! Cycle breaking, ranking and component split.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph_store::GraphStore;

/// Index-based view of the store: node `i` is the i-th node in store order.
pub(super) struct NodeGraph {
    pub ids: Vec<String>,
    pub groups: Vec<Option<String>>,
    /// Response order per source; self-loops, dangling and duplicate edges dropped.
    pub adj: Vec<Vec<usize>>,
}

impl NodeGraph {
    pub fn from_store(store: &GraphStore) -> Self {
        let index: HashMap<&str, usize> = store.ids().enumerate().map(|(i, id)| (id, i)).collect();
        let mut adj = vec![Vec::new(); store.len()];
        for (source, node) in store.iter().enumerate() {
            for target in node.targets() {
                let Some(&target) = index.get(target) else {
                    continue;
                };
                if target != source && !adj[source].contains(&target) {
                    adj[source].push(target);
                }
            }
        }
        Self {
            ids: store.ids().map(str::to_string).collect(),
            groups: store.iter().map(|node| node.group.clone()).collect(),
            adj,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Makes the graph acyclic by reversing every DFS back edge. Roots are tried
/// in store order and neighbours in response order.
pub(super) fn break_cycles(graph: &NodeGraph) -> Vec<(usize, usize)> {
    let n = graph.len();
    let mut mark = vec![Mark::New; n];
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    let mut keep = |edge: (usize, usize), edges: &mut Vec<(usize, usize)>| {
        if seen.insert(edge) {
            edges.push(edge);
        }
    };

    for start in 0..n {
        if mark[start] != Mark::New {
            continue;
        }
        mark[start] = Mark::Active;
        let mut stack = vec![(start, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if next >= graph.adj[node].len() {
                mark[node] = Mark::Done;
                stack.pop();
                continue;
            }
            frame.1 += 1;
            let target = graph.adj[node][next];
            match mark[target] {
                Mark::Active => keep((target, node), &mut edges),
                Mark::Done => keep((node, target), &mut edges),
                Mark::New => {
                    keep((node, target), &mut edges);
                    mark[target] = Mark::Active;
                    stack.push((target, 0));
                }
            }
        }
    }
    edges
}

/// Longest path from the sources over an acyclic edge list.
pub(super) fn longest_path_ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut indeg = vec![0usize; n];
    let mut adj = vec![Vec::new(); n];
    for &(from, to) in edges {
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();
    let mut ranks = vec![0usize; n];
    while let Some(node) = queue.pop_front() {
        for &next in &adj[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            indeg[next] -= 1;
            if indeg[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    ranks
}

/// Weakly connected components, each in store order, ordered by first member.
pub(super) fn components(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut undirected = vec![Vec::new(); n];
    for &(a, b) in edges {
        undirected[a].push(b);
        undirected[b].push(a);
    }

    let mut component_of = vec![usize::MAX; n];
    let mut result: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if component_of[start] != usize::MAX {
            continue;
        }
        let id = result.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        component_of[start] = id;
        while let Some(node) = queue.pop_front() {
            members.push(node);
            for &next in &undirected[node] {
                if component_of[next] == usize::MAX {
                    component_of[next] = id;
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        result.push(members);
    }
    result
}
