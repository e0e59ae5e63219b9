//! Layer assignment with dummy nodes, and barycenter crossing reduction.

use std::cmp::Ordering;
use std::collections::HashMap;

/// One component split into ranks. Local vertex `v` is either a real node
/// (`origin[v] = Some(store_index)`) or a dummy on a long edge.
#[derive(Clone, Debug)]
pub(super) struct Layers {
    pub origin: Vec<Option<usize>>,
    pub down: Vec<Vec<usize>>,
    pub up: Vec<Vec<usize>>,
    pub ranks: Vec<Vec<usize>>,
}

impl Layers {
    /// `members` in store order; `edges` acyclic with `ranks[to] > ranks[from]`.
    pub fn build(members: &[usize], ranks: &[usize], edges: &[(usize, usize)]) -> Self {
        let local: HashMap<usize, usize> =
            members.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        let depth = members.iter().map(|&g| ranks[g]).max().unwrap_or(0) + 1;

        let mut layers = Self {
            origin: members.iter().map(|&g| Some(g)).collect(),
            down: vec![Vec::new(); members.len()],
            up: vec![Vec::new(); members.len()],
            ranks: vec![Vec::new(); depth],
        };
        for (i, &g) in members.iter().enumerate() {
            layers.ranks[ranks[g]].push(i);
        }

        for &(from, to) in edges {
            let (Some(&a), Some(&b)) = (local.get(&from), local.get(&to)) else {
                continue;
            };
            let mut prev = a;
            for rank in ranks[from] + 1..ranks[to] {
                let dummy = layers.add_vertex(None);
                layers.ranks[rank].push(dummy);
                layers.link(prev, dummy);
                prev = dummy;
            }
            layers.link(prev, b);
        }
        layers
    }

    fn add_vertex(&mut self, origin: Option<usize>) -> usize {
        self.origin.push(origin);
        self.down.push(Vec::new());
        self.up.push(Vec::new());
        self.origin.len() - 1
    }

    fn link(&mut self, from: usize, to: usize) {
        self.down[from].push(to);
        self.up[to].push(from);
    }

    pub fn total_crossings(&self) -> usize {
        self.ranks
            .windows(2)
            .map(|pair| count_crossings(&pair[0], &pair[1], &self.down))
            .sum()
    }
}

/// Crossings between edges joining two adjacent ranks.
pub(super) fn count_crossings(upper: &[usize], lower: &[usize], down: &[Vec<usize>]) -> usize {
    let lower_pos: HashMap<usize, usize> = lower.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut segments = Vec::new();
    for (i, &u) in upper.iter().enumerate() {
        for v in &down[u] {
            if let Some(&j) = lower_pos.get(v) {
                segments.push((i, j));
            }
        }
    }

    let mut crossings = 0;
    for (k, &(a1, b1)) in segments.iter().enumerate() {
        for &(a2, b2) in &segments[k + 1..] {
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn barycenter(v: usize, neighbors: &[Vec<usize>], positions: &[usize]) -> f64 {
    let list = &neighbors[v];
    if list.is_empty() {
        return positions[v] as f64;
    }
    let total: usize = list.iter().map(|&n| positions[n]).sum();
    total as f64 / list.len() as f64
}

fn positions_of(layers: &Layers) -> Vec<usize> {
    let mut positions = vec![0; layers.origin.len()];
    for rank in &layers.ranks {
        for (i, &v) in rank.iter().enumerate() {
            positions[v] = i;
        }
    }
    positions
}

/// Reorders ranks by alternating barycenter sweeps and keeps the order with
/// the fewest crossings. Ties fall back to group, then previous position.
/// Returns the crossing count of the kept order.
pub(super) fn minimize_crossings(
    layers: &mut Layers,
    groups: &[Option<String>],
    sweeps: usize,
) -> usize {
    let mut best_crossings = layers.total_crossings();
    if layers.ranks.len() <= 1 || best_crossings == 0 {
        return best_crossings;
    }
    let mut best_order = layers.ranks.clone();

    for _ in 0..sweeps {
        for rank in 1..layers.ranks.len() {
            sort_rank(layers, rank, true, groups);
        }
        for rank in (0..layers.ranks.len() - 1).rev() {
            sort_rank(layers, rank, false, groups);
        }

        let crossings = layers.total_crossings();
        if crossings < best_crossings {
            best_crossings = crossings;
            best_order = layers.ranks.clone();
        }
        if best_crossings == 0 {
            break;
        }
    }

    layers.ranks = best_order;
    best_crossings
}

fn sort_rank(layers: &mut Layers, rank: usize, use_up: bool, groups: &[Option<String>]) {
    if layers.ranks[rank].len() <= 1 {
        return;
    }
    let positions = positions_of(layers);
    let neighbors = if use_up { &layers.up } else { &layers.down };
    let mut keyed: Vec<(f64, Option<&str>, usize, usize)> = layers.ranks[rank]
        .iter()
        .map(|&v| {
            (
                barycenter(v, neighbors, &positions),
                layers.origin[v].and_then(|g| groups[g].as_deref()),
                positions[v],
                v,
            )
        })
        .collect();
    keyed.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    let order: Vec<usize> = keyed.into_iter().map(|(_, _, _, v)| v).collect();
    layers.ranks[rank] = order;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_edge_gets_dummies() {
        // 0 -> 1 -> 2 and 0 -> 2
        let ranks = vec![0, 1, 2];
        let edges = vec![(0, 1), (1, 2), (0, 2)];
        let layers = Layers::build(&[0, 1, 2], &ranks, &edges);
        assert_eq!(layers.origin.len(), 4);
        assert_eq!(layers.origin[3], None);
        assert_eq!(layers.ranks[1], vec![1, 3]);
        assert_eq!(layers.down[0], vec![1, 3]);
        assert_eq!(layers.down[3], vec![2]);
    }

    #[test]
    fn test_count_crossings() {
        let down = vec![vec![3], vec![2], vec![], vec![]];
        assert_eq!(count_crossings(&[0, 1], &[2, 3], &down), 1);
        assert_eq!(count_crossings(&[0, 1], &[3, 2], &down), 0);
    }

    #[test]
    fn test_sweeps_remove_simple_crossing() {
        // a -> d, b -> c with c placed before d
        let ranks = vec![0, 0, 1, 1];
        let edges = vec![(0, 3), (1, 2)];
        let mut layers = Layers::build(&[0, 1, 2, 3], &ranks, &edges);
        assert_eq!(layers.total_crossings(), 1);

        let groups = vec![None; 4];
        let crossings = minimize_crossings(&mut layers, &groups, 4);
        assert_eq!(crossings, 0);
        assert_eq!(layers.ranks[1], vec![3, 2]);
    }
}
