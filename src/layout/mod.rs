//! Layered auto-layout.
//!
//! Positions are derived from topology and node sizes only, never from
//! current positions, so laying out an unchanged graph twice yields the same
//! coordinates. Steps:
//!
//! 1. reverse DFS back edges to make the graph acyclic
//! 2. rank nodes by longest path from the sources
//! 3. order each rank with barycenter sweeps, keeping the fewest crossings
//! 4. assign coordinates, centring each rank on the widest one
//!
//! Weakly connected components are laid out separately, side by side in the
//! order of their first node.

mod ordering;
mod placement;
mod ranking;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph_store::GraphStore;
use crate::model::{NodePosition, Position};

use ordering::{minimize_crossings, Layers};
use ranking::{break_cycles, components, longest_path_ranks, NodeGraph};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    /// Ranks stacked vertically
    #[default]
    TopDown,
    /// Ranks stacked horizontally
    LeftRight,
}

impl FromStr for LayoutDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top_down" | "topdown" | "tb" | "td" => Ok(LayoutDirection::TopDown),
            "left_right" | "leftright" | "lr" => Ok(LayoutDirection::LeftRight),
            other => Err(format!("Unknown layout direction: {other}")),
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutDirection::TopDown => f.write_str("top_down"),
            LayoutDirection::LeftRight => f.write_str("left_right"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

impl NodeSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for NodeSize {
    fn default() -> Self {
        Self::new(220.0, 96.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: LayoutDirection,
    /// Gap between neighbours in one rank
    pub node_separation: f64,
    /// Gap between consecutive ranks
    pub rank_separation: f64,
    /// Gap between disconnected components
    pub component_separation: f64,
    /// Box size of nodes without an explicit size
    pub default_size: NodeSize,
    /// Down-and-up barycenter passes
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopDown,
            node_separation: 40.0,
            rank_separation: 80.0,
            component_separation: 120.0,
            default_size: NodeSize::default(),
            sweeps: 4,
        }
    }
}

/// Computed positions in store order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    pub positions: IndexMap<String, Position>,
    pub width: f64,
    pub height: f64,
    /// Edge crossings left after ordering, counted over ranked edges
    pub crossings: usize,
}

impl LayoutResult {
    pub fn node_positions(&self) -> Vec<NodePosition> {
        self.positions
            .iter()
            .map(|(id, position)| NodePosition::new(id.clone(), *position))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out every node; `sizes` overrides the default box per node id.
    pub fn compute(&self, store: &GraphStore, sizes: &HashMap<String, NodeSize>) -> LayoutResult {
        if store.is_empty() {
            return LayoutResult::default();
        }

        let graph = NodeGraph::from_store(store);
        let node_sizes: Vec<NodeSize> = graph
            .ids
            .iter()
            .map(|id| sizes.get(id).copied().unwrap_or(self.config.default_size))
            .collect();
        let edges = break_cycles(&graph);
        let ranks = longest_path_ranks(graph.len(), &edges);

        let mut placed: Vec<Option<Position>> = vec![None; graph.len()];
        let mut cross_cursor = 0.0;
        let mut main_extent: f64 = 0.0;
        let mut crossings = 0;
        for members in components(graph.len(), &edges) {
            let mut layers = Layers::build(&members, &ranks, &edges);
            crossings += minimize_crossings(&mut layers, &graph.groups, self.config.sweeps);

            let component = placement::place(&layers, &node_sizes, &self.config, cross_cursor);
            for (index, position) in component.positions {
                placed[index] = Some(position);
            }
            cross_cursor += component.cross + self.config.component_separation;
            main_extent = main_extent.max(component.main);
        }
        let cross_extent = (cross_cursor - self.config.component_separation).max(0.0);

        let positions: IndexMap<String, Position> = graph
            .ids
            .iter()
            .zip(placed)
            .filter_map(|(id, position)| position.map(|p| (id.clone(), p)))
            .collect();
        let (width, height) = match self.config.direction {
            LayoutDirection::TopDown => (cross_extent, main_extent),
            LayoutDirection::LeftRight => (main_extent, cross_extent),
        };

        tracing::debug!(
            nodes = positions.len(),
            crossings,
            width,
            height,
            "Computed layout"
        );
        LayoutResult {
            positions,
            width,
            height,
            crossings,
        }
    }

    /// Crossings the computed layout leaves.
    pub fn crossing_count(&self, store: &GraphStore) -> usize {
        self.compute(store, &HashMap::new()).crossings
    }
}
