//! Coordinate assignment for ordered ranks.

use super::ordering::Layers;
use super::{LayoutConfig, LayoutDirection, NodeSize};
use crate::model::Position;

pub(super) struct Placed {
    /// `(store_index, top-left corner)` for every real vertex.
    pub positions: Vec<(usize, Position)>,
    /// Extent across ranks (width for top-down).
    pub cross: f64,
    /// Extent along ranks (height for top-down).
    pub main: f64,
}

fn split(size: NodeSize, direction: LayoutDirection) -> (f64, f64) {
    match direction {
        LayoutDirection::TopDown => (size.width, size.height),
        LayoutDirection::LeftRight => (size.height, size.width),
    }
}

/// Places one component with its cross axis starting at `cross_origin`.
/// Every rank is centred on the widest rank.
pub(super) fn place(
    layers: &Layers,
    sizes: &[NodeSize],
    config: &LayoutConfig,
    cross_origin: f64,
) -> Placed {
    let size_of = |v: usize| -> (f64, f64) {
        match layers.origin[v] {
            Some(g) => split(sizes[g], config.direction),
            None => (0.0, 0.0),
        }
    };

    let rank_extent: Vec<f64> = layers
        .ranks
        .iter()
        .map(|rank| {
            let sum: f64 = rank.iter().map(|&v| size_of(v).0).sum();
            sum + config.node_separation * rank.len().saturating_sub(1) as f64
        })
        .collect();
    let cross = rank_extent.iter().copied().fold(0.0, f64::max);

    let mut positions = Vec::new();
    let mut main_cursor = 0.0;
    for (rank, extent) in layers.ranks.iter().zip(&rank_extent) {
        let mut cross_cursor = cross_origin + (cross - extent) / 2.0;
        let mut thickness: f64 = 0.0;
        for &v in rank {
            let (along, across) = size_of(v);
            if let Some(g) = layers.origin[v] {
                let position = match config.direction {
                    LayoutDirection::TopDown => Position::new(cross_cursor, main_cursor),
                    LayoutDirection::LeftRight => Position::new(main_cursor, cross_cursor),
                };
                positions.push((g, position));
            }
            cross_cursor += along + config.node_separation;
            thickness = thickness.max(across);
        }
        main_cursor += thickness + config.rank_separation;
    }

    let main = (main_cursor - config.rank_separation).max(0.0);
    Placed {
        positions,
        cross,
        main,
    }
}
