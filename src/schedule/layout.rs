use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    GraphAnalyzer, Result,
    graph::{GraphModel, NodeId},
    model::Position,
};

/// Horizontal and vertical distance between laid out nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    pub x: i64,
    pub y: i64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            x: 100,
            y: 80,
        }
    }
}

/// Position hints placing each dependency level on its own row.
///
/// Row `n` holds the nodes at dependency depth `n`, left to right in id order.
/// The snapshot's own positions are left untouched. Fails with `Cycle` on a
/// cyclic graph.
pub fn hierarchical_layout(
    graph: &GraphModel,
    spacing: Spacing,
) -> Result<BTreeMap<NodeId, Position>> {
    let levels = GraphAnalyzer::new(graph).levels()?;

    let mut positions = BTreeMap::new();
    for (row, level) in levels.into_iter().enumerate() {
        for (column, nid) in level.into_iter().enumerate() {
            positions.insert(nid, Position::new(column as i64 * spacing.x, row as i64 * spacing.y));
        }
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{cyclic_graph, sample_graph};

    #[test]
    fn test_hierarchical_layout() {
        let g = sample_graph();
        let positions = hierarchical_layout(&g, Spacing::default()).unwrap();
        assert_eq!(positions.len(), 5);
        assert_eq!(positions["N1"], Position::new(0, 0));
        assert_eq!(positions["N5"], Position::new(100, 0));
        assert_eq!(positions["N2"], Position::new(0, 80));
        assert_eq!(positions["N3"], Position::new(0, 240));
        // hints only
        assert_eq!(g.node("N3").unwrap().position, Position::default());
    }

    #[test]
    fn test_layout_rejects_cycles() {
        assert!(hierarchical_layout(&cyclic_graph(), Spacing::default()).is_err());
    }
}
