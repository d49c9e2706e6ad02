use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    graph::{Direction, NodeId},
    traversal::TraversalEngine,
};

/// Dependents of a node, nested by hop count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub node: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    /// hops from the root
    pub depth: usize,
    /// direct dependents in ascending id order
    pub children: Vec<DependencyTree>,
}

impl DependencyTree {
    /// Number of entries in the tree, the root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}

impl TraversalEngine<'_> {
    /// Builds the tree of nodes downstream of `id`.
    ///
    /// Children stop at `max_depth` hops. A dependent that already appears on
    /// the branch above it closes a cycle and is listed without children.
    /// Fails with `NodeNotFound` for an unknown id.
    pub fn dependency_tree(
        &self,
        id: &str,
        max_depth: Option<usize>,
    ) -> Result<DependencyTree> {
        let root = self.graph.index_of(id)?;
        let mut branch = HashSet::new();
        Ok(self.grow(root, 0, max_depth, &mut branch))
    }

    fn grow(
        &self,
        idx: NodeIndex,
        depth: usize,
        max_depth: Option<usize>,
        branch: &mut HashSet<NodeIndex>,
    ) -> DependencyTree {
        let node = &self.graph.graph()[idx];
        let mut tree = DependencyTree {
            node: node.id.clone(),
            node_type: node.node_type.clone(),
            depth,
            children: Vec::new(),
        };
        if max_depth.is_some_and(|max| depth >= max) || !branch.insert(idx) {
            return tree;
        }

        for next in self.graph.sorted_neighbors(idx, Direction::Downstream) {
            tree.children.push(self.grow(next, depth + 1, max_depth, branch));
        }
        branch.remove(&idx);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{cyclic_graph, sample_graph};

    fn names(tree: &DependencyTree) -> Vec<&str> {
        tree.children.iter().map(|c| c.node.as_str()).collect()
    }

    #[test]
    fn test_dependency_tree() {
        let g = sample_graph();
        let tree = TraversalEngine::new(&g).dependency_tree("N1", None).unwrap();
        assert_eq!(tree.node_type, "Read");
        assert_eq!(names(&tree), vec!["N2"]);
        assert_eq!(names(&tree.children[0]), vec!["N3", "N4"]);
        // N3 is reached twice: directly and through N4.
        assert_eq!(names(&tree.children[0].children[1]), vec!["N3"]);
        assert_eq!(tree.children[0].children[1].children[0].depth, 3);
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn test_dependency_tree_depth_limit() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);
        let tree = engine.dependency_tree("N1", Some(1)).unwrap();
        assert_eq!(tree.size(), 2);
        assert!(tree.children[0].children.is_empty());
        assert_eq!(engine.dependency_tree("N1", Some(0)).unwrap().size(), 1);
        assert!(engine.dependency_tree("X", None).is_err());
    }

    #[test]
    fn test_dependency_tree_stops_on_cycle() {
        let g = cyclic_graph();
        let tree = TraversalEngine::new(&g).dependency_tree("N1", None).unwrap();
        // N1 -> N2 -> {N3 -> N1, N4 -> N3 -> N1}
        assert_eq!(tree.size(), 7);
        let back = &tree.children[0].children[0].children[0];
        assert_eq!(back.node, "N1");
        assert!(back.children.is_empty());

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "Merge");
    }
}
