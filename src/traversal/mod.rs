//! Generic walks and dependency ordering over a [`GraphModel`].

mod kahn;
mod tree;
mod walk;

use std::collections::BTreeSet;

pub(crate) use kahn::kahn_order;
pub use tree::DependencyTree;
pub use walk::{NodeFilter, Order, TraversalOptions, Walk};

use crate::{
    GraphAnalyzer, NodeGraphError, Result,
    graph::{Direction, GraphModel, NodeId},
};

/// Read-only traversal primitives bound to one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TraversalEngine<'g> {
    graph: &'g GraphModel,
}

impl<'g> TraversalEngine<'g> {
    pub fn new(graph: &'g GraphModel) -> Self {
        Self {
            graph,
        }
    }

    /// Walks the nodes reachable from `start_set`.
    ///
    /// Fails with `NodeNotFound` if any start node is unknown. The returned
    /// walk is lazy and can be replayed with [`Walk::restart`].
    pub fn traverse<I, S>(
        &self,
        start_set: I,
        options: TraversalOptions,
    ) -> Result<Walk<'g>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let starts = start_set.into_iter().map(|id| self.graph.index_of(id.as_ref())).collect::<Result<Vec<_>>>()?;
        Ok(Walk::new(self.graph, starts, options))
    }

    /// Dependency order with ascending node id as the tie-break.
    ///
    /// Fails with `Cycle` carrying one offending cycle when the graph is not a DAG.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>> {
        match kahn_order(self.graph, |idx| idx) {
            Ok(order) => Ok(order.into_iter().map(|idx| self.graph.id_of(idx).clone()).collect()),
            Err(_) => Err(self.cycle_error()),
        }
    }

    /// Nodes upstream of every node in `nodes`.
    pub fn common_ancestors(
        &self,
        nodes: &[&str],
    ) -> Result<Vec<NodeId>> {
        self.common_reachable(nodes, Direction::Upstream)
    }

    /// Nodes downstream of every node in `nodes`.
    pub fn common_descendants(
        &self,
        nodes: &[&str],
    ) -> Result<Vec<NodeId>> {
        self.common_reachable(nodes, Direction::Downstream)
    }

    fn common_reachable(
        &self,
        nodes: &[&str],
        direction: Direction,
    ) -> Result<Vec<NodeId>> {
        let options = TraversalOptions::new(direction, Order::BreadthFirst);

        let mut common: Option<BTreeSet<&NodeId>> = None;
        for nid in nodes {
            // Start one hop out so a node on a cycle counts as its own relative.
            let idx = self.graph.index_of(nid)?;
            let next: Vec<&NodeId> = self.graph.neighbors(idx, direction).into_iter().map(|n| self.graph.id_of(n)).collect();
            let reached: BTreeSet<&NodeId> = self.traverse(next, options.clone())?.collect();
            common = Some(match common {
                Some(acc) => acc.intersection(&reached).copied().collect(),
                None => reached,
            });
        }

        Ok(common.unwrap_or_default().into_iter().cloned().collect())
    }

    pub(crate) fn cycle_error(&self) -> NodeGraphError {
        let cycle = GraphAnalyzer::new(self.graph).find_cycles().into_iter().next().unwrap_or_default();
        NodeGraphError::Cycle(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        Connection, Node,
        fixtures::{cyclic_graph, sample_graph},
    };

    fn ids<'a>(walk: impl Iterator<Item = &'a NodeId>) -> Vec<&'a str> {
        walk.map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_breadth_first_downstream() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);
        let walk = engine.traverse(["N1"], TraversalOptions::default()).unwrap();
        assert_eq!(ids(walk), vec!["N1", "N2", "N3", "N4"]);
    }

    #[test]
    fn test_depth_first_follows_connection_order() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);
        let walk = engine.traverse(["N1"], TraversalOptions::new(Direction::Downstream, Order::DepthFirst)).unwrap();
        // N2's connections are enumerated N2 -> N3 then N2 -> N4.
        assert_eq!(ids(walk), vec!["N1", "N2", "N3", "N4"]);

        let walk = engine.traverse(["N3"], TraversalOptions::new(Direction::Upstream, Order::DepthFirst)).unwrap();
        assert_eq!(ids(walk), vec!["N3", "N2", "N1", "N4"]);
    }

    #[test]
    fn test_upstream_exclude_self_and_depth() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);

        let walk = engine.traverse(["N3"], TraversalOptions::new(Direction::Upstream, Order::BreadthFirst).include_self(false)).unwrap();
        assert_eq!(ids(walk), vec!["N2", "N4", "N1"]);

        let walk = engine.traverse(["N3"], TraversalOptions::new(Direction::Upstream, Order::BreadthFirst).max_depth(1)).unwrap();
        assert_eq!(ids(walk), vec!["N3", "N2", "N4"]);

        let walk = engine.traverse(["N3"], TraversalOptions::new(Direction::Upstream, Order::DepthFirst).max_depth(0)).unwrap();
        assert_eq!(ids(walk), vec!["N3"]);
    }

    #[test]
    fn test_both_directions_and_multiple_starts() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);
        let walk = engine.traverse(["N4"], TraversalOptions::new(Direction::Both, Order::BreadthFirst)).unwrap();
        assert_eq!(ids(walk), vec!["N4", "N2", "N3", "N1"]);

        let walk = engine.traverse(["N5", "N1"], TraversalOptions::default()).unwrap();
        assert_eq!(ids(walk), vec!["N1", "N5", "N2", "N3", "N4"]);
    }

    #[test]
    fn test_filter_prunes_nodes() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);

        // N2 is rejected, so nothing behind it is reached either.
        let options = TraversalOptions::default().filter(|node| node.id != "N2");
        assert_eq!(ids(engine.traverse(["N1"], options).unwrap()), vec!["N1"]);

        let options = TraversalOptions::new(Direction::Upstream, Order::DepthFirst).filter(|node| node.node_type != "Blur");
        assert_eq!(ids(engine.traverse(["N3"], options).unwrap()), vec!["N3", "N2", "N1"]);

        let options = TraversalOptions::default().filter(|node| node.node_type != "Read");
        assert_eq!(engine.traverse(["N1"], options).unwrap().count(), 0);
    }

    #[test]
    fn test_walk_is_restartable() {
        let g = cyclic_graph();
        let engine = TraversalEngine::new(&g);
        let mut walk = engine.traverse(["N2"], TraversalOptions::default()).unwrap();
        let first: Vec<NodeId> = walk.by_ref().cloned().collect();
        walk.restart();
        let second: Vec<NodeId> = walk.cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["N2", "N3", "N4", "N1"]);
    }

    #[test]
    fn test_traverse_unknown_start() {
        let g = sample_graph();
        let err = TraversalEngine::new(&g).traverse(["nope"], TraversalOptions::default()).unwrap_err();
        assert_eq!(err, NodeGraphError::NodeNotFound("nope".into()));
    }

    #[test]
    fn test_topological_sort() {
        let g = sample_graph();
        let order = TraversalEngine::new(&g).topological_sort().unwrap();
        assert_eq!(order, vec!["N1", "N2", "N4", "N3", "N5"]);
    }

    #[test]
    fn test_topological_sort_respects_every_connection() {
        let nodes = (0..8).map(|i| Node::new(format!("n{i}"), "Merge", 2)).collect();
        let connections = vec![
            Connection::link("n7", "n0", 0),
            Connection::link("n6", "n0", 1),
            Connection::link("n0", "n3", 0),
            Connection::link("n5", "n3", 1),
            Connection::link("n3", "n1", 0),
            Connection::link("n2", "n4", 0),
        ];
        let g = GraphModel::new(nodes, connections).unwrap();
        let order = TraversalEngine::new(&g).topological_sort().unwrap();
        assert_eq!(order.len(), g.node_count());
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        for conn in g.connections() {
            assert!(pos(&conn.source) < pos(&conn.target), "{} violated", conn);
        }
    }

    #[test]
    fn test_topological_sort_cycle() {
        let g = cyclic_graph();
        let cycle = match TraversalEngine::new(&g).topological_sort() {
            Err(NodeGraphError::Cycle(cycle)) => cycle,
            other => panic!("expected cycle error, got {other:?}"),
        };
        let members: BTreeSet<&str> = cycle.iter().map(|s| s.as_str()).collect();
        assert_eq!(members, BTreeSet::from(["N1", "N2", "N3", "N4"]));
    }

    #[test]
    fn test_common_ancestors_and_descendants() {
        let g = sample_graph();
        let engine = TraversalEngine::new(&g);
        assert_eq!(engine.common_ancestors(&["N3", "N4"]).unwrap(), vec!["N1", "N2"]);
        assert_eq!(engine.common_descendants(&["N1", "N4"]).unwrap(), vec!["N3"]);
        assert!(engine.common_descendants(&["N1", "N5"]).unwrap().is_empty());
        assert!(engine.common_ancestors(&[]).unwrap().is_empty());
        assert!(matches!(engine.common_ancestors(&["nope"]), Err(NodeGraphError::NodeNotFound(_))));
    }

    #[test]
    fn test_common_ancestors_on_cycle() {
        let g = cyclic_graph();
        let engine = TraversalEngine::new(&g);
        assert_eq!(engine.common_ancestors(&["N1"]).unwrap(), vec!["N1", "N2", "N3", "N4"]);
        assert_eq!(engine.common_descendants(&["N5"]).unwrap(), Vec::<NodeId>::new());
    }
}
