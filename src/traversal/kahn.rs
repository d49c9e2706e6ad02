//! Kahn's algorithm with a pluggable ready-set ordering.

use std::{cmp::Reverse, collections::BinaryHeap};

use petgraph::graph::NodeIndex;

use crate::graph::{Direction, GraphModel};

/// Orders all nodes so that every connection's source precedes its target.
///
/// Among the nodes whose incoming connections are all resolved, the one with
/// the smallest `key` is emitted first. Returns the unresolved nodes, in
/// ascending id order, when the graph has a cycle.
pub(crate) fn kahn_order<K, F>(
    graph: &GraphModel,
    key: F,
) -> Result<Vec<NodeIndex>, Vec<NodeIndex>>
where
    K: Ord,
    F: Fn(NodeIndex) -> K,
{
    let mut unresolved: Vec<usize> = graph.graph().node_indices().map(|idx| graph.in_degree(idx)).collect();

    let mut ready: BinaryHeap<Reverse<(K, NodeIndex)>> = graph
        .graph()
        .node_indices()
        .filter(|idx| unresolved[idx.index()] == 0)
        .map(|idx| Reverse((key(idx), idx)))
        .collect();

    let mut sorted = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((_, idx))) = ready.pop() {
        sorted.push(idx);
        for next in graph.neighbors(idx, Direction::Downstream) {
            let remaining = &mut unresolved[next.index()];
            *remaining -= 1;
            if *remaining == 0 {
                ready.push(Reverse((key(next), next)));
            }
        }
    }

    if sorted.len() == graph.node_count() {
        Ok(sorted)
    } else {
        Err(graph.graph().node_indices().filter(|idx| unresolved[idx.index()] > 0).collect())
    }
}
