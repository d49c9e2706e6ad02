//! Structural analysis of a [`GraphModel`]: cycles, islands, paths and depth.
//!
//! Everything here is recomputed on each call from the immutable snapshot.

mod centrality;
mod stats;

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::{algo::tarjan_scc, graph::NodeIndex, unionfind::UnionFind};
use tracing::warn;

pub use stats::{GraphStatistics, StructureReport};

use crate::{
    NodeGraphError, Result,
    graph::{Direction, GraphModel, NodeId},
    traversal::kahn_order,
};

/// Read-only analyzer bound to one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GraphAnalyzer<'g> {
    graph: &'g GraphModel,
}

impl<'g> GraphAnalyzer<'g> {
    pub fn new(graph: &'g GraphModel) -> Self {
        Self {
            graph,
        }
    }

    /// Reports every cycle of the graph.
    ///
    /// Each strongly connected component with more than one node, and each
    /// node with a self-loop, is reported once. Members are listed in
    /// depth-first discovery order starting from the component's smallest id,
    /// so every reported sequence starts on a node that lies on a directed
    /// cycle with all the others. Cycles are sorted by their first node.
    pub fn find_cycles(&self) -> Vec<Vec<NodeId>> {
        let graph = self.graph.graph();
        let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.neighbors(scc[0], Direction::Downstream).contains(&scc[0]))
            .map(|scc| self.discovery_order(&scc))
            .collect();
        cycles.sort();

        if !cycles.is_empty() {
            warn!("graph has {} cycle(s)", cycles.len());
        }

        cycles.into_iter().map(|cycle| self.ids(cycle)).collect()
    }

    /// `true` when the graph has no cycle.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycles().is_empty()
    }

    /// Partitions the nodes into islands, ignoring connection direction.
    ///
    /// Each island is sorted by id and islands are ordered by their smallest id.
    pub fn islands(&self) -> Vec<Vec<NodeId>> {
        let graph = self.graph.graph();
        let mut sets = UnionFind::<usize>::new(graph.node_count());
        for edge in graph.edge_indices() {
            if let Some((source, target)) = graph.edge_endpoints(edge) {
                sets.union(source.index(), target.index());
            }
        }

        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut islands: Vec<Vec<NodeId>> = Vec::new();
        for (idx, label) in sets.into_labeling().into_iter().enumerate() {
            let slot = *slots.entry(label).or_insert_with(|| {
                islands.push(Vec::new());
                islands.len() - 1
            });
            islands[slot].push(self.graph.id_of(NodeIndex::new(idx)).clone());
        }
        islands
    }

    /// Shortest path from `source` to `target`, counted in connections.
    ///
    /// Breadth-first search expanding neighbors in ascending id order, so the
    /// lexicographically smallest of several shortest paths wins. Returns
    /// `Ok(None)` when `target` is unreachable.
    pub fn find_path(
        &self,
        source: &str,
        target: &str,
        direction: Direction,
    ) -> Result<Option<Vec<NodeId>>> {
        let from = self.graph.index_of(source)?;
        let to = self.graph.index_of(target)?;

        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(parent) = parents.get(&cursor) {
                    path.push(*parent);
                    cursor = *parent;
                }
                path.reverse();
                return Ok(Some(self.ids(path)));
            }
            for next in self.graph.sorted_neighbors(current, direction) {
                if visited.insert(next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        Ok(None)
    }

    /// Enumerates simple downstream paths from `source` to `target`.
    ///
    /// Stops after `max_paths` paths and ignores paths longer than
    /// `max_length` nodes. Paths come out in depth-first order.
    pub fn find_all_paths(
        &self,
        source: &str,
        target: &str,
        max_paths: usize,
        max_length: usize,
    ) -> Result<Vec<Vec<NodeId>>> {
        let from = self.graph.index_of(source)?;
        let to = self.graph.index_of(target)?;

        let mut paths = Vec::new();
        let mut path = vec![from];
        let mut on_path = HashSet::from([from]);
        self.collect_paths(to, max_paths, max_length, &mut path, &mut on_path, &mut paths);

        Ok(paths.into_iter().map(|p| self.ids(p)).collect())
    }

    fn collect_paths(
        &self,
        to: NodeIndex,
        max_paths: usize,
        max_length: usize,
        path: &mut Vec<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
        paths: &mut Vec<Vec<NodeIndex>>,
    ) {
        if paths.len() >= max_paths || path.len() > max_length {
            return;
        }
        let Some(&current) = path.last() else {
            return;
        };
        if current == to {
            paths.push(path.clone());
            return;
        }
        for next in self.graph.neighbors(current, Direction::Downstream) {
            if on_path.insert(next) {
                path.push(next);
                self.collect_paths(to, max_paths, max_length, path, on_path, paths);
                path.pop();
                on_path.remove(&next);
            }
        }
    }

    /// Longest chain of upstream connections ending at each node.
    ///
    /// Fails with `Cycle` on a cyclic graph.
    pub fn depths(&self) -> Result<HashMap<NodeId, usize>> {
        let depth = self.depth_table()?;
        Ok(self.graph.graph().node_indices().map(|idx| (self.graph.id_of(idx).clone(), depth[idx.index()])).collect())
    }

    /// Dependency depth of a single node: 0 for roots.
    pub fn dependency_depth(
        &self,
        id: &str,
    ) -> Result<usize> {
        let idx = self.graph.index_of(id)?;
        Ok(self.depth_table()?[idx.index()])
    }

    /// Nodes grouped by dependency depth, each level sorted by id.
    pub fn levels(&self) -> Result<Vec<Vec<NodeId>>> {
        let depth = self.depth_table()?;
        let mut levels: Vec<Vec<NodeId>> = vec![Vec::new(); depth.iter().max().map_or(0, |d| d + 1)];
        for idx in self.graph.graph().node_indices() {
            levels[depth[idx.index()]].push(self.graph.id_of(idx).clone());
        }
        Ok(levels)
    }

    /// Longest dependency chain in the graph, by node count.
    ///
    /// Among chains of equal length the one ending on the smallest id wins,
    /// and each step prefers the smallest predecessor id.
    pub fn critical_path(&self) -> Result<Vec<NodeId>> {
        let order = self.dag_order()?;

        let count = self.graph.node_count();
        let mut length = vec![1usize; count];
        let mut pred: Vec<Option<NodeIndex>> = vec![None; count];
        for idx in order.iter() {
            for prev in self.graph.sorted_neighbors(*idx, Direction::Upstream) {
                if length[prev.index()] + 1 > length[idx.index()] {
                    length[idx.index()] = length[prev.index()] + 1;
                    pred[idx.index()] = Some(prev);
                }
            }
        }

        let Some(mut end) = self.graph.graph().node_indices().rev().max_by_key(|idx| length[idx.index()]) else {
            return Ok(Vec::new());
        };

        let mut path = vec![end];
        while let Some(prev) = pred[end.index()] {
            path.push(prev);
            end = prev;
        }
        path.reverse();
        Ok(self.ids(path))
    }

    fn dag_order(&self) -> Result<Vec<NodeIndex>> {
        kahn_order(self.graph, |idx| idx).map_err(|_| NodeGraphError::Cycle(self.find_cycles().into_iter().next().unwrap_or_default()))
    }

    fn depth_table(&self) -> Result<Vec<usize>> {
        let mut depth = vec![0usize; self.graph.node_count()];
        for idx in self.dag_order()? {
            for next in self.graph.neighbors(idx, Direction::Downstream) {
                depth[next.index()] = depth[next.index()].max(depth[idx.index()] + 1);
            }
        }
        Ok(depth)
    }

    fn discovery_order(
        &self,
        scc: &[NodeIndex],
    ) -> Vec<NodeIndex> {
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let Some(&start) = scc.iter().min() else {
            return Vec::new();
        };

        let mut order = Vec::with_capacity(scc.len());
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            order.push(idx);
            for next in self.graph.neighbors(idx, Direction::Downstream).into_iter().rev() {
                if members.contains(&next) && !seen.contains(&next) {
                    stack.push(next);
                }
            }
        }
        order
    }

    fn ids(
        &self,
        indices: Vec<NodeIndex>,
    ) -> Vec<NodeId> {
        indices.into_iter().map(|idx| self.graph.id_of(idx).clone()).collect()
    }
}
