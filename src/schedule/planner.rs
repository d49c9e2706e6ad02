//! List scheduling restricted to ordering output.

use std::{cmp::Reverse, collections::HashMap};

use petgraph::graph::NodeIndex;

use crate::{
    Result, TraversalEngine,
    graph::{GraphModel, NodeId},
    queue::RenderJob,
    traversal::kahn_order,
};

/// Execution order honoring dependencies first and priority hints second.
///
/// For every connection `u -> v`, `u` precedes `v`. Among the nodes whose
/// dependencies are all resolved, higher priority goes first, then lower
/// submission sequence, then lower node id.
#[derive(Debug, Clone)]
pub struct ExecutionScheduler<'g> {
    graph: &'g GraphModel,
    priorities: HashMap<NodeIndex, i64>,
    sequences: HashMap<NodeIndex, u64>,
}

impl<'g> ExecutionScheduler<'g> {
    pub fn new(graph: &'g GraphModel) -> Self {
        Self {
            graph,
            priorities: HashMap::new(),
            sequences: HashMap::new(),
        }
    }

    /// Sets the priority hint of a node. Nodes without a hint have priority 0.
    pub fn priority(
        mut self,
        id: &str,
        priority: i64,
    ) -> Result<Self> {
        let idx = self.graph.index_of(id)?;
        self.priorities.insert(idx, priority);
        Ok(self)
    }

    /// Sets the submission sequence of a node, used before the node id tie-break.
    pub fn sequence(
        mut self,
        id: &str,
        sequence: u64,
    ) -> Result<Self> {
        let idx = self.graph.index_of(id)?;
        self.sequences.insert(idx, sequence);
        Ok(self)
    }

    /// Dependency-valid order of every node. Identical across calls.
    ///
    /// Fails with `Cycle` when the graph is not a DAG.
    pub fn execution_order(&self) -> Result<Vec<NodeId>> {
        Ok(self.order_indices()?.into_iter().map(|idx| self.graph.id_of(idx).clone()).collect())
    }

    /// Orders job candidates by their node's place in the execution order.
    ///
    /// Each node inherits the highest priority and earliest position of the
    /// jobs bound to it. Jobs on the same node keep priority then input order.
    /// Fails with `NodeNotFound` if a job references an unknown node.
    pub fn order_jobs(
        &self,
        jobs: Vec<RenderJob>,
    ) -> Result<Vec<RenderJob>> {
        let mut hinted = self.clone();
        let mut bound = Vec::with_capacity(jobs.len());
        for (position, job) in jobs.into_iter().enumerate() {
            let idx = self.graph.index_of(&job.node_id)?;
            let priority = hinted.priorities.entry(idx).or_insert(job.priority);
            *priority = (*priority).max(job.priority);
            hinted.sequences.entry(idx).or_insert(position as u64);
            bound.push((idx, position, job));
        }

        let rank: HashMap<NodeIndex, usize> = hinted.order_indices()?.into_iter().enumerate().map(|(rank, idx)| (idx, rank)).collect();
        bound.sort_by_key(|(idx, position, job)| (rank[idx], Reverse(job.priority), *position));

        Ok(bound.into_iter().map(|(_, _, job)| job).collect())
    }

    fn order_indices(&self) -> Result<Vec<NodeIndex>> {
        kahn_order(self.graph, |idx| {
            let priority = self.priorities.get(&idx).copied().unwrap_or(0);
            let sequence = self.sequences.get(&idx).copied().unwrap_or(u64::MAX);
            (Reverse(priority), sequence, idx)
        })
        .map_err(|_| TraversalEngine::new(self.graph).cycle_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        NodeGraphError,
        graph::{
            Connection, Node,
            fixtures::{cyclic_graph, sample_graph},
        },
        model::JobRecord,
    };

    #[test]
    fn test_matches_topological_sort_without_hints() {
        let g = sample_graph();
        let scheduler = ExecutionScheduler::new(&g);
        assert_eq!(scheduler.execution_order().unwrap(), TraversalEngine::new(&g).topological_sort().unwrap());
    }

    #[test]
    fn test_priority_breaks_ready_ties() {
        let g = sample_graph();
        let order = ExecutionScheduler::new(&g).priority("N5", 10).unwrap().execution_order().unwrap();
        assert_eq!(order, vec!["N5", "N1", "N2", "N4", "N3"]);

        // Priority never overrides a dependency.
        let order = ExecutionScheduler::new(&g).priority("N3", 99).unwrap().execution_order().unwrap();
        assert_eq!(order, vec!["N1", "N2", "N4", "N3", "N5"]);
    }

    #[test]
    fn test_sequence_before_node_id() {
        let nodes = vec![Node::new("a", "Read", 0), Node::new("b", "Read", 0), Node::new("c", "Read", 0)];
        let g = GraphModel::new(nodes, vec![]).unwrap();
        let order = ExecutionScheduler::new(&g).sequence("c", 1).unwrap().sequence("b", 2).unwrap().execution_order().unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_order_is_idempotent() {
        let g = sample_graph();
        let scheduler = ExecutionScheduler::new(&g).priority("N4", 3).unwrap();
        let first = scheduler.execution_order().unwrap();
        for _ in 0..5 {
            assert_eq!(scheduler.execution_order().unwrap(), first);
        }
    }

    #[test]
    fn test_dependency_validity() {
        let nodes = (0..6).map(|i| Node::new(format!("n{i}"), "Merge", 2)).collect();
        let connections = vec![
            Connection::link("n5", "n0", 0),
            Connection::link("n4", "n0", 1),
            Connection::link("n0", "n1", 0),
            Connection::link("n3", "n2", 0),
        ];
        let g = GraphModel::new(nodes, connections).unwrap();
        let order = ExecutionScheduler::new(&g).priority("n1", 50).unwrap().priority("n2", 40).unwrap().execution_order().unwrap();
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        for conn in g.connections() {
            assert!(pos(&conn.source) < pos(&conn.target));
        }
    }

    #[test]
    fn test_cycle_error() {
        let g = cyclic_graph();
        assert!(matches!(ExecutionScheduler::new(&g).execution_order(), Err(NodeGraphError::Cycle(_))));
    }

    #[test]
    fn test_order_jobs() {
        let g = sample_graph();
        let jobs = vec![
            RenderJob::try_from(JobRecord::new("N3", 1, 10)).unwrap(),
            RenderJob::try_from(JobRecord::new("N5", 1, 10).priority(2)).unwrap(),
            RenderJob::try_from(JobRecord::new("N1", 1, 10)).unwrap(),
            RenderJob::try_from(JobRecord::new("N3", 1, 10).priority(4)).unwrap(),
        ];
        let ordered = ExecutionScheduler::new(&g).order_jobs(jobs).unwrap();
        let summary: Vec<(&str, i64)> = ordered.iter().map(|j| (j.node_id.as_str(), j.priority)).collect();
        assert_eq!(summary, vec![("N5", 2), ("N1", 0), ("N3", 4), ("N3", 0)]);

        let unknown = vec![RenderJob::try_from(JobRecord::new("X", 1, 1)).unwrap()];
        assert!(matches!(ExecutionScheduler::new(&g).order_jobs(unknown), Err(NodeGraphError::NodeNotFound(_))));
    }
}
