use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    analysis::GraphAnalyzer,
    graph::{Direction, GraphModel, NodeId},
};

/// Aggregate statistics of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_connections: usize,
    /// incoming connection count -> number of nodes
    pub fan_in: BTreeMap<usize, usize>,
    /// outgoing connection count -> number of nodes
    pub fan_out: BTreeMap<usize, usize>,
    pub fan_in_max: usize,
    pub fan_out_max: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub island_count: usize,
    pub island_sizes: Vec<usize>,
    pub cycle_count: usize,
    pub roots: usize,
    pub leaves: usize,
    /// nodes with more than one connected input
    pub merge_points: usize,
    /// nodes feeding more than one distinct dependent
    pub branch_points: usize,
}

/// Structural report handed to callers for printing or serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub total_nodes: usize,
    pub total_connections: usize,
    pub islands: Vec<Vec<NodeId>>,
    pub cycles: Vec<Vec<NodeId>>,
    pub fan_in_max: usize,
    pub fan_out_max: usize,
}

impl StructureReport {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl GraphAnalyzer<'_> {
    /// Computes aggregate statistics. Nothing is cached between calls.
    pub fn statistics(&self) -> GraphStatistics {
        let graph: &GraphModel = self.graph;
        let mut fan_in = BTreeMap::new();
        let mut fan_out = BTreeMap::new();
        let mut nodes_by_type = BTreeMap::new();
        let (mut merge_points, mut branch_points) = (0, 0);
        for idx in graph.graph().node_indices() {
            if graph.in_degree(idx) > 1 {
                merge_points += 1;
            }
            if graph.sorted_neighbors(idx, Direction::Downstream).len() > 1 {
                branch_points += 1;
            }
            *fan_in.entry(graph.in_degree(idx)).or_insert(0) += 1;
            *fan_out.entry(graph.out_degree(idx)).or_insert(0) += 1;
            *nodes_by_type.entry(graph.graph()[idx].node_type.clone()).or_insert(0) += 1;
        }

        let islands = self.islands();

        GraphStatistics {
            total_nodes: graph.node_count(),
            total_connections: graph.connection_count(),
            fan_in_max: fan_in.keys().next_back().copied().unwrap_or(0),
            fan_out_max: fan_out.keys().next_back().copied().unwrap_or(0),
            fan_in,
            fan_out,
            nodes_by_type,
            island_count: islands.len(),
            island_sizes: islands.iter().map(|i| i.len()).collect(),
            cycle_count: self.find_cycles().len(),
            roots: graph.roots().len(),
            leaves: graph.leaves().len(),
            merge_points,
            branch_points,
        }
    }

    /// Builds the structural report: counts, islands, cycles and fan maxima.
    pub fn report(&self) -> StructureReport {
        let graph = self.graph;
        let (fan_in_max, fan_out_max) = graph
            .graph()
            .node_indices()
            .fold((0, 0), |(fin, fout), idx| (fin.max(graph.in_degree(idx)), fout.max(graph.out_degree(idx))));

        StructureReport {
            total_nodes: graph.node_count(),
            total_connections: graph.connection_count(),
            islands: self.islands(),
            cycles: self.find_cycles(),
            fan_in_max,
            fan_out_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        Connection, Node,
        fixtures::{cyclic_graph, sample_graph},
    };

    #[test]
    fn test_statistics() {
        let g = sample_graph();
        let stats = GraphAnalyzer::new(&g).statistics();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.total_connections, 4);
        assert_eq!(stats.fan_in_max, 2);
        assert_eq!(stats.fan_out_max, 2);
        assert_eq!(stats.fan_in, BTreeMap::from([(0, 2), (1, 2), (2, 1)]));
        assert_eq!(stats.fan_out, BTreeMap::from([(0, 2), (1, 2), (2, 1)]));
        assert_eq!(stats.island_count, 2);
        assert_eq!(stats.island_sizes, vec![4, 1]);
        assert_eq!(stats.cycle_count, 0);
        assert_eq!(stats.nodes_by_type["Read"], 2);
        assert_eq!(stats.roots, 2);
        assert_eq!(stats.leaves, 2);
        assert_eq!(stats.merge_points, 1);
        assert_eq!(stats.branch_points, 1);
    }

    #[test]
    fn test_branch_points_count_distinct_dependents() {
        // Two connections from a into the same node make a merge point on b, not a branch on a.
        let nodes = vec![Node::new("a", "Read", 0), Node::new("b", "Merge", 2)];
        let g = GraphModel::new(nodes, vec![Connection::link("a", "b", 0), Connection::link("a", "b", 1)]).unwrap();
        let stats = GraphAnalyzer::new(&g).statistics();
        assert_eq!(stats.merge_points, 1);
        assert_eq!(stats.branch_points, 0);
        assert_eq!(stats.fan_out_max, 2);
    }

    #[test]
    fn test_report() {
        let g = cyclic_graph();
        let report = GraphAnalyzer::new(&g).report();
        assert_eq!(report.total_nodes, 5);
        assert_eq!(report.total_connections, 5);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.islands.len(), 2);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["fan_in_max"], 2);
        assert_eq!(json["islands"][1][0], "N5");
    }

    #[test]
    fn test_empty_graph() {
        let g = GraphModel::new(vec![], vec![]).unwrap();
        let stats = GraphAnalyzer::new(&g).statistics();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.island_count, 0);
        assert_eq!(stats.fan_in_max, 0);
    }
}
