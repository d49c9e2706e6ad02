use std::collections::{BTreeMap, VecDeque};

use crate::{
    analysis::GraphAnalyzer,
    graph::{Direction, NodeId},
};

impl GraphAnalyzer<'_> {
    /// Betweenness centrality over downstream shortest paths.
    ///
    /// Every ordered pair of distinct nodes contributes, split evenly across
    /// its shortest paths, to the nodes strictly inside those paths. Scores are
    /// scaled so the most central node has 1.0; a graph without any
    /// intermediate node scores 0.0 everywhere.
    pub fn centrality(&self) -> BTreeMap<NodeId, f64> {
        let count = self.graph.node_count();
        let mut score = vec![0.0f64; count];

        // Brandes' accumulation, one breadth-first search per source.
        for source in self.graph.graph().node_indices() {
            let mut stack = Vec::with_capacity(count);
            let mut preds: Vec<Vec<usize>> = vec![Vec::new(); count];
            let mut paths = vec![0.0f64; count];
            let mut dist: Vec<Option<usize>> = vec![None; count];
            paths[source.index()] = 1.0;
            dist[source.index()] = Some(0);

            let mut queue = VecDeque::from([source]);
            while let Some(v) = queue.pop_front() {
                stack.push(v.index());
                let Some(dv) = dist[v.index()] else {
                    continue;
                };
                for next in self.graph.sorted_neighbors(v, Direction::Downstream) {
                    let w = next.index();
                    if dist[w].is_none() {
                        dist[w] = Some(dv + 1);
                        queue.push_back(next);
                    }
                    if dist[w] == Some(dv + 1) {
                        paths[w] += paths[v.index()];
                        preds[w].push(v.index());
                    }
                }
            }

            let mut dependency = vec![0.0f64; count];
            while let Some(w) = stack.pop() {
                for &v in preds[w].iter() {
                    dependency[v] += paths[v] / paths[w] * (1.0 + dependency[w]);
                }
                if w != source.index() {
                    score[w] += dependency[w];
                }
            }
        }

        let max = score.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            score.iter_mut().for_each(|s| *s /= max);
        }

        self.graph.graph().node_indices().map(|idx| (self.graph.id_of(idx).clone(), score[idx.index()])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, GraphModel, Node, fixtures::sample_graph};

    #[test]
    fn test_centrality_chain_hub() {
        let g = sample_graph();
        let scores = GraphAnalyzer::new(&g).centrality();
        assert_eq!(scores.len(), 5);
        assert_eq!(scores["N2"], 1.0);
        assert_eq!(scores["N1"], 0.0);
        assert_eq!(scores["N4"], 0.0);
        assert_eq!(scores["N5"], 0.0);
    }

    #[test]
    fn test_centrality_splits_parallel_paths() {
        // a -> b -> d and a -> c -> d are equally short; b -> e adds one more path through b.
        let nodes = vec![
            Node::new("a", "Read", 0),
            Node::new("b", "Blur", 1),
            Node::new("c", "Blur", 1),
            Node::new("d", "Merge", 2),
            Node::new("e", "Write", 1),
        ];
        let connections = vec![
            Connection::link("a", "b", 0),
            Connection::link("a", "c", 0),
            Connection::link("b", "d", 0),
            Connection::link("c", "d", 1),
            Connection::link("b", "e", 0),
        ];
        let g = GraphModel::new(nodes, connections).unwrap();
        let scores = GraphAnalyzer::new(&g).centrality();
        // b: half of a->d plus all of a->e; c: half of a->d.
        assert_eq!(scores["b"], 1.0);
        assert!((scores["c"] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(scores["a"], 0.0);
    }

    #[test]
    fn test_centrality_without_intermediates() {
        let g = GraphModel::new(vec![Node::new("a", "Read", 0), Node::new("b", "Blur", 1)], vec![Connection::link("a", "b", 0)]).unwrap();
        let scores = GraphAnalyzer::new(&g).centrality();
        assert!(scores.values().all(|s| *s == 0.0));
        assert!(GraphAnalyzer::new(&GraphModel::new(vec![], vec![]).unwrap()).centrality().is_empty());
    }
}
