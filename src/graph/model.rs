//! Validated graph snapshot backed by a petgraph arena.
//!
//! Nodes are inserted into the underlying [`DiGraph`] in ascending id order, so
//! comparing two [`NodeIndex`] values compares their ids. The algorithms rely on
//! this for their deterministic tie-breaks.

use std::collections::{BTreeMap, HashSet};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use tracing::debug;

use crate::{
    NodeGraphError, Result,
    graph::{Connection, ConnectionId, Direction, Node, NodeId},
    model::GraphSnapshot,
};

/// Immutable, validated snapshot of a node graph.
///
/// The snapshot maintains:
/// - Nodes keyed by id, with their input slots and output ports resolved
/// - Connections in construction order
/// - Forward and reverse adjacency, computed once
///
/// It is `Send + Sync` and never mutated after construction, so any number of
/// callers may analyze the same snapshot concurrently.
#[derive(Debug, Clone)]
pub struct GraphModel {
    graph: DiGraph<Node, Connection>,
    index: BTreeMap<NodeId, NodeIndex>,
    /// Outgoing connections per node, in construction order.
    outgoing: Vec<Vec<EdgeIndex>>,
    /// Incoming connections per node, in construction order.
    incoming: Vec<Vec<EdgeIndex>>,
}

impl GraphModel {
    /// Builds and validates a snapshot.
    ///
    /// Fails with `DuplicateNode` on a repeated id, `DanglingReference` when a
    /// connection names an unknown node, port or slot, and `DuplicateEdge` when
    /// two connections target the same input slot.
    pub fn new(
        nodes: Vec<Node>,
        connections: Vec<Connection>,
    ) -> Result<Self> {
        {
            let mut seen = HashSet::with_capacity(nodes.len());
            for node in nodes.iter() {
                if !seen.insert(node.id.as_str()) {
                    return Err(NodeGraphError::DuplicateNode(node.id.clone()));
                }
            }
        }

        let mut nodes = nodes;
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph: DiGraph<Node, Connection> = DiGraph::with_capacity(nodes.len(), connections.len());
        let mut index = BTreeMap::new();
        for mut node in nodes {
            node.inputs.iter_mut().for_each(|s| s.connection = None);
            node.outputs.iter_mut().for_each(|o| o.connections.clear());
            let nid = node.id.clone();
            let idx = graph.add_node(node);
            index.insert(nid, idx);
        }

        let mut outgoing = vec![Vec::new(); graph.node_count()];
        let mut incoming = vec![Vec::new(); graph.node_count()];

        for conn in connections {
            let source = *index
                .get(&conn.source)
                .ok_or_else(|| NodeGraphError::DanglingReference(format!("connection {} references unknown source node {}", conn, conn.source)))?;
            let target = *index
                .get(&conn.target)
                .ok_or_else(|| NodeGraphError::DanglingReference(format!("connection {} references unknown target node {}", conn, conn.target)))?;

            if !graph[source].has_port(conn.source_port) {
                return Err(NodeGraphError::DanglingReference(format!(
                    "connection {} references unknown output port {} of {}",
                    conn, conn.source_port, conn.source
                )));
            }

            let slot = graph[target].inputs.get(conn.target_slot).ok_or_else(|| {
                NodeGraphError::DanglingReference(format!("connection {} references unknown input slot {} of {}", conn, conn.target_slot, conn.target))
            })?;
            if slot.connection.is_some() {
                return Err(NodeGraphError::DuplicateEdge {
                    node: conn.target.clone(),
                    slot: conn.target_slot,
                });
            }

            let (port, slot_idx) = (conn.source_port, conn.target_slot);
            let edge = graph.add_edge(source, target, conn);
            let cid: ConnectionId = edge.index();
            if let Some(s) = graph[target].slot_mut(slot_idx) {
                s.connection = Some(cid);
            }
            if let Some(p) = graph[source].port_mut(port) {
                p.connections.push(cid);
            }
            outgoing[source.index()].push(edge);
            incoming[target.index()].push(edge);
        }

        debug!("graph snapshot built: {} nodes, {} connections", graph.node_count(), graph.edge_count());

        Ok(Self {
            graph,
            index,
            outgoing,
            incoming,
        })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id)
    }

    /// get node by id
    pub fn node(
        &self,
        id: &str,
    ) -> Result<&Node> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.index.keys()
    }

    /// All connections in construction order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_weights()
    }

    /// get connection by id
    pub fn connection(
        &self,
        id: ConnectionId,
    ) -> Option<&Connection> {
        self.graph.edge_weight(EdgeIndex::new(id))
    }

    /// Connections leaving `id`, in construction order.
    pub fn outgoing(
        &self,
        id: &str,
    ) -> Result<Vec<&Connection>> {
        let idx = self.index_of(id)?;
        Ok(self.outgoing[idx.index()].iter().map(|e| &self.graph[*e]).collect())
    }

    /// Connections entering `id`, in construction order.
    pub fn incoming(
        &self,
        id: &str,
    ) -> Result<Vec<&Connection>> {
        let idx = self.index_of(id)?;
        Ok(self.incoming[idx.index()].iter().map(|e| &self.graph[*e]).collect())
    }

    /// Nodes without incoming connections.
    pub fn roots(&self) -> Vec<NodeId> {
        self.graph.node_indices().filter(|idx| self.incoming[idx.index()].is_empty()).map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// Nodes without outgoing connections.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.graph.node_indices().filter(|idx| self.outgoing[idx.index()].is_empty()).map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// Nodes whose type makes them render targets.
    pub fn render_targets(&self) -> Vec<NodeId> {
        self.nodes().filter(|n| n.is_render_target()).map(|n| n.id.clone()).collect()
    }

    pub(crate) fn index_of(
        &self,
        id: &str,
    ) -> Result<NodeIndex> {
        self.index.get(id).copied().ok_or_else(|| NodeGraphError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn id_of(
        &self,
        idx: NodeIndex,
    ) -> &NodeId {
        &self.graph[idx].id
    }

    pub(crate) fn graph(&self) -> &DiGraph<Node, Connection> {
        &self.graph
    }

    pub(crate) fn out_degree(
        &self,
        idx: NodeIndex,
    ) -> usize {
        self.outgoing[idx.index()].len()
    }

    pub(crate) fn in_degree(
        &self,
        idx: NodeIndex,
    ) -> usize {
        self.incoming[idx.index()].len()
    }

    /// Neighbors of `idx` in connection enumeration order. Repeated neighbors
    /// (parallel connections) are kept.
    pub(crate) fn neighbors(
        &self,
        idx: NodeIndex,
        direction: Direction,
    ) -> Vec<NodeIndex> {
        let forward = self.outgoing[idx.index()].iter().map(|e| self.graph.edge_endpoints(*e).map(|(_, t)| t));
        let backward = self.incoming[idx.index()].iter().map(|e| self.graph.edge_endpoints(*e).map(|(s, _)| s));
        match direction {
            Direction::Downstream => forward.flatten().collect(),
            Direction::Upstream => backward.flatten().collect(),
            Direction::Both => forward.chain(backward).flatten().collect(),
        }
    }

    /// Neighbors of `idx` deduplicated and in ascending id order.
    pub(crate) fn sorted_neighbors(
        &self,
        idx: NodeIndex,
        direction: Direction,
    ) -> Vec<NodeIndex> {
        let mut neighbors = self.neighbors(idx, direction);
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }
}

impl TryFrom<&GraphSnapshot> for GraphModel {
    type Error = NodeGraphError;

    fn try_from(snapshot: &GraphSnapshot) -> Result<Self> {
        let nodes = snapshot.nodes.iter().map(Node::from).collect();

        let mut connections = Vec::new();
        for record in snapshot.nodes.iter() {
            let mut outputs: Vec<_> = record.outputs.iter().collect();
            outputs.sort_by_key(|o| o.port);
            for output in outputs {
                for target in output.targets.iter() {
                    connections.push(Connection::new(record.id.clone(), output.port, target.node_id.clone(), target.slot));
                }
            }
        }

        GraphModel::new(nodes, connections)
    }
}
