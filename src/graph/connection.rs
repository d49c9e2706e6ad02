use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Position of a connection in the snapshot's construction order.
pub type ConnectionId = usize;

/// Directed edge from an output port to an input slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Node the connection leaves.
    pub source: NodeId,
    /// Output port on the source node.
    pub source_port: usize,
    /// Node the connection enters.
    pub target: NodeId,
    /// Input slot on the target node.
    pub target_slot: usize,
}

impl Connection {
    pub fn new(
        source: impl Into<NodeId>,
        source_port: usize,
        target: impl Into<NodeId>,
        target_slot: usize,
    ) -> Self {
        Self {
            source: source.into(),
            source_port,
            target: target.into(),
            target_slot,
        }
    }

    /// Shorthand for a connection from port 0 into `target_slot`.
    pub fn link(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        target_slot: usize,
    ) -> Self {
        Self::new(source, 0, target, target_slot)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl std::fmt::Display for Connection {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}[{}] -> {}[{}]", self.source, self.source_port, self.target, self.target_slot)
    }
}
