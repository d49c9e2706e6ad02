use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    graph::ConnectionId,
    model::{NodeRecord, Position},
};

/// node id
pub type NodeId = String;

/// Role classification derived from a node's type tag.
///
/// Algorithms never branch on this; it only feeds capability queries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Read,
    Write,
    Group,
    Other,
}

impl NodeKind {
    pub fn from_type(node_type: &str) -> Self {
        match node_type {
            "Read" => NodeKind::Read,
            "Write" => NodeKind::Write,
            "Group" | "Gizmo" => NodeKind::Group,
            _ => NodeKind::Other,
        }
    }
}

/// Input slot of a node. Holds at most one incoming connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    pub index: usize,
    pub connection: Option<ConnectionId>,
}

/// Output port of a node. May feed any number of input slots.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    pub index: usize,
    pub connections: Vec<ConnectionId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// node id
    pub id: NodeId,
    /// opaque type tag, e.g. `Blur` or `Write`
    pub node_type: String,
    /// position hint, never read by the algorithms
    pub position: Position,
    /// input slots in index order
    pub inputs: Vec<InputSlot>,
    /// output ports in index order
    pub outputs: Vec<OutputPort>,
}

impl Node {
    /// Creates a node with `input_count` empty slots and a single output port 0.
    pub fn new(
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        input_count: usize,
    ) -> Self {
        Self::with_ports(id, node_type, input_count, [0])
    }

    pub fn with_ports(
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        input_count: usize,
        ports: impl IntoIterator<Item = usize>,
    ) -> Self {
        let ports: BTreeSet<usize> = ports.into_iter().collect();
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            inputs: (0..input_count)
                .map(|index| InputSlot {
                    index,
                    connection: None,
                })
                .collect(),
            outputs: ports
                .into_iter()
                .map(|index| OutputPort {
                    index,
                    connections: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn at(
        mut self,
        position: Position,
    ) -> Self {
        self.position = position;
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_type(&self.node_type)
    }

    /// Whether jobs bound to this node produce rendered output.
    pub fn is_render_target(&self) -> bool {
        self.kind() == NodeKind::Write
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn has_port(
        &self,
        port: usize,
    ) -> bool {
        self.outputs.iter().any(|o| o.index == port)
    }

    /// Connected inputs over total slots.
    pub fn connected_inputs(&self) -> usize {
        self.inputs.iter().filter(|s| s.connection.is_some()).count()
    }

    pub(crate) fn slot_mut(
        &mut self,
        slot: usize,
    ) -> Option<&mut InputSlot> {
        self.inputs.get_mut(slot)
    }

    pub(crate) fn port_mut(
        &mut self,
        port: usize,
    ) -> Option<&mut OutputPort> {
        self.outputs.iter_mut().find(|o| o.index == port)
    }
}

impl From<&NodeRecord> for Node {
    fn from(record: &NodeRecord) -> Self {
        Node::with_ports(record.id.clone(), record.node_type.clone(), record.input_count, record.outputs.iter().map(|o| o.port)).at(record.position)
    }
}
