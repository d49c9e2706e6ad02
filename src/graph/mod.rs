//! Immutable graph snapshot.
//!
//! A [`GraphModel`] is built once from node and connection lists, validated,
//! and then handed by shared reference to the analysis and scheduling
//! components. Reflecting a change in the host graph means building a new one.

mod connection;
mod model;
mod node;

pub use connection::{Connection, ConnectionId};
pub use model::GraphModel;
pub use node::{InputSlot, Node, NodeId, NodeKind, OutputPort};

/// Which connections to follow when walking the graph.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Follow incoming connections backward, towards inputs.
    Upstream,
    /// Follow outgoing connections forward, towards dependents.
    #[default]
    Downstream,
    /// Ignore connection direction.
    Both,
}
