//! Error types for Nodegraph.
//!
//! All errors surfaced synchronously by Nodegraph are represented by the
//! `NodeGraphError` enum. Failures reported by an external renderer are not
//! errors of the library: they are recorded on the job as [`RenderExecutionError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::NodeId;

/// Unified error type for all Nodegraph operations.
///
/// None of these variants are fatal: the `GraphModel` or `JobQueue` that
/// produced them stays usable and the caller decides how to recover.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum NodeGraphError {
    /// Two node records share the same id.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// A connection points at a node, output port or input slot that does not exist.
    #[error("dangling reference: {0}")]
    DanglingReference(String),

    /// Two connections target the same input slot.
    #[error("input slot {slot} of node {node} has more than one incoming connection")]
    DuplicateEdge {
        node: NodeId,
        slot: usize,
    },

    /// Ordering was requested on a graph that contains a cycle.
    #[error("graph contains a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<NodeId>),

    /// A query referenced an unknown node.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A queue operation referenced an unknown job.
    #[error("job {0} not found")]
    JobNotFound(String),

    /// Frame range with `start > end` or `step < 1`.
    #[error("invalid frame range: start {start}, end {end}, step {step}")]
    InvalidFrameRange {
        start: i64,
        end: i64,
        step: i64,
    },

    /// A job was submitted with an empty view list.
    #[error("job for node {0} has an empty view list")]
    EmptyViewList(NodeId),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Scheduler misuse (invalid concurrency bound, concurrent runs).
    #[error("{0}")]
    Scheduler(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

/// Failure reported by the external render collaborator for one job.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
#[error("render failed{}: {message}", .frame.map(|f| format!(" at frame {f}")).unwrap_or_default())]
pub struct RenderExecutionError {
    /// Error message reported by the renderer.
    pub message: String,
    /// Frame being rendered when the failure happened, if known.
    pub frame: Option<i64>,
    /// Timestamp in milliseconds when the failure was recorded.
    pub timestamp: i64,
}

impl RenderExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frame: None,
            timestamp: crate::utils::time::time_millis(),
        }
    }

    pub fn at_frame(
        mut self,
        frame: i64,
    ) -> Self {
        self.frame = Some(frame);
        self
    }
}

impl From<NodeGraphError> for String {
    fn from(val: NodeGraphError) -> Self {
        val.to_string()
    }
}

impl From<serde_json::Error> for NodeGraphError {
    fn from(error: serde_json::Error) -> Self {
        NodeGraphError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for NodeGraphError {
    fn from(error: toml::de::Error) -> Self {
        NodeGraphError::Config(error.to_string())
    }
}

impl From<std::io::Error> for NodeGraphError {
    fn from(error: std::io::Error) -> Self {
        NodeGraphError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let err = NodeGraphError::Cycle(vec!["N1".into(), "N2".into(), "N3".into()]);
        assert_eq!(err.to_string(), "graph contains a cycle: N1 -> N2 -> N3");
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderExecutionError::new("disk full").at_frame(12);
        assert_eq!(err.to_string(), "render failed at frame 12: disk full");
        assert_eq!(RenderExecutionError::new("boom").to_string(), "render failed: boom");
    }
}
