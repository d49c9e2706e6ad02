use serde::{Deserialize, Serialize};

use crate::{NodeGraphError, Result, model::NodeRecord};

/// Graph snapshot as acquired from the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeRecord>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self {
            nodes,
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        match serde_json::from_str::<GraphSnapshot>(s) {
            Ok(v) => Ok(v),
            Err(e) => Err(NodeGraphError::Convert(format!("invalid graph snapshot: {}", e))),
        }
    }
}
