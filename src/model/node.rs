use serde::{Deserialize, Serialize};

/// Position hint of a node in the host's graph editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(
        x: i64,
        y: i64,
    ) -> Self {
        Self {
            x,
            y,
        }
    }
}

/// Input slot of another node fed by an output port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub node_id: String,
    pub slot: usize,
}

/// Output port with the input slots it feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub port: usize,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub input_count: usize,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        input_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            input_count,
            outputs: Vec::new(),
        }
    }

    /// Connects output `port` of this record to input `slot` of `node_id`.
    pub fn connect(
        mut self,
        port: usize,
        node_id: impl Into<String>,
        slot: usize,
    ) -> Self {
        let target = TargetRecord {
            node_id: node_id.into(),
            slot,
        };
        match self.outputs.iter_mut().find(|o| o.port == port) {
            Some(output) => output.targets.push(target),
            None => self.outputs.push(OutputRecord {
                port,
                targets: vec![target],
            }),
        }
        self
    }

    pub fn at(
        mut self,
        x: i64,
        y: i64,
    ) -> Self {
        self.position = Position::new(x, y);
        self
    }
}
