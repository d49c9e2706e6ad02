use serde::{Deserialize, Serialize};

use crate::{NodeGraphError, Result};

fn default_step() -> i64 {
    1
}

/// Job submission record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub node_id: String,
    pub frame_start: i64,
    pub frame_end: i64,
    #[serde(default = "default_step")]
    pub frame_step: i64,
    /// Views to render; an omitted list means a single unnamed view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<String>>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub continue_on_error: bool,
}

impl JobRecord {
    pub fn new(
        node_id: impl Into<String>,
        frame_start: i64,
        frame_end: i64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            frame_start,
            frame_end,
            frame_step: 1,
            views: None,
            priority: 0,
            continue_on_error: false,
        }
    }

    pub fn priority(
        mut self,
        priority: i64,
    ) -> Self {
        self.priority = priority;
        self
    }

    pub fn step(
        mut self,
        step: i64,
    ) -> Self {
        self.frame_step = step;
        self
    }

    pub fn views(
        mut self,
        views: Vec<String>,
    ) -> Self {
        self.views = Some(views);
        self
    }

    pub fn continue_on_error(
        mut self,
        flag: bool,
    ) -> Self {
        self.continue_on_error = flag;
        self
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<JobRecord>(s).map_err(|e| NodeGraphError::Convert(format!("invalid job record: {}", e)))
    }
}
