use std::{fs, path::Path};

use serde::Deserialize;

use crate::{NodeGraphError, Result, schedule::Spacing};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// job queue config
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// layout hint config
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// maximum number of active jobs, must be at least 1, defaults to 1
    pub max_concurrent: usize,
    /// how long a cancellation of an active job may wait for the executor, in milliseconds
    pub cancel_timeout_ms: u64,
    /// capacity of the job event broadcast queue
    pub event_queue_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// horizontal distance between nodes of one level
    pub spacing_x: i64,
    /// vertical distance between levels
    pub spacing_y: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            cancel_timeout_ms: 5000,
            event_queue_size: 1024,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let spacing = Spacing::default();
        Self {
            spacing_x: spacing.x,
            spacing_y: spacing.y,
        }
    }
}

impl LayoutConfig {
    pub fn spacing(&self) -> Spacing {
        Spacing {
            x: self.spacing_x,
            y: self.spacing_y,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| NodeGraphError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.max_concurrent == 0 {
            return Err(NodeGraphError::Config("scheduler.max_concurrent must be at least 1".into()));
        }
        if self.scheduler.event_queue_size == 0 {
            return Err(NodeGraphError::Config("scheduler.event_queue_size must be at least 1".into()));
        }
        Ok(())
    }
}
