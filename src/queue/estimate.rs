//! Advisory render time estimates.

use std::time::Duration;

use crate::{common::MemCache, graph::NodeId, queue::RenderJob};

/// Default capacity of a [`RateTable`].
const RATE_TABLE_SIZE: usize = 1024;

/// Source of per-node render rates.
///
/// Estimates never influence dispatch order.
pub trait RateHints: Send + Sync {
    /// Seconds needed to render one frame of one view of `node_id`, if known.
    fn seconds_per_frame(
        &self,
        node_id: &str,
    ) -> Option<f64>;

    /// Called after a job completed with the rate observed for it.
    fn observe(
        &self,
        _node_id: &str,
        _seconds_per_frame: f64,
    ) {
    }
}

/// Rate hints kept in memory, refreshed with every completed job.
#[derive(Clone)]
pub struct RateTable {
    rates: MemCache<NodeId, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(RATE_TABLE_SIZE)
    }
}

impl RateTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            rates: MemCache::new(capacity),
        }
    }

    /// Sets the rate of a node. Non-finite or negative rates are ignored.
    pub fn set(
        &self,
        node_id: impl Into<NodeId>,
        seconds_per_frame: f64,
    ) {
        if seconds_per_frame.is_finite() && seconds_per_frame >= 0.0 {
            self.rates.set(node_id.into(), seconds_per_frame);
        }
    }

    pub fn forget(
        &self,
        node_id: &str,
    ) {
        self.rates.remove(&node_id.to_string());
    }
}

impl RateHints for RateTable {
    fn seconds_per_frame(
        &self,
        node_id: &str,
    ) -> Option<f64> {
        self.rates.get(&node_id.to_string())
    }

    fn observe(
        &self,
        node_id: &str,
        seconds_per_frame: f64,
    ) {
        self.set(node_id, seconds_per_frame);
    }
}

/// Frames times views times the node's rate. `None` without a rate.
pub fn estimate_duration(
    job: &RenderJob,
    hints: &dyn RateHints,
) -> Option<Duration> {
    let rate = hints.seconds_per_frame(&job.node_id)?;
    Duration::try_from_secs_f64(rate * job.total_renders() as f64).ok()
}
