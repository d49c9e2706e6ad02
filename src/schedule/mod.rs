//! Priority-aware execution ordering and layout hints.

mod layout;
mod planner;

pub use layout::{Spacing, hierarchical_layout};
pub use planner::ExecutionScheduler;
