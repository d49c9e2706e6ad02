//! Boundary records supplied by the host collaborator.
//!
//! These are plain serde types; validation happens when they are turned
//! into a [`crate::GraphModel`] or a [`crate::RenderJob`].

mod job;
mod node;
mod snapshot;

pub use job::JobRecord;
pub use node::{NodeRecord, OutputRecord, Position, TargetRecord};
pub use snapshot::GraphSnapshot;
