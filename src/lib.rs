//! # Nodegraph
//!
//! Nodegraph analyzes the node graph of a compositing script and schedules
//! its render jobs. It is designed to be embedded in tools that read a
//! script snapshot and drive an external renderer.
//!
//! ## Core Features
//!
//! - **Immutable Snapshots**: A validated `GraphModel` built once from node and connection records
//! - **Structural Analysis**: Cycles, islands, paths, depths and fan-in/fan-out statistics
//! - **Deterministic Ordering**: Topological sorts and priority-aware execution orders that repeat exactly
//! - **Bounded Dispatch**: An async `JobQueue` feeding an external renderer with a concurrency limit
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nodegraph::{GraphAnalyzer, GraphModel, GraphSnapshot, JobQueueBuilder};
//!
//! let graph = GraphModel::try_from(&GraphSnapshot::from_json(json_str)?)?;
//! let report = GraphAnalyzer::new(&graph).report();
//!
//! let queue = JobQueueBuilder::new().executor(Arc::new(farm)).build()?;
//! for record in jobs {
//!     queue.submit(RenderJob::try_from(record)?)?;
//! }
//! let status = queue.run(2).await?;
//! ```

mod analysis;
mod builder;
mod common;
mod config;
mod error;
mod model;
mod utils;

pub mod graph;
pub mod queue;
pub mod schedule;
pub mod traversal;

pub use analysis::{GraphAnalyzer, GraphStatistics, StructureReport};
pub use builder::JobQueueBuilder;
pub use config::{Config, LayoutConfig, SchedulerConfig};
pub use error::{NodeGraphError, RenderExecutionError};
pub use graph::{Connection, Direction, GraphModel, Node, NodeId};
pub use model::*;
pub use queue::{JobQueue, QueueStatus, RenderExecutor, RenderJob};
pub use schedule::ExecutionScheduler;
pub use traversal::{Order, TraversalEngine, TraversalOptions};

/// Result type alias for Nodegraph operations.
pub type Result<T> = std::result::Result<T, NodeGraphError>;
