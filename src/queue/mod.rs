//! Render job submission, dispatch and tracking.

mod estimate;
mod events;
mod executor;
mod job;
mod job_queue;

pub use estimate::{RateHints, RateTable, estimate_duration};
pub use events::{EventFilter, EventSubscription, JobEvent, JobMessage};
pub(crate) use events::JobEvents;
pub use executor::{ProgressReporter, RenderExecutor};
pub use job::{FrameRange, JobId, JobStatus, RenderJob};
pub use job_queue::{CancelOutcome, JobProgress, JobQueue, QueueStatus};
