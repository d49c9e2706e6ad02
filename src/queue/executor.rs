//! Seam to the external renderer.

use std::sync::Weak;

use async_trait::async_trait;

use crate::{
    RenderExecutionError,
    queue::{JobId, RenderJob, job_queue::Inner},
};

/// Performs the actual rendering of dispatched jobs.
///
/// `execute` receives a snapshot of the job as it was dispatched and resolves
/// once the renderer is done with it. The queue does not care how the work is
/// carried out: a local process, a farm submission or a test double.
#[async_trait]
pub trait RenderExecutor: Send + Sync {
    async fn execute(
        &self,
        job: RenderJob,
        progress: ProgressReporter,
    ) -> Result<(), RenderExecutionError>;

    /// Asks the renderer to stop an active job. Returns whether the renderer
    /// acknowledged the stop. Renderers that cannot cancel keep the default.
    async fn cancel(
        &self,
        _job_id: &JobId,
    ) -> bool {
        false
    }
}

/// Handle given to the executor for reporting per-frame progress.
#[derive(Clone)]
pub struct ProgressReporter {
    job_id: JobId,
    queue: Weak<Inner>,
}

impl ProgressReporter {
    pub(crate) fn new(
        job_id: JobId,
        queue: Weak<Inner>,
    ) -> Self {
        Self {
            job_id,
            queue,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Records `frame` as the last rendered frame. Ignored once the job left
    /// the active state or the queue was dropped.
    pub fn frame_done(
        &self,
        frame: i64,
    ) {
        if let Some(inner) = self.queue.upgrade() {
            inner.record_progress(&self.job_id, frame);
        }
    }
}
