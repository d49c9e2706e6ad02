//! Priority job queue with a bounded number of active jobs.
//!
//! All queue state lives behind one mutex. Submissions, dispatch, completion
//! handling, cancellation and status snapshots each take the lock once, so a
//! snapshot never shows a job in two states and the active set never grows
//! past the concurrency bound.
//!
//! Dispatched jobs are handed to the [`RenderExecutor`] on a spawned task.
//! When the executor returns, the task posts the outcome on the completion
//! queue, which [`JobQueue::run`] drains one message at a time.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{
    NodeGraphError, RenderExecutionError, Result,
    common::Queue,
    config::SchedulerConfig,
    graph::NodeId,
    queue::{
        EventFilter, EventSubscription, JobEvent, JobEvents, JobId, JobStatus, ProgressReporter, RateHints, RenderExecutor, RenderJob, estimate_duration,
    },
    utils,
};

/// Ready set key: higher priority first, then lower submission sequence.
type ReadyKey = (Reverse<i64>, u64);

enum Signal {
    /// The executor returned for a job.
    Completed {
        job_id: JobId,
        outcome: std::result::Result<(), RenderExecutionError>,
    },
    /// Queue state changed outside the completion path.
    Changed,
}

/// Result of [`JobQueue::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// The job had already reached this terminal state.
    AlreadyFinished(JobStatus),
    /// The executor did not acknowledge in time. The job is still active.
    NotConfirmed,
}

/// Per-job entry of a [`QueueStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub id: JobId,
    pub node_id: NodeId,
    pub status: JobStatus,
    pub priority: i64,
    pub sequence: u64,
    pub frame_count: u64,
    pub total_renders: u64,
    /// last frame reported by the executor
    pub progress: Option<i64>,
    pub errors: Vec<RenderExecutionError>,
    /// advisory, only with a rate hint for the node
    pub estimated_secs: Option<f64>,
}

impl JobProgress {
    fn new(
        job: &RenderJob,
        estimated_secs: Option<f64>,
    ) -> Self {
        Self {
            id: job.id.clone(),
            node_id: job.node_id.clone(),
            status: job.status,
            priority: job.priority,
            sequence: job.sequence,
            frame_count: job.frame_count(),
            total_renders: job.total_renders(),
            progress: job.progress,
            errors: job.errors.clone(),
            estimated_secs,
        }
    }
}

/// Consistent snapshot of a [`JobQueue`].
///
/// `queued + active + completed + failed + cancelled == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
    /// frames over every submitted job
    pub total_frames: u64,
    /// sum of the estimates of unfinished jobs that have one
    pub estimated_secs: Option<f64>,
    /// a failure stopped dispatch for the current run
    pub halted: bool,
    /// in submission order
    pub jobs: Vec<JobProgress>,
}

struct RunSlot {
    max_concurrent: usize,
    runtime: Handle,
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, RenderJob>,
    submitted: Vec<JobId>,
    ready: BTreeMap<ReadyKey, JobId>,
    active: HashSet<JobId>,
    next_sequence: u64,
    run: Option<RunSlot>,
    halted: bool,
}

impl QueueState {
    fn is_settled(&self) -> bool {
        self.ready.is_empty() && self.active.is_empty()
    }
}

pub(crate) struct Inner {
    state: Mutex<QueueState>,
    executor: Arc<dyn RenderExecutor>,
    completions: Arc<Queue<Signal>>,
    events: JobEvents,
    rates: Option<Arc<dyn RateHints>>,
    cancel_timeout: Duration,
    max_concurrent: usize,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(
        &self,
        signal: Signal,
    ) {
        if let Err(err) = self.completions.send(signal) {
            warn!("failed to post queue signal: {}", err);
        }
    }

    /// Moves ready jobs to the active set until the bound is reached.
    fn dispatch(
        self: &Arc<Self>,
        state: &mut QueueState,
    ) {
        if state.halted {
            return;
        }
        let Some((max_concurrent, runtime)) = state.run.as_ref().map(|run| (run.max_concurrent, run.runtime.clone())) else {
            return;
        };

        while state.active.len() < max_concurrent {
            let Some((_, job_id)) = state.ready.pop_first() else {
                break;
            };
            let Some(job) = state.jobs.get_mut(&job_id) else {
                continue;
            };

            job.transition(JobStatus::Active);
            state.active.insert(job_id.clone());
            debug!("dispatch job {} for node {} ({} active)", job.id, job.node_id, state.active.len());
            self.events.emit(job, JobEvent::Dispatched);

            let snapshot = job.clone();
            let executor = self.executor.clone();
            let completions = self.completions.clone();
            let progress = ProgressReporter::new(job_id.clone(), Arc::downgrade(self));
            runtime.spawn(async move {
                let outcome = executor.execute(snapshot, progress).await;
                let _ = completions.send(Signal::Completed {
                    job_id,
                    outcome,
                });
            });
        }
    }

    /// Applies an executor outcome. Outcomes for jobs that are no longer
    /// active, such as cancelled ones, are dropped.
    fn complete(
        self: &Arc<Self>,
        job_id: &str,
        outcome: std::result::Result<(), RenderExecutionError>,
    ) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(job) = state.jobs.get_mut(job_id) else {
            warn!("completion for unknown job {}", job_id);
            return;
        };
        if job.status != JobStatus::Active {
            debug!("ignore completion of job {} in state {}", job_id, job.status.as_ref());
            return;
        }

        state.active.remove(job_id);
        match outcome {
            Ok(()) => {
                job.transition(JobStatus::Completed);
                info!("job {} for node {} completed", job.id, job.node_id);
                if let Some(rates) = &self.rates {
                    observe_rate(rates.as_ref(), job);
                }
                self.events.emit(job, JobEvent::Completed);
            }
            Err(err) => {
                warn!("job {} for node {} failed: {}", job.id, job.node_id, err);
                job.errors.push(err.clone());
                job.transition(JobStatus::Failed);
                self.events.emit(job, JobEvent::Failed(err));
                if !job.continue_on_error {
                    state.halted = true;
                    let cancelled = self.cancel_ready(state);
                    info!("dispatch halted, cancelled {} queued jobs", cancelled);
                }
            }
        }

        self.dispatch(state);
    }

    /// Cancels every queued job and returns how many there were.
    fn cancel_ready(
        &self,
        state: &mut QueueState,
    ) -> usize {
        let ready = std::mem::take(&mut state.ready);
        let count = ready.len();
        for job_id in ready.into_values() {
            if let Some(job) = state.jobs.get_mut(&job_id) {
                job.transition(JobStatus::Cancelled);
                self.events.emit(job, JobEvent::Cancelled);
            }
        }
        count
    }

    /// Wakes the run loop, if there is one, to re-check for settlement.
    fn wake_run(
        &self,
        state: &QueueState,
    ) {
        if state.run.is_some() {
            self.notify(Signal::Changed);
        }
    }

    pub(crate) fn record_progress(
        &self,
        job_id: &str,
        frame: i64,
    ) {
        let mut state = self.lock();
        if let Some(job) = state.jobs.get_mut(job_id)
            && job.status == JobStatus::Active
        {
            job.progress = Some(frame);
            self.events.emit(job, JobEvent::Progress(frame));
        }
    }

    fn estimate(
        &self,
        job: &RenderJob,
    ) -> Option<f64> {
        let rates = self.rates.as_ref()?;
        estimate_duration(job, rates.as_ref()).map(|d| d.as_secs_f64())
    }
}

fn observe_rate(
    rates: &dyn RateHints,
    job: &RenderJob,
) {
    if let (Some(started), Some(finished)) = (job.started_at, job.finished_at) {
        let renders = job.total_renders().max(1) as f64;
        rates.observe(&job.node_id, utils::time::elapsed_secs(started, finished) / renders);
    }
}

/// Clears the run slot when [`JobQueue::run`] returns or is dropped.
struct RunGuard<'a> {
    inner: &'a Inner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().run = None;
    }
}

/// Accepts render jobs and feeds them to a [`RenderExecutor`], at most
/// `max_concurrent` at a time.
///
/// Cloning is cheap; clones share the same queue.
///
/// # Example
///
/// ```rust,ignore
/// let queue = JobQueueBuilder::new().executor(Arc::new(farm)).build()?;
/// queue.submit(RenderJob::try_from(JobRecord::new("Write1", 1001, 1100))?)?;
/// let status = queue.run(2).await?;
/// ```
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    pub fn new(
        executor: Arc<dyn RenderExecutor>,
        config: &SchedulerConfig,
        rates: Option<Arc<dyn RateHints>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                executor,
                completions: Queue::unbounded(),
                events: JobEvents::new(config.event_queue_size.max(1)),
                rates,
                cancel_timeout: Duration::from_millis(config.cancel_timeout_ms),
                max_concurrent: config.max_concurrent,
            }),
        }
    }

    /// Queues a job and returns its id without waiting.
    ///
    /// The job gets the next submission sequence. During a run it is
    /// dispatched right away when a slot is free; after a failure halted the
    /// run it is cancelled instead.
    pub fn submit(
        &self,
        mut job: RenderJob,
    ) -> Result<JobId> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        if state.jobs.contains_key(&job.id) {
            return Err(NodeGraphError::Scheduler(format!("job {} already submitted", job.id)));
        }

        state.next_sequence += 1;
        job.sequence = state.next_sequence;
        job.status = JobStatus::Queued;
        job.progress = None;
        job.errors.clear();
        job.started_at = None;
        job.finished_at = None;
        job.submitted_at = Some(utils::time::time_millis());

        let job_id = job.id.clone();
        debug!("submit job {} for node {} (priority {}, sequence {})", job_id, job.node_id, job.priority, job.sequence);
        self.inner.events.emit(&job, JobEvent::Submitted);

        if state.halted && state.run.is_some() {
            job.transition(JobStatus::Cancelled);
            self.inner.events.emit(&job, JobEvent::Cancelled);
            warn!("job {} cancelled on submission, dispatch is halted", job_id);
        } else {
            state.ready.insert((Reverse(job.priority), job.sequence), job_id.clone());
        }
        state.submitted.push(job_id.clone());
        state.jobs.insert(job_id.clone(), job);

        self.inner.dispatch(state);
        Ok(job_id)
    }

    /// Dispatches jobs until every submitted job is terminal, keeping at most
    /// `max_concurrent` of them active. Returns the final status.
    ///
    /// Fails with `Scheduler` if `max_concurrent` is zero or another run is
    /// in progress. Must be called within a tokio runtime.
    pub async fn run(
        &self,
        max_concurrent: usize,
    ) -> Result<QueueStatus> {
        if max_concurrent == 0 {
            return Err(NodeGraphError::Scheduler("max_concurrent must be at least 1".into()));
        }

        let _guard = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            if state.run.is_some() {
                return Err(NodeGraphError::Scheduler("job queue is already running".into()));
            }
            state.run = Some(RunSlot {
                max_concurrent,
                runtime: Handle::current(),
            });
            state.halted = false;
            info!("job queue running with {} slots, {} jobs queued", max_concurrent, state.ready.len());
            self.inner.dispatch(state);
            RunGuard {
                inner: &self.inner,
            }
        };

        loop {
            if self.inner.lock().is_settled() {
                break;
            }
            match self.inner.completions.next_async().await {
                Some(Signal::Completed {
                    job_id,
                    outcome,
                }) => self.inner.complete(&job_id, outcome),
                Some(Signal::Changed) => {}
                None => break,
            }
        }

        let status = self.status();
        info!(
            "job queue finished: {} completed, {} failed, {} cancelled of {}",
            status.completed, status.failed, status.cancelled, status.total
        );
        Ok(status)
    }

    /// Runs with the configured `max_concurrent`.
    pub async fn run_configured(&self) -> Result<QueueStatus> {
        self.run(self.inner.max_concurrent).await
    }

    /// Cancels a job.
    ///
    /// A queued job is cancelled at once. For an active job the executor is
    /// asked to stop and given the configured timeout to acknowledge; without
    /// an acknowledgement the job stays active and `NotConfirmed` is returned.
    /// Fails with `JobNotFound` for an unknown id.
    pub async fn cancel(
        &self,
        job_id: &str,
    ) -> Result<CancelOutcome> {
        {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let job = state.jobs.get_mut(job_id).ok_or_else(|| NodeGraphError::JobNotFound(job_id.to_string()))?;
            match job.status {
                JobStatus::Queued => {
                    state.ready.remove(&(Reverse(job.priority), job.sequence));
                    job.transition(JobStatus::Cancelled);
                    info!("queued job {} cancelled", job_id);
                    self.inner.events.emit(job, JobEvent::Cancelled);
                    self.inner.wake_run(state);
                    return Ok(CancelOutcome::Cancelled);
                }
                JobStatus::Active => {}
                status => return Ok(CancelOutcome::AlreadyFinished(status)),
            }
        }

        let owned = job_id.to_string();
        let acknowledged = tokio::time::timeout(self.inner.cancel_timeout, self.inner.executor.cancel(&owned)).await.unwrap_or(false);

        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let job = state.jobs.get_mut(job_id).ok_or_else(|| NodeGraphError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::Active {
            return Ok(CancelOutcome::AlreadyFinished(job.status));
        }
        if !acknowledged {
            warn!("cancellation of job {} not confirmed within {:?}", job_id, self.inner.cancel_timeout);
            self.inner.events.emit(job, JobEvent::CancelNotConfirmed);
            return Ok(CancelOutcome::NotConfirmed);
        }

        job.transition(JobStatus::Cancelled);
        info!("active job {} cancelled", job_id);
        self.inner.events.emit(job, JobEvent::Cancelled);
        state.active.remove(job_id);
        self.inner.dispatch(state);
        self.inner.wake_run(state);
        Ok(CancelOutcome::Cancelled)
    }

    /// Cancels every queued job and returns how many were cancelled.
    ///
    /// Active jobs keep running to completion. Jobs submitted afterwards are
    /// queued as usual.
    pub fn stop(&self) -> usize {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let cancelled = self.inner.cancel_ready(state);
        info!("job queue stopped, cancelled {} queued jobs", cancelled);
        self.inner.wake_run(state);
        cancelled
    }

    /// Atomic snapshot of counts and per-job progress.
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.lock();
        let mut status = QueueStatus {
            total: state.submitted.len(),
            halted: state.halted,
            ..Default::default()
        };

        for job in state.submitted.iter().filter_map(|id| state.jobs.get(id)) {
            match job.status {
                JobStatus::Queued => status.queued += 1,
                JobStatus::Active => status.active += 1,
                JobStatus::Completed => status.completed += 1,
                JobStatus::Failed => status.failed += 1,
                JobStatus::Cancelled => status.cancelled += 1,
            }
            status.total_frames = status.total_frames.saturating_add(job.frame_count());

            let estimated = self.inner.estimate(job);
            if let Some(secs) = estimated
                && !job.status.is_terminal()
            {
                *status.estimated_secs.get_or_insert(0.0) += secs;
            }
            status.jobs.push(JobProgress::new(job, estimated));
        }
        status
    }

    /// Copy of a submitted job.
    pub fn job(
        &self,
        job_id: &str,
    ) -> Option<RenderJob> {
        self.inner.lock().jobs.get(job_id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().run.is_some()
    }

    /// Subscribes to job events matching `filter`.
    pub fn subscribe(
        &self,
        filter: &EventFilter,
    ) -> Result<EventSubscription> {
        self.inner.events.subscribe(filter)
    }
}
