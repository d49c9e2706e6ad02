//! Job lifecycle events.
//!
//! Every state change of a job is published on a broadcast queue. Subscribers
//! pick the jobs they care about with glob patterns on node id and job id.

use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::{
    NodeGraphError, RenderExecutionError, Result,
    common::BroadcastQueue,
    graph::NodeId,
    queue::{JobId, RenderJob},
    utils,
};

/// What happened to a job.
#[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobEvent {
    Submitted,
    Dispatched,
    /// Last frame reported by the executor.
    Progress(i64),
    Completed,
    Failed(RenderExecutionError),
    Cancelled,
    /// The executor did not acknowledge a cancellation in time; the job stays active.
    CancelNotConfirmed,
}

/// Event message containing the job context.
#[derive(Debug, Clone)]
pub struct JobMessage {
    pub job_id: JobId,
    pub node_id: NodeId,
    pub event: JobEvent,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

impl JobMessage {
    pub(crate) fn new(
        job: &RenderJob,
        event: JobEvent,
    ) -> Self {
        Self {
            job_id: job.id.clone(),
            node_id: job.node_id.clone(),
            event,
            timestamp: utils::time::time_millis(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventFilter {
    /// use the glob pattern to match the node id
    /// eg. Write*
    pub node: String,

    /// use the glob pattern to match the job id
    pub job: String,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            node: "*".to_string(),
            job: "*".to_string(),
        }
    }
}

impl EventFilter {
    pub fn new(
        node: impl Into<String>,
        job: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            job: job.into(),
        }
    }

    pub fn with_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Default::default()
        }
    }

    pub fn with_job(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            ..Default::default()
        }
    }

    fn compile(&self) -> Result<(GlobMatcher, GlobMatcher)> {
        let compile = |pattern: &str| {
            Glob::new(pattern).map(|g| g.compile_matcher()).map_err(|e| NodeGraphError::Config(format!("invalid event filter {pattern:?}: {e}")))
        };
        Ok((compile(&self.node)?, compile(&self.job)?))
    }
}

/// Publisher side of the job event stream.
#[derive(Clone)]
pub(crate) struct JobEvents {
    queue: Arc<BroadcastQueue<JobMessage>>,
}

impl JobEvents {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            queue: BroadcastQueue::new(cap),
        }
    }

    /// Publishes an event. Nothing happens when there are no subscribers.
    pub(crate) fn emit(
        &self,
        job: &RenderJob,
        event: JobEvent,
    ) {
        let _ = self.queue.send(JobMessage::new(job, event));
    }

    pub(crate) fn subscribe(
        &self,
        filter: &EventFilter,
    ) -> Result<EventSubscription> {
        let (node, job) = filter.compile()?;
        Ok(EventSubscription {
            receiver: self.queue.subscribe(),
            node,
            job,
        })
    }
}

/// Receiving side of the job event stream, restricted to a filter.
pub struct EventSubscription {
    receiver: broadcast::Receiver<JobMessage>,
    node: GlobMatcher,
    job: GlobMatcher,
}

impl EventSubscription {
    /// Waits for the next matching event. Returns `None` once the queue is gone.
    ///
    /// A subscriber that falls behind loses the oldest events and keeps going.
    pub async fn recv(&mut self) -> Option<JobMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if self.matches(&msg) => return Some(msg),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("event subscriber lagged, {} events dropped", n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already in the queue, without waiting.
    pub fn try_recv(&mut self) -> Option<JobMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) if self.matches(&msg) => return Some(msg),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(n)) => warn!("event subscriber lagged, {} events dropped", n),
                Err(_) => return None,
            }
        }
    }

    fn matches(
        &self,
        msg: &JobMessage,
    ) -> bool {
        self.node.is_match(&msg.node_id) && self.job.is_match(&msg.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::JobRecord, queue::RenderJob};

    fn job(node: &str) -> RenderJob {
        RenderJob::try_from(JobRecord::new(node, 1, 10)).unwrap()
    }

    #[test]
    fn test_filter_by_node_glob() {
        let events = JobEvents::new(16);
        let mut writes = events.subscribe(&EventFilter::with_node("Write*")).unwrap();
        let mut all = events.subscribe(&EventFilter::default()).unwrap();

        events.emit(&job("Read1"), JobEvent::Submitted);
        events.emit(&job("Write1"), JobEvent::Dispatched);

        let msg = writes.try_recv().unwrap();
        assert_eq!(msg.node_id, "Write1");
        assert_eq!(msg.event, JobEvent::Dispatched);
        assert!(writes.try_recv().is_none());

        assert_eq!(all.try_recv().unwrap().node_id, "Read1");
        assert_eq!(all.try_recv().unwrap().node_id, "Write1");
    }

    #[test]
    fn test_filter_by_job_id() {
        let events = JobEvents::new(16);
        let target = job("Write1");
        let mut sub = events.subscribe(&EventFilter::with_job(target.id.clone())).unwrap();
        events.emit(&job("Write1"), JobEvent::Submitted);
        events.emit(&target, JobEvent::Progress(4));
        assert_eq!(sub.try_recv().unwrap().event, JobEvent::Progress(4));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let events = JobEvents::new(16);
        assert!(matches!(events.subscribe(&EventFilter::with_node("[")), Err(NodeGraphError::Config(_))));
    }

    #[test]
    fn test_event_name() {
        assert_eq!(JobEvent::CancelNotConfirmed.as_ref(), "cancel_not_confirmed");
    }
}
