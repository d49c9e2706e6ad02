//! Render job descriptor and its lifecycle.

use serde::{Deserialize, Serialize};

use crate::{
    NodeGraphError, RenderExecutionError, Result,
    graph::NodeId,
    model::JobRecord,
    utils,
};

/// job id
pub type JobId = String;

/// Lifecycle state of a render job.
///
/// `Queued -> Active -> {Completed, Failed}`, plus `Queued -> Cancelled` and
/// best-effort `Active -> Cancelled`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Inclusive frame range rendered every `step` frames.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl FrameRange {
    /// Fails with `InvalidFrameRange` unless `start <= end` and `step >= 1`.
    pub fn new(
        start: i64,
        end: i64,
        step: i64,
    ) -> Result<Self> {
        if start > end || step < 1 {
            return Err(NodeGraphError::InvalidFrameRange {
                start,
                end,
                step,
            });
        }
        Ok(Self {
            start,
            end,
            step,
        })
    }

    /// Number of frames rendered. Saturates at `u64::MAX` and is 0 for an
    /// inverted range read from untrusted input.
    pub fn frame_count(&self) -> u64 {
        let span = (self.end as i128 - self.start as i128) / self.step.max(1) as i128;
        if span < 0 { 0 } else { u64::try_from(span + 1).unwrap_or(u64::MAX) }
    }

    pub fn frames(&self) -> impl Iterator<Item = i64> {
        (self.start..=self.end).step_by(self.step as usize)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderJob {
    /// job id
    pub id: JobId,
    /// node the job renders
    pub node_id: NodeId,
    pub frames: FrameRange,
    /// never empty; `""` is the unnamed default view
    pub views: Vec<String>,
    /// higher value is dispatched sooner
    pub priority: i64,
    /// keep dispatching siblings when this job fails
    pub continue_on_error: bool,
    pub status: JobStatus,
    /// FIFO tie-break assigned once on submission, 0 before
    pub sequence: u64,
    /// last frame reported by the executor
    pub progress: Option<i64>,
    /// failures reported by the executor
    pub errors: Vec<RenderExecutionError>,
    /// timestamps in milliseconds
    pub submitted_at: Option<i64>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl RenderJob {
    /// Creates a queued job. Fails on an invalid frame range or an empty view list.
    pub fn new(
        node_id: impl Into<NodeId>,
        frames: FrameRange,
        views: Vec<String>,
    ) -> Result<Self> {
        let node_id = node_id.into();
        if views.is_empty() {
            return Err(NodeGraphError::EmptyViewList(node_id));
        }
        Ok(Self {
            id: utils::longid(),
            node_id,
            frames,
            views,
            priority: 0,
            continue_on_error: false,
            status: JobStatus::Queued,
            sequence: 0,
            progress: None,
            errors: Vec::new(),
            submitted_at: None,
            started_at: None,
            finished_at: None,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Frames times views.
    pub fn total_renders(&self) -> u64 {
        self.frame_count().saturating_mul(self.view_count() as u64)
    }

    pub(crate) fn transition(
        &mut self,
        status: JobStatus,
    ) {
        let now = utils::time::time_millis();
        match status {
            JobStatus::Active => self.started_at = Some(now),
            s if s.is_terminal() => self.finished_at = Some(now),
            _ => {}
        }
        self.status = status;
    }
}

impl TryFrom<JobRecord> for RenderJob {
    type Error = NodeGraphError;

    fn try_from(record: JobRecord) -> Result<Self> {
        let frames = FrameRange::new(record.frame_start, record.frame_end, record.frame_step)?;
        let views = record.views.unwrap_or_else(|| vec![String::new()]);
        let mut job = RenderJob::new(record.node_id, frames, views)?;
        job.priority = record.priority;
        job.continue_on_error = record.continue_on_error;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range() {
        let range = FrameRange::new(1, 10, 3).unwrap();
        assert_eq!(range.frame_count(), 4);
        assert_eq!(range.frames().collect::<Vec<_>>(), vec![1, 4, 7, 10]);
        assert_eq!(FrameRange::new(5, 5, 1).unwrap().frame_count(), 1);
    }

    #[test]
    fn test_frame_count_at_range_limits() {
        let full = FrameRange::new(i64::MIN, i64::MAX, 1).unwrap();
        assert_eq!(full.frame_count(), u64::MAX);
        assert_eq!(FrameRange::new(i64::MIN, i64::MAX, 2).unwrap().frame_count(), 1 << 63);
        assert_eq!(FrameRange::new(0, i64::MAX, 1).unwrap().frame_count(), 1 << 63);

        let stereo = RenderJob::new("Write1", FrameRange::new(0, i64::MAX, 1).unwrap(), vec!["left".into(), "right".into()]).unwrap();
        assert_eq!(stereo.total_renders(), u64::MAX);

        let inverted: FrameRange = serde_json::from_str(r#"{"start": 10, "end": 1, "step": 0}"#).unwrap();
        assert_eq!(inverted.frame_count(), 0);
    }

    #[test]
    fn test_invalid_frame_range() {
        assert!(matches!(FrameRange::new(10, 1, 1), Err(NodeGraphError::InvalidFrameRange { .. })));
        assert!(matches!(FrameRange::new(1, 10, 0), Err(NodeGraphError::InvalidFrameRange { .. })));
    }

    #[test]
    fn test_job_from_record() {
        let job = RenderJob::try_from(JobRecord::new("Write1", 1001, 1100).priority(3).continue_on_error(true)).unwrap();
        assert_eq!(job.views, vec![String::new()]);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.frame_count(), 100);
        assert_eq!(job.priority, 3);
        assert!(job.continue_on_error);

        let stereo = RenderJob::try_from(JobRecord::new("Write1", 1, 10).views(vec!["left".into(), "right".into()])).unwrap();
        assert_eq!(stereo.total_renders(), 20);
    }

    #[test]
    fn test_empty_view_list() {
        let err = RenderJob::try_from(JobRecord::new("Write1", 1, 10).views(vec![])).unwrap_err();
        assert_eq!(err, NodeGraphError::EmptyViewList("Write1".into()));
    }

    #[test]
    fn test_job_record_json() {
        let record = JobRecord::from_json(r#"{"node_id": "Write2", "frame_start": 1, "frame_end": 48, "views": ["main"], "priority": 5}"#).unwrap();
        assert_eq!(record.frame_step, 1);
        assert!(!record.continue_on_error);
        let job = RenderJob::try_from(record).unwrap();
        assert_eq!(job.views, vec!["main"]);
    }
}
