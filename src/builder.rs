use std::{sync::Arc, time::Duration};

use crate::{
    Config, JobQueue, NodeGraphError, Result,
    config::SchedulerConfig,
    queue::{RateHints, RenderExecutor},
};

#[derive(Default)]
pub struct JobQueueBuilder {
    config: SchedulerConfig,
    executor: Option<Arc<dyn RenderExecutor>>,
    rates: Option<Arc<dyn RateHints>>,
}

impl JobQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the scheduler section of a loaded [`Config`].
    pub fn config(
        mut self,
        config: &Config,
    ) -> Self {
        self.config = config.scheduler.clone();
        self
    }

    pub fn executor<E: RenderExecutor + 'static>(
        mut self,
        executor: Arc<E>,
    ) -> Self {
        self.executor = Some(executor as Arc<dyn RenderExecutor>);
        self
    }

    /// Concurrency used by [`JobQueue::run_configured`].
    pub fn max_concurrent(
        mut self,
        n: usize,
    ) -> Self {
        self.config.max_concurrent = n;
        self
    }

    pub fn cancel_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.cancel_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn rates<R: RateHints + 'static>(
        mut self,
        rates: Arc<R>,
    ) -> Self {
        self.rates = Some(rates as Arc<dyn RateHints>);
        self
    }

    pub fn build(&self) -> Result<JobQueue> {
        let executor = self.executor.clone().ok_or_else(|| NodeGraphError::Config("job queue needs a render executor".into()))?;
        if self.config.max_concurrent == 0 {
            return Err(NodeGraphError::Config("max_concurrent must be at least 1".into()));
        }

        Ok(JobQueue::new(executor, &self.config, self.rates.clone()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        RenderExecutionError,
        queue::{ProgressReporter, RenderJob},
    };

    struct Noop;

    #[async_trait]
    impl RenderExecutor for Noop {
        async fn execute(
            &self,
            _job: RenderJob,
            _progress: ProgressReporter,
        ) -> std::result::Result<(), RenderExecutionError> {
            Ok(())
        }
    }

    #[test]
    fn test_build_requires_executor() {
        assert!(matches!(JobQueueBuilder::new().build(), Err(NodeGraphError::Config(_))));
        assert!(matches!(JobQueueBuilder::new().executor(Arc::new(Noop)).max_concurrent(0).build(), Err(NodeGraphError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_from_config() {
        let config = Config::load_from_str("[scheduler]\nmax_concurrent = 3").unwrap();
        let queue = JobQueueBuilder::new().config(&config).executor(Arc::new(Noop)).build().unwrap();
        let status = queue.run_configured().await.unwrap();
        assert_eq!(status.total, 0);
    }
}
