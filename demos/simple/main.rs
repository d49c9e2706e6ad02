use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use nodegraph::{
    ExecutionScheduler, GraphAnalyzer, GraphModel, GraphSnapshot, JobQueueBuilder, JobRecord, RenderExecutionError, RenderExecutor, RenderJob, TraversalEngine,
    queue::{EventFilter, ProgressReporter},
};

/// Pretends to render by sleeping a millisecond per frame.
struct SleepRenderer;

#[async_trait]
impl RenderExecutor for SleepRenderer {
    async fn execute(
        &self,
        job: RenderJob,
        progress: ProgressReporter,
    ) -> Result<(), RenderExecutionError> {
        for frame in job.frames.frames() {
            tokio::time::sleep(Duration::from_millis(1)).await;
            progress.frame_done(frame);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let text = include_str!("./graph.json");

    let snapshot = GraphSnapshot::from_json(text).unwrap();
    let graph = GraphModel::try_from(&snapshot).unwrap();

    println!("Report: {}", GraphAnalyzer::new(&graph).report().to_json().unwrap());
    println!("Order: {:?}", TraversalEngine::new(&graph).topological_sort().unwrap());

    let jobs = graph
        .render_targets()
        .into_iter()
        .map(|node| RenderJob::try_from(JobRecord::new(node, 1001, 1010)).unwrap())
        .collect();
    let jobs = ExecutionScheduler::new(&graph).priority("Write2", 10).unwrap().order_jobs(jobs).unwrap();

    let queue = JobQueueBuilder::new().executor(Arc::new(SleepRenderer)).build().unwrap();
    let mut events = queue.subscribe(&EventFilter::with_node("Write*")).unwrap();
    tokio::spawn(async move {
        while let Some(msg) = events.recv().await {
            println!("{} {}: {:?}", msg.node_id, msg.job_id, msg.event);
        }
    });

    for job in jobs {
        queue.submit(job).unwrap();
    }

    let status = queue.run(2).await.unwrap();
    println!("Status: {:#?}", status);
}
