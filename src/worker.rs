use crate::error::Result;
use crate::queue::{JobRecord, MemoryJobQueue};
use crate::runner::ReportRunner;
use crate::schema::{ReportKind, GENERATE_ALL_JOB_NAME};
use log::{info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Executes queued report jobs against the shared [`ReportRunner`].
///
/// Several workers may be attached to one queue; children of one flow then
/// run concurrently with no ordering between them, which is safe because
/// each report kind aggregates independently and writes its own output file.
pub struct ReportWorker;

impl ReportWorker {
    /// Spawns a worker loop that drains the queue until it is closed.
    pub fn spawn(queue: Arc<MemoryJobQueue>, runner: Arc<ReportRunner>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(job) = queue.next_job().await {
                queue.mark_active(&job.id);
                let outcome = Self::process(&job, &runner).await;
                if let Err(ref err) = outcome {
                    warn!("Report job {} ({}) failed: {}", job.id, job.name, err);
                }
                queue.mark_finished(&job.id, outcome.is_err());
            }
            info!("Report worker shutting down: queue closed");
        })
    }

    async fn process(job: &JobRecord, runner: &ReportRunner) -> Result<()> {
        // The parent job exists to tie the flow together; the children do
        // the actual work.
        if job.name == GENERATE_ALL_JOB_NAME {
            return Ok(());
        }

        let kind = ReportKind::from_job_name(&job.name)?;
        runner.run(kind).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{JobQueue, JobSpec, JobState};
    use crate::schema::ReportEngineConfig;
    use crate::statement::StatementLayout;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_worker_executes_report_job() {
        let dir = tempdir().unwrap();
        let config = ReportEngineConfig {
            source_dir: dir.path().join("tmp"),
            output_dir: dir.path().join("out"),
            ..ReportEngineConfig::default()
        };
        std::fs::create_dir_all(&config.source_dir).unwrap();
        std::fs::write(
            config.source_dir.join("ledger.csv"),
            "2023-06-01,Cash,,150.00,0",
        )
        .unwrap();

        let queue = Arc::new(MemoryJobQueue::new());
        let runner = Arc::new(ReportRunner::new(config.clone(), StatementLayout::standard()));
        let handle = ReportWorker::spawn(queue.clone(), runner);

        queue
            .enqueue(JobSpec::new(ReportKind::Yearly.job_name()))
            .await
            .unwrap();

        let output = config.output_path(ReportKind::Yearly);
        let expected = "Financial Year,Cash Balance\n2023,150.00";
        wait_for(|| {
            std::fs::read_to_string(&output)
                .map(|written| written == expected)
                .unwrap_or(false)
        })
        .await;

        queue.close().await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_reports_failure_through_job_state() {
        let dir = tempdir().unwrap();
        let config = ReportEngineConfig {
            // Source directory intentionally missing.
            source_dir: dir.path().join("tmp"),
            output_dir: dir.path().join("out"),
            ..ReportEngineConfig::default()
        };

        let queue = Arc::new(MemoryJobQueue::new());
        let runner = Arc::new(ReportRunner::new(config, StatementLayout::standard()));
        let handle = ReportWorker::spawn(queue.clone(), runner);

        let flow_id = queue
            .enqueue_flow(
                JobSpec::new(GENERATE_ALL_JOB_NAME),
                vec![JobSpec::new(ReportKind::Accounts.job_name())],
            )
            .await
            .unwrap();

        let mut failed = false;
        for _ in 0..200 {
            let flow = queue.get_flow(&flow_id).await.unwrap().unwrap();
            if flow.children[0].state == JobState::Failed {
                failed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(failed, "child job never reported failure");

        queue.close().await;
        handle.await.unwrap();
    }
}
