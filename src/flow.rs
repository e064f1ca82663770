use crate::error::{ReportEngineError, Result};
use crate::queue::{JobQueue, JobRecord, JobSpec, JobState};
use crate::schema::{ReportKind, GENERATE_ALL_JOB_NAME};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::sync::Arc;

/// Progress of one child task, projected from its job record. Timing fields
/// stay `None` until the queue has stamped the corresponding timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct ChildStatus {
    pub name: String,
    pub state: JobState,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub execution_time: Option<String>,
}

/// Submits "generate all reports" flows and answers status queries about
/// them. Holds no state of its own; the queue owns the job records and the
/// status call is a pure projection over them, safe to repeat while children
/// are still running.
pub struct ReportOrchestrator {
    queue: Arc<dyn JobQueue>,
}

impl ReportOrchestrator {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Enqueues one parent task plus one child per report kind, all under a
    /// single flow id, and returns that id. The children execute
    /// independently; nothing here waits for them.
    pub async fn generate_all(&self) -> Result<String> {
        let children = ReportKind::ALL
            .iter()
            .map(|kind| JobSpec::new(kind.job_name()))
            .collect();

        let flow_id = self
            .queue
            .enqueue_flow(JobSpec::new(GENERATE_ALL_JOB_NAME), children)
            .await?;
        info!("Submitted report flow {}", flow_id);
        Ok(flow_id)
    }

    /// Per-child status of a previously submitted flow. A flow id the queue
    /// does not know, or one without recorded children, is `FlowNotFound`.
    pub async fn flow_status(&self, flow_id: &str) -> Result<Vec<ChildStatus>> {
        let flow = self
            .queue
            .get_flow(flow_id)
            .await?
            .ok_or_else(|| ReportEngineError::FlowNotFound(flow_id.to_string()))?;

        if flow.children.is_empty() {
            return Err(ReportEngineError::FlowNotFound(flow_id.to_string()));
        }

        Ok(flow.children.iter().map(child_status).collect())
    }
}

fn child_status(job: &JobRecord) -> ChildStatus {
    let execution_time = match (job.processed_on, job.finished_on) {
        (Some(started), Some(finished)) => {
            let seconds = (finished - started).num_milliseconds() as f64 / 1000.0;
            Some(format!("{:.2} seconds", seconds))
        }
        _ => None,
    };

    ChildStatus {
        name: job.name.clone(),
        state: job.state,
        started_at: job.processed_on.map(format_timestamp),
        finished_at: job.finished_on.map(format_timestamp),
        execution_time,
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
