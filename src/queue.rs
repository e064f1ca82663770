use crate::error::{ReportEngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Lifecycle of one queued job: `queued -> active -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What to enqueue: just a task name. The report tasks carry no payload;
/// everything they need comes from the runner's configuration.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One job as the queue records it. Timestamps are stamped by whichever
/// worker executes the job; the engine reads them but never fabricates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub name: String,
    pub flow_id: String,
    pub state: JobState,
    pub processed_on: Option<DateTime<Utc>>,
    pub finished_on: Option<DateTime<Utc>>,
}

/// A parent job plus its children, fetched together.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub parent: JobRecord,
    pub children: Vec<JobRecord>,
}

/// The queue capability the engine requires of its external collaborator.
/// Everything else (retention, retries, back-pressure) is the queue's own
/// business.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, spec: JobSpec) -> Result<String>;

    /// Creates the parent and all children atomically under one flow id
    /// (the parent's job id) and returns that id.
    async fn enqueue_flow(&self, parent: JobSpec, children: Vec<JobSpec>) -> Result<String>;

    async fn get_flow(&self, flow_id: &str) -> Result<Option<FlowNode>>;
}

/// In-process queue used in tests and single-node deployments. Jobs are
/// dispatched over an unbounded channel to whatever workers are attached;
/// records are kept forever (retention is not the engine's concern, and the
/// map doubles as the job archive).
///
/// The parent job of a flow is held back until every child has reached a
/// terminal state, then dispatched like any other job.
pub struct MemoryJobQueue {
    jobs: Mutex<HashMap<String, JobRecord>>,
    flow_children: Mutex<HashMap<String, Vec<String>>>,
    tx: mpsc::UnboundedSender<String>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            jobs: Mutex::new(HashMap::new()),
            flow_children: Mutex::new(HashMap::new()),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    fn dispatch(&self, id: &str) -> Result<()> {
        self.tx
            .send(id.to_string())
            .map_err(|_| ReportEngineError::Submission("job queue is closed".to_string()))
    }

    /// Stops accepting new submissions. Attached workers drain what is
    /// already queued and then shut down.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Next job to execute, in dispatch order. `None` once the queue is
    /// closed and drained.
    pub async fn next_job(&self) -> Option<JobRecord> {
        loop {
            let id = self.rx.lock().await.recv().await?;
            let jobs = self.jobs.lock().unwrap();
            match jobs.get(&id) {
                Some(record) => return Some(record.clone()),
                // Record vanished out from under the channel; skip it.
                None => continue,
            }
        }
    }

    pub fn mark_active(&self, id: &str) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(record) = jobs.get_mut(id) {
            record.state = JobState::Active;
            record.processed_on = Some(Utc::now());
        }
    }

    pub fn mark_finished(&self, id: &str, failed: bool) {
        let parent_to_dispatch = {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(record) = jobs.get_mut(id) else {
                return;
            };
            record.state = if failed {
                JobState::Failed
            } else {
                JobState::Completed
            };
            record.finished_on = Some(Utc::now());

            let flow_id = record.flow_id.clone();
            if flow_id == id {
                // The parent itself, or a standalone job: nothing to release.
                None
            } else {
                let flows = self.flow_children.lock().unwrap();
                let all_children_done = flows.get(&flow_id).is_some_and(|children| {
                    children.iter().all(|child_id| {
                        jobs.get(child_id).is_some_and(|child| {
                            matches!(child.state, JobState::Completed | JobState::Failed)
                        })
                    })
                });
                all_children_done.then_some(flow_id)
            }
        };

        if let Some(flow_id) = parent_to_dispatch {
            debug!("All children of flow {} finished, releasing parent", flow_id);
            // The queue may already be closed; the parent then simply never
            // runs, which only delays its bookkeeping, not the children's.
            let _ = self.dispatch(&flow_id);
        }
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, spec: JobSpec) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let record = JobRecord {
            id: id.clone(),
            name: spec.name,
            flow_id: id.clone(),
            state: JobState::Queued,
            processed_on: None,
            finished_on: None,
        };
        self.jobs.lock().unwrap().insert(id.clone(), record);
        self.dispatch(&id)?;
        Ok(id)
    }

    async fn enqueue_flow(&self, parent: JobSpec, children: Vec<JobSpec>) -> Result<String> {
        let flow_id = Uuid::new_v4().to_string();

        let mut child_ids = Vec::with_capacity(children.len());
        {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.insert(
                flow_id.clone(),
                JobRecord {
                    id: flow_id.clone(),
                    name: parent.name,
                    flow_id: flow_id.clone(),
                    state: JobState::Queued,
                    processed_on: None,
                    finished_on: None,
                },
            );
            for child in children {
                let id = Uuid::new_v4().to_string();
                jobs.insert(
                    id.clone(),
                    JobRecord {
                        id: id.clone(),
                        name: child.name,
                        flow_id: flow_id.clone(),
                        state: JobState::Queued,
                        processed_on: None,
                        finished_on: None,
                    },
                );
                child_ids.push(id);
            }
            self.flow_children
                .lock()
                .unwrap()
                .insert(flow_id.clone(), child_ids.clone());
        }

        for id in &child_ids {
            self.dispatch(id)?;
        }
        debug!("Enqueued flow {} with {} child job(s)", flow_id, child_ids.len());
        Ok(flow_id)
    }

    async fn get_flow(&self, flow_id: &str) -> Result<Option<FlowNode>> {
        let jobs = self.jobs.lock().unwrap();
        let flows = self.flow_children.lock().unwrap();

        let Some(parent) = jobs.get(flow_id) else {
            return Ok(None);
        };
        let Some(child_ids) = flows.get(flow_id) else {
            return Ok(None);
        };

        let children = child_ids
            .iter()
            .filter_map(|id| jobs.get(id).cloned())
            .collect();
        Ok(Some(FlowNode {
            parent: parent.clone(),
            children,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_flow_creates_parent_and_children() {
        let queue = MemoryJobQueue::new();
        let flow_id = queue
            .enqueue_flow(
                JobSpec::new("generate-all"),
                vec![JobSpec::new("accounts"), JobSpec::new("yearly")],
            )
            .await
            .unwrap();

        let flow = queue.get_flow(&flow_id).await.unwrap().unwrap();
        assert_eq!(flow.parent.name, "generate-all");
        assert_eq!(flow.children.len(), 2);
        assert!(flow
            .children
            .iter()
            .all(|child| child.state == JobState::Queued && child.flow_id == flow_id));
    }

    #[tokio::test]
    async fn test_get_flow_unknown_id_is_none() {
        let queue = MemoryJobQueue::new();
        assert!(queue.get_flow("no-such-flow").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_standalone_job_is_not_a_flow() {
        let queue = MemoryJobQueue::new();
        let id = queue.enqueue(JobSpec::new("accounts")).await.unwrap();
        assert!(queue.get_flow(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_children_dispatch_before_parent() {
        let queue = MemoryJobQueue::new();
        let flow_id = queue
            .enqueue_flow(
                JobSpec::new("generate-all"),
                vec![JobSpec::new("accounts"), JobSpec::new("yearly")],
            )
            .await
            .unwrap();

        let first = queue.next_job().await.unwrap();
        let second = queue.next_job().await.unwrap();
        assert_ne!(first.id, flow_id);
        assert_ne!(second.id, flow_id);

        queue.mark_active(&first.id);
        queue.mark_finished(&first.id, false);
        queue.mark_active(&second.id);
        queue.mark_finished(&second.id, true);

        // Both children terminal: the parent is released, failed or not.
        let parent = queue.next_job().await.unwrap();
        assert_eq!(parent.id, flow_id);
    }

    #[tokio::test]
    async fn test_state_stamping() {
        let queue = MemoryJobQueue::new();
        let id = queue.enqueue(JobSpec::new("accounts")).await.unwrap();

        let job = queue.next_job().await.unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert!(job.processed_on.is_none());

        queue.mark_active(&id);
        queue.mark_finished(&id, false);

        let jobs = queue.jobs.lock().unwrap();
        let record = jobs.get(&id).unwrap();
        assert_eq!(record.state, JobState::Completed);
        assert!(record.processed_on.is_some());
        assert!(record.finished_on.is_some());
        assert!(record.finished_on >= record.processed_on);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_submission() {
        let queue = MemoryJobQueue::new();
        queue.close().await;
        let result = queue.enqueue(JobSpec::new("accounts")).await;
        assert!(matches!(result, Err(ReportEngineError::Submission(_))));
    }
}
