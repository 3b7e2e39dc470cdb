//! Job store - job records and the pending-work queue.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use edgerun_core::{CoreError, Job, JobId, JobStatus};

/// Job store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

impl StoreError {
    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    fn transition(id: &JobId, err: CoreError) -> Self {
        match err {
            CoreError::InvalidStateTransition { from, to } => Self::InvalidTransition {
                id: id.clone(),
                from,
                to,
            },
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Job counts by status plus queue depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub queue_depth: usize,
}

impl StatusCounts {
    /// Count for a single status.
    pub fn get(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Running => self.running,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
        }
    }
}

/// Durable record of jobs and the FIFO of pending job ids.
///
/// Implementations must be safe to share between dispatcher workers and
/// request handlers; `dequeue_next` in particular never hands the same job to
/// two callers.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `Pending` job and append it to the pending queue.
    async fn enqueue(&self, job: Job) -> Result<(), StoreError>;

    /// Remove and return the head of the pending queue.
    async fn dequeue_next(&self) -> Result<Option<Job>, StoreError>;

    /// Put a dequeued, still-pending job back at the head of the queue.
    async fn requeue_front(&self, id: &JobId) -> Result<(), StoreError>;

    /// Current snapshot of a job.
    async fn get(&self, id: &JobId) -> Result<Job, StoreError>;

    /// Overwrite the status and result of a job, stamping `updated_at`.
    ///
    /// The result is only taken when the new status is terminal; `task`,
    /// `arguments` and `created_at` are never changed.
    async fn update(&self, job: Job) -> Result<Job, StoreError>;

    /// Suspend until new work is signalled or `max_wait` elapses.
    async fn wait_for_work(&self, max_wait: Duration);

    /// Job counts by status.
    async fn status_counts(&self) -> Result<StatusCounts, StoreError>;
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    pending: VecDeque<JobId>,
}

/// In-process job store.
#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<Inner>,
    work: Notify,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids currently in the pending queue.
    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, job: Job) -> Result<(), StoreError> {
        if job.status != JobStatus::Pending {
            return Err(StoreError::InvalidTransition {
                id: job.id.clone(),
                from: JobStatus::Pending,
                to: job.status,
            });
        }

        {
            let mut inner = self.inner.lock().await;
            if inner.jobs.contains_key(&job.id) {
                return Err(StoreError::Persistence(format!(
                    "job {} already exists",
                    job.id
                )));
            }
            inner.pending.push_back(job.id.clone());
            debug!(job_id = %job.id, depth = inner.pending.len(), "Job enqueued");
            inner.jobs.insert(job.id.clone(), job);
        }

        self.work.notify_one();
        Ok(())
    }

    async fn dequeue_next(&self) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.lock().await;

        while let Some(id) = inner.pending.pop_front() {
            match inner.jobs.get(&id) {
                Some(job) if job.status == JobStatus::Pending => return Ok(Some(job.clone())),
                // Stale entry; the job moved on without passing through the queue.
                _ => continue,
            }
        }

        Ok(None)
    }

    async fn requeue_front(&self, id: &JobId) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock().await;
            let job = inner
                .jobs
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            if job.status != JobStatus::Pending {
                return Err(StoreError::InvalidTransition {
                    id: id.clone(),
                    from: job.status,
                    to: JobStatus::Pending,
                });
            }

            if !inner.pending.contains(id) {
                inner.pending.push_front(id.clone());
            }
        }

        // Requeued jobs do not wake idle workers.
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.inner
            .lock()
            .await
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update(&self, job: Job) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| StoreError::NotFound(job.id.clone()))?;

        let status = stored
            .status
            .transition(job.status)
            .map_err(|e| StoreError::transition(&job.id, e))?;

        stored.status = status;
        // Only a terminal status carries a result.
        if status.is_terminal() {
            stored.result = job.result;
        }
        stored.updated_at = Utc::now().max(stored.updated_at);
        let updated = stored.clone();

        if status != JobStatus::Pending {
            inner.pending.retain(|queued| *queued != updated.id);
        }

        Ok(updated)
    }

    async fn wait_for_work(&self, max_wait: Duration) {
        let _ = tokio::time::timeout(max_wait, self.work.notified()).await;
    }

    async fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let inner = self.inner.lock().await;
        let mut counts = StatusCounts {
            queue_depth: inner.pending.len(),
            ..Default::default()
        };

        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }

        Ok(counts)
    }
}
