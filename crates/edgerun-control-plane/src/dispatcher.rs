//! Dispatcher - matches pending jobs to live edge nodes.
//!
//! Each worker repeats one dispatch pass:
//! 1. dequeue the next pending job (idle-wait when there is none)
//! 2. pick a live node; with none, put the job back at the front and back off
//! 3. record `Running`, call the node under a deadline
//! 4. record `Completed` or `Failed` from the outcome
//!
//! Store failures are retried with backoff and never change a job's status.
//! An execution failure is final for the job. Once a node has answered,
//! shutdown no longer cuts the terminal write short.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use edgerun_core::{Job, JobId, Outcome};

use crate::execution::ExecutionClient;
use crate::registry::{NodeRegistry, RegistryError};
use crate::store::{JobStore, StoreError};

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Dispatcher shut down before job {0} was recorded")]
    Interrupted(JobId),
}

impl DispatchError {
    /// True for infrastructure failures the worker loop backs off from.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Interrupted(_) => false,
        }
    }
}

/// Backoff for transient store failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub base_delay: Duration,

    /// Growth factor per consecutive failure.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-indexed):
    /// `min(base_delay * multiplier^(attempt - 1), max_delay)`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of concurrent dispatch workers.
    pub workers: usize,

    /// Maximum heartbeat age for a node to be selectable.
    pub liveness_timeout: Duration,

    /// Deadline for a single execute call.
    pub execution_timeout: Duration,

    /// Longest an idle worker sleeps before polling the queue again.
    pub idle_poll_interval: Duration,

    /// Pause after putting a job back because no node was live.
    pub no_node_backoff: Duration,

    /// Backoff for store failures.
    pub retry_policy: RetryPolicy,

    /// Attempts at recording a finished job before its outcome is given up.
    pub terminal_write_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            liveness_timeout: Duration::from_secs(15),
            execution_timeout: Duration::from_secs(30),
            idle_poll_interval: Duration::from_secs(1),
            no_node_backoff: Duration::from_secs(1),
            retry_policy: RetryPolicy::default(),
            terminal_write_attempts: 20,
        }
    }
}

/// Result of a single dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The pending queue was empty.
    Idle,
    /// No live node; the job went back to the front of the queue still `Pending`.
    NoAvailableNode(JobId),
    /// The node reported success.
    Completed(JobId),
    /// The node reported failure, or the call failed or timed out.
    Failed(JobId),
}

/// Job dispatcher. Owns no job or node state of its own.
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    registry: Arc<NodeRegistry>,
    client: Arc<dyn ExecutionClient>,
    config: DispatcherConfig,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Create a new Dispatcher.
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<NodeRegistry>,
        client: Arc<dyn ExecutionClient>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            registry,
            client,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops `run` when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask all workers to stop after their current pass.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run the worker pool until shutdown.
    pub async fn run(self: Arc<Self>) {
        let workers = self.config.workers.max(1);
        info!(
            workers,
            liveness_timeout_ms = self.config.liveness_timeout.as_millis() as u64,
            execution_timeout_ms = self.config.execution_timeout.as_millis() as u64,
            "Dispatcher started"
        );

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(self.clone().worker_loop(worker));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatch worker panicked");
            }
        }

        info!("Dispatcher stopped");
    }

    async fn worker_loop(self: Arc<Self>, worker: usize) {
        let mut failures = 0u32;

        while !self.shutdown.is_cancelled() {
            match self.dispatch_once().await {
                Ok(DispatchOutcome::Idle) => {
                    failures = 0;
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = self.store.wait_for_work(self.config.idle_poll_interval) => {}
                    }
                }
                Ok(DispatchOutcome::NoAvailableNode(job_id)) => {
                    failures = 0;
                    debug!(worker, job_id = %job_id, "No live node, backing off");
                    self.pause(self.config.no_node_backoff).await;
                }
                Ok(DispatchOutcome::Completed(_)) | Ok(DispatchOutcome::Failed(_)) => {
                    failures = 0;
                }
                Err(e) if e.is_transient() => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.retry_policy.next_delay(failures);
                    warn!(worker, error = %e, failures, delay_ms = delay.as_millis() as u64, "Store unavailable, backing off");
                    self.pause(delay).await;
                }
                Err(e) => {
                    error!(worker, error = %e, "Dispatch pass failed");
                }
            }
        }

        debug!(worker, "Dispatch worker exiting");
    }

    /// Run a single dispatch pass.
    pub async fn dispatch_once(&self) -> Result<DispatchOutcome, DispatchError> {
        let Some(job) = self.store.dequeue_next().await? else {
            return Ok(DispatchOutcome::Idle);
        };

        let node = match self
            .registry
            .select_node(Utc::now(), self.config.liveness_timeout)
            .await
        {
            Ok(node) => node,
            Err(RegistryError::NoAvailableNode) => {
                self.return_to_queue(&job).await?;
                return Ok(DispatchOutcome::NoAvailableNode(job.id));
            }
        };

        let running = match self.persist_running(job.running()).await {
            Ok(running) => running,
            Err(e @ DispatchError::Interrupted(_)) => {
                // Still pending in the store; keep it dispatchable.
                self.requeue_on_shutdown(&job.id).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(job_id = %running.id, task = %running.task, node = %node, "Dispatching job");

        let timeout = self.config.execution_timeout;
        let outcome = match tokio::time::timeout(
            timeout,
            self.client.execute(&running, &node, timeout),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Failure(format!(
                "execution timed out after {}ms",
                timeout.as_millis()
            )),
        };

        let succeeded = outcome.is_success();
        if let Outcome::Failure(detail) = &outcome {
            warn!(job_id = %running.id, node = %node, error = %detail, "Job failed");
        }

        let finished = self.persist_outcome(running.finished(outcome)).await?;
        info!(job_id = %finished.id, status = %finished.status, "Job finished");

        Ok(if succeeded {
            DispatchOutcome::Completed(finished.id)
        } else {
            DispatchOutcome::Failed(finished.id)
        })
    }

    /// Record `Running`, retrying transient store failures until it
    /// lands, the error is permanent, or the dispatcher shuts down.
    async fn persist_running(&self, job: Job) -> Result<Job, DispatchError> {
        let mut attempt = 0u32;
        loop {
            match self.store.update(job.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_transient() => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.config.retry_policy.next_delay(attempt);
                    warn!(job_id = %job.id, status = %job.status, error = %e, attempt, "Retrying job update");
                    if !self.pause(delay).await {
                        error!(job_id = %job.id, status = %job.status, "Shutdown before job update was recorded");
                        return Err(DispatchError::Interrupted(job.id));
                    }
                }
                Err(e) => {
                    error!(job_id = %job.id, status = %job.status, error = %e, "Job update rejected");
                    return Err(e.into());
                }
            }
        }
    }

    /// Record a terminal status. Shutdown does not stop the retries; only
    /// a permanent error or `terminal_write_attempts` failures do.
    async fn persist_outcome(&self, job: Job) -> Result<Job, DispatchError> {
        let attempts = self.config.terminal_write_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match self.store.update(job.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    attempt += 1;
                    let delay = self.config.retry_policy.next_delay(attempt);
                    warn!(job_id = %job.id, status = %job.status, error = %e, attempt, "Retrying job outcome");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        job_id = %job.id,
                        status = %job.status,
                        result = ?job.result,
                        error = %e,
                        attempts = attempt + 1,
                        "Job outcome could not be recorded"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    /// Last attempt at keeping a pending job in the queue after shutdown cut
    /// its retries short.
    async fn requeue_on_shutdown(&self, id: &JobId) {
        if let Err(e) = self.store.requeue_front(id).await {
            error!(job_id = %id, error = %e, "Failed to requeue job");
        }
    }

    /// Put a job that found no node back at the head of the queue.
    async fn return_to_queue(&self, job: &Job) -> Result<(), DispatchError> {
        let mut attempt = 0u32;
        loop {
            match self.store.requeue_front(&job.id).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.config.retry_policy.next_delay(attempt);
                    warn!(job_id = %job.id, error = %e, attempt, "Retrying requeue");
                    if !self.pause(delay).await {
                        self.requeue_on_shutdown(&job.id).await;
                        return Err(DispatchError::Interrupted(job.id.clone()));
                    }
                }
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Requeue rejected");
                    return Err(e.into());
                }
            }
        }
    }

    /// Sleep for `delay`. Returns false if shutdown was requested meanwhile.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
