//! Job and execution outcome types.

use crate::{JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A Job is a unit of work submitted for execution on an edge node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,

    /// Task type the edge node should run.
    pub task: String,

    /// Task arguments.
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Current job status.
    pub status: JobStatus,

    /// Result payload or error detail, set once the job is terminal.
    #[serde(default)]
    pub result: Option<String>,

    /// When the job was submitted.
    pub created_at: DateTime<Utc>,

    /// When the job record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending Job with a generated id.
    pub fn new(task: impl Into<String>, arguments: HashMap<String, serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            task: task.into(),
            arguments,
            status: JobStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    /// Builder method to add an argument.
    pub fn with_argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    /// Copy of this job marked as running.
    pub fn running(&self) -> Self {
        Self {
            status: JobStatus::Running,
            ..self.clone()
        }
    }

    /// Copy of this job with the terminal status implied by `outcome`.
    pub fn finished(&self, outcome: Outcome) -> Self {
        let (status, result) = match outcome {
            Outcome::Success(payload) => (JobStatus::Completed, payload),
            Outcome::Failure(detail) => (JobStatus::Failed, detail),
        };
        Self {
            status,
            result: Some(result),
            ..self.clone()
        }
    }
}

/// What an edge node made of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The node ran the job; carries its result payload.
    Success(String),
    /// The node, the transport or the deadline failed; carries the error detail.
    Failure(String),
}

impl Outcome {
    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
