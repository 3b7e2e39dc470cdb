//! JSON messages exchanged between the control plane, edge nodes and clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Job, JobId, JobStatus, Liveness, NodeAddress, Outcome};

// ============================================================================
// Submission and status
// ============================================================================

/// Body of `POST /v1/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub task: String,
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

/// A job as reported by the status boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: JobId,
    pub task: String,
    pub arguments: HashMap<String, serde_json::Value>,
    pub status: JobStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            task: job.task,
            arguments: job.arguments,
            status: job.status,
            result: job.result,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ============================================================================
// Heartbeats and node listing
// ============================================================================

/// Body of `POST /v1/heartbeat`. The node names its own callable address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// One entry of `GET /v1/nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub address: NodeAddress,
    pub last_heartbeat: DateTime<Utc>,
    pub liveness: Liveness,
}

// ============================================================================
// Execution
// ============================================================================

/// Body of `POST {node}/v1/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub id: JobId,
    pub task: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl From<&Job> for ExecuteRequest {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            task: job.task.clone(),
            arguments: job.arguments.clone(),
        }
    }
}

/// What an edge node answers to an execute call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteResponse {
    /// Successful response carrying `result`.
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error: None,
        }
    }

    /// Failed response carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Interpret the response. A success without a result body is malformed.
    pub fn into_outcome(self) -> Outcome {
        match (self.success, self.result, self.error) {
            (true, Some(result), _) => Outcome::Success(result),
            (true, None, _) => {
                Outcome::Failure("malformed response: success without result".to_string())
            }
            (false, _, Some(error)) => Outcome::Failure(error),
            (false, _, None) => Outcome::Failure("node reported failure".to_string()),
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_response_outcomes() {
        assert_eq!(
            ExecuteResponse::success("42").into_outcome(),
            Outcome::Success("42".into())
        );
        assert_eq!(
            ExecuteResponse::failure("node error").into_outcome(),
            Outcome::Failure("node error".into())
        );

        let no_result: ExecuteResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(!no_result.into_outcome().is_success());

        let bare_failure: ExecuteResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(
            bare_failure.into_outcome(),
            Outcome::Failure("node reported failure".into())
        );
    }

    #[test]
    fn test_submit_request_arguments_default_to_empty() {
        let req: SubmitJobRequest = serde_json::from_str(r#"{"task": "resize"}"#).unwrap();
        assert_eq!(req.task, "resize");
        assert!(req.arguments.is_empty());
    }
}
