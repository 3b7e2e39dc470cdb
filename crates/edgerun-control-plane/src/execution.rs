//! Execution client - hands a job to an edge node.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use edgerun_core::protocol::{ExecuteRequest, ExecuteResponse};
use edgerun_core::{Job, NodeAddress, Outcome};

/// Path every edge node serves job execution on.
pub const EXECUTE_PATH: &str = "/v1/execute";

/// Performs the remote call for one job.
///
/// Implementations never error: transport trouble, a bad response or a missed
/// deadline all come back as `Outcome::Failure`.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute(&self, job: &Job, node: &NodeAddress, timeout: Duration) -> Outcome;
}

/// Calls `POST {node}/v1/execute` with a JSON body.
#[derive(Clone, Default)]
pub struct HttpExecutionClient {
    inner: reqwest::Client,
}

impl HttpExecutionClient {
    /// Create a new HTTP execution client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn execute(&self, job: &Job, node: &NodeAddress, timeout: Duration) -> Outcome {
        let url = node.url(EXECUTE_PATH);
        debug!(job_id = %job.id, url = %url, "POST execute");

        let response = match self
            .inner
            .post(&url)
            .timeout(timeout)
            .json(&ExecuteRequest::from(job))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Outcome::Failure(format!(
                    "execution timed out after {}ms",
                    timeout.as_millis()
                ));
            }
            Err(e) => return Outcome::Failure(format!("request to {node} failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(job_id = %job.id, node = %node, status = %status, "Edge node returned error status");
            // Nodes report job failures with a JSON body even on error statuses.
            return match serde_json::from_str::<ExecuteResponse>(&body) {
                Ok(parsed) if !parsed.success => parsed.into_outcome(),
                _ => Outcome::Failure(format!("HTTP {status}: {body}")),
            };
        }

        match response.json::<ExecuteResponse>().await {
            Ok(parsed) => parsed.into_outcome(),
            Err(e) if e.is_timeout() => Outcome::Failure(format!(
                "execution timed out after {}ms",
                timeout.as_millis()
            )),
            Err(e) => Outcome::Failure(format!("malformed response from {node}: {e}")),
        }
    }
}
