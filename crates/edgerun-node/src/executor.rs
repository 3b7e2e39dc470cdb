//! Built-in task execution.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use edgerun_core::protocol::ExecuteRequest;

/// Longest a `sleep` task may ask for.
const MAX_SLEEP_MS: u64 = 10 * 60 * 1000;

/// Errors that end a task as failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("{0}")]
    Requested(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Run a task and produce its result payload.
///
/// - `echo`: returns the arguments as a JSON object
/// - `sleep`: waits `ms` milliseconds, returns `"slept <ms>ms"`
/// - `fail`: fails with `message` (default `"requested failure"`)
pub async fn execute(req: &ExecuteRequest) -> Result<String, ExecutorError> {
    info!(job_id = %req.id, task = %req.task, "Executing job");

    match req.task.as_str() {
        "echo" => echo(&req.arguments),
        "sleep" => {
            let ms = u64_arg(&req.arguments, "ms")?;
            if ms > MAX_SLEEP_MS {
                return Err(ExecutorError::InvalidArgument {
                    name: "ms",
                    reason: format!("must be at most {MAX_SLEEP_MS}"),
                });
            }
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(format!("slept {ms}ms"))
        }
        "fail" => {
            let message = req
                .arguments
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("requested failure");
            Err(ExecutorError::Requested(message.to_string()))
        }
        other => Err(ExecutorError::UnknownTask(other.to_string())),
    }
}

fn echo(arguments: &HashMap<String, Value>) -> Result<String, ExecutorError> {
    serde_json::to_string(arguments).map_err(|e| ExecutorError::Serialization(e.to_string()))
}

fn u64_arg(arguments: &HashMap<String, Value>, name: &'static str) -> Result<u64, ExecutorError> {
    arguments
        .get(name)
        .ok_or_else(|| ExecutorError::InvalidArgument {
            name,
            reason: "missing".to_string(),
        })?
        .as_u64()
        .ok_or_else(|| ExecutorError::InvalidArgument {
            name,
            reason: "expected a non-negative integer".to_string(),
        })
}
