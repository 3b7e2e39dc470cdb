//! HTTP server exposing the execute endpoint.

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use edgerun_core::protocol::{ExecuteRequest, ExecuteResponse};

use crate::executor;

/// Create the node's HTTP router.
pub fn create_router() -> Router {
    Router::new()
        .route("/v1/execute", post(execute_job))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run a job and report the outcome. Task failures are still `200 OK`.
async fn execute_job(Json(req): Json<ExecuteRequest>) -> (StatusCode, Json<ExecuteResponse>) {
    match executor::execute(&req).await {
        Ok(result) => (StatusCode::OK, Json(ExecuteResponse::success(result))),
        Err(e) => {
            warn!(job_id = %req.id, task = %req.task, error = %e, "Job failed");
            (StatusCode::OK, Json(ExecuteResponse::failure(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgerun_core::{JobId, Outcome};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_execute_job_reports_failure_in_body() {
        let (status, Json(body)) = execute_job(Json(ExecuteRequest {
            id: JobId::new("job-1"),
            task: "fail".into(),
            arguments: HashMap::from([("message".to_string(), serde_json::json!("node error"))]),
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.into_outcome(), Outcome::Failure("node error".into()));
    }
}
