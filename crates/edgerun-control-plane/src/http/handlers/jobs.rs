//! Job submission and status handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use edgerun_core::protocol::{JobResponse, SubmitJobRequest};
use edgerun_core::{Job, JobId};

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Accept a job and put it on the pending queue.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let task = req.task.trim();
    if task.is_empty() {
        return Err(ApiError::bad_request("task must not be empty"));
    }

    let job = Job::new(task, req.arguments);
    state.store.enqueue(job.clone()).await?;

    info!(job_id = %job.id, task = %job.task, "Job submitted");
    Ok((StatusCode::CREATED, Json(job.into())))
}

/// Look up the last recorded state of a job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.store.get(&JobId::new(id)).await?;
    Ok(Json(job.into()))
}
