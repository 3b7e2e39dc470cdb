//! HTTP client for the control plane API.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use edgerun_core::protocol::{
    ErrorResponse, JobResponse, NodeResponse, SubmitJobRequest,
};

/// Errors that can occur when talking to the control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success response.
    #[error("HTTP {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// HTTP client for the control plane REST API.
pub struct ControlPlaneClient {
    inner: reqwest::Client,
    base_url: String,
}

impl ControlPlaneClient {
    /// Create a new client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a job.
    pub async fn submit(&self, req: &SubmitJobRequest) -> Result<JobResponse, ClientError> {
        self.post_json("/v1/jobs", req).await
    }

    /// Look up a job.
    pub async fn job(&self, id: &str) -> Result<JobResponse, ClientError> {
        self.get_json(&format!("/v1/jobs/{id}")).await
    }

    /// List known nodes.
    pub async fn nodes(&self) -> Result<Vec<NodeResponse>, ClientError> {
        self.get_json("/v1/nodes").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        Self::decode(response, path).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;
        Self::decode(response, path).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ClientError::Api { status, message });
        }
        Ok(response.json().await?)
    }
}
