//! Heartbeat loop: announces this node to the control plane.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use edgerun_core::protocol::HeartbeatRequest;
use edgerun_core::NodeAddress;

/// Heartbeat delivery errors.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Control plane rejected heartbeat: HTTP {0}")]
    Rejected(reqwest::StatusCode),
}

/// Sends heartbeats for one advertised address.
pub struct HeartbeatSender {
    client: reqwest::Client,
    url: String,
    address: NodeAddress,
}

impl HeartbeatSender {
    /// Create a new HeartbeatSender.
    pub fn new(control_plane: &str, address: NodeAddress) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/v1/heartbeat", control_plane.trim_end_matches('/')),
            address,
        }
    }

    /// Send a single heartbeat.
    pub async fn send(&self) -> Result<(), HeartbeatError> {
        let body = HeartbeatRequest {
            address: self.address.to_string(),
            sent_at: Some(Utc::now()),
        };

        let response = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(5))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HeartbeatError::Rejected(response.status()));
        }
        Ok(())
    }

    /// Send heartbeats every `interval` until shutdown. Failures are logged
    /// and the next tick tries again.
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        info!(
            control_plane = %self.url,
            address = %self.address,
            interval_secs = interval.as_secs(),
            "Starting heartbeat loop"
        );

        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut connected = false;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.send().await {
                Ok(()) => {
                    if !connected {
                        info!("Registered with control plane");
                        connected = true;
                    }
                    debug!("Heartbeat sent");
                }
                Err(e) => {
                    if connected {
                        warn!(error = %e, "Lost contact with control plane");
                    } else {
                        debug!(error = %e, "Heartbeat failed");
                    }
                    connected = false;
                }
            }
        }

        info!("Heartbeat loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{http::StatusCode, routing::post, Json, Router};
    use tokio::net::TcpListener;

    /// Serve a fake control plane on an ephemeral port.
    async fn spawn_control_plane(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn advertised() -> NodeAddress {
        NodeAddress::parse("http://10.0.0.7:8081").unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_advertised_address() {
        let seen: Arc<Mutex<Vec<HeartbeatRequest>>> = Arc::default();
        let recorder = seen.clone();
        let control_plane = spawn_control_plane(Router::new().route(
            "/v1/heartbeat",
            post(move |Json(req): Json<HeartbeatRequest>| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(req);
                    StatusCode::NO_CONTENT
                }
            }),
        ))
        .await;

        let sender = HeartbeatSender::new(&format!("{control_plane}/"), advertised());
        sender.send().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].address, "http://10.0.0.7:8081");
        assert!(seen[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_rejected() {
        let control_plane = spawn_control_plane(Router::new().route(
            "/v1/heartbeat",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = HeartbeatSender::new(&control_plane, advertised())
            .send()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HeartbeatError::Rejected(status) if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn test_run_retries_after_failure_and_stops_on_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let control_plane = spawn_control_plane(Router::new().route(
            "/v1/heartbeat",
            post(move || {
                let counter = counter.clone();
                async move {
                    // First beat is refused; the next tick must try again.
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::NO_CONTENT
                    }
                }
            }),
        ))
        .await;

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            HeartbeatSender::new(&control_plane, advertised())
                .run(Duration::from_millis(10), shutdown.clone()),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while calls.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("heartbeats should keep flowing after a refusal");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("heartbeat loop should stop on cancel")
            .unwrap();
    }
}
