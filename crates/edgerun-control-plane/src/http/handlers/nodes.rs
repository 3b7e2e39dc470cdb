//! Heartbeat and node list handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::debug;

use edgerun_core::protocol::{HeartbeatRequest, NodeResponse};
use edgerun_core::NodeAddress;

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Record a heartbeat from a node announcing its own callable address.
///
/// The heartbeat is stamped with the receive time. The node's own `sent_at`
/// is only logged, so a node with a skewed clock is judged on when it was
/// actually heard from.
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<StatusCode, ApiError> {
    let address =
        NodeAddress::parse(&req.address).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let received = Utc::now();
    let skew_ms = req
        .sent_at
        .map(|sent| received.signed_duration_since(sent).num_milliseconds());

    let advanced = state.registry.record_heartbeat(address.clone(), received).await;
    debug!(node = %address, at = %received, ?skew_ms, advanced, "Heartbeat");

    Ok(StatusCode::NO_CONTENT)
}

/// List known nodes with their current liveness.
pub async fn list_nodes(State(state): State<Arc<AppState>>) -> Json<Vec<NodeResponse>> {
    let now = Utc::now();
    let nodes = state
        .registry
        .snapshot()
        .await
        .into_iter()
        .map(|record| NodeResponse {
            liveness: record.liveness(now, state.liveness_timeout),
            address: record.address,
            last_heartbeat: record.last_heartbeat,
        })
        .collect();
    Json(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use edgerun_core::Liveness;

    #[tokio::test]
    async fn test_heartbeat_registers_node() {
        let state = AppState::in_memory(Duration::from_secs(5));
        let status = heartbeat(
            State(state.clone()),
            Json(HeartbeatRequest {
                address: "http://10.0.0.7:8081/".into(),
                sent_at: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(nodes) = list_nodes(State(state)).await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].address.as_str(), "http://10.0.0.7:8081");
        assert_eq!(nodes[0].liveness, Liveness::Alive);
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_bad_address() {
        let state = AppState::in_memory(Duration::from_secs(5));
        let err = heartbeat(
            State(state.clone()),
            Json(HeartbeatRequest {
                address: "10.0.0.7".into(),
                sent_at: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_slow_node_clock_stays_alive() {
        let state = AppState::in_memory(Duration::from_secs(15));
        for _ in 0..3 {
            heartbeat(
                State(state.clone()),
                Json(HeartbeatRequest {
                    address: "http://edge-1".into(),
                    sent_at: Some(Utc::now() - chrono::Duration::seconds(20)),
                }),
            )
            .await
            .unwrap();
        }

        let live = state
            .registry
            .live_nodes(Utc::now(), state.liveness_timeout)
            .await;
        assert_eq!(live, vec![NodeAddress::parse("http://edge-1").unwrap()]);
    }

    #[tokio::test]
    async fn test_fast_node_clock_is_not_trusted() {
        let state = AppState::in_memory(Duration::from_secs(5));
        heartbeat(
            State(state.clone()),
            Json(HeartbeatRequest {
                address: "http://edge-1".into(),
                sent_at: Some(Utc::now() + chrono::Duration::hours(1)),
            }),
        )
        .await
        .unwrap();

        let snapshot = state.registry.snapshot().await;
        assert!(snapshot[0].last_heartbeat <= Utc::now());
    }

    #[tokio::test]
    async fn test_silent_node_reports_stale() {
        let state = AppState::in_memory(Duration::from_secs(5));
        state
            .registry
            .record_heartbeat(
                NodeAddress::parse("http://edge-1").unwrap(),
                Utc::now() - chrono::Duration::seconds(10),
            )
            .await;

        let Json(nodes) = list_nodes(State(state)).await;
        assert_eq!(nodes[0].liveness, Liveness::Stale);
    }
}
