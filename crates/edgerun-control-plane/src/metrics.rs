//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use edgerun_core::{JobStatus, Liveness};

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_node_metrics(state, &mut output).await;
    collect_job_metrics(state, &mut output).await;

    output
}

/// Collect node counts by liveness.
async fn collect_node_metrics(state: &Arc<AppState>, output: &mut String) {
    let now = Utc::now();
    let mut alive = 0u64;
    let mut stale = 0u64;

    for node in state.registry.snapshot().await {
        match node.liveness(now, state.liveness_timeout) {
            Liveness::Alive => alive += 1,
            Liveness::Stale => stale += 1,
        }
    }

    writeln!(
        output,
        "# HELP edgerun_nodes Number of known edge nodes by liveness"
    )
    .ok();
    writeln!(output, "# TYPE edgerun_nodes gauge").ok();
    writeln!(output, "edgerun_nodes{{liveness=\"alive\"}} {alive}").ok();
    writeln!(output, "edgerun_nodes{{liveness=\"stale\"}} {stale}").ok();
}

/// Collect job counts by status and the pending queue depth.
async fn collect_job_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = match state.store.status_counts().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Skipping job metrics");
            return;
        }
    };

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP edgerun_jobs_total Total number of jobs by status"
    )
    .ok();
    writeln!(output, "# TYPE edgerun_jobs_total gauge").ok();
    for status in JobStatus::ALL {
        writeln!(
            output,
            "edgerun_jobs_total{{status=\"{}\"}} {}",
            status.as_label(),
            counts.get(status)
        )
        .ok();
    }

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP edgerun_pending_queue_depth Job ids waiting in the pending queue"
    )
    .ok();
    writeln!(output, "# TYPE edgerun_pending_queue_depth gauge").ok();
    writeln!(output, "edgerun_pending_queue_depth {}", counts.queue_depth).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use edgerun_core::{Job, NodeAddress};

    #[tokio::test]
    async fn test_collect_metrics_empty_state() {
        let state = AppState::in_memory(Duration::from_secs(15));
        let output = collect_metrics(&state).await;

        assert!(output.contains("edgerun_nodes{liveness=\"alive\"} 0"));
        assert!(output.contains("edgerun_jobs_total{status=\"pending\"} 0"));
        assert!(output.contains("edgerun_pending_queue_depth 0"));
    }

    #[tokio::test]
    async fn test_collect_metrics_counts() {
        let state = AppState::in_memory(Duration::from_secs(15));
        state
            .store
            .enqueue(Job::new("resize", HashMap::new()))
            .await
            .unwrap();
        state
            .registry
            .record_heartbeat(NodeAddress::parse("http://edge-1").unwrap(), Utc::now())
            .await;
        state
            .registry
            .record_heartbeat(
                NodeAddress::parse("http://edge-2").unwrap(),
                Utc::now() - chrono::Duration::seconds(60),
            )
            .await;

        let output = collect_metrics(&state).await;
        assert!(output.contains("edgerun_nodes{liveness=\"alive\"} 1"));
        assert!(output.contains("edgerun_nodes{liveness=\"stale\"} 1"));
        assert!(output.contains("edgerun_jobs_total{status=\"pending\"} 1"));
        assert!(output.contains("edgerun_pending_queue_depth 1"));
    }
}
