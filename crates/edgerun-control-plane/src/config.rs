//! Control plane configuration.

use std::time::Duration;

use clap::Parser;

use crate::dispatcher::{DispatcherConfig, RetryPolicy};

/// EdgeRun control plane.
#[derive(Parser, Debug, Clone)]
#[command(name = "edgerun-control-plane", about = "EdgeRun job dispatch control plane")]
pub struct Config {
    /// HTTP server bind address.
    #[arg(long, env = "EDGERUN_BIND_ADDR", default_value = "[::1]:8080")]
    pub bind_addr: String,

    /// Number of concurrent dispatch workers.
    #[arg(long, env = "EDGERUN_DISPATCH_WORKERS", default_value_t = 4)]
    pub dispatch_workers: usize,

    /// Heartbeat age after which a node is no longer selected (seconds).
    #[arg(long, env = "EDGERUN_LIVENESS_TIMEOUT_SECS", default_value_t = 15)]
    pub liveness_timeout_secs: u64,

    /// Heartbeat age after which a node is forgotten entirely (seconds).
    #[arg(long, env = "EDGERUN_EVICTION_AFTER_SECS", default_value_t = 600)]
    pub eviction_after_secs: u64,

    /// Deadline for a single execute call to an edge node (seconds).
    #[arg(long, env = "EDGERUN_EXECUTION_TIMEOUT_SECS", default_value_t = 30)]
    pub execution_timeout_secs: u64,

    /// Longest an idle dispatch worker waits before polling again (milliseconds).
    #[arg(long, env = "EDGERUN_IDLE_POLL_MS", default_value_t = 1000)]
    pub idle_poll_ms: u64,

    /// Pause after a job found no live node (milliseconds).
    #[arg(long, env = "EDGERUN_NO_NODE_BACKOFF_MS", default_value_t = 1000)]
    pub no_node_backoff_ms: u64,

    /// Attempts at recording a finished job while the store is failing.
    #[arg(long, env = "EDGERUN_TERMINAL_WRITE_ATTEMPTS", default_value_t = 20)]
    pub terminal_write_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "[::1]:8080".to_string(),
            dispatch_workers: 4,
            liveness_timeout_secs: 15,
            eviction_after_secs: 600,
            execution_timeout_secs: 30,
            idle_poll_ms: 1000,
            no_node_backoff_ms: 1000,
            terminal_write_attempts: 20,
        }
    }
}

impl Config {
    /// Heartbeat age after which a node is no longer selected.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    /// Heartbeat age after which a node is evicted.
    pub fn eviction_after(&self) -> Duration {
        Duration::from_secs(self.eviction_after_secs)
    }

    /// Dispatcher settings derived from this config.
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers: self.dispatch_workers,
            liveness_timeout: self.liveness_timeout(),
            execution_timeout: Duration::from_secs(self.execution_timeout_secs),
            idle_poll_interval: Duration::from_millis(self.idle_poll_ms),
            no_node_backoff: Duration::from_millis(self.no_node_backoff_ms),
            retry_policy: RetryPolicy::default(),
            terminal_write_attempts: self.terminal_write_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let parsed = Config::parse_from(["edgerun-control-plane"]);
        let default = Config::default();
        assert_eq!(parsed.bind_addr, default.bind_addr);
        assert_eq!(parsed.liveness_timeout_secs, default.liveness_timeout_secs);
        assert_eq!(parsed.eviction_after_secs, default.eviction_after_secs);
        assert_eq!(parsed.dispatch_workers, default.dispatch_workers);
        assert_eq!(
            parsed.terminal_write_attempts,
            default.terminal_write_attempts
        );
    }

    #[test]
    fn test_dispatcher_config() {
        let config = Config::parse_from([
            "edgerun-control-plane",
            "--liveness-timeout-secs",
            "5",
            "--dispatch-workers",
            "2",
        ]);
        let dispatcher = config.dispatcher();
        assert_eq!(dispatcher.liveness_timeout, Duration::from_secs(5));
        assert_eq!(dispatcher.workers, 2);
        assert_eq!(dispatcher.execution_timeout, Duration::from_secs(30));
    }
}
