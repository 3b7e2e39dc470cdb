//! Edge node configuration.

use std::time::Duration;

use clap::Parser;

/// EdgeRun edge node.
#[derive(Parser, Debug, Clone)]
#[command(name = "edgerun-node", about = "EdgeRun edge node daemon")]
pub struct Config {
    /// Address the execute endpoint listens on.
    #[arg(long, env = "EDGERUN_NODE_LISTEN_ADDR", default_value = "0.0.0.0:8081")]
    pub listen_addr: String,

    /// Base URL the control plane should call this node on.
    #[arg(long, env = "EDGERUN_NODE_ADVERTISE_ADDR", default_value = "http://127.0.0.1:8081")]
    pub advertise_addr: String,

    /// Control plane base URL.
    #[arg(long, env = "EDGERUN_CONTROL_PLANE", default_value = "http://[::1]:8080")]
    pub control_plane: String,

    /// Heartbeat interval in seconds.
    #[arg(long, env = "EDGERUN_HEARTBEAT_INTERVAL_SECS", default_value_t = 5)]
    pub heartbeat_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
            advertise_addr: "http://127.0.0.1:8081".to_string(),
            control_plane: "http://[::1]:8080".to_string(),
            heartbeat_interval_secs: 5,
        }
    }
}

impl Config {
    /// Heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}
