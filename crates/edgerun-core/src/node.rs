//! Edge node records.

use crate::NodeAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Derived reachability of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Liveness {
    /// Heartbeat seen within the liveness timeout.
    Alive,
    /// Last heartbeat is at least the liveness timeout old.
    Stale,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => f.pad("ALIVE"),
            Self::Stale => f.pad("STALE"),
        }
    }
}

/// What the registry knows about one edge node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Callable address, unique per node.
    pub address: NodeAddress,

    /// Timestamp of the most recent heartbeat.
    pub last_heartbeat: DateTime<Utc>,
}

impl NodeRecord {
    /// Create a new NodeRecord.
    pub fn new(address: NodeAddress, last_heartbeat: DateTime<Utc>) -> Self {
        Self {
            address,
            last_heartbeat,
        }
    }

    /// Age of the last heartbeat at `now`. Negative ages (heartbeat stamped in
    /// the future) count as zero.
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_heartbeat)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// `Alive` iff `now - last_heartbeat < timeout`.
    pub fn liveness(&self, now: DateTime<Utc>, timeout: Duration) -> Liveness {
        if self.heartbeat_age(now) < timeout {
            Liveness::Alive
        } else {
            Liveness::Stale
        }
    }

    /// Shorthand for `liveness(..) == Liveness::Alive`.
    pub fn is_alive(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.liveness(now, timeout) == Liveness::Alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(at: DateTime<Utc>) -> NodeRecord {
        NodeRecord::new(NodeAddress::parse("http://edge-1:8081").unwrap(), at)
    }

    #[test]
    fn test_liveness_boundary_is_exclusive() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let node = record(t0);
        let timeout = Duration::from_secs(5);

        assert!(node.is_alive(t0 + chrono::Duration::milliseconds(4_999), timeout));
        assert_eq!(
            node.liveness(t0 + chrono::Duration::seconds(5), timeout),
            Liveness::Stale
        );
        assert_eq!(
            node.liveness(t0 + chrono::Duration::seconds(10), timeout),
            Liveness::Stale
        );
    }

    #[test]
    fn test_future_heartbeat_counts_as_fresh() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let node = record(t0 + chrono::Duration::seconds(3));
        assert_eq!(node.heartbeat_age(t0), Duration::ZERO);
        assert!(node.is_alive(t0, Duration::from_secs(5)));
    }

    #[test]
    fn test_liveness_display_pads() {
        assert_eq!(Liveness::Alive.to_string(), "ALIVE");
        assert_eq!(format!("{:<8}|", Liveness::Stale), "STALE   |");
    }
}
