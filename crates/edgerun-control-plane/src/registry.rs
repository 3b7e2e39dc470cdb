//! Node registry - heartbeat-driven liveness of edge nodes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use edgerun_core::{NodeAddress, NodeRecord};

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No live edge node available")]
    NoAvailableNode,
}

/// Tracks the last heartbeat of every known node.
///
/// Liveness is never stored; it is recomputed from `last_heartbeat` against
/// the caller's `now` on every query.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<NodeAddress, DateTime<Utc>>>,
    cursor: AtomicUsize,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the heartbeat for `address`. Older timestamps are ignored.
    ///
    /// Returns true if `last_heartbeat` moved forward (or the node is new).
    pub async fn record_heartbeat(&self, address: NodeAddress, at: DateTime<Utc>) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&address) {
            Some(last) if *last >= at => {
                debug!(node = %address, at = %at, last = %last, "Ignoring out-of-order heartbeat");
                false
            }
            Some(last) => {
                *last = at;
                true
            }
            None => {
                info!(node = %address, "Edge node registered");
                nodes.insert(address, at);
                true
            }
        }
    }

    /// Addresses whose last heartbeat is younger than `timeout`, unordered.
    pub async fn live_nodes(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<NodeAddress> {
        self.nodes
            .read()
            .await
            .iter()
            .map(|(address, at)| NodeRecord::new(address.clone(), *at))
            .filter(|record| record.is_alive(now, timeout))
            .map(|record| record.address)
            .collect()
    }

    /// Pick one live node, rotating through the live set.
    pub async fn select_node(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<NodeAddress, RegistryError> {
        let mut live = self.live_nodes(now, timeout).await;
        if live.is_empty() {
            return Err(RegistryError::NoAvailableNode);
        }

        // Sort so the cursor walks a stable order.
        live.sort();
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % live.len();
        Ok(live.swap_remove(slot))
    }

    /// Every known node, sorted by address.
    pub async fn snapshot(&self) -> Vec<NodeRecord> {
        let mut records: Vec<NodeRecord> = self
            .nodes
            .read()
            .await
            .iter()
            .map(|(address, at)| NodeRecord::new(address.clone(), *at))
            .collect();
        records.sort_by(|a, b| a.address.cmp(&b.address));
        records
    }

    /// Drop nodes silent for at least `max_age`. Returns the evicted addresses.
    pub async fn evict_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<NodeAddress> {
        let mut nodes = self.nodes.write().await;
        let mut evicted = Vec::new();

        nodes.retain(|address, at| {
            let keep = NodeRecord::new(address.clone(), *at).is_alive(now, max_age);
            if !keep {
                evicted.push(address.clone());
            }
            keep
        });

        evicted
    }

    /// Number of known nodes, live or not.
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    /// True if no node has ever sent a heartbeat (or all were evicted).
    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_out_of_order_heartbeat_ignored() {
        let registry = NodeRegistry::new();
        let node = addr("http://edge-1:8081");

        assert!(registry.record_heartbeat(node.clone(), t0() + secs(10)).await);
        assert!(!registry.record_heartbeat(node.clone(), t0()).await);
        // Same timestamp again is a no-op too.
        assert!(!registry.record_heartbeat(node.clone(), t0() + secs(10)).await);

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].last_heartbeat, t0() + secs(10));
    }

    #[tokio::test]
    async fn test_stale_node_excluded() {
        let registry = NodeRegistry::new();
        registry
            .record_heartbeat(addr("http://old:8081"), t0())
            .await;
        registry
            .record_heartbeat(addr("http://fresh:8081"), t0() + secs(8))
            .await;

        let now = t0() + secs(10);
        let live = registry.live_nodes(now, TIMEOUT).await;
        assert_eq!(live, vec![addr("http://fresh:8081")]);

        for _ in 0..5 {
            let picked = registry.select_node(now, TIMEOUT).await.unwrap();
            assert_eq!(picked, addr("http://fresh:8081"));
        }
    }

    #[tokio::test]
    async fn test_no_live_node() {
        let registry = NodeRegistry::new();
        assert_eq!(
            registry.select_node(t0(), TIMEOUT).await,
            Err(RegistryError::NoAvailableNode)
        );

        registry.record_heartbeat(addr("http://edge-1"), t0()).await;
        assert_eq!(
            registry.select_node(t0() + secs(10), TIMEOUT).await,
            Err(RegistryError::NoAvailableNode)
        );
    }

    #[tokio::test]
    async fn test_round_robin_spreads_load() {
        let registry = NodeRegistry::new();
        for name in ["http://a", "http://b", "http://c"] {
            registry.record_heartbeat(addr(name), t0()).await;
        }

        let now = t0() + secs(1);
        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(registry.select_node(now, TIMEOUT).await.unwrap());
        }

        let distinct: HashSet<_> = picks[..3].iter().cloned().collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(picks[..3], picks[3..]);
    }

    #[tokio::test]
    async fn test_evict_stale() {
        let registry = NodeRegistry::new();
        registry.record_heartbeat(addr("http://gone"), t0()).await;
        registry
            .record_heartbeat(addr("http://here"), t0() + secs(590))
            .await;

        let evicted = registry
            .evict_stale(t0() + secs(600), Duration::from_secs(600))
            .await;
        assert_eq!(evicted, vec![addr("http://gone")]);
        assert_eq!(registry.len().await, 1);
    }
}
