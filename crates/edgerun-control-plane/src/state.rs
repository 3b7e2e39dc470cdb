//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use crate::registry::NodeRegistry;
use crate::store::{InMemoryJobStore, JobStore};

/// State shared by the HTTP handlers, the dispatcher and the node reaper.
pub struct AppState {
    /// Job records and the pending queue.
    pub store: Arc<dyn JobStore>,

    /// Heartbeat registry of edge nodes.
    pub registry: Arc<NodeRegistry>,

    /// Heartbeat age after which a node is reported stale.
    pub liveness_timeout: Duration,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<NodeRegistry>,
        liveness_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            registry,
            liveness_timeout,
        })
    }

    /// In-memory state with the given liveness timeout.
    pub fn in_memory(liveness_timeout: Duration) -> Arc<Self> {
        Self::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(NodeRegistry::new()),
            liveness_timeout,
        )
    }
}
