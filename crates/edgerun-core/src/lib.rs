//! EdgeRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Storage backends
//! - Runtime specifics
//!
//! All types here describe jobs, edge nodes and the JSON messages the
//! control plane, the nodes and the CLI exchange.

pub mod error;
pub mod ids;
pub mod job;
pub mod node;
pub mod protocol;
pub mod status;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{JobId, NodeAddress};
pub use job::{Job, Outcome};
pub use node::{Liveness, NodeRecord};
pub use status::JobStatus;
