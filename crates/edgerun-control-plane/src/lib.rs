//! EdgeRun Control Plane Library
//!
//! This crate provides the job dispatch and node-liveness engine: the job
//! store, the heartbeat-driven node registry, the execution client and the
//! dispatcher, plus the thin HTTP boundary in front of them.

pub mod config;
pub mod dispatcher;
pub mod execution;
pub mod http;
pub mod metrics;
pub mod reaper;
pub mod registry;
pub mod state;
pub mod store;

pub use config::Config;
pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher, DispatcherConfig, RetryPolicy};
pub use execution::{ExecutionClient, HttpExecutionClient};
pub use registry::{NodeRegistry, RegistryError};
pub use state::AppState;
pub use store::{InMemoryJobStore, JobStore, StatusCounts, StoreError};
