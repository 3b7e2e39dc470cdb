//! Core domain errors.

use thiserror::Error;

use crate::JobStatus;

/// Core domain errors for EdgeRun.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Status change that violates the job lifecycle.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },

    /// Address a node announced that cannot be used as a callback target.
    #[error("Invalid node address: {0}")]
    InvalidNodeAddress(String),
}
