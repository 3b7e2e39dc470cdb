//! HTTP request handlers.

mod health;
mod jobs;
mod nodes;

pub use health::{health_check, metrics_handler};
pub use jobs::{get_job, submit_job};
pub use nodes::{heartbeat, list_nodes};
