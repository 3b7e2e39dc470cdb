//! Job lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Status of a Job.
///
/// The only legal walk is `Pending -> Running -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job accepted and waiting in the pending queue.
    #[default]
    Pending,
    /// Job handed to an edge node.
    Running,
    /// Edge node reported success.
    Completed,
    /// Edge node reported an error, or the call failed or timed out.
    Failed,
}

impl JobStatus {
    /// Returns true if no further status change is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Validate a move to `next`, returning `next` if it is allowed.
    ///
    /// Re-writing a non-terminal status onto itself is accepted.
    pub fn transition(self, next: JobStatus) -> Result<JobStatus, CoreError> {
        use JobStatus::*;

        let allowed = match (self, next) {
            (Pending, Pending) | (Pending, Running) => true,
            (Running, Running) | (Running, Completed) | (Running, Failed) => true,
            (Pending, Completed) | (Pending, Failed) => false,
            (Running, Pending) => false,
            (Completed, _) | (Failed, _) => false,
        };

        if allowed {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Stable lowercase name, used for metric labels.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 4] = [Self::Pending, Self::Running, Self::Completed, Self::Failed];
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert_eq!(
            JobStatus::Pending.transition(JobStatus::Running),
            Ok(JobStatus::Running)
        );
        assert_eq!(
            JobStatus::Running.transition(JobStatus::Completed),
            Ok(JobStatus::Completed)
        );
        assert_eq!(
            JobStatus::Running.transition(JobStatus::Failed),
            Ok(JobStatus::Failed)
        );
    }

    #[test]
    fn test_skipping_running_rejected() {
        assert!(JobStatus::Pending.transition(JobStatus::Completed).is_err());
        assert!(JobStatus::Pending.transition(JobStatus::Failed).is_err());
        assert!(JobStatus::Running.transition(JobStatus::Pending).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [JobStatus::Completed, JobStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in JobStatus::ALL {
                assert_eq!(
                    terminal.transition(next),
                    Err(CoreError::InvalidStateTransition {
                        from: terminal,
                        to: next
                    })
                );
            }
        }
    }

    #[test]
    fn test_serializes_screaming_case() {
        let json = serde_json::to_string(&JobStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        let back: JobStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, JobStatus::Failed);
        assert!(serde_json::from_str::<JobStatus>("\"running\"").is_err());
    }
}
