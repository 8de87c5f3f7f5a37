//! Execution state machine.

use serde::{Deserialize, Serialize};

/// The state of one workflow execution.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Confirmed
///                          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExecutionState {
    /// Execution has not started yet.
    #[default]
    NotStarted,

    /// Forward steps are being executed.
    Running,

    /// A step failed terminally and the compensation chain is being walked.
    Compensating,

    /// The booking was confirmed (terminal state).
    Confirmed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl ExecutionState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Confirmed | ExecutionState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::NotStarted => "NotStarted",
            ExecutionState::Running => "Running",
            ExecutionState::Compensating => "Compensating",
            ExecutionState::Confirmed => "Confirmed",
            ExecutionState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
