use contracts::{ContractError, SessionState};
use thiserror::Error;

/// Tracking engine errors
///
/// Sample processing never fails; only lifecycle commands and the async
/// service boundary surface errors to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// Command is not legal in the current state; the session is unchanged
    #[error("cannot {operation} while {from}")]
    IllegalTransition {
        operation: &'static str,
        from: SessionState,
    },

    /// Session state says live but no session is held
    #[error("no active session")]
    NoSession,

    /// Tracker service task has exited
    #[error("tracker service closed")]
    ServiceClosed,
}

impl TrackerError {
    #[inline]
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, TrackerError::IllegalTransition { .. })
    }
}

impl From<TrackerError> for ContractError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::IllegalTransition { operation, from } => ContractError::IllegalTransition {
                command: operation,
                state: from,
            },
            other => ContractError::Other(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
