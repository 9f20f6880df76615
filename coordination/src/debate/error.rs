//! Debate error taxonomy.
//!
//! | Kind              | Side effects on rejection | Retriable |
//! |-------------------|---------------------------|-----------|
//! | InvalidArgument   | none                      | no        |
//! | NotFound          | none                      | no        |
//! | InvalidState      | none                      | no        |
//! | DependencyFailure | counters untouched        | yes       |

use thiserror::Error;

use crate::state::StoreError;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InvalidState,
    DependencyFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidState => write!(f, "invalid_state"),
            Self::DependencyFailure => write!(f, "dependency_failure"),
        }
    }
}

/// Error returned by every orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebateError {
    /// Bad input shape, e.g. fewer than two participants.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown session or agent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not legal for the current status, or a conflicting
    /// concurrent write was detected at commit time.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Responder or store failed transiently.
    #[error("dependency failure: {0}")]
    DependencyFailure(String),
}

impl DebateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::DependencyFailure(_) => ErrorKind::DependencyFailure,
        }
    }

    /// Returns `true` if retrying the identical operation can make progress.
    pub fn is_retriable(&self) -> bool {
        self.kind() == ErrorKind::DependencyFailure
    }
}

impl From<StoreError> for DebateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::AlreadyExists(_) => Self::InvalidArgument(err.to_string()),
            StoreError::InvalidTransition(_)
            | StoreError::StatusMismatch { .. }
            | StoreError::TurnConflict { .. }
            | StoreError::WrongParticipant { .. }
            | StoreError::SummaryRejected(_) => Self::InvalidState(err.to_string()),
            StoreError::Backend(_) => Self::DependencyFailure(err.to_string()),
        }
    }
}

/// Result type for debate operations.
pub type DebateResult<T> = Result<T, DebateError>;
