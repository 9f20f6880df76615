//! Session store contract
//!
//! Every mutation of a debate goes through a [`SessionStore`]. Implementations
//! must make each method atomic per session: `commit_turn` in particular is a
//! compare-and-set on `current_turn_count`, which is what keeps turn numbering
//! gap-free when several callers advance the same session at once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::debate::state::{DebateSession, DebateStatus, Participant, TransitionError, Turn};

/// Error type for session store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("Session is {actual}, expected {expected}")]
    StatusMismatch {
        expected: DebateStatus,
        actual: DebateStatus,
    },

    #[error("Turn conflict: next turn is {expected}, got {found}")]
    TurnConflict { expected: u32, found: u32 },

    #[error("Turn {turn_number} does not belong to participant {participant_id}")]
    WrongParticipant {
        turn_number: u32,
        participant_id: String,
    },

    #[error("Summary rejected: {0}")]
    SummaryRejected(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Consistent view of one session used for a scheduling decision.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: DebateSession,
    /// Ordered by position.
    pub participants: Vec<Participant>,
    /// Most recent turns, oldest first.
    pub recent_turns: Vec<Turn>,
}

/// A turn about to be appended.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub participant_id: String,
    /// Must equal the stored `current_turn_count + 1`.
    pub turn_number: u32,
    pub content: String,
}

/// Result of a successful `commit_turn`.
#[derive(Debug, Clone)]
pub struct TurnCommit {
    /// Session after the commit; `Completed` if this turn exhausted the budget.
    pub session: DebateSession,
    pub turn: Turn,
}

impl TurnCommit {
    pub fn completed_session(&self) -> bool {
        self.session.status == DebateStatus::Completed
    }
}

/// Durable state for sessions, participants and turns.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session with its participants in one step.
    async fn create_session(
        &self,
        session: &DebateSession,
        participants: &[Participant],
    ) -> StoreResult<()>;

    /// Load session, participants and the last `recent_turns` turns atomically.
    async fn load_snapshot(
        &self,
        session_id: &str,
        recent_turns: usize,
    ) -> StoreResult<SessionSnapshot>;

    /// Apply a status transition, validated against the stored status.
    async fn transition(
        &self,
        session_id: &str,
        to: DebateStatus,
        reason: &str,
    ) -> StoreResult<DebateSession>;

    /// Append a turn and bump the counter; completes the session when the
    /// turn budget is exhausted.
    ///
    /// Fails with `StatusMismatch` unless the session is in progress and with
    /// `TurnConflict` if another turn was committed since the caller's read.
    async fn commit_turn(&self, session_id: &str, turn: NewTurn) -> StoreResult<TurnCommit>;

    /// All turns in turn-number order.
    async fn list_turns(&self, session_id: &str) -> StoreResult<Vec<Turn>>;

    /// Overwrite the summary of a completed session.
    async fn save_summary(&self, session_id: &str, summary: &str) -> StoreResult<DebateSession>;
}
