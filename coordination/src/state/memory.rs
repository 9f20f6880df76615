//! In-process session store
//!
//! Each session lives behind its own `tokio::sync::Mutex`, which is the
//! exclusivity unit for every read-check-write on that session. The outer map
//! lock is only held long enough to clone the session handle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::debate::persistence::{validate_checkpoint, PersistenceError, SessionCheckpoint};
use crate::debate::scheduler;
use crate::debate::state::{DebateSession, DebateStatus, Participant, SessionId, Turn};

use super::store::{
    NewTurn, SessionSnapshot, SessionStore, StoreError, StoreResult, TurnCommit,
};

#[derive(Debug, Clone)]
struct SessionRecord {
    session: DebateSession,
    participants: Vec<Participant>,
    turns: Vec<Turn>,
}

type SessionHandle = Arc<Mutex<SessionRecord>>;

/// Session store backed by process memory.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn handle(&self, session_id: &str) -> StoreResult<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Snapshot a whole session for checkpointing.
    pub async fn export(&self, session_id: &str) -> StoreResult<SessionCheckpoint> {
        let handle = self.handle(session_id).await?;
        let record = handle.lock().await;
        Ok(SessionCheckpoint::new(
            &record.session,
            &record.participants,
            &record.turns,
        ))
    }

    /// Load a checkpoint as a new session. Corrupted checkpoints are rejected.
    pub async fn restore(&self, checkpoint: SessionCheckpoint) -> Result<(), PersistenceError> {
        let status = validate_checkpoint(&checkpoint);
        if !status.can_resume() {
            return Err(PersistenceError::IntegrityCheckFailed {
                reason: format!("{:?}", status),
            });
        }

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&checkpoint.session.id) {
            return Err(PersistenceError::AlreadyLoaded {
                session_id: checkpoint.session.id,
            });
        }

        let mut participants = checkpoint.participants;
        participants.sort_by_key(|p| p.position);
        let mut turns = checkpoint.turns;
        turns.sort_by_key(|t| t.turn_number);

        debug!(session_id = %checkpoint.session.id, turns = turns.len(), "Session restored");
        sessions.insert(
            checkpoint.session.id.clone(),
            Arc::new(Mutex::new(SessionRecord {
                session: checkpoint.session,
                participants,
                turns,
            })),
        );
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        session: &DebateSession,
        participants: &[Participant],
    ) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::AlreadyExists(session.id.clone()));
        }

        let mut participants = participants.to_vec();
        participants.sort_by_key(|p| p.position);

        sessions.insert(
            session.id.clone(),
            Arc::new(Mutex::new(SessionRecord {
                session: session.clone(),
                participants,
                turns: Vec::new(),
            })),
        );
        Ok(())
    }

    async fn load_snapshot(
        &self,
        session_id: &str,
        recent_turns: usize,
    ) -> StoreResult<SessionSnapshot> {
        let handle = self.handle(session_id).await?;
        let record = handle.lock().await;
        let skip = record.turns.len().saturating_sub(recent_turns);
        Ok(SessionSnapshot {
            session: record.session.clone(),
            participants: record.participants.clone(),
            recent_turns: record.turns[skip..].to_vec(),
        })
    }

    async fn transition(
        &self,
        session_id: &str,
        to: DebateStatus,
        reason: &str,
    ) -> StoreResult<DebateSession> {
        let handle = self.handle(session_id).await?;
        let mut record = handle.lock().await;
        record.session.transition(to, reason)?;
        Ok(record.session.clone())
    }

    async fn commit_turn(&self, session_id: &str, turn: NewTurn) -> StoreResult<TurnCommit> {
        let handle = self.handle(session_id).await?;
        let mut record = handle.lock().await;

        if record.session.status != DebateStatus::InProgress {
            return Err(StoreError::StatusMismatch {
                expected: DebateStatus::InProgress,
                actual: record.session.status,
            });
        }

        let expected = record.session.current_turn_count + 1;
        if turn.turn_number != expected || record.session.turns_exhausted() {
            return Err(StoreError::TurnConflict {
                expected,
                found: turn.turn_number,
            });
        }

        let owner = scheduler::next_participant(
            &record.participants,
            record.session.current_turn_count,
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        if owner.id != turn.participant_id {
            return Err(StoreError::WrongParticipant {
                turn_number: turn.turn_number,
                participant_id: turn.participant_id,
            });
        }

        let stored = Turn {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            participant_id: turn.participant_id,
            turn_number: turn.turn_number,
            content: turn.content,
            created_at: Utc::now(),
        };
        record.turns.push(stored.clone());
        record.session.current_turn_count = turn.turn_number;

        if record.session.turns_exhausted() {
            record
                .session
                .transition(DebateStatus::Completed, "turn budget exhausted")?;
        }

        Ok(TurnCommit {
            session: record.session.clone(),
            turn: stored,
        })
    }

    async fn list_turns(&self, session_id: &str) -> StoreResult<Vec<Turn>> {
        let handle = self.handle(session_id).await?;
        let record = handle.lock().await;
        Ok(record.turns.clone())
    }

    async fn save_summary(&self, session_id: &str, summary: &str) -> StoreResult<DebateSession> {
        let handle = self.handle(session_id).await?;
        let mut record = handle.lock().await;

        if record.session.status != DebateStatus::Completed {
            return Err(StoreError::StatusMismatch {
                expected: DebateStatus::Completed,
                actual: record.session.status,
            });
        }
        if summary.trim().is_empty() {
            return Err(StoreError::SummaryRejected("summary is empty".to_string()));
        }

        record.session.summary = Some(summary.to_string());
        Ok(record.session.clone())
    }
}
