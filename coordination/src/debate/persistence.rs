//! Debate persistence — checkpoint and restore for whole sessions.
//!
//! A checkpoint carries the session row, its participants and every turn.
//! Restoring one re-checks the invariants the engine relies on, so a
//! hand-edited or truncated checkpoint cannot produce a session whose turn
//! numbering or attribution disagrees with the round-robin schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scheduler;
use super::state::{DebateSession, DebateStatus, Participant, Turn};

/// A complete session checkpoint for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCheckpoint {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// The session row at checkpoint time.
    pub session: DebateSession,
    /// Participants ordered by position.
    pub participants: Vec<Participant>,
    /// Every persisted turn.
    pub turns: Vec<Turn>,
    /// When the checkpoint was taken.
    pub exported_at: DateTime<Utc>,
}

impl SessionCheckpoint {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new checkpoint.
    pub fn new(session: &DebateSession, participants: &[Participant], turns: &[Turn]) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            session: session.clone(),
            participants: participants.to_vec(),
            turns: turns.to_vec(),
            exported_at: Utc::now(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::SerializeFailed {
            reason: e.to_string(),
        })
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let checkpoint: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::DeserializeFailed {
                reason: e.to_string(),
            })?;

        if checkpoint.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }
}

/// Error during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Serialization failed.
    SerializeFailed { reason: String },
    /// Deserialization failed.
    DeserializeFailed { reason: String },
    /// Schema version mismatch.
    VersionMismatch { expected: u32, found: u32 },
    /// Integrity check failed on restore.
    IntegrityCheckFailed { reason: String },
    /// A session with the same id is already loaded.
    AlreadyLoaded { session_id: String },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializeFailed { reason } => write!(f, "serialize failed: {}", reason),
            Self::DeserializeFailed { reason } => write!(f, "deserialize failed: {}", reason),
            Self::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Self::IntegrityCheckFailed { reason } => {
                write!(f, "integrity check failed: {}", reason)
            }
            Self::AlreadyLoaded { session_id } => {
                write!(f, "session {} is already loaded", session_id)
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Integrity check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Checkpoint is valid and can be restored.
    Valid,
    /// Checkpoint has minor issues but is recoverable.
    Recoverable { warnings: Vec<String> },
    /// Checkpoint is corrupted and cannot be used.
    Corrupted { errors: Vec<String> },
}

impl IntegrityStatus {
    /// Whether restore is safe.
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Valid | Self::Recoverable { .. })
    }
}

/// Validate a checkpoint's integrity before restoring it.
pub fn validate_checkpoint(checkpoint: &SessionCheckpoint) -> IntegrityStatus {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let session = &checkpoint.session;

    if checkpoint.version > SessionCheckpoint::CURRENT_VERSION {
        errors.push(format!(
            "version {} > current {}",
            checkpoint.version,
            SessionCheckpoint::CURRENT_VERSION
        ));
    }

    // Participants: count matches and positions are exactly 0..n
    if checkpoint.participants.len() as u32 != session.participant_count {
        errors.push(format!(
            "{} participants stored, session expects {}",
            checkpoint.participants.len(),
            session.participant_count
        ));
    }
    let mut positions: Vec<u32> = checkpoint.participants.iter().map(|p| p.position).collect();
    positions.sort_unstable();
    if positions.iter().enumerate().any(|(i, &p)| p != i as u32) {
        errors.push(format!("participant positions {:?} are not 0..n", positions));
    }

    // Counter bounds
    if session.max_turns_per_agent == 0 {
        errors.push("max_turns_per_agent is 0".to_string());
    }
    if session.current_turn_count > session.total_turns() {
        errors.push(format!(
            "current_turn_count {} exceeds total turns {}",
            session.current_turn_count,
            session.total_turns()
        ));
    }

    // Turns: gap-free 1..=current_turn_count, attributed round-robin
    let mut turns: Vec<&Turn> = checkpoint.turns.iter().collect();
    turns.sort_by_key(|t| t.turn_number);
    if turns.len() as u32 != session.current_turn_count {
        errors.push(format!(
            "{} turns stored, counter says {}",
            turns.len(),
            session.current_turn_count
        ));
    }
    for (i, turn) in turns.iter().enumerate() {
        let expected = i as u32 + 1;
        if turn.turn_number != expected {
            errors.push(format!(
                "turn numbering broken: expected {}, found {}",
                expected, turn.turn_number
            ));
            break;
        }

        let owner = scheduler::position_for_turn(turn.turn_number, session.participant_count)
            .and_then(|pos| checkpoint.participants.iter().find(|p| p.position == pos));
        match owner {
            Some(p) if p.id == turn.participant_id => {}
            _ => errors.push(format!(
                "turn {} attributed to {} out of round-robin order",
                turn.turn_number, turn.participant_id
            )),
        }

        if turn.session_id != session.id {
            warnings.push(format!(
                "turn {} references session {}",
                turn.turn_number, turn.session_id
            ));
        }
    }

    // Status consistency
    if session.summary.is_some() && session.status != DebateStatus::Completed {
        errors.push(format!("summary present while {}", session.status));
    }
    if session.status == DebateStatus::Completed && !session.turns_exhausted() {
        errors.push("completed before the turn budget was exhausted".to_string());
    }
    if session.status == DebateStatus::InProgress && session.turns_exhausted() {
        warnings.push("turn budget exhausted but session still in progress".to_string());
    }
    if let Some(last) = session.transitions.last() {
        if last.to != session.status {
            errors.push(format!(
                "last transition target {} doesn't match status {}",
                last.to, session.status
            ));
        }
    }

    if !errors.is_empty() {
        IntegrityStatus::Corrupted { errors }
    } else if !warnings.is_empty() {
        IntegrityStatus::Recoverable { warnings }
    } else {
        IntegrityStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_checkpoint(turn_count: u32) -> SessionCheckpoint {
        let mut session = DebateSession::new("T", "Q", 2, 2, "u", "c");
        session
            .transition(DebateStatus::InProgress, "start")
            .unwrap();
        let participants: Vec<Participant> = (0..2)
            .map(|i| Participant {
                id: format!("p-{i}"),
                session_id: session.id.clone(),
                agent_id: format!("agent-{i}"),
                agent_name: format!("Agent {i}"),
                role: None,
                position: i,
            })
            .collect();
        let turns: Vec<Turn> = (1..=turn_count)
            .map(|n| Turn {
                id: format!("t-{n}"),
                session_id: session.id.clone(),
                participant_id: format!("p-{}", (n - 1) % 2),
                turn_number: n,
                content: format!("argument {n}"),
                created_at: Utc::now(),
            })
            .collect();
        session.current_turn_count = turn_count;
        SessionCheckpoint::new(&session, &participants, &turns)
    }

    #[test]
    fn test_checkpoint_json_roundtrip() {
        let cp = make_checkpoint(3);
        let json = cp.to_json().unwrap();
        let restored = SessionCheckpoint::from_json(&json).unwrap();
        assert_eq!(restored.session, cp.session);
        assert_eq!(restored.turns.len(), 3);
        assert_eq!(restored.version, SessionCheckpoint::CURRENT_VERSION);
    }

    #[test]
    fn test_future_version_rejected() {
        let mut cp = make_checkpoint(1);
        cp.version = 99;
        let json = serde_json::to_string(&cp).unwrap();
        let err = SessionCheckpoint::from_json(&json).unwrap_err();
        assert_eq!(
            err,
            PersistenceError::VersionMismatch {
                expected: 1,
                found: 99
            }
        );
    }

    #[test]
    fn test_garbage_json_rejected() {
        let err = SessionCheckpoint::from_json("{not json").unwrap_err();
        assert!(matches!(err, PersistenceError::DeserializeFailed { .. }));
    }

    #[test]
    fn test_valid_checkpoint() {
        assert_eq!(validate_checkpoint(&make_checkpoint(3)), IntegrityStatus::Valid);
    }

    #[test]
    fn test_gap_in_turns_is_corrupted() {
        let mut cp = make_checkpoint(3);
        cp.turns.remove(1);
        cp.session.current_turn_count = 2;
        let status = validate_checkpoint(&cp);
        assert!(!status.can_resume());
    }

    #[test]
    fn test_misattributed_turn_is_corrupted() {
        let mut cp = make_checkpoint(2);
        cp.turns[1].participant_id = "p-0".to_string();
        match validate_checkpoint(&cp) {
            IntegrityStatus::Corrupted { errors } => {
                assert!(errors.iter().any(|e| e.contains("round-robin")));
            }
            other => panic!("expected corrupted, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_before_completion_is_corrupted() {
        let mut cp = make_checkpoint(1);
        cp.session.summary = Some("premature".to_string());
        assert!(!validate_checkpoint(&cp).can_resume());
    }

    #[test]
    fn test_exhausted_but_in_progress_is_recoverable() {
        let cp = make_checkpoint(4);
        let status = validate_checkpoint(&cp);
        assert!(matches!(status, IntegrityStatus::Recoverable { .. }));
        assert!(status.can_resume());
    }

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::IntegrityCheckFailed {
            reason: "gap".to_string(),
        };
        assert!(err.to_string().contains("gap"));
        let err = PersistenceError::AlreadyLoaded {
            session_id: "s-1".to_string(),
        };
        assert!(err.to_string().contains("s-1"));
    }
}
