//! Debate state machine — statuses, transitions, and the persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for debate sessions.
pub type SessionId = String;

/// Lifecycle status of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    /// Session created but not started.
    Pending,
    /// Participants are taking turns.
    InProgress,
    /// Every participant used its full turn budget.
    Completed,
    /// Stopped by an operator before completion.
    Cancelled,
}

impl DebateStatus {
    /// Whether this is a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(self) -> &'static [DebateStatus] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether a transition to `to` is allowed.
    pub fn can_transition_to(self, to: DebateStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A status transition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Previous status.
    pub from: DebateStatus,
    /// New status.
    pub to: DebateStatus,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
}

/// Error for invalid status transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebateStatus,
    pub to: DebateStatus,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// One structured debate instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// The question or prompt under debate.
    pub task: String,
    /// Current lifecycle status.
    pub status: DebateStatus,
    /// Turns each participant gets before the debate completes.
    pub max_turns_per_agent: u32,
    /// Turns persisted so far.
    pub current_turn_count: u32,
    /// Number of bound participants (fixed at creation).
    pub participant_count: u32,
    /// Synthesis of the transcript, only ever set once completed.
    pub summary: Option<String>,
    /// User that initiated the debate.
    pub created_by: String,
    /// Channel the debate belongs to; also the notification topic.
    pub channel_id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the last turn completed the session.
    pub completed_at: Option<DateTime<Utc>>,
    /// Transition history.
    pub transitions: Vec<StatusTransition>,
}

impl DebateSession {
    /// Create a new pending session.
    pub fn new(
        title: &str,
        task: &str,
        max_turns_per_agent: u32,
        participant_count: u32,
        created_by: &str,
        channel_id: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            task: task.to_string(),
            status: DebateStatus::Pending,
            max_turns_per_agent,
            current_turn_count: 0,
            participant_count,
            summary: None,
            created_by: created_by.to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new status with a reason.
    pub fn transition(&mut self, to: DebateStatus, reason: &str) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.status.valid_transitions()
                ),
            });
        }

        let now = Utc::now();
        self.transitions.push(StatusTransition {
            from: self.status,
            to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;

        if to == DebateStatus::Completed {
            self.completed_at = Some(now);
        }

        Ok(())
    }

    /// Total turns this session will produce.
    pub fn total_turns(&self) -> u32 {
        super::scheduler::total_turns(self.max_turns_per_agent, self.participant_count)
    }

    /// Whether the turn budget is exhausted.
    pub fn turns_exhausted(&self) -> bool {
        super::scheduler::is_complete(
            self.current_turn_count,
            self.max_turns_per_agent,
            self.participant_count,
        )
    }

    /// Whether the session reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] turn {}/{} | {} participants | channel={}",
            self.status,
            self.current_turn_count,
            self.total_turns(),
            self.participant_count,
            self.channel_id
        )
    }
}

/// Binds an agent identity to a session at a fixed ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant identifier.
    pub id: String,
    /// Owning session.
    pub session_id: SessionId,
    /// External agent identity.
    pub agent_id: String,
    /// Display name captured from the registry at creation.
    pub agent_name: String,
    /// Free-form role tag ("advocate", "critic", ...).
    pub role: Option<String>,
    /// 0-indexed round-robin position.
    pub position: u32,
}

impl Participant {
    /// Label used in transcripts and history, e.g. `Ada (critic)`.
    pub fn label(&self) -> String {
        match &self.role {
            Some(role) => format!("{} ({})", self.agent_name, role),
            None => self.agent_name.clone(),
        }
    }
}

/// One produced contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier.
    pub id: String,
    /// Owning session.
    pub session_id: SessionId,
    /// Producing participant.
    pub participant_id: String,
    /// 1-based, gap-free position within the session.
    pub turn_number: u32,
    /// Generated text.
    pub content: String,
    /// When the turn was persisted.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(max_turns: u32, participants: u32) -> DebateSession {
        DebateSession::new(
            "Tabs vs spaces",
            "Which is better?",
            max_turns,
            participants,
            "u-1",
            "c-1",
        )
    }

    #[test]
    fn test_new_session() {
        let s = session(3, 2);
        assert_eq!(s.status, DebateStatus::Pending);
        assert_eq!(s.current_turn_count, 0);
        assert_eq!(s.total_turns(), 6);
        assert!(s.summary.is_none());
        assert!(!s.is_finished());
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let mut s = session(1, 2);
        s.transition(DebateStatus::InProgress, "started").unwrap();
        s.transition(DebateStatus::Completed, "turn budget exhausted")
            .unwrap();
        assert!(s.is_finished());
        assert!(s.completed_at.is_some());
        assert_eq!(s.transitions.len(), 2);
        assert_eq!(s.transitions[0].from, DebateStatus::Pending);
        assert_eq!(s.transitions[1].to, DebateStatus::Completed);
    }

    #[test]
    fn test_cancel_from_pending() {
        let mut s = session(1, 2);
        s.transition(DebateStatus::Cancelled, "operator").unwrap();
        assert!(s.is_finished());
        assert!(s.completed_at.is_none());
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut s = session(1, 2);
        let err = s.transition(DebateStatus::Completed, "skip").unwrap_err();
        assert_eq!(err.from, DebateStatus::Pending);
        assert_eq!(err.to, DebateStatus::Completed);
        assert_eq!(s.status, DebateStatus::Pending);
        assert!(s.transitions.is_empty());
    }

    #[test]
    fn test_terminal_no_transitions() {
        for terminal in [DebateStatus::Completed, DebateStatus::Cancelled] {
            assert!(terminal.valid_transitions().is_empty());
            assert!(terminal.is_terminal());
        }

        let mut s = session(1, 2);
        s.transition(DebateStatus::Cancelled, "stop").unwrap();
        let err = s
            .transition(DebateStatus::InProgress, "restart")
            .unwrap_err();
        assert_eq!(err.from, DebateStatus::Cancelled);
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut s = session(2, 3);
        s.transition(DebateStatus::InProgress, "started").unwrap();
        assert!(s.transition(DebateStatus::InProgress, "again").is_err());
    }

    #[test]
    fn test_turns_exhausted() {
        let mut s = session(2, 2);
        s.current_turn_count = 3;
        assert!(!s.turns_exhausted());
        s.current_turn_count = 4;
        assert!(s.turns_exhausted());
    }

    #[test]
    fn test_status_line() {
        let mut s = session(2, 3);
        s.current_turn_count = 4;
        let line = s.status_line();
        assert!(line.contains("[pending]"));
        assert!(line.contains("turn 4/6"));
        assert!(line.contains("channel=c-1"));
    }

    #[test]
    fn test_participant_label() {
        let mut p = Participant {
            id: "p-1".into(),
            session_id: "s-1".into(),
            agent_id: "agent-1".into(),
            agent_name: "Ada".into(),
            role: Some("critic".into()),
            position: 0,
        };
        assert_eq!(p.label(), "Ada (critic)");
        p.role = None;
        assert_eq!(p.label(), "Ada");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DebateStatus::Pending.to_string(), "pending");
        assert_eq!(DebateStatus::InProgress.to_string(), "in_progress");
        assert_eq!(DebateStatus::Completed.to_string(), "completed");
        assert_eq!(DebateStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&DebateStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
