//! Event types for debate progress
//!
//! These are what observers of a channel receive while a debate runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::debate::state::{DebateSession, DebateStatus, SessionId, Turn};

/// A participant produced a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnCreated {
    pub channel_id: String,
    pub session_id: SessionId,
    pub turn_number: u32,
    pub participant_id: String,
    pub agent_id: String,
    pub content: String,
    /// Whether this turn completed the debate
    pub is_complete: bool,
    pub timestamp: DateTime<Utc>,
}

impl TurnCreated {
    pub fn new(session: &DebateSession, turn: &Turn, agent_id: &str) -> Self {
        Self {
            channel_id: session.channel_id.clone(),
            session_id: session.id.clone(),
            turn_number: turn.turn_number,
            participant_id: turn.participant_id.clone(),
            agent_id: agent_id.to_string(),
            content: turn.content.clone(),
            is_complete: session.status == DebateStatus::Completed,
            timestamp: turn.created_at,
        }
    }
}

/// A session changed status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub channel_id: String,
    pub session_id: SessionId,
    pub status: DebateStatus,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusChanged {
    pub fn new(session: &DebateSession) -> Self {
        Self {
            channel_id: session.channel_id.clone(),
            session_id: session.id.clone(),
            status: session.status,
            title: session.title.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// All debate progress events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    TurnCreated(TurnCreated),
    StatusChanged(StatusChanged),
}

impl DebateEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            DebateEvent::TurnCreated(_) => "turn_created",
            DebateEvent::StatusChanged(_) => "status_changed",
        }
    }

    /// Channel (topic) the event is published to
    pub fn channel_id(&self) -> &str {
        match self {
            DebateEvent::TurnCreated(e) => &e.channel_id,
            DebateEvent::StatusChanged(e) => &e.channel_id,
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            DebateEvent::TurnCreated(e) => &e.session_id,
            DebateEvent::StatusChanged(e) => &e.session_id,
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DebateEvent::TurnCreated(e) => e.timestamp,
            DebateEvent::StatusChanged(e) => e.timestamp,
        }
    }
}
