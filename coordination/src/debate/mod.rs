//! Debate Orchestration — turn-based debates among a fixed set of agents
//!
//! A session binds 2–5 agents in a fixed order and gives each of them the
//! same number of turns. Turns are assigned round-robin from the persisted
//! turn count, so stepping one turn at a time and running the whole debate in
//! one call always produce the same speaker order.
//!
//! # Session Flow
//!
//! ```text
//! Pending ──start──▶ InProgress ──last turn──▶ Completed ──summarize──▶ (summary)
//!    │                   │  ▲
//!    │                   └──┘ advance_one_turn / run_to_completion
//!    │                   │
//!    └──────cancel───────┴──────────▶ Cancelled
//! ```
//!
//! `run_to_completion` starts a pending session itself. Terminal statuses
//! never change again.

pub mod error;
pub mod notifier;
pub mod orchestrator;
pub mod persistence;
pub mod prompts;
pub mod responder;
pub mod scheduler;
pub mod state;

pub use error::{DebateError, DebateResult, ErrorKind};
pub use notifier::{
    EventBusNotifier, NoopNotifier, NotificationDispatcher, Notifier, NotifyError, NotifyResult,
    SharedNotifier,
};
pub use orchestrator::{
    CreateDebate, DebateConfig, DebateOrchestrator, ParticipantSpec, SessionView,
    SharedDebateOrchestrator, SUMMARIZER_ROLE,
};
pub use persistence::{validate_checkpoint, IntegrityStatus, PersistenceError, SessionCheckpoint};
pub use responder::{GenerateRequest, HistoryEntry, Responder, ResponderError, SharedResponder};
pub use state::{
    DebateSession, DebateStatus, Participant, SessionId, StatusTransition, TransitionError, Turn,
};
