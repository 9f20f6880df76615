//! Debate Coordination Library
//!
//! This library provides:
//! - A multi-agent debate engine: round-robin turns over a bounded budget
//! - A session store contract with an in-process, per-session-locked backend
//! - Progress events broadcast to channel subscribers
//! - An agent registry holding typed gateway connection settings
//!
//! # Components
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     DebateOrchestrator                       │
//! │  create · start · advance_one_turn · run_to_completion       │
//! │  cancel · summarize                                          │
//! └──────┬──────────────┬──────────────┬──────────────┬──────────┘
//!        │              │              │              │
//!        ▼              ▼              ▼              ▼
//!  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐
//!  │ Scheduler │  │  Session  │  │ Responder │  │  Notifier  │
//!  │  (pure)   │  │   Store   │  │ (timeout) │  │  (queued)  │
//!  └───────────┘  └───────────┘  └───────────┘  └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use debate_coordination::{
//!     AgentRegistry, CreateDebate, DebateConfig, DebateOrchestrator, EventBus,
//!     EventBusNotifier, InMemorySessionStore, ParticipantSpec,
//! };
//!
//! let orchestrator = DebateOrchestrator::new(
//!     InMemorySessionStore::new().shared(),
//!     responder,
//!     Arc::new(EventBusNotifier::new(EventBus::new().shared())),
//!     registry.shared(),
//!     DebateConfig::default(),
//! );
//! let session = orchestrator.create(params).await?;
//! let turns = orchestrator.run_to_completion(&session.id).await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;
pub mod events;
pub mod registry;
pub mod state;

// Re-export the debate engine
pub use debate::{
    CreateDebate, DebateConfig, DebateError, DebateOrchestrator, DebateResult, DebateSession,
    DebateStatus, ErrorKind, EventBusNotifier, GenerateRequest, HistoryEntry, NoopNotifier,
    Notifier, NotifyError, Participant, ParticipantSpec, Responder, ResponderError,
    SessionCheckpoint, SessionView, SharedDebateOrchestrator, SharedNotifier, SharedResponder,
    Turn,
};

// Re-export event types
pub use events::{
    DebateEvent, EventBus, EventBusExt, EventFilter, SharedEventBus, StatusChanged, TurnCreated,
};

// Re-export registry types
pub use registry::{
    AgentConnection, AgentDirectory, AgentProfile, AgentRegistry, RegistryError,
    SharedAgentDirectory,
};

// Re-export store types
pub use state::{InMemorySessionStore, SessionStore, SharedSessionStore, StoreError};
