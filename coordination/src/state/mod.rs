//! Session persistence for debate coordination
//!
//! This module defines the storage contract the orchestrator relies on and
//! ships an in-process implementation:
//!
//! - `store`: the [`SessionStore`] trait, snapshot and commit types
//! - `memory`: [`InMemorySessionStore`], one mutex per session
//!
//! # Exclusivity
//!
//! All progress state (status, `current_turn_count`, turns) lives in the
//! store. `commit_turn` re-validates status and turn number under the
//! session's lock, so the orchestrator itself stays stateless between calls.
//!
//! # Usage
//!
//! ```ignore
//! use debate_coordination::state::{InMemorySessionStore, SessionStore};
//!
//! let store = InMemorySessionStore::new().shared();
//! store.create_session(&session, &participants).await?;
//! let snapshot = store.load_snapshot(&session.id, 10).await?;
//! ```

pub mod memory;
pub mod store;

// Re-export core types
pub use memory::InMemorySessionStore;
pub use store::{
    NewTurn, SessionSnapshot, SessionStore, SharedSessionStore, StoreError, StoreResult,
    TurnCommit,
};
