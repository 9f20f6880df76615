//! Responder seam — the text-generation dependency behind every turn.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One prior contribution handed to the responder as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Speaker label, e.g. `Ada (critic)`.
    pub speaker: String,
    pub text: String,
}

/// Input for a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Agent that speaks this turn.
    pub agent_id: String,
    pub role: Option<String>,
    pub prompt: String,
    /// Oldest first.
    pub history: Vec<HistoryEntry>,
}

/// Error type for responder calls
///
/// The orchestrator treats every variant the same way: no turn is persisted
/// and the counter does not move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponderError {
    #[error("Responder timed out after {0} ms")]
    Timeout(u64),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Shared reference to a responder
pub type SharedResponder = Arc<dyn Responder>;

/// Produces turn text from a role-scoped prompt and recent history.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ResponderError>;
}
