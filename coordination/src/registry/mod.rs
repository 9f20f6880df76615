//! Agent Registry — debate participant identities and connection settings
//!
//! Tracks which agents exist, whether they are active, and how to reach the
//! gateway that generates their text. `create` consults the registry through
//! the [`AgentDirectory`] trait so a deployment can back it with its own
//! member database.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid connection for {agent_id}: {reason}")]
    InvalidConnection { agent_id: String, reason: String },

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// How to reach the text-generation gateway for one agent.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConnection {
    /// Base URL of an OpenAI-compatible gateway, e.g. `http://gateway:8080/v1`.
    pub gateway_url: String,
    /// Bearer token; never serialized.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// Model override for this agent.
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt override for this agent.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for AgentConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConnection")
            .field("gateway_url", &self.gateway_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl AgentConnection {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            auth_token: None,
            model: None,
            system_prompt: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Validate the settings; return the reason if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let rest = self
            .gateway_url
            .strip_prefix("https://")
            .or_else(|| self.gateway_url.strip_prefix("http://"))
            .ok_or_else(|| format!("gateway_url must be http(s), got {:?}", self.gateway_url))?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(format!("gateway_url has no host: {:?}", self.gateway_url));
        }
        if matches!(self.auth_token.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err("auth_token is set but empty".to_string());
        }
        if matches!(self.model.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err("model override is set but empty".to_string());
        }
        Ok(())
    }
}

/// A registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    /// Display name used in transcripts.
    pub name: String,
    /// Inactive agents cannot join new debates.
    pub active: bool,
    pub connection: Option<AgentConnection>,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            connection: None,
        }
    }

    pub fn with_connection(mut self, connection: AgentConnection) -> Self {
        self.connection = Some(connection);
        self
    }
}

/// Lookup used when binding agents to a new debate.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn lookup(&self, agent_id: &str) -> Option<AgentProfile>;
}

/// Shared reference to an agent directory
pub type SharedAgentDirectory = Arc<dyn AgentDirectory>;

/// In-memory registry of agents.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentProfile>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this registry
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Register an agent, validating its connection settings.
    pub fn register(&self, profile: AgentProfile) -> Result<(), RegistryError> {
        if let Some(conn) = &profile.connection {
            conn.validate()
                .map_err(|reason| RegistryError::InvalidConnection {
                    agent_id: profile.id.clone(),
                    reason,
                })?;
        }

        let mut agents = self.agents.write().map_err(|_| RegistryError::LockPoisoned)?;
        if agents.contains_key(&profile.id) {
            return Err(RegistryError::DuplicateAgent(profile.id));
        }
        agents.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Get an agent by ID
    pub fn get(&self, agent_id: &str) -> Option<AgentProfile> {
        self.agents.read().ok()?.get(agent_id).cloned()
    }

    /// All agents sorted by ID
    pub fn list(&self) -> Vec<AgentProfile> {
        let mut agents: Vec<AgentProfile> = match self.agents.read() {
            Ok(agents) => agents.values().cloned().collect(),
            Err(_) => Vec::new(),
        };
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Mark an agent as inactive
    pub fn deactivate(&self, agent_id: &str) -> Result<(), RegistryError> {
        self.set_active(agent_id, false)
    }

    /// Mark an agent as active
    pub fn activate(&self, agent_id: &str) -> Result<(), RegistryError> {
        self.set_active(agent_id, true)
    }

    fn set_active(&self, agent_id: &str, active: bool) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().map_err(|_| RegistryError::LockPoisoned)?;
        let entry = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::UnknownAgent(agent_id.to_string()))?;
        entry.active = active;
        Ok(())
    }
}

#[async_trait]
impl AgentDirectory for AgentRegistry {
    async fn lookup(&self, agent_id: &str) -> Option<AgentProfile> {
        self.get(agent_id)
    }
}
