use anyhow::{bail, Context, Result};
use debate_coordination::debate::DebateConfig;
use debate_coordination::{AgentConnection, AgentProfile, AgentRegistry};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Env var overriding `[gateway].url`.
pub const ENV_GATEWAY_URL: &str = "DEBATE_GATEWAY_URL";
/// Env var overriding `[gateway].token`.
pub const ENV_GATEWAY_TOKEN: &str = "DEBATE_GATEWAY_TOKEN";
/// Env var overriding `[gateway].model`.
pub const ENV_GATEWAY_MODEL: &str = "DEBATE_GATEWAY_MODEL";

/// Default OpenAI-compatible gateway every agent talks to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Base URL, e.g. `http://localhost:8080/v1`.
    pub url: String,
    pub token: Option<String>,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP timeout for one completion request.
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/v1".into(),
            token: None,
            model: "default".into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

impl GatewaySection {
    /// Typed connection for agents without their own overrides.
    pub fn connection(&self) -> AgentConnection {
        let mut conn = AgentConnection::new(&self.url).with_model(&self.model);
        if let Some(token) = &self.token {
            conn = conn.with_token(token);
        }
        if let Some(prompt) = &self.system_prompt {
            conn = conn.with_system_prompt(prompt);
        }
        conn
    }
}

/// Engine tuning, in file-friendly units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebateSection {
    /// Default turn budget for `run` when `--turns` is not given.
    pub max_turns_per_agent: u32,
    pub min_participants: usize,
    pub max_participants: usize,
    pub history_window: usize,
    pub turn_pacing_ms: u64,
    pub responder_timeout_secs: u64,
    pub notify_timeout_ms: u64,
    pub max_commit_attempts: u32,
    pub notify_queue_capacity: usize,
}

impl Default for DebateSection {
    fn default() -> Self {
        let engine = DebateConfig::default();
        Self {
            max_turns_per_agent: 2,
            min_participants: engine.min_participants,
            max_participants: engine.max_participants,
            history_window: engine.history_window,
            turn_pacing_ms: engine.turn_pacing.as_millis() as u64,
            responder_timeout_secs: engine.responder_timeout.as_secs(),
            notify_timeout_ms: engine.notify_timeout.as_millis() as u64,
            max_commit_attempts: engine.max_commit_attempts,
            notify_queue_capacity: engine.notify_queue_capacity,
        }
    }
}

/// One `[[agents]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    /// Display name; defaults to the id.
    pub name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Gateway override for this agent only.
    pub gateway_url: Option<String>,
    pub token: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

fn default_active() -> bool {
    true
}

impl AgentEntry {
    fn has_overrides(&self) -> bool {
        self.gateway_url.is_some()
            || self.token.is_some()
            || self.model.is_some()
            || self.system_prompt.is_some()
    }

    /// Connection with this agent's overrides applied on top of the gateway.
    pub fn connection(&self, gateway: &GatewaySection) -> AgentConnection {
        let mut conn = gateway.connection();
        if let Some(url) = &self.gateway_url {
            conn.gateway_url = url.clone();
        }
        if let Some(token) = &self.token {
            conn.auth_token = Some(token.clone());
        }
        if let Some(model) = &self.model {
            conn.model = Some(model.clone());
        }
        if let Some(prompt) = &self.system_prompt {
            conn.system_prompt = Some(prompt.clone());
        }
        conn
    }
}

/// Top-level runtime configuration (`debate.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewaySection,
    pub debate: DebateSection,
    pub agents: Vec<AgentEntry>,
}

impl AppConfig {
    /// Read, apply env overrides, and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply gateway overrides from `lookup` (normally the process env).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_GATEWAY_URL) {
            self.gateway.url = url;
        }
        if let Some(token) = lookup(ENV_GATEWAY_TOKEN) {
            self.gateway.token = Some(token);
        }
        if let Some(model) = lookup(ENV_GATEWAY_MODEL) {
            self.gateway.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.gateway
            .connection()
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [gateway] section")?;
        if self.gateway.timeout_secs == 0 {
            bail!("[gateway] timeout_secs must be positive");
        }
        if self.debate.max_turns_per_agent == 0 {
            bail!("[debate] max_turns_per_agent must be at least 1");
        }
        self.debate_config()
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [debate] section")?;

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                bail!("[[agents]] entry with an empty id");
            }
            if !seen.insert(agent.id.as_str()) {
                bail!("Agent {} is configured twice", agent.id);
            }
            agent
                .connection(&self.gateway)
                .validate()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid connection for agent {}", agent.id))?;
        }
        Ok(())
    }

    /// Engine configuration.
    pub fn debate_config(&self) -> DebateConfig {
        DebateConfig {
            min_participants: self.debate.min_participants,
            max_participants: self.debate.max_participants,
            history_window: self.debate.history_window,
            turn_pacing: Duration::from_millis(self.debate.turn_pacing_ms),
            responder_timeout: Duration::from_secs(self.debate.responder_timeout_secs),
            notify_timeout: Duration::from_millis(self.debate.notify_timeout_ms),
            max_commit_attempts: self.debate.max_commit_attempts,
            notify_queue_capacity: self.debate.notify_queue_capacity,
        }
    }

    /// Registry holding every configured agent.
    pub fn registry(&self) -> Result<AgentRegistry> {
        let registry = AgentRegistry::new();
        for agent in &self.agents {
            let mut profile =
                AgentProfile::new(&agent.id, agent.name.as_deref().unwrap_or(&agent.id));
            profile.active = agent.active;
            if agent.has_overrides() {
                profile = profile.with_connection(agent.connection(&self.gateway));
            }
            registry.register(profile)?;
        }
        Ok(registry)
    }
}
