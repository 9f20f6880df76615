//! OpenAI-compatible gateway responder.
//!
//! Every agent speaks through a chat-completions endpoint. The default
//! gateway comes from `[gateway]`; agents registered with their own
//! connection override URL, token, model or system prompt.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use debate_coordination::{
    AgentConnection, GenerateRequest, Responder, ResponderError, SharedAgentDirectory,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GatewaySection;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a debate participant. Argue your position clearly, \
engage with what the other participants said, and keep each contribution focused.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions URL for a gateway base URL.
pub fn completions_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

/// Build the request body: system prompt, prior turns, then this turn's
/// instruction.
pub fn build_chat_request(
    connection: &AgentConnection,
    gateway: &GatewaySection,
    request: &GenerateRequest,
) -> ChatRequest {
    let system = connection
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(ChatMessage::new("system", system));
    for entry in &request.history {
        messages.push(ChatMessage::new(
            "user",
            format!("{}: {}", entry.speaker, entry.text),
        ));
    }
    messages.push(ChatMessage::new("user", request.prompt.clone()));

    ChatRequest {
        model: connection
            .model
            .clone()
            .unwrap_or_else(|| gateway.model.clone()),
        messages,
        max_tokens: gateway.max_tokens,
        temperature: gateway.temperature,
    }
}

/// Extract the reply text from a chat-completions response body.
pub fn parse_chat_response(body: &str) -> Result<String, ResponderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ResponderError::MalformedResponse(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ResponderError::MalformedResponse("No choices in response".to_string()))?;
    if content.trim().is_empty() {
        return Err(ResponderError::MalformedResponse(
            "Empty message content".to_string(),
        ));
    }
    Ok(content)
}

/// Responder backed by an OpenAI-compatible gateway.
pub struct GatewayResponder {
    http: reqwest::Client,
    gateway: GatewaySection,
    directory: SharedAgentDirectory,
}

impl GatewayResponder {
    pub fn new(gateway: GatewaySection, directory: SharedAgentDirectory) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(gateway.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            gateway,
            directory,
        })
    }

    async fn connection_for(&self, agent_id: &str) -> AgentConnection {
        match self.directory.lookup(agent_id).await {
            Some(profile) => profile
                .connection
                .unwrap_or_else(|| self.gateway.connection()),
            None => self.gateway.connection(),
        }
    }

    /// GET `{base}/models` on the default gateway; returns the HTTP status.
    pub async fn probe(&self) -> Result<u16, ResponderError> {
        let url = format!("{}/models", self.gateway.url.trim_end_matches('/'));
        let mut req = self.http.get(&url);
        if let Some(token) = &self.gateway.token {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ResponderError::RequestFailed(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl Responder for GatewayResponder {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ResponderError> {
        let start = Instant::now();
        let connection = self.connection_for(&request.agent_id).await;
        let body = build_chat_request(&connection, &self.gateway, &request);
        let url = completions_url(&connection.gateway_url);

        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = &connection.auth_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ResponderError::Timeout(self.gateway.timeout_secs * 1000)
            } else {
                ResponderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let reply = response
            .text()
            .await
            .map_err(|e| ResponderError::RequestFailed(format!("reading body: {}", e)));
        let content = read_completion(status, reply)?;
        debug!(
            agent_id = %request.agent_id,
            model = %body.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gateway completion"
        );
        Ok(content)
    }
}

/// Map an HTTP status and the (possibly unreadable) body to the reply text.
pub fn read_completion(
    status: reqwest::StatusCode,
    body: Result<String, ResponderError>,
) -> Result<String, ResponderError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ResponderError::Unauthorized(format!("HTTP {}", status)));
    }
    let text = body?;
    if !status.is_success() {
        return Err(ResponderError::RequestFailed(format!(
            "HTTP {}: {}",
            status, text
        )));
    }
    parse_chat_response(&text)
}
