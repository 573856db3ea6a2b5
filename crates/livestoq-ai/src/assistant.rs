//! Chat-completion client for the Stoqy AI assistant.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::SYSTEM_PROMPT;

/// Value shipped in the example env file; treated as "no key".
const PLACEHOLDER_API_KEY: &str = "your-openai-api-key-here";

/// Reply used when the model returns no content.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("LLM API key is not configured; set OPENAI_API_KEY")]
    NotConfigured,
    #[error("conversation has no messages")]
    EmptyConversation,
    #[error("LLM API key was rejected; check OPENAI_API_KEY")]
    InvalidApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model and endpoint settings.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Livestock assistant proxying to a hosted chat-completion model.
pub struct Assistant {
    client: reqwest::Client,
    api_key: String,
    config: AssistantConfig,
    system: ChatMessage,
}

impl Assistant {
    /// Create an assistant. Fails with [`AssistantError::NotConfigured`] when
    /// the key is missing, blank, or still the placeholder value.
    pub fn new(api_key: Option<String>, config: AssistantConfig) -> Result<Self, AssistantError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
            .ok_or(AssistantError::NotConfigured)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config: AssistantConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            system: ChatMessage {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            },
        })
    }

    /// Send the conversation (oldest first) and return the assistant's reply.
    pub async fn ask(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        if messages.is_empty() {
            return Err(AssistantError::EmptyConversation);
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        let body = CompletionRequest {
            model: &self.config.model,
            messages: std::iter::once(&self.system).chain(messages).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        info!(model = %self.config.model, turns = messages.len(), "asking assistant");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AssistantError::InvalidApiKey);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "assistant request failed");
            return Err(AssistantError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let completion: CompletionResponse = serde_json::from_str(&text)?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        Ok(reply)
    }
}
