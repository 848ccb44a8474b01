pub mod claude;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

/// Unified LLM provider enum. Dispatches to OpenAI-compatible or Claude backends.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiConfig),
    Claude(claude::ClaudeConfig),
    Ollama(openai::OpenAiConfig),
}

impl Provider {
    pub fn openai(api_key: String, base_url: String) -> Self {
        Provider::OpenAi(openai::OpenAiConfig { api_key, base_url })
    }

    pub fn claude(api_key: String, base_url: String) -> Self {
        Provider::Claude(claude::ClaudeConfig { api_key, base_url })
    }

    pub fn ollama(host: &str) -> Self {
        Provider::Ollama(openai::OpenAiConfig {
            api_key: String::new(),
            base_url: format!("{}/v1", host.trim_end_matches('/')),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(_) => "openai",
            Provider::Claude(_) => "claude",
            Provider::Ollama(_) => "ollama",
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => {
                openai::chat(config, request).await
            }
            Provider::Claude(config) => claude::chat(config, request).await,
        }
    }
}

/// A chat-completion backend: a list of messages in, the reply text out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32)
        -> Result<String, LlmError>;
}

/// A provider bound to one model id.
#[derive(Debug, Clone)]
pub struct ChatModel {
    pub provider: Provider,
    pub model: String,
}

#[async_trait]
impl CompletionModel for ChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            messages: messages.to_vec(),
            model: self.model.clone(),
            temperature: Some(temperature),
        };
        tracing::debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = messages.len(),
            "sending chat request"
        );
        let response = self.provider.chat(&request).await?;
        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            chars = response.content.len(),
            "received chat response"
        );
        Ok(response.content)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
