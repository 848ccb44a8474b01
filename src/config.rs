//! Provider settings and pipeline tunables.
//!
//! Settings are looked up in the environment first, then in the `settings`
//! table of the index database, then fall back to built-in defaults.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::doc_processor::ChunkingConfig;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::{Error, Result};
use crate::llm::openai::OpenAiConfig;
use crate::llm::{ChatModel, CompletionModel, Provider};
use crate::outbound::CallPolicy;
use crate::rate_limit::DEFAULT_MIN_INTERVAL;
use crate::state::ProviderSource;

pub const SETTING_KEYS: &[&str] = &[
    "openai_api_key",
    "openai_base_url",
    "claude_api_key",
    "claude_base_url",
    "ollama_host",
    "default_model",
    "embedding_model",
];

/// Environment variables that override stored settings.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("openai_api_key", "OPENAI_API_KEY"),
    ("openai_base_url", "OPENAI_BASE_URL"),
    ("claude_api_key", "ANTHROPIC_API_KEY"),
    ("claude_base_url", "ANTHROPIC_BASE_URL"),
    ("ollama_host", "OLLAMA_HOST"),
    ("default_model", "DOCCHAT_MODEL"),
    ("embedding_model", "DOCCHAT_EMBEDDING_MODEL"),
];

/// Value shipped in sample env files; treated as unset.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Tunables for ingestion, retrieval and the outbound calls they make.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    /// Texts sent per embedding request.
    pub embedding_batch_size: usize,
    pub top_k: usize,
    pub rag_temperature: f32,
    pub chat_temperature: f32,
    pub agent_temperature: f32,
    /// Minimum gap between completion calls.
    pub min_call_interval: Duration,
    pub call_policy: CallPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            embedding_batch_size: 20,
            top_k: 5,
            rag_temperature: 0.2,
            chat_temperature: 0.7,
            agent_temperature: 0.7,
            min_call_interval: DEFAULT_MIN_INTERVAL,
            call_policy: CallPolicy::default(),
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.embedding_batch_size == 0 {
            return Err(Error::Config("embedding_batch_size must be greater than zero".into()));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".into()));
        }
        Ok(())
    }
}

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == PLACEHOLDER_API_KEY
}

/// Keep the first and last four characters of a secret.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Resolves provider credentials and model choices.
pub struct Settings {
    db: Arc<Database>,
    env: HashMap<String, String>,
}

impl Settings {
    /// Snapshot the override variables from the process environment.
    pub fn from_env(db: Arc<Database>) -> Self {
        let env = ENV_OVERRIDES
            .iter()
            .filter_map(|(key, var)| std::env::var(var).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self { db, env }
    }

    pub fn with_env(db: Arc<Database>, env: HashMap<String, String>) -> Self {
        Self { db, env }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.env.get(key).filter(|v| !v.trim().is_empty()) {
            return Ok(Some(value.clone()));
        }
        self.db.get_setting(key)
    }

    fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        self.db.set_setting(key, value)
    }

    pub fn unset(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        self.db.delete_setting(key)
    }

    /// Effective values of all known keys, API keys masked.
    pub fn list_masked(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for key in SETTING_KEYS {
            if let Some(value) = self.get(key)? {
                let shown = if key.ends_with("_api_key") {
                    mask_secret(&value)
                } else {
                    value
                };
                out.push((key.to_string(), shown));
            }
        }
        Ok(out)
    }

    fn api_key(&self, key: &str, label: &str) -> Result<String> {
        match self.get(key)? {
            Some(value) if !is_placeholder(&value) => Ok(value),
            _ => Err(Error::Config(format!(
                "{label} API key not configured (set {} or `docchat config set {key} <key>`)",
                env_var_for(key).unwrap_or(key)
            ))),
        }
    }

    fn openai_config(&self) -> Result<OpenAiConfig> {
        Ok(OpenAiConfig {
            api_key: self.api_key("openai_api_key", "OpenAI")?,
            base_url: self.get_or("openai_base_url", DEFAULT_OPENAI_BASE_URL)?,
        })
    }

    /// Resolve the completion model from a string like "openai/gpt-4o",
    /// "claude/...", "ollama/..."; a bare model id means OpenAI.
    pub fn chat_model(&self) -> Result<ChatModel> {
        let model = self.get_or("default_model", DEFAULT_MODEL)?;
        if let Some(model_id) = model.strip_prefix("ollama/") {
            let host = self.get_or("ollama_host", DEFAULT_OLLAMA_HOST)?;
            Ok(ChatModel {
                provider: Provider::ollama(&host),
                model: model_id.to_string(),
            })
        } else if let Some(model_id) = model.strip_prefix("claude/") {
            let api_key = self.api_key("claude_api_key", "Claude")?;
            let base_url = self.get_or("claude_base_url", DEFAULT_CLAUDE_BASE_URL)?;
            Ok(ChatModel {
                provider: Provider::claude(api_key, base_url),
                model: model_id.to_string(),
            })
        } else {
            let model_id = model.strip_prefix("openai/").unwrap_or(&model);
            Ok(ChatModel {
                provider: Provider::OpenAi(self.openai_config()?),
                model: model_id.to_string(),
            })
        }
    }

    /// Embeddings come from the OpenAI-compatible endpoint, or from Ollama
    /// when the embedding model is prefixed with "ollama/".
    pub fn embedder(&self) -> Result<OpenAiEmbedder> {
        let model = self.get_or("embedding_model", DEFAULT_EMBEDDING_MODEL)?;
        if let Some(model_id) = model.strip_prefix("ollama/") {
            let host = self.get_or("ollama_host", DEFAULT_OLLAMA_HOST)?;
            return Ok(OpenAiEmbedder {
                config: OpenAiConfig {
                    api_key: String::new(),
                    base_url: format!("{}/v1", host.trim_end_matches('/')),
                },
                model: model_id.to_string(),
            });
        }
        let model_id = model.strip_prefix("openai/").unwrap_or(&model);
        Ok(OpenAiEmbedder {
            config: self.openai_config()?,
            model: model_id.to_string(),
        })
    }
}

impl ProviderSource for Settings {
    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::new(Settings::embedder(self)?))
    }

    fn completion_model(&self) -> Result<Arc<dyn CompletionModel>> {
        Ok(Arc::new(self.chat_model()?))
    }
}

fn check_key(key: &str) -> Result<()> {
    if SETTING_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Unknown setting key: {} (known keys: {})",
            key,
            SETTING_KEYS.join(", ")
        )))
    }
}

fn env_var_for(key: &str) -> Option<&'static str> {
    ENV_OVERRIDES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, var)| *var)
}
