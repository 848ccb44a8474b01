use std::time::Duration;

use crate::llm::LlmError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source document could not be read or has an unsupported format.
    #[error("Load error: {0}")]
    Load(String),

    /// Missing or placeholder credential, or an invalid tunable.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(LlmError),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
}

/// Provider errors are split into quota exhaustion and everything else by
/// looking at the error text, since providers disagree on how they report it.
impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        let text = err.to_string();
        if is_quota_message(&text) {
            Error::QuotaExceeded(text)
        } else {
            Error::Provider(err)
        }
    }
}

pub fn is_quota_message(text: &str) -> bool {
    text.to_lowercase().contains("quota") || text.contains("429")
}

impl Error {
    /// Whether retrying the same call may succeed.
    ///
    /// Transport errors count only when the request never completed. A body
    /// that fails to decode came back from a provider that already did the work.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Provider(LlmError::Http(e)) => {
                e.is_timeout() || e.is_connect() || e.is_request()
            }
            Error::Provider(LlmError::Api { status, .. }) => *status >= 500,
            _ => false,
        }
    }
}
