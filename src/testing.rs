//! In-process stand-ins for the external providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RagConfig;
use crate::db::Database;
use crate::documents::DocumentStore;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, CompletionModel, LlmError};
use crate::outbound::CallPolicy;
use crate::state::{AppState, ProviderSource};

/// Letter-frequency vectors: texts sharing letters score as similar.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
}

pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; 27];
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    v[26] = 0.01;
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| letter_vector(t)).collect())
    }
}

pub enum Reply {
    Text(String),
    Fail { status: u16, message: String },
}

pub struct FakeModel {
    reply: Reply,
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    pub temperatures: Mutex<Vec<f32>>,
}

impl FakeModel {
    pub fn replying(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self::new(Reply::Fail {
            status,
            message: message.to_string(),
        })
    }

    fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Vec<ChatMessage> {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionModel for FakeModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.temperatures.lock().unwrap().push(temperature);
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail { status, message } => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

pub struct FakeProviders {
    pub embedder: Arc<FakeEmbedder>,
    pub model: Arc<FakeModel>,
    pub configured: bool,
}

impl FakeProviders {
    pub fn new(model: FakeModel) -> Self {
        Self {
            embedder: Arc::new(FakeEmbedder::default()),
            model: Arc::new(model),
            configured: true,
        }
    }

    pub fn embed_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
    }
}

impl ProviderSource for FakeProviders {
    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        if !self.configured {
            return Err(Error::Config("OpenAI API key not configured".into()));
        }
        Ok(self.embedder.clone())
    }

    fn completion_model(&self) -> Result<Arc<dyn CompletionModel>> {
        if !self.configured {
            return Err(Error::Config("OpenAI API key not configured".into()));
        }
        Ok(self.model.clone())
    }
}

pub fn fast_config() -> RagConfig {
    RagConfig {
        min_call_interval: Duration::ZERO,
        call_policy: CallPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 0,
            base_delay: Duration::from_millis(1),
        },
        ..RagConfig::default()
    }
}

/// State over a fresh temp directory. Keep the `TempDir` alive for the test.
pub fn test_state(providers: Arc<FakeProviders>, config: RagConfig) -> (tempfile::TempDir, AppState) {
    let tmp = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(&tmp.path().join("index")).unwrap());
    let store = DocumentStore::new(tmp.path().join("pdfs")).unwrap();
    let state = AppState::new(db, store, providers, config).unwrap();
    (tmp, state)
}

/// A minimal PDF with one line of Helvetica text per entry in `pages`.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let font_id = 3 + page_count;
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 3 + i)).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_count),
    ];
    for i in 0..page_count {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            font_id + 1 + i
        ));
    }
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    );
    for text in pages {
        let content = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}
