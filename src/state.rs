use std::sync::Arc;

use crate::config::{RagConfig, Settings};
use crate::data_dir::DataDir;
use crate::db::Database;
use crate::documents::DocumentStore;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::CompletionModel;
use crate::memory::Memories;
use crate::rate_limit::RateLimiter;

/// Hands out provider clients on demand, so missing credentials surface as a
/// `Config` error at the call that needs them rather than at startup.
pub trait ProviderSource: Send + Sync {
    fn embedder(&self) -> Result<Arc<dyn Embedder>>;
    fn completion_model(&self) -> Result<Arc<dyn CompletionModel>>;
}

/// Everything the features share: storage, providers, the rate limiter and
/// the per-feature memories.
pub struct AppState {
    pub db: Arc<Database>,
    pub store: DocumentStore,
    pub providers: Arc<dyn ProviderSource>,
    pub limiter: Arc<RateLimiter>,
    pub config: RagConfig,
    pub memories: Memories,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        store: DocumentStore,
        providers: Arc<dyn ProviderSource>,
        config: RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(config.min_call_interval));
        Ok(Self {
            db,
            store,
            providers,
            limiter,
            config,
            memories: Memories::default(),
        })
    }

    /// Open the stores under `data_dir`, with providers configured from the
    /// environment and the settings table.
    pub fn open(data_dir: &DataDir, config: RagConfig) -> Result<Self> {
        let db = Arc::new(Database::new(&data_dir.index_dir())?);
        let store = DocumentStore::new(data_dir.documents_dir())?;
        let settings = Arc::new(Settings::from_env(db.clone()));
        tracing::debug!(root = %data_dir.root().display(), "opened data directory");
        Self::new(db, store, settings, config)
    }
}
