//! docchat - conversational chat, PDF question answering and a task
//! assistant over hosted LLM APIs.
//!
//! Documents are split into overlapping chunks, embedded through an
//! OpenAI-compatible endpoint and stored in a SQLite vector index. Questions
//! are answered from the nearest chunks, optionally scoped to one document.
//!
//! ```no_run
//! use docchat::{AppState, DataDir, RagConfig};
//!
//! # async fn run() -> docchat::Result<()> {
//! let data_dir = DataDir::resolve(None)?;
//! let state = AppState::open(&data_dir, RagConfig::default())?;
//!
//! let info = docchat::knowledge::upload(&state, "paper.pdf".as_ref()).await?;
//! println!("indexed {} chunks", info.chunk_count);
//!
//! let reply = docchat::rag::answer(&state, "What is the main result?", Some(&info.document.name)).await;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chat;
pub mod config;
pub mod data_dir;
pub mod db;
pub mod doc_processor;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod outbound;
pub mod rag;
pub mod rate_limit;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{RagConfig, Settings};
pub use data_dir::DataDir;
pub use db::Database;
pub use documents::DocumentStore;
pub use error::{Error, Result};
pub use state::{AppState, ProviderSource};
