use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An uploaded source file in the document store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Document {
    /// Unique display name, also the file name on disk.
    pub name: String,
    pub path: PathBuf,
    pub original_filename: String,
    pub file_size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChunkMetadata {
    /// Stored path of the document the chunk came from.
    pub source: String,
    pub page: u32,
    /// Character offset of the chunk within its page.
    pub start_index: usize,
}

/// A chunk ready to be written to the index.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Restricts index reads and deletes to entries with matching metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub source: String,
}

impl MetadataFilter {
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
