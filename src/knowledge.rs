use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::db::models::{ChunkMetadata, Document, MetadataFilter, NewEntry};
use crate::doc_processor;
use crate::error::{Error, Result};
use crate::llm::LlmError;
use crate::outbound;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub document: Document,
    pub chunk_count: usize,
}

/// Load, chunk, embed and index one document. Returns the number of chunks
/// written.
///
/// A document with no extractable text yields zero chunks without touching
/// the embedding provider.
pub async fn ingest(state: &AppState, path: &Path) -> Result<usize> {
    let chunking = state.config.chunking;
    chunking.validate()?;

    let path = canonical_source(path)?;
    let pages = doc_processor::load_pages(&path)?;
    let source = path.to_string_lossy().into_owned();

    let mut pending: Vec<(String, ChunkMetadata)> = Vec::new();
    for page in &pages {
        for chunk in doc_processor::chunk_text(&page.text, &chunking) {
            pending.push((
                chunk.text,
                ChunkMetadata {
                    source: source.clone(),
                    page: page.number,
                    start_index: chunk.start_index,
                },
            ));
        }
    }

    if pending.is_empty() {
        tracing::info!(source = %source, pages = pages.len(), "no text to index");
        return Ok(0);
    }

    let embedder = state.providers.embedder()?;
    let embedder = embedder.as_ref();
    let mut entries = Vec::with_capacity(pending.len());

    for batch in pending.chunks(state.config.embedding_batch_size) {
        let texts: Vec<String> = batch.iter().map(|(text, _)| text.clone()).collect();
        let texts = texts.as_slice();
        let vectors = outbound::call(&state.config.call_policy, None, "embedding", move || {
            embedder.embed(texts)
        })
        .await?;

        if vectors.len() != batch.len() {
            return Err(LlmError::Parse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            ))
            .into());
        }
        tracing::debug!(source = %source, batch = batch.len(), "embedded chunk batch");

        entries.extend(batch.iter().zip(vectors).map(|((text, metadata), embedding)| NewEntry {
            content: text.clone(),
            embedding,
            metadata: metadata.clone(),
        }));
    }

    state.db.add_batch(&entries)?;
    state.db.persist()?;

    tracing::info!(
        source = %source,
        pages = pages.len(),
        chunks = entries.len(),
        "indexed document"
    );
    Ok(entries.len())
}

/// Copy a file into the document store and index it.
pub async fn upload(state: &AppState, source: &Path) -> Result<DocumentInfo> {
    if !doc_processor::is_supported(source) {
        return Err(Error::Load(format!(
            "Unsupported file type: {}",
            source.display()
        )));
    }
    let document = state.store.save_upload(source)?;
    let chunk_count = match ingest(state, &document.path).await {
        Ok(count) => count,
        Err(e) => {
            if let Err(remove_err) = state.store.remove_file(&document.name) {
                tracing::warn!(
                    name = %document.name,
                    error = %remove_err,
                    "failed to remove document after ingest error"
                );
            }
            return Err(e);
        }
    };
    Ok(DocumentInfo {
        document,
        chunk_count,
    })
}

/// Remove the index entries of a file that was ingested in place.
pub fn delete_source(state: &AppState, path: &Path) -> Result<usize> {
    let path = canonical_source(path)?;
    let filter = MetadataFilter::source(path.to_string_lossy());
    let deleted = state.db.delete_where(&filter)?;
    state.db.persist()?;
    tracing::info!(source = %path.display(), chunks = deleted, "deleted source from index");
    Ok(deleted)
}

/// Index entries are keyed by the absolute, symlink-free path of their file.
fn canonical_source(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))
}

/// Remove every index entry that came from the named document.
pub fn delete_chunks(state: &AppState, name: &str) -> Result<usize> {
    let path = state.store.path_for(name)?;
    let filter = MetadataFilter::source(path.to_string_lossy());
    let deleted = state.db.delete_where(&filter)?;
    state.db.persist()?;
    Ok(deleted)
}

/// Drop a document from the index, then remove its file.
///
/// The index decides whether a document is searchable, so a failure to remove
/// the file is logged and otherwise ignored.
pub fn delete_document(state: &AppState, name: &str) -> Result<usize> {
    let deleted = delete_chunks(state, name)?;
    match state.store.remove_file(name) {
        Ok(true) => {}
        Ok(false) => tracing::debug!(name, "document file already absent"),
        Err(e) => tracing::warn!(name, error = %e, "failed to remove document file"),
    }
    tracing::info!(name, chunks = deleted, "deleted document");
    Ok(deleted)
}

/// Stored documents with the number of indexed chunks for each.
pub fn list_documents(state: &AppState) -> Result<Vec<DocumentInfo>> {
    state
        .store
        .list()?
        .into_iter()
        .map(|document| {
            let filter = MetadataFilter::source(document.path.to_string_lossy());
            let chunk_count = state.db.count(Some(&filter))?;
            Ok(DocumentInfo {
                document,
                chunk_count,
            })
        })
        .collect()
}
