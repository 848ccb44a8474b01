use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// File extensions the loader understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown"];

/// Text of one page of a source document. Page numbers start at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub text: String,
    pub number: u32,
}

/// A window of page text and where it starts, in characters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub start_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target window length in characters.
    pub chunk_size: usize,
    /// Trailing characters of a window repeated at the start of the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Extract per-page text from a document.
///
/// PDFs yield one record per page. Plain text and markdown files are a single
/// page numbered 0.
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let ext = extension_of(path);
    let read_err = |e: std::io::Error| Error::Load(format!("{}: {}", path.display(), e));

    match ext.as_str() {
        "txt" | "md" | "markdown" => {
            let text = fs::read_to_string(path).map_err(read_err)?;
            Ok(vec![Page { text, number: 0 }])
        }
        "pdf" => {
            let bytes = fs::read(path).map_err(read_err)?;
            let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| Error::Load(format!("PDF parse error in {}: {}", path.display(), e)))?;
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page {
                    text,
                    number: i as u32,
                })
                .collect())
        }
        _ => Err(Error::Load(format!("Unsupported file type: .{}", ext))),
    }
}

/// Split text into overlapping fixed-size windows.
///
/// Windows advance by `chunk_size - chunk_overlap` characters, so consecutive
/// windows share exactly `chunk_overlap` characters and the last window ends at
/// the end of the text. Offsets count characters, not bytes. Windows that are
/// entirely whitespace are dropped. The caller is expected to have validated
/// `config`.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(TextChunk {
                text: chunk,
                start_index: start,
            });
        }
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
