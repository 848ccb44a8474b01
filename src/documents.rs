use std::fs;
use std::path::{Path, PathBuf};

use crate::db::models::Document;
use crate::doc_processor;
use crate::error::{Error, Result};

/// Directory of uploaded source files, one file per document.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let dir = dir.canonicalize()?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored path for a document name. Directory components are ignored.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        Ok(self.dir.join(sanitize_name(name)?))
    }

    /// First free name for `filename`: the name itself, then `stem_1.ext`,
    /// `stem_2.ext`, …
    pub fn unique_name(&self, filename: &str) -> Result<String> {
        let filename = sanitize_name(filename)?;
        if !self.dir.join(&filename).exists() {
            return Ok(filename);
        }

        let path = Path::new(&filename);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename.as_str())
            .to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut counter = 1;
        loop {
            let candidate = format!("{stem}_{counter}{ext}");
            if !self.dir.join(&candidate).exists() {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Store `contents` under a de-duplicated version of `filename`.
    pub fn save_bytes(&self, filename: &str, contents: &[u8]) -> Result<Document> {
        let name = self.unique_name(filename)?;
        let path = self.dir.join(&name);
        fs::write(&path, contents)?;
        tracing::info!(name = %name, path = %path.display(), "stored document");
        Ok(Document {
            name,
            path,
            original_filename: filename.to_string(),
            file_size: Some(contents.len() as u64),
        })
    }

    /// Copy a file from elsewhere on disk into the store.
    pub fn save_upload(&self, source: &Path) -> Result<Document> {
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Load(format!("invalid file name: {}", source.display())))?;
        let contents = fs::read(source)
            .map_err(|e| Error::Load(format!("{}: {}", source.display(), e)))?;
        self.save_bytes(filename, &contents)
    }

    /// Documents currently stored with a supported extension, sorted by name.
    pub fn list(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !doc_processor::is_supported(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            docs.push(Document {
                original_filename: name.clone(),
                name,
                file_size: entry.metadata().ok().map(|m| m.len()),
                path,
            });
        }
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }

    /// Remove a stored file. Returns `false` if it was already gone.
    pub fn remove_file(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize_name(name: &str) -> Result<String> {
    Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::Load(format!("invalid file name: {name:?}")))
}
