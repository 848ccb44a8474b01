use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DATA_DIR_ENV: &str = "DOCCHAT_DATA_DIR";

/// Layout of persisted state: raw uploads under `pdfs/`, the vector index
/// under `index/`.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The DOCCHAT_DATA_DIR environment variable
    /// 3. `./data` under the current working directory
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(val)
        } else {
            PathBuf::from("data")
        };

        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Config(format!("cannot create data directory {}: {e}", root.display()))
        })?;
        // Index entries record absolute document paths, so the root must not
        // depend on the working directory.
        let root = root.canonicalize()?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }
}
