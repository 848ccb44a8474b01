pub mod models;

use models::{ChunkMetadata, MetadataFilter, NewEntry, SearchHit};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::embedding::{bytes_to_embedding, embedding_to_bytes, rank_by_similarity};
use crate::error::Result;

pub const INDEX_FILE: &str = "index.db";

/// SQLite-backed vector index and settings store.
///
/// All access goes through one connection behind a mutex, so writes from
/// concurrent ingestion and deletion never interleave.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        let conn = Connection::open(index_dir.join(INDEX_FILE))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS chunks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                start_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Vector index ──

    /// Insert all entries in one transaction. Returns the assigned ids in
    /// input order.
    pub fn add_batch(&self, entries: &[NewEntry]) -> Result<Vec<String>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(entries.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (id, source, page, start_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                let id = uuid::Uuid::new_v4().to_string();
                stmt.execute(params![
                    id,
                    entry.metadata.source,
                    entry.metadata.page as i64,
                    entry.metadata.start_index as i64,
                    entry.content,
                    embedding_to_bytes(&entry.embedding),
                ])?;
                ids.push(id);
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Flush the write-ahead log into the main database file.
    pub fn persist(&self) -> Result<()> {
        let conn = self.lock();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }

    /// Nearest entries to `query_embedding` by cosine similarity, best first.
    ///
    /// Entries with equal scores come back in insertion order.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>> {
        let rows = {
            let conn = self.lock();
            let (clause, values) = filter_clause(filter);
            let mut stmt = conn.prepare(&format!(
                "SELECT id, content, source, page, start_index, embedding FROM chunks{} ORDER BY seq ASC",
                clause
            ))?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    let bytes: Vec<u8> = row.get(5)?;
                    let page: i64 = row.get(3)?;
                    let start_index: i64 = row.get(4)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        ChunkMetadata {
                            source: row.get(2)?,
                            page: page as u32,
                            start_index: start_index as usize,
                        },
                        bytes_to_embedding(&bytes),
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let ranked = rank_by_similarity(
            query_embedding,
            rows.iter().map(|(_, _, _, emb)| emb.as_slice()),
            top_k,
        );

        Ok(ranked
            .into_iter()
            .map(|(i, score)| {
                let (id, content, metadata, _) = &rows[i];
                SearchHit {
                    id: id.clone(),
                    content: content.clone(),
                    metadata: metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Delete every entry matching `filter`. Returns how many were removed.
    pub fn delete_where(&self, filter: &MetadataFilter) -> Result<usize> {
        let conn = self.lock();
        let (clause, values) = filter_clause(Some(filter));
        let deleted = conn.execute(
            &format!("DELETE FROM chunks{}", clause),
            params_from_iter(values),
        )?;
        Ok(deleted)
    }

    pub fn count(&self, filter: Option<&MetadataFilter>) -> Result<usize> {
        let conn = self.lock();
        let (clause, values) = filter_clause(filter);
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM chunks{}", clause),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ── Settings ──

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock();
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}

fn filter_clause(filter: Option<&MetadataFilter>) -> (String, Vec<Value>) {
    let Some(filter) = filter else {
        return (String::new(), Vec::new());
    };
    (
        " WHERE source = ?".to_string(),
        vec![Value::Text(filter.source.clone())],
    )
}
