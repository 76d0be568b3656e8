//! SQLite-based vector store implementation.
//!
//! Entries live in a single database file under the configured directory,
//! keyed by `(collection, id)`. Cosine similarity is computed in Rust over
//! the entries that pass the metadata filter.

use super::{
    check_embedding_count, metadata_matches, rank_candidates, validate_batch, Entry, Metadata,
    QueryRequest, QueryResult, VectorStore,
};
use crate::embedding::Embedder;
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

const DATABASE_FILE: &str = "collections.sqlite3";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        document TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (or create) the persistent store in `dir` for `collection`.
    #[instrument(skip_all)]
    pub fn open(dir: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(DATABASE_FILE);
        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened vector collection '{}' at {:?}", collection, path);

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            embedder,
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            embedder,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LecternError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Load every entry of the collection that passes `where_filter`.
    fn load_filtered(&self, where_filter: Option<&Metadata>) -> Result<Vec<(Entry, Vec<f32>)>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, document, metadata, embedding FROM entries WHERE collection = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![self.collection], |row| {
            let id: String = row.get(0)?;
            let document: String = row.get(1)?;
            let metadata: String = row.get(2)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok((id, document, metadata, embedding))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, document, metadata_json, embedding_bytes) = row?;
            let metadata: Metadata = serde_json::from_str(&metadata_json)?;
            if !metadata_matches(&metadata, where_filter) {
                continue;
            }
            entries.push((
                Entry { id, document, metadata },
                Self::bytes_to_embedding(&embedding_bytes),
            ));
        }

        Ok(entries)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip_all, fields(count = ids.len()))]
    async fn upsert(&self, ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<usize> {
        validate_batch(ids, documents, metadatas)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(documents).await?;
        check_embedding_count(ids.len(), &embeddings)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for (i, id) in ids.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO entries (collection, id, document, metadata, embedding, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
                params![
                    self.collection,
                    id,
                    documents[i],
                    serde_json::to_string(&metadatas[i])?,
                    Self::embedding_to_bytes(&embeddings[i]),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} entries into '{}'", ids.len(), self.collection);
        Ok(ids.len())
    }

    #[instrument(skip_all, fields(n_results = request.n_results))]
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let query_embeddings = self.embedder.embed_batch(&request.query_texts).await?;
        let candidates = self.load_filtered(request.where_filter.as_ref())?;

        debug!("Ranking {} candidate entries", candidates.len());
        Ok(rank_candidates(
            &query_embeddings,
            &candidates,
            request.n_results,
            &request.include,
        ))
    }

    async fn get(&self, where_filter: Option<&Metadata>) -> Result<Vec<Entry>> {
        Ok(self
            .load_filtered(where_filter)?
            .into_iter()
            .map(|(entry, _)| entry)
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
