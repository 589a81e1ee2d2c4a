//! SQLite-backed [`VectorIndex`].
//!
//! Chunks live in a `chunks` table; their embeddings are stored as
//! little-endian f32 BLOBs in `chunk_vectors`. Similarity is computed in
//! Rust over the fetched vectors — corpora here are runbook-sized, so a
//! full scan is cheap and keeps the schema portable.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::config::Config;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::index::VectorIndex;
use crate::models::{Chunk, ScoredChunk};

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source_id ON chunks(source_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunk_vectors_source_id ON chunk_vectors(source_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// CLI runner for `opsmate init`: create the database and schema.
/// Idempotent — running it multiple times is safe.
pub async fn run_init(config: &Config) -> Result<()> {
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.db.path.display());
    println!("ok");
    Ok(())
}

/// Durable index over SQLite. Open once at process start, close at
/// shutdown.
pub struct SqliteIndex {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteIndex {
    /// Open the index using the configured database path and embedding
    /// dimensionality. Runs migrations so a fresh database is usable
    /// without a separate `init`.
    pub async fn open(config: &Config) -> Result<Self> {
        let dims = match config.embedding.dims {
            Some(d) if d > 0 => d,
            _ => bail!("embedding.dims must be configured to open the vector index"),
        };
        let pool = connect(config).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool, dims })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn add(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dims {
            bail!(
                "Vector dimensionality mismatch for chunk {}: got {}, index expects {}",
                chunk.id,
                vector.len(),
                self.dims
            );
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO chunks (id, source_id, chunk_index, text, hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source_id = excluded.source_id,
                chunk_index = excluded.chunk_index,
                text = excluded.text,
                hash = excluded.hash
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_id)
        .bind(chunk.index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let blob = vec_to_blob(vector);
        sqlx::query(
            r#"
            INSERT INTO chunk_vectors (chunk_id, source_id, dims, embedding)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                source_id = excluded.source_id,
                dims = excluded.dims,
                embedding = excluded.embedding
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_id)
        .bind(self.dims as i64)
        .bind(&blob)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if vector.len() != self.dims {
            bail!(
                "Query vector dimensionality mismatch: got {}, index expects {}",
                vector.len(),
                self.dims
            );
        }

        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.embedding, c.text
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut results: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let stored = blob_to_vec(&blob);
                ScoredChunk {
                    id: row.get("chunk_id"),
                    text: row.get("text"),
                    score: cosine_similarity(vector, &stored),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_document(&self, source_id: &str) -> Result<u64> {
        sqlx::query("DELETE FROM chunk_vectors WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        let deleted = sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
