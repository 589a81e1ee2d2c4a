//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage operations needed by the
//! ingestion and retrieval pipeline, enabling pluggable backends. Two
//! implementations exist: [`MemoryIndex`] here (brute-force cosine scan
//! behind `RwLock`, for tests and ephemeral sessions) and
//! [`SqliteIndex`](crate::db::SqliteIndex) for durable storage.
//!
//! An index is constructed with a fixed dimensionality and rejects vectors
//! whose length differs, so every stored embedding matches the configured
//! embedder.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

/// Abstract vector store for chunk embeddings.
///
/// Implementations must be `Send + Sync`. The handle is constructed once
/// at process start, passed explicitly to the pipeline, and closed at
/// shutdown — there is no process-global instance.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The dimensionality every stored vector must have.
    fn dims(&self) -> usize;

    /// Store one chunk with its embedding. An existing entry with the same
    /// chunk id is overwritten in place.
    async fn add(&self, chunk: &Chunk, vector: &[f32]) -> Result<()>;

    /// Return up to `top_k` chunks nearest to `vector`, ordered by
    /// descending similarity (ties broken by chunk id for determinism).
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Remove all chunks belonging to `source_id`. Returns how many were
    /// removed.
    async fn delete_document(&self, source_id: &str) -> Result<u64>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<u64>;
}

struct StoredRow {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory index for tests and ephemeral sessions.
pub struct MemoryIndex {
    dims: usize,
    rows: RwLock<Vec<StoredRow>>,
}

impl MemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            rows: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
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
        let mut rows = self.rows.write().unwrap();
        rows.retain(|r| r.chunk.id != chunk.id);
        rows.push(StoredRow {
            chunk: chunk.clone(),
            vector: vector.to_vec(),
        });
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = self.rows.read().unwrap();
        let mut results: Vec<ScoredChunk> = rows
            .iter()
            .map(|r| ScoredChunk {
                id: r.chunk.id.clone(),
                text: r.chunk.text.clone(),
                score: cosine_similarity(vector, &r.vector),
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
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|r| r.chunk.source_id != source_id);
        Ok((before - rows.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source_id: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            index,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    #[tokio::test]
    async fn add_and_query_returns_nearest_first() {
        let index = MemoryIndex::new(2);
        index
            .add(&chunk("a_0", "a", 0, "east"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .add(&chunk("b_0", "b", 0, "north"), &[0.0, 1.0])
            .await
            .unwrap();

        let results = index.query(&[0.9, 0.1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a_0");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn query_respects_top_k() {
        let index = MemoryIndex::new(2);
        for i in 0..5 {
            index
                .add(&chunk(&format!("d_{}", i), "d", i, "text"), &[1.0, 0.0])
                .await
                .unwrap();
        }
        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn rejects_mismatched_dimensionality() {
        let index = MemoryIndex::new(4);
        let result = index.add(&chunk("a_0", "a", 0, "text"), &[1.0, 0.0]).await;
        assert!(result.is_err());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn same_id_overwrites_in_place() {
        let index = MemoryIndex::new(2);
        index
            .add(&chunk("a_0", "a", 0, "old"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .add(&chunk("a_0", "a", 0, "new"), &[0.0, 1.0])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        let results = index.query(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].text, "new");
    }

    #[tokio::test]
    async fn delete_document_removes_only_that_source() {
        let index = MemoryIndex::new(2);
        index
            .add(&chunk("a_0", "a", 0, "x"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .add(&chunk("a_1", "a", 1, "y"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .add(&chunk("b_0", "b", 0, "z"), &[1.0, 0.0])
            .await
            .unwrap();

        let removed = index.delete_document("a").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let index = MemoryIndex::new(2);
        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }
}
