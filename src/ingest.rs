//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for one document: chunk → embed → index.
//! Writes for a document are a batch: any previous version of the document
//! is deleted first (so a shrinking re-ingest cannot leave stale trailing
//! chunks), then chunks are written in order. A mid-batch failure surfaces
//! as [`IngestError::PartialWrite`] with the number of chunks already
//! indexed — there is no rollback, the index is left in the reported
//! state.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::db::SqliteIndex;
use crate::embedding::{self, Embedder};
use crate::extract;
use crate::index::VectorIndex;

/// A multi-chunk index write failed partway through.
#[derive(Debug)]
pub enum IngestError {
    PartialWrite {
        source_id: String,
        written: usize,
        total: usize,
        cause: anyhow::Error,
    },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::PartialWrite {
                source_id,
                written,
                total,
                cause,
            } => write!(
                f,
                "partial write for document '{}': {} of {} chunks indexed: {}",
                source_id, written, total, cause
            ),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::PartialWrite { cause, .. } => Some(cause.as_ref()),
        }
    }
}

/// Outcome of ingesting one document.
#[derive(Debug)]
pub struct IngestReport {
    pub source_id: String,
    pub chunks_written: usize,
}

/// Ingest one document: chunk its text, embed every chunk in stored
/// order, and replace the document's entry in the index.
///
/// Re-running with identical `(source_id, text)` and configuration
/// produces identical chunk ids and texts.
pub async fn ingest_document(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    config: &Config,
    source_id: &str,
    text: &str,
) -> Result<IngestReport> {
    let chunks = chunk_text(
        source_id,
        text,
        config.chunking.max_chars,
        config.chunking.overlap_chars,
    );

    if chunks.is_empty() {
        return Ok(IngestReport {
            source_id: source_id.to_string(),
            chunks_written: 0,
        });
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors = embedder.embed_batch(&texts).await.with_context(|| {
            format!(
                "embedding {} chunks of document '{}'",
                texts.len(),
                source_id
            )
        })?;
        vectors.extend(batch_vectors);
    }

    // Replace any previous version of this document before writing.
    index.delete_document(source_id).await?;

    let total = chunks.len();
    for (written, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
        if let Err(cause) = index.add(chunk, vector).await {
            return Err(IngestError::PartialWrite {
                source_id: source_id.to_string(),
                written,
                total,
                cause,
            }
            .into());
        }
    }

    Ok(IngestReport {
        source_id: source_id.to_string(),
        chunks_written: total,
    })
}

/// CLI runner for `opsmate ingest`: ingest one file or every supported
/// file under a directory.
pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let embedder = embedding::create_embedder(&config.embedding)?;
    let index = SqliteIndex::open(config).await?;

    let files = collect_files(path)?;
    let mut documents = 0usize;
    let mut chunks_written = 0usize;
    let mut skipped = 0usize;

    for file in &files {
        let text = match extract::extract_path(file) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", file.display(), e);
                skipped += 1;
                continue;
            }
        };

        let source_id = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        let report = ingest_document(&index, embedder.as_ref(), config, &source_id, &text).await?;
        documents += 1;
        chunks_written += report.chunks_written;
    }

    println!("ingest {}", path.display());
    println!("  documents: {}", documents);
    println!("  chunks written: {}", chunks_written);
    if skipped > 0 {
        println!("  skipped: {}", skipped);
    }
    println!("ok");

    index.close().await;
    Ok(())
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("No such file or directory: {}", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| extract::is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}
