//! Top-k retrieval and response synthesis.
//!
//! The [`Retriever`] embeds a query, fetches the nearest chunks from the
//! vector index, and concatenates their texts (descending relevance,
//! single-space separator) into one context string. [`answer`] builds the
//! prompt and makes exactly one generation call — unless the context came
//! back empty, in which case generation is skipped entirely and a fixed
//! reply is returned.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::SqliteIndex;
use crate::embedding::{self, Embedder};
use crate::generation::{self, Generator};
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Reply used when retrieval produces no context. Not an error: an empty
/// index or an off-corpus query is a defined, successful outcome.
pub const NO_CONTEXT_REPLY: &str = "No relevant context found.";

pub struct Retriever<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a dyn VectorIndex, embedder: &'a dyn Embedder, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    /// Fetch the top-k chunks for a query, best first.
    ///
    /// An empty index short-circuits before the embedding call, so
    /// retrieval against a fresh index succeeds even when no embedding
    /// service is reachable.
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.index.count().await? == 0 {
            return Ok(Vec::new());
        }
        let vector = self
            .embedder
            .embed(query)
            .await
            .with_context(|| format!("embedding query '{}'", query))?;
        self.index.query(&vector, self.top_k).await
    }

    /// Assemble the context string: chunk texts joined by a single space,
    /// descending relevance. Empty when nothing was retrieved.
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let scored = self.retrieve_scored(query).await?;
        Ok(scored
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Retrieve context for `query` and synthesise an answer.
///
/// Empty context returns [`NO_CONTEXT_REPLY`] without invoking the
/// generator. Otherwise the generator is called exactly once with the
/// configured system instruction, the context, and the query.
pub async fn answer(
    retriever: &Retriever<'_>,
    generator: &dyn Generator,
    system_instruction: &str,
    query: &str,
) -> Result<String> {
    let context = retriever.retrieve(query).await?;
    if context.is_empty() {
        return Ok(NO_CONTEXT_REPLY.to_string());
    }
    generator
        .complete(system_instruction, &context, query)
        .await
        .with_context(|| format!("generating answer for query '{}'", query))
}

/// CLI runner for `opsmate retrieve`: print the scored chunks for a query.
pub async fn run_retrieve(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let embedder = embedding::create_embedder(&config.embedding)?;
    let index = SqliteIndex::open(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let retriever = Retriever::new(&index, embedder.as_ref(), top_k);
    let results = retriever.retrieve_scored(query).await?;

    if results.is_empty() {
        println!("No results.");
        index.close().await;
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let excerpt: String = result.text.chars().take(240).collect();
        println!("{}. [{:.3}] {}", i + 1, result.score, result.id);
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
    }

    index.close().await;
    Ok(())
}

/// CLI runner for `opsmate ask`: retrieve context and generate an answer.
pub async fn run_ask(config: &Config, query: &str) -> Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let embedder = embedding::create_embedder(&config.embedding)?;
    let generator = generation::create_generator(&config.generation)?;
    let index = SqliteIndex::open(config).await?;

    let retriever = Retriever::new(&index, embedder.as_ref(), config.retrieval.top_k);
    let reply = answer(
        &retriever,
        generator.as_ref(),
        &config.generation.system_instruction,
        query,
    )
    .await?;

    println!("{}", reply);
    index.close().await;
    Ok(())
}
