//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete implementations:
//! - **[`DisabledEmbedder`]** — returns errors; used when embeddings are not configured.
//! - **[`HashEmbedder`]** — deterministic local feature-hashing embedder; no network.
//! - **[`HuggingFaceEmbedder`]** — calls the Hugging Face Inference API with retry and backoff.
//!
//! Also provides vector utilities shared with the SQLite index:
//! - [`cosine_similarity`] — compute similarity between two embedding vectors
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for BLOB storage
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`
//!
//! # Retry Strategy
//!
//! The Hugging Face provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Maps text to a fixed-length numeric vector.
///
/// Implementations must preserve input order in [`embed_batch`](Embedder::embed_batch)
/// and always produce vectors of exactly [`dims`](Embedder::dims) elements.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (e.g. a search query).
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Create the appropriate [`Embedder`] based on configuration.
///
/// | Config Value | Provider |
/// |--------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"hash"` | [`HashEmbedder`] |
/// | `"huggingface"` | [`HuggingFaceEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "hash" => Ok(Box::new(HashEmbedder::new(config)?)),
        "huggingface" => Ok(Box::new(HuggingFaceEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Disabled Provider ============

/// A no-op embedder that always returns errors.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ Hash Provider ============

/// Deterministic local embedder using feature hashing.
///
/// Each lowercase alphanumeric token is bucketed by the first 8 bytes of
/// its SHA-256 digest; bucket counts are L2-normalised. Texts sharing
/// vocabulary land near each other, which is enough for ranking tests and
/// air-gapped deployments where no model service is reachable. Identical
/// input always produces identical vectors, across processes and machines.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for hash provider"))?;
        if dims == 0 {
            bail!("embedding.dims must be > 0 for hash provider");
        }
        Ok(Self { dims })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(prefix) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============ Hugging Face Provider ============

const HF_API_KEY_VAR: &str = "HUGGINGFACE_API_KEY";

/// Embedding provider using the Hugging Face Inference API.
///
/// Calls the feature-extraction pipeline for the configured model.
/// Requires the `HUGGINGFACE_API_KEY` environment variable to be set.
pub struct HuggingFaceEmbedder {
    model: String,
    dims: usize,
    config: EmbeddingConfig,
}

impl HuggingFaceEmbedder {
    /// Create a new Hugging Face provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `HUGGINGFACE_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for huggingface provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for huggingface provider"))?;

        if std::env::var(HF_API_KEY_VAR).is_err() {
            bail!("{} environment variable not set", HF_API_KEY_VAR);
        }

        Ok(Self {
            model,
            dims,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://router.huggingface.co/hf-inference/models/{}/pipeline/feature-extraction",
            self.model
        )
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var(HF_API_KEY_VAR)
            .map_err(|_| anyhow::anyhow!("{} not set", HF_API_KEY_VAR))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let body = serde_json::json!({ "inputs": texts });
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(self.endpoint())
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let vectors = parse_embedding_response(&json, texts.len())?;
                        for vec in &vectors {
                            if vec.len() != self.dims {
                                bail!(
                                    "Embedding dimensionality mismatch: model {} returned {} dims, expected {}",
                                    self.model,
                                    vec.len(),
                                    self.dims
                                );
                            }
                        }
                        return Ok(vectors);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Hugging Face API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Hugging Face API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

/// Parse the feature-extraction response: an array of vectors, one per
/// input text (a single input may come back as one bare vector).
fn parse_embedding_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let outer = json
        .as_array()
        .context("Invalid embedding response: expected an array")?;

    // Single input, flat vector response.
    if expected == 1 && outer.first().map(|v| v.is_number()).unwrap_or(false) {
        let vec = outer
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        return Ok(vec![vec]);
    }

    let mut vectors = Vec::with_capacity(outer.len());
    for item in outer {
        let inner = item
            .as_array()
            .context("Invalid embedding response: expected nested arrays")?;
        vectors.push(inner.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect());
    }

    if vectors.len() != expected {
        bail!(
            "Embedding response length mismatch: got {}, expected {}",
            vectors.len(),
            expected
        );
    }

    Ok(vectors)
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
