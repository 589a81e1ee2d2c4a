//! Text-generation provider abstraction.
//!
//! The [`Generator`] maps a prompt (system instruction + retrieved context
//! + user query) to a completion. Each call is stateless: no streaming, no
//! conversational memory beyond what is passed in explicitly. Providers:
//! - **[`DisabledGenerator`]** — returns errors; the default.
//! - **[`HuggingFaceGenerator`]** — chat-completions endpoint with the same
//!   retry/backoff policy as the embedding provider.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;

/// Maps a prompt to a text completion via an external model service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;
    /// Produce one completion for the given system instruction, retrieved
    /// context, and user query. May fail with a service-error condition.
    async fn complete(&self, system: &str, context: &str, query: &str) -> Result<String>;
}

/// Create the appropriate [`Generator`] based on configuration.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "huggingface" => Ok(Box::new(HuggingFaceGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled Provider ============

/// A no-op generator that always returns errors.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _system: &str, _context: &str, _query: &str) -> Result<String> {
        bail!("Generation provider is disabled")
    }
}

// ============ Hugging Face Provider ============

const HF_API_KEY_VAR: &str = "HUGGINGFACE_API_KEY";
const HF_CHAT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";

/// Generator backed by the Hugging Face chat-completions API.
///
/// Requires the `HUGGINGFACE_API_KEY` environment variable to be set.
pub struct HuggingFaceGenerator {
    model: String,
    config: GenerationConfig,
}

impl HuggingFaceGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for huggingface provider"))?;

        if std::env::var(HF_API_KEY_VAR).is_err() {
            bail!("{} environment variable not set", HF_API_KEY_VAR);
        }

        Ok(Self {
            model,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, context: &str, query: &str) -> Result<String> {
        let api_key = std::env::var(HF_API_KEY_VAR)
            .map_err(|_| anyhow::anyhow!("{} not set", HF_API_KEY_VAR))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": format!("Context: {}\n\nUser Query: {}", context, query) },
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(HF_CHAT_ENDPOINT)
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
                        return parse_completion_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Hugging Face API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Hugging Face API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .context("Invalid completion response: no choices returned")?;
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_generator_errors() {
        let result = DisabledGenerator.complete("sys", "ctx", "query").await;
        assert!(result.is_err());
    }

    #[test]
    fn parse_valid_completion() {
        let json = serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": "The sky is blue." } } ]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "The sky is blue.");
    }

    #[test]
    fn parse_empty_choices_rejected() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion_response(&json).is_err());
    }
}
