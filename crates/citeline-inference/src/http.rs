//! HTTP backends for the external embedding and generation services.
//!
//! Both services speak a small JSON API. The generation service is consumed
//! buffered (`stream: false`) and re-fragmented locally at sentence
//! boundaries, which keeps the wire protocol simple while preserving the
//! fragment contract the engine depends on.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use citeline_core::{EmbeddingBackend, Error, GenerationBackend, Result};

/// Default request timeout for both services.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Generation slower than this logs a warning.
const SLOW_GENERATION_MS: u64 = 30_000;

/// Configuration shared by the HTTP backends.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the service API.
    pub base_url: String,
    /// Model slug to request.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Embedding backend
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding service client.
pub struct HttpEmbeddingBackend {
    client: reqwest::Client,
    config: ServiceConfig,
    dimension: usize,
}

impl HttpEmbeddingBackend {
    pub fn new(config: ServiceConfig, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("failed to parse response: {}", e)))?;

        let embedding = result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("service returned no embeddings".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "query embedding complete"
        );
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ---------------------------------------------------------------------------
// Generation backend
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generation service client.
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl HttpGenerationBackend {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate_stream(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let start = Instant::now();
        let request = GenerateRequest {
            model: self.config.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "generation service returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("failed to parse response: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = result.response.len(),
            duration_ms = elapsed,
            "generation complete"
        );
        if elapsed > SLOW_GENERATION_MS {
            warn!(duration_ms = elapsed, prompt_len = prompt.len(), "slow generation");
        }

        let fragments = split_fragments(&result.response);
        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            // Channel sized to hold everything; send cannot block here.
            let _ = tx.try_send(Ok(fragment));
        }
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Split generated text into sentence-boundary fragments.
///
/// Keeps terminal punctuation with its sentence. Text without sentence
/// punctuation becomes a single fragment.
pub fn split_fragments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let fragment = current.trim_start().to_string();
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
            current = String::new();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        fragments.push(rest.to_string());
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_fragments_at_sentence_boundaries() {
        let fragments = split_fragments("First sentence. Second one! Third?");
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], "First sentence.");
        assert_eq!(fragments[1], "Second one!");
        assert_eq!(fragments[2], "Third?");
    }

    #[test]
    fn split_fragments_no_punctuation_single_fragment() {
        let fragments = split_fragments("no terminal punctuation here");
        assert_eq!(fragments, vec!["no terminal punctuation here"]);
    }

    #[test]
    fn split_fragments_empty_input() {
        assert!(split_fragments("").is_empty());
        assert!(split_fragments("   ").is_empty());
    }

    #[test]
    fn split_fragments_preserves_decimal_free_text() {
        let fragments = split_fragments("The AUROC was high. Results follow.");
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn service_config_builder() {
        let config = ServiceConfig::new("http://localhost:11434", "qwen3:8b")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.model, "qwen3:8b");
    }
}
