//! Mock inference backends for deterministic testing.
//!
//! Provides scripted embedding and generation backends: embeddings are
//! derived deterministically from input text, generation emits a
//! pre-configured fragment sequence, and failures can be injected at any
//! fragment boundary or at the embedding call.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use citeline_core::{EmbeddingBackend, Error, GenerationBackend, Result};

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fragments: Vec<String>,
    /// Inject an Err after this many successful fragments.
    fail_after: Option<usize>,
    embed_fails: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 4,
            fragments: vec!["Mock answer referencing [E1].".to_string()],
            fail_after: None,
            embed_fails: false,
        }
    }
}

/// A logged call for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

/// Mock backend implementing both embedding and generation.
#[derive(Clone, Default)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockInferenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Script the generation fragment sequence.
    pub fn with_fragments(mut self, fragments: Vec<&str>) -> Self {
        Arc::make_mut(&mut self.config).fragments =
            fragments.into_iter().map(String::from).collect();
        self
    }

    /// Inject a mid-stream generation failure after `n` fragments.
    pub fn with_failure_after(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config).fail_after = Some(n);
        self
    }

    /// Make all embedding calls fail (simulates embedder outage).
    pub fn with_embedding_failure(mut self) -> Self {
        Arc::make_mut(&mut self.config).embed_fails = true;
        self
    }

    /// All logged calls, for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    fn log(&self, operation: &str, input: &str) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
        });
    }
}

/// Deterministic pseudo-embedding from text: same input, same vector.
pub fn deterministic_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut seed = hasher.finish();
    (0..dimension)
        .map(|_| {
            // xorshift over the seed for cheap reproducible values in [0, 1)
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 1000) as f32 / 1000.0
        })
        .collect()
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.log("embed_query", text);
        if self.config.embed_fails {
            return Err(Error::Embedding("mock embedder unavailable".to_string()));
        }
        Ok(deterministic_embedding(text, self.config.dimension))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn generate_stream(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        self.log("generate_stream", prompt);
        let config = self.config.clone();
        let (tx, rx) = mpsc::channel(config.fragments.len().max(1) + 1);
        tokio::spawn(async move {
            for (i, fragment) in config.fragments.iter().enumerate() {
                if config.fail_after == Some(i) {
                    let _ = tx
                        .send(Err(Error::Generation("mock mid-stream failure".to_string())))
                        .await;
                    return;
                }
                if tx.send(Ok(fragment.clone())).await.is_err() {
                    // Consumer dropped (cancellation); stop producing.
                    return;
                }
            }
            if config.fail_after == Some(config.fragments.len()) {
                let _ = tx
                    .send(Err(Error::Generation("mock mid-stream failure".to_string())))
                    .await;
            }
        });
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let backend = MockInferenceBackend::new().with_dimension(8);
        let a = backend.embed_query("same text").await.unwrap();
        let b = backend.embed_query("same text").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let backend = MockInferenceBackend::new();
        let a = backend.embed_query("alpha").await.unwrap();
        let b = backend.embed_query("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embedding_failure_injected() {
        let backend = MockInferenceBackend::new().with_embedding_failure();
        assert!(backend.embed_query("text").await.is_err());
    }

    #[tokio::test]
    async fn scripted_fragments_emitted_in_order() {
        let backend = MockInferenceBackend::new().with_fragments(vec!["one.", "two.", "three."]);
        let mut rx = backend.generate_stream("", "prompt").await.unwrap();
        let mut collected = Vec::new();
        while let Some(fragment) = rx.recv().await {
            collected.push(fragment.unwrap());
        }
        assert_eq!(collected, vec!["one.", "two.", "three."]);
    }

    #[tokio::test]
    async fn failure_after_n_fragments() {
        let backend = MockInferenceBackend::new()
            .with_fragments(vec!["one.", "two.", "three."])
            .with_failure_after(2);
        let mut rx = backend.generate_stream("", "prompt").await.unwrap();
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn call_log_records_operations() {
        let backend = MockInferenceBackend::new();
        backend.embed_query("q").await.unwrap();
        let _ = backend.generate_stream("s", "p").await.unwrap();
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].operation, "embed_query");
        assert_eq!(calls[1].operation, "generate_stream");
    }
}
