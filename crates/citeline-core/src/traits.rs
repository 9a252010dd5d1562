//! Collaborator traits at the boundary of the retrieval core.
//!
//! The evidence store, embedding service, and generation service are
//! external systems. The core depends on these seams and never owns the
//! data behind them; concrete implementations (HTTP backends, the in-memory
//! store) live in their own crates.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{Chunk, QueryFilters};

/// Read-only access to the externally owned chunk store.
///
/// The store owns chunk lifecycle exclusively: the core only reads. Chunks
/// are returned as `Arc`s so concurrent sessions share one corpus snapshot
/// without copying text.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Fetch all chunks in scope of the given filters (document id set,
    /// workspace scope). Unscoped filters return the whole corpus.
    async fn fetch_chunks(&self, filters: &QueryFilters) -> Result<Vec<Arc<Chunk>>>;

    /// Fixed system-wide embedding dimensionality.
    fn embedding_dimension(&self) -> usize;
}

/// External embedding service for question text.
///
/// Failure here degrades the dense retriever to zero candidates; it never
/// fails the whole query.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed question text into a fixed-dimension vector.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Expected dimension of returned vectors.
    fn dimension(&self) -> usize;

    /// Model name being used.
    fn model_name(&self) -> &str;
}

/// External generation service.
///
/// Generation is the one long-running, suspension-bearing operation: the
/// backend returns a finite, ordered, single-consumer fragment sequence.
/// A fragment-level `Err` is an irrecoverable mid-stream failure; the
/// channel closing cleanly marks the end of generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Start generation for the given system context and prompt.
    ///
    /// Backends that only support buffered responses may emit the whole
    /// output as a short fragment sequence; ordering is still guaranteed.
    async fn generate_stream(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String>>>;

    /// Model name being used.
    fn model_name(&self) -> &str;
}
