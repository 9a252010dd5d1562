//! Dense retrieval: nearest-neighbor search over chunk embeddings.
//!
//! Similarity is cosine. Negative similarities clamp to zero so downstream
//! min-max normalization stays meaningful. Contract: output scores are
//! monotonically non-increasing by rank; a missing query embedding
//! contributes zero candidates rather than failing the query.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use citeline_core::{Candidate, EvidenceStore, QueryFilters, Result, RetrievalMethod};

use crate::lexical::sort_candidates;

/// Embedding-similarity retriever over the evidence store.
pub struct DenseRetriever {
    store: Arc<dyn EvidenceStore>,
}

impl DenseRetriever {
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self { store }
    }

    /// Return up to `k_dense` candidates by cosine similarity, keeping only
    /// chunks at or above `min_similarity`. Without a floor, top-K always
    /// fills with unrelated chunks whose normalized scores then look
    /// artificially strong after fusion.
    ///
    /// `query_embedding = None` (embedder unavailable or failed) returns an
    /// empty list. Chunks without embeddings are skipped; chunks whose
    /// embedding dimension mismatches the query are skipped with a warning.
    pub async fn retrieve(
        &self,
        query_embedding: Option<&[f32]>,
        filters: &QueryFilters,
        k_dense: usize,
        min_similarity: f32,
    ) -> Result<Vec<Candidate>> {
        let query = match query_embedding {
            Some(q) if !q.is_empty() => q,
            _ => {
                debug!(component = "dense", "no query embedding, contributing zero candidates");
                return Ok(Vec::new());
            }
        };

        let start = Instant::now();
        let chunks = self.store.fetch_chunks(filters).await?;

        let mut candidates: Vec<Candidate> = chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                if embedding.len() != query.len() {
                    warn!(
                        component = "dense",
                        chunk_id = %chunk.id,
                        chunk_dim = embedding.len(),
                        query_dim = query.len(),
                        "embedding dimension mismatch, skipping chunk"
                    );
                    return None;
                }
                let similarity = cosine_similarity(query, embedding).max(0.0);
                if similarity < min_similarity {
                    return None;
                }
                Some(Candidate {
                    chunk_id: chunk.id,
                    document_id: chunk.document_id,
                    section: chunk.section,
                    method: RetrievalMethod::Dense,
                    raw_score: similarity,
                    snippet: chunk.snippet(),
                    matched_columns: Vec::new(),
                })
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(k_dense);

        debug!(
            component = "dense",
            result_count = candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "dense retrieval complete"
        );
        Ok(candidates)
    }
}

/// Cosine similarity between two equal-length vectors. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
