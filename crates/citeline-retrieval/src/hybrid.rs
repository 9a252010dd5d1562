//! Hybrid retrieval: concurrent fan-out to the three retrievers, fusion,
//! and secondary reranking.
//!
//! The three retrievers have no data dependency on each other and run
//! concurrently. Each arm degrades independently: a failing retriever
//! contributes zero candidates (logged at WARN) and never aborts the
//! query. All arms empty is a valid outcome, not an error.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use citeline_core::{Candidate, EvidenceItem, EvidenceStore, QueryFilters, RetrievalConfig};

use crate::dense::DenseRetriever;
use crate::fusion::fuse;
use crate::lexical::LexicalRetriever;
use crate::rerank::{Reranker, TermOverlapReranker};
use crate::table::TableRetriever;

/// Hybrid retrieval engine over one evidence store.
pub struct HybridRetriever {
    lexical: LexicalRetriever,
    dense: DenseRetriever,
    table: TableRetriever,
    reranker: Box<dyn Reranker>,
}

impl HybridRetriever {
    /// Create a hybrid retriever with the default term-overlap reranker.
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self::with_reranker(store, Box::new(TermOverlapReranker))
    }

    /// Create a hybrid retriever with a custom reranker.
    pub fn with_reranker(store: Arc<dyn EvidenceStore>, reranker: Box<dyn Reranker>) -> Self {
        Self {
            lexical: LexicalRetriever::new(store.clone()),
            dense: DenseRetriever::new(store.clone()),
            table: TableRetriever::new(store),
            reranker,
        }
    }

    /// Run all three retrievers concurrently, fuse, and rerank.
    ///
    /// `query_embedding = None` silently disables the dense arm. Returns
    /// the ordered evidence list, most relevant first, capped at
    /// `config.k_final`.
    pub async fn retrieve(
        &self,
        question: &str,
        query_embedding: Option<&[f32]>,
        filters: &QueryFilters,
        config: &RetrievalConfig,
    ) -> Vec<EvidenceItem> {
        let start = Instant::now();

        let (lexical, dense, table) = tokio::join!(
            self.lexical.retrieve(question, filters, config.k_lex),
            self.dense
                .retrieve(query_embedding, filters, config.k_dense, config.min_dense_similarity),
            self.table.retrieve(question, filters, config.k_table),
        );

        let lexical = degrade("lexical", lexical);
        let dense = degrade("dense", dense);
        let table = degrade("table", table);

        let mut items = fuse(lexical, dense, table, config);

        let top_n = config.rerank_top_n.min(items.len());
        if top_n > 1 {
            self.reranker.rerank(question, &mut items[..top_n]);
        }

        debug!(
            result_count = items.len(),
            top_fused_score = items.first().map(|i| i.fused_score).unwrap_or(0.0),
            duration_ms = start.elapsed().as_millis() as u64,
            "hybrid retrieval complete"
        );
        items
    }
}

/// Collapse an arm failure into zero candidates.
fn degrade(component: &str, result: citeline_core::Result<Vec<Candidate>>) -> Vec<Candidate> {
    match result {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(component, error = %e, "retriever failed, degrading to zero candidates");
            Vec::new()
        }
    }
}
