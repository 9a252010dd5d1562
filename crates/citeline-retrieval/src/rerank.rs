//! Secondary reranking over the top fused evidence items.
//!
//! Reranking is a pure reordering: it never discards items nor introduces
//! new ones, and it only touches the top `rerank_top_n` slice the caller
//! hands it. The rest of the fused list keeps its order.

use citeline_core::EvidenceItem;

use crate::tokenize::unique_terms;

/// Reorders a slice of evidence items in place.
pub trait Reranker: Send + Sync {
    /// Reorder `items` by secondary relevance to `question`. Implementations
    /// must not change the slice's contents, only its order.
    fn rerank(&self, question: &str, items: &mut [EvidenceItem]);
}

/// Keeps fusion order untouched.
pub struct NoopReranker;

impl Reranker for NoopReranker {
    fn rerank(&self, _question: &str, _items: &mut [EvidenceItem]) {}
}

/// Reorders by question-term overlap with the evidence snippet.
///
/// A cheap lexical cross-check: evidence whose snippet covers more of the
/// question's terms moves up. Stable sort, so equal-overlap items keep
/// their fusion order and the result stays deterministic.
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    fn overlap(question_terms: &[String], snippet: &str) -> usize {
        let snippet_terms = unique_terms(snippet);
        question_terms
            .iter()
            .filter(|t| snippet_terms.contains(t))
            .count()
    }
}

impl Reranker for TermOverlapReranker {
    fn rerank(&self, question: &str, items: &mut [EvidenceItem]) {
        let question_terms = unique_terms(question);
        if question_terms.is_empty() {
            return;
        }
        items.sort_by_key(|item| std::cmp::Reverse(Self::overlap(&question_terms, &item.snippet)));
    }
}
