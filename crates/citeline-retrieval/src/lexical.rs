//! Lexical retrieval: TF-IDF term scoring with section boosting.
//!
//! Scores are computed per query over the filtered corpus snapshot, so
//! document frequencies reflect the scoped corpus the question actually
//! runs against. Read-only; no side effects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use citeline_core::{Candidate, EvidenceStore, QueryFilters, Result, RetrievalMethod, Section};

use crate::tokenize::{tokenize, unique_terms};

/// Per-section multiplier for term matches. A hit in a results section is
/// worth more than the same hit in references.
fn section_boost(section: Section) -> f32 {
    match section {
        Section::Results => 1.5,
        Section::Abstract => 1.3,
        Section::Conclusion => 1.2,
        Section::Discussion => 1.1,
        Section::Methods => 1.1,
        Section::Introduction => 1.0,
        Section::Title => 1.0,
        Section::Other => 0.9,
        Section::References => 0.5,
    }
}

/// Keyword retriever over chunk text.
pub struct LexicalRetriever {
    store: Arc<dyn EvidenceStore>,
}

impl LexicalRetriever {
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self { store }
    }

    /// Return up to `k_lex` candidates ranked by boosted TF-IDF.
    ///
    /// Empty or punctuation-only questions return an empty list, not an
    /// error.
    pub async fn retrieve(
        &self,
        question: &str,
        filters: &QueryFilters,
        k_lex: usize,
    ) -> Result<Vec<Candidate>> {
        let start = Instant::now();
        let query_terms = unique_terms(question);
        if query_terms.is_empty() {
            debug!(component = "lexical", "no scorable query terms");
            return Ok(Vec::new());
        }

        let chunks = self.store.fetch_chunks(filters).await?;
        let corpus_size = chunks.len();
        if corpus_size == 0 {
            return Ok(Vec::new());
        }

        // Tokenize each chunk once; count document frequency per query term.
        let chunk_terms: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for terms in &chunk_terms {
            for query_term in &query_terms {
                if terms.iter().any(|t| t == query_term) {
                    *doc_freq.entry(query_term.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut candidates: Vec<Candidate> = chunks
            .iter()
            .zip(chunk_terms.iter())
            .filter_map(|(chunk, terms)| {
                if terms.is_empty() {
                    return None;
                }
                let total = terms.len() as f32;
                let mut score = 0.0f32;
                for query_term in &query_terms {
                    let tf = terms.iter().filter(|t| *t == query_term).count() as f32;
                    if tf == 0.0 {
                        continue;
                    }
                    let df = doc_freq.get(query_term.as_str()).copied().unwrap_or(1) as f32;
                    let idf = (1.0 + corpus_size as f32 / df).ln();
                    score += (tf / total) * idf;
                }
                if score <= 0.0 {
                    return None;
                }
                score *= section_boost(chunk.section);
                Some(Candidate {
                    chunk_id: chunk.id,
                    document_id: chunk.document_id,
                    section: chunk.section,
                    method: RetrievalMethod::Lexical,
                    raw_score: score,
                    snippet: chunk.snippet(),
                    matched_columns: Vec::new(),
                })
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(k_lex);

        debug!(
            component = "lexical",
            result_count = candidates.len(),
            corpus_size,
            duration_ms = start.elapsed().as_millis() as u64,
            "lexical retrieval complete"
        );
        Ok(candidates)
    }
}

/// Deterministic candidate ordering: score desc, section priority, chunk id.
pub(crate) fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.section.priority().cmp(&b.section.priority()))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{chunk, StaticStore};
    use uuid::Uuid;

    fn store(chunks: Vec<citeline_core::Chunk>) -> Arc<dyn EvidenceStore> {
        Arc::new(StaticStore::new(chunks, 4))
    }

    #[tokio::test]
    async fn empty_question_returns_empty() {
        let retriever = LexicalRetriever::new(store(vec![chunk(
            "the optimal temperature is 37",
            Section::Results,
        )]));
        let hits = retriever
            .retrieve("", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn punctuation_only_question_returns_empty() {
        let retriever = LexicalRetriever::new(store(vec![chunk("some text", Section::Other)]));
        let hits = retriever
            .retrieve("?!?...", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn matching_chunk_ranks_above_non_matching() {
        let retriever = LexicalRetriever::new(store(vec![
            chunk("the optimal temperature is 37 degrees", Section::Results),
            chunk("unrelated text about enzymes", Section::Results),
        ]));
        let hits = retriever
            .retrieve("optimal temperature", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].snippet.contains("optimal temperature"));
        assert_eq!(hits[0].method, RetrievalMethod::Lexical);
    }

    #[tokio::test]
    async fn results_section_boosted_over_references() {
        let mut a = chunk("accuracy improved significantly", Section::References);
        let mut b = chunk("accuracy improved significantly", Section::Results);
        // Pin ids so the test doesn't depend on random ordering.
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);
        let retriever = LexicalRetriever::new(store(vec![a, b]));
        let hits = retriever
            .retrieve("accuracy improved", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].section, Section::Results);
        assert!(hits[0].raw_score > hits[1].raw_score);
    }

    #[tokio::test]
    async fn respects_k_lex_cap() {
        let chunks: Vec<_> = (0..20)
            .map(|i| chunk(&format!("temperature reading number {}", i), Section::Results))
            .collect();
        let retriever = LexicalRetriever::new(store(chunks));
        let hits = retriever
            .retrieve("temperature reading", &QueryFilters::default(), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn scores_non_increasing() {
        let chunks = vec![
            chunk("temperature temperature temperature", Section::Results),
            chunk("temperature and other words here", Section::Results),
            chunk("one temperature mention in a longer passage of text", Section::Methods),
        ];
        let retriever = LexicalRetriever::new(store(chunks));
        let hits = retriever
            .retrieve("temperature", &QueryFilters::default(), 10)
            .await
            .unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].raw_score >= pair[1].raw_score);
        }
    }
}
