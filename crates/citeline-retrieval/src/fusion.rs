//! Candidate fusion: merge the three retriever lists into one ranked
//! evidence list.
//!
//! Raw scores are min-max normalized within each method's own list before
//! weighting, so no single retriever's arbitrary scale dominates. Duplicates
//! (same chunk found by several methods) merge into one evidence item with
//! the best normalized score per method and a provenance list. Ties break
//! by section priority then chunk id for determinism.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use citeline_core::{Candidate, EvidenceItem, RetrievalConfig, RetrievalMethod};

/// Normalize raw scores to [0, 1] within one method's candidate list.
///
/// A list of size 1 (or a list where all scores are equal) normalizes to
/// 1.0 — the method ranked it best among what it found.
fn min_max_normalize(candidates: &[Candidate]) -> Vec<(Candidate, f32)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let min = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f32::INFINITY, f32::min);
    let max = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    candidates
        .iter()
        .map(|c| {
            let normalized = if span > 0.0 { (c.raw_score - min) / span } else { 1.0 };
            (c.clone(), normalized)
        })
        .collect()
}

/// Per-chunk accumulator during fusion.
struct FusedEntry {
    candidate: Candidate,
    methods: Vec<RetrievalMethod>,
    normalized: HashMap<RetrievalMethod, f32>,
    matched_columns: Vec<String>,
}

/// Fuse the three candidate lists into an ordered evidence list.
///
/// All-empty input returns an empty list (the primary trigger for
/// "insufficient evidence" downstream), never an error. Output is capped
/// at `k_final`.
pub fn fuse(
    lexical: Vec<Candidate>,
    dense: Vec<Candidate>,
    table: Vec<Candidate>,
    config: &RetrievalConfig,
) -> Vec<EvidenceItem> {
    let input_counts = (lexical.len(), dense.len(), table.len());
    let mut entries: HashMap<Uuid, FusedEntry> = HashMap::new();

    for list in [lexical, dense, table] {
        for (candidate, normalized) in min_max_normalize(&list) {
            let method = candidate.method;
            let entry = entries
                .entry(candidate.chunk_id)
                .or_insert_with(|| FusedEntry {
                    candidate: candidate.clone(),
                    methods: Vec::new(),
                    normalized: HashMap::new(),
                    matched_columns: Vec::new(),
                });
            if !entry.methods.contains(&method) {
                entry.methods.push(method);
            }
            // Duplicate within a list keeps the highest score.
            let slot = entry.normalized.entry(method).or_insert(0.0);
            if normalized > *slot {
                *slot = normalized;
            }
            if method == RetrievalMethod::Table {
                entry.matched_columns = candidate.matched_columns;
            }
        }
    }

    let mut items: Vec<EvidenceItem> = entries
        .into_values()
        .map(|entry| {
            let lex = entry
                .normalized
                .get(&RetrievalMethod::Lexical)
                .copied()
                .unwrap_or(0.0);
            let dense = entry
                .normalized
                .get(&RetrievalMethod::Dense)
                .copied()
                .unwrap_or(0.0);
            let table = entry
                .normalized
                .get(&RetrievalMethod::Table)
                .copied()
                .unwrap_or(0.0);
            let fused =
                (config.alpha * lex + config.beta * dense + config.gamma * table).clamp(0.0, 1.0);
            EvidenceItem {
                chunk_id: entry.candidate.chunk_id,
                document_id: entry.candidate.document_id,
                section: entry.candidate.section,
                fused_score: fused,
                methods: entry.methods,
                snippet: entry.candidate.snippet,
                matched_columns: entry.matched_columns,
            }
        })
        .collect();

    items.sort_by(|a, b| a.ranking_cmp(b));
    items.truncate(config.k_final);

    debug!(
        lexical_hits = input_counts.0,
        dense_hits = input_counts.1,
        table_hits = input_counts.2,
        result_count = items.len(),
        "fusion complete"
    );
    items
}
