//! Answer confidence scoring.
//!
//! Confidence is a weighted ensemble of four signals computed from the
//! finished answer and its citations, capped when contradictions were
//! flagged among the cited evidence. All signals land in [0, 1] before
//! weighting, so the ensemble does too.

use citeline_core::{Citation, ConfidenceConfig, ContradictionFlag};

/// Compute the confidence of an answer from its citations and any
/// contradiction flags raised over the cited evidence.
///
/// Callable outside a session: any (answer, citations, flags) triple
/// scores the same regardless of where it came from.
pub fn score_confidence(
    config: &ConfidenceConfig,
    answer_text: &str,
    citations: &[Citation],
    contradictions: &[ContradictionFlag],
) -> f32 {
    if citations.is_empty() {
        return 0.0;
    }

    let evidence_strength = citations
        .iter()
        .map(|c| c.fused_score)
        .fold(f32::INFINITY, f32::min)
        .clamp(0.0, 1.0);

    let density = citation_density(answer_text, citations.len());
    let coherence = coherence_proxy(answer_text);
    let agreement = if contradictions.is_empty() { 1.0 } else { 0.0 };

    let score = config.retrieval_weight * evidence_strength
        + config.density_weight * density
        + config.coherence_weight * coherence
        + config.contradiction_weight * agreement;

    if contradictions.is_empty() {
        score.clamp(0.0, 1.0)
    } else {
        // Contradicted evidence caps confidence no matter how strong the
        // other signals are.
        score.clamp(0.0, config.contradiction_ceiling)
    }
}

/// Citations per sentence, saturating at one citation per sentence.
fn citation_density(text: &str, citation_count: usize) -> f32 {
    let sentences = sentence_count(text).max(1);
    (citation_count as f32 / sentences as f32).clamp(0.0, 1.0)
}

fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

/// Cheap coherence proxy: penalizes degenerate answers (too short to say
/// anything, or dominated by repeated sentences).
fn coherence_proxy(text: &str) -> f32 {
    let words = text.split_whitespace().count();
    if words < 5 {
        return 0.2;
    }

    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() <= 1 {
        return 0.8;
    }
    let unique: std::collections::HashSet<&str> = sentences.iter().copied().collect();
    let distinct_ratio = unique.len() as f32 / sentences.len() as f32;
    (0.5 + 0.5 * distinct_ratio).clamp(0.0, 1.0)
}
