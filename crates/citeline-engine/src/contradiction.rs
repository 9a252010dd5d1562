//! Conservative contradiction detection over cited evidence.
//!
//! Detection is intentionally narrow: it only compares numeric claims for
//! the same metric drawn from different documents, and only flags a pair
//! when the values disagree beyond the configured relative tolerance with
//! matching units. Anything ambiguous is not a contradiction.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use citeline_core::{Citation, ContradictionConfig, ContradictionFlag};

/// `<metric words> <connective> <number> <optional unit>`, where the
/// connective is a verb-ish word or an `=`/`:` as tables and terse
/// results prose write it ("AUROC = 0.91").
fn claim_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?P<metric>[a-z][a-z-]{2,}(?:\s+[a-z][a-z-]{2,}){0,2})(?:\s+(?:was|were|is|are|of|at|reached|achieved|showed)\s+|\s*[=:]\s*)(?P<num>-?\d+(?:\.\d+)?)\s*(?P<unit>%|°[CF]|[a-zA-Zµ][a-zA-Z/µ]{0,6})?",
        )
        .expect("static regex")
    })
}

/// Connectives and fillers that the metric capture must not end with.
const METRIC_STOPWORDS: &[&str] = &[
    "the", "this", "that", "which", "with", "from", "for", "and", "value",
    "values", "result", "results", "than", "about", "around",
];

/// A numeric claim extracted from one citation's snippet.
#[derive(Debug, Clone)]
struct NumericClaim {
    chunk_id: Uuid,
    document_id: Uuid,
    metric: String,
    value: f64,
    unit: Option<String>,
}

/// Scan cited snippets for numeric claims and flag cross-document pairs
/// that disagree on the same metric.
pub fn detect_contradictions(
    config: &ContradictionConfig,
    citations: &[Citation],
) -> Vec<ContradictionFlag> {
    let claims: Vec<NumericClaim> = citations.iter().flat_map(extract_claims).collect();
    let mut flags = Vec::new();

    for (i, a) in claims.iter().enumerate() {
        for b in claims.iter().skip(i + 1) {
            // Same-document disagreement is reporting nuance, not a
            // contradiction between sources.
            if a.document_id == b.document_id {
                continue;
            }
            if a.metric != b.metric || a.unit != b.unit {
                continue;
            }
            if values_compatible(a.value, b.value, config.relative_tolerance) {
                continue;
            }
            debug!(
                metric = %a.metric,
                value_a = a.value,
                value_b = b.value,
                "numeric claims disagree across documents"
            );
            flags.push(ContradictionFlag {
                chunk_a: a.chunk_id,
                chunk_b: b.chunk_id,
                metric: a.metric.clone(),
                value_a: a.value,
                value_b: b.value,
            });
        }
    }
    flags
}

fn extract_claims(citation: &Citation) -> Vec<NumericClaim> {
    claim_re()
        .captures_iter(&citation.snippet)
        .filter_map(|caps| {
            let metric = normalize_metric(&caps["metric"])?;
            let value: f64 = caps["num"].parse().ok()?;
            let unit = caps
                .name("unit")
                .map(|m| m.as_str().to_ascii_lowercase())
                .filter(|u| {
                    // English words that commonly trail a number are not
                    // units of measure.
                    !matches!(
                        u.as_str(),
                        "and" | "to" | "or" | "of" | "in" | "the" | "on" | "at" | "by"
                            | "for" | "with" | "from" | "across" | "over" | "under"
                            | "after" | "overall" | "versus" | "was" | "were" | "is"
                            | "are"
                    )
                });
            Some(NumericClaim {
                chunk_id: citation.chunk_id,
                document_id: citation.document_id,
                metric,
                value,
                unit,
            })
        })
        .collect()
}

/// Lowercase the metric phrase and reject captures that are all filler.
fn normalize_metric(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|w| !w.is_empty())
        .collect();
    let last = words.last()?;
    if METRIC_STOPWORDS.contains(&last.to_ascii_lowercase().as_str()) {
        return None;
    }
    let kept: Vec<String> = words
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .skip_while(|w| METRIC_STOPWORDS.contains(&w.as_str()))
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

fn values_compatible(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() / scale <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_core::Section;

    fn citation(doc: u128, chunk: u128, snippet: &str) -> Citation {
        Citation {
            chunk_id: Uuid::from_u128(chunk),
            document_id: Uuid::from_u128(doc),
            section: Section::Results,
            snippet: snippet.to_string(),
            fused_score: 0.8,
        }
    }

    #[test]
    fn flags_cross_document_disagreement() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Overall accuracy was 0.91 on the test set."),
            citation(2, 20, "Overall accuracy was 0.78 in replication."),
        ];
        let flags = detect_contradictions(&config, &citations);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].metric, "overall accuracy");
        assert_eq!(flags[0].value_a, 0.91);
        assert_eq!(flags[0].value_b, 0.78);
    }

    #[test]
    fn equals_sign_claims_are_flagged() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "AUROC = 0.91 on the held-out test set."),
            citation(2, 20, "In replication, AUROC = 0.76 was observed."),
        ];
        let flags = detect_contradictions(&config, &citations);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].metric, "auroc");
        assert_eq!(flags[0].value_a, 0.91);
        assert_eq!(flags[0].value_b, 0.76);
    }

    #[test]
    fn colon_claims_are_extracted() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Sensitivity: 0.90 across all sites."),
            citation(2, 20, "Sensitivity: 0.62 across all sites."),
        ];
        assert_eq!(detect_contradictions(&config, &citations).len(), 1);
    }

    #[test]
    fn tolerated_difference_is_not_flagged() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Sensitivity was 0.90 overall."),
            citation(2, 20, "Sensitivity was 0.89 overall."),
        ];
        assert!(detect_contradictions(&config, &citations).is_empty());
    }

    #[test]
    fn same_document_is_not_flagged() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Latency was 120 ms at baseline."),
            citation(1, 11, "Latency was 45 ms after tuning."),
        ];
        assert!(detect_contradictions(&config, &citations).is_empty());
    }

    #[test]
    fn different_units_are_not_compared() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Dose was 5 mg per day."),
            citation(2, 20, "Dose was 500 µg per day."),
        ];
        assert!(detect_contradictions(&config, &citations).is_empty());
    }

    #[test]
    fn different_metrics_are_not_compared() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "Precision was 0.91 overall."),
            citation(2, 20, "Recall was 0.55 overall."),
        ];
        assert!(detect_contradictions(&config, &citations).is_empty());
    }

    #[test]
    fn filler_metric_phrase_is_skipped() {
        let config = ContradictionConfig::default();
        let citations = vec![
            citation(1, 10, "The result was 42 overall."),
            citation(2, 20, "The result was 7 overall."),
        ];
        assert!(detect_contradictions(&config, &citations).is_empty());
    }

    #[test]
    fn zero_values_are_compatible() {
        assert!(values_compatible(0.0, 0.0, 0.05));
    }
}
