//! Table-aware retrieval: structural match over table schemas.
//!
//! Extracts lightweight structural intent from the question (metric terms,
//! a comparison operator, numeric values, a unit hint) and matches it
//! against table column names, units, and observed value ranges instead of
//! free text. Zero candidates for a purely narrative question is correct
//! behavior, not a failure.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;
use tracing::debug;

use citeline_core::{Candidate, EvidenceStore, QueryFilters, Result, RetrievalMethod, TableSchema};

use crate::lexical::sort_candidates;
use crate::tokenize::unique_terms;

/// Comparison operator detected in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    GreaterThan,
    LessThan,
    Equal,
    Between,
}

/// Structural intent parsed from a question.
#[derive(Debug, Clone, Default)]
pub struct QueryIntent {
    /// Content terms that could name a metric or column.
    pub metric_terms: Vec<String>,
    pub comparison: Option<ComparisonOp>,
    /// Numeric values mentioned in the question.
    pub values: Vec<f64>,
    /// Unit token adjacent to a numeric value, if any.
    pub unit_hint: Option<String>,
}

impl QueryIntent {
    /// A question with no metric terms and no numbers has no structural
    /// intent to match tables against.
    pub fn is_structural(&self) -> bool {
        !self.metric_terms.is_empty() || !self.values.is_empty()
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Number with optional trailing unit token (%, ms, °C, mg/ml, ...).
        Regex::new(r"(?P<num>-?\d+(?:\.\d+)?)\s*(?P<unit>%|°[CF]|[a-zA-Zµ][a-zA-Z/µ]{0,6})?")
            .expect("static regex")
    })
}

/// Extract structural intent from question text.
pub fn extract_intent(question: &str) -> QueryIntent {
    let lowered = question.to_lowercase();

    let comparison = if lowered.contains("between") {
        Some(ComparisonOp::Between)
    } else if lowered.contains("greater than")
        || lowered.contains("more than")
        || lowered.contains("above")
        || lowered.contains("at least")
        || lowered.contains(" > ")
    {
        Some(ComparisonOp::GreaterThan)
    } else if lowered.contains("less than")
        || lowered.contains("below")
        || lowered.contains("under")
        || lowered.contains("at most")
        || lowered.contains(" < ")
    {
        Some(ComparisonOp::LessThan)
    } else if lowered.contains("equal to") || lowered.contains("exactly") {
        Some(ComparisonOp::Equal)
    } else {
        None
    };

    let mut values = Vec::new();
    let mut unit_hint = None;
    for caps in number_re().captures_iter(&lowered) {
        if let Ok(v) = caps["num"].parse::<f64>() {
            values.push(v);
        }
        if unit_hint.is_none() {
            if let Some(unit) = caps.name("unit") {
                // Connective words after a number are not units.
                if !matches!(unit.as_str(), "and" | "to" | "or" | "of" | "in" | "the") {
                    unit_hint = Some(unit.as_str().to_string());
                }
            }
        }
    }

    // Metric terms are the content tokens minus bare numbers.
    let metric_terms = unique_terms(question)
        .into_iter()
        .filter(|t| t.parse::<f64>().is_err())
        .collect();

    QueryIntent {
        metric_terms,
        comparison,
        values,
        unit_hint,
    }
}

/// Structural retriever over table chunks.
pub struct TableRetriever {
    store: Arc<dyn EvidenceStore>,
}

/// Score contribution when the question's numeric constraint is
/// satisfiable by a column's observed value range.
const RANGE_MATCH_BONUS: f32 = 0.5;

/// Score contribution when the question's unit hint matches a column unit.
const UNIT_MATCH_BONUS: f32 = 0.5;

impl TableRetriever {
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self { store }
    }

    /// Return up to `k_table` candidates whose table schemas match the
    /// question's structural intent, tagged with the matching columns.
    pub async fn retrieve(
        &self,
        question: &str,
        filters: &QueryFilters,
        k_table: usize,
    ) -> Result<Vec<Candidate>> {
        let start = Instant::now();
        let intent = extract_intent(question);
        if !intent.is_structural() {
            debug!(component = "table", "narrative question, no structural intent");
            return Ok(Vec::new());
        }

        let chunks = self.store.fetch_chunks(filters).await?;
        let mut candidates: Vec<Candidate> = chunks
            .iter()
            .filter_map(|chunk| {
                let schema = chunk.table.as_ref()?;
                let (score, matched_columns) = score_schema(schema, &intent);
                if score <= 0.0 {
                    return None;
                }
                Some(Candidate {
                    chunk_id: chunk.id,
                    document_id: chunk.document_id,
                    section: chunk.section,
                    method: RetrievalMethod::Table,
                    raw_score: score,
                    snippet: chunk.snippet(),
                    matched_columns,
                })
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(k_table);

        debug!(
            component = "table",
            result_count = candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "table retrieval complete"
        );
        Ok(candidates)
    }
}

/// Whether a column's observed range `[lo, hi]` can satisfy the question's
/// numeric constraint. "Greater than 0.8" matches a column reaching above
/// 0.8 even when 0.8 itself is outside the observed range; without an
/// operator we fall back to point containment.
fn range_matches(lo: f64, hi: f64, intent: &QueryIntent) -> bool {
    if intent.values.is_empty() {
        return false;
    }
    match intent.comparison {
        Some(ComparisonOp::GreaterThan) => intent.values.iter().any(|v| hi > *v),
        Some(ComparisonOp::LessThan) => intent.values.iter().any(|v| lo < *v),
        Some(ComparisonOp::Between) => {
            let qlo = intent.values.iter().cloned().fold(f64::INFINITY, f64::min);
            let qhi = intent
                .values
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            lo <= qhi && hi >= qlo
        }
        Some(ComparisonOp::Equal) | None => intent.values.iter().any(|v| *v >= lo && *v <= hi),
    }
}

/// Score one table schema against the intent; returns the score and the
/// columns that drove the match.
fn score_schema(schema: &TableSchema, intent: &QueryIntent) -> (f32, Vec<String>) {
    let mut score = 0.0f32;
    let mut matched = Vec::new();

    for column in &schema.columns {
        let column_terms = unique_terms(&column.name);
        let mut column_score = 0.0f32;

        if !column_terms.is_empty() && !intent.metric_terms.is_empty() {
            let overlap = column_terms
                .iter()
                .filter(|t| intent.metric_terms.contains(t))
                .count();
            column_score += overlap as f32 / column_terms.len() as f32;
        }

        if let (Some(hint), Some(unit)) = (&intent.unit_hint, &column.unit) {
            if hint.eq_ignore_ascii_case(unit) {
                column_score += UNIT_MATCH_BONUS;
            }
        }

        if let Some((lo, hi)) = column.value_range {
            if range_matches(lo, hi, intent) {
                column_score += RANGE_MATCH_BONUS;
            }
        }

        if column_score > 0.0 {
            score += column_score;
            matched.push(column.name.clone());
        }
    }

    // A title match alone is weak corroboration, only counted when at
    // least one column already matched.
    if !matched.is_empty() {
        if let Some(title) = &schema.title {
            let title_terms = unique_terms(title);
            if title_terms.iter().any(|t| intent.metric_terms.contains(t)) {
                score += 0.25;
            }
        }
    }

    (score, matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{chunk, table_chunk, StaticStore};
    use citeline_core::{Section, TableColumn};
    use uuid::Uuid;

    fn auroc_schema() -> TableSchema {
        TableSchema {
            table_id: Uuid::new_v4(),
            title: Some("Model performance".to_string()),
            columns: vec![
                TableColumn {
                    name: "AUROC".to_string(),
                    unit: None,
                    value_range: Some((0.5, 0.95)),
                },
                TableColumn {
                    name: "Latency".to_string(),
                    unit: Some("ms".to_string()),
                    value_range: Some((10.0, 250.0)),
                },
            ],
        }
    }

    fn store(chunks: Vec<citeline_core::Chunk>) -> Arc<dyn EvidenceStore> {
        Arc::new(StaticStore::new(chunks, 4))
    }

    #[test]
    fn extract_intent_finds_comparison_and_values() {
        let intent = extract_intent("which models have AUROC greater than 0.8?");
        assert_eq!(intent.comparison, Some(ComparisonOp::GreaterThan));
        assert_eq!(intent.values, vec![0.8]);
        assert!(intent.metric_terms.contains(&"auroc".to_string()));
    }

    #[test]
    fn extract_intent_finds_unit_hint() {
        let intent = extract_intent("is latency under 100 ms?");
        assert_eq!(intent.unit_hint.as_deref(), Some("ms"));
        assert_eq!(intent.values, vec![100.0]);
    }

    #[test]
    fn extract_intent_between_range() {
        let intent = extract_intent("values between 10 and 20");
        assert_eq!(intent.comparison, Some(ComparisonOp::Between));
        assert_eq!(intent.values, vec![10.0, 20.0]);
    }

    #[test]
    fn narrative_question_is_not_structural() {
        let intent = extract_intent("?? !!");
        assert!(!intent.is_structural());
    }

    #[test]
    fn greater_than_matches_range_reaching_above_threshold() {
        // 0.3 is below the observed range, so point containment alone
        // would miss this column.
        let intent = extract_intent("models with AUROC greater than 0.3");
        assert!(range_matches(0.5, 0.95, &intent));
    }

    #[test]
    fn less_than_respects_range_floor() {
        let satisfiable = extract_intent("runs under 300");
        assert!(range_matches(10.0, 250.0, &satisfiable));
        let unsatisfiable = extract_intent("runs under 5");
        assert!(!range_matches(10.0, 250.0, &unsatisfiable));
    }

    #[test]
    fn no_operator_falls_back_to_point_containment() {
        let outside = extract_intent("latency of 300");
        assert!(!range_matches(10.0, 250.0, &outside));
        let inside = extract_intent("latency of 100");
        assert!(range_matches(10.0, 250.0, &inside));
    }

    #[tokio::test]
    async fn comparison_threshold_outside_observed_range_still_matches() {
        let retriever = TableRetriever::new(store(vec![table_chunk(
            "Table 1: model performance",
            auroc_schema(),
        )]));
        let hits = retriever
            .retrieve("which rows are under 300?", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].matched_columns.contains(&"Latency".to_string()));
    }

    #[tokio::test]
    async fn matches_column_by_name() {
        let retriever = TableRetriever::new(store(vec![table_chunk(
            "Table 1: model performance",
            auroc_schema(),
        )]));
        let hits = retriever
            .retrieve("what is the AUROC?", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].method, RetrievalMethod::Table);
        assert_eq!(hits[0].matched_columns, vec!["AUROC"]);
    }

    #[tokio::test]
    async fn unit_and_range_match_boost_score() {
        let retriever = TableRetriever::new(store(vec![table_chunk(
            "Table 1: model performance",
            auroc_schema(),
        )]));
        let hits = retriever
            .retrieve("is latency under 100 ms?", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].matched_columns.contains(&"Latency".to_string()));
    }

    #[tokio::test]
    async fn narrative_question_returns_zero_candidates() {
        let retriever = TableRetriever::new(store(vec![table_chunk(
            "Table 1: model performance",
            auroc_schema(),
        )]));
        let hits = retriever
            .retrieve("...", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn non_table_chunks_never_match() {
        let retriever = TableRetriever::new(store(vec![chunk(
            "AUROC was 0.91 in our experiments",
            Section::Results,
        )]));
        let hits = retriever
            .retrieve("what is the AUROC?", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn unrelated_schema_scores_zero() {
        let schema = TableSchema {
            table_id: Uuid::new_v4(),
            title: None,
            columns: vec![TableColumn {
                name: "Species".to_string(),
                unit: None,
                value_range: None,
            }],
        };
        let retriever = TableRetriever::new(store(vec![table_chunk("Table 2", schema)]));
        let hits = retriever
            .retrieve("what is the AUROC?", &QueryFilters::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
