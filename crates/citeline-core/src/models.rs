//! Core data model for citeline.
//!
//! The evidence store owns [`Chunk`] lifecycle (chunks are created by
//! ingestion and immutable thereafter); everything else here is per-query
//! state owned by the retrieval core: [`Candidate`]s exist between retrieval
//! and fusion, [`EvidenceItem`]s between fusion and finalization, and one
//! [`Answer`] belongs to exactly one terminal [`QuestionSession`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Maximum snippet length attached to candidates and citations.
pub const SNIPPET_MAX_CHARS: usize = 200;

// ============================================================================
// Sections
// ============================================================================

/// Document section a chunk was extracted from.
///
/// Declaration order is document order. [`Section::priority`] defines the
/// deterministic tie-break order used by fusion (a results-section chunk
/// outranks a references-section chunk at equal fused score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Title,
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    Conclusion,
    References,
    Other,
}

impl Section {
    /// Tie-break priority: lower value wins. Evidence-bearing sections come
    /// first; references last.
    pub fn priority(&self) -> u8 {
        match self {
            Section::Results => 0,
            Section::Abstract => 1,
            Section::Conclusion => 2,
            Section::Discussion => 3,
            Section::Methods => 4,
            Section::Introduction => 5,
            Section::Title => 6,
            Section::Other => 7,
            Section::References => 8,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Section::Title => "title",
            Section::Abstract => "abstract",
            Section::Introduction => "introduction",
            Section::Methods => "methods",
            Section::Results => "results",
            Section::Discussion => "discussion",
            Section::Conclusion => "conclusion",
            Section::References => "references",
            Section::Other => "other",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Chunks and tables
// ============================================================================

/// A column in a parsed table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column header as extracted from the table.
    pub name: String,
    /// Inferred unit (e.g., "ms", "%", "°C"), if any.
    pub unit: Option<String>,
    /// Observed (min, max) over numeric values in the column, if numeric.
    pub value_range: Option<(f64, f64)>,
}

/// Structural payload carried by table chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_id: Uuid,
    /// Table title or caption, if extracted.
    pub title: Option<String>,
    pub columns: Vec<TableColumn>,
}

/// A retrievable unit of document text with optional embedding.
///
/// Created once by ingestion (external) and immutable thereafter. A chunk
/// missing an embedding cannot be dense-retrieved but remains lexically
/// retrievable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub section: Section,
    pub page_start: u32,
    pub page_end: u32,
    pub text: String,
    /// Dense embedding of fixed system-wide dimensionality, if computed.
    pub embedding: Option<Vec<f32>>,
    /// Structural payload for table chunks.
    pub table: Option<TableSchema>,
}

impl Chunk {
    /// Truncated snippet of the chunk text for citations.
    pub fn snippet(&self) -> String {
        truncate_snippet(&self.text)
    }
}

/// Truncate text to [`SNIPPET_MAX_CHARS`], appending an ellipsis when cut.
/// Cuts at a char boundary, never mid-codepoint.
pub fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

// ============================================================================
// Candidates and evidence
// ============================================================================

/// Retrieval method that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    Lexical,
    Dense,
    Table,
}

impl std::fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Dense => write!(f, "dense"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Ephemeral per-query association of a chunk with a retrieval method and
/// its raw, method-specific score. Discarded after fusion.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub section: Section,
    pub method: RetrievalMethod,
    /// Raw score on the method's own scale; normalized during fusion.
    pub raw_score: f32,
    pub snippet: String,
    /// For table candidates: the columns that drove the match.
    pub matched_columns: Vec<String>,
}

/// A candidate promoted past fusion and reranking, eligible for citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub section: Section,
    /// Weighted combination of normalized per-method scores, in [0, 1].
    pub fused_score: f32,
    /// Which retrievers found this chunk.
    pub methods: Vec<RetrievalMethod>,
    pub snippet: String,
    pub matched_columns: Vec<String>,
}

impl EvidenceItem {
    /// Deterministic ordering: fused score descending, then section
    /// priority, then chunk id ascending.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .fused_score
            .partial_cmp(&self.fused_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.section.priority().cmp(&other.section.priority()))
            .then_with(|| self.chunk_id.cmp(&other.chunk_id))
    }
}

// ============================================================================
// Answers
// ============================================================================

/// A confirmed citation attached to an answer or fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub section: Section,
    pub snippet: String,
    pub fused_score: f32,
}

impl Citation {
    pub fn from_evidence(item: &EvidenceItem) -> Self {
        Self {
            chunk_id: item.chunk_id,
            document_id: item.document_id,
            section: item.section,
            snippet: item.snippet.clone(),
            fused_score: item.fused_score,
        }
    }
}

/// A pair of evidence items making incompatible claims about the same metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionFlag {
    pub chunk_a: Uuid,
    pub chunk_b: Uuid,
    /// Metric name both claims refer to.
    pub metric: String,
    pub value_a: f64,
    pub value_b: f64,
}

/// Which evidence was considered, cited, and flagged during one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningTrace {
    /// Evidence items that passed fusion and were offered to generation.
    pub considered: Vec<Uuid>,
    /// Evidence items actually cited in the answer.
    pub cited: Vec<Uuid>,
    /// Contradiction annotations over the cited set.
    pub contradictions: Vec<ContradictionFlag>,
}

/// A finalized answer. Immutable once created; a repeated question produces
/// a new answer rather than editing this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    /// Confidence in [0, 1]; fixed at 0 for insufficient evidence.
    pub confidence: f32,
    pub reasoning: ReasoningTrace,
    pub created_at: DateTime<Utc>,
}

/// One increment of a streamed answer. Citations attached to a fragment
/// refer only to claims already present in the fragment's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerFragment {
    pub text: String,
    /// Citations newly confirmed by this fragment.
    pub citations: Vec<Citation>,
}

// ============================================================================
// Sessions
// ============================================================================

/// Question session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Retrieving,
    Generating,
    Completed,
    InsufficientEvidence,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::InsufficientEvidence | Self::Cancelled | Self::Failed
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::InsufficientEvidence => "insufficient_evidence",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Scoping filters for a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Restrict retrieval to these documents. None = whole corpus.
    pub document_ids: Option<Vec<Uuid>>,
    /// Restrict retrieval to one workspace. None = all workspaces.
    pub workspace_id: Option<Uuid>,
}

impl QueryFilters {
    pub fn is_unscoped(&self) -> bool {
        self.document_ids.is_none() && self.workspace_id.is_none()
    }
}

/// One question being processed. Holds the raw question, scoping filters,
/// and the session status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSession {
    pub id: Uuid,
    pub question: String,
    pub filters: QueryFilters,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl QuestionSession {
    pub fn new(question: impl Into<String>, filters: QueryFilters) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            filters,
            status: SessionStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Terminal record of one ask() call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOutcome {
    pub session_id: Uuid,
    pub status: SessionStatus,
    /// Present for `completed` and `insufficient_evidence`; absent for
    /// `cancelled` and `failed`.
    pub answer: Option<Answer>,
}

// ============================================================================
// Tests
// ============================================================================
