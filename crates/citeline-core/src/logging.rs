//! Structured logging field name constants for citeline.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Session lifecycle, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (candidates, fragments) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Question session UUID, propagated across retrieval → generation → audit.
pub const SESSION_ID: &str = "session_id";

/// Component within the engine.
/// Examples: "lexical", "dense", "table", "fusion", "planner", "generator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "retrieve", "fuse", "generate", "score_confidence"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Chunk UUID being scored or cited.
pub const CHUNK_ID: &str = "chunk_id";

/// Document UUID (cache invalidation scope).
pub const DOCUMENT_ID: &str = "document_id";

/// Question text (truncated by callers where long).
pub const QUESTION: &str = "question";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a retriever or fusion.
pub const RESULT_COUNT: &str = "result_count";

/// Number of fragments emitted by generation.
pub const FRAGMENT_COUNT: &str = "fragment_count";

/// Number of citations confirmed.
pub const CITATION_COUNT: &str = "citation_count";

/// Final confidence score.
pub const CONFIDENCE: &str = "confidence";

// ─── Retrieval-specific fields ─────────────────────────────────────────────

/// Number of lexical candidates before fusion.
pub const LEXICAL_HITS: &str = "lexical_hits";

/// Number of dense candidates before fusion.
pub const DENSE_HITS: &str = "dense_hits";

/// Number of table candidates before fusion.
pub const TABLE_HITS: &str = "table_hits";

/// Fused score of the top evidence item (sufficiency gate input).
pub const TOP_FUSED_SCORE: &str = "top_fused_score";

/// Whether the result was served from the question cache.
pub const CACHE_HIT: &str = "cache_hit";
