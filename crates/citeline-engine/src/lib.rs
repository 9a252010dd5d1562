//! Citation-gated question answering engine.
//!
//! Ties hybrid retrieval, citation-gated streaming generation, confidence
//! scoring, and contradiction detection into one `AskEngine`:
//!
//! ```text
//! question ─→ validate ─→ cache / hybrid retrieval ─→ sufficiency gate
//!          ─→ streaming generation over the evidence allow-list
//!          ─→ contradiction detection ─→ confidence ─→ terminal outcome
//! ```
//!
//! Every session ends in exactly one terminal status: `completed` (with a
//! cited answer), `insufficient_evidence`, `cancelled`, or `failed`.

pub mod confidence;
pub mod contradiction;
pub mod generator;
pub mod planner;
pub mod store;
pub mod stream;

pub use confidence::score_confidence;
pub use contradiction::detect_contradictions;
pub use generator::AnswerGenerator;
pub use planner::{AskEngine, AskResponse, INSUFFICIENT_EVIDENCE_TEXT};
pub use store::InMemoryEvidenceStore;
pub use stream::{AnswerStream, CancelHandle};
