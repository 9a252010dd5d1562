//! # citeline-core
//!
//! Core types, traits, and configuration for the citeline
//! question-answering engine.
//!
//! This crate provides the data model (chunks, candidates, evidence,
//! answers, sessions), the error taxonomy, tunable configuration, the
//! collaborator traits at the core's boundary, and the audit bus.

pub mod audit;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use audit::{AuditBus, AuditEnvelope, AuditEvent};
pub use config::{ConfidenceConfig, ContradictionConfig, EngineConfig, RetrievalConfig};
pub use error::{Error, Result};
pub use models::*;
pub use traits::{EmbeddingBackend, EvidenceStore, GenerationBackend};
