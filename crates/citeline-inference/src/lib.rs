//! # citeline-inference
//!
//! Backends for the external embedding and generation services consumed by
//! the citeline engine, plus a deterministic mock backend for tests.

pub mod http;
pub mod mock;

pub use http::{split_fragments, HttpEmbeddingBackend, HttpGenerationBackend, ServiceConfig};
pub use mock::{deterministic_embedding, MockInferenceBackend};
