//! # citeline-retrieval
//!
//! Hybrid retrieval engine (lexical + dense + table-aware) for citeline.
//!
//! This crate provides:
//! - TF-IDF lexical retrieval with section boosting
//! - Dense retrieval by cosine similarity over chunk embeddings
//! - Table-aware retrieval matching question intent against table schemas
//! - Weighted score fusion with per-method normalization and deduplication
//! - Secondary reranking over the top fused items
//! - A shared question-hash result cache with per-document invalidation
//!
//! ## Example
//!
//! ```ignore
//! use citeline_retrieval::HybridRetriever;
//! use citeline_core::{QueryFilters, RetrievalConfig};
//!
//! let retriever = HybridRetriever::new(store);
//! let evidence = retriever
//!     .retrieve("what is the AUROC?", Some(&embedding), &QueryFilters::default(), &config)
//!     .await;
//! ```

pub mod cache;
pub mod dense;
pub mod fusion;
pub mod hybrid;
pub mod lexical;
pub mod rerank;
pub mod table;
pub mod tokenize;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{CachedEntry, ResultCache};
pub use dense::{cosine_similarity, DenseRetriever};
pub use fusion::fuse;
pub use hybrid::HybridRetriever;
pub use lexical::LexicalRetriever;
pub use rerank::{NoopReranker, Reranker, TermOverlapReranker};
pub use table::{extract_intent, ComparisonOp, QueryIntent, TableRetriever};
