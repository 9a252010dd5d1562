//! Tunable configuration for retrieval, confidence, and contradiction
//! detection.
//!
//! Weights and thresholds are configuration, not logic: nothing in the
//! retrieval path hardcodes them. Defaults are starting points validated by
//! the test suite, not universal constants.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tolerance when checking that confidence weights sum to 1.
const WEIGHT_SUM_EPSILON: f32 = 1e-4;

/// Configuration for hybrid retrieval and fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight for normalized lexical scores.
    pub alpha: f32,
    /// Weight for normalized dense scores.
    pub beta: f32,
    /// Weight for normalized table scores.
    pub gamma: f32,
    /// Sufficiency gate: minimum fused score of the top evidence item.
    pub min_fused_score: f32,
    /// Dense candidates below this cosine similarity are discarded.
    pub min_dense_similarity: f32,
    /// Candidate cap for the lexical retriever.
    pub k_lex: usize,
    /// Candidate cap for the dense retriever.
    pub k_dense: usize,
    /// Candidate cap for the table retriever.
    pub k_table: usize,
    /// Evidence list cap after fusion and reranking.
    pub k_final: usize,
    /// Reranking reorders only this many top fused items.
    pub rerank_top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            beta: 0.4,
            gamma: 0.2,
            min_fused_score: 0.25,
            min_dense_similarity: 0.3,
            k_lex: 20,
            k_dense: 20,
            k_table: 10,
            k_final: 8,
            rerank_top_n: 10,
        }
    }
}

impl RetrievalConfig {
    /// Create a config with custom fusion weights.
    pub fn with_weights(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            ..Default::default()
        }
    }

    /// Set the sufficiency threshold.
    pub fn with_min_fused_score(mut self, threshold: f32) -> Self {
        self.min_fused_score = threshold;
        self
    }

    /// Set the dense similarity floor.
    pub fn with_min_dense_similarity(mut self, threshold: f32) -> Self {
        self.min_dense_similarity = threshold;
        self
    }

    /// Set the final evidence cap.
    pub fn with_k_final(mut self, k_final: usize) -> Self {
        self.k_final = k_final;
        self
    }

    /// Validate weights, caps, and threshold.
    pub fn validate(&self) -> Result<()> {
        if self.alpha < 0.0 || self.beta < 0.0 || self.gamma < 0.0 {
            return Err(Error::Config(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if self.alpha + self.beta + self.gamma <= 0.0 {
            return Err(Error::Config(
                "at least one fusion weight must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_fused_score) {
            return Err(Error::Config(format!(
                "min_fused_score must be in [0, 1], got {}",
                self.min_fused_score
            )));
        }
        if !(0.0..=1.0).contains(&self.min_dense_similarity) {
            return Err(Error::Config(format!(
                "min_dense_similarity must be in [0, 1], got {}",
                self.min_dense_similarity
            )));
        }
        if self.k_lex == 0 || self.k_dense == 0 || self.k_table == 0 || self.k_final == 0 {
            return Err(Error::Config(
                "candidate caps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the confidence scorer ensemble.
///
/// The four signal weights must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Weight for the fused score of the weakest cited item.
    pub retrieval_weight: f32,
    /// Weight for citation density (citations per sentence).
    pub density_weight: f32,
    /// Weight for the text coherence signal.
    pub coherence_weight: f32,
    /// Weight for the contradiction presence signal.
    pub contradiction_weight: f32,
    /// Any contradiction caps confidence at this ceiling.
    pub contradiction_ceiling: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            retrieval_weight: 0.35,
            density_weight: 0.25,
            coherence_weight: 0.2,
            contradiction_weight: 0.2,
            contradiction_ceiling: 0.5,
        }
    }
}

impl ConfidenceConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.retrieval_weight,
            self.density_weight,
            self.coherence_weight,
            self.contradiction_weight,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(Error::Config(
                "confidence weights must be non-negative".to_string(),
            ));
        }
        let sum: f32 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(Error::Config(format!(
                "confidence weights must sum to 1, got {}",
                sum
            )));
        }
        if !(0.0..=1.0).contains(&self.contradiction_ceiling) {
            return Err(Error::Config(format!(
                "contradiction_ceiling must be in [0, 1], got {}",
                self.contradiction_ceiling
            )));
        }
        Ok(())
    }
}

/// Configuration for numeric contradiction detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionConfig {
    /// Two numeric claims for the same metric are compatible when their
    /// relative difference is within this tolerance.
    pub relative_tolerance: f64,
}

impl Default for ContradictionConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 0.05,
        }
    }
}

impl ContradictionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.relative_tolerance < 0.0 {
            return Err(Error::Config(
                "relative_tolerance must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub confidence: ConfidenceConfig,
    pub contradiction: ContradictionConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        self.confidence.validate()?;
        self.contradiction.validate()?;
        Ok(())
    }
}
