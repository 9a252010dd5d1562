//! The ask engine: session state machine, sufficiency gate, and terminal
//! bookkeeping.
//!
//! One `AskEngine` handle serves many concurrent sessions. Each `ask()`
//! call spawns an independent task; the only shared mutable state between
//! sessions is the result cache. All retriever and generation failures are
//! caught here and translated into a terminal session status — callers
//! never see a raw internal error after validation passes.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use citeline_core::{
    Answer, AnswerFragment, AskOutcome, AuditBus, AuditEvent, EmbeddingBackend, EngineConfig,
    Error, EvidenceItem, EvidenceStore, GenerationBackend, QueryFilters, QuestionSession,
    ReasoningTrace, Result, SessionStatus,
};
use citeline_retrieval::{HybridRetriever, ResultCache};

use crate::confidence::score_confidence;
use crate::contradiction::detect_contradictions;
use crate::generator::AnswerGenerator;
use crate::stream::{session_channels, AnswerStream, CancelHandle, SessionChannels};

/// Fixed answer text for the insufficient-evidence terminal state.
pub const INSUFFICIENT_EVIDENCE_TEXT: &str =
    "The available sources do not contain enough evidence to answer this \
     question. Add sources covering this topic and ask again.";

/// Handle returned by `ask()`: the caller consumes the stream and may
/// cancel at any fragment boundary.
#[derive(Debug)]
pub struct AskResponse {
    pub session_id: Uuid,
    pub stream: AnswerStream,
    pub cancel: CancelHandle,
}

/// Citation-gated question answering engine. Cheap to clone; clones share
/// the store, cache, and audit bus.
#[derive(Clone)]
pub struct AskEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    embedding: Arc<dyn EmbeddingBackend>,
    retriever: HybridRetriever,
    generator: AnswerGenerator,
    cache: ResultCache,
    audit: AuditBus,
    config: EngineConfig,
}

impl AskEngine {
    /// Build an engine over a store and inference backends. Fails fast on
    /// invalid configuration.
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        embedding: Arc<dyn EmbeddingBackend>,
        generation: Arc<dyn GenerationBackend>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(EngineInner {
                retriever: HybridRetriever::new(store),
                generator: AnswerGenerator::new(generation),
                embedding,
                cache: ResultCache::new(),
                audit: AuditBus::default(),
                config,
            }),
        })
    }

    /// Audit bus for this engine; subscribe before asking to observe
    /// session finalization events.
    pub fn audit(&self) -> &AuditBus {
        &self.inner.audit
    }

    /// Number of live result-cache entries.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Invalidate cached results touching a document. Call on every
    /// (re-)ingestion affecting it.
    pub fn invalidate_document(&self, document_id: Uuid) {
        self.inner.cache.invalidate_document(document_id);
    }

    /// Ask a question against the corpus.
    ///
    /// Validation failures are returned synchronously; everything after
    /// that surfaces through the stream's terminal `AskOutcome`.
    pub fn ask(&self, question: &str, filters: QueryFilters) -> Result<AskResponse> {
        validate_question(question)?;

        let session = QuestionSession::new(question.trim(), filters);
        let session_id = session.id;
        let (channels, stream, cancel) = session_channels();

        let inner = self.inner.clone();
        let span = info_span!("ask_session", session_id = %session_id);
        tokio::spawn(
            async move {
                run_session(inner, session, channels).await;
            }
            .instrument(span),
        );

        Ok(AskResponse {
            session_id,
            stream,
            cancel,
        })
    }
}

/// Reject malformed questions before any retrieval work.
fn validate_question(question: &str) -> Result<()> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("question is empty".to_string()));
    }
    if !trimmed.chars().any(|c| c.is_alphanumeric()) {
        return Err(Error::InvalidInput(
            "question contains no words".to_string(),
        ));
    }
    Ok(())
}

async fn run_session(inner: Arc<EngineInner>, mut session: QuestionSession, channels: SessionChannels) {
    let start = Instant::now();
    session.status = SessionStatus::Retrieving;

    let evidence = gather_evidence(&inner, &session).await;
    let considered: Vec<Uuid> = evidence.iter().map(|e| e.chunk_id).collect();

    // Hard sufficiency gate: generation is never invoked on evidence that
    // failed it.
    let sufficient = evidence
        .first()
        .map(|top| top.fused_score > inner.config.retrieval.min_fused_score)
        .unwrap_or(false);

    if !sufficient {
        let answer = Answer {
            text: INSUFFICIENT_EVIDENCE_TEXT.to_string(),
            citations: Vec::new(),
            confidence: 0.0,
            reasoning: ReasoningTrace {
                considered,
                ..Default::default()
            },
            created_at: Utc::now(),
        };
        let _ = channels
            .fragments_tx
            .send(AnswerFragment {
                text: answer.text.clone(),
                citations: Vec::new(),
            })
            .await;
        finalize(
            &inner,
            &session,
            SessionStatus::InsufficientEvidence,
            Some(answer),
            channels.outcome_tx,
            start,
        );
        return;
    }

    if *channels.cancel_rx.borrow() {
        finalize(
            &inner,
            &session,
            SessionStatus::Cancelled,
            None,
            channels.outcome_tx,
            start,
        );
        return;
    }

    session.status = SessionStatus::Generating;
    let generation = inner
        .generator
        .run(
            &session.question,
            &evidence,
            &channels.fragments_tx,
            &channels.cancel_rx,
        )
        .await;

    let (status, answer) = match generation {
        Err(e) => {
            // Partial output is discarded; nothing from a failed
            // generation is persisted.
            warn!(error = %e, "generation failed mid-stream");
            (SessionStatus::Failed, None)
        }
        Ok(result) if result.cancelled => (SessionStatus::Cancelled, None),
        Ok(result) if result.citations.is_empty() => {
            // A completed answer must carry at least one confirmed
            // citation; an uncited answer is unusable and fails.
            warn!(
                fragment_count = result.fragment_count,
                "generation produced no confirmed citations"
            );
            (SessionStatus::Failed, None)
        }
        Ok(result) => {
            let contradictions =
                detect_contradictions(&inner.config.contradiction, &result.citations);
            let confidence = score_confidence(
                &inner.config.confidence,
                &result.text,
                &result.citations,
                &contradictions,
            );
            let cited = result.citations.iter().map(|c| c.chunk_id).collect();
            let answer = Answer {
                text: result.text,
                citations: result.citations,
                confidence,
                reasoning: ReasoningTrace {
                    considered,
                    cited,
                    contradictions,
                },
                created_at: Utc::now(),
            };
            (SessionStatus::Completed, Some(answer))
        }
    };

    finalize(&inner, &session, status, answer, channels.outcome_tx, start);
}

/// Resolve evidence from the cache or by running hybrid retrieval.
async fn gather_evidence(inner: &EngineInner, session: &QuestionSession) -> Vec<EvidenceItem> {
    if let Some(entry) = inner.cache.get(&session.question, &session.filters) {
        info!(
            cache_hit = true,
            result_count = entry.evidence.len(),
            "evidence served from cache"
        );
        return entry.evidence.clone();
    }

    // An embedding failure degrades the dense arm; lexical and table
    // retrieval still run.
    let query_embedding = match inner.embedding.embed_query(&session.question).await {
        Ok(vector) => Some(vector),
        Err(e) => {
            warn!(error = %e, "query embedding failed, dense retrieval disabled");
            None
        }
    };

    let evidence = inner
        .retriever
        .retrieve(
            &session.question,
            query_embedding.as_deref(),
            &session.filters,
            &inner.config.retrieval,
        )
        .await;

    inner
        .cache
        .insert(&session.question, &session.filters, evidence.clone());
    evidence
}

/// Record the terminal state: log, audit, deliver the outcome.
fn finalize(
    inner: &EngineInner,
    session: &QuestionSession,
    status: SessionStatus,
    answer: Option<Answer>,
    outcome_tx: tokio::sync::oneshot::Sender<AskOutcome>,
    start: Instant,
) {
    debug_assert!(status.is_terminal());

    let (confidence, citation_count, considered, cited, contradiction_count) = match &answer {
        Some(a) => (
            a.confidence,
            a.citations.len(),
            a.reasoning.considered.clone(),
            a.reasoning.cited.clone(),
            a.reasoning.contradictions.len(),
        ),
        None => (0.0, 0, Vec::new(), Vec::new(), 0),
    };

    info!(
        status = %status,
        confidence,
        citation_count,
        duration_ms = start.elapsed().as_millis() as u64,
        "session finalized"
    );

    inner.audit.emit(AuditEvent::SessionFinalized {
        session_id: session.id,
        question: session.question.clone(),
        status,
        considered,
        cited,
        confidence,
        contradiction_count,
    });

    // The caller may have dropped the stream; the session still finalizes.
    let _ = outcome_tx.send(AskOutcome {
        session_id: session.id,
        status,
        answer,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_question_rejected() {
        assert!(matches!(
            validate_question("   "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn punctuation_only_question_rejected() {
        assert!(matches!(
            validate_question("??!"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn ordinary_question_accepted() {
        assert!(validate_question("What is the optimal temperature?").is_ok());
    }
}
