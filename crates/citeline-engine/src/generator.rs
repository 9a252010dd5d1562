//! Citation-gated answer generation.
//!
//! The generator constrains the prompt to the allow-listed evidence,
//! consumes the backend's fragment stream, and confirms citations as it
//! goes: a citation is confirmed only when a fragment carries a marker
//! that resolves to an allow-listed evidence item. Markers that do not
//! resolve are stripped and never emitted — the caller cannot observe a
//! claim anchored outside the allow-list.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use citeline_core::{
    AnswerFragment, Citation, EvidenceItem, GenerationBackend, Result,
};

/// Evidence marker in generated text: `[E1]`, `[E2]`, ...
fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[E(\d+)\]").expect("static regex"))
}

/// Outcome of one generation run, before the planner finalizes it.
pub(crate) struct GenerationResult {
    pub text: String,
    pub citations: Vec<Citation>,
    pub fragment_count: usize,
    pub cancelled: bool,
}

/// Streaming answer generator over a generation backend.
pub struct AnswerGenerator {
    backend: Arc<dyn GenerationBackend>,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Build the system context for citation-gated generation.
    fn system_context() -> &'static str {
        "You answer questions about scientific documents. Use only the \
         numbered evidence blocks provided in the prompt; never invent \
         facts beyond them. Anchor every claim to its evidence with a \
         marker like [E1]. If the evidence does not answer the question, \
         say so plainly."
    }

    /// Build the prompt from the allow-listed evidence only.
    fn build_prompt(question: &str, evidence: &[EvidenceItem]) -> String {
        let mut prompt = String::from("Evidence:\n");
        for (i, item) in evidence.iter().enumerate() {
            prompt.push_str(&format!(
                "[E{}] ({}, document {}): {}\n",
                i + 1,
                item.section,
                item.document_id,
                item.snippet
            ));
            if !item.matched_columns.is_empty() {
                prompt.push_str(&format!(
                    "      matched table columns: {}\n",
                    item.matched_columns.join(", ")
                ));
            }
        }
        prompt.push_str(&format!("\nQuestion: {}\n", question));
        prompt
    }

    /// Run generation against the allow-list, forwarding confirmed
    /// fragments to `fragments_tx` and honoring cancellation at fragment
    /// boundaries.
    ///
    /// Returns `Err` on irrecoverable mid-stream failure; the caller
    /// discards all partial output.
    pub(crate) async fn run(
        &self,
        question: &str,
        allowlist: &[EvidenceItem],
        fragments_tx: &mpsc::Sender<AnswerFragment>,
        cancel_rx: &watch::Receiver<bool>,
    ) -> Result<GenerationResult> {
        let prompt = Self::build_prompt(question, allowlist);
        let mut rx = self
            .backend
            .generate_stream(Self::system_context(), &prompt)
            .await?;

        let mut text = String::new();
        let mut citations: Vec<Citation> = Vec::new();
        let mut cited_ids: HashSet<Uuid> = HashSet::new();
        let mut fragment_count = 0usize;

        while let Some(raw) = rx.recv().await {
            let raw = raw?;

            // Cancellation is honored at fragment boundaries: the pending
            // fragment is dropped, nothing after it is consumed.
            if *cancel_rx.borrow() {
                debug!(fragment_count, "generation cancelled at fragment boundary");
                return Ok(GenerationResult {
                    text,
                    citations,
                    fragment_count,
                    cancelled: true,
                });
            }

            let (clean, confirmed) = resolve_fragment(&raw, allowlist, &mut cited_ids);
            if clean.trim().is_empty() {
                continue;
            }

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&clean);
            citations.extend(confirmed.iter().cloned());
            fragment_count += 1;

            let fragment = AnswerFragment {
                text: clean,
                citations: confirmed,
            };
            if fragments_tx.send(fragment).await.is_err() {
                // Consumer dropped the stream: same as cancellation.
                debug!(fragment_count, "fragment consumer dropped, stopping generation");
                return Ok(GenerationResult {
                    text,
                    citations,
                    fragment_count,
                    cancelled: true,
                });
            }
        }

        debug!(
            fragment_count,
            citation_count = citations.len(),
            "generation stream complete"
        );
        Ok(GenerationResult {
            text,
            citations,
            fragment_count,
            cancelled: false,
        })
    }
}

/// Resolve citation markers in one raw fragment against the allow-list.
///
/// Returns the cleaned fragment text (unresolvable markers stripped) and
/// the citations newly confirmed by this fragment. A marker only confirms
/// a citation the first time its evidence item appears in the answer.
fn resolve_fragment(
    raw: &str,
    allowlist: &[EvidenceItem],
    cited_ids: &mut HashSet<Uuid>,
) -> (String, Vec<Citation>) {
    let mut confirmed = Vec::new();

    for caps in marker_re().captures_iter(raw) {
        let index: usize = match caps[1].parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => continue,
        };
        match allowlist.get(index) {
            Some(item) => {
                if cited_ids.insert(item.chunk_id) {
                    confirmed.push(Citation::from_evidence(item));
                }
            }
            None => {
                warn!(marker = %&caps[0], "stripping citation marker outside allow-list");
            }
        }
    }

    let clean = marker_re()
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let valid = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(|i| i < allowlist.len())
                .unwrap_or(false);
            if valid {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned();

    (clean, confirmed)
}
