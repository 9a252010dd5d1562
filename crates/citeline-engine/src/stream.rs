//! Streaming answer protocol.
//!
//! [`AnswerStream`] is the caller-facing side of one ask() call: a lazy,
//! finite, non-restartable sequence of [`AnswerFragment`]s followed by a
//! terminal [`AskOutcome`]. The paired [`CancelHandle`] requests
//! cancellation; the engine honors it at the next fragment boundary.

use tokio::sync::{mpsc, oneshot, watch};

use citeline_core::{AnswerFragment, AskOutcome, Error, Result};

/// Buffer size for the fragment channel. Kept minimal so a slow consumer
/// suspends generation instead of buffering ahead, and so cancellation
/// takes effect within a fragment or two of the request.
pub(crate) const FRAGMENT_BUFFER: usize = 1;

/// Caller-facing stream of answer fragments ending in a terminal outcome.
#[derive(Debug)]
pub struct AnswerStream {
    fragments: mpsc::Receiver<AnswerFragment>,
    outcome: oneshot::Receiver<AskOutcome>,
}

impl AnswerStream {
    /// Receive the next fragment, or `None` once generation has finished
    /// (successfully or not). Fragments arrive in generation order; any
    /// citations on a fragment refer only to claims in that fragment's
    /// text, never to future fragments.
    pub async fn next_fragment(&mut self) -> Option<AnswerFragment> {
        self.fragments.recv().await
    }

    /// Consume the stream and wait for the terminal outcome. Drains any
    /// unread fragments first.
    pub async fn finish(mut self) -> Result<AskOutcome> {
        while self.fragments.recv().await.is_some() {}
        self.outcome
            .await
            .map_err(|_| Error::Internal("session task dropped without outcome".to_string()))
    }
}

/// Requests cancellation of an in-flight ask() call.
///
/// Cancellation is a first-class request, not an exception: the session
/// finishes with status `cancelled` at the next fragment boundary.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Internal wiring for one session. The engine keeps the senders, the
/// caller gets the stream and cancel handle.
pub(crate) struct SessionChannels {
    pub fragments_tx: mpsc::Sender<AnswerFragment>,
    pub outcome_tx: oneshot::Sender<AskOutcome>,
    pub cancel_rx: watch::Receiver<bool>,
}

pub(crate) fn session_channels() -> (SessionChannels, AnswerStream, CancelHandle) {
    let (fragments_tx, fragments_rx) = mpsc::channel(FRAGMENT_BUFFER);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    (
        SessionChannels {
            fragments_tx,
            outcome_tx,
            cancel_rx,
        },
        AnswerStream {
            fragments: fragments_rx,
            outcome: outcome_rx,
        },
        CancelHandle { tx: cancel_tx },
    )
}
