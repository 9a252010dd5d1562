//! Audit event types and fire-and-forget audit bus.
//!
//! One event is emitted per finalized session, carrying the question, the
//! evidence considered and cited, the confidence, and the terminal status.
//! External audit infrastructure subscribes independently; with no
//! subscriber, events are silently dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::SessionStatus;

/// Audit event payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    /// A question session reached a terminal state.
    SessionFinalized {
        session_id: Uuid,
        question: String,
        status: SessionStatus,
        /// Evidence items offered to generation.
        considered: Vec<Uuid>,
        /// Evidence items actually cited.
        cited: Vec<Uuid>,
        confidence: f32,
        contradiction_count: usize,
    },
}

impl AuditEvent {
    /// Namespaced event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::SessionFinalized { .. } => "session.finalized",
        }
    }
}

/// Timestamped wrapper around an audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: AuditEvent,
}

impl AuditEnvelope {
    pub fn new(event: AuditEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast-based audit bus.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Slow
/// receivers that fall behind receive a `Lagged` error and miss events;
/// audit consumers that need completeness should drain promptly.
pub struct AuditBus {
    tx: broadcast::Sender<AuditEnvelope>,
}

impl AuditBus {
    /// Create a bus with the given buffer capacity.
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Fire-and-forget: dropped silently
    /// when no subscriber is attached.
    pub fn emit(&self, event: AuditEvent) {
        let envelope = AuditEnvelope::new(event);
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "audit emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to enveloped audit events. Each subscriber gets its own
    /// independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEnvelope> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuditBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized_event() -> AuditEvent {
        AuditEvent::SessionFinalized {
            session_id: Uuid::nil(),
            question: "what is the optimal temperature?".to_string(),
            status: SessionStatus::Completed,
            considered: vec![Uuid::new_v4()],
            cited: vec![Uuid::new_v4()],
            confidence: 0.8,
            contradiction_count: 0,
        }
    }

    #[tokio::test]
    async fn emit_and_receive() {
        let bus = AuditBus::new(32);
        let mut rx = bus.subscribe();

        bus.emit(finalized_event());

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "session.finalized");
        assert!(matches!(
            envelope.payload,
            AuditEvent::SessionFinalized {
                status: SessionStatus::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_silent() {
        let bus = AuditBus::new(32);
        // Must not panic or error with zero subscribers.
        bus.emit(finalized_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn independent_subscribers_each_receive() {
        let bus = AuditBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(finalized_event());

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
