//! Audit trail of proxied calls.
//!
//! The facade hands one [`AuditEvent`] per proxied call to an [`AuditSink`]
//! and moves on; sinks must not block. The default sink queues events on an
//! unbounded channel drained by [`AuditLogger`], which writes them as
//! structured records under the `audit` log target. Persisting them anywhere
//! else is the job of whatever consumes that log stream.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::forward::ErrorKind;

/// How a proxied call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The upstream answered and the answer was relayed.
    Relayed,
    /// The circuit was open; the upstream was not contacted.
    Rejected,
    /// Every attempt failed, or the gateway failed internally.
    Failed,
}

/// One proxied call.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// RFC 3339 timestamp of completion.
    pub timestamp: String,
    pub correlation_id: String,
    pub service: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Status returned to the client.
    pub status: u16,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub duration_ms: u64,
}

impl AuditEvent {
    /// Stamp an event with the current time.
    pub fn now(
        correlation_id: &str,
        service: &str,
        method: &str,
        path: &str,
        user_id: Option<&str>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            correlation_id: correlation_id.to_string(),
            service: service.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            user_id: user_id.map(str::to_string),
            status: 0,
            outcome: AuditOutcome::Relayed,
            error_kind: None,
            duration_ms: 0,
        }
    }
}

/// Receiver of audit events. Must return without waiting.
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    fn notify(&self, event: AuditEvent);
}

/// Sink that queues events for a background [`AuditLogger`].
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn notify(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Audit logger stopped, event dropped");
        }
    }
}

/// Drains audit events into the `audit` log target.
pub struct AuditLogger {
    rx: mpsc::UnboundedReceiver<AuditEvent>,
}

impl AuditLogger {
    pub fn new(rx: mpsc::UnboundedReceiver<AuditEvent>) -> Self {
        Self { rx }
    }

    /// Run until every sink has been dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            tracing::info!(
                target: "audit",
                correlation_id = %event.correlation_id,
                service = %event.service,
                method = %event.method,
                path = %event.path,
                user_id = event.user_id.as_deref().unwrap_or("-"),
                status = event.status,
                outcome = ?event.outcome,
                error_kind = ?event.error_kind,
                duration_ms = event.duration_ms,
                "Proxied call"
            );
        }
        tracing::debug!("Audit logger finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_delivers_events() {
        let (sink, mut rx) = ChannelAuditSink::new();
        let mut event =
            AuditEvent::now("c-1", "ledger-service", "POST", "/api/v1/ledger", Some("9"));
        event.status = 201;
        sink.notify(event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.correlation_id, "c-1");
        assert_eq!(received.status, 201);
        assert_eq!(received.user_id.as_deref(), Some("9"));
    }

    #[test]
    fn notify_after_logger_stops_does_not_panic() {
        let (sink, rx) = ChannelAuditSink::new();
        drop(rx);
        sink.notify(AuditEvent::now("c-2", "s", "GET", "/", None));
    }

    #[test]
    fn events_serialize_without_empty_fields() {
        let event = AuditEvent::now("c-3", "s", "GET", "/api/v1/x", None);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("user_id").is_none());
        assert!(value.get("error_kind").is_none());
        assert_eq!(value["outcome"], "relayed");
    }
}
