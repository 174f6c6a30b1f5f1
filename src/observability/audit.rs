//! Fire-and-forget audit log
//!
//! Trigger and transition events are copied to moderation review off the
//! critical path. Recording never blocks and never fails the caller: the
//! channel is bounded, and events beyond its capacity are dropped and
//! counted rather than applying back-pressure to message processing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::observability::events::{Event, EventEmitter};

/// Handle for best-effort audit recording.
///
/// Cloneable; all clones feed the same drain task. Dropping every clone
/// closes the channel and lets the drain task finish flushing.
#[derive(Clone, Debug)]
pub struct AuditLog {
    tx: mpsc::Sender<Event>,
}

impl AuditLog {
    /// Spawns the drain task and returns the log handle plus the task's
    /// join handle for shutdown.
    #[must_use]
    pub fn spawn(emitter: EventEmitter, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Event>(capacity.max(1));
        let emitter = Arc::new(emitter);
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                emitter.emit(event);
            }
        });
        (Self { tx }, handle)
    }

    /// An audit log that discards everything. For tests and hosts that do
    /// their own event capture.
    #[must_use]
    pub fn disabled() -> Self {
        // Receiver is dropped immediately; try_send fails closed and
        // record() treats that as a drop.
        let (tx, _) = mpsc::channel::<Event>(1);
        Self { tx }
    }

    /// Records an event, dropping it under back-pressure.
    pub fn record(&self, event: Event) {
        if let Err(err) = self.tx.try_send(event) {
            debug!(reason = %err, "audit event dropped");
            metrics::counter!("limerence_audit_dropped_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn sample(agent: &str) -> Event {
        Event::ProfileEnabled {
            timestamp: Utc::now(),
            agent_id: agent.to_string(),
            behavior: "x".to_string(),
        }
    }

    #[tokio::test]
    async fn records_drain_through_emitter() {
        let (log, handle) = AuditLog::spawn(EventEmitter::sink(), 16);
        for i in 0..5 {
            log.record(sample(&format!("a{i}")));
        }
        drop(log);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("drain task should finish after all handles drop")
            .unwrap();
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        // Capacity 1 with a stalled drain: the second record must return
        // immediately instead of waiting for channel space.
        let (tx, rx) = mpsc::channel::<Event>(1);
        let log = AuditLog { tx };
        log.record(sample("a"));
        let start = std::time::Instant::now();
        log.record(sample("b"));
        assert!(start.elapsed() < Duration::from_millis(50));
        drop(rx);
    }

    #[tokio::test]
    async fn disabled_log_accepts_records() {
        let log = AuditLog::disabled();
        log.record(sample("a"));
        log.record(sample("b"));
    }
}
