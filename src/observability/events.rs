//! Structured event stream
//!
//! Discrete, typed events emitted as the engine processes messages.
//! Events are serialized as newline-delimited JSON (JSONL) and include a
//! monotonically increasing sequence number for ordering guarantees.
//! Emission is best-effort: serialization or I/O failures are silently
//! dropped because observability must never fail the critical path.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event in the behavior engine's audit trail.
///
/// Each variant is tagged with `"type"` when serialized so moderation
/// tooling can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A trigger was detected in an inbound message.
    TriggerDetected {
        /// When the trigger was detected.
        timestamp: DateTime<Utc>,
        /// Agent whose behavior the trigger feeds.
        agent_id: String,
        /// Behavior type name.
        behavior: String,
        /// Trigger type name.
        trigger: String,
        /// Severity weight applied.
        weight: f64,
        /// Message the trigger was found in.
        message_id: String,
    },

    /// A behavior escalated one phase.
    PhaseAdvanced {
        /// When the transition occurred.
        timestamp: DateTime<Utc>,
        /// Agent whose behavior moved.
        agent_id: String,
        /// Behavior type name.
        behavior: String,
        /// Phase before the move.
        from_phase: u8,
        /// Phase after the move.
        to_phase: u8,
        /// Intensity after the recompute.
        intensity: f64,
        /// Why the threshold fired.
        reason: String,
    },

    /// A behavior de-escalated one phase.
    PhaseRetreated {
        /// When the transition occurred.
        timestamp: DateTime<Utc>,
        /// Agent whose behavior moved.
        agent_id: String,
        /// Behavior type name.
        behavior: String,
        /// Phase before the move.
        from_phase: u8,
        /// Phase after the move.
        to_phase: u8,
        /// Intensity after the recompute.
        intensity: f64,
        /// Why the threshold fired.
        reason: String,
    },

    /// The safety gate clamped a behavior below its current phase.
    SafetyBlocked {
        /// When the assessment ran.
        timestamp: DateTime<Utc>,
        /// Agent being assessed.
        agent_id: String,
        /// Behavior type that was clamped.
        behavior: String,
        /// Actual phase of the behavior.
        phase: u8,
        /// Maximum phase allowed into output.
        effective_phase_cap: u8,
    },

    /// A behavior profile was created or re-enabled for an agent.
    ProfileEnabled {
        /// When the profile changed.
        timestamp: DateTime<Utc>,
        /// Agent owning the profile.
        agent_id: String,
        /// Behavior type name.
        behavior: String,
    },

    /// A behavior profile was frozen.
    ProfileDisabled {
        /// When the profile changed.
        timestamp: DateTime<Utc>,
        /// Agent owning the profile.
        agent_id: String,
        /// Behavior type name.
        behavior: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug — provide a manual impl.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    ///
    /// The default for embedded operation — stderr does not collide with
    /// whatever the host writes on stdout.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn sink() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter appending to a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened for appending.
    pub fn file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits one event as a JSON line.
    ///
    /// Failures are dropped silently; the sequence number is consumed
    /// either way so gaps reveal lost events to downstream consumers.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope { sequence, event };

        let Ok(line) = serde_json::to_string(&envelope) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}
