//! Observability: audit events, logging, metrics
//!
//! Everything here is off the critical path. Audit recording is
//! fire-and-forget, log emission is the host's `tracing` subscriber, and
//! metrics go through the `metrics` facade into whatever recorder the host
//! installed.

pub mod audit;
pub mod events;
pub mod logging;
pub mod metrics;

pub use audit::AuditLog;
pub use events::{Event, EventEmitter};
pub use logging::{ColorChoice, LogFormat, init_logging};
pub use metrics::describe_metrics;
