//! Metrics registration
//!
//! The engine records counters and histograms through the `metrics` facade;
//! the host product owns the recorder and exporter. Behavior and trigger
//! names come from configuration, so cardinality is bounded by the loaded
//! definitions — free-text labels are never recorded.

use metrics::{describe_counter, describe_histogram};

/// Registers metric descriptions with whatever recorder the host installed.
///
/// Safe to call more than once; descriptions are idempotent.
pub fn describe_metrics() {
    describe_counter!(
        "limerence_triggers_total",
        "Trigger events detected, labeled by trigger type"
    );
    describe_counter!(
        "limerence_trigger_cooldowns_total",
        "Trigger events suppressed by the per-agent cooldown window"
    );
    describe_counter!(
        "limerence_phase_transitions_total",
        "Phase transitions, labeled by direction (advance/retreat)"
    );
    describe_counter!(
        "limerence_safety_blocks_total",
        "Assessments that clamped a behavior below its current phase"
    );
    describe_counter!(
        "limerence_update_conflicts_total",
        "Profile updates skipped after exhausting write-conflict retries"
    );
    describe_counter!(
        "limerence_audit_dropped_total",
        "Audit events dropped under channel back-pressure"
    );
    describe_histogram!(
        "limerence_recompute_duration_us",
        "Profile recompute duration in microseconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_metrics_is_idempotent() {
        describe_metrics();
        describe_metrics();
    }
}
