//! Lifetime interaction counters and the stability multiplier
//!
//! One ledger per engine tracks total/positive/negative interaction counts
//! per agent and derives the stability multiplier fed into escalation gain:
//! an agent whose history skews towards friction escalates conflict
//! triggers harder, one bathed in warmth escalates them more gently.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::Sentiment;

/// Aggregated progression record for one agent: lifetime counters plus a
/// snapshot of current behavior intensities. Assembled on demand; the
/// counters themselves live in the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionState {
    /// Agent the record describes
    pub agent_id: String,
    /// Messages processed for this agent
    pub total_interactions: u64,
    /// Messages classified positive
    pub positive_interactions: u64,
    /// Messages classified negative
    pub negative_interactions: u64,
    /// Derived stability multiplier in [0.5, 2.0]
    pub stability_multiplier: f64,
    /// Current intensity per behavior type
    pub current_intensities: IndexMap<String, f64>,
    /// Most recent recompute across the agent's profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_calculated_at: Option<DateTime<Utc>>,
}

/// Counter kinds tracked per agent.
const TOTAL: &str = "total";
const POSITIVE: &str = "positive";
const NEGATIVE: &str = "negative";

/// Lower bound of the stability multiplier.
pub const STABILITY_FLOOR: f64 = 0.5;
/// Upper bound of the stability multiplier.
pub const STABILITY_CEILING: f64 = 2.0;

/// Monotonic interaction counters, thread-safe via `DashMap` + `AtomicU64`.
///
/// Key format is `"{agent}:{kind}"`. Counters saturate at `u64::MAX`.
pub struct InteractionLedger {
    counters: DashMap<String, AtomicU64>,
}

impl InteractionLedger {
    /// Creates a new, empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Records one processed message for an agent, bumping the total plus
    /// the positive or negative counter for non-neutral sentiment.
    pub fn record(&self, agent_id: &str, sentiment: Sentiment) {
        let _ = self.increment(&Self::make_key(agent_id, TOTAL));
        match sentiment {
            Sentiment::Positive => {
                let _ = self.increment(&Self::make_key(agent_id, POSITIVE));
            }
            Sentiment::Negative => {
                let _ = self.increment(&Self::make_key(agent_id, NEGATIVE));
            }
            Sentiment::Neutral => {}
        }
    }

    /// Returns the (total, positive, negative) counts for an agent.
    #[must_use]
    pub fn counts(&self, agent_id: &str) -> (u64, u64, u64) {
        (
            self.get(&Self::make_key(agent_id, TOTAL)),
            self.get(&Self::make_key(agent_id, POSITIVE)),
            self.get(&Self::make_key(agent_id, NEGATIVE)),
        )
    }

    /// Stability multiplier in [0.5, 2.0].
    ///
    /// `balance = (negative - positive) / max(negative + positive, 1)` lies
    /// in [-1, 1]; `2^balance` maps it symmetrically onto the bounds, with
    /// a balanced or empty history landing exactly on 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stability_multiplier(&self, agent_id: &str) -> f64 {
        let (_, positive, negative) = self.counts(agent_id);
        let classified = positive.saturating_add(negative).max(1) as f64;
        let balance = (negative as f64 - positive as f64) / classified;
        2.0_f64
            .powf(balance)
            .clamp(STABILITY_FLOOR, STABILITY_CEILING)
    }

    /// Increments the counter for the given key and returns the new count.
    ///
    /// Counter saturates at `u64::MAX`.
    fn increment(&self, key: &str) -> u64 {
        let entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicU64::new(0));
        let prev = entry.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_add(1))
        });
        drop(entry);
        // fetch_update with a Some-returning closure always succeeds
        prev.unwrap_or(0).saturating_add(1)
    }

    /// Returns the current count for the given key (0 if never bumped).
    fn get(&self, key: &str) -> u64 {
        self.counters
            .get(key)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Builds a counter key from agent id and counter kind.
    fn make_key(agent_id: &str, kind: &str) -> String {
        format!("{agent_id}:{kind}")
    }
}

impl Default for InteractionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InteractionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionLedger")
            .field("counters", &self.counters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_bumps_total_and_sentiment() {
        let ledger = InteractionLedger::new();
        ledger.record("a", Sentiment::Positive);
        ledger.record("a", Sentiment::Negative);
        ledger.record("a", Sentiment::Neutral);
        assert_eq!(ledger.counts("a"), (3, 1, 1));
    }

    #[test]
    fn test_independent_agents() {
        let ledger = InteractionLedger::new();
        ledger.record("a", Sentiment::Neutral);
        ledger.record("a", Sentiment::Neutral);
        ledger.record("b", Sentiment::Positive);
        assert_eq!(ledger.counts("a"), (2, 0, 0));
        assert_eq!(ledger.counts("b"), (1, 1, 0));
    }

    #[test]
    fn test_balanced_history_is_unit() {
        let ledger = InteractionLedger::new();
        assert!((ledger.stability_multiplier("fresh") - 1.0).abs() < 1e-12);

        ledger.record("a", Sentiment::Positive);
        ledger.record("a", Sentiment::Negative);
        assert!((ledger.stability_multiplier("a") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_friction_hits_ceiling() {
        let ledger = InteractionLedger::new();
        for _ in 0..10 {
            ledger.record("a", Sentiment::Negative);
        }
        assert!((ledger.stability_multiplier("a") - STABILITY_CEILING).abs() < 1e-12);
    }

    #[test]
    fn test_all_warmth_hits_floor() {
        let ledger = InteractionLedger::new();
        for _ in 0..10 {
            ledger.record("a", Sentiment::Positive);
        }
        assert!((ledger.stability_multiplier("a") - STABILITY_FLOOR).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_history_between_bounds() {
        let ledger = InteractionLedger::new();
        for _ in 0..3 {
            ledger.record("a", Sentiment::Negative);
        }
        ledger.record("a", Sentiment::Positive);
        let m = ledger.stability_multiplier("a");
        assert!(m > 1.0 && m < STABILITY_CEILING, "multiplier = {m}");
    }

    #[test]
    fn test_counter_saturation() {
        let ledger = InteractionLedger::new();
        ledger
            .counters
            .insert("a:total".to_string(), AtomicU64::new(u64::MAX - 1));
        assert_eq!(ledger.increment("a:total"), u64::MAX);
        assert_eq!(ledger.increment("a:total"), u64::MAX);
    }

    #[test]
    fn test_concurrent_record() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(InteractionLedger::new());
        let threads: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.record("shared", Sentiment::Negative);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(ledger.counts("shared"), (1000, 0, 1000));
    }
}
