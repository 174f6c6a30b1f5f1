//! Behavior profile state
//!
//! The single piece of mutable state per (agent, behavior) key. Profiles
//! are created once at enablement, mutated only by the recompute step, and
//! never deleted — disabling freezes further mutation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::TriggerEvent;

/// Key identifying one behavior finite-state machine.
///
/// Every (agent, behavior) pair is an independent machine; nothing couples
/// two behavior types of the same agent beyond the shared progression
/// counters.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProfileKey {
    /// Agent identifier
    pub agent_id: String,
    /// Behavior type name
    pub behavior: String,
}

impl ProfileKey {
    /// Creates a new profile key.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            behavior: behavior.into(),
        }
    }
}

impl std::fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.agent_id, self.behavior)
    }
}

/// One entry of the append-only phase history.
///
/// Entries are non-overlapping and time-ordered; at most one entry (the
/// latest) has no `exited_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Phase number (1-based)
    pub phase: u8,
    /// When the phase was entered
    pub entered_at: DateTime<Utc>,
    /// When the phase was left; `None` while the phase is current
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
    /// Highest intensity observed while in this phase
    pub peak_intensity: f64,
}

/// Mutable behavior state for one (agent, behavior) key.
///
/// Temperament parameters are per-profile: they are seeded from the
/// behavior definition at enablement and may diverge per agent in a
/// persistent store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Identity of this machine
    pub key: ProfileKey,
    /// Configured intensity floor/seed
    pub base_intensity: f64,
    /// Current intensity, always clamped to [0,1]
    pub current_intensity: f64,
    /// Current phase, 1-based
    pub current_phase: u8,
    /// Temperament: governs both decay half-life and escalation gain
    pub volatility: f64,
    /// Minimum intensity for this behavior to emit a directive
    pub display_threshold: f64,
    /// Whether triggers still mutate this profile
    pub enabled: bool,
    /// Recent trigger history, bounded window
    pub triggers: VecDeque<TriggerEvent>,
    /// When the current phase was entered
    pub phase_started_at: DateTime<Utc>,
    /// When intensity was last recomputed; decay is measured from here
    pub last_calculated_at: DateTime<Utc>,
    /// Append-only phase history
    pub phase_history: Vec<PhaseRecord>,
}

/// Temperament seed for a fresh profile, taken from the behavior
/// definition at enablement.
#[derive(Debug, Clone, Copy)]
pub struct ProfileSeed {
    /// Intensity floor/seed
    pub base_intensity: f64,
    /// Temperament parameter
    pub volatility: f64,
    /// Directive emission threshold
    pub display_threshold: f64,
}

impl From<&crate::config::compiled::CompiledBehavior> for ProfileSeed {
    fn from(behavior: &crate::config::compiled::CompiledBehavior) -> Self {
        Self {
            base_intensity: behavior.base_intensity,
            volatility: behavior.volatility,
            display_threshold: behavior.display_threshold,
        }
    }
}

impl BehaviorProfile {
    /// Creates a fresh profile at phase 1 with intensity at the configured
    /// base, opening the first history record.
    #[must_use]
    pub fn new(key: ProfileKey, seed: ProfileSeed, now: DateTime<Utc>) -> Self {
        Self {
            key,
            base_intensity: seed.base_intensity,
            current_intensity: seed.base_intensity,
            current_phase: 1,
            volatility: seed.volatility,
            display_threshold: seed.display_threshold,
            enabled: true,
            triggers: VecDeque::new(),
            phase_started_at: now,
            last_calculated_at: now,
            phase_history: vec![PhaseRecord {
                phase: 1,
                entered_at: now,
                exited_at: None,
                peak_intensity: seed.base_intensity,
            }],
        }
    }

    /// The open history record, if any.
    #[must_use]
    pub fn open_record(&self) -> Option<&PhaseRecord> {
        self.phase_history.iter().rev().find(|r| r.exited_at.is_none())
    }

    /// Closes the open history record and opens a new one for `phase`.
    pub fn roll_history(&mut self, phase: u8, now: DateTime<Utc>) {
        if let Some(open) = self
            .phase_history
            .iter_mut()
            .rev()
            .find(|r| r.exited_at.is_none())
        {
            open.exited_at = Some(now);
        }
        self.phase_history.push(PhaseRecord {
            phase,
            entered_at: now,
            exited_at: None,
            peak_intensity: self.current_intensity,
        });
        self.phase_started_at = now;
    }

    /// Updates the open record's peak after an intensity change.
    pub fn track_peak(&mut self) {
        let intensity = self.current_intensity;
        if let Some(open) = self
            .phase_history
            .iter_mut()
            .rev()
            .find(|r| r.exited_at.is_none())
        {
            if intensity > open.peak_intensity {
                open.peak_intensity = intensity;
            }
        }
    }

    /// Appends a trigger to the bounded recent window.
    pub fn push_trigger(&mut self, event: TriggerEvent, window: usize) {
        self.triggers.push_back(event);
        while self.triggers.len() > window {
            self.triggers.pop_front();
        }
    }
}
