//! Profile recomputation — the phase state machine step
//!
//! One recompute combines decayed prior intensity with freshly detected
//! trigger weights, then moves the discrete phase by at most one level in
//! either direction. Restricting transitions to ±1 per recompute keeps a
//! single extreme input from producing a jarring multi-phase jump and
//! bounds the blast radius of any one bad message.
//!
//! The function is pure with respect to its inputs: callers own the
//! serialization discipline (the engine runs it under the profile's map
//! guard) and the wall clock (`now` is a parameter).

use chrono::{DateTime, Utc};

use crate::config::compiled::CompiledBehavior;
use crate::config::schema::TriggerPolarity;
use crate::engine::TriggerEvent;
use crate::engine::decay::{clamp_intensity, decay_factor, escalation_gain};
use crate::engine::profile::BehaviorProfile;

/// A completed phase movement.
#[derive(Debug, Clone)]
pub struct PhaseTransition {
    /// Behavior type that moved
    pub behavior: String,
    /// Phase number before the move (1-based)
    pub from_phase: u8,
    /// Phase number after the move
    pub to_phase: u8,
    /// Human-readable reason the threshold fired
    pub reason: String,
}

impl PhaseTransition {
    /// Whether the move was an escalation.
    #[must_use]
    pub const fn is_advance(&self) -> bool {
        self.to_phase > self.from_phase
    }
}

/// Result of one recompute step.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Intensity after decay and trigger application
    pub intensity: f64,
    /// Phase after the step (1-based)
    pub phase: u8,
    /// The movement, if any
    pub transition: Option<PhaseTransition>,
}

/// Recomputes one profile in place.
///
/// Steps: decay prior intensity by elapsed time, fold in trigger
/// contributions at escalation gain, clamp, then advance or retreat the
/// phase by at most one level with history bookkeeping. `stability` is the
/// agent's progression multiplier; it scales conflict triggers only.
///
/// With no triggers and no elapsed time this is a no-op, so recomputing on
/// every read is safe.
pub fn recompute(
    profile: &mut BehaviorProfile,
    behavior: &CompiledBehavior,
    triggers: &[TriggerEvent],
    stability: f64,
    now: DateTime<Utc>,
) -> Outcome {
    debug_assert_eq!(profile.key.behavior, behavior.name);

    // Elapsed time since the last recompute; clock skew never rewinds decay
    let elapsed = (now - profile.last_calculated_at)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);

    // Temperament comes from the profile, not the shared definition: a
    // persistent store may carry per-agent variation.
    let volatility = profile.volatility;

    let decayed =
        profile.current_intensity * decay_factor(behavior.base_half_life, volatility, elapsed);

    let contribution: f64 = triggers
        .iter()
        .map(|event| {
            let gain = escalation_gain(volatility, conflict_scale(behavior, event, stability));
            event.weight * gain
        })
        .sum();

    profile.current_intensity = clamp_intensity(decayed + contribution);
    profile.track_peak();

    let transition = step_phase(profile, behavior, now);
    profile.last_calculated_at = now;

    debug_assert!((0.0..=1.0).contains(&profile.current_intensity));
    debug_assert!(profile.current_phase >= 1);
    debug_assert!(profile.current_phase <= behavior.phase_count());

    Outcome {
        intensity: profile.current_intensity,
        phase: profile.current_phase,
        transition,
    }
}

/// Stability scale for one trigger: conflict triggers carry the agent's
/// multiplier, soothing triggers apply at unit scale.
fn conflict_scale(behavior: &CompiledBehavior, event: &TriggerEvent, stability: f64) -> f64 {
    let polarity = behavior
        .triggers
        .iter()
        .find(|t| t.name == event.trigger)
        .map_or(TriggerPolarity::Conflict, |t| t.polarity);
    match polarity {
        TriggerPolarity::Conflict => stability,
        TriggerPolarity::Soothing => 1.0,
    }
}

/// Moves the phase by at most one level, closing and opening history
/// records on a move.
fn step_phase(
    profile: &mut BehaviorProfile,
    behavior: &CompiledBehavior,
    now: DateTime<Utc>,
) -> Option<PhaseTransition> {
    let current = profile.current_phase;
    let intensity = profile.current_intensity;

    // Advancement: next rung's enter threshold, gated by dwell in the
    // current phase. Never skips a level regardless of how far the raw
    // intensity overshoots.
    if let Some(next) = behavior.phase(current + 1) {
        let dwell = (now - profile.phase_started_at)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let dwell_met = behavior
            .phase(current)
            .is_none_or(|p| dwell >= p.min_dwell);

        if intensity >= next.enter && dwell_met {
            let to = current + 1;
            profile.current_phase = to;
            profile.roll_history(to, now);
            return Some(PhaseTransition {
                behavior: behavior.name.clone(),
                from_phase: current,
                to_phase: to,
                reason: format!(
                    "intensity {intensity:.3} cleared enter threshold {:.3} of '{}'",
                    next.enter, next.name
                ),
            });
        }
    }

    // Retreat: below the current rung's exit threshold. No dwell gate in
    // this direction — de-escalation is never delayed.
    if current > 1 {
        if let Some(rung) = behavior.phase(current) {
            if intensity < rung.exit {
                let to = current - 1;
                profile.current_phase = to;
                profile.roll_history(to, now);
                return Some(PhaseTransition {
                    behavior: behavior.name.clone(),
                    from_phase: current,
                    to_phase: to,
                    reason: format!(
                        "intensity {intensity:.3} fell below exit threshold {:.3} of '{}'",
                        rung.exit, rung.name
                    ),
                });
            }
        }
    }

    None
}
