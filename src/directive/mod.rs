//! Prompt directive construction
//!
//! The last step before the external generation pipeline: turns safety-
//! clamped behavior state into the directive list a prompt builder may
//! consume. Only behaviors whose decayed intensity clears their display
//! threshold emit anything, and every phase has already been through the
//! gate's cap.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use crate::config::compiled::CompiledBehavior;
use crate::engine::profile::BehaviorProfile;
use crate::safety::SafetyAssessment;

/// One behavioral directive for the generation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    /// Behavior type name
    pub behavior: String,
    /// Phase after the safety cap (1-based)
    pub phase: u8,
    /// Current intensity in [0,1]
    pub intensity: f64,
    /// Narrative guidance from the capped phase's ladder rung
    pub narrative_guidance: String,
}

/// Builds the directive list for an agent.
///
/// The guidance text is taken from the *capped* phase's rung: a behavior
/// blocked down from phase 5 to 3 speaks with phase 3's voice, not a
/// truncated phase 5.
#[must_use]
pub fn build(
    profiles: &[BehaviorProfile],
    assessment: &SafetyAssessment,
    behaviors: &IndexMap<String, Arc<CompiledBehavior>>,
) -> Vec<Directive> {
    profiles
        .iter()
        .filter(|p| p.enabled)
        .filter_map(|profile| {
            let behavior = behaviors.get(&profile.key.behavior)?;
            if profile.current_intensity < profile.display_threshold {
                return None;
            }

            let cap = assessment
                .cap_for(&profile.key.behavior)
                .unwrap_or(profile.current_phase);
            let phase = profile.current_phase.min(cap);
            let rung = behavior.phase(phase)?;

            Some(Directive {
                behavior: profile.key.behavior.clone(),
                phase,
                intensity: profile.current_intensity,
                narrative_guidance: rung.guidance.clone(),
            })
        })
        .collect()
}
