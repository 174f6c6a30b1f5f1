//! Safety gate
//!
//! A deterministic, side-effect-free policy function: given the agent's
//! current behavior profiles and the applicable policy flags, it produces a
//! clamped safety assessment and the maximum phase allowed to leak into
//! output. Directives are clamped down, never up, and a missing policy
//! defaults to the most conservative outcome. This function runs before any
//! behavior-influenced output reaches generation.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use crate::config::compiled::CompiledBehavior;
use crate::config::schema::PolicyConfig;
use crate::engine::profile::BehaviorProfile;

// ============================================================================
// Policy
// ============================================================================

/// Effective safety policy for one agent: the configured phase thresholds
/// plus the user/agent consent flag supplied at runtime.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Phase at which the assessment reports a warning
    pub warning_phase: u8,
    /// Phase at or above which directives are blocked without consent
    pub critical_phase: u8,
    /// Whether the user has explicitly consented to critical-phase content
    pub explicit_consent: bool,
}

impl Policy {
    /// The most conservative policy: default thresholds, no consent.
    ///
    /// Used whenever policy configuration is missing or unavailable —
    /// the gate never defaults to permissive.
    #[must_use]
    pub fn conservative() -> Self {
        let defaults = PolicyConfig::default();
        Self {
            warning_phase: defaults.warning_phase,
            critical_phase: defaults.critical_phase,
            explicit_consent: false,
        }
    }

    /// Builds a policy from configured thresholds and a consent flag.
    #[must_use]
    pub const fn from_config(config: PolicyConfig, explicit_consent: bool) -> Self {
        Self {
            warning_phase: config.warning_phase,
            critical_phase: config.critical_phase,
            explicit_consent,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::conservative()
    }
}

// ============================================================================
// Assessment
// ============================================================================

/// User-facing safety level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    /// No behavior near a policy threshold.
    Normal,
    /// A behavior sits at the warning phase; content allowed, logged.
    Warning,
    /// A behavior is at or past the critical phase with consent given.
    Critical,
    /// A behavior is at or past the critical phase without consent;
    /// directives for it are clamped below the critical phase.
    Blocked,
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Per-behavior slice of the assessment.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveBehavior {
    /// Behavior type name
    pub behavior: String,
    /// Actual current phase
    pub phase: u8,
    /// Maximum phase allowed to influence output
    pub effective_phase_cap: u8,
    /// Current intensity
    pub intensity: f64,
    /// Safety level contributed by this behavior
    pub level: SafetyLevel,
}

/// Derived safety assessment for one agent. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyAssessment {
    /// Most severe level across active behaviors
    pub safety_level: SafetyLevel,
    /// Per-behavior detail for enabled profiles
    pub active: Vec<ActiveBehavior>,
    /// Human-readable reasons for warning/critical/blocked levels
    pub reasons: Vec<String>,
}

impl SafetyAssessment {
    /// Assessment for an agent with no active behaviors.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            safety_level: SafetyLevel::Normal,
            active: Vec::new(),
            reasons: Vec::new(),
        }
    }

    /// Phase cap for a behavior, `None` when the behavior is not active.
    #[must_use]
    pub fn cap_for(&self, behavior: &str) -> Option<u8> {
        self.active
            .iter()
            .find(|a| a.behavior == behavior)
            .map(|a| a.effective_phase_cap)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluates the safety gate for an agent's profiles.
///
/// Pure: no side effects, no clock, no I/O. Disabled profiles do not
/// contribute. Per-behavior threshold overrides in the definition take
/// precedence over the policy's global thresholds; the consent flag always
/// comes from the policy.
#[must_use]
pub fn evaluate(
    profiles: &[BehaviorProfile],
    behaviors: &IndexMap<String, Arc<CompiledBehavior>>,
    policy: &Policy,
) -> SafetyAssessment {
    let mut active = Vec::new();
    let mut reasons = Vec::new();
    let mut level = SafetyLevel::Normal;

    for profile in profiles.iter().filter(|p| p.enabled) {
        let definition = behaviors.get(&profile.key.behavior);
        let warning = definition
            .and_then(|d| d.warning_phase)
            .unwrap_or(policy.warning_phase);
        let critical = definition
            .and_then(|d| d.critical_phase)
            .unwrap_or(policy.critical_phase);

        let phase = profile.current_phase;
        let (behavior_level, cap) = if phase >= critical && !policy.explicit_consent {
            // Clamp down, never up; the cap cannot sink below phase 1
            (SafetyLevel::Blocked, critical.saturating_sub(1).max(1))
        } else if phase >= critical {
            (SafetyLevel::Critical, phase)
        } else if phase == warning {
            (SafetyLevel::Warning, phase)
        } else {
            (SafetyLevel::Normal, phase)
        };

        match behavior_level {
            SafetyLevel::Blocked => reasons.push(format!(
                "'{}' at phase {phase} requires explicit consent; capped at phase {cap}",
                profile.key.behavior
            )),
            SafetyLevel::Critical => reasons.push(format!(
                "'{}' at critical phase {phase} with consent",
                profile.key.behavior
            )),
            SafetyLevel::Warning => reasons.push(format!(
                "'{}' reached warning phase {phase}",
                profile.key.behavior
            )),
            SafetyLevel::Normal => {}
        }

        level = level.max(behavior_level);
        active.push(ActiveBehavior {
            behavior: profile.key.behavior.clone(),
            phase,
            effective_phase_cap: cap,
            intensity: profile.current_intensity,
            level: behavior_level,
        });
    }

    SafetyAssessment {
        safety_level: level,
        active,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BehaviorDefinition;
    use crate::engine::profile::{ProfileKey, ProfileSeed};
    use chrono::Utc;

    fn ladder(name: &str, overrides: Option<(u8, u8)>) -> Arc<CompiledBehavior> {
        let mut def: BehaviorDefinition = serde_yaml::from_str(&format!(
            r"
name: {name}
volatility: 0.5
phases:
  - {{ name: p1, guidance: g1 }}
  - {{ name: p2, enter: 0.2, exit: 0.1, guidance: g2 }}
  - {{ name: p3, enter: 0.4, exit: 0.3, guidance: g3 }}
  - {{ name: p4, enter: 0.6, exit: 0.5, guidance: g4 }}
  - {{ name: p5, enter: 0.8, exit: 0.7, guidance: g5 }}
"
        ))
        .unwrap();
        if let Some((warning, critical)) = overrides {
            def.warning_phase = Some(warning);
            def.critical_phase = Some(critical);
        }
        Arc::new(CompiledBehavior::compile(&def).unwrap())
    }

    fn table(behaviors: &[Arc<CompiledBehavior>]) -> IndexMap<String, Arc<CompiledBehavior>> {
        behaviors
            .iter()
            .map(|b| (b.name.clone(), Arc::clone(b)))
            .collect()
    }

    fn profile_at(behavior: &str, phase: u8) -> BehaviorProfile {
        let seed = ProfileSeed {
            base_intensity: 0.1,
            volatility: 0.5,
            display_threshold: 0.2,
        };
        let mut p = BehaviorProfile::new(ProfileKey::new("a", behavior), seed, Utc::now());
        p.current_phase = phase;
        p.current_intensity = 0.5;
        p
    }

    #[test]
    fn normal_below_thresholds() {
        let b = ladder("x", None);
        let a = evaluate(&[profile_at("x", 2)], &table(&[b]), &Policy::conservative());
        assert_eq!(a.safety_level, SafetyLevel::Normal);
        assert_eq!(a.cap_for("x"), Some(2));
        assert!(a.reasons.is_empty());
    }

    #[test]
    fn warning_at_warning_phase() {
        let b = ladder("x", None);
        let a = evaluate(&[profile_at("x", 3)], &table(&[b]), &Policy::conservative());
        assert_eq!(a.safety_level, SafetyLevel::Warning);
        assert_eq!(a.cap_for("x"), Some(3));
        assert_eq!(a.reasons.len(), 1);
    }

    #[test]
    fn blocked_without_consent_caps_below_critical() {
        let b = ladder("x", None);
        let a = evaluate(&[profile_at("x", 4)], &table(&[b]), &Policy::conservative());
        assert_eq!(a.safety_level, SafetyLevel::Blocked);
        assert_eq!(a.cap_for("x"), Some(3));
    }

    #[test]
    fn critical_with_consent_is_uncapped() {
        let b = ladder("x", None);
        let policy = Policy {
            explicit_consent: true,
            ..Policy::conservative()
        };
        let a = evaluate(&[profile_at("x", 4)], &table(&[b]), &policy);
        assert_eq!(a.safety_level, SafetyLevel::Critical);
        assert_eq!(a.cap_for("x"), Some(4));
    }

    #[test]
    fn per_behavior_overrides_win() {
        let b = ladder("x", Some((2, 5)));
        let policy = Policy::conservative();

        // Phase 4 clears the global critical threshold but not the
        // override; the override's warning phase is 2.
        let a = evaluate(&[profile_at("x", 4)], &table(&[b.clone()]), &policy);
        assert_eq!(a.safety_level, SafetyLevel::Normal);

        let a = evaluate(&[profile_at("x", 5)], &table(&[b.clone()]), &policy);
        assert_eq!(a.safety_level, SafetyLevel::Blocked);
        assert_eq!(a.cap_for("x"), Some(4));

        let a = evaluate(&[profile_at("x", 2)], &table(&[b]), &policy);
        assert_eq!(a.safety_level, SafetyLevel::Warning);
    }

    #[test]
    fn most_severe_behavior_wins_overall() {
        let x = ladder("x", None);
        let y = ladder("y", None);
        let a = evaluate(
            &[profile_at("x", 1), profile_at("y", 4)],
            &table(&[x, y]),
            &Policy::conservative(),
        );
        assert_eq!(a.safety_level, SafetyLevel::Blocked);
        assert_eq!(a.cap_for("x"), Some(1));
        assert_eq!(a.cap_for("y"), Some(3));
    }

    #[test]
    fn disabled_profiles_do_not_contribute() {
        let b = ladder("x", None);
        let mut p = profile_at("x", 5);
        p.enabled = false;
        let a = evaluate(&[p], &table(&[b]), &Policy::conservative());
        assert_eq!(a.safety_level, SafetyLevel::Normal);
        assert!(a.active.is_empty());
    }

    #[test]
    fn unknown_behavior_uses_policy_thresholds() {
        // Profile whose definition is missing from the table: policy
        // thresholds apply, conservative as ever.
        let a = evaluate(
            &[profile_at("ghost", 4)],
            &IndexMap::new(),
            &Policy::conservative(),
        );
        assert_eq!(a.safety_level, SafetyLevel::Blocked);
    }

    #[test]
    fn idle_assessment_is_normal() {
        let a = SafetyAssessment::idle();
        assert_eq!(a.safety_level, SafetyLevel::Normal);
        assert!(a.active.is_empty());
    }

    #[test]
    fn level_ordering() {
        assert!(SafetyLevel::Normal < SafetyLevel::Warning);
        assert!(SafetyLevel::Warning < SafetyLevel::Critical);
        assert!(SafetyLevel::Critical < SafetyLevel::Blocked);
    }

    #[test]
    fn cap_never_below_phase_one() {
        let b = ladder("x", Some((1, 1)));
        let a = evaluate(&[profile_at("x", 1)], &table(&[b]), &Policy::conservative());
        assert_eq!(a.safety_level, SafetyLevel::Blocked);
        assert_eq!(a.cap_for("x"), Some(1));
    }
}
