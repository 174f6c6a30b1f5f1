//! Configuration schema types
//!
//! This module defines the behavior-definition types for `Limerence`.
//! These types are deserialized from YAML configuration files. The trigger
//! taxonomy and phase ladders are data, not code: adding a behavior type or
//! a trigger type never requires a recompile.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a `Limerence` engine instance.
///
/// Carries one or more behavior definitions, optional global safety policy
/// thresholds, and optional engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BehaviorConfig {
    /// Behavior type definitions (at least one)
    pub behaviors: Vec<BehaviorDefinition>,

    /// Global safety policy thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyConfig>,

    /// Engine tuning knobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,
}

impl BehaviorConfig {
    /// Looks up a behavior definition by name.
    #[must_use]
    pub fn behavior(&self, name: &str) -> Option<&BehaviorDefinition> {
        self.behaviors.iter().find(|b| b.name == name)
    }
}

// ============================================================================
// Behavior Definition
// ============================================================================

/// A named psychological behavior pattern: its temperament parameters,
/// ordered phase ladder, and trigger taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BehaviorDefinition {
    /// Behavior type name (unique identifier, kebab-case)
    pub name: String,

    /// Short human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Category for organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<BehaviorCategory>,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Temperament parameter in [0,1]: higher means faster decay and
    /// stronger escalation gain in both directions
    pub volatility: f64,

    /// Configured intensity floor/seed in [0,1]
    #[serde(default = "default_base_intensity")]
    pub base_intensity: f64,

    /// Minimum intensity required for this behavior to emit a directive
    #[serde(default = "default_display_threshold")]
    pub display_threshold: f64,

    /// Decay half-life at volatility 1.0 (humantime string, e.g. `"6h"`).
    /// Effective half-life is `base_half_life / volatility`.
    #[serde(default = "default_base_half_life")]
    pub base_half_life: String,

    /// Ordered phase ladder, least to most severe. Phase numbers are
    /// 1-based positions in this list.
    pub phases: Vec<PhaseDef>,

    /// Trigger taxonomy scoped to this behavior type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerDef>,

    /// Per-behavior override of the global warning phase threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_phase: Option<u8>,

    /// Per-behavior override of the global critical phase threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_phase: Option<u8>,
}

fn default_base_intensity() -> f64 {
    0.1
}

fn default_display_threshold() -> f64 {
    0.2
}

fn default_base_half_life() -> String {
    "6h".to_string()
}

/// Category for organizing behavior definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorCategory {
    /// Attachment-style patterns (possessive, anxious, avoidant).
    Attachment,
    /// Personality-structure patterns (grandiosity, injury response).
    Personality,
    /// Mood and affect patterns (volatility, cycling).
    Mood,
}

impl BehaviorCategory {
    /// Returns the human-readable title-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attachment => "Attachment",
            Self::Personality => "Personality",
            Self::Mood => "Mood",
        }
    }

    /// Returns all category variants in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Attachment, Self::Mood, Self::Personality]
    }
}

impl std::fmt::Display for BehaviorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attachment => write!(f, "attachment"),
            Self::Personality => write!(f, "personality"),
            Self::Mood => write!(f, "mood"),
        }
    }
}

// ============================================================================
// Phase Ladder
// ============================================================================

/// One rung of a behavior's phase ladder.
///
/// `enter` is the intensity required to move up into this phase from the
/// one below it (the first phase's `enter` is ignored and conventionally
/// `0.0`). `exit` is the intensity below which this phase retreats to the
/// previous one. `enter` values must strictly increase down the ladder and
/// each `exit` must sit below the phase's own `enter`, giving hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseDef {
    /// Phase name (unique within the behavior)
    pub name: String,

    /// Intensity threshold to enter this phase from below, in [0,1]
    #[serde(default)]
    pub enter: f64,

    /// Intensity below which this phase retreats, in [0,1]
    #[serde(default)]
    pub exit: f64,

    /// Minimum time the agent must dwell in this phase before it may
    /// advance to the next one (humantime string). Absent means no dwell
    /// requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dwell: Option<String>,

    /// Narrative guidance handed to the generation pipeline while this
    /// phase is active
    pub guidance: String,
}

// ============================================================================
// Trigger Taxonomy
// ============================================================================

/// A trigger type: a detectable conversational event with a severity weight.
///
/// Detection is keyword/pattern first; trigger types that also carry
/// `exemplars` get a semantic-similarity fallback when no pattern matches.
/// A trigger with `elapsed` rungs is temporal: it matches on the gap since
/// the previous message rather than on text, taking the weight of the
/// largest rung the gap clears.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TriggerDef {
    /// Trigger type name (unique within the behavior)
    pub name: String,

    /// Severity weight in [-1,1]. Negative weights are soothing: they
    /// reduce intensity (e.g. reassurance).
    pub weight: f64,

    /// Whether this trigger reinforces the pattern through friction.
    /// Conflict triggers are amplified by the agent's stability multiplier.
    #[serde(default)]
    pub polarity: TriggerPolarity,

    /// Regex patterns matched against the message text (case-insensitive)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Exemplar phrases for the semantic-similarity fallback
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exemplars: Vec<String>,

    /// Suppression window: the same trigger type is counted at most once
    /// per (agent, trigger) within this window (humantime string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,

    /// Temporal rungs for elapsed-time triggers, least to most severe
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elapsed: Vec<ElapsedRung>,
}

/// Polarity of a trigger with respect to the agent's interaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolarity {
    /// Friction-driven trigger; escalation gain is scaled by the agent's
    /// stability multiplier.
    #[default]
    Conflict,
    /// Soothing trigger; applied at unit gain.
    Soothing,
}

/// One rung of an elapsed-time trigger ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ElapsedRung {
    /// Gap since the previous message that activates this rung
    /// (humantime string, e.g. `"3h"`)
    pub after: String,

    /// Weight used when this is the largest rung cleared, in [0,1]
    pub weight: f64,
}

// ============================================================================
// Policy & Engine Tuning
// ============================================================================

/// Global safety policy thresholds.
///
/// Consent flags are runtime state supplied per agent by the host product's
/// settings, not configuration; only the phase thresholds live here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Phase at which the assessment reports a warning
    #[serde(default = "default_warning_phase")]
    pub warning_phase: u8,

    /// Phase at or above which directives are blocked without consent
    #[serde(default = "default_critical_phase")]
    pub critical_phase: u8,
}

const fn default_warning_phase() -> u8 {
    3
}

const fn default_critical_phase() -> u8 {
    4
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            warning_phase: default_warning_phase(),
            critical_phase: default_critical_phase(),
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Bound on the per-profile recent trigger window
    #[serde(default = "default_trigger_window")]
    pub trigger_window: usize,

    /// Bound on the per-agent recent-message context window
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// TTL for the safety-assessment cache (humantime string). Absent
    /// disables the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_cache_ttl: Option<String>,

    /// Budget for a single semantic classifier call (humantime string)
    #[serde(default = "default_classifier_timeout")]
    pub classifier_timeout: String,

    /// Capacity of the audit channel; events beyond it are dropped
    #[serde(default = "default_audit_buffer")]
    pub audit_buffer: usize,
}

const fn default_trigger_window() -> usize {
    32
}

const fn default_context_window() -> usize {
    8
}

fn default_classifier_timeout() -> String {
    "250ms".to_string()
}

const fn default_audit_buffer() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_window: default_trigger_window(),
            context_window: default_context_window(),
            assessment_cache_ttl: None,
            classifier_timeout: default_classifier_timeout(),
            audit_buffer: default_audit_buffer(),
        }
    }
}

/// Ordered map from behavior name to its definition, preserving file order.
pub type BehaviorTable = IndexMap<String, BehaviorDefinition>;

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r"
behaviors:
  - name: test-pattern
    volatility: 0.5
    phases:
      - name: calm
        guidance: stay neutral
      - name: keen
        enter: 0.4
        exit: 0.25
        guidance: show interest
    triggers:
      - name: praise
        weight: -0.3
        polarity: soothing
        patterns: ['\bthank you\b']
"
    }

    #[test]
    fn deserialize_minimal_config() {
        let config: BehaviorConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.behaviors.len(), 1);
        let b = &config.behaviors[0];
        assert_eq!(b.name, "test-pattern");
        assert_eq!(b.phases.len(), 2);
        assert!((b.base_intensity - 0.1).abs() < f64::EPSILON);
        assert_eq!(b.base_half_life, "6h");
        assert_eq!(b.triggers[0].polarity, TriggerPolarity::Soothing);
    }

    #[test]
    fn behavior_lookup() {
        let config: BehaviorConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert!(config.behavior("test-pattern").is_some());
        assert!(config.behavior("absent").is_none());
    }

    #[test]
    fn polarity_default_is_conflict() {
        let def: TriggerDef = serde_yaml::from_str(
            r"
name: criticism
weight: 0.8
",
        )
        .unwrap();
        assert_eq!(def.polarity, TriggerPolarity::Conflict);
    }

    #[test]
    fn policy_defaults() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.warning_phase, 3);
        assert_eq!(policy.critical_phase, 4);
    }

    #[test]
    fn category_display_lowercase() {
        assert_eq!(BehaviorCategory::Attachment.to_string(), "attachment");
        assert_eq!(BehaviorCategory::Personality.to_string(), "personality");
        assert_eq!(BehaviorCategory::Mood.to_string(), "mood");
    }

    #[test]
    fn category_label_titlecase() {
        assert_eq!(BehaviorCategory::Attachment.label(), "Attachment");
        assert_eq!(BehaviorCategory::Mood.label(), "Mood");
    }

    #[test]
    fn engine_config_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.trigger_window, 32);
        assert_eq!(engine.context_window, 8);
        assert_eq!(engine.audit_buffer, 256);
        assert!(engine.assessment_cache_ttl.is_none());
    }
}
