//! Built-in behavior definitions
//!
//! Curated behavior configurations embedded in the binary at compile time.
//! Enables zero-configuration usage: `limerence replay --behavior
//! possessive-attachment --transcript chat.jsonl`

use std::sync::LazyLock;

use crate::config::loader::{ConfigLoader, LoadResult, LoaderOptions};
use crate::config::schema::BehaviorCategory;
use crate::error::ConfigError;

// ============================================================================
// Types
// ============================================================================

/// A built-in behavior definition embedded in the binary.
///
/// Each entry is a self-contained YAML configuration describing one
/// behavior pattern: its phase ladder, trigger taxonomy, and per-behavior
/// safety thresholds.
pub struct BuiltinBehavior {
    /// Unique identifier (kebab-case, e.g., "possessive-attachment").
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Category for organization.
    pub category: BehaviorCategory,

    /// Tags for filtering.
    pub tags: &'static [&'static str],

    /// Raw YAML content (embedded at compile time).
    pub yaml: &'static str,
}

impl BuiltinBehavior {
    /// Loads and compiles this definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded YAML fails to parse or
    /// validate — covered by tests, so failures indicate a packaging bug.
    pub fn load(&self) -> Result<LoadResult, ConfigError> {
        ConfigLoader::new(LoaderOptions::default()).load_str(self.yaml)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Global registry of all built-in behavior definitions.
static BUILTIN_BEHAVIORS: LazyLock<Vec<BuiltinBehavior>> = LazyLock::new(|| {
    vec![
        // ── Attachment (order 1) ────────────────────────────────
        BuiltinBehavior {
            name: "possessive-attachment",
            description: "Eight-phase possessive fixation, from warm interest to total fixation",
            category: BehaviorCategory::Attachment,
            tags: &["possessive", "jealousy", "escalating", "tier-1"],
            yaml: include_str!("../../behaviors/possessive-attachment.yaml"),
        },
        BuiltinBehavior {
            name: "anxious-attachment",
            description: "Reassurance-seeking anxiety triggered by silence and distance",
            category: BehaviorCategory::Attachment,
            tags: &["anxious", "reassurance", "tier-1"],
            yaml: include_str!("../../behaviors/anxious-attachment.yaml"),
        },
        // ── Mood (order 2) ──────────────────────────────────────
        BuiltinBehavior {
            name: "volatile-affect",
            description: "Rapid mood cycling between idealization and crisis",
            category: BehaviorCategory::Mood,
            tags: &["volatile", "cycling", "splitting", "tier-2"],
            yaml: include_str!("../../behaviors/volatile-affect.yaml"),
        },
        // ── Personality (order 3) ───────────────────────────────
        BuiltinBehavior {
            name: "grandiose-injury",
            description: "Wounded-pride escalation in response to criticism",
            category: BehaviorCategory::Personality,
            tags: &["grandiosity", "injury", "criticism", "tier-2"],
            yaml: include_str!("../../behaviors/grandiose-injury.yaml"),
        },
    ]
});

// ============================================================================
// Public API
// ============================================================================

/// Look up a built-in behavior by exact name.
#[must_use]
pub fn find_behavior(name: &str) -> Option<&'static BuiltinBehavior> {
    BUILTIN_BEHAVIORS.iter().find(|b| b.name == name)
}

/// List all built-in behaviors, optionally filtered by category and/or tag.
#[must_use]
pub fn list_behaviors(
    category: Option<BehaviorCategory>,
    tag: Option<&str>,
) -> Vec<&'static BuiltinBehavior> {
    BUILTIN_BEHAVIORS
        .iter()
        .filter(|b| category.is_none_or(|c| b.category == c))
        .filter(|b| tag.is_none_or(|t| b.tags.contains(&t)))
        .collect()
}

/// Suggest a similar behavior name for typo correction.
///
/// Returns the closest match if its Damerau-Levenshtein distance is ≤ 3.
#[must_use]
pub fn suggest_behavior(input: &str) -> Option<String> {
    BUILTIN_BEHAVIORS
        .iter()
        .map(|b| (b.name, strsim::damerau_levenshtein(input, b.name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

/// Returns all built-in behavior names in registry order.
#[must_use]
pub fn list_behavior_names() -> Vec<&'static str> {
    BUILTIN_BEHAVIORS.iter().map(|b| b.name).collect()
}

// ============================================================================
// Tests
// ============================================================================
