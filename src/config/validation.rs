//! Semantic validation of behavior configurations
//!
//! Structural validity is the deserializer's job; this pass checks the
//! semantics that YAML cannot express: threshold ranges and monotonicity,
//! weight ranges, duplicate names, and hysteresis between enter and exit
//! thresholds.

use std::collections::HashSet;

use crate::config::schema::{BehaviorConfig, BehaviorDefinition, TriggerPolarity};
use crate::error::{Severity, ValidationIssue};

/// Result of validating a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues found, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Whether any error-severity issue was found.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Error)
    }

    /// Whether any warning-severity issue was found.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Warning)
    }

    /// Issues of error severity only.
    #[must_use]
    pub fn errors(&self) -> Vec<ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .cloned()
            .collect()
    }
}

/// Behavior configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a full configuration and returns all issues found.
    #[must_use]
    pub fn validate(mut self, config: &BehaviorConfig) -> ValidationResult {
        if config.behaviors.is_empty() {
            self.error("behaviors", "at least one behavior definition is required");
        }

        let mut seen = HashSet::new();
        for (i, behavior) in config.behaviors.iter().enumerate() {
            let path = format!("behaviors[{i}]");
            if !seen.insert(behavior.name.as_str()) {
                self.error(&path, &format!("duplicate behavior name '{}'", behavior.name));
            }
            self.validate_behavior(behavior, &path);
        }

        if let Some(policy) = &config.policy {
            if policy.critical_phase <= policy.warning_phase {
                self.warning(
                    "policy.critical_phase",
                    "critical phase does not exceed warning phase",
                );
            }
        }

        ValidationResult {
            issues: self.issues,
        }
    }

    fn validate_behavior(&mut self, behavior: &BehaviorDefinition, path: &str) {
        if behavior.name.is_empty() {
            self.error(&format!("{path}.name"), "behavior name is empty");
        }

        self.check_unit(&format!("{path}.volatility"), behavior.volatility);
        self.check_unit(&format!("{path}.base_intensity"), behavior.base_intensity);
        self.check_unit(
            &format!("{path}.display_threshold"),
            behavior.display_threshold,
        );

        self.validate_phases(behavior, path);
        self.validate_triggers(behavior, path);

        if let Some(critical) = behavior.critical_phase {
            if usize::from(critical) > behavior.phases.len() {
                self.warning(
                    &format!("{path}.critical_phase"),
                    "critical phase lies beyond the ladder; it can never be reached",
                );
            }
        }
    }

    fn validate_phases(&mut self, behavior: &BehaviorDefinition, path: &str) {
        if behavior.phases.is_empty() {
            self.error(&format!("{path}.phases"), "phase ladder is empty");
            return;
        }

        let mut names = HashSet::new();
        let mut previous_enter = f64::NEG_INFINITY;
        for (i, phase) in behavior.phases.iter().enumerate() {
            let ppath = format!("{path}.phases[{i}]");
            if !names.insert(phase.name.as_str()) {
                self.error(&ppath, &format!("duplicate phase name '{}'", phase.name));
            }
            self.check_unit(&format!("{ppath}.enter"), phase.enter);
            self.check_unit(&format!("{ppath}.exit"), phase.exit);

            // First rung is the resting phase; its enter threshold is unused
            if i > 0 {
                if phase.enter <= previous_enter {
                    self.error(
                        &format!("{ppath}.enter"),
                        "enter thresholds must strictly increase down the ladder",
                    );
                }
                if phase.exit >= phase.enter {
                    self.error(
                        &format!("{ppath}.exit"),
                        "exit threshold must sit below enter for hysteresis",
                    );
                }
            }
            previous_enter = phase.enter;
        }
    }

    fn validate_triggers(&mut self, behavior: &BehaviorDefinition, path: &str) {
        let mut names = HashSet::new();
        for (i, trigger) in behavior.triggers.iter().enumerate() {
            let tpath = format!("{path}.triggers[{i}]");
            if !names.insert(trigger.name.as_str()) {
                self.error(
                    &tpath,
                    &format!("duplicate trigger name '{}'", trigger.name),
                );
            }
            if !(-1.0..=1.0).contains(&trigger.weight) {
                self.error(
                    &format!("{tpath}.weight"),
                    "trigger weight must lie in [-1, 1]",
                );
            }
            if trigger.polarity == TriggerPolarity::Soothing && trigger.weight > 0.0 {
                self.warning(
                    &format!("{tpath}.weight"),
                    "soothing trigger with positive weight escalates instead of calming",
                );
            }
            if trigger.patterns.is_empty()
                && trigger.exemplars.is_empty()
                && trigger.elapsed.is_empty()
            {
                self.error(
                    &tpath,
                    "trigger has no patterns, exemplars, or elapsed rungs; it can never fire",
                );
            }
            for (j, rung) in trigger.elapsed.iter().enumerate() {
                if !(0.0..=1.0).contains(&rung.weight) {
                    self.error(
                        &format!("{tpath}.elapsed[{j}].weight"),
                        "elapsed rung weight must lie in [0, 1]",
                    );
                }
            }
        }
    }

    fn check_unit(&mut self, path: &str, value: f64) {
        if !(0.0..=1.0).contains(&value) {
            self.error(path, "value must lie in [0, 1]");
        }
    }

    fn error(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
