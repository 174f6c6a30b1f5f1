//! Trigger detection
//!
//! Classifies an inbound message (plus a short recent-message window) into
//! zero or more weighted trigger events, per the data-driven taxonomy each
//! behavior definition carries. Matching is keyword/pattern first with a
//! lexical-similarity fallback standing in for the semantic classifier;
//! temporal triggers match on the gap since the previous message instead of
//! on text. The detector is stateless apart from the cooldown map and may
//! run fully in parallel across agents.

pub mod semantic;

pub use semantic::{CONFIDENCE_THRESHOLD, SemanticClassifier, SemanticMatch};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::compiled::{CompiledBehavior, CompiledTrigger};
use crate::engine::{InboundMessage, TriggerEvent};

/// Normalized Jaro-Winkler similarity above which an exemplar phrase is
/// considered matched.
const LEXICAL_THRESHOLD: f64 = 0.82;

/// One entry of the recent-message context window.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// Message identifier
    pub message_id: String,
    /// When the message was sent
    pub sent_at: DateTime<Utc>,
}

/// Detects weighted trigger events in inbound messages.
///
/// A short per-(agent, trigger) cooldown suppresses duplicate counting of
/// the same trigger within a narrow window, so overlapping patterns cannot
/// double-count a single user phrase.
pub struct TriggerDetector {
    /// Last fire time per `"{agent}:{trigger}"` key
    cooldowns: DashMap<String, DateTime<Utc>>,
    /// Optional semantic classifier collaborator
    classifier: Option<Arc<dyn SemanticClassifier>>,
    /// Budget for a single classifier call
    classifier_timeout: Duration,
}

impl TriggerDetector {
    /// Creates a keyword-only detector.
    #[must_use]
    pub fn new(classifier_timeout: Duration) -> Self {
        Self {
            cooldowns: DashMap::new(),
            classifier: None,
            classifier_timeout,
        }
    }

    /// Attaches a semantic classifier used where patterns do not match.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn SemanticClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Detects trigger events for a message across the agent's enabled
    /// behaviors. An empty result is success.
    pub async fn detect(
        &self,
        msg: &InboundMessage,
        context: &[ContextEntry],
        behaviors: &[Arc<CompiledBehavior>],
        now: DateTime<Utc>,
    ) -> Vec<TriggerEvent> {
        let mut events = Vec::new();

        for behavior in behaviors {
            let mut unmatched = Vec::new();

            for trigger in &behavior.triggers {
                if trigger.is_temporal() {
                    if let Some(event) = self.match_temporal(msg, context, behavior, trigger) {
                        self.emit(&mut events, &msg.agent_id, behavior, trigger, event, now);
                    }
                    continue;
                }

                if let Some(matched) = match_patterns(trigger, &msg.text) {
                    let event = self.event(msg, behavior, trigger, trigger.weight, matched);
                    self.emit(&mut events, &msg.agent_id, behavior, trigger, event, now);
                } else if !trigger.exemplars.is_empty() {
                    unmatched.push(trigger);
                }
            }

            // Pattern misses with exemplars go through the semantic path,
            // degrading to lexical similarity when no classifier answers.
            for (trigger, matched) in self.semantic_pass(msg, behavior, &unmatched).await {
                let event = self.event(msg, behavior, trigger, trigger.weight, matched);
                self.emit(&mut events, &msg.agent_id, behavior, trigger, event, now);
            }
        }

        events
    }

    /// Applies the cooldown gate, then records and collects the event.
    fn emit(
        &self,
        events: &mut Vec<TriggerEvent>,
        agent_id: &str,
        behavior: &CompiledBehavior,
        trigger: &CompiledTrigger,
        event: TriggerEvent,
        now: DateTime<Utc>,
    ) {
        if self.on_cooldown(agent_id, trigger, now) {
            debug!(
                trigger = %trigger.name,
                behavior = %behavior.name,
                "trigger suppressed by cooldown"
            );
            metrics::counter!("limerence_trigger_cooldowns_total").increment(1);
            return;
        }
        metrics::counter!(
            "limerence_triggers_total",
            "trigger" => trigger.name.clone()
        )
        .increment(1);
        events.push(event);
    }

    /// Whether this (agent, trigger) pair fired within its cooldown window.
    /// Records `now` as the latest fire time when the gate passes.
    fn on_cooldown(&self, agent_id: &str, trigger: &CompiledTrigger, now: DateTime<Utc>) -> bool {
        if trigger.cooldown.is_zero() {
            return false;
        }
        let key = format!("{agent_id}:{}", trigger.name);
        if let Some(last) = self.cooldowns.get(&key) {
            let since = (now - *last).to_std().unwrap_or(Duration::ZERO);
            if since < trigger.cooldown {
                return true;
            }
        }
        self.cooldowns.insert(key, now);
        false
    }

    /// Temporal triggers: the gap since the previous message selects the
    /// largest rung it clears.
    fn match_temporal(
        &self,
        msg: &InboundMessage,
        context: &[ContextEntry],
        behavior: &CompiledBehavior,
        trigger: &CompiledTrigger,
    ) -> Option<TriggerEvent> {
        let last = context.iter().map(|e| e.sent_at).max()?;
        let gap = (msg.sent_at - last).to_std().ok()?;

        let rung = trigger
            .elapsed
            .iter()
            .rev()
            .find(|rung| gap >= rung.after)?;

        Some(self.event(
            msg,
            behavior,
            trigger,
            rung.weight,
            format!("{} since last message", humantime::format_duration(truncate_secs(gap))),
        ))
    }

    /// Runs the classifier over pattern-miss triggers, degrading to the
    /// lexical fallback on timeout, failure, or absence.
    async fn semantic_pass<'a>(
        &self,
        msg: &InboundMessage,
        behavior: &CompiledBehavior,
        unmatched: &[&'a CompiledTrigger],
    ) -> Vec<(&'a CompiledTrigger, String)> {
        if unmatched.is_empty() {
            return Vec::new();
        }

        if let Some(classifier) = &self.classifier {
            let labels: Vec<String> = unmatched.iter().map(|t| t.name.clone()).collect();
            match tokio::time::timeout(
                self.classifier_timeout,
                classifier.classify(&msg.text, &labels),
            )
            .await
            {
                Ok(Ok(matches)) => {
                    return resolve_semantic_matches(behavior, unmatched, matches);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "semantic classifier failed; degrading to lexical matching");
                }
                Err(_) => {
                    warn!(
                        budget = ?self.classifier_timeout,
                        "semantic classifier timed out; degrading to lexical matching"
                    );
                }
            }
        }

        unmatched
            .iter()
            .filter_map(|t| match_exemplars(t, &msg.text).map(|m| (*t, m)))
            .collect()
    }

    fn event(
        &self,
        msg: &InboundMessage,
        behavior: &CompiledBehavior,
        trigger: &CompiledTrigger,
        weight: f64,
        matched_text: String,
    ) -> TriggerEvent {
        TriggerEvent {
            behavior: behavior.name.clone(),
            trigger: trigger.name.clone(),
            weight,
            matched_text,
            message_id: msg.message_id.clone(),
            detected_at: msg.sent_at,
        }
    }
}

impl std::fmt::Debug for TriggerDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerDetector")
            .field("cooldowns", &self.cooldowns.len())
            .field("has_classifier", &self.classifier.is_some())
            .field("classifier_timeout", &self.classifier_timeout)
            .finish()
    }
}

/// First pattern match wins; one event per trigger type per message.
fn match_patterns(trigger: &CompiledTrigger, text: &str) -> Option<String> {
    trigger
        .patterns
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

/// Lexical fallback: best normalized Jaro-Winkler similarity against the
/// trigger's exemplar phrases.
fn match_exemplars(trigger: &CompiledTrigger, text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    trigger
        .exemplars
        .iter()
        .map(|exemplar| (exemplar, strsim::jaro_winkler(&lowered, exemplar)))
        .filter(|(_, score)| *score >= LEXICAL_THRESHOLD)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(exemplar, _)| exemplar.clone())
}

/// Maps classifier labels back onto trigger definitions; unrecognized
/// labels are dropped with a logged warning, never raised as a failure.
fn resolve_semantic_matches<'a>(
    behavior: &CompiledBehavior,
    unmatched: &[&'a CompiledTrigger],
    matches: Vec<SemanticMatch>,
) -> Vec<(&'a CompiledTrigger, String)> {
    let mut resolved = Vec::new();
    for m in matches {
        if m.confidence < CONFIDENCE_THRESHOLD {
            continue;
        }
        if let Some(trigger) = unmatched.iter().find(|t| t.name == m.label) {
            resolved.push((*trigger, format!("semantic match '{}'", m.label)));
        } else {
            warn!(
                label = %m.label,
                behavior = %behavior.name,
                "classifier returned unknown trigger label; dropping"
            );
        }
    }
    resolved
}

/// Drops sub-second precision for human-readable gap formatting.
fn truncate_secs(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::semantic::test_support::{FixedClassifier, StalledClassifier};
    use super::*;
    use crate::config::schema::BehaviorDefinition;
    use crate::engine::Sentiment;

    fn behavior() -> Arc<CompiledBehavior> {
        let def: BehaviorDefinition = serde_yaml::from_str(
            r"
name: test-pattern
volatility: 0.5
phases:
  - name: calm
    guidance: neutral
  - name: keen
    enter: 0.4
    exit: 0.25
    guidance: interested
triggers:
  - name: rival-mention
    weight: 0.65
    patterns: ['\bmy (?:friend|coworker|ex)\b']
    cooldown: 60s
  - name: abandonment-signal
    weight: 0.7
    exemplars: ['i need some space', 'i need time alone']
  - name: long-silence
    weight: 0.5
    elapsed:
      - { after: 3h, weight: 0.2 }
      - { after: 12h, weight: 0.6 }
",
        )
        .unwrap();
        Arc::new(CompiledBehavior::compile(&def).unwrap())
    }

    fn now() -> DateTime<Utc> {
        "2026-01-10T12:00:00Z".parse().unwrap()
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            agent_id: "agent-1".to_string(),
            user_id: "user-1".to_string(),
            message_id: "m-1".to_string(),
            text: text.to_string(),
            sent_at: now(),
            sentiment: Some(Sentiment::Neutral),
        }
    }

    fn detector() -> TriggerDetector {
        TriggerDetector::new(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn pattern_match_emits_event() {
        let events = detector()
            .detect(&message("I had lunch with my coworker today"), &[], &[behavior()], now())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "rival-mention");
        assert!((events[0].weight - 0.65).abs() < f64::EPSILON);
        assert_eq!(events[0].matched_text, "my coworker");
    }

    #[tokio::test]
    async fn no_match_is_empty_success() {
        let events = detector()
            .detect(&message("lovely weather today"), &[], &[behavior()], now())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn cooldown_suppresses_duplicate() {
        let d = detector();
        let b = behavior();
        let first = d
            .detect(&message("saw my ex yesterday"), &[], &[Arc::clone(&b)], now())
            .await;
        assert_eq!(first.len(), 1);

        // Ten seconds later, inside the 60s window
        let soon = now() + chrono::Duration::seconds(10);
        let second = d
            .detect(&message("my ex again"), &[], &[Arc::clone(&b)], soon)
            .await;
        assert!(second.is_empty());

        // Past the window the trigger counts again
        let later = now() + chrono::Duration::seconds(90);
        let third = d.detect(&message("my ex once more"), &[], &[b], later).await;
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn lexical_fallback_matches_exemplar() {
        let events = detector()
            .detect(&message("I need some space"), &[], &[behavior()], now())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "abandonment-signal");
    }

    #[tokio::test]
    async fn temporal_trigger_picks_largest_rung() {
        let context = vec![ContextEntry {
            message_id: "m-0".to_string(),
            sent_at: now() - chrono::Duration::hours(14),
        }];
        let events = detector()
            .detect(&message("hello again"), &context, &[behavior()], now())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "long-silence");
        assert!((events[0].weight - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn temporal_trigger_below_first_rung_is_silent() {
        let context = vec![ContextEntry {
            message_id: "m-0".to_string(),
            sent_at: now() - chrono::Duration::minutes(20),
        }];
        let events = detector()
            .detect(&message("hello"), &context, &[behavior()], now())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn temporal_trigger_needs_context() {
        let events = detector()
            .detect(&message("hello"), &[], &[behavior()], now())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn classifier_match_resolves_to_trigger() {
        let classifier = Arc::new(FixedClassifier(vec![SemanticMatch {
            label: "abandonment-signal".to_string(),
            confidence: 0.9,
        }]));
        let d = detector().with_classifier(classifier);
        let events = d
            .detect(&message("maybe we should slow down"), &[], &[behavior()], now())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "abandonment-signal");
    }

    #[tokio::test]
    async fn unknown_classifier_label_is_dropped() {
        let classifier = Arc::new(FixedClassifier(vec![SemanticMatch {
            label: "not-a-trigger".to_string(),
            confidence: 0.9,
        }]));
        let d = detector().with_classifier(classifier);
        let events = d
            .detect(&message("maybe we should slow down"), &[], &[behavior()], now())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn low_confidence_classifier_match_is_dropped() {
        let classifier = Arc::new(FixedClassifier(vec![SemanticMatch {
            label: "abandonment-signal".to_string(),
            confidence: 0.2,
        }]));
        let d = detector().with_classifier(classifier);
        let events = d
            .detect(&message("maybe we should slow down"), &[], &[behavior()], now())
            .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn stalled_classifier_degrades_to_lexical() {
        let d = detector().with_classifier(Arc::new(StalledClassifier));
        let events = d
            .detect(&message("i need time alone"), &[], &[behavior()], now())
            .await;
        // Timeout fires, lexical fallback still finds the exemplar
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "abandonment-signal");
    }
}
