//! Behavior engine
//!
//! The facade the host chat pipeline talks to. Each inbound message flows
//! through trigger detection, the progression ledger, and a serialized
//! per-key recompute of every enabled behavior profile; reads decay lazily
//! and pass through the safety gate before anything reaches the prompt
//! builder. Audit copies of triggers and transitions leave through a
//! fire-and-forget channel, off the critical path.

pub mod decay;
pub mod profile;
pub mod progression;
pub mod recompute;

pub use profile::{BehaviorProfile, PhaseRecord, ProfileKey, ProfileSeed};
pub use progression::{InteractionLedger, ProgressionState};
pub use recompute::{Outcome, PhaseTransition};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::compiled::{CompiledBehavior, parse_duration_field};
use crate::config::loader::LoadResult;
use crate::config::schema::{EngineConfig, PolicyConfig};
use crate::detector::{ContextEntry, SemanticClassifier, TriggerDetector};
use crate::directive::{self, Directive};
use crate::error::{ConfigError, EngineError, LimerenceError};
use crate::observability::{AuditLog, Event};
use crate::safety::{self, Policy, SafetyAssessment, SafetyLevel};
use crate::store::{MemoryStore, ProfileStore, StoreError, TtlCache};

// ============================================================================
// Message types
// ============================================================================

/// Sentiment classification of an inbound message, supplied by the chat
/// pipeline's classifier. Absent classification is treated as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Warm/affirming interaction
    Positive,
    /// Friction/conflict interaction
    Negative,
    /// Neither
    #[default]
    Neutral,
}

/// One inbound user message plus the collaborator-supplied classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Agent the message is addressed to
    pub agent_id: String,
    /// Author of the message
    pub user_id: String,
    /// Message identifier
    pub message_id: String,
    /// Raw message text
    pub text: String,
    /// When the message was sent
    pub sent_at: DateTime<Utc>,
    /// Sentiment from the chat pipeline; `None` means unclassified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

/// A detected conversational trigger. Log-only: events feed the recompute
/// and the audit trail but are never the mutable state themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Behavior type the trigger feeds
    pub behavior: String,
    /// Trigger type name
    pub trigger: String,
    /// Severity weight in [-1,1]; negative weights soothe
    pub weight: f64,
    /// Text (or gap description) the trigger matched on
    pub matched_text: String,
    /// Message the trigger was found in
    pub message_id: String,
    /// When the trigger was detected
    pub detected_at: DateTime<Utc>,
}

// ============================================================================
// Options
// ============================================================================

/// Parsed engine tuning, derived from [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Bound on the per-profile recent trigger window
    pub trigger_window: usize,
    /// Bound on the per-agent recent-message context window
    pub context_window: usize,
    /// TTL for the safety-assessment cache; `None` disables it
    pub assessment_cache_ttl: Option<Duration>,
    /// Budget for a single semantic classifier call
    pub classifier_timeout: Duration,
    /// Capacity of the audit channel
    pub audit_buffer: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            trigger_window: 32,
            context_window: 8,
            assessment_cache_ttl: None,
            classifier_timeout: Duration::from_millis(250),
            audit_buffer: 256,
        }
    }
}

impl EngineOptions {
    /// Parses duration strings out of the raw config section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDuration`] for unparseable values.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let assessment_cache_ttl = config
            .assessment_cache_ttl
            .as_deref()
            .map(|s| parse_duration_field(s, "engine.assessment_cache_ttl"))
            .transpose()?;
        Ok(Self {
            trigger_window: config.trigger_window,
            context_window: config.context_window,
            assessment_cache_ttl,
            classifier_timeout: parse_duration_field(
                &config.classifier_timeout,
                "engine.classifier_timeout",
            )?,
            audit_buffer: config.audit_buffer,
        })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Per-agent behavior state machines behind one facade.
///
/// Every public method has a `*_at` twin taking an explicit `now`; the
/// plain form uses the wall clock. The `*_at` forms exist because decay is
/// a function of elapsed time and tests (or replays) own their clock.
pub struct BehaviorEngine {
    /// Compiled behavior definitions, keyed by name, in file order
    behaviors: IndexMap<String, Arc<CompiledBehavior>>,
    /// Global safety policy thresholds
    policy: PolicyConfig,
    /// Profile record store
    store: Arc<dyn ProfileStore>,
    /// Lifetime interaction counters
    ledger: InteractionLedger,
    /// Trigger detector
    detector: TriggerDetector,
    /// Per-agent explicit-consent flags from the host's settings
    consent: DashMap<String, bool>,
    /// Per-agent recent-message windows
    contexts: DashMap<String, VecDeque<ContextEntry>>,
    /// Safety-assessment cache, invalidated on every applied message
    assessments: TtlCache<SafetyAssessment>,
    /// Fire-and-forget audit channel
    audit: AuditLog,
    /// Parsed tuning
    options: EngineOptions,
}

impl BehaviorEngine {
    /// Builds an engine from a loaded configuration.
    ///
    /// Defaults: in-memory store, keyword-only detection, audit disabled.
    ///
    /// # Errors
    ///
    /// Returns a config error if the engine section carries unparseable
    /// durations.
    pub fn new(load: &LoadResult) -> Result<Self, LimerenceError> {
        let options = load
            .config
            .engine
            .as_ref()
            .map_or_else(|| Ok(EngineOptions::default()), EngineOptions::from_config)?;

        let behaviors: IndexMap<String, Arc<CompiledBehavior>> = load
            .compiled
            .iter()
            .map(|b| (b.name.clone(), Arc::clone(b)))
            .collect();

        Ok(Self {
            behaviors,
            policy: load.config.policy.unwrap_or_default(),
            store: Arc::new(MemoryStore::new()),
            ledger: InteractionLedger::new(),
            detector: TriggerDetector::new(options.classifier_timeout),
            consent: DashMap::new(),
            contexts: DashMap::new(),
            assessments: TtlCache::new(options.assessment_cache_ttl),
            audit: AuditLog::disabled(),
            options,
        })
    }

    /// Attaches a semantic classifier to the detector.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn SemanticClassifier>) -> Self {
        self.detector = self.detector.with_classifier(classifier);
        self
    }

    /// Routes audit events through the given log.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the profile store (e.g. with a persistent backend).
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = store;
        self
    }

    /// Audit-channel capacity from the loaded configuration.
    #[must_use]
    pub const fn audit_buffer(&self) -> usize {
        self.options.audit_buffer
    }

    /// Names of the loaded behavior definitions, in file order.
    #[must_use]
    pub fn behavior_names(&self) -> Vec<&str> {
        self.behaviors.keys().map(String::as_str).collect()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Enables a behavior type for an agent, creating the profile at phase
    /// 1 with intensity at the configured base on first enablement.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownBehavior`] when the behavior is not
    /// part of the loaded configuration.
    pub fn enable_behavior(&self, agent_id: &str, behavior: &str) -> Result<(), EngineError> {
        self.enable_behavior_at(agent_id, behavior, Utc::now())
    }

    /// [`enable_behavior`](Self::enable_behavior) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownBehavior`] when the behavior is not
    /// part of the loaded configuration.
    pub fn enable_behavior_at(
        &self,
        agent_id: &str,
        behavior: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let compiled = self
            .behaviors
            .get(behavior)
            .ok_or_else(|| EngineError::UnknownBehavior(behavior.to_string()))?;

        let key = ProfileKey::new(agent_id, behavior);
        let reenabled = match self.store.update(&key, &mut |p| p.enabled = true) {
            Ok(found) => found,
            // A conflict means the record exists; never clobber it with a
            // fresh profile.
            Err(StoreError::Conflict { attempts }) => {
                warn!(key = %key, attempts, "enable raced a concurrent update; left as-is");
                true
            }
        };
        if !reenabled {
            self.store.upsert(BehaviorProfile::new(
                key,
                profile::ProfileSeed::from(compiled.as_ref()),
                now,
            ));
        }

        info!(agent_id, behavior, reenabled, "behavior enabled");
        self.audit.record(Event::ProfileEnabled {
            timestamp: now,
            agent_id: agent_id.to_string(),
            behavior: behavior.to_string(),
        });
        self.assessments.invalidate(agent_id);
        Ok(())
    }

    /// Freezes a behavior profile: no further trigger application or
    /// decay, but the record survives for audit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownBehavior`] when the behavior is not
    /// part of the loaded configuration.
    pub fn disable_behavior(&self, agent_id: &str, behavior: &str) -> Result<(), EngineError> {
        if !self.behaviors.contains_key(behavior) {
            return Err(EngineError::UnknownBehavior(behavior.to_string()));
        }
        let key = ProfileKey::new(agent_id, behavior);
        let found = match self.store.update(&key, &mut |p| p.enabled = false) {
            Ok(found) => found,
            Err(StoreError::Conflict { attempts }) => {
                warn!(key = %key, attempts, "disable raced a concurrent update; retry required");
                false
            }
        };
        if found {
            info!(agent_id, behavior, "behavior disabled");
            self.audit.record(Event::ProfileDisabled {
                timestamp: Utc::now(),
                agent_id: agent_id.to_string(),
                behavior: behavior.to_string(),
            });
            self.assessments.invalidate(agent_id);
        }
        Ok(())
    }

    /// Records the host-supplied explicit-consent flag for an agent.
    pub fn set_consent(&self, agent_id: &str, consent: bool) {
        self.consent.insert(agent_id.to_string(), consent);
        self.assessments.invalidate(agent_id);
    }

    // ------------------------------------------------------------------
    // Message application
    // ------------------------------------------------------------------

    /// Processes one inbound message: detects triggers, bumps the
    /// progression counters, and recomputes every enabled profile.
    ///
    /// Returns the detected trigger events. Trigger application is
    /// best-effort: a profile that cannot be updated is skipped with a log
    /// and the host's chat reply proceeds regardless.
    pub async fn apply_message(&self, msg: &InboundMessage) -> Vec<TriggerEvent> {
        self.apply_message_at(msg, Utc::now()).await
    }

    /// [`apply_message`](Self::apply_message) with an explicit clock.
    pub async fn apply_message_at(
        &self,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Vec<TriggerEvent> {
        let context = self.context_snapshot(&msg.agent_id);
        let enabled = self.enabled_behaviors(&msg.agent_id);
        let events = self.detector.detect(msg, &context, &enabled, now).await;

        self.ledger
            .record(&msg.agent_id, msg.sentiment.unwrap_or_default());
        let stability = self.ledger.stability_multiplier(&msg.agent_id);

        for behavior in &enabled {
            let for_behavior: Vec<TriggerEvent> = events
                .iter()
                .filter(|e| e.behavior == behavior.name)
                .cloned()
                .collect();
            self.recompute_profile(&msg.agent_id, behavior, &for_behavior, stability, now);
        }

        for event in &events {
            self.audit.record(Event::TriggerDetected {
                timestamp: event.detected_at,
                agent_id: msg.agent_id.clone(),
                behavior: event.behavior.clone(),
                trigger: event.trigger.clone(),
                weight: event.weight,
                message_id: event.message_id.clone(),
            });
        }

        self.push_context(msg);
        self.assessments.invalidate(&msg.agent_id);
        events
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current behavior profiles for an agent, decayed to the wall clock.
    #[must_use]
    pub fn behavior_state(&self, agent_id: &str) -> Vec<BehaviorProfile> {
        self.behavior_state_at(agent_id, Utc::now())
    }

    /// [`behavior_state`](Self::behavior_state) with an explicit clock.
    ///
    /// Reads recompute: decay applies lazily and a phase may retreat here
    /// without any message arriving. Recomputing twice at the same instant
    /// is a no-op.
    #[must_use]
    pub fn behavior_state_at(&self, agent_id: &str, now: DateTime<Utc>) -> Vec<BehaviorProfile> {
        for behavior in self.behaviors.values() {
            self.recompute_profile(agent_id, behavior, &[], 1.0, now);
        }
        self.store.agent_profiles(agent_id)
    }

    /// Safety assessment for an agent under the effective policy.
    #[must_use]
    pub fn safety_assessment(&self, agent_id: &str) -> SafetyAssessment {
        self.safety_assessment_at(agent_id, Utc::now())
    }

    /// [`safety_assessment`](Self::safety_assessment) with an explicit clock.
    #[must_use]
    pub fn safety_assessment_at(&self, agent_id: &str, now: DateTime<Utc>) -> SafetyAssessment {
        if let Some(cached) = self.assessments.get(agent_id) {
            return cached;
        }
        let profiles = self.behavior_state_at(agent_id, now);
        let assessment = self.assess(agent_id, &profiles, now);
        self.assessments.set(agent_id, assessment.clone());
        assessment
    }

    /// Aggregated progression record for an agent: lifetime counters plus
    /// the current intensity snapshot. Reads the stored profiles as-is,
    /// without applying decay.
    #[must_use]
    pub fn progression_state(&self, agent_id: &str) -> ProgressionState {
        let (total, positive, negative) = self.ledger.counts(agent_id);
        let profiles = self.store.agent_profiles(agent_id);
        ProgressionState {
            agent_id: agent_id.to_string(),
            total_interactions: total,
            positive_interactions: positive,
            negative_interactions: negative,
            stability_multiplier: self.ledger.stability_multiplier(agent_id),
            current_intensities: profiles
                .iter()
                .map(|p| (p.key.behavior.clone(), p.current_intensity))
                .collect(),
            last_calculated_at: profiles.iter().map(|p| p.last_calculated_at).max(),
        }
    }

    /// Post-clamp, post-threshold directives for the generation pipeline.
    #[must_use]
    pub fn prompt_directives(&self, agent_id: &str) -> Vec<Directive> {
        self.prompt_directives_at(agent_id, Utc::now())
    }

    /// [`prompt_directives`](Self::prompt_directives) with an explicit clock.
    #[must_use]
    pub fn prompt_directives_at(&self, agent_id: &str, now: DateTime<Utc>) -> Vec<Directive> {
        let profiles = self.behavior_state_at(agent_id, now);
        let assessment = self.assess(agent_id, &profiles, now);
        directive::build(&profiles, &assessment, &self.behaviors)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Runs the gate over refreshed profiles and audits any clamps.
    fn assess(
        &self,
        agent_id: &str,
        profiles: &[BehaviorProfile],
        now: DateTime<Utc>,
    ) -> SafetyAssessment {
        let consent = self.consent.get(agent_id).is_some_and(|v| *v);
        let policy = Policy::from_config(self.policy, consent);
        let assessment = safety::evaluate(profiles, &self.behaviors, &policy);

        for active in assessment
            .active
            .iter()
            .filter(|a| a.level == SafetyLevel::Blocked)
        {
            metrics::counter!("limerence_safety_blocks_total").increment(1);
            self.audit.record(Event::SafetyBlocked {
                timestamp: now,
                agent_id: agent_id.to_string(),
                behavior: active.behavior.clone(),
                phase: active.phase,
                effective_phase_cap: active.effective_phase_cap,
            });
        }

        assessment
    }

    /// Serialized read-modify-write of one profile.
    ///
    /// The recompute runs on a scratch copy under the store's per-key
    /// guard and the result is committed as a whole — an aborted
    /// computation leaves the stored profile untouched.
    fn recompute_profile(
        &self,
        agent_id: &str,
        behavior: &Arc<CompiledBehavior>,
        triggers: &[TriggerEvent],
        stability: f64,
        now: DateTime<Utc>,
    ) -> Option<Outcome> {
        let key = ProfileKey::new(agent_id, &behavior.name);
        let mut outcome = None;
        let started = std::time::Instant::now();

        let result = self.store.update(&key, &mut |profile| {
            if !profile.enabled {
                return;
            }
            let mut scratch = profile.clone();
            for event in triggers {
                scratch.push_trigger(event.clone(), self.options.trigger_window);
            }
            let o = recompute::recompute(&mut scratch, behavior, triggers, stability, now);
            *profile = scratch;
            outcome = Some(o);
        });

        match result {
            Ok(_) => {}
            Err(StoreError::Conflict { attempts }) => {
                warn!(
                    key = %key,
                    attempts,
                    "profile update conflict; skipping trigger application for this message"
                );
                metrics::counter!("limerence_update_conflicts_total").increment(1);
                return None;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("limerence_recompute_duration_us")
            .record(started.elapsed().as_micros() as f64);

        if let Some(o) = &outcome {
            if let Some(t) = &o.transition {
                let direction = if t.is_advance() { "advance" } else { "retreat" };
                info!(
                    key = %key,
                    from = t.from_phase,
                    to = t.to_phase,
                    direction,
                    reason = %t.reason,
                    "phase transition"
                );
                metrics::counter!(
                    "limerence_phase_transitions_total",
                    "direction" => direction
                )
                .increment(1);
                let event = if t.is_advance() {
                    Event::PhaseAdvanced {
                        timestamp: now,
                        agent_id: agent_id.to_string(),
                        behavior: t.behavior.clone(),
                        from_phase: t.from_phase,
                        to_phase: t.to_phase,
                        intensity: o.intensity,
                        reason: t.reason.clone(),
                    }
                } else {
                    Event::PhaseRetreated {
                        timestamp: now,
                        agent_id: agent_id.to_string(),
                        behavior: t.behavior.clone(),
                        from_phase: t.from_phase,
                        to_phase: t.to_phase,
                        intensity: o.intensity,
                        reason: t.reason.clone(),
                    }
                };
                self.audit.record(event);
            } else {
                debug!(key = %key, intensity = o.intensity, phase = o.phase, "recomputed");
            }
        }

        outcome
    }

    /// Behaviors with an enabled profile for this agent.
    fn enabled_behaviors(&self, agent_id: &str) -> Vec<Arc<CompiledBehavior>> {
        self.behaviors
            .values()
            .filter(|b| {
                self.store
                    .load(&ProfileKey::new(agent_id, &b.name))
                    .is_some_and(|p| p.enabled)
            })
            .map(Arc::clone)
            .collect()
    }

    fn context_snapshot(&self, agent_id: &str) -> Vec<ContextEntry> {
        self.contexts
            .get(agent_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push_context(&self, msg: &InboundMessage) {
        let mut window = self.contexts.entry(msg.agent_id.clone()).or_default();
        window.push_back(ContextEntry {
            message_id: msg.message_id.clone(),
            sent_at: msg.sent_at,
        });
        while window.len() > self.options.context_window {
            window.pop_front();
        }
    }
}

impl std::fmt::Debug for BehaviorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorEngine")
            .field("behaviors", &self.behaviors.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
