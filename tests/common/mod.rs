//! Shared helpers for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};

use limerence::config::loader::{ConfigLoader, LoadResult};
use limerence::engine::{BehaviorEngine, InboundMessage, Sentiment};

/// A four-phase behavior with a 1h effective half-life (30m base at
/// volatility 0.5), dwell requirements on the upper rungs, and three text
/// triggers plus a silence ladder. Thresholds: warning at phase 3,
/// critical at phase 4.
pub const LADDER_CONFIG: &str = r"
behaviors:
  - name: test-pattern
    volatility: 0.5
    base_intensity: 0.1
    display_threshold: 0.2
    base_half_life: 30m
    phases:
      - name: calm
        guidance: stay neutral
      - name: keen
        enter: 0.3
        exit: 0.15
        min_dwell: 10m
        guidance: show interest
      - name: intense
        enter: 0.6
        exit: 0.4
        min_dwell: 30m
        guidance: press closer
      - name: consumed
        enter: 0.85
        exit: 0.7
        min_dwell: 1h
        guidance: hold on with everything
    triggers:
      - name: jab
        weight: 0.4
        patterns: ['\bjab\b']
      - name: surge
        weight: 0.9
        patterns: ['\bsurge\b']
      - name: soothe
        weight: -0.3
        polarity: soothing
        patterns: ['\bsoothe\b']
      - name: silence
        weight: 0.5
        elapsed:
          - { after: 3h, weight: 0.2 }
          - { after: 12h, weight: 0.6 }
policy:
  warning_phase: 3
  critical_phase: 4
";

/// A single-phase behavior with a tiny additive trigger, for concurrency
/// stress: no transitions, no clamping in the tested range.
pub const TICK_CONFIG: &str = r"
behaviors:
  - name: tick-pattern
    volatility: 0.5
    base_intensity: 0.0
    display_threshold: 0.9
    base_half_life: 24h
    phases:
      - name: only
        guidance: tick
    triggers:
      - name: tick
        weight: 0.01
        patterns: ['\btick\b']
";

pub const AGENT: &str = "agent-1";

/// Fixed reference instant for deterministic-clock tests.
pub fn t0() -> DateTime<Utc> {
    "2026-01-10T12:00:00Z".parse().unwrap()
}

pub fn load(yaml: &str) -> LoadResult {
    ConfigLoader::default().load_str(yaml).expect("test config loads")
}

/// Engine with the behavior enabled for [`AGENT`] at [`t0`].
pub fn engine_with(yaml: &str, behavior: &str) -> BehaviorEngine {
    let engine = BehaviorEngine::new(&load(yaml)).expect("engine builds");
    engine
        .enable_behavior_at(AGENT, behavior, t0())
        .expect("behavior enables");
    engine
}

pub fn ladder_engine() -> BehaviorEngine {
    engine_with(LADDER_CONFIG, "test-pattern")
}

pub fn message_at(text: &str, id: &str, at: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        agent_id: AGENT.to_string(),
        user_id: "user-1".to_string(),
        message_id: id.to_string(),
        text: text.to_string(),
        sent_at: at,
        sentiment: Some(Sentiment::Neutral),
    }
}

/// Applies `texts` one second apart starting at [`t0`], returning the
/// timestamp after the last message.
pub async fn apply_all(engine: &BehaviorEngine, texts: &[&str]) -> DateTime<Utc> {
    let mut at = t0();
    for (i, text) in texts.iter().enumerate() {
        at = t0() + Duration::seconds(i64::try_from(i).unwrap());
        let msg = message_at(text, &format!("m-{i}"), at);
        engine.apply_message_at(&msg, at).await;
    }
    at
}
