//! Safety gate behavior through the engine: blocked-without-consent
//! clamping, warning levels, and conservative defaults.

mod common;

use chrono::Duration;
use common::{AGENT, ladder_engine, message_at, t0};
use limerence::SafetyLevel;

/// Escalates the ladder behavior to the given phase with dwell-spaced
/// strong messages.
async fn escalate_to(engine: &limerence::BehaviorEngine, phase: u8) -> chrono::DateTime<chrono::Utc> {
    let offsets = [
        Duration::zero(),
        Duration::minutes(15),
        Duration::minutes(75),
    ];
    let steps = usize::from(phase.saturating_sub(1)).min(offsets.len());
    let mut at = t0();
    for (i, offset) in offsets.iter().take(steps).enumerate() {
        at = t0() + *offset;
        let msg = message_at("surge", &format!("esc-{i}"), at);
        engine.apply_message_at(&msg, at).await;
    }
    at
}

#[tokio::test]
async fn critical_phase_without_consent_is_blocked() {
    let engine = ladder_engine();
    let at = escalate_to(&engine, 4).await;
    assert_eq!(engine.behavior_state_at(AGENT, at)[0].current_phase, 4);

    let assessment = engine.safety_assessment_at(AGENT, at);
    assert_eq!(assessment.safety_level, SafetyLevel::Blocked);
    assert_eq!(assessment.cap_for("test-pattern"), Some(3));
    assert!(!assessment.reasons.is_empty());
}

#[tokio::test]
async fn critical_phase_with_consent_is_critical() {
    let engine = ladder_engine();
    let at = escalate_to(&engine, 4).await;

    engine.set_consent(AGENT, true);
    let assessment = engine.safety_assessment_at(AGENT, at);
    assert_eq!(assessment.safety_level, SafetyLevel::Critical);
    assert_eq!(assessment.cap_for("test-pattern"), Some(4));
}

#[tokio::test]
async fn warning_phase_allows_content() {
    let engine = ladder_engine();
    let at = escalate_to(&engine, 3).await;
    assert_eq!(engine.behavior_state_at(AGENT, at)[0].current_phase, 3);

    let assessment = engine.safety_assessment_at(AGENT, at);
    assert_eq!(assessment.safety_level, SafetyLevel::Warning);
    // Warning never clamps
    assert_eq!(assessment.cap_for("test-pattern"), Some(3));
}

#[tokio::test]
async fn consent_defaults_to_denied() {
    // No set_consent call anywhere: the engine must treat the agent as
    // unconsented rather than permissive-by-default.
    let engine = ladder_engine();
    let at = escalate_to(&engine, 4).await;
    let assessment = engine.safety_assessment_at(AGENT, at);
    assert_eq!(assessment.safety_level, SafetyLevel::Blocked);
}

#[tokio::test]
async fn revoking_consent_reblocks() {
    let engine = ladder_engine();
    let at = escalate_to(&engine, 4).await;

    engine.set_consent(AGENT, true);
    assert_eq!(
        engine.safety_assessment_at(AGENT, at).safety_level,
        SafetyLevel::Critical
    );

    engine.set_consent(AGENT, false);
    assert_eq!(
        engine.safety_assessment_at(AGENT, at).safety_level,
        SafetyLevel::Blocked
    );
}

#[tokio::test]
async fn quiet_agent_is_normal() {
    let engine = ladder_engine();
    let assessment = engine.safety_assessment_at(AGENT, t0());
    assert_eq!(assessment.safety_level, SafetyLevel::Normal);
    assert_eq!(assessment.active.len(), 1);
    assert!(assessment.reasons.is_empty());
}

#[tokio::test]
async fn assessment_decays_with_the_clock() {
    let engine = ladder_engine();
    let at = escalate_to(&engine, 4).await;
    assert_eq!(
        engine.safety_assessment_at(AGENT, at).safety_level,
        SafetyLevel::Blocked
    );

    // Hours of silence walk the phase back below the critical threshold.
    let mut level = SafetyLevel::Blocked;
    for hours in 1..=12 {
        level = engine
            .safety_assessment_at(AGENT, at + Duration::hours(hours))
            .safety_level;
    }
    assert_eq!(level, SafetyLevel::Normal);
}
