//! Directive construction: display-threshold filtering, safety capping,
//! and guidance selection.

mod common;

use chrono::Duration;
use common::{AGENT, apply_all, ladder_engine, message_at, t0};

#[tokio::test]
async fn quiet_behavior_emits_no_directive() {
    let engine = ladder_engine();
    // Base intensity 0.1 sits below the 0.2 display threshold
    let directives = engine.prompt_directives_at(AGENT, t0());
    assert!(directives.is_empty());
}

#[tokio::test]
async fn active_behavior_emits_phase_guidance() {
    let engine = ladder_engine();
    let at = apply_all(&engine, &["jab"]).await;

    let directives = engine.prompt_directives_at(AGENT, at);
    assert_eq!(directives.len(), 1);
    assert_eq!(directives[0].behavior, "test-pattern");
    assert_eq!(directives[0].phase, 2);
    assert_eq!(directives[0].narrative_guidance, "show interest");
    assert!(directives[0].intensity >= 0.2);
}

#[tokio::test]
async fn blocked_behavior_is_capped_not_silenced() {
    let engine = ladder_engine();

    // Escalate to phase 4 (critical) without consent
    for (i, offset) in [
        Duration::zero(),
        Duration::minutes(15),
        Duration::minutes(75),
    ]
    .iter()
    .enumerate()
    {
        let at = t0() + *offset;
        engine
            .apply_message_at(&message_at("surge", &format!("m-{i}"), at), at)
            .await;
    }
    let at = t0() + Duration::minutes(75);
    assert_eq!(engine.behavior_state_at(AGENT, at)[0].current_phase, 4);

    let directives = engine.prompt_directives_at(AGENT, at);
    assert_eq!(directives.len(), 1);
    // Clamped one below critical, speaking with the capped phase's voice
    assert_eq!(directives[0].phase, 3);
    assert_eq!(directives[0].narrative_guidance, "press closer");

    // Consent lifts the cap
    engine.set_consent(AGENT, true);
    let directives = engine.prompt_directives_at(AGENT, at);
    assert_eq!(directives[0].phase, 4);
    assert_eq!(directives[0].narrative_guidance, "hold on with everything");
}

#[tokio::test]
async fn decayed_behavior_drops_out_of_directives() {
    let engine = ladder_engine();
    let at = apply_all(&engine, &["jab"]).await;
    assert_eq!(engine.prompt_directives_at(AGENT, at).len(), 1);

    // After enough silence the decayed intensity falls under the display
    // threshold and the behavior stops influencing prompts entirely.
    let later = at + Duration::hours(3);
    assert!(engine.prompt_directives_at(AGENT, later).is_empty());
}

#[tokio::test]
async fn disabled_behavior_emits_nothing() {
    let engine = ladder_engine();
    let at = apply_all(&engine, &["surge"]).await;
    engine.disable_behavior(AGENT, "test-pattern").unwrap();

    assert!(engine.prompt_directives_at(AGENT, at).is_empty());
}
