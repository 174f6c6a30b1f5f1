//! Transcript replay command
//!
//! Implements `replay`: runs a JSONL transcript of timestamped messages
//! through an in-memory engine with a deterministic clock, streaming audit
//! events to stdout and finishing with the final assessment and directive
//! list. A moderation-and-tuning tool, not a chat server.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::catalog;
use crate::cli::args::ReplayArgs;
use crate::config::loader::{ConfigLoader, LoadResult, LoaderOptions};
use crate::engine::{BehaviorEngine, InboundMessage, Sentiment};
use crate::error::LimerenceError;
use crate::observability::{AuditLog, EventEmitter};

/// One transcript line.
#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    /// When the message was sent.
    at: DateTime<Utc>,
    /// Author; defaults to `"user"`.
    #[serde(default)]
    user_id: Option<String>,
    /// Message text.
    text: String,
    /// Collaborator-supplied sentiment, if any.
    #[serde(default)]
    sentiment: Option<Sentiment>,
}

/// Replay a transcript through the engine.
///
/// # Errors
///
/// Returns a usage error for a missing source or empty transcript, and
/// config/I/O errors from loading.
pub async fn run(args: &ReplayArgs) -> Result<(), LimerenceError> {
    let load = load_source(args)?;
    let entries = read_transcript(args)?;

    let Some(first) = entries.first() else {
        return Err(LimerenceError::Usage(format!(
            "transcript '{}' contains no messages",
            args.transcript.display()
        )));
    };
    let start = first.at;
    let end = entries.last().map_or(start, |e| e.at);

    let engine = BehaviorEngine::new(&load)?;
    let (audit, drain) = AuditLog::spawn(EventEmitter::stdout(), engine.audit_buffer());
    let engine = engine.with_audit(audit);
    engine.set_consent(&args.agent, args.consent);

    let names: Vec<String> = engine
        .behavior_names()
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    for name in &names {
        engine.enable_behavior_at(&args.agent, name, start)?;
    }

    for entry in &entries {
        let msg = InboundMessage {
            agent_id: args.agent.clone(),
            user_id: entry
                .user_id
                .clone()
                .unwrap_or_else(|| "user".to_string()),
            message_id: Uuid::new_v4().to_string(),
            text: entry.text.clone(),
            sent_at: entry.at,
            sentiment: entry.sentiment,
        };
        engine.apply_message_at(&msg, entry.at).await;
    }

    let assessment = engine.safety_assessment_at(&args.agent, end);
    let directives = engine.prompt_directives_at(&args.agent, end);
    let state = engine.behavior_state_at(&args.agent, end);
    let progression = engine.progression_state(&args.agent);

    // Close every audit handle so the drain task can flush and exit
    drop(engine);
    let _ = tokio::time::timeout(Duration::from_secs(5), drain).await;

    let summary = serde_json::json!({
        "messages": entries.len(),
        "assessment": assessment,
        "directives": directives,
        "profiles": state,
        "progression": progression,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_source(args: &ReplayArgs) -> Result<LoadResult, LimerenceError> {
    match (&args.config, &args.behavior) {
        (Some(path), _) => Ok(ConfigLoader::new(LoaderOptions::default()).load_file(path)?),
        (None, Some(name)) => {
            let builtin = catalog::find_behavior(name).ok_or_else(|| {
                let mut message = format!("Unknown behavior '{name}'");
                if let Some(suggestion) = catalog::suggest_behavior(name) {
                    let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
                }
                LimerenceError::Usage(message)
            })?;
            Ok(builtin.load()?)
        }
        (None, None) => Err(LimerenceError::Usage(
            "provide a configuration with --config <file> or --behavior <name>".to_string(),
        )),
    }
}

fn read_transcript(args: &ReplayArgs) -> Result<Vec<TranscriptEntry>, LimerenceError> {
    let raw = std::fs::read_to_string(&args.transcript)?;
    let mut entries = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: TranscriptEntry = serde_json::from_str(line).map_err(|e| {
            LimerenceError::Usage(format!(
                "transcript '{}' line {}: {e}",
                args.transcript.display(),
                i + 1
            ))
        })?;
        entries.push(entry);
    }
    entries.sort_by_key(|e| e.at);
    Ok(entries)
}
