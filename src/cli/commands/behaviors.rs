//! Behavior library command handlers
//!
//! Implements `behaviors list` and `behaviors show`.

use std::fmt::Write as _;

use crate::catalog;
use crate::cli::args::{BehaviorsListArgs, BehaviorsShowArgs, OutputFormat};
use crate::config::schema::BehaviorCategory;
use crate::error::LimerenceError;

/// List available built-in behavior definitions.
///
/// Displays behaviors grouped by category (human) or as a JSON array.
///
/// # Errors
///
/// Returns an I/O error if output serialization fails.
#[allow(clippy::unused_async)]
pub async fn list(args: &BehaviorsListArgs) -> Result<(), LimerenceError> {
    let results = catalog::list_behaviors(args.category, args.tag.as_deref());

    match args.format {
        OutputFormat::Json => {
            let json_entries: Vec<serde_json::Value> = results
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "name": b.name,
                        "description": b.description,
                        "category": b.category.to_string(),
                        "tags": b.tags,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json_entries)?);
        }
        OutputFormat::Human => {
            if results.is_empty() {
                println!("No behaviors match the given filters.");
                return Ok(());
            }

            let total = results.len();
            println!("Built-in Behaviors ({total} available)\n");

            // Group by category in display order
            for cat in BehaviorCategory::all() {
                let in_cat: Vec<_> = results.iter().filter(|b| b.category == *cat).collect();
                if in_cat.is_empty() {
                    continue;
                }

                println!("  {}", cat.label());
                for b in in_cat {
                    println!("    {:<24}{}", b.name, b.description);
                }
                println!();
            }

            println!("Replay against one: limerence replay --behavior <name> --transcript <file>");
            println!("View YAML:          limerence behaviors show <name>");
        }
    }

    Ok(())
}

/// Display the YAML configuration for a built-in behavior.
///
/// Prints raw YAML to stdout, suitable for piping.
///
/// # Errors
///
/// Returns a usage error if the behavior name is not found.
#[allow(clippy::unused_async)]
pub async fn show(args: &BehaviorsShowArgs) -> Result<(), LimerenceError> {
    let behavior = catalog::find_behavior(&args.name).ok_or_else(|| {
        let mut message = format!("Unknown behavior '{}'", args.name);

        if let Some(suggestion) = catalog::suggest_behavior(&args.name) {
            let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
        }

        message.push_str("\n\nAvailable behaviors:");
        for name in catalog::list_behavior_names() {
            if let Some(b) = catalog::find_behavior(name) {
                let _ = write!(message, "\n  {:<24}{}", b.name, b.description);
            }
        }

        message.push_str("\n\nUse 'limerence behaviors list' for full details.");
        LimerenceError::Usage(message)
    })?;

    print!("{}", behavior.yaml);
    Ok(())
}
