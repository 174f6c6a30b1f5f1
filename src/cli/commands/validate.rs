//! Configuration validation command
//!
//! Implements `validate`: loads each file through the full pipeline and
//! reports per-file issues without starting anything.

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::error::{ConfigError, LimerenceError};

/// Validate configuration files.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationFailed`] when any file fails, so the
/// CLI exits non-zero for scripting.
#[allow(clippy::unused_async)]
pub async fn run(args: &ValidateArgs) -> Result<(), LimerenceError> {
    let loader = ConfigLoader::new(LoaderOptions {
        strict: args.strict,
        ..LoaderOptions::default()
    });

    let mut failures = 0usize;
    let mut reports = Vec::new();

    for path in &args.files {
        match loader.load_file(path) {
            Ok(result) => {
                reports.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "ok": true,
                    "behaviors": result.config.behaviors.len(),
                    "warnings": result.warnings.iter().map(|w| &w.message).collect::<Vec<_>>(),
                }));
                if args.format == OutputFormat::Human {
                    println!(
                        "ok: {} ({} behavior(s), {} warning(s))",
                        path.display(),
                        result.config.behaviors.len(),
                        result.warnings.len()
                    );
                    for warning in &result.warnings {
                        println!(
                            "  warning: {}{}",
                            warning.message,
                            warning
                                .location
                                .as_deref()
                                .map(|l| format!(" at {l}"))
                                .unwrap_or_default()
                        );
                    }
                }
            }
            Err(err) => {
                failures += 1;
                reports.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "ok": false,
                    "error": err.to_string(),
                }));
                if args.format == OutputFormat::Human {
                    println!("failed: {}", path.display());
                    print_error_detail(&err);
                }
            }
        }
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failures > 0 {
        return Err(ConfigError::ValidationFailed { count: failures }.into());
    }
    Ok(())
}

fn print_error_detail(err: &ConfigError) {
    match err {
        ConfigError::ValidationError { errors, .. } => {
            for issue in errors {
                println!("  {issue}");
            }
        }
        other => println!("  {other}"),
    }
}
