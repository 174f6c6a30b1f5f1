//! Configuration loading and validation end to end: files on disk, issue
//! reporting, strict mode, and limit enforcement.

mod common;

use std::io::Write;

use limerence::config::loader::{ConfigLimits, ConfigLoader, LoaderOptions};
use limerence::error::ConfigError;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn valid_file_loads_and_compiles() {
    let file = write_temp(common::LADDER_CONFIG);
    let result = ConfigLoader::default().load_file(file.path()).unwrap();

    assert_eq!(result.config.behaviors.len(), 1);
    assert_eq!(result.compiled.len(), 1);
    assert!(result.warnings.is_empty());

    let compiled = &result.compiled[0];
    assert_eq!(compiled.name, "test-pattern");
    assert_eq!(compiled.phase_count(), 4);
    assert_eq!(
        compiled.base_half_life,
        std::time::Duration::from_secs(1800)
    );
}

#[test]
fn missing_file_is_reported() {
    let err = ConfigLoader::default()
        .load_file(std::path::Path::new("/no/such/config.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile { .. }));
}

#[test]
fn broken_yaml_reports_parse_error_with_location() {
    let file = write_temp("behaviors:\n  - name: x\n    phases: [unclosed");
    let err = ConfigLoader::default().load_file(file.path()).unwrap_err();
    match err {
        ConfigError::ParseError { path, .. } => {
            assert!(path.display().to_string().contains("tmp"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn nonmonotonic_ladder_is_rejected_with_paths() {
    let broken = common::LADDER_CONFIG.replace("enter: 0.6", "enter: 0.25");
    let file = write_temp(&broken);
    let err = ConfigLoader::default().load_file(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationError { errors, .. } => {
            assert!(
                errors
                    .iter()
                    .any(|i| i.path.contains("phases[2]") && i.message.contains("increase"))
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn negative_volatility_is_rejected() {
    let broken = common::LADDER_CONFIG.replace("volatility: 0.5", "volatility: -0.1");
    let err = ConfigLoader::default().load_str(&broken).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn bad_duration_is_rejected() {
    let broken = common::LADDER_CONFIG.replace("base_half_life: 30m", "base_half_life: sometime");
    let err = ConfigLoader::default().load_str(&broken).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDuration { .. }));
}

#[test]
fn bad_regex_is_rejected() {
    let broken = common::LADDER_CONFIG.replace(r"patterns: ['\bjab\b']", "patterns: ['[unclosed']");
    let err = ConfigLoader::default().load_str(&broken).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { .. }));
}

#[test]
fn strict_mode_promotes_warnings_to_errors() {
    // A soothing trigger with a positive weight is a warning
    let odd = common::LADDER_CONFIG.replace("weight: -0.3", "weight: 0.3");

    let lenient = ConfigLoader::default().load_str(&odd).unwrap();
    assert_eq!(lenient.warnings.len(), 1);

    let strict = ConfigLoader::new(LoaderOptions {
        strict: true,
        ..LoaderOptions::default()
    });
    assert!(strict.load_str(&odd).is_err());
}

#[test]
fn phase_limit_is_enforced() {
    let loader = ConfigLoader::new(LoaderOptions {
        limits: ConfigLimits {
            max_phases: 2,
            ..ConfigLimits::default()
        },
        ..LoaderOptions::default()
    });
    let err = loader.load_str(common::LADDER_CONFIG).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn engine_section_round_trips() {
    let with_engine = format!(
        "{}engine:\n  trigger_window: 8\n  assessment_cache_ttl: 5s\n",
        common::LADDER_CONFIG
    );
    let result = ConfigLoader::default().load_str(&with_engine).unwrap();
    let engine = result.config.engine.as_ref().unwrap();
    assert_eq!(engine.trigger_window, 8);
    assert_eq!(engine.assessment_cache_ttl.as_deref(), Some("5s"));
}
