//! Error types for `Limerence`
//!
//! Per-domain error enums aggregated into a top-level error with CLI
//! exit-code mapping. Every failure in this subsystem is local and
//! recoverable — behavior modulation is best-effort relative to the host
//! chat pipeline, and nothing here should surface as a hard error to the
//! end user.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `limerence` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Engine error (unknown behavior, profile update conflict)
    pub const ENGINE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `Limerence` operations.
///
/// Aggregates all domain-specific errors and provides a unified interface
/// for error handling and exit code mapping.
#[derive(Debug, Error)]
pub enum LimerenceError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Trigger detection error
    #[error(transparent)]
    Detector(#[from] DetectorError),

    /// Behavior engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Command-line usage error
    #[error("{0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LimerenceError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Engine(_) => ExitCode::ENGINE_ERROR,
            Self::Detector(_) => ExitCode::ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// These errors cover all failure modes during behavior-definition parsing,
/// semantic validation, and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}{}: {message}", line.map_or_else(String::new, |l| format!(" (line {l})")))]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path or label of the configuration source
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// A trigger pattern failed to compile
    #[error("invalid pattern for trigger '{trigger}': {message}")]
    InvalidPattern {
        /// Name of the trigger type carrying the pattern
        trigger: String,
        /// Error message from the regex compiler
        message: String,
    },

    /// A duration string failed to parse
    #[error("invalid duration for '{field}': '{value}'")]
    InvalidDuration {
        /// Name of the field carrying the duration
        field: String,
        /// The unparseable value
        value: String,
    },

    /// One or more configuration files failed validation.
    #[error("{count} file(s) failed validation")]
    ValidationFailed {
        /// Number of files that failed validation.
        count: usize,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., `"behaviors[0].phases[2].enter"`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents the configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Detector Errors
// ============================================================================

/// Trigger detection errors.
///
/// All of these are fail-soft: the detector degrades to keyword-only
/// matching and message processing continues.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The semantic classifier did not answer within its budget
    #[error("semantic classifier timed out after {0:?}")]
    ClassifierTimeout(std::time::Duration),

    /// The semantic classifier returned an error
    #[error("semantic classifier failed: {0}")]
    ClassifierFailed(String),
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Behavior engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced behavior type is not part of the loaded configuration
    #[error("unknown behavior type: {0}")]
    UnknownBehavior(String),

    /// Profile update lost a concurrent-write race too many times
    #[error("profile update conflict for {key} after {attempts} attempts")]
    UpdateConflict {
        /// The (agent, behavior) key that conflicted
        key: String,
        /// Number of attempts made before giving up
        attempts: u32,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `Limerence` operations.
pub type Result<T> = std::result::Result<T, LimerenceError>;

// ============================================================================
// Tests
// ============================================================================
