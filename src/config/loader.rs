//! Configuration loader
//!
//! The loading pipeline: read file → YAML parse (with line info on failure)
//! → deserialize to typed config → semantic validation → compile patterns
//! and durations → freeze behind `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::compiled::CompiledBehavior;
use crate::config::schema::BehaviorConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, Severity};

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Treat warnings as errors.
    pub strict: bool,

    /// Limits for configuration size.
    pub limits: ConfigLimits,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            strict: false,
            limits: ConfigLimits::default(),
        }
    }
}

/// Limits on configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of behavior definitions per file.
    pub max_behaviors: usize,

    /// Maximum number of phases per behavior.
    pub max_phases: usize,

    /// Maximum number of trigger types per behavior.
    pub max_triggers: usize,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_behaviors: env_or("LIMERENCE_MAX_BEHAVIORS", 64),
            max_phases: env_or("LIMERENCE_MAX_PHASES", 32),
            max_triggers: env_or("LIMERENCE_MAX_TRIGGERS", 64),
            max_config_size: env_or("LIMERENCE_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

fn env_or(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<BehaviorConfig>,

    /// Compiled behavior definitions, in file order.
    pub compiled: Vec<Arc<CompiledBehavior>>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning emitted during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
///
/// Handles the full pipeline from YAML file to frozen, compiled config.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing files, parse failures, semantic
    /// validation errors, or pattern/duration compilation failures.
    pub fn load_file(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if raw.len() > self.options.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "config".to_string(),
                value: format!("{} bytes", raw.len()),
                expected: format!("at most {} bytes", self.options.limits.max_config_size),
            });
        }
        self.load_named(&raw, &path.display().to_string())
    }

    /// Loads a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`load_file`](Self::load_file), with
    /// `"<inline>"` as the source label.
    pub fn load_str(&self, raw: &str) -> Result<LoadResult, ConfigError> {
        self.load_named(raw, "<inline>")
    }

    fn load_named(&self, raw: &str, label: &str) -> Result<LoadResult, ConfigError> {
        let config: BehaviorConfig =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from(label),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        self.check_limits(&config, label)?;

        let result = Validator::new().validate(&config);
        let fatal = result.has_errors() || (self.options.strict && result.has_warnings());
        if fatal {
            return Err(ConfigError::ValidationError {
                path: label.to_string(),
                errors: result.issues,
            });
        }

        let warnings = result
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .map(|i| LoadWarning {
                message: i.message.clone(),
                location: Some(i.path.clone()),
            })
            .collect::<Vec<_>>();
        for warning in &warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        let compiled = config
            .behaviors
            .iter()
            .map(|b| CompiledBehavior::compile(b).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LoadResult {
            config: Arc::new(config),
            compiled,
            warnings,
        })
    }

    fn check_limits(&self, config: &BehaviorConfig, label: &str) -> Result<(), ConfigError> {
        let limits = &self.options.limits;
        if config.behaviors.len() > limits.max_behaviors {
            return Err(ConfigError::InvalidValue {
                field: format!("{label}: behaviors"),
                value: config.behaviors.len().to_string(),
                expected: format!("at most {}", limits.max_behaviors),
            });
        }
        for behavior in &config.behaviors {
            if behavior.phases.len() > limits.max_phases {
                return Err(ConfigError::InvalidValue {
                    field: format!("{label}: {}.phases", behavior.name),
                    value: behavior.phases.len().to_string(),
                    expected: format!("at most {}", limits.max_phases),
                });
            }
            if behavior.triggers.len() > limits.max_triggers {
                return Err(ConfigError::InvalidValue {
                    field: format!("{label}: {}.triggers", behavior.name),
                    value: behavior.triggers.len().to_string(),
                    expected: format!("at most {}", limits.max_triggers),
                });
            }
        }
        Ok(())
    }
}
