//! CLI argument definitions
//!
//! All Clap derive structs for `limerence` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::BehaviorCategory;
use crate::observability::ColorChoice;

// ============================================================================
// Root CLI
// ============================================================================

/// Progressive behavior-state engine for conversational agents.
#[derive(Parser, Debug)]
#[command(name = "limerence", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "LIMERENCE_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the built-in behavior library.
    Behaviors(BehaviorsCommand),

    /// Validate behavior configuration files.
    Validate(ValidateArgs),

    /// Replay a message transcript through an in-memory engine.
    Replay(ReplayArgs),
}

// ============================================================================
// Behaviors Command
// ============================================================================

/// Behavior library commands.
#[derive(Args, Debug)]
pub struct BehaviorsCommand {
    /// Behaviors subcommand.
    #[command(subcommand)]
    pub subcommand: BehaviorsSubcommand,
}

/// Behaviors subcommands.
#[derive(Subcommand, Debug)]
pub enum BehaviorsSubcommand {
    /// List available built-in behavior definitions.
    List(BehaviorsListArgs),

    /// Display the YAML configuration for a built-in behavior.
    Show(BehaviorsShowArgs),
}

/// Arguments for `behaviors list`.
#[derive(Args, Debug)]
pub struct BehaviorsListArgs {
    /// Filter by category.
    #[arg(long)]
    pub category: Option<BehaviorCategory>,

    /// Filter by tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `behaviors show`.
#[derive(Args, Debug)]
pub struct BehaviorsShowArgs {
    /// Name of the built-in behavior.
    pub name: String,
}

// ============================================================================
// Validate Command
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Replay Command
// ============================================================================

/// Arguments for `replay`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").multiple(false))]
pub struct ReplayArgs {
    /// Path to a YAML behavior configuration file.
    #[arg(short, long, group = "source", env = "LIMERENCE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name of a built-in behavior to load instead of a config file.
    #[arg(short, long, group = "source")]
    pub behavior: Option<String>,

    /// Path to the transcript (JSONL of timestamped messages).
    #[arg(short, long)]
    pub transcript: PathBuf,

    /// Agent identity used for every message.
    #[arg(long, default_value = "agent-1")]
    pub agent: String,

    /// Grant the explicit-content consent flag for the replayed agent.
    #[arg(long)]
    pub consent: bool,
}

// ============================================================================
// Shared
// ============================================================================

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and prose.
    #[default]
    Human,
    /// Machine-readable JSON.
    Json,
}
