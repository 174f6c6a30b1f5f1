//! Command-line interface
//!
//! Clap argument definitions and command handlers for the `limerence`
//! binary: library inspection, configuration validation, and transcript
//! replay.

pub mod args;
pub mod commands;
