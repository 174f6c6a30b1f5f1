//! Configuration module
//!
//! Loads, validates, and compiles behavior-definition files: phase ladders,
//! trigger taxonomies, and safety policy defaults.

pub mod compiled;
pub mod loader;
pub mod schema;
pub mod validation;

pub use compiled::{CompiledBehavior, CompiledPhase, CompiledTrigger};
pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
