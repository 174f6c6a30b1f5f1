//! `Limerence` — progressive behavior-state engine for conversational agents
//!
//! This library models escalating and de-escalating psychological behavior
//! patterns (possessive attachment, emotional volatility, ...) as independent
//! finite-state machines per (agent, behavior) key. A continuous intensity
//! value decays over wall-clock time and rises with detected conversational
//! triggers; an ordered phase ladder advances or retreats by at most one
//! level per recomputation; a deterministic safety gate clamps what may
//! reach the generation pipeline.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod detector;
pub mod directive;
pub mod engine;
pub mod error;
pub mod observability;
pub mod safety;
pub mod store;

pub use directive::Directive;
pub use engine::{BehaviorEngine, EngineOptions, InboundMessage, Sentiment, TriggerEvent};
pub use safety::{Policy, SafetyAssessment, SafetyLevel};
