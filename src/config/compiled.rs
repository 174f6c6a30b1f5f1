//! Compiled behavior definitions
//!
//! Raw schema types carry durations as humantime strings and patterns as
//! regex source text. Compilation parses both once, at load time, so the
//! hot path never re-parses. A compiled definition is immutable and shared
//! behind `Arc` across the engine, detector, and directive builder.

use std::time::Duration;

use regex::{Regex, RegexBuilder};

use crate::config::schema::{
    BehaviorDefinition, ElapsedRung, PhaseDef, TriggerDef, TriggerPolarity,
};
use crate::error::ConfigError;

/// A behavior definition with all durations and patterns pre-parsed.
#[derive(Debug)]
pub struct CompiledBehavior {
    /// Behavior type name
    pub name: String,

    /// Temperament parameter in [0,1]
    pub volatility: f64,

    /// Configured intensity floor/seed
    pub base_intensity: f64,

    /// Minimum intensity for directive emission
    pub display_threshold: f64,

    /// Decay half-life at volatility 1.0
    pub base_half_life: Duration,

    /// Phase ladder, 1-based phase `k` at index `k - 1`
    pub phases: Vec<CompiledPhase>,

    /// Trigger taxonomy
    pub triggers: Vec<CompiledTrigger>,

    /// Per-behavior warning phase override
    pub warning_phase: Option<u8>,

    /// Per-behavior critical phase override
    pub critical_phase: Option<u8>,
}

/// One compiled phase rung.
#[derive(Debug, Clone)]
pub struct CompiledPhase {
    /// Phase name
    pub name: String,
    /// Intensity threshold to enter this phase from below
    pub enter: f64,
    /// Intensity below which this phase retreats
    pub exit: f64,
    /// Minimum dwell before advancement out of this phase
    pub min_dwell: Duration,
    /// Narrative guidance for the generation pipeline
    pub guidance: String,
}

/// One compiled trigger type.
#[derive(Debug)]
pub struct CompiledTrigger {
    /// Trigger type name
    pub name: String,
    /// Severity weight in [-1,1]
    pub weight: f64,
    /// Conflict vs soothing
    pub polarity: TriggerPolarity,
    /// Compiled case-insensitive patterns
    pub patterns: Vec<Regex>,
    /// Exemplar phrases, lowercased, for the similarity fallback
    pub exemplars: Vec<String>,
    /// Duplicate-suppression window
    pub cooldown: Duration,
    /// Temporal rungs sorted ascending by gap
    pub elapsed: Vec<CompiledRung>,
}

/// One compiled elapsed-time rung.
#[derive(Debug, Clone, Copy)]
pub struct CompiledRung {
    /// Gap since the previous message that activates this rung
    pub after: Duration,
    /// Weight used when this is the largest rung cleared
    pub weight: f64,
}

impl CompiledTrigger {
    /// Whether this trigger matches on elapsed time rather than text.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        !self.elapsed.is_empty()
    }
}

impl CompiledBehavior {
    /// Number of phases `K`; valid phase numbers are `1..=K`.
    #[must_use]
    pub fn phase_count(&self) -> u8 {
        // Ladders are bounded well below u8::MAX by validation
        u8::try_from(self.phases.len()).unwrap_or(u8::MAX)
    }

    /// Returns the phase rung for a 1-based phase number.
    #[must_use]
    pub fn phase(&self, number: u8) -> Option<&CompiledPhase> {
        self.phases.get(usize::from(number).checked_sub(1)?)
    }

    /// Effective decay half-life for this behavior's volatility.
    ///
    /// Higher volatility shortens the half-life. Volatility is floored at a
    /// small epsilon so a zero-volatility profile decays glacially instead
    /// of dividing by zero.
    #[must_use]
    pub fn half_life(&self) -> Duration {
        crate::engine::decay::half_life(self.base_half_life, self.volatility)
    }

    /// Compiles a raw definition, parsing durations and regex patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any duration string or pattern fails to
    /// parse. Value-range checks live in the validator, not here.
    pub fn compile(def: &BehaviorDefinition) -> Result<Self, ConfigError> {
        let base_half_life = parse_duration_field(&def.base_half_life, "base_half_life")?;

        let phases = def
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| compile_phase(p, i))
            .collect::<Result<Vec<_>, _>>()?;

        let triggers = def
            .triggers
            .iter()
            .map(compile_trigger)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: def.name.clone(),
            volatility: def.volatility,
            base_intensity: def.base_intensity,
            display_threshold: def.display_threshold,
            base_half_life,
            phases,
            triggers,
            warning_phase: def.warning_phase,
            critical_phase: def.critical_phase,
        })
    }
}

fn compile_phase(phase: &PhaseDef, index: usize) -> Result<CompiledPhase, ConfigError> {
    let min_dwell = match &phase.min_dwell {
        Some(s) => parse_duration_field(s, &format!("phases[{index}].min_dwell"))?,
        None => Duration::ZERO,
    };
    Ok(CompiledPhase {
        name: phase.name.clone(),
        enter: phase.enter,
        exit: phase.exit,
        min_dwell,
        guidance: phase.guidance.clone(),
    })
}

fn compile_trigger(def: &TriggerDef) -> Result<CompiledTrigger, ConfigError> {
    let patterns = def
        .patterns
        .iter()
        .map(|source| {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    trigger: def.name.clone(),
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cooldown = match &def.cooldown {
        Some(s) => parse_duration_field(s, &format!("triggers.{}.cooldown", def.name))?,
        None => Duration::ZERO,
    };

    let mut elapsed = def
        .elapsed
        .iter()
        .map(|rung| compile_rung(rung, &def.name))
        .collect::<Result<Vec<_>, _>>()?;
    elapsed.sort_by_key(|r| r.after);

    Ok(CompiledTrigger {
        name: def.name.clone(),
        weight: def.weight,
        polarity: def.polarity,
        patterns,
        exemplars: def.exemplars.iter().map(|e| e.to_lowercase()).collect(),
        cooldown,
        elapsed,
    })
}

fn compile_rung(rung: &ElapsedRung, trigger: &str) -> Result<CompiledRung, ConfigError> {
    Ok(CompiledRung {
        after: parse_duration_field(&rung.after, &format!("triggers.{trigger}.elapsed.after"))?,
        weight: rung.weight,
    })
}

/// Parses a humantime duration string, mapping failures to a config error
/// that names the offending field.
pub(crate) fn parse_duration_field(value: &str, field: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|_| ConfigError::InvalidDuration {
        field: field.to_string(),
        value: value.to_string(),
    })
}
