//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Strategy;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Maximum number of schedule steps per strategy.
///
/// Guarantees termination of schedule generation for any step table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StepCeilings {
    pub rapid: usize,
    pub gradual: usize,
    pub slow: usize,
}

/// Default `MAX_STEPS_PER_STRATEGY`.
pub const MAX_STEPS_PER_STRATEGY: StepCeilings = StepCeilings {
    rapid: 30,
    gradual: 40,
    slow: 50,
};

impl Default for StepCeilings {
    fn default() -> Self {
        MAX_STEPS_PER_STRATEGY
    }
}

impl StepCeilings {
    pub fn for_strategy(&self, strategy: Strategy) -> usize {
        match strategy {
            Strategy::Rapid => self.rapid,
            Strategy::Gradual => self.gradual,
            Strategy::Slow => self.slow,
        }
    }
}

/// Tunable engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Dosing-unit increment for the percentage method (mg)
    pub rounding_increment: f64,
    /// Lowest non-zero dose in the percentage method (mg)
    pub percentage_floor: f64,
    /// Use longer than this many weeks adds the long-term recommendation
    pub long_term_weeks: u32,
    pub max_steps: StepCeilings,
    /// Lines per report page
    pub lines_per_page: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounding_increment: 2.5,
            percentage_floor: 2.5,
            long_term_weeks: 12,
            max_steps: StepCeilings::default(),
            lines_per_page: 40,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rounding_increment.is_finite() && self.rounding_increment > 0.0) {
            return Err(ConfigError::Invalid("rounding_increment must be positive".into()));
        }
        if !(self.percentage_floor.is_finite() && self.percentage_floor > 0.0) {
            return Err(ConfigError::Invalid("percentage_floor must be positive".into()));
        }
        let ceilings = [self.max_steps.rapid, self.max_steps.gradual, self.max_steps.slow];
        if ceilings.iter().any(|&c| c < 2) {
            return Err(ConfigError::Invalid("step ceilings must be at least 2".into()));
        }
        if self.lines_per_page < 10 {
            return Err(ConfigError::Invalid("lines_per_page must be at least 10".into()));
        }
        Ok(())
    }
}
