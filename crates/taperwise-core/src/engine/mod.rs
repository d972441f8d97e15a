//! Dose-tapering computation engine.
//!
//! Pipeline: Validation → Normalization → Classification → {Schedule, Composition}

mod classifier;
mod composer;
mod interactions;
mod messages;
mod normalizer;
mod schedule;
mod switch;

pub use classifier::*;
pub use composer::*;
pub use interactions::*;
pub use messages::*;
pub use normalizer::*;
pub use schedule::*;
pub use switch::*;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, EngineConfig};
use crate::models::{
    DrugTable, DrugTableError, EvaluationResult, PatientCase, SwitchCase, SwitchResult, TaperForm,
};

/// Engine errors. All of them are raised before any stage runs.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown drug: {name}")]
    UnknownDrug { name: String, suggestions: Vec<String> },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Drug table error: {0}")]
    DrugTable(#[from] DrugTableError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Corticosteroid taper engine.
///
/// Holds only immutable reference data; `evaluate` is a pure function of its input.
#[derive(Debug, Clone)]
pub struct TaperEngine {
    normalizer: Normalizer,
    config: EngineConfig,
    catalog: MessageCatalog,
}

impl Default for TaperEngine {
    fn default() -> Self {
        Self::new(Arc::new(DrugTable::corticosteroids()))
    }
}

impl TaperEngine {
    /// Create an engine over a drug table with default config and messages.
    pub fn new(table: Arc<DrugTable>) -> Self {
        Self {
            normalizer: Normalizer::new(table),
            config: EngineConfig::default(),
            catalog: MessageCatalog::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Replace the message catalog.
    pub fn with_catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Evaluate a validated taper case.
    pub fn evaluate(&self, case: &PatientCase) -> EngineResult<EvaluationResult> {
        case.validate().map_err(EngineError::Validation)?;

        let normalized = self.normalizer.normalize(&case.drug_name, case.dose_mg);
        let classification = classify(
            normalized.value,
            case.duration_weeks,
            case.pulse_therapy,
            case.suppression,
        );
        debug!(
            drug = %normalized.drug_name,
            equivalent = normalized.value,
            category = classification.category.as_str(),
            rule = ?classification.rule,
            "Classified taper case"
        );

        // Band tables and rounding are in reference-equivalent mg; steps are shown in the drug's mg.
        let equivalent_schedule = ScheduleGenerator::new(&self.config).generate(
            normalized.value,
            classification.strategy,
            case.method,
            case.start_date,
        );
        let table = self.normalizer.table();
        let schedule = match table.get(&normalized.drug_name) {
            Some(profile) => {
                let reference_factor = table.reference_factor();
                rescale_schedule(equivalent_schedule, case.dose_mg, |eq| {
                    denormalize(profile, eq, reference_factor)
                })
            }
            None => equivalent_schedule,
        };

        let composed = Composer::new(&self.catalog).compose_taper(
            classification.category,
            &case.comorbidities,
            case.mode,
            case.duration_weeks,
            self.config.long_term_weeks,
        );

        Ok(EvaluationResult {
            normalized,
            classification,
            schedule,
            recommendations: composed.recommendations,
            alerts: composed.alerts,
        })
    }

    /// Parse raw form input, then evaluate.
    pub fn evaluate_form(&self, form: &TaperForm) -> EngineResult<(PatientCase, EvaluationResult)> {
        let case = form.parse().map_err(EngineError::Validation)?;
        let result = self.evaluate(&case)?;
        Ok((case, result))
    }
}

/// Antidepressant cross-titration engine.
#[derive(Debug, Clone)]
pub struct SwitchEngine {
    normalizer: Normalizer,
    catalog: MessageCatalog,
}

impl Default for SwitchEngine {
    fn default() -> Self {
        Self::new(Arc::new(DrugTable::antidepressants()))
    }
}

impl SwitchEngine {
    pub fn new(table: Arc<DrugTable>) -> Self {
        Self {
            normalizer: Normalizer::new(table),
            catalog: MessageCatalog::default(),
        }
    }

    /// Replace the message catalog.
    pub fn with_catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Evaluate a switch case.
    ///
    /// An unknown source drug takes the normalizer's passthrough path; an
    /// unknown destination is an error since its range is required.
    pub fn evaluate(&self, case: &SwitchCase) -> EngineResult<SwitchResult> {
        case.validate().map_err(EngineError::Validation)?;

        let table = self.normalizer.table();
        let destination = table.get(&case.destination_drug).ok_or_else(|| EngineError::UnknownDrug {
            name: case.destination_drug.clone(),
            suggestions: self.normalizer.suggest(&case.destination_drug),
        })?;

        let normalized = self.normalizer.normalize(&case.source_drug, case.source_dose_mg);
        if normalized.drug_name == destination.name {
            return Err(EngineError::Validation(
                "Choose a different medication to switch to.".into(),
            ));
        }
        let source = table.get(&normalized.drug_name);

        let equivalent = denormalize(destination, normalized.value, table.reference_factor());
        let destination_dose = round_one_decimal(destination.clamp_to_range(equivalent));
        let destination_clamped = !destination.is_in_range(equivalent);

        let strategy = classify_switch(source, destination);
        debug!(
            source = %normalized.drug_name,
            destination = %destination.name,
            equivalent,
            strategy = strategy.as_str(),
            "Classified switch case"
        );

        let steps = generate_switch_schedule(
            strategy,
            case.source_dose_mg,
            destination,
            destination_dose,
            source.map(|s| s.washout_weeks).unwrap_or(0),
            case.start_date,
        );

        let facts = SwitchFacts {
            strategy,
            source,
            destination,
            destination_dose,
            destination_clamped,
        };
        let composed = Composer::new(&self.catalog).compose_switch(&facts, case.mode);

        Ok(SwitchResult {
            destination: destination.name.clone(),
            normalized,
            destination_dose,
            destination_clamped,
            strategy,
            steps,
            recommendations: composed.recommendations,
            alerts: composed.alerts,
        })
    }
}
