//! Recommendation and alert composition.
//!
//! Decisions select [`MessageKey`]s; the [`MessageCatalog`] supplies the text for
//! the requested mode. Switching modes never changes which keys are selected.

use std::collections::BTreeSet;

use crate::models::{DrugProfile, MessageMode, RiskCategory, SwitchStrategy};

use super::interactions::shared_pathways;
use super::messages::{MessageCatalog, MessageKey};

/// Comorbidities with taper alerts, in output order.
pub const COMORBIDITY_ALERTS: &[(&str, MessageKey)] = &[
    ("diabetes", MessageKey::DiabetesAlert),
    ("hypertension", MessageKey::HypertensionAlert),
    ("osteoporosis", MessageKey::OsteoporosisAlert),
    ("psychiatric_history", MessageKey::PsychiatricHistoryAlert),
    ("active_infection", MessageKey::ActiveInfectionAlert),
    ("peptic_ulcer", MessageKey::PepticUlcerAlert),
];

/// Source drugs with a specific withdrawal alert.
pub const WITHDRAWAL_ALERTS: &[(&str, MessageKey)] = &[
    ("fluoxetine", MessageKey::FluoxetineWashout),
    ("paroxetine", MessageKey::ParoxetineWithdrawal),
    ("venlafaxine", MessageKey::VenlafaxineWithdrawal),
    ("duloxetine", MessageKey::DuloxetineWithdrawal),
    ("desvenlafaxine", MessageKey::DesvenlafaxineWithdrawal),
];

/// Composed output: recommendations and alerts in emission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composed {
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
}

/// Normalize a comorbidity tag ("Peptic ulcer" → "peptic_ulcer").
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Message keys for a taper evaluation: (recommendations, alerts).
pub fn taper_keys(
    category: RiskCategory,
    comorbidities: &BTreeSet<String>,
    duration_weeks: u32,
    long_term_weeks: u32,
) -> (Vec<MessageKey>, Vec<MessageKey>) {
    let mut recommendations = match category {
        RiskCategory::High => vec![MessageKey::HighRiskTaper, MessageKey::HighRiskMonitoring],
        RiskCategory::Moderate => vec![MessageKey::ModerateRiskTaper, MessageKey::ModerateRiskSymptoms],
        RiskCategory::Low => vec![MessageKey::LowRiskTaper],
    };

    let tags: BTreeSet<String> = comorbidities.iter().map(|t| normalize_tag(t)).collect();
    let alerts = COMORBIDITY_ALERTS
        .iter()
        .filter(|(tag, _)| tags.contains(*tag))
        .map(|(_, key)| *key)
        .collect();

    if duration_weeks > long_term_weeks {
        recommendations.push(MessageKey::LongTermUse);
    }
    recommendations.push(MessageKey::AdrenalCrisisWarning);

    (recommendations, alerts)
}

/// Inputs to the switch composer.
pub struct SwitchFacts<'a> {
    pub strategy: SwitchStrategy,
    /// None when the source drug is not in the reference table
    pub source: Option<&'a DrugProfile>,
    pub destination: &'a DrugProfile,
    pub destination_dose: f64,
    pub destination_clamped: bool,
}

/// Composes messages against a catalog.
pub struct Composer<'a> {
    catalog: &'a MessageCatalog,
}

impl<'a> Composer<'a> {
    pub fn new(catalog: &'a MessageCatalog) -> Self {
        Self { catalog }
    }

    /// Compose taper recommendations and alerts.
    pub fn compose_taper(
        &self,
        category: RiskCategory,
        comorbidities: &BTreeSet<String>,
        mode: MessageMode,
        duration_weeks: u32,
        long_term_weeks: u32,
    ) -> Composed {
        let (recommendations, alerts) =
            taper_keys(category, comorbidities, duration_weeks, long_term_weeks);
        Composed {
            recommendations: self.texts(&recommendations, mode),
            alerts: self.texts(&alerts, mode),
        }
    }

    /// Compose switch recommendations and alerts.
    pub fn compose_switch(&self, facts: &SwitchFacts<'_>, mode: MessageMode) -> Composed {
        let strategy_key = match facts.strategy {
            SwitchStrategy::WashoutThenStart => MessageKey::WashoutThenStart,
            SwitchStrategy::DirectSwitch => MessageKey::DirectSwitch,
            SwitchStrategy::CautiousCrossTaper => MessageKey::CautiousCrossTaper,
            SwitchStrategy::CrossTaper => MessageKey::CrossTaper,
        };
        let recommendations = self.texts(&[strategy_key, MessageKey::MoodCrisisWarning], mode);

        let mut alerts = Vec::new();
        if let Some(source) = facts.source {
            if source.class.is_serotonergic_reuptake() && facts.destination.class.is_serotonergic_reuptake() {
                alerts.push(self.catalog.text(MessageKey::SerotoninSyndrome, mode));
            }

            if let Some((_, key)) = WITHDRAWAL_ALERTS.iter().find(|(name, _)| *name == source.name) {
                alerts.push(self.catalog.text(*key, mode));
            }

            let pathways = shared_pathways(source, facts.destination);
            if !pathways.is_empty() {
                alerts.push(self.catalog.render(
                    MessageKey::CypOverlap,
                    mode,
                    &[("pathways", &pathways.join(", "))],
                ));
            }
        }

        if facts.destination_clamped {
            alerts.push(self.catalog.render(
                MessageKey::DestinationDoseClamped,
                mode,
                &[
                    ("dose", &crate::models::format_dose(facts.destination_dose)),
                    ("drug", &facts.destination.name),
                    ("min", &crate::models::format_dose(facts.destination.min_dose)),
                    ("max", &crate::models::format_dose(facts.destination.max_dose)),
                ],
            ));
        }

        Composed {
            recommendations,
            alerts,
        }
    }

    fn texts(&self, keys: &[MessageKey], mode: MessageMode) -> Vec<String> {
        keys.iter().map(|k| self.catalog.text(*k, mode)).collect()
    }
}
