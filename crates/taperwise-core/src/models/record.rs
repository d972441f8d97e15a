//! Summarized calculation records for saving to the user's history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::case::{PatientCase, ReductionMethod, SwitchCase};
use super::result::{EvaluationResult, SwitchResult};

/// Slug of the corticosteroid taper calculator.
pub const TAPER_SLUG: &str = "steroid-taper";

/// Slug of the antidepressant switch calculator.
pub const SWITCH_SLUG: &str = "antidepressant-switch";

/// A saved calculation: summary line plus key/value details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationRecord {
    /// Unique record ID
    pub id: String,
    /// Calculator display name
    pub name: String,
    /// Calculator slug
    pub slug: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// One-line summary
    pub summary: String,
    /// Input and output details, ordered by key
    pub details: BTreeMap<String, String>,
    /// SHA-256 of the canonical result JSON
    pub fingerprint: String,
}

impl CalculationRecord {
    fn new(name: &str, slug: &str, summary: String, details: BTreeMap<String, String>, canonical_json: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            summary,
            details,
            fingerprint: fingerprint(canonical_json),
        }
    }
}

/// Hex SHA-256 of a canonical JSON payload.
pub fn fingerprint(canonical_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json.as_bytes());
    hex::encode(hasher.finalize())
}

impl EvaluationResult {
    /// One-line summary of the evaluation.
    pub fn summary(&self, case: &PatientCase) -> String {
        let mut summary = format!(
            "{} {} mg for {} weeks: {} risk, {} taper over {} weeks",
            self.normalized.drug_name,
            format_dose(case.dose_mg),
            case.duration_weeks,
            self.category().as_str(),
            self.strategy().as_str(),
            self.schedule.total_weeks(),
        );
        if !self.schedule.is_complete() {
            summary.push_str(" (incomplete)");
        }
        summary
    }

    /// Build a record for the history store.
    pub fn to_record(&self, case: &PatientCase) -> Result<CalculationRecord, serde_json::Error> {
        let mut details = BTreeMap::new();
        details.insert("drug".into(), self.normalized.drug_name.clone());
        details.insert("dose_mg".into(), format_dose(case.dose_mg));
        details.insert("duration_weeks".into(), case.duration_weeks.to_string());
        details.insert(
            format!("{}_equivalent_mg", self.normalized.reference),
            format_dose(self.normalized.value),
        );
        details.insert("category".into(), self.category().as_str().into());
        details.insert("strategy".into(), self.strategy().as_str().into());
        details.insert(
            "method".into(),
            match case.method {
                ReductionMethod::Absolute => "absolute".into(),
                ReductionMethod::Percentage { rate } => format!("{}%", format_dose(rate)),
            },
        );
        details.insert("steps".into(), self.schedule.steps.len().to_string());
        details.insert("start_date".into(), case.start_date.to_string());
        if let Some(end) = self.schedule.end_date() {
            details.insert("end_date".into(), end.to_string());
        }
        details.insert("alerts".into(), self.alerts.len().to_string());

        let json = self.to_canonical_json()?;
        Ok(CalculationRecord::new(
            "Corticosteroid Taper",
            TAPER_SLUG,
            self.summary(case),
            details,
            &json,
        ))
    }
}

impl SwitchResult {
    /// One-line summary of the switch.
    pub fn summary(&self, case: &SwitchCase) -> String {
        format!(
            "{} {} mg to {} {} mg: {}",
            self.normalized.drug_name,
            format_dose(case.source_dose_mg),
            self.destination,
            format_dose(self.destination_dose),
            self.strategy.as_str().replace('_', " "),
        )
    }

    /// Build a record for the history store.
    pub fn to_record(&self, case: &SwitchCase) -> Result<CalculationRecord, serde_json::Error> {
        let mut details = BTreeMap::new();
        details.insert("source".into(), self.normalized.drug_name.clone());
        details.insert("source_dose_mg".into(), format_dose(case.source_dose_mg));
        details.insert("destination".into(), self.destination.clone());
        details.insert("destination_dose_mg".into(), format_dose(self.destination_dose));
        details.insert(
            format!("{}_equivalent_mg", self.normalized.reference),
            format_dose(self.normalized.value),
        );
        details.insert("strategy".into(), self.strategy.as_str().into());
        details.insert("start_date".into(), case.start_date.to_string());
        details.insert("alerts".into(), self.alerts.len().to_string());

        let json = self.to_canonical_json()?;
        Ok(CalculationRecord::new(
            "Antidepressant Switch",
            SWITCH_SLUG,
            self.summary(case),
            details,
            &json,
        ))
    }
}

/// Format a dose without trailing zeros (20 → "20", 7.5 → "7.5").
pub fn format_dose(dose: f64) -> String {
    let rounded = (dose * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
