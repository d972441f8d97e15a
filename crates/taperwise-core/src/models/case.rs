//! Patient case models: the validated inputs to an evaluation.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Known adrenal (HPA axis) suppression status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionStatus {
    Yes,
    No,
    #[default]
    Unknown,
}

impl SuppressionStatus {
    /// Parse a form value. Empty input means unknown.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" => Some(Self::Yes),
            "no" | "n" | "false" => Some(Self::No),
            "" | "unknown" | "?" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// How each taper step reduces the dose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReductionMethod {
    /// Strategy-specific band table of fixed reductions
    Absolute,
    /// Fixed percentage of the current dose per step
    Percentage { rate: f64 },
}

/// Phrasing track for composed messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageMode {
    #[default]
    Clinical,
    Patient,
}

/// A validated taper scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientCase {
    /// Patient identifier (display only)
    pub patient_id: Option<String>,
    pub drug_name: String,
    /// Current daily dose (mg)
    pub dose_mg: f64,
    pub duration_weeks: u32,
    pub pulse_therapy: bool,
    pub suppression: SuppressionStatus,
    /// Comorbidity tags, lowercase
    pub comorbidities: BTreeSet<String>,
    /// Route of administration (display only)
    pub route: Option<String>,
    pub start_date: NaiveDate,
    pub method: ReductionMethod,
    pub mode: MessageMode,
}

impl PatientCase {
    /// Create a case with required fields and defaults for the rest.
    pub fn new(drug_name: &str, dose_mg: f64, duration_weeks: u32, start_date: NaiveDate) -> Self {
        Self {
            patient_id: None,
            drug_name: drug_name.to_string(),
            dose_mg,
            duration_weeks,
            pulse_therapy: false,
            suppression: SuppressionStatus::Unknown,
            comorbidities: BTreeSet::new(),
            route: None,
            start_date,
            method: ReductionMethod::Absolute,
            mode: MessageMode::Clinical,
        }
    }

    /// Add a comorbidity tag (stored lowercase).
    pub fn with_comorbidity(mut self, tag: &str) -> Self {
        self.comorbidities.insert(tag.trim().to_lowercase());
        self
    }

    /// Check required fields. Returns a single user-facing message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.drug_name.trim().is_empty() {
            return Err("Please select a medication.".into());
        }
        if !self.dose_mg.is_finite() || self.dose_mg <= 0.0 {
            return Err("Current dose must be a number greater than zero.".into());
        }
        if let ReductionMethod::Percentage { rate } = self.method {
            if !rate.is_finite() || rate <= 0.0 || rate >= 100.0 {
                return Err("Reduction percentage must be between 0 and 100.".into());
            }
        }
        Ok(())
    }
}

/// Raw calculator form input, as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaperForm {
    pub patient_id: String,
    pub drug_name: String,
    pub dose_mg: String,
    pub duration_weeks: String,
    pub pulse_therapy: bool,
    pub suppression: String,
    /// Comma-separated comorbidity tags
    pub comorbidities: String,
    pub route: String,
    /// ISO date (YYYY-MM-DD)
    pub start_date: String,
    /// Empty for the absolute method, otherwise a percentage
    pub percentage_rate: String,
    pub patient_mode: bool,
}

impl TaperForm {
    /// Parse into a validated case. Missing and non-numeric fields block computation.
    pub fn parse(&self) -> Result<PatientCase, String> {
        let drug_name = self.drug_name.trim();
        if drug_name.is_empty() {
            return Err("Please select a medication.".into());
        }

        let dose_mg = parse_required_number(&self.dose_mg, "Current dose")?;
        let duration = parse_required_number(&self.duration_weeks, "Duration of use")?;
        if duration < 0.0 || duration.fract() != 0.0 || duration > f64::from(u32::MAX) {
            return Err("Duration of use must be a whole number of weeks.".into());
        }

        let suppression = SuppressionStatus::parse(&self.suppression)
            .ok_or_else(|| "Adrenal suppression must be yes, no or unknown.".to_string())?;

        let start_date = NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d")
            .map_err(|_| "Start date must be a valid date (YYYY-MM-DD).".to_string())?;

        let method = if self.percentage_rate.trim().is_empty() {
            ReductionMethod::Absolute
        } else {
            let rate = parse_required_number(&self.percentage_rate, "Reduction percentage")?;
            ReductionMethod::Percentage { rate }
        };

        let case = PatientCase {
            patient_id: non_empty(&self.patient_id),
            drug_name: drug_name.to_string(),
            dose_mg,
            duration_weeks: duration as u32,
            pulse_therapy: self.pulse_therapy,
            suppression,
            comorbidities: parse_tags(&self.comorbidities),
            route: non_empty(&self.route),
            start_date,
            method,
            mode: if self.patient_mode {
                MessageMode::Patient
            } else {
                MessageMode::Clinical
            },
        };

        case.validate()?;
        Ok(case)
    }
}

/// A validated antidepressant switch scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchCase {
    pub patient_id: Option<String>,
    pub source_drug: String,
    /// Current daily dose of the source drug (mg)
    pub source_dose_mg: f64,
    pub destination_drug: String,
    pub start_date: NaiveDate,
    pub mode: MessageMode,
}

impl SwitchCase {
    /// Create a switch case with required fields.
    pub fn new(source_drug: &str, source_dose_mg: f64, destination_drug: &str, start_date: NaiveDate) -> Self {
        Self {
            patient_id: None,
            source_drug: source_drug.to_string(),
            source_dose_mg,
            destination_drug: destination_drug.to_string(),
            start_date,
            mode: MessageMode::Clinical,
        }
    }

    /// Check required fields. Returns a single user-facing message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_drug.trim().is_empty() || self.destination_drug.trim().is_empty() {
            return Err("Please select both the current and the new medication.".into());
        }
        if !self.source_dose_mg.is_finite() || self.source_dose_mg <= 0.0 {
            return Err("Current dose must be a number greater than zero.".into());
        }
        Ok(())
    }
}

fn parse_required_number(value: &str, field: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required.", field));
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{} must be a number.", field))
}

fn parse_tags(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> TaperForm {
        TaperForm {
            drug_name: "prednisone".into(),
            dose_mg: "20".into(),
            duration_weeks: "3".into(),
            start_date: "2024-03-01".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let case = valid_form().parse().unwrap();
        assert_eq!(case.drug_name, "prednisone");
        assert_eq!(case.dose_mg, 20.0);
        assert_eq!(case.duration_weeks, 3);
        assert_eq!(case.suppression, SuppressionStatus::Unknown);
        assert_eq!(case.method, ReductionMethod::Absolute);
        assert_eq!(case.mode, MessageMode::Clinical);
        assert!(case.patient_id.is_none());
    }

    #[test]
    fn test_parse_decimal_comma() {
        let mut form = valid_form();
        form.dose_mg = "7,5".into();
        assert_eq!(form.parse().unwrap().dose_mg, 7.5);
    }

    #[test]
    fn test_missing_dose_blocks() {
        let mut form = valid_form();
        form.dose_mg = "  ".into();
        assert_eq!(form.parse().unwrap_err(), "Current dose is required.");
    }

    #[test]
    fn test_non_numeric_dose_blocks() {
        let mut form = valid_form();
        form.dose_mg = "twenty".into();
        assert_eq!(form.parse().unwrap_err(), "Current dose must be a number.");
    }

    #[test]
    fn test_zero_dose_blocks() {
        let mut form = valid_form();
        form.dose_mg = "0".into();
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_negative_or_fractional_duration_blocks() {
        let mut form = valid_form();
        form.duration_weeks = "-1".into();
        assert!(form.parse().is_err());

        form.duration_weeks = "2.5".into();
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_oversized_duration_blocks() {
        let mut form = valid_form();
        form.duration_weeks = "1e12".into();
        assert_eq!(
            form.parse().unwrap_err(),
            "Duration of use must be a whole number of weeks."
        );

        form.duration_weeks = u32::MAX.to_string();
        assert_eq!(form.parse().unwrap().duration_weeks, u32::MAX);
    }

    #[test]
    fn test_bad_date_blocks() {
        let mut form = valid_form();
        form.start_date = "03/01/2024".into();
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_percentage_and_tags() {
        let mut form = valid_form();
        form.percentage_rate = "10".into();
        form.comorbidities = "Diabetes, hypertension,,".into();
        form.suppression = "YES".into();
        form.patient_mode = true;

        let case = form.parse().unwrap();
        assert_eq!(case.method, ReductionMethod::Percentage { rate: 10.0 });
        assert_eq!(case.comorbidities.len(), 2);
        assert!(case.comorbidities.contains("diabetes"));
        assert_eq!(case.suppression, SuppressionStatus::Yes);
        assert_eq!(case.mode, MessageMode::Patient);
    }

    #[test]
    fn test_percentage_out_of_range_blocks() {
        let mut form = valid_form();
        form.percentage_rate = "100".into();
        assert!(form.parse().is_err());
    }

    #[test]
    fn test_switch_case_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(SwitchCase::new("fluoxetine", 20.0, "escitalopram", date).validate().is_ok());
        assert!(SwitchCase::new("fluoxetine", 0.0, "escitalopram", date).validate().is_err());
        assert!(SwitchCase::new("fluoxetine", 20.0, " ", date).validate().is_err());
    }
}
