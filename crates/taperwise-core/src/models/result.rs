//! Evaluation outputs: categories, schedules and the aggregate results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Annotation on the first step of every schedule.
pub const INITIAL_DOSE: &str = "initial dose";

/// Annotation on the zero-dose step that ends a schedule.
pub const DISCONTINUATION: &str = "discontinuation";

/// Taper risk category, ordered from lowest to highest risk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    /// Fixed category → strategy mapping.
    pub fn strategy(&self) -> Strategy {
        match self {
            RiskCategory::Low => Strategy::Rapid,
            RiskCategory::Moderate => Strategy::Gradual,
            RiskCategory::High => Strategy::Slow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Moderate => "moderate",
            RiskCategory::High => "high",
        }
    }
}

/// Taper strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Rapid,
    Gradual,
    /// Slow taper with monitoring
    Slow,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Rapid => "rapid",
            Strategy::Gradual => "gradual",
            Strategy::Slow => "slow",
        }
    }
}

/// Which classification rule produced the category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    KnownSuppression,
    HighDoseSustained,
    RecentPulseTherapy,
    ModerateDoseSustained,
    ProlongedUse,
    Default,
}

/// Classifier output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub category: RiskCategory,
    pub strategy: Strategy,
    pub rule: ClassificationRule,
}

/// How a dose was normalized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationBasis {
    /// Converted with the drug's equivalence factor
    Equivalence,
    /// Drug not in the reference table; dose used unchanged
    UnknownDrugPassthrough,
}

/// Reference-equivalent dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedDose {
    /// Generic name after alias expansion
    pub drug_name: String,
    /// Reference compound name (e.g. "prednisone")
    pub reference: String,
    /// Dose in reference-equivalent mg
    pub value: f64,
    pub basis: NormalizationBasis,
}

/// One step in a taper schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleStep {
    /// Weeks since start date
    pub week: u32,
    pub date: NaiveDate,
    /// Daily dose (mg)
    pub dose: f64,
    pub annotation: Option<String>,
}

/// How schedule generation ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScheduleOutcome {
    /// Schedule reaches zero dose
    Complete,
    /// Step ceiling hit before reaching zero; schedule is incomplete
    CeilingReached { max_steps: usize },
}

/// A generated taper schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaperSchedule {
    pub steps: Vec<ScheduleStep>,
    pub outcome: ScheduleOutcome,
}

impl TaperSchedule {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, ScheduleOutcome::Complete)
    }

    /// Total schedule length in weeks.
    pub fn total_weeks(&self) -> u32 {
        self.steps.last().map(|s| s.week).unwrap_or(0)
    }

    /// Date of the last step.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.steps.last().map(|s| s.date)
    }
}

/// Complete taper evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub normalized: NormalizedDose,
    pub classification: Classification,
    pub schedule: TaperSchedule,
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
}

impl EvaluationResult {
    pub fn category(&self) -> RiskCategory {
        self.classification.category
    }

    pub fn strategy(&self) -> Strategy {
        self.classification.strategy
    }

    /// Canonical JSON for fingerprinting.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Cross-titration strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SwitchStrategy {
    /// Stop the source, wait out its half-life, then start the destination
    WashoutThenStart,
    /// Stop the source and start the destination the next day
    DirectSwitch,
    /// Overlapping taper with longer intervals
    CautiousCrossTaper,
    CrossTaper,
}

impl SwitchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchStrategy::WashoutThenStart => "washout_then_start",
            SwitchStrategy::DirectSwitch => "direct_switch",
            SwitchStrategy::CautiousCrossTaper => "cautious_cross_taper",
            SwitchStrategy::CrossTaper => "cross_taper",
        }
    }
}

/// One step of a cross-titration schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchStep {
    pub week: u32,
    pub date: NaiveDate,
    pub source_dose: f64,
    pub destination_dose: f64,
    pub annotation: Option<String>,
}

/// Complete switch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchResult {
    pub normalized: NormalizedDose,
    /// Destination generic name
    pub destination: String,
    /// Destination dose after clamping into its therapeutic range
    pub destination_dose: f64,
    /// True if the equivalent dose fell outside the destination's range
    pub destination_clamped: bool,
    pub strategy: SwitchStrategy,
    pub steps: Vec<SwitchStep>,
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
}

impl SwitchResult {
    /// Canonical JSON for fingerprinting.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
