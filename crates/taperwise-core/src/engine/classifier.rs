//! Risk classification for taper scenarios.
//!
//! Rules are evaluated in priority order and the first match wins. Conditions
//! overlap (a suppressed patient on a high dose matches rules 1 and 2), so the
//! order is part of the contract.

use crate::models::{Classification, ClassificationRule, RiskCategory, SuppressionStatus};

/// Reference-equivalent dose (mg) at or above which sustained use is high risk.
pub const HIGH_DOSE_THRESHOLD: f64 = 20.0;

/// Reference-equivalent dose (mg) at or above which sustained use is moderate risk.
pub const MODERATE_DOSE_THRESHOLD: f64 = 7.5;

/// Weeks of use at which a dose threshold applies.
pub const SUSTAINED_USE_WEEKS: u32 = 3;

/// Weeks of use that are moderate risk at any dose.
pub const PROLONGED_USE_WEEKS: u32 = 4;

/// Classify a taper scenario.
pub fn classify(
    normalized_dose: f64,
    duration_weeks: u32,
    pulse_therapy: bool,
    suppression: SuppressionStatus,
) -> Classification {
    let (category, rule) = if suppression == SuppressionStatus::Yes {
        (RiskCategory::High, ClassificationRule::KnownSuppression)
    } else if normalized_dose >= HIGH_DOSE_THRESHOLD && duration_weeks >= SUSTAINED_USE_WEEKS {
        (RiskCategory::High, ClassificationRule::HighDoseSustained)
    } else if pulse_therapy {
        (RiskCategory::High, ClassificationRule::RecentPulseTherapy)
    } else if normalized_dose >= MODERATE_DOSE_THRESHOLD && duration_weeks >= SUSTAINED_USE_WEEKS {
        (RiskCategory::Moderate, ClassificationRule::ModerateDoseSustained)
    } else if duration_weeks >= PROLONGED_USE_WEEKS {
        (RiskCategory::Moderate, ClassificationRule::ProlongedUse)
    } else {
        (RiskCategory::Low, ClassificationRule::Default)
    };

    Classification {
        category,
        strategy: category.strategy(),
        rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Strategy;

    fn unknown(dose: f64, weeks: u32) -> Classification {
        classify(dose, weeks, false, SuppressionStatus::Unknown)
    }

    #[test]
    fn test_suppression_wins() {
        let c = classify(1.0, 0, false, SuppressionStatus::Yes);
        assert_eq!(c.category, RiskCategory::High);
        assert_eq!(c.rule, ClassificationRule::KnownSuppression);

        // Also matches rule 2, but rule 1 fires first
        let c = classify(40.0, 10, true, SuppressionStatus::Yes);
        assert_eq!(c.rule, ClassificationRule::KnownSuppression);
    }

    #[test]
    fn test_high_dose_boundary() {
        let c = unknown(20.0, 3);
        assert_eq!(c.category, RiskCategory::High);
        assert_eq!(c.rule, ClassificationRule::HighDoseSustained);
        assert_eq!(c.strategy, Strategy::Slow);

        let c = unknown(19.99, 3);
        assert_eq!(c.category, RiskCategory::Moderate);
        assert_eq!(c.rule, ClassificationRule::ModerateDoseSustained);

        // High dose but short duration
        let c = unknown(25.0, 2);
        assert_eq!(c.category, RiskCategory::Low);
        assert_eq!(c.rule, ClassificationRule::Default);
    }

    #[test]
    fn test_pulse_therapy() {
        let c = classify(5.0, 1, true, SuppressionStatus::No);
        assert_eq!(c.category, RiskCategory::High);
        assert_eq!(c.rule, ClassificationRule::RecentPulseTherapy);

        // High-dose rule outranks pulse therapy
        let c = classify(30.0, 5, true, SuppressionStatus::No);
        assert_eq!(c.rule, ClassificationRule::HighDoseSustained);
    }

    #[test]
    fn test_moderate_dose_boundary() {
        assert_eq!(unknown(7.5, 3).rule, ClassificationRule::ModerateDoseSustained);
        assert_eq!(unknown(7.49, 3).category, RiskCategory::Low);
        assert_eq!(unknown(7.5, 2).category, RiskCategory::Low);
    }

    #[test]
    fn test_prolonged_use() {
        let c = unknown(2.5, 4);
        assert_eq!(c.category, RiskCategory::Moderate);
        assert_eq!(c.rule, ClassificationRule::ProlongedUse);
        assert_eq!(c.strategy, Strategy::Gradual);

        assert_eq!(unknown(2.5, 3).category, RiskCategory::Low);
    }

    #[test]
    fn test_suppression_no_is_not_unknown_dependent() {
        assert_eq!(
            classify(10.0, 3, false, SuppressionStatus::No),
            classify(10.0, 3, false, SuppressionStatus::Unknown)
        );
    }
}
