//! Antidepressant cross-titration: switch strategy and schedule.

use chrono::NaiveDate;

use crate::models::{DrugProfile, HalfLife, SwitchStep, SwitchStrategy, DISCONTINUATION, INITIAL_DOSE};

use super::schedule::{date_for_week, round_one_decimal};

/// Number of overlapping stages in a cross-taper.
pub const CROSS_TAPER_STAGES: u32 = 4;

/// Choose a switch strategy. Rules are ordered; the first match wins.
///
/// An unknown source drug has no profile to test and falls through to a plain
/// cross-taper.
pub fn classify_switch(source: Option<&DrugProfile>, destination: &DrugProfile) -> SwitchStrategy {
    let Some(source) = source else {
        return SwitchStrategy::CrossTaper;
    };

    if source.half_life == HalfLife::Long {
        SwitchStrategy::WashoutThenStart
    } else if source.class == destination.class {
        SwitchStrategy::DirectSwitch
    } else if source.class.is_serotonergic_reuptake() && destination.class.is_serotonergic_reuptake() {
        SwitchStrategy::CautiousCrossTaper
    } else {
        SwitchStrategy::CrossTaper
    }
}

/// Build the cross-titration schedule.
///
/// Source doses never increase and destination doses never decrease.
pub fn generate_switch_schedule(
    strategy: SwitchStrategy,
    source_dose: f64,
    destination: &DrugProfile,
    target_dose: f64,
    washout_weeks: u32,
    start_date: NaiveDate,
) -> Vec<SwitchStep> {
    let step = |week: u32, source: f64, dest: f64, annotation: Option<String>| SwitchStep {
        week,
        date: date_for_week(start_date, week),
        source_dose: round_one_decimal(source),
        destination_dose: round_one_decimal(dest),
        annotation,
    };

    let mut steps = vec![step(0, source_dose, 0.0, Some(INITIAL_DOSE.to_string()))];
    let start_label = format!("start {}", destination.name);

    match strategy {
        SwitchStrategy::DirectSwitch => {
            steps.push(step(1, 0.0, target_dose, Some(start_label)));
        }
        SwitchStrategy::CrossTaper | SwitchStrategy::CautiousCrossTaper => {
            let interval = if strategy == SwitchStrategy::CautiousCrossTaper { 2 } else { 1 };
            for stage in 1..=CROSS_TAPER_STAGES {
                let fraction = f64::from(stage) / f64::from(CROSS_TAPER_STAGES);
                let annotation = match stage {
                    1 => Some(start_label.clone()),
                    CROSS_TAPER_STAGES => Some(DISCONTINUATION.to_string()),
                    _ => None,
                };
                steps.push(step(
                    stage * interval,
                    source_dose * (1.0 - fraction),
                    target_dose * fraction,
                    annotation,
                ));
            }
        }
        SwitchStrategy::WashoutThenStart => {
            let washout = washout_weeks.max(1);
            steps.push(step(1, 0.0, 0.0, Some(format!("{}; washout begins", DISCONTINUATION))));

            let start_week = 1 + washout;
            let initial = destination.min_dose.min(target_dose);
            steps.push(step(start_week, 0.0, initial, Some(start_label)));
            if target_dose > initial {
                steps.push(step(start_week + 1, 0.0, target_dose, Some("target dose".to_string())));
            }
        }
    }

    steps
}
