//! Taper schedule generation.
//!
//! Two reduction methods:
//! - Absolute: strategy-specific band table of (reduction, interval) pairs
//! - Percentage: fixed percentage per step, rounded to the dosing increment
//!
//! Bands are half-open: a band applies when `dose > above`, so a dose exactly on
//! an edge (e.g. 40 mg) falls in the lower band.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{
    ReductionMethod, ScheduleOutcome, ScheduleStep, Strategy, TaperSchedule, DISCONTINUATION,
    INITIAL_DOSE,
};

/// One row of a band table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Band {
    /// Band applies when the current dose is strictly above this value (mg)
    pub above: f64,
    /// Amount removed per step (mg)
    pub reduction: f64,
    /// Weeks until the next step
    pub interval_weeks: u32,
}

const fn band(above: f64, reduction: f64, interval_weeks: u32) -> Band {
    Band {
        above,
        reduction,
        interval_weeks,
    }
}

/// Slow taper: fine bands, long intervals.
pub const SLOW_BANDS: &[Band] = &[
    band(40.0, 5.0, 1),
    band(20.0, 5.0, 2),
    band(10.0, 2.5, 2),
    band(5.0, 1.0, 2),
    band(0.0, 1.0, 4),
];

pub const GRADUAL_BANDS: &[Band] = &[
    band(40.0, 10.0, 1),
    band(20.0, 5.0, 1),
    band(10.0, 2.5, 1),
    band(5.0, 2.5, 2),
    band(0.0, 1.0, 2),
];

/// Rapid taper: coarse bands, weekly steps.
pub const RAPID_BANDS: &[Band] = &[
    band(20.0, 10.0, 1),
    band(5.0, 5.0, 1),
    band(0.0, 2.5, 1),
];

/// Band table for a strategy.
pub fn band_table(strategy: Strategy) -> &'static [Band] {
    match strategy {
        Strategy::Rapid => RAPID_BANDS,
        Strategy::Gradual => GRADUAL_BANDS,
        Strategy::Slow => SLOW_BANDS,
    }
}

/// First band (highest to lowest) whose lower edge the dose exceeds.
pub fn select_band(table: &[Band], dose: f64) -> Option<&Band> {
    table.iter().find(|b| dose > b.above)
}

/// Weeks between percentage-method steps.
pub fn percentage_interval(strategy: Strategy) -> u32 {
    match strategy {
        Strategy::Slow => 2,
        Strategy::Rapid | Strategy::Gradual => 1,
    }
}

/// Round to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to the nearest multiple of `increment`.
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    (value / increment).round() * increment
}

/// Date of a week offset.
pub fn date_for_week(start: NaiveDate, week: u32) -> NaiveDate {
    start + Duration::days(7 * i64::from(week))
}

/// Smallest non-zero dose shown after rescaling (mg).
pub const MIN_RESCALED_DOSE: f64 = 0.1;

/// Map a reference-equivalent schedule into a drug's own mg.
///
/// The first step keeps the prescribed dose. Later doses are rounded to one
/// decimal and never rise above the previous step; a step reaches zero only
/// where the equivalent schedule does.
pub fn rescale_schedule<F>(schedule: TaperSchedule, initial_dose: f64, to_drug: F) -> TaperSchedule
where
    F: Fn(f64) -> f64,
{
    let mut previous = initial_dose;
    let steps = schedule
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, mut step)| {
            step.dose = if i == 0 {
                initial_dose
            } else if step.dose <= 0.0 {
                0.0
            } else {
                round_one_decimal(to_drug(step.dose))
                    .max(MIN_RESCALED_DOSE)
                    .min(previous)
            };
            previous = step.dose;
            step
        })
        .collect();

    TaperSchedule {
        steps,
        outcome: schedule.outcome,
    }
}

/// Generates taper schedules under a given configuration.
pub struct ScheduleGenerator<'a> {
    config: &'a EngineConfig,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Generate a schedule for a strategy and reduction method.
    pub fn generate(
        &self,
        initial_dose: f64,
        strategy: Strategy,
        method: ReductionMethod,
        start_date: NaiveDate,
    ) -> TaperSchedule {
        let max_steps = self.config.max_steps.for_strategy(strategy);
        match method {
            ReductionMethod::Absolute => {
                self.generate_with_table(initial_dose, band_table(strategy), max_steps, start_date)
            }
            ReductionMethod::Percentage { rate } => self.generate_percentage(
                initial_dose,
                rate,
                percentage_interval(strategy),
                max_steps,
                start_date,
            ),
        }
    }

    /// Absolute method over an arbitrary band table.
    ///
    /// A dose matching no band, or a band with zero reduction, runs into the
    /// step ceiling and yields [`ScheduleOutcome::CeilingReached`].
    pub fn generate_with_table(
        &self,
        initial_dose: f64,
        table: &[Band],
        max_steps: usize,
        start_date: NaiveDate,
    ) -> TaperSchedule {
        self.run(initial_dose, max_steps, start_date, |current| {
            let band = select_band(table, current)?;
            let next = round_one_decimal((current - band.reduction).max(0.0));
            Some((next, band.interval_weeks))
        })
    }

    fn generate_percentage(
        &self,
        initial_dose: f64,
        rate: f64,
        interval_weeks: u32,
        max_steps: usize,
        start_date: NaiveDate,
    ) -> TaperSchedule {
        let increment = self.config.rounding_increment;
        let floor = self.config.percentage_floor;

        self.run(initial_dose, max_steps, start_date, |current| {
            if current <= floor {
                return Some((0.0, interval_weeks));
            }
            let mut next = round_to_increment(current * (1.0 - rate / 100.0), increment);
            if next >= current {
                // Rounding swallowed the reduction; drop to the next increment below.
                next = ((current / increment).ceil() - 1.0) * increment;
            }
            Some((next.max(floor), interval_weeks))
        })
    }

    /// Shared step loop. `next_step` returns the next dose and the interval to it.
    fn run<F>(&self, initial_dose: f64, max_steps: usize, start_date: NaiveDate, mut next_step: F) -> TaperSchedule
    where
        F: FnMut(f64) -> Option<(f64, u32)>,
    {
        let mut steps = vec![ScheduleStep {
            week: 0,
            date: start_date,
            dose: initial_dose,
            annotation: Some(INITIAL_DOSE.to_string()),
        }];
        let mut current = initial_dose;
        let mut week = 0u32;

        let outcome = loop {
            if current <= 0.0 {
                break ScheduleOutcome::Complete;
            }
            if steps.len() >= max_steps {
                warn!(
                    initial_dose,
                    max_steps,
                    last_dose = current,
                    "Schedule hit step ceiling before discontinuation"
                );
                break ScheduleOutcome::CeilingReached { max_steps };
            }

            let (next, interval) = match next_step(current) {
                Some((dose, interval)) => (dose.clamp(0.0, current), interval),
                None => (current, 0),
            };

            week += interval;
            steps.push(ScheduleStep {
                week,
                date: date_for_week(start_date, week),
                dose: next,
                annotation: (next <= 0.0).then(|| DISCONTINUATION.to_string()),
            });
            current = next;
        };

        debug!(steps = steps.len(), weeks = week, ?outcome, "Generated taper schedule");
        TaperSchedule { steps, outcome }
    }
}
