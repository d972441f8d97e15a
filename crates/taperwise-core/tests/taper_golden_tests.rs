//! Golden tests for the corticosteroid taper engine.
//!
//! These tests verify classification and schedules against known cases.

use chrono::NaiveDate;
use taperwise_core::engine::TaperEngine;
use taperwise_core::models::{
    ClassificationRule, MessageMode, PatientCase, ReductionMethod, RiskCategory, ScheduleOutcome,
    Strategy, SuppressionStatus, TaperForm, DISCONTINUATION, INITIAL_DOSE,
};

/// Test case with expected outputs.
struct GoldenCase {
    id: &'static str,
    drug: &'static str,
    dose: f64,
    weeks: u32,
    pulse: bool,
    suppression: SuppressionStatus,
    expected_equivalent: f64,
    expected_category: RiskCategory,
    expected_rule: ClassificationRule,
    expected_doses: &'static [f64],
    expected_last_week: u32,
}

const SLOW_FROM_20: &[f64] = &[
    20.0, 17.5, 15.0, 12.5, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0,
];

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "prednisone-20mg-3wk",
            drug: "prednisone",
            dose: 20.0,
            weeks: 3,
            pulse: false,
            suppression: SuppressionStatus::Unknown,
            expected_equivalent: 20.0,
            expected_category: RiskCategory::High,
            expected_rule: ClassificationRule::HighDoseSustained,
            expected_doses: SLOW_FROM_20,
            expected_last_week: 38,
        },
        GoldenCase {
            id: "medrol-short-course",
            drug: "Medrol",
            dose: 8.0,
            weeks: 2,
            pulse: false,
            suppression: SuppressionStatus::No,
            expected_equivalent: 10.0,
            expected_category: RiskCategory::Low,
            expected_rule: ClassificationRule::Default,
            expected_doses: &[8.0, 4.0, 2.0, 0.0],
            expected_last_week: 3,
        },
        GoldenCase {
            id: "hydrocortisone-pulse",
            drug: "cortef",
            dose: 20.0,
            weeks: 1,
            pulse: true,
            suppression: SuppressionStatus::Unknown,
            expected_equivalent: 5.0,
            expected_category: RiskCategory::High,
            expected_rule: ClassificationRule::RecentPulseTherapy,
            expected_doses: &[20.0, 16.0, 12.0, 8.0, 4.0, 0.0],
            expected_last_week: 20,
        },
        GoldenCase {
            id: "prednisone-low-dose-prolonged",
            drug: "prednisone",
            dose: 5.0,
            weeks: 6,
            pulse: false,
            suppression: SuppressionStatus::Unknown,
            expected_equivalent: 5.0,
            expected_category: RiskCategory::Moderate,
            expected_rule: ClassificationRule::ProlongedUse,
            expected_doses: &[5.0, 4.0, 3.0, 2.0, 1.0, 0.0],
            expected_last_week: 10,
        },
        GoldenCase {
            id: "prednisone-60mg-crosses-40-edge",
            drug: "prednisone",
            dose: 60.0,
            weeks: 8,
            pulse: false,
            suppression: SuppressionStatus::No,
            expected_equivalent: 60.0,
            expected_category: RiskCategory::High,
            expected_rule: ClassificationRule::HighDoseSustained,
            expected_doses: &[
                60.0, 55.0, 50.0, 45.0, 40.0, 35.0, 30.0, 25.0, 20.0, 17.5, 15.0, 12.5, 10.0, 9.0,
                8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0,
            ],
            expected_last_week: 50,
        },
        GoldenCase {
            id: "hydrocortisone-240mg-top-of-range",
            drug: "hydrocortisone",
            dose: 240.0,
            weeks: 4,
            pulse: false,
            suppression: SuppressionStatus::No,
            expected_equivalent: 60.0,
            expected_category: RiskCategory::High,
            expected_rule: ClassificationRule::HighDoseSustained,
            expected_doses: &[
                240.0, 220.0, 200.0, 180.0, 160.0, 140.0, 120.0, 100.0, 80.0, 70.0, 60.0, 50.0,
                40.0, 36.0, 32.0, 28.0, 24.0, 20.0, 16.0, 12.0, 8.0, 4.0, 0.0,
            ],
            expected_last_week: 50,
        },
        GoldenCase {
            id: "known-suppression-low-dose",
            drug: "prednisolone",
            dose: 2.0,
            weeks: 1,
            pulse: false,
            suppression: SuppressionStatus::Yes,
            expected_equivalent: 2.0,
            expected_category: RiskCategory::High,
            expected_rule: ClassificationRule::KnownSuppression,
            expected_doses: &[2.0, 1.0, 0.0],
            expected_last_week: 8,
        },
    ]
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn make_case(golden: &GoldenCase) -> PatientCase {
    let mut case = PatientCase::new(golden.drug, golden.dose, golden.weeks, start());
    case.pulse_therapy = golden.pulse;
    case.suppression = golden.suppression;
    case
}

#[test]
fn test_golden_cases() {
    let engine = TaperEngine::default();

    for golden in get_golden_cases() {
        let result = engine.evaluate(&make_case(&golden)).unwrap();

        assert!(
            (result.normalized.value - golden.expected_equivalent).abs() < 1e-9,
            "Case {}: equivalent mismatch - expected {}, got {}",
            golden.id,
            golden.expected_equivalent,
            result.normalized.value
        );
        assert_eq!(result.category(), golden.expected_category, "Case {}: category mismatch", golden.id);
        assert_eq!(result.classification.rule, golden.expected_rule, "Case {}: rule mismatch", golden.id);
        assert_eq!(
            result.strategy(),
            golden.expected_category.strategy(),
            "Case {}: strategy mismatch",
            golden.id
        );

        let doses: Vec<f64> = result.schedule.steps.iter().map(|s| s.dose).collect();
        assert_eq!(doses, golden.expected_doses, "Case {}: dose sequence mismatch", golden.id);
        assert_eq!(
            result.schedule.total_weeks(),
            golden.expected_last_week,
            "Case {}: last week mismatch",
            golden.id
        );
        assert_eq!(result.schedule.outcome, ScheduleOutcome::Complete, "Case {}: incomplete", golden.id);
    }
}

fn assert_tapers_to_zero(id: &str, doses: &[f64]) {
    assert_eq!(doses.last().copied(), Some(0.0), "{}: must end at zero", id);
    for pair in doses.windows(2) {
        assert!(pair[1] <= pair[0], "{}: dose rose {:?}", id, pair);
    }
    assert!(
        doses[..doses.len() - 1].iter().all(|&d| d > 0.0),
        "{}: zero before discontinuation",
        id
    );
}

#[test]
fn test_dexamethasone_tapers_on_prednisone_equivalent() {
    let engine = TaperEngine::default();
    let result = engine
        .evaluate(&PatientCase::new("dexamethasone", 1.5, 6, start()))
        .unwrap();

    assert!((result.normalized.value - 10.0).abs() < 1e-9);
    assert_eq!(result.category(), RiskCategory::Moderate);
    assert_eq!(result.classification.rule, ClassificationRule::ModerateDoseSustained);
    assert_eq!(result.strategy(), Strategy::Gradual);
    assert_eq!(result.schedule.outcome, ScheduleOutcome::Complete);

    // Gradual bands on 10 mg prednisone-equivalent: 10, 7.5, 5, 4, 3, 2, 1, 0
    let weeks: Vec<u32> = result.schedule.steps.iter().map(|s| s.week).collect();
    assert_eq!(weeks, vec![0, 2, 4, 6, 8, 10, 12, 14]);

    let doses: Vec<f64> = result.schedule.steps.iter().map(|s| s.dose).collect();
    assert_eq!(doses[0], 1.5);
    assert_eq!(doses[1], 1.1);
    assert_tapers_to_zero("dexamethasone-moderate", &doses);
}

#[test]
fn test_dexamethasone_percentage_completes() {
    let engine = TaperEngine::default();
    let mut case = PatientCase::new("dexamethasone", 4.0, 6, start());
    case.method = ReductionMethod::Percentage { rate: 10.0 };

    let result = engine.evaluate(&case).unwrap();
    assert_eq!(result.strategy(), Strategy::Slow);
    assert_eq!(result.schedule.outcome, ScheduleOutcome::Complete);

    // 26.7 mg equivalent: 25, 22.5, ... 2.5 in 2.5 mg increments, then zero
    assert_eq!(result.schedule.steps.len(), 12);
    assert_eq!(result.schedule.total_weeks(), 22);

    let doses: Vec<f64> = result.schedule.steps.iter().map(|s| s.dose).collect();
    assert_eq!(doses[0], 4.0);
    assert_tapers_to_zero("dexamethasone-percentage", &doses);
}

#[test]
fn test_prednisone_reference_scenario() {
    let engine = TaperEngine::default();
    let case = PatientCase::new("prednisone", 20.0, 3, start());
    let result = engine.evaluate(&case).unwrap();

    assert_eq!(result.strategy(), Strategy::Slow);

    let first = &result.schedule.steps[0];
    assert_eq!(first.week, 0);
    assert_eq!(first.dose, 20.0);
    assert_eq!(first.date, start());
    assert_eq!(first.annotation.as_deref(), Some(INITIAL_DOSE));

    let last = result.schedule.steps.last().unwrap();
    assert_eq!(last.dose, 0.0);
    assert_eq!(last.annotation.as_deref(), Some(DISCONTINUATION));
    assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 11, 22).unwrap());
    assert_eq!(result.schedule.end_date(), Some(last.date));

    // Crisis warning is always the last recommendation
    assert!(result.recommendations.last().unwrap().contains("adrenal crisis"));
}

#[test]
fn test_percentage_method() {
    let engine = TaperEngine::default();
    let mut case = PatientCase::new("prednisone", 20.0, 3, start());
    case.method = ReductionMethod::Percentage { rate: 25.0 };

    let result = engine.evaluate(&case).unwrap();
    let doses: Vec<f64> = result.schedule.steps.iter().map(|s| s.dose).collect();
    let weeks: Vec<u32> = result.schedule.steps.iter().map(|s| s.week).collect();

    assert_eq!(doses, vec![20.0, 15.0, 12.5, 10.0, 7.5, 5.0, 2.5, 0.0]);
    // Slow strategy steps every two weeks
    assert_eq!(weeks, vec![0, 2, 4, 6, 8, 10, 12, 14]);
}

#[test]
fn test_form_to_result() {
    let engine = TaperEngine::default();
    let form = TaperForm {
        patient_id: " MRN-42 ".into(),
        drug_name: "Decadron".into(),
        dose_mg: "4".into(),
        duration_weeks: "16".into(),
        suppression: "no".into(),
        comorbidities: "Osteoporosis, diabetes".into(),
        start_date: "2024-03-01".into(),
        ..Default::default()
    };

    let (case, result) = engine.evaluate_form(&form).unwrap();
    assert_eq!(case.patient_id.as_deref(), Some("MRN-42"));
    assert_eq!(result.normalized.drug_name, "dexamethasone");
    assert_eq!(result.category(), RiskCategory::High);

    // Alerts follow the fixed comorbidity order, not input order
    assert_eq!(result.alerts.len(), 2);
    assert!(result.alerts[0].starts_with("Diabetes"));
    assert!(result.alerts[1].starts_with("Osteoporosis"));

    // 16 weeks exceeds the long-term threshold
    let n = result.recommendations.len();
    assert!(result.recommendations[n - 2].starts_with("Long-term"));
}

#[test]
fn test_invalid_form_never_computes() {
    let engine = TaperEngine::default();
    for (field, value) in [("dose", ""), ("dose", "-3"), ("weeks", "x"), ("date", "tomorrow")] {
        let mut form = TaperForm {
            drug_name: "prednisone".into(),
            dose_mg: "20".into(),
            duration_weeks: "3".into(),
            start_date: "2024-03-01".into(),
            ..Default::default()
        };
        match field {
            "dose" => form.dose_mg = value.into(),
            "weeks" => form.duration_weeks = value.into(),
            _ => form.start_date = value.into(),
        }
        assert!(engine.evaluate_form(&form).is_err(), "{}={:?} should be rejected", field, value);
    }
}

#[test]
fn test_idempotent_serialization() {
    let engine = TaperEngine::default();
    let case = PatientCase::new("methylprednisolone", 32.0, 5, start())
        .with_comorbidity("hypertension")
        .with_comorbidity("peptic_ulcer");

    let first = engine.evaluate(&case).unwrap().to_canonical_json().unwrap();
    let second = engine.evaluate(&case).unwrap().to_canonical_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_mode_changes_phrasing_only() {
    let engine = TaperEngine::default();
    let clinical_case = PatientCase::new("prednisone", 30.0, 20, start()).with_comorbidity("diabetes");
    let mut patient_case = clinical_case.clone();
    patient_case.mode = MessageMode::Patient;

    let clinical = engine.evaluate(&clinical_case).unwrap();
    let patient = engine.evaluate(&patient_case).unwrap();

    assert_eq!(clinical.classification, patient.classification);
    assert_eq!(clinical.schedule, patient.schedule);
    assert_eq!(clinical.recommendations.len(), patient.recommendations.len());
    assert_eq!(clinical.alerts.len(), patient.alerts.len());
    assert_ne!(clinical.recommendations, patient.recommendations);
}

#[test]
fn test_every_builtin_completes_from_max_dose() {
    let engine = TaperEngine::default();
    let profiles: Vec<_> = engine.normalizer().table().profiles_sorted().into_iter().cloned().collect();

    for profile in profiles {
        for (weeks, suppression) in [(1, SuppressionStatus::No), (8, SuppressionStatus::Yes)] {
            let mut case = PatientCase::new(&profile.name, profile.max_dose, weeks, start());
            case.suppression = suppression;
            let result = engine.evaluate(&case).unwrap();

            assert_eq!(
                result.schedule.outcome,
                ScheduleOutcome::Complete,
                "{} {} mg did not reach zero",
                profile.name,
                profile.max_dose
            );
            let doses: Vec<f64> = result.schedule.steps.iter().map(|s| s.dose).collect();
            assert_eq!(doses[0], profile.max_dose);
            assert_tapers_to_zero(&profile.name, &doses);
        }
    }
}
