//! Printable report content: sections of text lines split into fixed-height pages.
//!
//! Only content assembly lives here. Rendering to PDF is left to the frontend.

use serde::{Deserialize, Serialize};

use crate::models::{
    format_dose, ClassificationRule, EvaluationResult, MessageMode, NormalizationBasis, PatientCase,
    ReductionMethod, ScheduleOutcome, SuppressionStatus, SwitchCase, SwitchResult,
};

/// Page separator in plain-text output.
pub const PAGE_BREAK: char = '\u{000C}';

/// A titled block of report lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<String>,
}

/// One printable page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPage {
    /// 1-based page number
    pub number: usize,
    pub lines: Vec<String>,
}

impl ReportPage {
    /// Page body followed by a "Page n of N" footer.
    pub fn render(&self, total_pages: usize) -> String {
        let mut text = self.lines.join("\n");
        text.push_str(&format!("\n\nPage {} of {}\n", self.number, total_pages));
        text
    }
}

/// Assembled report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub title: String,
    pub sections: Vec<ReportSection>,
    pub pages: Vec<ReportPage>,
}

impl Report {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Plain text, pages separated by form feeds.
    pub fn to_text(&self) -> String {
        let total = self.pages.len();
        self.pages
            .iter()
            .map(|page| page.render(total))
            .collect::<Vec<_>>()
            .join(&PAGE_BREAK.to_string())
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds a [`Report`] section by section.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    title: String,
    lines_per_page: usize,
    sections: Vec<ReportSection>,
}

impl ReportBuilder {
    /// Create an empty builder. Pages hold at least four lines.
    pub fn new(title: &str, lines_per_page: usize) -> Self {
        Self {
            title: title.to_string(),
            lines_per_page: lines_per_page.max(4),
            sections: Vec::new(),
        }
    }

    /// Append a section. Empty sections are skipped.
    pub fn section(mut self, heading: &str, lines: Vec<String>) -> Self {
        if !lines.is_empty() {
            self.sections.push(ReportSection {
                heading: heading.to_string(),
                lines,
            });
        }
        self
    }

    /// Report for a corticosteroid taper evaluation.
    pub fn for_taper(case: &PatientCase, result: &EvaluationResult, lines_per_page: usize) -> Self {
        let mut inputs = vec![
            format!("Medication: {}", result.normalized.drug_name),
            format!("Current dose: {} mg/day", format_dose(case.dose_mg)),
            format!("Duration of use: {} weeks", case.duration_weeks),
            format!("Pulse therapy: {}", yes_no(case.pulse_therapy)),
            format!("Adrenal suppression: {}", suppression_label(case.suppression)),
            format!("Comorbidities: {}", join_or_none(case.comorbidities.iter())),
            format!("Start date: {}", case.start_date),
            format!("Reduction method: {}", method_label(case.method)),
        ];
        if let Some(route) = &case.route {
            inputs.insert(2, format!("Route: {}", route));
        }

        let mut classification = vec![
            equivalent_line(result.normalized.basis, &result.normalized.reference, result.normalized.value),
            format!("Risk category: {}", result.category().as_str()),
            format!("Taper strategy: {}", result.strategy().as_str()),
            format!("Rule applied: {}", rule_label(result.classification.rule)),
        ];
        if let ScheduleOutcome::CeilingReached { max_steps } = result.schedule.outcome {
            classification.push(format!(
                "Schedule stopped after {} steps without reaching zero; review manually.",
                max_steps
            ));
        }

        let mut schedule = vec![format!("{:>4}  {:<10}  {:>9}  {}", "Week", "Date", "Dose (mg)", "Note")];
        schedule.extend(result.schedule.steps.iter().map(|step| {
            format!(
                "{:>4}  {:<10}  {:>9}  {}",
                step.week,
                step.date.to_string(),
                format_dose(step.dose),
                step.annotation.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        }));

        Self::new("Corticosteroid Taper Report", lines_per_page)
            .section("Patient", patient_lines(case.patient_id.as_deref(), case.mode))
            .section("Inputs", inputs)
            .section("Classification", classification)
            .section("Schedule", schedule)
            .section("Recommendations", bullets(&result.recommendations))
            .section("Alerts", bullets(&result.alerts))
    }

    /// Report for an antidepressant switch evaluation.
    pub fn for_switch(case: &SwitchCase, result: &SwitchResult, lines_per_page: usize) -> Self {
        let inputs = vec![
            format!("Current medication: {}", result.normalized.drug_name),
            format!("Current dose: {} mg/day", format_dose(case.source_dose_mg)),
            format!("New medication: {}", result.destination),
            format!("Start date: {}", case.start_date),
        ];

        let mut plan = vec![
            equivalent_line(result.normalized.basis, &result.normalized.reference, result.normalized.value),
            format!("Target dose: {} mg/day", format_dose(result.destination_dose)),
            format!("Switch strategy: {}", result.strategy.as_str().replace('_', " ")),
        ];
        if result.destination_clamped {
            plan.push("Target dose adjusted into the therapeutic range.".into());
        }

        let mut schedule = vec![format!(
            "{:>4}  {:<10}  {:>9}  {:>9}  {}",
            "Week", "Date", "Current", "New", "Note"
        )];
        schedule.extend(result.steps.iter().map(|step| {
            format!(
                "{:>4}  {:<10}  {:>9}  {:>9}  {}",
                step.week,
                step.date.to_string(),
                format_dose(step.source_dose),
                format_dose(step.destination_dose),
                step.annotation.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        }));

        Self::new("Antidepressant Switch Report", lines_per_page)
            .section("Patient", patient_lines(case.patient_id.as_deref(), case.mode))
            .section("Inputs", inputs)
            .section("Plan", plan)
            .section("Schedule", schedule)
            .section("Recommendations", bullets(&result.recommendations))
            .section("Alerts", bullets(&result.alerts))
    }

    /// Lay sections out on pages.
    ///
    /// A heading never ends a page: if the heading, its underline and the
    /// first line do not fit, the section starts on the next page.
    pub fn build(self) -> Report {
        let capacity = self.lines_per_page;
        let mut pages: Vec<Vec<String>> = vec![vec![self.title.clone(), "=".repeat(self.title.len())]];

        for section in &self.sections {
            let used = pages.last().map_or(0, Vec::len);
            let needed = if used > 0 { 4 } else { 3 };
            if used + needed > capacity {
                pages.push(Vec::new());
            }

            let mut block = Vec::with_capacity(section.lines.len() + 3);
            if pages.last().is_some_and(|p| !p.is_empty()) {
                block.push(String::new());
            }
            block.push(section.heading.clone());
            block.push("-".repeat(section.heading.len()));
            block.extend(section.lines.iter().cloned());

            for line in block {
                if pages.last().map_or(true, |p| p.len() >= capacity) {
                    // Leading blank lines are dropped on a fresh page
                    if line.is_empty() {
                        continue;
                    }
                    pages.push(Vec::new());
                }
                if let Some(page) = pages.last_mut() {
                    page.push(line);
                }
            }
        }

        Report {
            title: self.title,
            sections: self.sections,
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, lines)| ReportPage { number: i + 1, lines })
                .collect(),
        }
    }
}

fn patient_lines(patient_id: Option<&str>, mode: MessageMode) -> Vec<String> {
    vec![
        format!("Patient ID: {}", patient_id.unwrap_or("not recorded")),
        format!(
            "Audience: {}",
            match mode {
                MessageMode::Clinical => "clinician",
                MessageMode::Patient => "patient",
            }
        ),
    ]
}

fn equivalent_line(basis: NormalizationBasis, reference: &str, value: f64) -> String {
    match basis {
        NormalizationBasis::Equivalence => format!("{} equivalent: {} mg/day", capitalize(reference), format_dose(value)),
        NormalizationBasis::UnknownDrugPassthrough => format!(
            "{} equivalent: {} mg/day (not in reference table, dose used as entered)",
            capitalize(reference),
            format_dose(value)
        ),
    }
}

fn rule_label(rule: ClassificationRule) -> &'static str {
    match rule {
        ClassificationRule::KnownSuppression => "known adrenal suppression",
        ClassificationRule::HighDoseSustained => "high dose for 3 or more weeks",
        ClassificationRule::RecentPulseTherapy => "recent pulse therapy",
        ClassificationRule::ModerateDoseSustained => "moderate dose for 3 or more weeks",
        ClassificationRule::ProlongedUse => "use longer than 4 weeks",
        ClassificationRule::Default => "short course",
    }
}

fn method_label(method: ReductionMethod) -> String {
    match method {
        ReductionMethod::Absolute => "fixed steps".into(),
        ReductionMethod::Percentage { rate } => format!("{}% per step", format_dose(rate)),
    }
}

fn suppression_label(status: SuppressionStatus) -> &'static str {
    match status {
        SuppressionStatus::Yes => "yes",
        SuppressionStatus::No => "no",
        SuppressionStatus::Unknown => "unknown",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn join_or_none<'a>(values: impl Iterator<Item = &'a String>) -> String {
    let joined = values.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".into()
    } else {
        joined
    }
}

fn bullets(items: &[String]) -> Vec<String> {
    items.iter().map(|item| format!("- {}", item)).collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{SwitchEngine, TaperEngine};
    use chrono::NaiveDate;

    fn taper_report(lines_per_page: usize) -> Report {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let case = PatientCase::new("prednisone", 20.0, 3, date).with_comorbidity("diabetes");
        let result = TaperEngine::default().evaluate(&case).unwrap();
        ReportBuilder::for_taper(&case, &result, lines_per_page).build()
    }

    #[test]
    fn test_taper_report_sections() {
        let report = taper_report(40);
        let headings: Vec<&str> = report.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec!["Patient", "Inputs", "Classification", "Schedule", "Recommendations", "Alerts"]
        );

        let text = report.to_text();
        assert!(text.starts_with("Corticosteroid Taper Report\n"));
        assert!(text.contains("Prednisone equivalent: 20 mg/day"));
        assert!(text.contains("Risk category: high"));
        assert!(text.contains("initial dose"));
        assert!(text.contains("Comorbidities: diabetes"));
    }

    #[test]
    fn test_pages_respect_line_limit() {
        let report = taper_report(12);
        assert!(report.page_count() > 1);
        for page in &report.pages {
            assert!(page.lines.len() <= 12);
            assert!(!page.lines.last().unwrap().is_empty());
        }
        let numbers: Vec<usize> = report.pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, (1..=report.page_count()).collect::<Vec<_>>());
    }

    #[test]
    fn test_heading_not_orphaned() {
        let report = taper_report(12);
        for page in &report.pages {
            let n = page.lines.len();
            if n >= 2 {
                // Underline of a heading is never the last line
                assert!(!page.lines[n - 1].chars().all(|c| c == '-'));
            }
        }
    }

    #[test]
    fn test_text_has_footer_per_page() {
        let report = taper_report(12);
        let text = report.to_text();
        let total = report.page_count();
        assert_eq!(text.matches(PAGE_BREAK).count(), total - 1);
        assert!(text.contains(&format!("Page {} of {}", total, total)));
    }

    #[test]
    fn test_switch_report() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let case = SwitchCase::new("fluoxetine", 20.0, "escitalopram", date);
        let result = SwitchEngine::default().evaluate(&case).unwrap();
        let report = ReportBuilder::for_switch(&case, &result, 40).build();

        let text = report.to_text();
        assert!(text.starts_with("Antidepressant Switch Report"));
        assert!(text.contains("Switch strategy: washout then start"));
        assert!(text.contains("Target dose: 10 mg/day"));
    }

    #[test]
    fn test_json_output() {
        let report = taper_report(40);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["title"], "Corticosteroid Taper Report");
        assert!(value["pages"].as_array().unwrap().len() >= 1);
    }

    #[test]
    fn test_empty_sections_skipped() {
        let report = ReportBuilder::new("T", 10)
            .section("Empty", Vec::new())
            .section("Body", vec!["line".into()])
            .build();
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.pages[0].lines, vec!["T", "=", "", "Body", "----", "line"]);
    }
}
