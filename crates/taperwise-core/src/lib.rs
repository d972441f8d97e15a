//! Taperwise Core Library
//!
//! Clinical dose-tapering engine: corticosteroid taper schedules and
//! antidepressant cross-titration plans, with saved calculation history.
//!
//! # Architecture
//!
//! ```text
//! Raw form input → Validation
//!                      │
//!                 Normalizer  (drug + dose → reference-equivalent dose)
//!                      │
//!                 Classifier  (risk category → taper strategy)
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//!  Schedule Generator        Composer (message catalog)
//!          └───────────┬───────────┘
//!                      ▼
//!              EvaluationResult
//!                      │
//!          ┌───────────┼────────────────┐
//!          ▼           ▼                ▼
//!   ReportBuilder  CalculationRecord  Canonical JSON
//!          │           │
//!   ReportExporter   SQLite history
//! ```
//!
//! # Core Principle
//!
//! **The engine is pure.** One input snapshot produces one result, with no I/O
//! and no state kept between calls. Persistence and export sit on top.
//!
//! # Modules
//!
//! - [`engine`]: Normalizer, classifier, schedule generator and composers
//! - [`models`]: Domain types (DrugTable, PatientCase, EvaluationResult, etc.)
//! - [`config`]: Engine tuning (rounding, ceilings, pagination)
//! - [`report`]: Paginated report content and cancellable export
//! - [`db`]: SQLite calculation history with FTS5 search

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::Database;
pub use engine::{EngineError, SwitchEngine, TaperEngine};
pub use models::{
    CalculationRecord, DrugProfile, DrugTable, EvaluationResult, PatientCase, SwitchCase,
    SwitchResult, TaperForm,
};
pub use report::{ExportFormat, ExportHandle, Report, ReportBuilder, ReportExporter};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

/// Log filter used when neither the caller nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_FILTER: &str = "taperwise_core=info";

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum TaperwiseError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown drug: {0}")]
    UnknownDrug(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Export cancelled")]
    Cancelled,
}

impl From<db::DbError> for TaperwiseError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(id) => TaperwiseError::NotFound(id),
            other => TaperwiseError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TaperwiseError {
    fn from(e: serde_json::Error) -> Self {
        TaperwiseError::SerializationError(e.to_string())
    }
}

impl From<engine::EngineError> for TaperwiseError {
    fn from(e: engine::EngineError) -> Self {
        match e {
            engine::EngineError::Validation(message) => TaperwiseError::InvalidInput(message),
            engine::EngineError::UnknownDrug { name, suggestions } if suggestions.is_empty() => {
                TaperwiseError::UnknownDrug(name)
            }
            engine::EngineError::UnknownDrug { name, suggestions } => {
                TaperwiseError::UnknownDrug(format!("{} (did you mean: {})", name, suggestions.join(", ")))
            }
            other => TaperwiseError::ConfigError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for TaperwiseError {
    fn from(e: config::ConfigError) -> Self {
        TaperwiseError::ConfigError(e.to_string())
    }
}

impl From<report::ExportError> for TaperwiseError {
    fn from(e: report::ExportError) -> Self {
        match e {
            report::ExportError::Cancelled => TaperwiseError::Cancelled,
            other => TaperwiseError::ExportError(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for TaperwiseError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        TaperwiseError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the global tracing subscriber.
///
/// Uses `filter` if given and valid, then `RUST_LOG`, then [`DEFAULT_LOG_FILTER`].
/// Returns false if a subscriber was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let env_filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok()
}

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<TaperwiseCore>, TaperwiseError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(TaperwiseCore::new(db, EngineConfig::default())?))
}

/// Open a database with engine configuration given as JSON.
#[uniffi::export]
pub fn open_database_with_config(
    path: String,
    config_json: String,
) -> Result<Arc<TaperwiseCore>, TaperwiseError> {
    let config = EngineConfig::from_json(&config_json)?;
    let db = Database::open(&path)?;
    Ok(Arc::new(TaperwiseCore::new(db, config)?))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<TaperwiseCore>, TaperwiseError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(TaperwiseCore::new(db, EngineConfig::default())?))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Engines plus a thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct TaperwiseCore {
    db: Arc<Mutex<Database>>,
    taper: TaperEngine,
    switch: SwitchEngine,
}

impl TaperwiseCore {
    fn new(db: Database, config: EngineConfig) -> Result<Self, TaperwiseError> {
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            taper: TaperEngine::default().with_config(config)?,
            switch: SwitchEngine::default(),
        })
    }

    fn lines_per_page(&self) -> usize {
        self.taper.config().lines_per_page
    }

    fn taper_report(&self, form: FfiTaperForm) -> Result<Report, TaperwiseError> {
        let (case, result) = self.taper.evaluate_form(&form.into())?;
        Ok(ReportBuilder::for_taper(&case, &result, self.lines_per_page()).build())
    }

    fn switch_report(&self, input: FfiSwitchInput) -> Result<Report, TaperwiseError> {
        let case = SwitchCase::try_from(input)?;
        let result = self.switch.evaluate(&case)?;
        Ok(ReportBuilder::for_switch(&case, &result, self.lines_per_page()).build())
    }
}

#[uniffi::export]
impl TaperwiseCore {
    // =========================================================================
    // Reference Data
    // =========================================================================

    /// Drug names (generic, sorted) known to a calculator.
    pub fn list_drugs(&self, calculator: FfiCalculator) -> Vec<String> {
        let table = match calculator {
            FfiCalculator::SteroidTaper => self.taper.normalizer().table(),
            FfiCalculator::AntidepressantSwitch => self.switch.normalizer().table(),
        };
        table.profiles_sorted().into_iter().map(|p| p.name.clone()).collect()
    }

    /// Close name matches for a misspelled drug.
    pub fn suggest_drugs(&self, calculator: FfiCalculator, name: String) -> Vec<String> {
        match calculator {
            FfiCalculator::SteroidTaper => self.taper.normalizer().suggest(&name),
            FfiCalculator::AntidepressantSwitch => self.switch.normalizer().suggest(&name),
        }
    }

    // =========================================================================
    // Calculations
    // =========================================================================

    /// Evaluate a corticosteroid taper from raw form input.
    pub fn evaluate_taper(&self, form: FfiTaperForm) -> Result<FfiTaperResult, TaperwiseError> {
        let (case, result) = self.taper.evaluate_form(&form.into())?;
        Ok(FfiTaperResult::new(&case, result))
    }

    /// Evaluate an antidepressant switch.
    pub fn evaluate_switch(&self, input: FfiSwitchInput) -> Result<FfiSwitchResult, TaperwiseError> {
        let case = SwitchCase::try_from(input)?;
        let result = self.switch.evaluate(&case)?;
        Ok(FfiSwitchResult::new(&case, result))
    }

    // =========================================================================
    // History Operations
    // =========================================================================

    /// Evaluate a taper and save it to history.
    pub fn save_taper(&self, form: FfiTaperForm) -> Result<FfiCalculationRecord, TaperwiseError> {
        let (case, result) = self.taper.evaluate_form(&form.into())?;
        let record = result.to_record(&case)?;
        let db = self.db.lock()?;
        db.save_calculation(&record)?;
        Ok(record.into())
    }

    /// Evaluate a switch and save it to history.
    pub fn save_switch(&self, input: FfiSwitchInput) -> Result<FfiCalculationRecord, TaperwiseError> {
        let case = SwitchCase::try_from(input)?;
        let record = self.switch.evaluate(&case)?.to_record(&case)?;
        let db = self.db.lock()?;
        db.save_calculation(&record)?;
        Ok(record.into())
    }

    /// Get a saved record by ID.
    pub fn get_record(&self, id: String) -> Result<FfiCalculationRecord, TaperwiseError> {
        let db = self.db.lock()?;
        let record = db
            .get_calculation(&id)?
            .ok_or(db::DbError::NotFound(id))?;
        Ok(record.into())
    }

    /// List saved records, newest first, optionally for one calculator.
    pub fn list_records(
        &self,
        calculator: Option<FfiCalculator>,
    ) -> Result<Vec<FfiCalculationRecord>, TaperwiseError> {
        let db = self.db.lock()?;
        let records = db.list_calculations(calculator.map(FfiCalculator::slug))?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Search saved records by name and summary.
    pub fn search_records(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiCalculationRecord>, TaperwiseError> {
        let db = self.db.lock()?;
        let records = db.search_calculations(&query, limit as usize)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Delete a saved record. Returns false if it did not exist.
    pub fn delete_record(&self, id: String) -> Result<bool, TaperwiseError> {
        let db = self.db.lock()?;
        Ok(db.delete_calculation(&id)?)
    }

    // =========================================================================
    // Report Operations
    // =========================================================================

    /// Render a taper report as text or JSON.
    pub fn render_taper_report(
        &self,
        form: FfiTaperForm,
        format: FfiReportFormat,
    ) -> Result<String, TaperwiseError> {
        render(&self.taper_report(form)?, format)
    }

    /// Render a switch report as text or JSON.
    pub fn render_switch_report(
        &self,
        input: FfiSwitchInput,
        format: FfiReportFormat,
    ) -> Result<String, TaperwiseError> {
        render(&self.switch_report(input)?, format)
    }

    /// Start writing a taper report to `path` on a background thread.
    pub fn export_taper_report(
        &self,
        form: FfiTaperForm,
        path: String,
        format: FfiReportFormat,
    ) -> Result<Arc<ExportTask>, TaperwiseError> {
        let report = self.taper_report(form)?;
        Ok(ExportTask::start(report, path, format))
    }

    /// Start writing a switch report to `path` on a background thread.
    pub fn export_switch_report(
        &self,
        input: FfiSwitchInput,
        path: String,
        format: FfiReportFormat,
    ) -> Result<Arc<ExportTask>, TaperwiseError> {
        let report = self.switch_report(input)?;
        Ok(ExportTask::start(report, path, format))
    }
}

fn render(report: &Report, format: FfiReportFormat) -> Result<String, TaperwiseError> {
    match format {
        FfiReportFormat::Text => Ok(report.to_text()),
        FfiReportFormat::Json => Ok(report.to_json()?),
    }
}

/// A running report export.
#[derive(uniffi::Object)]
pub struct ExportTask {
    handle: ExportHandle,
    join: Mutex<Option<JoinHandle<report::ExportResult<report::ExportSummary>>>>,
}

impl ExportTask {
    fn start(report: Report, path: String, format: FfiReportFormat) -> Arc<Self> {
        let (handle, join) = ReportExporter::spawn(report, PathBuf::from(path), format.into());
        Arc::new(Self {
            handle,
            join: Mutex::new(Some(join)),
        })
    }
}

#[uniffi::export]
impl ExportTask {
    /// Request cancellation. A cancelled export leaves no file behind.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Block until the export finishes. Can be called once.
    pub fn wait(&self) -> Result<FfiExportSummary, TaperwiseError> {
        let join = self
            .join
            .lock()?
            .take()
            .ok_or_else(|| TaperwiseError::InvalidInput("Export result already taken".into()))?;

        let summary = join
            .join()
            .map_err(|_| TaperwiseError::ExportError("Export thread panicked".into()))??;
        Ok(summary.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// Which calculator a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiCalculator {
    SteroidTaper,
    AntidepressantSwitch,
}

impl FfiCalculator {
    fn slug(self) -> &'static str {
        match self {
            FfiCalculator::SteroidTaper => models::TAPER_SLUG,
            FfiCalculator::AntidepressantSwitch => models::SWITCH_SLUG,
        }
    }
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiReportFormat {
    Text,
    Json,
}

impl From<FfiReportFormat> for ExportFormat {
    fn from(format: FfiReportFormat) -> Self {
        match format {
            FfiReportFormat::Text => ExportFormat::Text,
            FfiReportFormat::Json => ExportFormat::Json,
        }
    }
}

/// FFI-safe taper form, as typed by the user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTaperForm {
    pub patient_id: String,
    pub drug_name: String,
    pub dose_mg: String,
    pub duration_weeks: String,
    pub pulse_therapy: bool,
    pub suppression: String,
    pub comorbidities: Vec<String>,
    pub route: String,
    pub start_date: String,
    pub percentage_rate: String,
    pub patient_mode: bool,
}

impl From<FfiTaperForm> for TaperForm {
    fn from(form: FfiTaperForm) -> Self {
        TaperForm {
            patient_id: form.patient_id,
            drug_name: form.drug_name,
            dose_mg: form.dose_mg,
            duration_weeks: form.duration_weeks,
            pulse_therapy: form.pulse_therapy,
            suppression: form.suppression,
            comorbidities: form.comorbidities.join(","),
            route: form.route,
            start_date: form.start_date,
            percentage_rate: form.percentage_rate,
            patient_mode: form.patient_mode,
        }
    }
}

/// FFI-safe switch input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSwitchInput {
    pub patient_id: Option<String>,
    pub source_drug: String,
    pub source_dose_mg: f64,
    pub destination_drug: String,
    /// ISO date (YYYY-MM-DD)
    pub start_date: String,
    pub patient_mode: bool,
}

impl TryFrom<FfiSwitchInput> for SwitchCase {
    type Error = TaperwiseError;

    fn try_from(input: FfiSwitchInput) -> Result<Self, Self::Error> {
        let start_date = NaiveDate::parse_from_str(input.start_date.trim(), "%Y-%m-%d").map_err(|_| {
            TaperwiseError::InvalidInput("Start date must be a valid date (YYYY-MM-DD).".into())
        })?;

        let mut case = SwitchCase::new(&input.source_drug, input.source_dose_mg, &input.destination_drug, start_date);
        case.patient_id = input.patient_id.filter(|id| !id.trim().is_empty());
        if input.patient_mode {
            case.mode = models::MessageMode::Patient;
        }
        Ok(case)
    }
}

/// FFI-safe taper step.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduleStep {
    pub week: u32,
    pub date: String,
    pub dose: f64,
    pub annotation: Option<String>,
}

impl From<models::ScheduleStep> for FfiScheduleStep {
    fn from(step: models::ScheduleStep) -> Self {
        Self {
            week: step.week,
            date: step.date.to_string(),
            dose: step.dose,
            annotation: step.annotation,
        }
    }
}

/// FFI-safe taper evaluation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTaperResult {
    pub drug_name: String,
    pub reference: String,
    pub equivalent_dose: f64,
    /// True if the drug was not in the reference table
    pub unknown_drug: bool,
    pub category: String,
    pub strategy: String,
    pub steps: Vec<FfiScheduleStep>,
    /// False if the step ceiling stopped the schedule before zero
    pub complete: bool,
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
    pub summary: String,
}

impl FfiTaperResult {
    fn new(case: &PatientCase, result: EvaluationResult) -> Self {
        let summary = result.summary(case);
        Self {
            category: result.category().as_str().to_string(),
            strategy: result.strategy().as_str().to_string(),
            complete: result.schedule.is_complete(),
            unknown_drug: result.normalized.basis == models::NormalizationBasis::UnknownDrugPassthrough,
            drug_name: result.normalized.drug_name,
            reference: result.normalized.reference,
            equivalent_dose: result.normalized.value,
            steps: result.schedule.steps.into_iter().map(|s| s.into()).collect(),
            recommendations: result.recommendations,
            alerts: result.alerts,
            summary,
        }
    }
}

/// FFI-safe cross-titration step.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSwitchStep {
    pub week: u32,
    pub date: String,
    pub source_dose: f64,
    pub destination_dose: f64,
    pub annotation: Option<String>,
}

impl From<models::SwitchStep> for FfiSwitchStep {
    fn from(step: models::SwitchStep) -> Self {
        Self {
            week: step.week,
            date: step.date.to_string(),
            source_dose: step.source_dose,
            destination_dose: step.destination_dose,
            annotation: step.annotation,
        }
    }
}

/// FFI-safe switch evaluation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSwitchResult {
    pub source_drug: String,
    pub equivalent_dose: f64,
    pub destination_drug: String,
    pub destination_dose: f64,
    pub destination_clamped: bool,
    pub strategy: String,
    pub steps: Vec<FfiSwitchStep>,
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
    pub summary: String,
}

impl FfiSwitchResult {
    fn new(case: &SwitchCase, result: SwitchResult) -> Self {
        let summary = result.summary(case);
        Self {
            strategy: result.strategy.as_str().to_string(),
            source_drug: result.normalized.drug_name,
            equivalent_dose: result.normalized.value,
            destination_drug: result.destination,
            destination_dose: result.destination_dose,
            destination_clamped: result.destination_clamped,
            steps: result.steps.into_iter().map(|s| s.into()).collect(),
            recommendations: result.recommendations,
            alerts: result.alerts,
            summary,
        }
    }
}

/// FFI-safe key/value detail of a saved record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecordDetail {
    pub key: String,
    pub value: String,
}

/// FFI-safe saved calculation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCalculationRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub summary: String,
    /// Ordered by key
    pub details: Vec<FfiRecordDetail>,
    pub fingerprint: String,
}

impl From<CalculationRecord> for FfiCalculationRecord {
    fn from(record: CalculationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            slug: record.slug,
            created_at: record.created_at,
            summary: record.summary,
            details: record
                .details
                .into_iter()
                .map(|(key, value)| FfiRecordDetail { key, value })
                .collect(),
            fingerprint: record.fingerprint,
        }
    }
}

/// FFI-safe export result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExportSummary {
    pub path: String,
    pub pages: u32,
    pub bytes: u64,
}

impl From<report::ExportSummary> for FfiExportSummary {
    fn from(summary: report::ExportSummary) -> Self {
        Self {
            path: summary.path.display().to_string(),
            pages: summary.pages as u32,
            bytes: summary.bytes,
        }
    }
}
