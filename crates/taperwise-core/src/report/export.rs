//! Cancellable report export to text or JSON files.
//!
//! Pages are written to a `.part` sibling and renamed into place once the
//! last page is flushed, so a cancelled or failed export never leaves a
//! truncated report at the destination path.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::formatter::{Report, PAGE_BREAK};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export cancelled")]
    Cancelled,
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Text,
    Json,
}

/// Cancellation flag shared between the caller and a running export.
#[derive(Debug, Clone, Default)]
pub struct ExportHandle {
    cancelled: Arc<AtomicBool>,
}

impl ExportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The export stops before its next page.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Result of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub pages: usize,
    pub bytes: u64,
}

/// Writes reports to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportExporter;

impl ReportExporter {
    pub fn new() -> Self {
        Self
    }

    /// Export a report, checking `handle` between pages.
    pub fn export(
        &self,
        report: &Report,
        path: &Path,
        format: ExportFormat,
        handle: &ExportHandle,
    ) -> ExportResult<ExportSummary> {
        self.export_with_progress(report, path, format, handle, |_, _| {})
    }

    /// Export a report, calling `progress(written, total)` after each page.
    pub fn export_with_progress<F>(
        &self,
        report: &Report,
        path: &Path,
        format: ExportFormat,
        handle: &ExportHandle,
        mut progress: F,
    ) -> ExportResult<ExportSummary>
    where
        F: FnMut(usize, usize),
    {
        let part = partial_path(path);
        let outcome = write_pages(report, &part, format, handle, &mut progress);

        match outcome {
            Ok(()) => {
                fs::rename(&part, path)?;
                let bytes = fs::metadata(path)?.len();
                info!(path = %path.display(), pages = report.page_count(), bytes, "Report exported");
                Ok(ExportSummary {
                    path: path.to_path_buf(),
                    pages: report.page_count(),
                    bytes,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                debug!(path = %path.display(), error = %e, "Report export aborted");
                Err(e)
            }
        }
    }

    /// Run an export on a background thread.
    ///
    /// Returns the cancellation handle and the join handle for the result.
    pub fn spawn(
        report: Report,
        path: PathBuf,
        format: ExportFormat,
    ) -> (ExportHandle, JoinHandle<ExportResult<ExportSummary>>) {
        let handle = ExportHandle::new();
        let flag = handle.clone();
        let join = std::thread::spawn(move || ReportExporter.export(&report, &path, format, &flag));
        (handle, join)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn write_pages<F>(
    report: &Report,
    part: &Path,
    format: ExportFormat,
    handle: &ExportHandle,
    progress: &mut F,
) -> ExportResult<()>
where
    F: FnMut(usize, usize),
{
    if handle.is_cancelled() {
        return Err(ExportError::Cancelled);
    }

    let mut writer = BufWriter::new(File::create(part)?);
    let total = report.page_count();

    match format {
        ExportFormat::Text => {
            for (i, page) in report.pages.iter().enumerate() {
                if handle.is_cancelled() {
                    return Err(ExportError::Cancelled);
                }
                if i > 0 {
                    write!(writer, "{}", PAGE_BREAK)?;
                }
                writer.write_all(page.render(total).as_bytes())?;
                progress(i + 1, total);
            }
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, report)?;
            progress(total, total);
        }
    }

    if handle.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;
    use tempfile::TempDir;

    fn sample_report() -> Report {
        let lines: Vec<String> = (1..=30).map(|i| format!("line {}", i)).collect();
        ReportBuilder::new("Sample", 10).section("Body", lines).build()
    }

    #[test]
    fn test_export_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        let report = sample_report();

        let summary = ReportExporter::new()
            .export(&report, &path, ExportFormat::Text, &ExportHandle::new())
            .unwrap();

        assert_eq!(summary.pages, report.page_count());
        assert_eq!(fs::read_to_string(&path).unwrap(), report.to_text());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_export_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report = sample_report();

        ReportExporter::new()
            .export(&report, &path, ExportFormat::Json, &ExportHandle::new())
            .unwrap();

        let parsed: Report = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_cancel_before_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        let handle = ExportHandle::new();
        handle.cancel();

        let err = ReportExporter::new()
            .export(&sample_report(), &path, ExportFormat::Text, &handle)
            .unwrap_err();

        assert!(matches!(err, ExportError::Cancelled));
        assert!(!path.exists());
    }

    #[test]
    fn test_cancel_between_pages_removes_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        let report = sample_report();
        assert!(report.page_count() > 2);

        let handle = ExportHandle::new();
        let mut seen = Vec::new();
        let err = ReportExporter::new()
            .export_with_progress(&report, &path, ExportFormat::Text, &handle, |written, _| {
                seen.push(written);
                handle.cancel();
            })
            .unwrap_err();

        assert!(matches!(err, ExportError::Cancelled));
        assert_eq!(seen, vec![1]);
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_spawned_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");

        let (_handle, join) = ReportExporter::spawn(sample_report(), path.clone(), ExportFormat::Text);
        let summary = join.join().unwrap().unwrap();

        assert_eq!(summary.path, path);
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_kept_on_cancel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        fs::write(&path, "previous").unwrap();

        let handle = ExportHandle::new();
        handle.cancel();
        let _ = ReportExporter::new().export(&sample_report(), &path, ExportFormat::Text, &handle);

        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }
}
