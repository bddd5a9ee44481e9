//! Report writers and readers.
//!
//! Every format carries the same [`ReportRow`] fields, so a report written
//! in one format reads back into the same rows.

pub mod chart;
pub mod csv;
pub mod html;
pub mod json;
pub mod summary;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ValidatorConfig;
use crate::model::{Status, ValidationRecord};
use crate::paths;

pub use summary::Summary;

/// One output row per validation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub step_id: String,
    pub screen_id: String,
    pub string_id: String,
    pub expected_text: Option<String>,
    pub extracted_text: Option<String>,
    pub status: Status,
    pub confidence: Option<f32>,
    pub score: Option<f64>,
    pub strategy: Option<String>,
    pub processing_time_ms: Option<f64>,
    pub error: Option<String>,
    /// RFC 3339 local time
    pub timestamp: String,
}

impl From<&ValidationRecord> for ReportRow {
    fn from(record: &ValidationRecord) -> Self {
        Self {
            step_id: record.step_id().to_string(),
            screen_id: record.screen_id().to_string(),
            string_id: record.string_id().to_string(),
            expected_text: record.expected_text().map(str::to_string),
            extracted_text: record.extracted_text().map(str::to_string),
            status: record.status(),
            confidence: record.confidence(),
            score: record.score(),
            strategy: record.strategy().map(str::to_string),
            processing_time_ms: record.processing_time_ms(),
            error: record.reason(),
            timestamp: record.timestamp().to_rfc3339_opts(SecondsFormat::Millis, false),
        }
    }
}

pub fn rows_from_records(records: &[ValidationRecord]) -> Vec<ReportRow> {
    records.iter().map(ReportRow::from).collect()
}

/// Run-level information written alongside the rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportMeta {
    pub generated_at: DateTime<Local>,
    pub locale: String,
    pub total_results: usize,
}

impl ReportMeta {
    pub fn new(locale: &str, total_results: usize) -> Self {
        Self {
            generated_at: Local::now(),
            locale: locale.to_string(),
            total_results,
        }
    }
}

/// Serializes a finished run to one file.
pub trait Reporter {
    /// File extension, also the name the format is selected by.
    fn extension(&self) -> &'static str;
    fn write(&self, rows: &[ReportRow], summary: &Summary, meta: &ReportMeta, path: &Path) -> Result<()>;
}

pub const REPORTERS: &[&(dyn Reporter + Sync)] = &[&csv::CsvReporter, &json::JsonReporter, &html::HtmlReporter];

/// Finds the reporter for a format name such as "csv" or "HTML".
pub fn reporter(format: &str) -> Result<&'static (dyn Reporter + Sync)> {
    let key = format.trim().trim_start_matches('.').to_ascii_lowercase();
    let key = if key == "htm" { "html".to_string() } else { key };
    match REPORTERS.iter().find(|r| r.extension() == key) {
        Some(r) => Ok(*r),
        None => bail!(
            "Unknown report format {:?} (available: {})",
            format,
            REPORTERS.iter().map(|r| r.extension()).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Writes the run in every requested format and returns the written paths.
///
/// With `output` naming a file, its extension selects the single format.
/// Otherwise each format goes to `<output_dir>/results-<locale>.<ext>`.
pub fn write_reports(
    config: &ValidatorConfig,
    formats: &[String],
    output: Option<&Path>,
    records: &[ValidationRecord],
) -> Result<Vec<PathBuf>> {
    let rows = rows_from_records(records);
    let summary = Summary::from_rows(&rows);
    let meta = ReportMeta::new(&config.locale, rows.len());

    let targets: Vec<(&(dyn Reporter + Sync), PathBuf)> = match output {
        Some(path) => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("csv");
            vec![(reporter(ext)?, path.to_path_buf())]
        }
        None => {
            let mut targets = Vec::new();
            for format in formats {
                let r = reporter(format)?;
                targets.push((r, paths::results_file(config, r.extension())));
            }
            targets
        }
    };

    let mut written = Vec::with_capacity(targets.len());
    for (reporter, path) in targets {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        reporter.write(&rows, &summary, &meta, &path)?;
        info!("Wrote {} report to {}", reporter.extension(), path.display());
        written.push(path);
    }
    Ok(written)
}

/// Reads a CSV or JSON report back into rows.
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => json::read_json(path),
        Some("csv") => csv::read_csv(path),
        _ => bail!("Cannot read report {}: only .csv and .json are readable", path.display()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ReportRow;
    use crate::model::Status;

    pub fn row(id: &str, status: Status, confidence: Option<f32>) -> ReportRow {
        ReportRow {
            step_id: "S1".into(),
            screen_id: "SCR1".into(),
            string_id: id.into(),
            expected_text: Some("Welcome, \"friend\"".into()),
            extracted_text: confidence.map(|_| "Welcome,\nfriend".into()),
            status,
            confidence,
            score: None,
            strategy: confidence.map(|_| "composite(fuzzy)".into()),
            processing_time_ms: confidence.map(|_| 12.5),
            error: match status {
                Status::Error => Some("coordinate not found".into()),
                _ => None,
            },
            timestamp: "2026-01-05T10:00:00.000+01:00".into(),
        }
    }
}
