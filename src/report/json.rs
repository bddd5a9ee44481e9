//! Structured report: metadata, summary and result rows in one JSON document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::{ReportMeta, ReportRow, Reporter, Summary};

#[derive(Serialize)]
struct JsonReportRef<'a> {
    metadata: &'a ReportMeta,
    summary: &'a Summary,
    results: &'a [ReportRow],
}

/// A parsed JSON report.
#[derive(Debug, Deserialize)]
pub struct JsonReport {
    pub metadata: ReportMeta,
    pub summary: Summary,
    pub results: Vec<ReportRow>,
}

pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, rows: &[ReportRow], summary: &Summary, meta: &ReportMeta, path: &Path) -> Result<()> {
        let report = JsonReportRef {
            metadata: meta,
            summary,
            results: rows,
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")?;

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create JSON report {}", path.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write JSON report")?;
        Ok(())
    }
}

pub fn read_report(path: &Path) -> Result<JsonReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON report {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON report {}", path.display()))
}

pub fn read_json(path: &Path) -> Result<Vec<ReportRow>> {
    Ok(read_report(path)?.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::report::testing::row;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let rows = vec![
            row("WELCOME_TITLE", Status::Pass, Some(0.93)),
            row("OTHER", Status::Fail, Some(0.4)),
            row("MISSING", Status::Error, None),
        ];
        let summary = Summary::from_rows(&rows);
        JsonReporter
            .write(&rows, &summary, &ReportMeta::new("en-US", rows.len()), &path)
            .unwrap();

        let report = read_report(&path).unwrap();
        assert_eq!(report.metadata.locale, "en-US");
        assert_eq!(report.metadata.total_results, 3);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.screens.len(), 1);
        assert_eq!(report.results, rows);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"status\": \"PASS\""));
    }
}
