//! Tabular report: one CSV row per record, RFC 4180 quoting.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{ReportMeta, ReportRow, Reporter, Summary};
use crate::store::csv::{format_record, CsvTable};

pub const COLUMNS: [&str; 12] = [
    "StepID",
    "ScreenID",
    "ExpectedStringID",
    "ExpectedText",
    "ExtractedText",
    "Status",
    "Confidence",
    "Score",
    "Strategy",
    "ProcessingTimeMs",
    "Error",
    "Timestamp",
];

pub struct CsvReporter;

impl Reporter for CsvReporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, rows: &[ReportRow], _summary: &Summary, _meta: &ReportMeta, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV report {}", path.display()))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "{}", format_record(&COLUMNS))?;
        for row in rows {
            writeln!(out, "{}", format_record(&fields(row)))?;
        }
        out.flush().context("Failed to write CSV report")?;
        Ok(())
    }
}

fn fields(row: &ReportRow) -> [String; 12] {
    fn opt<T>(value: Option<T>, fmt: impl Fn(T) -> String) -> String {
        value.map(fmt).unwrap_or_default()
    }

    [
        row.step_id.clone(),
        row.screen_id.clone(),
        row.string_id.clone(),
        row.expected_text.clone().unwrap_or_default(),
        row.extracted_text.clone().unwrap_or_default(),
        row.status.to_string(),
        opt(row.confidence, |c| format!("{:.4}", c)),
        opt(row.score, |s| format!("{:.4}", s)),
        row.strategy.clone().unwrap_or_default(),
        opt(row.processing_time_ms, |t| format!("{:.1}", t)),
        row.error.clone().unwrap_or_default(),
        row.timestamp.clone(),
    ]
}

/// Reads a CSV report written by [`CsvReporter`].
///
/// Text columns keep their whitespace. Empty optional cells read as `None`.
pub fn read_csv(path: &Path) -> Result<Vec<ReportRow>> {
    let table = CsvTable::read(path)?;
    let cols = table.require_columns(&COLUMNS)?;

    table
        .records
        .iter()
        .map(|record| -> Result<ReportRow> {
            let text = |i: usize| {
                record
                    .fields
                    .get(cols[i])
                    .filter(|s| !s.is_empty())
                    .cloned()
            };
            let number = |i: usize| -> Result<Option<f64>> {
                let value = record.get(cols[i]);
                if value.is_empty() {
                    return Ok(None);
                }
                value.parse::<f64>().map(Some).map_err(|_| {
                    anyhow!("{}: line {}: bad {} {:?}", path.display(), record.line, COLUMNS[i], value)
                })
            };

            Ok(ReportRow {
                step_id: record.get(cols[0]).to_string(),
                screen_id: record.get(cols[1]).to_string(),
                string_id: record.get(cols[2]).to_string(),
                expected_text: text(3),
                extracted_text: text(4),
                status: record
                    .get(cols[5])
                    .parse()
                    .map_err(|e: String| anyhow!("{}: line {}: {}", path.display(), record.line, e))?,
                confidence: number(6)?.map(|c| c as f32),
                score: number(7)?,
                strategy: text(8),
                processing_time_ms: number(9)?,
                error: text(10),
                timestamp: record.get(cols[11]).to_string(),
            })
        })
        .collect()
}
