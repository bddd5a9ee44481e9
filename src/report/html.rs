//! Hypertext report: summary cards and a results table.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::{ReportMeta, ReportRow, Reporter, Summary};
use crate::model::Status;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; color: #222; }
.cards { display: flex; gap: 1em; margin-bottom: 1.5em; }
.card { padding: 0.8em 1.2em; border-radius: 6px; background: #f2f2f2; min-width: 7em; }
.card .value { font-size: 1.6em; font-weight: bold; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
th { background: #444; color: #fff; }
td.text { white-space: pre-wrap; }
tr.PASS td.status { background: #d4edda; }
tr.FAIL td.status { background: #f8d7da; }
tr.ERROR td.status { background: #fff3cd; }
";

pub struct HtmlReporter;

impl Reporter for HtmlReporter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn write(&self, rows: &[ReportRow], summary: &Summary, meta: &ReportMeta, path: &Path) -> Result<()> {
        let html = render(rows, summary, meta);
        fs::write(path, html).with_context(|| format!("Failed to write HTML report {}", path.display()))?;
        Ok(())
    }
}

/// Escapes text for element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(rows: &[ReportRow], summary: &Summary, meta: &ReportMeta) -> String {
    let mut html = String::new();
    let title = format!("Validation results: {}", escape(&meta.locale));

    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n<p>Generated {}</p>\n",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    html.push_str("<div class=\"cards\">\n");
    let mut card = |label: &str, value: String| {
        let _ = writeln!(
            html,
            "<div class=\"card\"><div>{}</div><div class=\"value\">{}</div></div>",
            label, value
        );
    };
    card("Total", summary.total.to_string());
    for status in Status::ALL {
        card(status.as_str(), summary.count(status).to_string());
    }
    card("Pass rate", format!("{:.1}%", summary.pass_rate));
    if let Some(c) = &summary.confidence {
        card("Mean confidence", format!("{:.3}", c.mean));
    }
    html.push_str("</div>\n");

    html.push_str("<table>\n<tr><th>Step</th><th>Screen</th><th>String ID</th><th>Expected</th><th>Extracted</th><th>Status</th><th>Confidence</th><th>Strategy</th><th>Time (ms)</th><th>Error</th><th>Timestamp</th></tr>\n");
    for row in rows {
        let cell = |v: Option<&str>| escape(v.unwrap_or_default());
        let _ = writeln!(
            html,
            "<tr class=\"{status}\"><td>{}</td><td>{}</td><td>{}</td><td class=\"text\">{}</td><td class=\"text\">{}</td><td class=\"status\">{status}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.step_id),
            escape(&row.screen_id),
            escape(&row.string_id),
            cell(row.expected_text.as_deref()),
            cell(row.extracted_text.as_deref()),
            row.confidence.map(|c| format!("{:.3}", c)).unwrap_or_default(),
            cell(row.strategy.as_deref()),
            row.processing_time_ms.map(|t| format!("{:.1}", t)).unwrap_or_default(),
            cell(row.error.as_deref()),
            escape(&row.timestamp),
            status = row.status,
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}
