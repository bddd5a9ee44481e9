//! Run summary: status totals, confidence statistics and per-screen counts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ReportRow;
use crate::model::Status;

/// Distribution of extraction confidence over the records that have one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// 25th percentile
    pub quartile_1: f64,
    /// 75th percentile
    pub quartile_3: f64,
}

impl ConfidenceStats {
    /// Returns None when `values` is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        Some(Self {
            count,
            mean,
            median: percentile(&sorted, 50.0),
            min: sorted[0],
            max: sorted[count - 1],
            std_dev: variance.sqrt(),
            quartile_1: percentile(&sorted, 25.0),
            quartile_3: percentile(&sorted, 75.0),
        })
    }
}

/// Percentile of sorted values with linear interpolation between ranks.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let index = (p / 100.0) * (n - 1) as f64;
            let lower = index.floor() as usize;
            let upper = index.ceil() as usize;
            sorted[lower] + (sorted[upper] - sorted[lower]) * index.fract()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenCounts {
    pub screen_id: String,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl ScreenCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errors
    }

    fn add(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Error => self.errors += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// Percentage of PASS records, 0 for an empty run
    pub pass_rate: f64,
    pub confidence: Option<ConfidenceStats>,
    pub avg_processing_ms: Option<f64>,
    /// Screens in order of first appearance
    pub screens: Vec<ScreenCounts>,
}

impl Summary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut totals = ScreenCounts::default();
        let mut screens: Vec<ScreenCounts> = Vec::new();
        for row in rows {
            totals.add(row.status);
            match screens.iter_mut().find(|s| s.screen_id == row.screen_id) {
                Some(screen) => screen.add(row.status),
                None => {
                    let mut screen = ScreenCounts {
                        screen_id: row.screen_id.clone(),
                        ..ScreenCounts::default()
                    };
                    screen.add(row.status);
                    screens.push(screen);
                }
            }
        }

        let confidences: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.confidence.map(f64::from))
            .collect();
        let times: Vec<f64> = rows.iter().filter_map(|r| r.processing_time_ms).collect();
        let avg_processing_ms =
            (!times.is_empty()).then(|| times.iter().sum::<f64>() / times.len() as f64);

        let total = rows.len();
        Self {
            total,
            passed: totals.passed,
            failed: totals.failed,
            errors: totals.errors,
            pass_rate: if total == 0 {
                0.0
            } else {
                totals.passed as f64 * 100.0 / total as f64
            },
            confidence: ConfidenceStats::from_values(&confidences),
            avg_processing_ms,
            screens,
        }
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Pass => self.passed,
            Status::Fail => self.failed,
            Status::Error => self.errors,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total: {}  PASS: {}  FAIL: {}  ERROR: {}  ({:.1}% passed)",
            self.total, self.passed, self.failed, self.errors, self.pass_rate
        )?;
        if let Some(c) = &self.confidence {
            writeln!(
                f,
                "Confidence: mean {:.3}  median {:.3}  min {:.3}  max {:.3}  std dev {:.3}",
                c.mean, c.median, c.min, c.max, c.std_dev
            )?;
        }
        if let Some(ms) = self.avg_processing_ms {
            writeln!(f, "Average extraction time: {:.1} ms", ms)?;
        }
        for screen in &self.screens {
            writeln!(
                f,
                "  {}: {} pass, {} fail, {} error",
                screen.screen_id, screen.passed, screen.failed, screen.errors
            )?;
        }
        Ok(())
    }
}
