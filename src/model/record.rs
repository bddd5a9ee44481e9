//! Per-pair outcomes produced by a validation run.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::coordinate::Coordinate;
use super::step::ProtocolRow;

/// Final status of one (step, string) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }

    pub const ALL: [Status; 3] = [Status::Pass, Status::Fail, Status::Error];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Text read from one image region by an extraction backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    /// Backend confidence in [0, 1].
    pub confidence: f32,
    pub duration: Duration,
}

impl ExtractionResult {
    pub fn new(text: impl Into<String>, confidence: f32, duration: Duration) -> Self {
        Self {
            text: text.into(),
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
            duration,
        }
    }
}

/// Verdict of a matcher strategy for one (expected, actual) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub passed: bool,
    /// Name of the strategy that decided the outcome. For composites this
    /// names the sub-strategy that matched, e.g. `composite(fuzzy)`.
    pub strategy: String,
    /// Similarity score in [0, 1] where the strategy computes one.
    pub score: Option<f64>,
}

impl MatchOutcome {
    pub fn status(&self) -> Status {
        if self.passed {
            Status::Pass
        } else {
            Status::Fail
        }
    }
}

/// Recoverable problems that turn a pair into an ERROR record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("coordinate not found")]
    CoordinateNotFound,
    #[error("expected string not found")]
    ExpectedStringNotFound,
    #[error("image crop failed: {0}")]
    CropFailed(String),
    #[error("preprocessing failed: {0}")]
    PreprocessFailed(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("extraction timed out after {0} ms")]
    ExtractionTimedOut(u64),
}

/// The atomic output unit of a run: one per protocol row.
#[derive(Clone, Debug)]
pub struct ValidationRecord {
    row: ProtocolRow,
    coordinate: Option<Coordinate>,
    expected_text: Option<String>,
    extraction: Option<ExtractionResult>,
    status: Status,
    strategy: Option<String>,
    score: Option<f64>,
    error: Option<RecordError>,
    timestamp: DateTime<Local>,
}

impl ValidationRecord {
    /// Record for a pair that made it through extraction and matching.
    pub fn matched(
        row: ProtocolRow,
        coordinate: Coordinate,
        expected_text: String,
        extraction: ExtractionResult,
        outcome: MatchOutcome,
    ) -> Self {
        Self {
            row,
            coordinate: Some(coordinate),
            expected_text: Some(expected_text),
            extraction: Some(extraction),
            status: outcome.status(),
            strategy: Some(outcome.strategy),
            score: outcome.score,
            error: None,
            timestamp: Local::now(),
        }
    }

    /// Record for a pair that could not be evaluated.
    pub fn failed(
        row: ProtocolRow,
        coordinate: Option<Coordinate>,
        expected_text: Option<String>,
        error: RecordError,
    ) -> Self {
        Self {
            row,
            coordinate,
            expected_text,
            extraction: None,
            status: Status::Error,
            strategy: None,
            score: None,
            error: Some(error),
            timestamp: Local::now(),
        }
    }

    pub fn row(&self) -> &ProtocolRow {
        &self.row
    }

    pub fn step_id(&self) -> &str {
        &self.row.step_id
    }

    pub fn screen_id(&self) -> &str {
        &self.row.screen_id
    }

    pub fn string_id(&self) -> &str {
        &self.row.expected_string_id
    }

    pub fn coordinate(&self) -> Option<&Coordinate> {
        self.coordinate.as_ref()
    }

    pub fn expected_text(&self) -> Option<&str> {
        self.expected_text.as_deref()
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extraction.as_ref().map(|e| e.text.as_str())
    }

    pub fn confidence(&self) -> Option<f32> {
        self.extraction.as_ref().map(|e| e.confidence)
    }

    pub fn processing_time_ms(&self) -> Option<f64> {
        self.extraction
            .as_ref()
            .map(|e| e.duration.as_secs_f64() * 1000.0)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn strategy(&self) -> Option<&str> {
        self.strategy.as_deref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn error(&self) -> Option<&RecordError> {
        self.error.as_ref()
    }

    /// Human-readable reason for ERROR records.
    pub fn reason(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }
}
