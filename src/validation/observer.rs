//! Progress notifications emitted while a run produces records.

use log::{debug, info, warn};
use std::io::Write;

use crate::model::{Status, ValidationRecord};

/// Receives run events in order, on the thread running the validation.
pub trait ValidationObserver {
    fn on_start(&mut self, _total: usize, _locale: &str) {}

    /// Called once per record, right after it is produced. `index` is 1-based.
    fn on_record(&mut self, _index: usize, _total: usize, _record: &ValidationRecord) {}

    fn on_complete(&mut self, _records: &[ValidationRecord]) {}
}

/// Writes per-record outcomes to the log.
pub struct LoggingObserver;

impl ValidationObserver for LoggingObserver {
    fn on_start(&mut self, total: usize, locale: &str) {
        info!("Validating {} strings for locale {}", total, locale);
    }

    fn on_record(&mut self, index: usize, total: usize, record: &ValidationRecord) {
        match record.status() {
            Status::Error => warn!(
                "[{}/{}] {}/{}/{}: {}",
                index,
                total,
                record.step_id(),
                record.screen_id(),
                record.string_id(),
                record.reason().unwrap_or_default()
            ),
            status => debug!(
                "[{}/{}] {}/{}/{}: {} ({:?} vs {:?})",
                index,
                total,
                record.step_id(),
                record.screen_id(),
                record.string_id(),
                status,
                record.expected_text().unwrap_or_default(),
                record.extracted_text().unwrap_or_default()
            ),
        }
    }

    fn on_complete(&mut self, records: &[ValidationRecord]) {
        let passed = records.iter().filter(|r| r.is_pass()).count();
        info!("Validation complete: {}/{} passed", passed, records.len());
    }
}

/// Prints one line per record, e.g. `[3/12] PASS  S1 SCR1 WELCOME_TITLE`.
pub struct ProgressObserver<W: Write> {
    out: W,
}

impl<W: Write> ProgressObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ProgressObserver<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ValidationObserver for ProgressObserver<W> {
    fn on_record(&mut self, index: usize, total: usize, record: &ValidationRecord) {
        let detail = match record.status() {
            Status::Error => record.reason().unwrap_or_default(),
            _ => record.strategy().unwrap_or_default().to_string(),
        };
        // Best effort.
        let _ = writeln!(
            self.out,
            "[{}/{}] {:<5} {} {} {} ({})",
            index,
            total,
            record.status(),
            record.step_id(),
            record.screen_id(),
            record.string_id(),
            detail
        );
    }
}
