//! The per-pair validation loop.

use anyhow::Result;
use image::GrayImage;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::observer::ValidationObserver;
use super::screenshots::{load_region, ScreenshotLocator};
use crate::config::ValidatorConfig;
use crate::error::LoadError;
use crate::matcher::{self, StringMatcher};
use crate::model::{ExtractionResult, ProtocolRow, RecordError, ValidationRecord};
use crate::ocr::{language, preprocess, ExtractionTimeout, Preprocessor, TextExtractor};
use crate::paths;
use crate::store::{CoordinateStore, ExpectedStringStore, ProtocolStore};

/// Drives crop → preprocess → extract → match for every protocol row.
///
/// Pairs are processed one at a time in protocol order. A problem with one
/// pair becomes an ERROR record and the loop moves on.
pub struct Validator {
    extractor: Arc<dyn TextExtractor>,
    preprocessor: Box<dyn Preprocessor>,
    matcher: Box<dyn StringMatcher>,
    screenshots: ScreenshotLocator,
    timeout: Option<Duration>,
    language_override: Option<String>,
    observers: Vec<Box<dyn ValidationObserver>>,
}

impl Validator {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        preprocessor: Box<dyn Preprocessor>,
        matcher: Box<dyn StringMatcher>,
        screenshots: ScreenshotLocator,
    ) -> Self {
        Self {
            extractor,
            preprocessor,
            matcher,
            screenshots,
            timeout: None,
            language_override: None,
            observers: Vec::new(),
        }
    }

    /// Builds a validator with the preprocessor, matcher, screenshot
    /// directory and timeout selected in `config`.
    pub fn from_config(config: &ValidatorConfig, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        let preprocessor = preprocess::create(&config.preprocessor, config)?;
        let matcher = matcher::from_config(&config.matcher)?;
        let screenshots = ScreenshotLocator::new(&paths::screenshots_dir(config));

        let mut validator = Self::new(extractor, preprocessor, matcher, screenshots)
            .with_timeout(config.extraction_timeout_ms.map(Duration::from_millis));
        validator.language_override = config.tesseract.language.clone();
        Ok(validator)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_override = Some(language.into());
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn ValidationObserver>) {
        self.observers.push(observer);
    }

    pub fn matcher(&self) -> &dyn StringMatcher {
        self.matcher.as_ref()
    }

    /// Produces exactly one record per protocol row, in protocol order.
    ///
    /// Fails only when `locale` has no expected strings loaded.
    pub fn validate(
        &mut self,
        protocol: &ProtocolStore,
        coordinates: &CoordinateStore,
        expected: &ExpectedStringStore,
        locale: &str,
    ) -> Result<Vec<ValidationRecord>, LoadError> {
        if !expected.has_locale(locale) {
            return Err(LoadError::LocaleNotLoaded {
                locale: locale.to_string(),
            });
        }

        let language = language::resolve(self.language_override.as_deref(), locale);
        if let Err(e) = self.extractor.prepare(&language) {
            warn!("{} setup for {} failed: {:#}", self.extractor.name(), language, e);
        }

        let total = protocol.row_count();
        for observer in &mut self.observers {
            observer.on_start(total, locale);
        }

        let mut records = Vec::with_capacity(total);
        for row in protocol.rows() {
            let record = self.validate_pair(row, coordinates, expected, locale, &language);
            records.push(record);

            let index = records.len();
            if let Some(record) = records.last() {
                for observer in &mut self.observers {
                    observer.on_record(index, total, record);
                }
            }
        }

        for observer in &mut self.observers {
            observer.on_complete(&records);
        }
        Ok(records)
    }

    fn validate_pair(
        &self,
        row: ProtocolRow,
        coordinates: &CoordinateStore,
        expected: &ExpectedStringStore,
        locale: &str,
        language: &str,
    ) -> ValidationRecord {
        let Some(coordinate) = coordinates.get_row(&row) else {
            return ValidationRecord::failed(row, None, None, RecordError::CoordinateNotFound);
        };

        let Some(expected_text) = expected.get(locale, &row.expected_string_id) else {
            return ValidationRecord::failed(
                row,
                Some(coordinate),
                None,
                RecordError::ExpectedStringNotFound,
            );
        };
        let expected_text = expected_text.to_string();

        let region = match self.screenshots.locate(&row.screen_id) {
            None => Err(RecordError::CropFailed(format!(
                "no screenshot for screen {} in {}",
                row.screen_id,
                self.screenshots.dir().display()
            ))),
            Some(path) => load_region(path, &coordinate)
                .map_err(|e| RecordError::CropFailed(format!("{:#}", e))),
        };
        let region = match region {
            Ok(region) => region,
            Err(e) => {
                return ValidationRecord::failed(row, Some(coordinate), Some(expected_text), e);
            }
        };

        let prepared = match self.preprocessor.apply(&region) {
            Ok(image) => image,
            Err(e) => {
                return ValidationRecord::failed(
                    row,
                    Some(coordinate),
                    Some(expected_text),
                    RecordError::PreprocessFailed(format!("{:#}", e)),
                );
            }
        };

        let extraction = match self.extract(&prepared, language) {
            Ok(extraction) => extraction,
            Err(e) => {
                return ValidationRecord::failed(row, Some(coordinate), Some(expected_text), e);
            }
        };

        let outcome = self.matcher.evaluate(&expected_text, &extraction.text);
        debug!(
            "{}/{}/{}: {:?} -> {:?} ({})",
            row.step_id, row.screen_id, row.expected_string_id, expected_text, extraction.text, outcome.strategy
        );
        ValidationRecord::matched(row, coordinate, expected_text, extraction, outcome)
    }

    /// Runs the extractor, bounded by the configured timeout.
    ///
    /// The extractor has stopped when this returns, so pairs never overlap.
    fn extract(&self, image: &GrayImage, language: &str) -> Result<ExtractionResult, RecordError> {
        let result = match self.timeout {
            Some(timeout) => self.extractor.extract_within(image, language, timeout),
            None => self.extractor.extract(image, language),
        };
        result.map_err(|e| match e.downcast_ref::<ExtractionTimeout>() {
            Some(ExtractionTimeout(budget)) => RecordError::ExtractionTimedOut(budget.as_millis() as u64),
            None => RecordError::ExtractionFailed(format!("{:#}", e)),
        })
    }
}
