//! Text extraction: the extractor seam, the Tesseract backend and the
//! image preparation that happens before it.

pub mod engine;
pub mod language;
pub mod preprocess;
pub mod setup;

use anyhow::{anyhow, bail, Result};
use image::GrayImage;
use log::warn;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ValidatorConfig;
use crate::model::ExtractionResult;

pub use engine::TesseractExtractor;
pub use preprocess::{crop_region, Preprocessor};

/// Reads text out of a prepared image region.
///
/// `language` is a backend language hint, e.g. `eng` or `deu+eng`.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// One-time setup for a run in `language`, such as fetching language data.
    fn prepare(&self, _language: &str) -> Result<()> {
        Ok(())
    }

    fn extract(&self, image: &GrayImage, language: &str) -> Result<ExtractionResult>;

    /// Like [`extract`](Self::extract), but fails with [`ExtractionTimeout`]
    /// once `timeout` has passed.
    ///
    /// Returns only after the backend has stopped. Backends that cannot be
    /// interrupted run to completion and report the timeout afterwards.
    fn extract_within(
        &self,
        image: &GrayImage,
        language: &str,
        timeout: Duration,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();
        let result = self.extract(image, language)?;
        if start.elapsed() > timeout {
            return Err(ExtractionTimeout(timeout).into());
        }
        Ok(result)
    }
}

/// Extraction exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("extraction timed out after {} ms", .0.as_millis())]
pub struct ExtractionTimeout(pub Duration);

type Constructor = fn(&ValidatorConfig) -> Result<Arc<dyn TextExtractor>>;

pub const EXTRACTORS: &[(&str, Constructor)] = &[("tesseract", build_tesseract)];

fn build_tesseract(config: &ValidatorConfig) -> Result<Arc<dyn TextExtractor>> {
    Ok(Arc::new(TesseractExtractor::new(&config.tesseract)?))
}

/// Stands in for a backend that could not be started. Every extraction
/// fails with the startup error, so each pair is reported as ERROR.
pub struct UnavailableExtractor {
    name: String,
    reason: String,
}

impl UnavailableExtractor {
    pub fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl TextExtractor for UnavailableExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, _image: &GrayImage, _language: &str) -> Result<ExtractionResult> {
        Err(anyhow!("{} unavailable: {}", self.name, self.reason))
    }
}

/// Creates the extraction backend named in the config.
///
/// An unknown name is an error. A known backend that fails to start is
/// replaced by an [`UnavailableExtractor`].
pub fn create_extractor(config: &ValidatorConfig) -> Result<Arc<dyn TextExtractor>> {
    let key = config.extractor.trim().to_ascii_lowercase();
    let Some((name, constructor)) = EXTRACTORS.iter().find(|(n, _)| *n == key) else {
        bail!(
            "Unknown extractor {:?} (available: {})",
            config.extractor,
            EXTRACTORS
                .iter()
                .map(|(n, _)| *n)
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    match constructor(config) {
        Ok(extractor) => Ok(extractor),
        Err(e) => {
            warn!("{} could not be started: {:#}", name, e);
            Ok(Arc::new(UnavailableExtractor::new(name, format!("{:#}", e))))
        }
    }
}

/// Language hint for `locale`, honouring the configured override.
pub fn language_for(config: &ValidatorConfig, locale: &str) -> String {
    language::resolve(config.tesseract.language.as_deref(), locale)
}
