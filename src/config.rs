//! Validator configuration.
//!
//! Loaded from a JSON file at startup and passed explicitly to the stores,
//! the validator and the reporters. Every field has a default, so a partial
//! (or absent) file is fine.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "validator.json";

/// Settings for the Tesseract extraction backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Explicit path to the tesseract executable
    pub executable: Option<PathBuf>,
    /// Explicit tessdata directory (passed as --tessdata-dir)
    pub tessdata_dir: Option<PathBuf>,
    /// Overrides the language derived from the locale (e.g. "eng+deu")
    pub language: Option<String>,
    /// Page segmentation mode. 7 = single text line
    pub psm: u8,
    /// Extra arguments appended to the command line
    pub extra_args: Vec<String>,
    /// Download missing traineddata files into the user data directory
    pub download_missing: bool,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata_dir: None,
            language: None,
            psm: 7,
            extra_args: Vec::new(),
            download_missing: false,
        }
    }
}

/// Matcher selection and thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Registry name of the strategy used for every pair
    pub strategy: String,
    /// Minimum similarity ratio for the fuzzy strategy (0.0-1.0)
    pub fuzzy_threshold: f64,
    /// Ordered sub-strategies tried by the composite strategy
    pub composite: Vec<String>,
    /// Compare case-sensitively in the fuzzy strategy
    pub case_sensitive_fuzzy: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategy: "composite".to_string(),
            fuzzy_threshold: default_fuzzy_threshold(),
            composite: vec![
                "exact".to_string(),
                "normalized".to_string(),
                "fuzzy".to_string(),
            ],
            case_sensitive_fuzzy: false,
        }
    }
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

/// Complete validator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Locale validated by this run
    pub locale: String,
    /// Locale whose expected strings file must always exist
    pub source_locale: String,
    pub protocol_file: PathBuf,
    pub coordinates_file: PathBuf,
    pub expected_strings_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    /// Registry name of the extraction backend
    pub extractor: String,
    pub tesseract: TesseractConfig,
    /// Registry name of the preprocessor applied before extraction
    pub preprocessor: String,
    /// Brightness cutoff for the "threshold" preprocessor
    pub threshold: u8,
    /// Regions narrower than this are upscaled by the "basic" preprocessor
    pub upscale_min_width: u32,
    /// Regions shorter than this are upscaled by the "basic" preprocessor
    pub upscale_min_height: u32,
    pub matcher: MatcherConfig,
    /// Per-region extraction timeout; None waits indefinitely
    pub extraction_timeout_ms: Option<u64>,
    /// Any of "csv", "json", "html"
    pub report_formats: Vec<String>,
    /// Render a per-screen status chart next to the reports
    pub chart: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            locale: "en-US".to_string(),
            source_locale: "en-US".to_string(),
            protocol_file: PathBuf::from("test_protocol.csv"),
            coordinates_file: PathBuf::from("string_coordinates.csv"),
            expected_strings_dir: PathBuf::from("expected_strings"),
            screenshots_dir: PathBuf::from("screenshots"),
            extractor: "tesseract".to_string(),
            tesseract: TesseractConfig::default(),
            preprocessor: "basic".to_string(),
            threshold: 190,
            upscale_min_width: 100,
            upscale_min_height: 30,
            matcher: MatcherConfig::default(),
            extraction_timeout_ms: None,
            report_formats: vec!["csv".to_string()],
            chart: false,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ValidatorConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is an error.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            info!("{} not found. Using default config.", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| LoadError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.check(path)?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    fn check(&self, path: &Path) -> Result<(), LoadError> {
        let threshold = self.matcher.fuzzy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LoadError::Config {
                path: path.to_path_buf(),
                message: format!("fuzzy_threshold must be within 0.0-1.0, got {}", threshold),
            });
        }
        if self.locale.trim().is_empty() {
            return Err(LoadError::Config {
                path: path.to_path_buf(),
                message: "locale must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Writes the configuration as pretty JSON (used to scaffold a config file).
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
