//! Fatal, load-time errors.
//!
//! Anything in here aborts a run before a single record is produced.
//! Per-pair problems are [`crate::model::RecordError`] instead.

use std::path::PathBuf;

use crate::model::CoordinateError;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: missing required columns: {columns}")]
    MissingColumns { path: PathBuf, columns: String },

    #[error("{path}: row {row}: missing value for {field}")]
    MissingField {
        path: PathBuf,
        row: usize,
        field: String,
    },

    #[error("{path}: row {row}: invalid value for {field}: {value:?}")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        field: String,
        value: String,
    },

    #[error("{path}: row {row}: invalid coordinate: {source}")]
    InvalidCoordinate {
        path: PathBuf,
        row: usize,
        #[source]
        source: CoordinateError,
    },

    #[error("{path}: duplicate key {key}")]
    DuplicateKey { path: PathBuf, key: String },

    #[error("{path}: invalid JSON: {message}")]
    InvalidJson { path: PathBuf, message: String },

    #[error("{path}: no test steps defined")]
    EmptyProtocol { path: PathBuf },

    #[error("locale {locale} not found (expected {path})")]
    LocaleNotFound { locale: String, path: PathBuf },

    #[error("locale {locale} has no expected strings loaded")]
    LocaleNotLoaded { locale: String },

    #[error("source locale {locale} is required but {path} is missing")]
    SourceLocaleMissing { locale: String, path: PathBuf },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::InvalidJson {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
