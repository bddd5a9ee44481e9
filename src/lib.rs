//! Validates localized UI strings in screenshots.
//!
//! A test protocol lists, per step and screen, the string ids expected on
//! screen. Each id is located through the coordinate table, cropped from the
//! screenshot, read by a text extractor and compared with the expected text
//! of the active locale. Every protocol row yields one PASS, FAIL or ERROR
//! record, which the reporters serialize.

pub mod annotate;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod ocr;
pub mod paths;
pub mod report;
pub mod store;
pub mod validation;

pub use config::ValidatorConfig;
pub use error::LoadError;
pub use model::{Coordinate, Status, ValidationRecord};
pub use validation::Validator;
