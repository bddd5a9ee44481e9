//! Validation run: joins protocol, coordinates and expected strings and
//! turns every protocol row into a [`ValidationRecord`](crate::model::ValidationRecord).

pub mod observer;
pub mod orchestrator;
pub mod screenshots;

pub use observer::{LoggingObserver, ProgressObserver, ValidationObserver};
pub use orchestrator::Validator;
pub use screenshots::ScreenshotLocator;
