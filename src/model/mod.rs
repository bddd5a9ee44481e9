//! Value types shared by the stores, the matcher and the validator.
//!
//! Everything here is constructed once and read afterwards; derived values
//! (width, area, pass/fail) are computed on access.

pub mod coordinate;
pub mod record;
pub mod step;

pub use coordinate::{Coordinate, CoordinateError};
pub use record::{ExtractionResult, MatchOutcome, RecordError, Status, ValidationRecord};
pub use step::{ProtocolRow, TestStep};
