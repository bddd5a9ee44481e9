//! Read-only lookup tables built once per run.
//!
//! Each store validates its input when it is constructed (required columns,
//! duplicate keys, value ranges) and fails with a [`LoadError`] naming the
//! file and row. Lookups afterwards never fail; absence is `None`.
//!
//! [`LoadError`]: crate::error::LoadError

pub mod coordinates;
pub mod csv;
pub mod expected;
pub mod protocol;

pub use coordinates::{CoordinateKey, CoordinateStore};
pub use expected::{ExpectedStringStore, StringTable};
pub use protocol::ProtocolStore;

use std::path::Path;

/// Returns true if the file should be read as JSON rather than CSV.
pub(crate) fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
