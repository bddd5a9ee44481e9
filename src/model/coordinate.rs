//! Bounding boxes of annotated strings on a screenshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reasons a set of bounds cannot form a [`Coordinate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("right ({right}) must be greater than left ({left})")]
    EmptyWidth { left: u32, right: u32 },
    #[error("bottom ({bottom}) must be greater than top ({top})")]
    EmptyHeight { top: u32, bottom: u32 },
    #[error("bounds must not be negative: ({0}, {1}, {2}, {3})")]
    Negative(i64, i64, i64, i64),
}

/// A rectangle in absolute pixel coordinates.
///
/// `right` and `bottom` are exclusive, so a box from (10, 10) to (200, 40)
/// is 190 pixels wide and 30 pixels tall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct Coordinate {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Coordinate {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Result<Self, CoordinateError> {
        if right <= left {
            return Err(CoordinateError::EmptyWidth { left, right });
        }
        if bottom <= top {
            return Err(CoordinateError::EmptyHeight { top, bottom });
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Builds a coordinate from signed values as they appear in input files.
    pub fn from_signed(left: i64, top: i64, right: i64, bottom: i64) -> Result<Self, CoordinateError> {
        let to_u32 = |v: i64| u32::try_from(v).ok();
        match (to_u32(left), to_u32(top), to_u32(right), to_u32(bottom)) {
            (Some(l), Some(t), Some(r), Some(b)) => Self::new(l, t, r, b),
            _ => Err(CoordinateError::Negative(left, top, right, bottom)),
        }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns true if the whole box lies inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right <= width && self.bottom <= height
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[derive(Serialize, Deserialize)]
struct RawBounds {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl TryFrom<RawBounds> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Coordinate::from_signed(raw.left, raw.top, raw.right, raw.bottom)
    }
}

impl From<Coordinate> for RawBounds {
    fn from(c: Coordinate) -> Self {
        Self {
            left: c.left as i64,
            top: c.top as i64,
            right: c.right as i64,
            bottom: c.bottom as i64,
        }
    }
}
