// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for scatter ingest, styling, and queries.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use crate::record::SpotId;

/// Why a spot descriptor (or a positional ingest argument) was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorIssue {
    /// The descriptor used a key outside the recognized set.
    UnknownKey(String),
    /// Two keys that describe the same thing were both given (e.g. `pos` and `x`).
    ConflictingKeys(&'static str, &'static str),
    /// Neither `pos` nor both of `x` and `y` were given.
    MissingPosition,
    /// A recognized key carried a value of the wrong kind.
    WrongValueType(&'static str),
    /// A positional argument had a shape that cannot be interpreted.
    ///
    /// One positional argument must be a descriptor list; two must be `x` and
    /// `y` value lists.
    PositionalShape,
}

impl fmt::Display for DescriptorIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown spot parameter `{key}`"),
            Self::ConflictingKeys(a, b) => write!(f, "`{a}` conflicts with `{b}`"),
            Self::MissingPosition => f.write_str("no position given (`pos` or `x` and `y`)"),
            Self::WrongValueType(key) => write!(f, "wrong value type for `{key}`"),
            Self::PositionalShape => f.write_str(
                "positional arguments must be one spot list or two x/y value lists",
            ),
        }
    }
}

/// Opaque failure reported by a [`MarkerRasterizer`](crate::MarkerRasterizer).
///
/// The backend's own error is kept intact and exposed through
/// [`core::error::Error::source`].
pub struct RasterError(Box<dyn core::error::Error + Send + Sync>);

impl RasterError {
    /// Wraps a backend error.
    pub fn new(error: impl core::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(error))
    }

    /// Returns the wrapped backend error.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn core::error::Error + Send + Sync> {
        self.0
    }
}

impl fmt::Debug for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RasterError").field(&self.0).finish()
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rasterization failed: {}", self.0)
    }
}

impl core::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&*self.0)
    }
}

/// Errors reported by scatter operations.
///
/// All of these are raised synchronously at the call that violates the
/// contract. A failed mutation leaves the item unchanged.
#[derive(Debug)]
pub enum ScatterError {
    /// A spot descriptor could not be normalized into a record.
    InvalidSpotDescriptor {
        /// Index of the offending descriptor (or positional argument).
        index: usize,
        /// What was wrong with it.
        issue: DescriptorIssue,
    },
    /// More positional arguments (or ingest forms) than can be disambiguated.
    TooManyArguments {
        /// Number of arguments or forms that were supplied.
        given: usize,
    },
    /// A per-spot sequence did not match the number of records it applies to.
    LengthMismatch {
        /// The attribute or column whose length was wrong.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// A symbol name that is not in the registry.
    UnknownSymbol(String),
    /// A marker size that is not strictly positive (or not a number).
    InvalidSize(f64),
    /// A percentile fraction that is not strictly positive (or not a number).
    InvalidFraction(f64),
    /// A spot handle from an earlier generation of the store, or out of range.
    StaleSpot(SpotId),
    /// The rasterizer failed to produce a marker image.
    Raster(RasterError),
}

impl fmt::Display for ScatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpotDescriptor { index, issue } => {
                write!(f, "invalid spot descriptor at index {index}: {issue}")
            }
            Self::TooManyArguments { given } => write!(
                f,
                "only one ingest form (at most two positional arguments) is accepted, got {given}"
            ),
            Self::LengthMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "number of {what} values does not match number of points ({actual} != {expected})"
            ),
            Self::UnknownSymbol(name) => write!(f, "unknown symbol `{name}`"),
            Self::InvalidSize(size) => write!(f, "marker size must be > 0 (got {size})"),
            Self::InvalidFraction(frac) => {
                write!(f, "value for parameter `frac` must be > 0 (got {frac})")
            }
            Self::StaleSpot(id) => write!(f, "spot handle {id:?} is no longer valid"),
            Self::Raster(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl core::error::Error for ScatterError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Raster(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RasterError> for ScatterError {
    fn from(err: RasterError) -> Self {
        Self::Raster(err)
    }
}

pub(crate) fn check_size(size: f64) -> Result<f64, ScatterError> {
    // Written so that NaN is rejected as well.
    if size > 0.0 {
        Ok(size)
    } else {
        Err(ScatterError::InvalidSize(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[derive(Debug)]
    struct Oom;

    impl fmt::Display for Oom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("out of image memory")
        }
    }

    impl core::error::Error for Oom {}

    #[test]
    fn raster_error_keeps_backend_error_as_source() {
        use core::error::Error as _;

        let err = ScatterError::from(RasterError::new(Oom));
        let source = err.source().expect("raster errors expose a source");
        assert_eq!(source.to_string(), "rasterization failed: out of image memory");
        let inner = source.source().expect("backend error is reachable");
        assert_eq!(inner.to_string(), "out of image memory");
    }

    #[test]
    fn check_size_rejects_non_positive_and_nan() {
        assert!(check_size(1.5).is_ok());
        assert!(matches!(check_size(0.0), Err(ScatterError::InvalidSize(_))));
        assert!(matches!(check_size(-3.0), Err(ScatterError::InvalidSize(_))));
        assert!(matches!(check_size(f64::NAN), Err(ScatterError::InvalidSize(_))));
    }

    #[test]
    fn length_mismatch_message_names_the_attribute() {
        let err = ScatterError::LengthMismatch {
            what: "size",
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "number of size values does not match number of points (2 != 3)"
        );
    }
}
