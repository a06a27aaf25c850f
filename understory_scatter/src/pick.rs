// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking and overall bounds.

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect};

use crate::record::SpotId;
use crate::visual::VisualObject;

/// Size of one device pixel in data units, per axis.
///
/// Screen-pinned markers have a size in device pixels; this converts it into
/// the data space that positions and queries live in. The two axes scale
/// independently.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelScale {
    /// Data units per device pixel along x.
    pub x: f64,
    /// Data units per device pixel along y.
    pub y: f64,
}

impl PixelScale {
    /// One data unit per pixel on both axes.
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    /// Creates a scale from explicit per-axis factors.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Derives the scale from the transform mapping data space to device
    /// pixels.
    ///
    /// Each factor is the data-space length of a one-pixel step along the
    /// corresponding device axis. The transform must be invertible.
    #[must_use]
    pub fn from_view_transform(view: Affine) -> Self {
        let inv = view.inverse();
        let origin = inv * Point::ORIGIN;
        Self {
            x: (inv * Point::new(1.0, 0.0) - origin).length(),
            y: (inv * Point::new(0.0, 1.0) - origin).length(),
        }
    }
}

impl Default for PixelScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Hits at `pos`, front to back.
///
/// `visuals` is in paint order (back to front), so the result is reversed:
/// the last-painted spot comes first.
pub(crate) fn points_at<'a>(
    visuals: impl DoubleEndedIterator<Item = &'a VisualObject>,
    pos: Point,
    scale: PixelScale,
) -> Vec<SpotId> {
    visuals
        .rev()
        .filter(|v| v.contains_point(pos, scale))
        .map(VisualObject::spot)
        .collect()
}

/// Combines per-axis data ranges into a rectangle.
///
/// Missing ranges collapse to `0`. With `pinned_size`, the rectangle is padded
/// by half of a screen-pinned marker of that size, converted to data units.
pub(crate) fn bounding_rect(
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
    pinned_size: Option<f64>,
    scale: PixelScale,
) -> Rect {
    let (x0, x1) = x.unwrap_or((0.0, 0.0));
    let (y0, y1) = y.unwrap_or((0.0, 0.0));
    let rect = Rect::new(x0, y0, x1, y1);
    match pinned_size {
        Some(size) => rect.inflate(size * 0.5 * scale.x, size * 0.5 * scale.y),
        None => rect,
    }
}
