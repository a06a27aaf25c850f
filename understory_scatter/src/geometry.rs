// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol geometry: scaling unit-box outlines to marker size with pen-width
//! compensation.

use kurbo::{Affine, BezPath, Shape};

use crate::error::{ScatterError, check_size};
use crate::symbol::SymbolDefinition;

/// Scales `def` to `size` and shrinks it so that a stroke of `stroke_width`,
/// centered on the outline, stays inside the `size × size` box.
///
/// Each axis is shrunk by `stroke_width / extent` of the scaled outline on
/// that axis, so the compensation is non-uniform for symbols that are not
/// square (the diamond, for example). The factor is clamped at zero; a
/// stroke wider than the symbol collapses that axis instead of mirroring it.
pub fn build_path(
    def: &SymbolDefinition,
    size: f64,
    stroke_width: f64,
) -> Result<BezPath, ScatterError> {
    let size = check_size(size)?;
    let mut path = def.path().clone();
    path.apply_affine(Affine::scale(size));

    let bbox = path.bounding_box();
    let stroke_width = stroke_width.max(0.0);
    let w_scale = compensation(stroke_width, bbox.width());
    let h_scale = compensation(stroke_width, bbox.height());
    path.apply_affine(Affine::scale_non_uniform(w_scale, h_scale));
    Ok(path)
}

fn compensation(stroke_width: f64, extent: f64) -> f64 {
    if extent > 0.0 {
        (1.0 - stroke_width / extent).max(0.0)
    } else {
        1.0
    }
}
