// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-spot records and their stable handles.

use alloc::string::String;
use core::fmt;

use kurbo::Point;

use crate::style::{BrushRef, PenRef};

/// Generational handle of a spot in a [`ScatterItem`](crate::ScatterItem).
///
/// Handles stay valid across [`append`](crate::ScatterItem::append); a full
/// replacement or a clear starts a new epoch and invalidates every handle
/// issued before it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpotId {
    epoch: u32,
    index: u32,
}

impl SpotId {
    pub(crate) const fn new(index: u32, epoch: u32) -> Self {
        Self { index, epoch }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "spot indices are issued as u32"
    )]
    pub(crate) const fn at(index: usize, epoch: u32) -> Self {
        Self::new(index as u32, epoch)
    }

    /// Position of the spot in paint order (back to front).
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Store generation this handle was issued in.
    #[must_use]
    pub const fn epoch(self) -> u32 {
        self.epoch
    }
}

impl fmt::Debug for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpotId({}@{})", self.index, self.epoch)
    }
}

/// One marker: a position plus optional per-spot overrides.
///
/// `None` in an override field means "use the item default".
#[derive(Clone, Debug)]
pub struct PointRecord<D = ()> {
    /// Data-space position.
    pub position: Point,
    /// Marker size override.
    pub size: Option<f64>,
    /// Symbol name override.
    pub symbol: Option<String>,
    /// Outline style override.
    pub pen: Option<PenRef>,
    /// Fill style override.
    pub brush: Option<BrushRef>,
    /// Tool tip template override.
    pub tool_tip: Option<String>,
    /// Opaque user payload.
    pub data: Option<D>,
}

impl<D> PointRecord<D> {
    /// A record at `position` with no overrides and no payload.
    pub fn new(position: impl Into<Point>) -> Self {
        Self {
            position: position.into(),
            size: None,
            symbol: None,
            pen: None,
            brush: None,
            tool_tip: None,
            data: None,
        }
    }

    /// Returns `true` if any appearance attribute (size, symbol, pen, brush)
    /// is overridden.
    ///
    /// Tool tips do not affect the rasterized appearance and are not counted.
    #[must_use]
    pub fn has_style_overrides(&self) -> bool {
        self.size.is_some() || self.symbol.is_some() || self.pen.is_some() || self.brush.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::solid_brush;

    #[test]
    fn fresh_record_has_no_overrides() {
        let mut rec = PointRecord::<()>::new((1.0, 2.0));
        assert_eq!(rec.position, Point::new(1.0, 2.0));
        assert!(!rec.has_style_overrides());
        rec.tool_tip = Some("tip".into());
        assert!(!rec.has_style_overrides());
        rec.brush = Some(solid_brush(1, 2, 3));
        assert!(rec.has_style_overrides());
    }

    #[test]
    fn spot_ids_order_by_epoch_then_index() {
        assert!(SpotId::new(5, 0) < SpotId::new(0, 1));
        assert_eq!(SpotId::new(3, 2).index(), 3);
        assert_eq!(alloc::format!("{:?}", SpotId::new(3, 2)), "SpotId(3@2)");
    }
}
