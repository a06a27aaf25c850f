// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-axis value ranges: exact (memoized) and percentile-trimmed.

use alloc::vec::Vec;

use crate::error::ScatterError;
use crate::record::PointRecord;
use crate::resolve::ScatterOptions;

/// A data axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal axis (index 0).
    X,
    /// Vertical axis (index 1).
    Y,
}

impl Axis {
    const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }

    /// The other axis.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }

    fn of<D>(self, rec: &PointRecord<D>) -> f64 {
        match self {
            Self::X => rec.position.x,
            Self::Y => rec.position.y,
        }
    }
}

/// Raw extreme values of one axis and the padding owed to each.
///
/// The pads are the resolved sizes of the records holding the extremes (the
/// first such record on ties), or zero for screen-pinned markers.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Extremes {
    min: f64,
    min_pad: f64,
    max: f64,
    max_pad: f64,
}

impl Extremes {
    fn single(v: f64, pad: f64) -> Self {
        Self {
            min: v,
            min_pad: pad,
            max: v,
            max_pad: pad,
        }
    }

    fn range(self) -> (f64, f64) {
        (self.min - self.min_pad, self.max + self.max_pad)
    }

    /// Folds in extremes of records stored after these; ties keep `self`.
    fn merge(self, later: Self) -> Self {
        let mut out = self;
        if later.min < out.min {
            out.min = later.min;
            out.min_pad = later.min_pad;
        }
        if later.max > out.max {
            out.max = later.max;
            out.max_pad = later.max_pad;
        }
        out
    }
}

fn merge(a: Option<Extremes>, b: Option<Extremes>) -> Option<Extremes> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum Cached {
    #[default]
    Invalid,
    Valid(Option<Extremes>),
}

/// Memoized exact range per axis.
///
/// Only the unfiltered exact range is cached; percentile and filtered queries
/// are recomputed on every call.
#[derive(Clone, Debug, Default)]
pub struct BoundsCache {
    exact: [Cached; 2],
}

impl BoundsCache {
    /// Creates an invalid cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops both cached ranges.
    pub fn invalidate(&mut self) {
        self.exact = [Cached::Invalid; 2];
    }

    /// Returns `true` if the exact range of `axis` is cached.
    #[must_use]
    pub fn is_valid(&self, axis: Axis) -> bool {
        self.exact[axis.index()] != Cached::Invalid
    }

    /// Folds newly appended records into any cached exact range.
    ///
    /// Raw extremes are compared, and an appended record only takes over an
    /// extreme it strictly exceeds, so this matches a full recompute.
    pub fn extend<D>(&mut self, appended: &[PointRecord<D>], options: &ScatterOptions) {
        for axis in [Axis::X, Axis::Y] {
            let slot = &mut self.exact[axis.index()];
            if let Cached::Valid(current) = *slot {
                let added = extremes(appended, options, axis, None);
                *slot = Cached::Valid(merge(current, added));
            }
        }
    }

    /// The exact, unfiltered range of `axis`, memoized until invalidated.
    pub fn exact<D>(
        &mut self,
        records: &[PointRecord<D>],
        options: &ScatterOptions,
        axis: Axis,
    ) -> Option<(f64, f64)> {
        let slot = &mut self.exact[axis.index()];
        if let Cached::Valid(found) = *slot {
            return found.map(Extremes::range);
        }
        let found = extremes(records, options, axis, None);
        *slot = Cached::Valid(found);
        found.map(Extremes::range)
    }

    /// The value range of `axis`.
    ///
    /// - `frac >= 1`: exact range. Unless markers are pinned to the screen,
    ///   the minimum is lowered by the resolved size of the record holding it
    ///   and the maximum raised by that of its record (first record on ties).
    /// - `0 < frac < 1`: the `[50 − 50·frac, 50 + 50·frac]` percentile range of
    ///   the raw axis values.
    /// - `frac <= 0` or NaN: [`ScatterError::InvalidFraction`].
    ///
    /// `ortho` restricts the statistic to records whose value on the other
    /// axis lies in the inclusive interval. Returns `None` when no record is
    /// selected.
    pub fn data_bounds<D>(
        &mut self,
        records: &[PointRecord<D>],
        options: &ScatterOptions,
        axis: Axis,
        frac: f64,
        ortho: Option<(f64, f64)>,
    ) -> Result<Option<(f64, f64)>, ScatterError> {
        if !(frac > 0.0) {
            return Err(ScatterError::InvalidFraction(frac));
        }
        if frac >= 1.0 {
            return Ok(match ortho {
                Some(_) => extremes(records, options, axis, ortho).map(Extremes::range),
                None => self.exact(records, options, axis),
            });
        }

        let mut values: Vec<f64> = selected(records, axis, ortho).map(|r| axis.of(r)).collect();
        if values.is_empty() {
            return Ok(None);
        }
        values.sort_by(f64::total_cmp);
        Ok(Some((
            score_at_percentile(&values, 50.0 - frac * 50.0),
            score_at_percentile(&values, 50.0 + frac * 50.0),
        )))
    }
}

fn selected<D>(
    records: &[PointRecord<D>],
    axis: Axis,
    ortho: Option<(f64, f64)>,
) -> impl Iterator<Item = &PointRecord<D>> {
    let other = axis.other();
    records.iter().filter(move |r| match ortho {
        Some((lo, hi)) => {
            let v = other.of(r);
            v >= lo && v <= hi
        }
        None => true,
    })
}

fn extremes<D>(
    records: &[PointRecord<D>],
    options: &ScatterOptions,
    axis: Axis,
    ortho: Option<(f64, f64)>,
) -> Option<Extremes> {
    let pinned = options.pins_to_screen();
    selected(records, axis, ortho).fold(None, |acc, r| {
        let pad = if pinned {
            0.0
        } else {
            r.size.unwrap_or(options.size)
        };
        merge(acc, Some(Extremes::single(axis.of(r), pad)))
    })
}

/// Union of the boxes data-space markers occupy along `axis`, `v ± size/2`.
///
/// `None` for screen-pinned markers, whose footprint depends on the view.
pub(crate) fn marker_footprint<D>(
    records: &[PointRecord<D>],
    options: &ScatterOptions,
    axis: Axis,
) -> Option<(f64, f64)> {
    if options.pins_to_screen() {
        return None;
    }
    records.iter().fold(None, |acc, r| {
        let v = axis.of(r);
        let half = r.size.unwrap_or(options.size) * 0.5;
        union(acc, Some((v - half, v + half)))
    })
}

pub(crate) fn union(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Linearly interpolated percentile of sorted, non-empty `values`.
///
/// The score sits at fractional index `p / 100 · (n − 1)`.
fn score_at_percentile(values: &[f64], percent: f64) -> f64 {
    let last = values.len() - 1;
    let idx = (percent / 100.0 * last as f64).clamp(0.0, last as f64);
    #[expect(
        clippy::cast_possible_truncation,
        reason = "idx is in [0, last], so truncation is the floor"
    )]
    let lo = idx as usize;
    let below = values[lo];
    if lo >= last {
        return below;
    }
    let frac = idx - lo as f64;
    below + (values[lo + 1] - below) * frac
}
