// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-based invariant tests for `ScatterItem`.
//!
//! 1. Replacing with N descriptors stores N records.
//! 2. Resolution picks the override when present, the default otherwise.
//! 3. Percentile ranges lie inside the exact range.
//! 4. Nothing is hit outside the bounding rectangle.
//! 5. Appending never changes earlier spots.
//! 6. A wrong-length override fails and changes nothing.
//! 7. Refreshing an unchanged spot reproduces the same geometry.
//! 8. Pen-compensated outlines plus their stroke fit the marker box.
//! 9. Identical markers without overrides share one pixmap.

use std::sync::Arc;

use kurbo::{Point, Shape};
use proptest::prelude::*;
use understory_scatter::{
    AttributeUpdate, AttributeValue, Axis, MarkerImage, MarkerRasterizer, PixelScale,
    RasterError, RasterRequest, ScatterError, ScatterItem, SpotBatch, SpotDescriptor,
    SymbolRegistry, Values, VisualKind, build_path,
};

struct Blank;

impl MarkerRasterizer for Blank {
    fn rasterize(&mut self, req: &RasterRequest<'_>) -> Result<MarkerImage, RasterError> {
        Ok(MarkerImage::transparent(req.width, req.height))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

const SYMBOLS: [&str; 6] = ["o", "s", "t", "d", "+", "b"];

fn coord() -> impl Strategy<Value = f64> {
    -1000.0..1000.0_f64
}

fn point() -> impl Strategy<Value = (f64, f64)> {
    (coord(), coord())
}

fn descriptor() -> impl Strategy<Value = SpotDescriptor<u32>> {
    (
        point(),
        proptest::option::of(0.5..40.0_f64),
        proptest::option::of(0..SYMBOLS.len()),
        any::<u32>(),
    )
        .prop_map(|(pos, size, symbol, data)| {
            let mut desc = SpotDescriptor::at(pos).data(data);
            if let Some(size) = size {
                desc = desc.size(size);
            }
            if let Some(i) = symbol {
                desc = desc.symbol(SYMBOLS[i]);
            }
            desc
        })
}

fn item_from(descs: Vec<SpotDescriptor<u32>>, px_mode: bool) -> ScatterItem<u32> {
    let mut item = ScatterItem::new(Blank);
    item.set_px_mode(px_mode);
    item.replace_all(SpotBatch::from_spots(descs)).unwrap();
    item
}

// ── 1. Replace stores every descriptor ──────────────────────────────────

proptest! {
    #[test]
    fn replace_all_stores_every_descriptor(descs in prop::collection::vec(descriptor(), 0..64)) {
        let n = descs.len();
        let item = item_from(descs, true);
        prop_assert_eq!(item.len(), n);
        prop_assert_eq!(item.spot_ids().len(), n);
    }
}

// ── 2. Overlay rule ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn resolution_follows_the_overlay(
        descs in prop::collection::vec(descriptor(), 1..32),
        default_size in 1.0..20.0_f64,
    ) {
        let mut item = item_from(descs, true);
        item.set_default(AttributeValue::Size(default_size)).unwrap();
        for id in item.spot_ids().collect::<Vec<_>>() {
            let record = item.record(id).unwrap();
            let style = item.resolve(id).unwrap();
            prop_assert_eq!(style.size, record.size.unwrap_or(default_size));
            prop_assert_eq!(
                style.symbol,
                record.symbol.as_deref().unwrap_or(&item.options().symbol)
            );
            prop_assert!(record.pen.is_none());
            prop_assert!(understory_scatter::StyleRef::same(style.pen, &item.options().pen));
        }
    }
}

// ── 3. Percentiles are sub-intervals ────────────────────────────────────

proptest! {
    #[test]
    fn percentile_range_within_exact_range(
        descs in prop::collection::vec(descriptor(), 1..64),
        frac in 0.01..1.0_f64,
        px_mode in any::<bool>(),
    ) {
        let mut item = item_from(descs, px_mode);
        for axis in [Axis::X, Axis::Y] {
            let (lo, hi) = item.data_bounds(axis, 1.0, None).unwrap().unwrap();
            let (plo, phi) = item.data_bounds(axis, frac, None).unwrap().unwrap();
            prop_assert!(lo <= plo && plo <= phi && phi <= hi,
                "{:?}: ({}, {}) not within ({}, {})", axis, plo, phi, lo, hi);
        }
    }
}

// ── 4. Picking stays inside the bounding rectangle ──────────────────────

proptest! {
    #[test]
    fn no_hits_outside_bounding_rect(
        descs in prop::collection::vec(descriptor(), 0..32),
        px_mode in any::<bool>(),
        sx in 0.01..10.0_f64,
        sy in 0.01..10.0_f64,
        query in point(),
    ) {
        let mut item = item_from(descs, px_mode);
        let scale = PixelScale::new(sx, sy);
        let rect = item.bounding_rect(scale);
        let pos = Point::new(query.0, query.1);
        let hits = item.points_at(pos, scale).unwrap();
        if !rect.contains(pos) {
            prop_assert!(hits.is_empty(), "{:?} hit outside {:?}", pos, rect);
        }
        let slack = rect.inflate(1e-9, 1e-9);
        for id in hits {
            let extent = item.visual(id).unwrap().bounding_extent(scale);
            prop_assert!(
                slack.x0 <= extent.x0 && slack.y0 <= extent.y0
                    && extent.x1 <= slack.x1 && extent.y1 <= slack.y1,
                "{:?} escapes {:?}", extent, rect
            );
        }
    }
}

// ── 5. Append leaves earlier spots alone ────────────────────────────────

proptest! {
    #[test]
    fn append_preserves_existing_spots(
        first in prop::collection::vec(descriptor(), 0..32),
        second in prop::collection::vec(descriptor(), 0..32),
    ) {
        let (n, k) = (first.len(), second.len());
        let mut item = item_from(first, true);
        let before: Vec<_> = item
            .spot_ids()
            .map(|id| {
                let s = item.resolve(id).unwrap();
                (id, s.size, s.symbol.to_owned(), item.record(id).unwrap().position)
            })
            .collect();
        item.append(SpotBatch::from_spots(second)).unwrap();
        prop_assert_eq!(item.len(), n + k);
        for (id, size, symbol, position) in before {
            let s = item.resolve(id).unwrap();
            prop_assert_eq!(s.size, size);
            prop_assert_eq!(s.symbol, symbol.as_str());
            prop_assert_eq!(item.record(id).unwrap().position, position);
        }
    }
}

// ── 6. Wrong-length overrides are rejected atomically ───────────────────

proptest! {
    #[test]
    fn wrong_length_override_changes_nothing(
        descs in prop::collection::vec(descriptor(), 1..32),
        delta in 1..5_usize,
        longer in any::<bool>(),
    ) {
        let mut item = item_from(descs, true);
        let n = item.len();
        let len = if longer { n + delta } else { n.saturating_sub(delta) };
        prop_assume!(len != n);
        let sizes_before: Vec<_> = item.records().iter().map(|r| r.size).collect();
        let err = item.set_override(AttributeUpdate::Size(Values::Each(vec![2.0; len])));
        let is_length_mismatch = matches!(err, Err(ScatterError::LengthMismatch { .. }));
        prop_assert!(is_length_mismatch);
        let sizes_after: Vec<_> = item.records().iter().map(|r| r.size).collect();
        prop_assert_eq!(sizes_before, sizes_after);
    }
}

// ── 7. Refresh is idempotent ────────────────────────────────────────────

proptest! {
    #[test]
    fn refresh_does_not_drift(descs in prop::collection::vec(descriptor(), 1..16)) {
        let mut item = item_from(descs, false);
        item.ensure_up_to_date().unwrap();
        let snapshot = |item: &ScatterItem<u32>| -> Vec<_> {
            item.visuals()
                .map(|v| match v.kind() {
                    VisualKind::Path(m) => (m.path.elements().to_vec(), m.transform),
                    VisualKind::Raster(_) => unreachable!("data-space items build paths"),
                })
                .collect()
        };
        let first = snapshot(&item);
        let size = item.options().size;
        item.set_default(AttributeValue::Size(size)).unwrap();
        let stats = item.ensure_up_to_date().unwrap();
        prop_assert_eq!(stats.refreshed, item.len());
        prop_assert_eq!(first, snapshot(&item));
    }
}

// ── 8. Pen-width containment ────────────────────────────────────────────

proptest! {
    #[test]
    fn stroke_stays_inside_marker_box(
        symbol in 0..SYMBOLS.len(),
        size in 0.5..200.0_f64,
        stroke_frac in 0.0..0.99_f64,
    ) {
        let registry = SymbolRegistry::with_builtins();
        let stroke = size * stroke_frac;
        let path = build_path(registry.lookup(SYMBOLS[symbol]).unwrap(), size, stroke).unwrap();
        let bbox = path.bounding_box();
        let eps = 1e-9 * size;
        prop_assert!(bbox.width() + stroke <= size + eps, "width {} + {} > {}", bbox.width(), stroke, size);
        prop_assert!(bbox.height() + stroke <= size + eps, "height {} + {} > {}", bbox.height(), stroke, size);
    }
}

// ── 9. Shared pixmap identity ───────────────────────────────────────────

proptest! {
    #[test]
    fn identical_markers_share_a_pixmap(points in prop::collection::vec(point(), 2..32)) {
        let mut item: ScatterItem<u32> = ScatterItem::new(Blank);
        item.set_identical(true);
        item.replace_all(SpotBatch::from_positions(points)).unwrap();
        item.ensure_up_to_date().unwrap();
        let shared = Arc::clone(item.shared_pixmap().unwrap());
        for visual in item.visuals() {
            let VisualKind::Raster(m) = visual.kind() else {
                panic!("pixel mode builds raster markers");
            };
            prop_assert!(Arc::ptr_eq(&m.pixmap, &shared));
        }
    }
}
