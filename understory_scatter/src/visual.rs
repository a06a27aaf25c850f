// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-spot visual objects and their lazy lifecycle.
//!
//! Visual objects are created on first need, refreshed in place when a
//! spot's resolved attributes change, and destroyed wholesale on replacement,
//! clear, or a pixel-mode flip. All of that is deferred to
//! [`VisualManager::ensure_up_to_date`], so N attribute changes cost one
//! refresh pass.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, BezPath, Point, Rect, Vec2};

use crate::error::ScatterError;
use crate::geometry::build_path;
use crate::pick::PixelScale;
use crate::raster::{MarkerRasterizer, Pixmap, PixmapCache, build_pixmap};
use crate::record::{PointRecord, SpotId};
use crate::resolve::{MarkerStyle, ScatterOptions, format_tool_tip, resolve};
use crate::scene::SceneHost;
use crate::style::{BrushRef, PenRef};
use crate::symbol::SymbolRegistry;

/// A screen-pinned marker drawn from a pixmap.
#[derive(Clone, Debug)]
pub struct RasterMarker {
    /// The marker image, possibly shared with other spots.
    pub pixmap: Pixmap,
    /// Device-pixel offset of the image's top-left corner from the spot
    /// position; centers the image on the spot.
    pub offset: Vec2,
}

/// A data-space marker drawn as a filled and stroked outline.
#[derive(Clone, Debug)]
pub struct PathMarker {
    /// Pen-compensated outline, centered on the origin.
    pub path: BezPath,
    /// Outline style.
    pub pen: PenRef,
    /// Fill style.
    pub brush: BrushRef,
    /// Marker-local transform applied before translating to the spot
    /// position. Identity, except for bars, which scale by `(1, size)`.
    pub transform: Affine,
}

/// The two visual variants.
#[derive(Clone, Debug)]
pub enum VisualKind {
    /// Pixel mode.
    Raster(RasterMarker),
    /// Data-space mode (and bars).
    Path(PathMarker),
}

/// The rendered form of one spot.
#[derive(Clone, Debug)]
pub struct VisualObject {
    spot: SpotId,
    position: Point,
    size: f64,
    tool_tip: Option<String>,
    kind: VisualKind,
}

impl VisualObject {
    /// The spot this object renders.
    #[must_use]
    pub fn spot(&self) -> SpotId {
        self.spot
    }

    /// Data-space position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Resolved marker size at the last refresh.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Expanded tool tip, if any.
    #[must_use]
    pub fn tool_tip(&self) -> Option<&str> {
        self.tool_tip.as_deref()
    }

    /// The variant and its geometry.
    #[must_use]
    pub fn kind(&self) -> &VisualKind {
        &self.kind
    }

    /// Returns `true` for screen-pinned raster markers.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        matches!(self.kind, VisualKind::Raster(_))
    }

    fn half_extent(&self, scale: PixelScale) -> Vec2 {
        let half = self.size * 0.5;
        if self.is_pinned() {
            Vec2::new(half * scale.x, half * scale.y)
        } else {
            Vec2::new(half, half)
        }
    }

    /// The data-space box the marker occupies for picking.
    #[must_use]
    pub fn bounding_extent(&self, scale: PixelScale) -> Rect {
        let h = self.half_extent(scale);
        Rect::new(
            self.position.x - h.x,
            self.position.y - h.y,
            self.position.x + h.x,
            self.position.y + h.y,
        )
    }

    /// Returns `true` if `pt` lies strictly inside [`bounding_extent`](Self::bounding_extent).
    #[must_use]
    pub fn contains_point(&self, pt: Point, scale: PixelScale) -> bool {
        let r = self.bounding_extent(scale);
        pt.x > r.x0 && pt.x < r.x1 && pt.y > r.y0 && pt.y < r.y1
    }
}

/// Draws visual objects; implemented by rendering backends.
///
/// Positions are in data space. Raster markers are screen-pinned, so the
/// painter maps the position to device space and then applies the marker's
/// pixel offset; path markers are transformed with the view.
pub trait MarkerPainter {
    /// Draws a pixmap marker at `position`.
    fn draw_raster(&mut self, position: Point, marker: &RasterMarker);
    /// Draws a path marker at `position`.
    fn draw_path(&mut self, position: Point, marker: &PathMarker);
}

/// Dispatches `visual` to the matching painter method.
pub fn paint_visual(painter: &mut dyn MarkerPainter, visual: &VisualObject) {
    match &visual.kind {
        VisualKind::Raster(m) => painter.draw_raster(visual.position, m),
        VisualKind::Path(m) => painter.draw_path(visual.position, m),
    }
}

/// What one [`VisualManager::ensure_up_to_date`] pass did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Visual objects created (and attached to the scene).
    pub created: usize,
    /// Existing visual objects refreshed in place.
    pub refreshed: usize,
    /// Pixmap cache entries pruned afterwards.
    pub pruned: usize,
}

/// Owns the visual objects of one item, indexed like its records.
pub struct VisualManager {
    visuals: Vec<Option<VisualObject>>,
    stale: Vec<bool>,
    all_stale: bool,
    dirty: bool,
    /// Whether the last pass drew every spot from `shared`.
    shared_mode: bool,
    shared: Option<Pixmap>,
    cache: PixmapCache,
    rasterizer: Box<dyn MarkerRasterizer>,
}

impl fmt::Debug for VisualManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualManager")
            .field("visuals", &self.visuals.len())
            .field("live", &self.live_count())
            .field("all_stale", &self.all_stale)
            .field("dirty", &self.dirty)
            .field("shared", &self.shared.is_some())
            .field("cache", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl VisualManager {
    /// Creates a manager with no visual objects.
    pub fn new(rasterizer: Box<dyn MarkerRasterizer>) -> Self {
        Self {
            visuals: Vec::new(),
            stale: Vec::new(),
            all_stale: false,
            dirty: false,
            shared_mode: false,
            shared: None,
            cache: PixmapCache::new(),
            rasterizer,
        }
    }

    /// Number of live visual objects.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.visuals.iter().filter(|v| v.is_some()).count()
    }

    /// The visual object at `index`, if it exists.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&VisualObject> {
        self.visuals.get(index).and_then(Option::as_ref)
    }

    /// Live visual objects in paint order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VisualObject> {
        self.visuals.iter().filter_map(Option::as_ref)
    }

    /// The shared pixmap, while one is in use.
    #[must_use]
    pub fn shared_pixmap(&self) -> Option<&Pixmap> {
        self.shared.as_ref()
    }

    /// The keyed pixmap cache.
    #[must_use]
    pub fn pixmap_cache(&self) -> &PixmapCache {
        &self.cache
    }

    /// Returns `true` if the next [`ensure_up_to_date`](Self::ensure_up_to_date)
    /// has work to do.
    #[must_use]
    pub fn needs_refresh(&self, len: usize) -> bool {
        self.dirty || self.visuals.len() != len || self.visuals.iter().any(Option::is_none)
    }

    /// Marks one spot for refresh.
    pub fn mark_stale(&mut self, index: usize) {
        if let Some(flag) = self.stale.get_mut(index) {
            *flag = true;
            self.dirty = true;
        }
    }

    /// Marks every spot for refresh.
    pub fn mark_all_stale(&mut self) {
        self.all_stale = true;
        self.dirty = true;
    }

    /// Drops the shared pixmap; it is rebuilt on the next refresh if still
    /// applicable.
    pub fn drop_shared(&mut self) {
        self.shared = None;
    }

    /// Makes room for appended records without touching existing objects.
    pub fn grow(&mut self, len: usize) {
        if len > self.visuals.len() {
            self.visuals.resize_with(len, || None);
            self.stale.resize(len, false);
            self.dirty = true;
        }
    }

    /// Destroys every visual object, detaching each from `scene`, and resizes
    /// for `len` records.
    ///
    /// Returns the number of objects destroyed.
    pub fn reset(&mut self, len: usize, scene: &mut dyn SceneHost) -> usize {
        let mut destroyed = 0;
        for visual in self.visuals.drain(..).flatten() {
            scene.detach(visual.spot);
            destroyed += 1;
        }
        self.stale.clear();
        self.shared = None;
        self.shared_mode = false;
        self.cache.clear();
        self.all_stale = false;
        self.dirty = false;
        self.grow(len);
        destroyed
    }

    /// Creates missing visual objects and refreshes stale ones.
    ///
    /// A no-op when nothing changed since the last pass. On a rasterizer
    /// failure, objects refreshed so far keep their new state and the rest
    /// stay stale.
    pub fn ensure_up_to_date<D>(
        &mut self,
        records: &[PointRecord<D>],
        options: &ScatterOptions,
        registry: &SymbolRegistry,
        epoch: u32,
        scene: &mut dyn SceneHost,
    ) -> Result<RefreshStats, ScatterError> {
        if !self.needs_refresh(records.len()) {
            return Ok(RefreshStats::default());
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("scatter_refresh", spots = records.len()).entered();

        self.grow(records.len());
        let use_shared = options.identical && !records.iter().any(PointRecord::has_style_overrides);
        if !use_shared {
            self.shared = None;
        }
        // Switching between the shared pixmap and per-spot pixmaps touches
        // every spot, not only the ones that changed.
        if use_shared != self.shared_mode {
            self.shared_mode = use_shared;
            self.all_stale = true;
        }

        let mut stats = RefreshStats::default();
        for (index, record) in records.iter().enumerate() {
            let exists = self.visuals[index].is_some();
            if exists && !self.all_stale && !self.stale[index] {
                continue;
            }
            let spot = SpotId::at(index, epoch);
            let visual = self.render(spot, record, options, registry, use_shared)?;
            self.visuals[index] = Some(visual);
            self.stale[index] = false;
            if exists {
                stats.refreshed += 1;
            } else {
                scene.attach(spot);
                stats.created += 1;
            }
        }
        self.all_stale = false;
        self.dirty = false;
        stats.pruned = self.cache.prune();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            created = stats.created,
            refreshed = stats.refreshed,
            pruned = stats.pruned,
            "scatter visuals refreshed"
        );
        Ok(stats)
    }

    /// Builds the visual object for one record from its resolved attributes.
    fn render<D>(
        &mut self,
        spot: SpotId,
        record: &PointRecord<D>,
        options: &ScatterOptions,
        registry: &SymbolRegistry,
        use_shared: bool,
    ) -> Result<VisualObject, ScatterError> {
        let style = resolve(record, options);
        let def = registry.lookup(style.symbol)?;
        let kind = if options.pins_to_screen() {
            let pixmap = if use_shared {
                match &self.shared {
                    Some(pixmap) => Arc::clone(pixmap),
                    None => {
                        let pixmap = Arc::new(build_pixmap(
                            &mut *self.rasterizer,
                            def,
                            style.size,
                            style.pen,
                            style.brush,
                        )?);
                        self.shared = Some(Arc::clone(&pixmap));
                        pixmap
                    }
                }
            } else {
                self.cache.get_or_build(
                    &mut *self.rasterizer,
                    def,
                    style.size,
                    style.pen,
                    style.brush,
                )?
            };
            let offset = Vec2::new(
                -f64::from(pixmap.width()) * 0.5,
                -f64::from(pixmap.height()) * 0.5,
            );
            VisualKind::Raster(RasterMarker { pixmap, offset })
        } else {
            let path = build_path(def, style.size, style.pen.width())?;
            let transform = match options.marker_style {
                MarkerStyle::Standard => Affine::IDENTITY,
                MarkerStyle::Bar => Affine::scale_non_uniform(1.0, style.size),
            };
            VisualKind::Path(PathMarker {
                path,
                pen: style.pen.clone(),
                brush: style.brush.clone(),
                transform,
            })
        };
        Ok(VisualObject {
            spot,
            position: record.position,
            size: style.size,
            tool_tip: style.tool_tip.map(|t| format_tool_tip(t, record.position)),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::testing::CountingRasterizer;
    use crate::scene::DetachedScene;
    use crate::style::solid_brush;
    use crate::symbol::SQUARE;

    fn manager() -> VisualManager {
        VisualManager::new(Box::new(CountingRasterizer::default()))
    }

    fn records(n: u8) -> Vec<PointRecord<()>> {
        (0..n)
            .map(|i| PointRecord::new((f64::from(i), f64::from(i) * 2.0)))
            .collect()
    }

    #[test]
    fn creates_lazily_then_noops() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions::default();
        let recs = records(3);
        let mut vm = manager();
        vm.grow(recs.len());
        assert_eq!(vm.live_count(), 0);

        let stats = vm
            .ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert_eq!(stats.created, 3);
        assert_eq!(vm.live_count(), 3);

        let again = vm
            .ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert_eq!(again, RefreshStats::default());
    }

    #[test]
    fn raster_markers_are_centered() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            size: 6.5,
            ..ScatterOptions::default()
        };
        let recs = records(1);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        let VisualKind::Raster(m) = vm.get(0).unwrap().kind() else {
            panic!("pixel mode builds raster markers");
        };
        assert_eq!(m.pixmap.width(), 7);
        assert_eq!(m.offset, Vec2::new(-3.5, -3.5));
    }

    #[test]
    fn bars_scale_vertically_by_size() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            size: 4.0,
            symbol: crate::symbol::BAR.into(),
            marker_style: MarkerStyle::Bar,
            ..ScatterOptions::default()
        };
        let recs = records(1);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        let visual = vm.get(0).unwrap();
        assert!(!visual.is_pinned());
        let VisualKind::Path(m) = visual.kind() else {
            panic!("bars are path markers");
        };
        assert_eq!(m.transform, Affine::scale_non_uniform(1.0, 4.0));
    }

    #[test]
    fn refresh_in_place_is_stable() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            px_mode: false,
            symbol: SQUARE.into(),
            ..ScatterOptions::default()
        };
        let recs = records(2);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        let VisualKind::Path(before) = vm.get(1).unwrap().kind().clone() else {
            panic!("data mode builds path markers");
        };
        vm.mark_stale(1);
        let stats = vm
            .ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert_eq!((stats.created, stats.refreshed), (0, 1));
        let VisualKind::Path(after) = vm.get(1).unwrap().kind() else {
            panic!("data mode builds path markers");
        };
        assert_eq!(before.path.elements(), after.path.elements());
    }

    #[test]
    fn shared_pixmap_only_without_overrides() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            identical: true,
            ..ScatterOptions::default()
        };
        let mut recs = records(3);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert!(vm.shared_pixmap().is_some());

        recs[2].brush = Some(solid_brush(1, 2, 3));
        vm.mark_all_stale();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert!(vm.shared_pixmap().is_none());
        // Records 0 and 1 still resolve identically and share a cache entry.
        let pix = |i: usize| match vm.get(i).unwrap().kind() {
            VisualKind::Raster(m) => Arc::clone(&m.pixmap),
            VisualKind::Path(_) => panic!("pixel mode builds raster markers"),
        };
        assert!(Arc::ptr_eq(&pix(0), &pix(1)));
        assert!(!Arc::ptr_eq(&pix(0), &pix(2)));
    }

    #[test]
    fn leaving_shared_mode_rebuilds_untouched_spots() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            identical: true,
            ..ScatterOptions::default()
        };
        let mut recs = records(2);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        let shared = Arc::clone(vm.shared_pixmap().unwrap());

        // An appended spot with its own size; the first two are not marked.
        let mut extra = records(1);
        extra[0].size = Some(7.0);
        recs.extend(extra);
        vm.grow(recs.len());
        let stats = vm
            .ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert_eq!((stats.created, stats.refreshed), (1, 2));
        assert!(vm.shared_pixmap().is_none());

        let pix = |i: usize| match vm.get(i).unwrap().kind() {
            VisualKind::Raster(m) => Arc::clone(&m.pixmap),
            VisualKind::Path(_) => panic!("pixel mode builds raster markers"),
        };
        assert!(!Arc::ptr_eq(&pix(0), &shared));
        assert!(Arc::ptr_eq(&pix(0), &pix(2)));
        assert!(Arc::ptr_eq(&pix(1), &pix(2)));
    }

    #[test]
    fn tool_tips_are_expanded() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            tool_tip: Some("(%1, %2)".into()),
            ..ScatterOptions::default()
        };
        let recs = records(2);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        assert_eq!(vm.get(1).unwrap().tool_tip(), Some("(1, 2)"));
    }

    #[test]
    fn pinned_extent_respects_pixel_scale() {
        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions {
            size: 10.0,
            ..ScatterOptions::default()
        };
        let recs = records(1);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 0, &mut DetachedScene)
            .unwrap();
        let visual = vm.get(0).unwrap();
        let scale = PixelScale::new(0.1, 2.0);
        assert_eq!(visual.bounding_extent(scale), Rect::new(-0.5, -10.0, 0.5, 10.0));
        assert!(visual.contains_point(Point::new(0.49, 9.9), scale));
        // The boundary itself is not a hit.
        assert!(!visual.contains_point(Point::new(0.5, 0.0), scale));
    }

    #[test]
    fn reset_detaches_everything() {
        #[derive(Default)]
        struct Log(Vec<SpotId>);
        impl SceneHost for Log {
            fn attach(&mut self, _spot: SpotId) {}
            fn detach(&mut self, spot: SpotId) {
                self.0.push(spot);
            }
        }

        let registry = SymbolRegistry::with_builtins();
        let opts = ScatterOptions::default();
        let recs = records(2);
        let mut vm = manager();
        vm.ensure_up_to_date(&recs, &opts, &registry, 4, &mut DetachedScene)
            .unwrap();
        let mut log = Log::default();
        assert_eq!(vm.reset(0, &mut log), 2);
        assert_eq!(log.0, [SpotId::new(0, 4), SpotId::new(1, 4)]);
        assert_eq!(vm.live_count(), 0);
    }
}
