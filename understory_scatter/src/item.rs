// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scatter item: point store, mutation entry points, and queries.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect};
use ui_events::pointer::PointerButton;

use crate::bounds::{Axis, BoundsCache, marker_footprint, union};
use crate::error::{ScatterError, check_size};
use crate::ingest::SpotBatch;
use crate::pick::{PixelScale, bounding_rect, points_at};
use crate::raster::{MarkerRasterizer, Pixmap};
use crate::record::{PointRecord, SpotId};
use crate::resolve::{
    Attribute, AttributeUpdate, AttributeValue, MarkerStyle, ResolvedStyle, ScatterOptions,
    clear_override, resolve, resolve_attribute,
};
use crate::scene::{Changes, DetachedScene, EventDisposition, SceneHost, ScatterListener};
use crate::style::{BrushRef, PenRef};
use crate::symbol::{BAR, SymbolRegistry};
use crate::visual::{MarkerPainter, RefreshStats, VisualManager, VisualObject, paint_visual};

/// A set of independently styled point markers.
///
/// Records are kept in paint order, back to front. Every record resolves its
/// size, symbol, pen, brush, and tool tip through the default/override
/// overlay ([`resolve`](Self::resolve)). Visual objects are built lazily by
/// [`ensure_up_to_date`](Self::ensure_up_to_date), which every query and
/// [`paint`](Self::paint) calls first.
///
/// `D` is an opaque per-spot payload.
pub struct ScatterItem<D = ()> {
    records: Vec<PointRecord<D>>,
    options: ScatterOptions,
    registry: Arc<SymbolRegistry>,
    epoch: u32,
    bounds: BoundsCache,
    visuals: VisualManager,
    scene: Box<dyn SceneHost>,
    listener: Option<Box<dyn ScatterListener<D>>>,
}

impl<D: fmt::Debug> fmt::Debug for ScatterItem<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterItem")
            .field("records", &self.records)
            .field("options", &self.options)
            .field("epoch", &self.epoch)
            .field("bounds", &self.bounds)
            .field("visuals", &self.visuals)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl<D> ScatterItem<D> {
    /// Creates an empty item with default options and the built-in symbols.
    pub fn new(rasterizer: impl MarkerRasterizer + 'static) -> Self {
        Self::from_parts(
            ScatterOptions::default(),
            Arc::new(SymbolRegistry::with_builtins()),
            Box::new(rasterizer),
        )
    }

    /// Creates an empty item with the given options and symbol registry.
    ///
    /// Fails if the default size is not positive or the default symbol is
    /// not registered.
    pub fn with_options(
        options: ScatterOptions,
        registry: Arc<SymbolRegistry>,
        rasterizer: impl MarkerRasterizer + 'static,
    ) -> Result<Self, ScatterError> {
        check_size(options.size)?;
        registry.lookup(&options.symbol)?;
        Ok(Self::from_parts(options, registry, Box::new(rasterizer)))
    }

    /// Creates an empty error-bar item: bar symbols whose height scales with
    /// the spot size.
    pub fn error_bars(rasterizer: impl MarkerRasterizer + 'static) -> Self {
        let options = ScatterOptions {
            symbol: BAR.into(),
            marker_style: MarkerStyle::Bar,
            ..ScatterOptions::default()
        };
        Self::from_parts(
            options,
            Arc::new(SymbolRegistry::with_builtins()),
            Box::new(rasterizer),
        )
    }

    fn from_parts(
        options: ScatterOptions,
        registry: Arc<SymbolRegistry>,
        rasterizer: Box<dyn MarkerRasterizer>,
    ) -> Self {
        Self {
            records: Vec::new(),
            options,
            registry,
            epoch: 0,
            bounds: BoundsCache::new(),
            visuals: VisualManager::new(rasterizer),
            scene: Box::new(DetachedScene),
            listener: None,
        }
    }

    /// Routes attach/detach of visual objects to `scene`.
    pub fn set_scene(&mut self, scene: impl SceneHost + 'static) {
        self.scene = Box::new(scene);
    }

    /// Installs the change/click listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: impl ScatterListener<D> + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Removes and returns the listener.
    pub fn take_listener(&mut self) -> Option<Box<dyn ScatterListener<D>>> {
        self.listener.take()
    }

    fn notify(&mut self, changes: Changes) {
        if let Some(mut listener) = self.listener.take() {
            listener.plot_changed(self, changes);
            self.listener = Some(listener);
        }
    }

    fn notify_click(&mut self, points: &[SpotId]) {
        if let Some(mut listener) = self.listener.take() {
            listener.clicked(self, points);
            self.listener = Some(listener);
        }
    }

    // --- Mutation ---

    /// Replaces every record with the spots in `batch`.
    ///
    /// All prior visual objects are destroyed (detached from the scene) and
    /// every previously issued [`SpotId`] becomes stale. The batch is fully
    /// validated first; on error the item is unchanged.
    pub fn replace_all(&mut self, batch: SpotBatch<D>) -> Result<(), ScatterError> {
        let records = batch.normalize(&self.registry)?;
        self.visuals.reset(records.len(), &mut *self.scene);
        self.records = records;
        self.epoch = self.epoch.wrapping_add(1);
        self.bounds.invalidate();
        #[cfg(feature = "tracing")]
        tracing::debug!(spots = self.records.len(), epoch = self.epoch, "scatter replace_all");
        self.notify(Changes::POINTS);
        Ok(())
    }

    /// Appends the spots in `batch` after the existing ones.
    ///
    /// Existing records, their visual objects, and their handles are
    /// untouched. Returns the handles of the new spots.
    pub fn append(&mut self, batch: SpotBatch<D>) -> Result<Vec<SpotId>, ScatterError> {
        let added = batch.normalize(&self.registry)?;
        let start = self.records.len();
        self.bounds.extend(&added, &self.options);
        self.records.extend(added);
        self.visuals.grow(self.records.len());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            added = self.records.len() - start,
            spots = self.records.len(),
            "scatter append"
        );
        self.notify(Changes::POINTS);
        let epoch = self.epoch;
        Ok((start..self.records.len())
            .map(|i| SpotId::at(i, epoch))
            .collect())
    }

    /// Changes the item default for one attribute.
    ///
    /// Spots without an override for it pick the new value up on the next
    /// refresh.
    pub fn set_default(&mut self, value: AttributeValue) -> Result<(), ScatterError> {
        value.validate(&self.registry)?;
        let attribute = value.attribute();
        value.apply_default(&mut self.options);
        self.after_style_change(attribute, None);
        Ok(())
    }

    /// Sets per-spot overrides for one attribute on every spot.
    ///
    /// A [`Values::Each`](crate::Values::Each) list must have exactly one
    /// entry per spot; otherwise [`ScatterError::LengthMismatch`] is returned
    /// and nothing changes.
    pub fn set_override(&mut self, update: AttributeUpdate) -> Result<(), ScatterError> {
        update.validate(self.records.len(), &self.registry)?;
        update.apply(&mut self.records);
        self.after_style_change(update.attribute(), None);
        Ok(())
    }

    /// Removes every spot's override for `attribute`.
    pub fn clear_override(&mut self, attribute: Attribute) {
        clear_override(&mut self.records, attribute);
        self.after_style_change(attribute, None);
    }

    /// Invalidation and notification shared by all style mutations; `spot` is
    /// the single touched index, or `None` for all of them.
    fn after_style_change(&mut self, attribute: Attribute, spot: Option<usize>) {
        if attribute == Attribute::Size {
            self.bounds.invalidate();
        }
        let appearance = attribute != Attribute::ToolTip;
        if appearance {
            self.visuals.drop_shared();
        }
        match spot {
            // Overrides decide whether the shared pixmap applies, so an
            // identical item refreshes every spot.
            Some(index) if !(appearance && self.options.identical) => {
                self.visuals.mark_stale(index);
            }
            _ => self.visuals.mark_all_stale(),
        }
        self.notify(Changes::STYLE);
    }

    /// Switches between screen-pinned raster markers and data-space path
    /// markers.
    ///
    /// Every visual object is destroyed and rebuilt as the other variant on
    /// the next refresh.
    pub fn set_px_mode(&mut self, px_mode: bool) {
        if self.options.px_mode == px_mode {
            return;
        }
        self.options.px_mode = px_mode;
        let _destroyed = self.visuals.reset(self.records.len(), &mut *self.scene);
        self.bounds.invalidate();
        #[cfg(feature = "tracing")]
        tracing::debug!(px_mode, destroyed = _destroyed, "scatter px mode changed");
        self.notify(Changes::MODE);
    }

    /// Turns the shared-pixmap optimization on or off.
    pub fn set_identical(&mut self, identical: bool) {
        if self.options.identical == identical {
            return;
        }
        self.options.identical = identical;
        self.visuals.drop_shared();
        self.visuals.mark_all_stale();
        self.notify(Changes::MODE);
    }

    /// Removes every spot and destroys every visual object.
    pub fn clear(&mut self) {
        let _destroyed = self.visuals.reset(0, &mut *self.scene);
        self.records.clear();
        self.epoch = self.epoch.wrapping_add(1);
        self.bounds.invalidate();
        #[cfg(feature = "tracing")]
        tracing::debug!(destroyed = _destroyed, "scatter cleared");
        self.notify(Changes::POINTS);
    }

    // --- Store queries ---

    /// Number of spots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no spots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, back to front.
    #[must_use]
    pub fn records(&self) -> &[PointRecord<D>] {
        &self.records
    }

    /// Current options and defaults.
    #[must_use]
    pub fn options(&self) -> &ScatterOptions {
        &self.options
    }

    /// The symbol registry.
    #[must_use]
    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// Handles of all spots, back to front.
    pub fn spot_ids(&self) -> impl ExactSizeIterator<Item = SpotId> + use<D> {
        let epoch = self.epoch;
        (0..self.records.len()).map(move |i| SpotId::at(i, epoch))
    }

    fn index_of(&self, id: SpotId) -> Result<usize, ScatterError> {
        if id.epoch() == self.epoch && id.index() < self.records.len() {
            Ok(id.index())
        } else {
            Err(ScatterError::StaleSpot(id))
        }
    }

    /// The record behind `id`.
    pub fn record(&self, id: SpotId) -> Result<&PointRecord<D>, ScatterError> {
        Ok(&self.records[self.index_of(id)?])
    }

    /// The resolved appearance of `id`.
    pub fn resolve(&self, id: SpotId) -> Result<ResolvedStyle<'_>, ScatterError> {
        Ok(resolve(self.record(id)?, &self.options))
    }

    /// One resolved attribute of `id`.
    pub fn resolve_attribute(
        &self,
        id: SpotId,
        attribute: Attribute,
    ) -> Result<AttributeValue, ScatterError> {
        Ok(resolve_attribute(self.record(id)?, &self.options, attribute))
    }

    /// Per-spot accessor for `id`.
    pub fn spot_mut(&mut self, id: SpotId) -> Result<SpotMut<'_, D>, ScatterError> {
        let index = self.index_of(id)?;
        Ok(SpotMut { item: self, index })
    }

    // --- Visuals ---

    /// Creates missing visual objects and refreshes stale ones.
    ///
    /// A no-op when nothing changed since the last call.
    pub fn ensure_up_to_date(&mut self) -> Result<RefreshStats, ScatterError> {
        self.visuals.ensure_up_to_date(
            &self.records,
            &self.options,
            &self.registry,
            self.epoch,
            &mut *self.scene,
        )
    }

    /// The visual object of `id`, as of the last refresh.
    #[must_use]
    pub fn visual(&self, id: SpotId) -> Option<&VisualObject> {
        let index = self.index_of(id).ok()?;
        self.visuals.get(index)
    }

    /// Live visual objects in paint order, as of the last refresh.
    pub fn visuals(&self) -> impl DoubleEndedIterator<Item = &VisualObject> {
        self.visuals.iter()
    }

    /// The pixmap shared by all spots, while the shared-pixmap optimization
    /// is in effect.
    #[must_use]
    pub fn shared_pixmap(&self) -> Option<&Pixmap> {
        self.visuals.shared_pixmap()
    }

    /// Number of pixmaps in the per-style cache.
    #[must_use]
    pub fn cached_pixmaps(&self) -> usize {
        self.visuals.pixmap_cache().len()
    }

    /// All spot handles after bringing visual objects up to date.
    pub fn points(&mut self) -> Result<Vec<SpotId>, ScatterError> {
        self.ensure_up_to_date()?;
        Ok(self.spot_ids().collect())
    }

    /// Brings visual objects up to date and hands each to `painter`, back to
    /// front.
    pub fn paint(&mut self, painter: &mut dyn MarkerPainter) -> Result<(), ScatterError> {
        self.ensure_up_to_date()?;
        for visual in self.visuals.iter() {
            paint_visual(painter, visual);
        }
        Ok(())
    }

    // --- Spatial queries ---

    /// Spots whose marker strictly contains `pos`, front to back.
    ///
    /// `scale` converts screen-pinned marker sizes into data units.
    pub fn points_at(&mut self, pos: Point, scale: PixelScale) -> Result<Vec<SpotId>, ScatterError> {
        self.ensure_up_to_date()?;
        Ok(points_at(self.visuals.iter(), pos, scale))
    }

    /// Value range along `axis`; see [`BoundsCache::data_bounds`].
    pub fn data_bounds(
        &mut self,
        axis: Axis,
        frac: f64,
        ortho: Option<(f64, f64)>,
    ) -> Result<Option<(f64, f64)>, ScatterError> {
        self.bounds
            .data_bounds(&self.records, &self.options, axis, frac, ortho)
    }

    /// Data-space rectangle covering every marker.
    ///
    /// For screen-pinned markers the exact ranges are padded by half of the
    /// largest marker, converted to data units with `scale`. Data-space
    /// ranges are widened to any marker box reaching past them.
    pub fn bounding_rect(&mut self, scale: PixelScale) -> Rect {
        let x = union(
            self.bounds.exact(&self.records, &self.options, Axis::X),
            marker_footprint(&self.records, &self.options, Axis::X),
        );
        let y = union(
            self.bounds.exact(&self.records, &self.options, Axis::Y),
            marker_footprint(&self.records, &self.options, Axis::Y),
        );
        let pinned_size = if self.options.pins_to_screen() {
            self.records
                .iter()
                .map(|r| r.size.unwrap_or(self.options.size))
                .reduce(f64::max)
        } else {
            None
        };
        bounding_rect(x, y, pinned_size, scale)
    }

    // --- Input ---

    /// Handles a pointer click at data-space `pos`.
    ///
    /// Only the primary button is considered. On a hit the click listener
    /// receives the hits front to back and the event is consumed; otherwise
    /// it is ignored and no notification fires.
    pub fn pointer_click(
        &mut self,
        button: PointerButton,
        pos: Point,
        scale: PixelScale,
    ) -> Result<EventDisposition, ScatterError> {
        if button != PointerButton::Primary {
            return Ok(EventDisposition::Ignored);
        }
        let hits = self.points_at(pos, scale)?;
        if hits.is_empty() {
            return Ok(EventDisposition::Ignored);
        }
        self.notify_click(&hits);
        Ok(EventDisposition::Consumed)
    }
}

/// Mutable access to one spot.
///
/// Getters return resolved values. Each setter changes one override, marks
/// only that spot for refresh (all spots when the shared pixmap may be
/// affected), and emits one change notification. Passing `None` resets the
/// override to the item default.
pub struct SpotMut<'a, D> {
    item: &'a mut ScatterItem<D>,
    index: usize,
}

impl<D: fmt::Debug> fmt::Debug for SpotMut<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotMut")
            .field("id", &self.id())
            .field("record", self.record())
            .finish()
    }
}

impl<D> SpotMut<'_, D> {
    fn record(&self) -> &PointRecord<D> {
        &self.item.records[self.index]
    }

    fn style(&self) -> ResolvedStyle<'_> {
        resolve(self.record(), &self.item.options)
    }

    /// This spot's handle.
    #[must_use]
    pub fn id(&self) -> SpotId {
        SpotId::at(self.index, self.item.epoch)
    }

    /// Data-space position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.record().position
    }

    /// Resolved size.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.style().size
    }

    /// Resolved symbol name.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.style().symbol
    }

    /// Resolved outline style.
    #[must_use]
    pub fn pen(&self) -> &PenRef {
        self.style().pen
    }

    /// Resolved fill style.
    #[must_use]
    pub fn brush(&self) -> &BrushRef {
        self.style().brush
    }

    /// The user payload.
    #[must_use]
    pub fn data(&self) -> Option<&D> {
        self.record().data.as_ref()
    }

    /// Replaces the user payload. Payloads are opaque, so nothing is
    /// refreshed or notified.
    pub fn set_data(&mut self, data: Option<D>) {
        self.item.records[self.index].data = data;
    }

    /// Overrides one attribute on this spot.
    pub fn set(&mut self, value: AttributeValue) -> Result<(), ScatterError> {
        value.validate(&self.item.registry)?;
        let attribute = value.attribute();
        value.apply_override(&mut self.item.records[self.index]);
        self.item.after_style_change(attribute, Some(self.index));
        Ok(())
    }

    /// Resets one attribute on this spot to the item default.
    pub fn reset(&mut self, attribute: Attribute) {
        let index = self.index;
        clear_override(&mut self.item.records[index..=index], attribute);
        self.item.after_style_change(attribute, Some(index));
    }

    /// Sets (`Some`) or resets (`None`) the size override.
    pub fn set_size(&mut self, size: Option<f64>) -> Result<(), ScatterError> {
        match size {
            Some(size) => self.set(AttributeValue::Size(size)),
            None => {
                self.reset(Attribute::Size);
                Ok(())
            }
        }
    }

    /// Sets (`Some`) or resets (`None`) the symbol override.
    pub fn set_symbol(&mut self, symbol: Option<&str>) -> Result<(), ScatterError> {
        match symbol {
            Some(name) => self.set(AttributeValue::Symbol(name.into())),
            None => {
                self.reset(Attribute::Symbol);
                Ok(())
            }
        }
    }

    /// Sets (`Some`) or resets (`None`) the outline override.
    pub fn set_pen(&mut self, pen: Option<PenRef>) {
        match pen {
            Some(pen) => self.apply(AttributeValue::Pen(pen)),
            None => self.reset(Attribute::Pen),
        }
    }

    /// Sets (`Some`) or resets (`None`) the fill override.
    pub fn set_brush(&mut self, brush: Option<BrushRef>) {
        match brush {
            Some(brush) => self.apply(AttributeValue::Brush(brush)),
            None => self.reset(Attribute::Brush),
        }
    }

    /// Sets (`Some`) or resets (`None`) the tool tip override.
    pub fn set_tool_tip(&mut self, tool_tip: Option<&str>) {
        match tool_tip {
            Some(tip) => self.apply(AttributeValue::ToolTip(Some(tip.into()))),
            None => self.reset(Attribute::ToolTip),
        }
    }

    /// Infallible `set` for values that need no validation.
    fn apply(&mut self, value: AttributeValue) {
        let attribute = value.attribute();
        value.apply_override(&mut self.item.records[self.index]);
        self.item.after_style_change(attribute, Some(self.index));
    }
}
