// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker pixmaps: the rasterizer seam, pixmap construction, and the keyed
//! pixmap cache.
//!
//! The core never touches pixels itself. It hands a [`RasterRequest`] (image
//! size, a centering transform, outline commands, and the resolved styles)
//! to a [`MarkerRasterizer`] and keeps the returned [`MarkerImage`] behind an
//! `Arc` so that visual objects can share it.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Affine, BezPath, PathEl, Point, Stroke};
use peniko::Brush;

use crate::error::{RasterError, ScatterError, check_size};
use crate::geometry::build_path;
use crate::style::{BrushRef, PenRef};
use crate::symbol::SymbolDefinition;

/// Simple path command enumeration handed to rasterizers.
///
/// Polygon symbols only use move/line/close. The built-in circle is made of
/// cubic Béziers and reaches backends as [`PathCmd::CurveTo`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathCmd {
    /// Move the current point without drawing.
    MoveTo(Point),
    /// Draw a line from the current point to the given point.
    LineTo(Point),
    /// Quadratic Bézier to the second point, using the first as control.
    QuadTo(Point, Point),
    /// Cubic Bézier to the third point, using the first two as controls.
    CurveTo(Point, Point, Point),
    /// Close the current subpath.
    Close,
}

/// Expresses `path` as a command list.
pub fn path_commands(path: &BezPath) -> Vec<PathCmd> {
    path.elements()
        .iter()
        .map(|el| match *el {
            PathEl::MoveTo(p) => PathCmd::MoveTo(p),
            PathEl::LineTo(p) => PathCmd::LineTo(p),
            PathEl::QuadTo(p1, p2) => PathCmd::QuadTo(p1, p2),
            PathEl::CurveTo(p1, p2, p3) => PathCmd::CurveTo(p1, p2, p3),
            PathEl::ClosePath => PathCmd::Close,
        })
        .collect()
}

/// Rebuilds a [`BezPath`] from a command list.
pub fn commands_to_path(commands: &[PathCmd]) -> BezPath {
    let mut path = BezPath::new();
    for cmd in commands {
        match *cmd {
            PathCmd::MoveTo(p) => path.move_to(p),
            PathCmd::LineTo(p) => path.line_to(p),
            PathCmd::QuadTo(p1, p2) => path.quad_to(p1, p2),
            PathCmd::CurveTo(p1, p2, p3) => path.curve_to(p1, p2, p3),
            PathCmd::Close => path.close_path(),
        }
    }
    path
}

/// Everything a rasterizer needs to paint one marker image.
#[derive(Clone, Debug)]
pub struct RasterRequest<'a> {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Transform from marker-local coordinates into image pixels.
    ///
    /// Marker outlines are centered on the origin; this translates the origin
    /// to the image center.
    pub transform: Affine,
    /// Marker outline in marker-local coordinates.
    pub commands: &'a [PathCmd],
    /// Outline stroke (never zero-width; cosmetic pens are widened to one).
    pub stroke: &'a Stroke,
    /// Paint for the outline.
    pub stroke_brush: &'a Brush,
    /// Paint for the interior.
    pub fill: &'a Brush,
}

/// A rasterized marker: straight-alpha RGBA8, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl MarkerImage {
    /// Wraps pixel data produced by a rasterizer.
    ///
    /// Returns `None` if `pixels` is not exactly `width * height * 4` bytes.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Option<Self> {
        let pixels = pixels.into();
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully transparent image of the given size.
    #[must_use]
    pub fn transparent(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self {
            width,
            height,
            pixels: Arc::from(alloc::vec![0_u8; len]),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The RGBA value at `(x, y)`, if inside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Shared handle to a marker image; identity equality means "same pixmap".
pub type Pixmap = Arc<MarkerImage>;

/// Capability to rasterize a marker outline into a fixed-size image.
pub trait MarkerRasterizer {
    /// Paints `request` into a new transparent image of the requested size.
    ///
    /// Backend failures (image allocation, unsupported sizes, …) are returned
    /// as [`RasterError`] and propagated to the caller unchanged.
    fn rasterize(&mut self, request: &RasterRequest<'_>) -> Result<MarkerImage, RasterError>;
}

/// Pixel side length of a marker image for `size`: `ceil(size)`, at least 1.
#[must_use]
pub fn pixmap_side(size: f64) -> u32 {
    if !(size > 1.0) {
        return 1;
    }
    if size >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "size is in (1, u32::MAX) here, so truncation is the floor"
    )]
    let floor = size as u32;
    if f64::from(floor) < size { floor + 1 } else { floor }
}

/// Renders a marker of `size` into a square `ceil(size)` image.
///
/// The outline is centered on the image center, a zero-width (cosmetic) pen
/// is drawn one unit wide, and the outline is pen-compensated with
/// [`build_path`] so the stroke stays inside the image.
pub fn build_pixmap(
    rasterizer: &mut dyn MarkerRasterizer,
    def: &SymbolDefinition,
    size: f64,
    pen: &PenRef,
    brush: &BrushRef,
) -> Result<MarkerImage, ScatterError> {
    let size = check_size(size)?;
    let side = pixmap_side(size);
    let mut stroke = pen.stroke.clone();
    if stroke.width == 0.0 {
        stroke.width = 1.0;
    }
    let path = build_path(def, size, stroke.width)?;
    let commands = path_commands(&path);
    let half = f64::from(side) * 0.5;
    let request = RasterRequest {
        width: side,
        height: side,
        transform: Affine::translate((half, half)),
        commands: &commands,
        stroke: &stroke,
        stroke_brush: &pen.brush,
        fill: brush,
    };
    Ok(rasterizer.rasterize(&request)?)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PixmapKey {
    symbol: String,
    size_bits: u64,
    pen: PenRef,
    brush: BrushRef,
}

/// Pixmaps memoized by `(symbol, size, pen identity, brush identity)`.
#[derive(Debug, Default)]
pub struct PixmapCache {
    entries: HashMap<PixmapKey, Pixmap>,
}

impl PixmapCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pixmap for the given style, building it on a miss.
    pub fn get_or_build(
        &mut self,
        rasterizer: &mut dyn MarkerRasterizer,
        def: &SymbolDefinition,
        size: f64,
        pen: &PenRef,
        brush: &BrushRef,
    ) -> Result<Pixmap, ScatterError> {
        let key = PixmapKey {
            symbol: def.name().into(),
            size_bits: size.to_bits(),
            pen: pen.clone(),
            brush: brush.clone(),
        };
        if let Some(pixmap) = self.entries.get(&key) {
            return Ok(Arc::clone(pixmap));
        }
        let pixmap = Arc::new(build_pixmap(rasterizer, def, size, pen, brush)?);
        self.entries.insert(key, Arc::clone(&pixmap));
        Ok(pixmap)
    }

    /// Drops entries that nothing outside the cache references any more.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, pixmap| Arc::strong_count(pixmap) > 1);
        before - self.entries.len()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached pixmaps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingRasterizer;
    use super::*;
    use crate::style::{Pen, solid_brush};
    use crate::symbol::{CIRCLE, SQUARE, SymbolRegistry};

    #[test]
    fn side_is_ceiling_of_size() {
        assert_eq!(pixmap_side(7.0), 7);
        assert_eq!(pixmap_side(7.2), 8);
        assert_eq!(pixmap_side(0.3), 1);
        assert_eq!(pixmap_side(f64::NAN), 1);
    }

    #[test]
    fn pixmap_is_square_and_centered() {
        let registry = SymbolRegistry::with_builtins();
        let mut raster = CountingRasterizer::default();
        let pen = PenRef::new(Pen::rgb8(1, 1, 1));
        let brush = solid_brush(2, 2, 2);
        let image =
            build_pixmap(&mut raster, registry.lookup(SQUARE).unwrap(), 6.5, &pen, &brush)
                .unwrap();
        assert_eq!((image.width(), image.height()), (7, 7));
        assert_eq!(raster.last_transform, Some(Affine::translate((3.5, 3.5))));
    }

    #[test]
    fn cosmetic_pen_is_widened() {
        let registry = SymbolRegistry::with_builtins();
        let mut raster = CountingRasterizer::default();
        let pen = PenRef::new(Pen::rgb8(1, 1, 1).with_width(0.0));
        let brush = solid_brush(2, 2, 2);
        build_pixmap(&mut raster, registry.lookup(CIRCLE).unwrap(), 5.0, &pen, &brush).unwrap();
        assert_eq!(raster.last_stroke_width, Some(1.0));
        // The caller's pen is untouched.
        assert_eq!(pen.width(), 0.0);
    }

    #[test]
    fn cache_shares_and_prunes() {
        let registry = SymbolRegistry::with_builtins();
        let square = registry.lookup(SQUARE).unwrap();
        let mut raster = CountingRasterizer::default();
        let mut cache = PixmapCache::new();
        let pen = PenRef::new(Pen::rgb8(1, 1, 1));
        let brush = solid_brush(2, 2, 2);

        let a = cache.get_or_build(&mut raster, square, 5.0, &pen, &brush).unwrap();
        let b = cache.get_or_build(&mut raster, square, 5.0, &pen, &brush).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(raster.calls, 1);

        // A different brush identity is a different entry, even with equal value.
        let other = solid_brush(2, 2, 2);
        let c = cache.get_or_build(&mut raster, square, 5.0, &pen, &other).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        drop(c);
        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.len(), 1);
        drop((a, b));
        assert_eq!(cache.prune(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn commands_round_trip_through_bez_path() {
        let registry = SymbolRegistry::with_builtins();
        let path = registry.lookup(CIRCLE).unwrap().path().clone();
        let rebuilt = commands_to_path(&path_commands(&path));
        assert_eq!(rebuilt.elements(), path.elements());
    }

    #[test]
    fn circle_reaches_backends_as_cubics() {
        let registry = SymbolRegistry::with_builtins();
        let circle = path_commands(registry.lookup(CIRCLE).unwrap().path());
        assert!(matches!(circle.first(), Some(PathCmd::MoveTo(_))));
        assert!(circle.iter().any(|c| matches!(c, PathCmd::CurveTo(..))));
        assert!(!circle.iter().any(|c| matches!(c, PathCmd::LineTo(_))));

        let square = path_commands(registry.lookup(SQUARE).unwrap().path());
        assert!(
            square
                .iter()
                .all(|c| matches!(c, PathCmd::MoveTo(_) | PathCmd::LineTo(_) | PathCmd::Close))
        );
    }

    #[test]
    fn image_validates_buffer_length() {
        assert!(MarkerImage::new(2, 2, alloc::vec![0_u8; 16]).is_some());
        assert!(MarkerImage::new(2, 2, alloc::vec![0_u8; 15]).is_none());
        let img = MarkerImage::transparent(3, 2);
        assert_eq!(img.pixel(2, 1), Some([0, 0, 0, 0]));
        assert_eq!(img.pixel(3, 0), None);
    }
}
