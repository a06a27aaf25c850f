// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scatter: a marker store for scatter plots.
//!
//! This crate manages thousands of independently styled point markers
//! ("spots"): per-spot style overlays, two render strategies, incremental
//! mutation, lazily built visual objects, memoized bounds, and picking.
//! It does not draw anything itself; a [`MarkerRasterizer`] fills marker
//! pixmaps and a [`MarkerPainter`] puts visual objects on screen.
//!
//! ## Model
//!
//! - [`ScatterItem`] owns an ordered list of [`PointRecord`]s, in paint order
//!   (back to front), addressed by generational [`SpotId`] handles.
//! - Every record may override the item defaults in [`ScatterOptions`]
//!   (size, symbol, pen, brush, tool tip). [`resolve`] applies the overlay;
//!   it is evaluated fresh on every refresh and never cached on the record.
//! - Pens and brushes are opaque [`StyleRef`] handles, compared by identity.
//! - Symbols come from a [`SymbolRegistry`] of unit-box outlines. The
//!   built-ins are circle, square, triangle, diamond, plus, and bar.
//!
//! ## Render strategies
//!
//! - **Pixel mode** (`px_mode`, the default): each spot is a
//!   [`RasterMarker`], a pixmap centered on the spot whose on-screen size
//!   never changes with zoom. Pixmaps are memoized per
//!   `(symbol, size, pen, brush)`, or shared by every spot when
//!   [`ScatterOptions::identical`] is set and no spot overrides its
//!   appearance.
//! - **Data-space mode**: each spot is a [`PathMarker`] whose outline lives in
//!   data coordinates and scales with the view.
//! - **Error bars** ([`ScatterItem::error_bars`]): path markers whose height
//!   scales with the spot size.
//!
//! ## Lifecycle
//!
//! Mutations ([`ScatterItem::replace_all`], [`ScatterItem::append`],
//! [`ScatterItem::set_default`], [`ScatterItem::set_override`],
//! [`ScatterItem::clear`], and the [`SpotMut`] setters) only mark state
//! stale and emit one [`ScatterListener::plot_changed`] notification each.
//! [`ScatterItem::ensure_up_to_date`] then creates or refreshes visual
//! objects in one pass; queries and [`ScatterItem::paint`] call it first.
//! Failed mutations leave the item unchanged.
//!
//! ## Queries
//!
//! - [`ScatterItem::data_bounds`]: exact (memoized) or percentile ranges.
//! - [`ScatterItem::points_at`]: strict box hit test, front to back.
//! - [`ScatterItem::bounding_rect`]: data-space rectangle covering every
//!   marker.
//! - [`ScatterItem::pointer_click`]: primary-button picking that fires
//!   [`ScatterListener::clicked`].
//!
//! ## Example
//!
//! ```
//! use understory_scatter::{
//!     MarkerImage, MarkerRasterizer, PixelScale, RasterError, RasterRequest, ScatterItem,
//!     SpotBatch,
//! };
//! use kurbo::Point;
//!
//! struct Blank;
//!
//! impl MarkerRasterizer for Blank {
//!     fn rasterize(&mut self, req: &RasterRequest<'_>) -> Result<MarkerImage, RasterError> {
//!         Ok(MarkerImage::transparent(req.width, req.height))
//!     }
//! }
//!
//! let mut item: ScatterItem = ScatterItem::new(Blank);
//! item.replace_all(SpotBatch::from_xy(vec![0.0, 10.0], vec![0.0, 5.0])).unwrap();
//! let hits = item.points_at(Point::new(10.0, 5.0), PixelScale::IDENTITY).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to Kurbo and Peniko.
//! - `libm`: `no_std` float math for Kurbo and Peniko.
//! - `tracing`: debug-level events and spans for bulk mutations and refresh
//!   passes.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bounds;
mod error;
mod geometry;
mod ingest;
mod item;
mod pick;
mod raster;
mod record;
mod resolve;
mod scene;
mod style;
mod symbol;
mod visual;

pub use bounds::{Axis, BoundsCache};
pub use error::{DescriptorIssue, RasterError, ScatterError};
pub use geometry::build_path;
pub use ingest::{PositionalArg, SpotBatch, SpotDescriptor, SpotValue};
pub use item::{ScatterItem, SpotMut};
pub use pick::PixelScale;
pub use raster::{
    MarkerImage, MarkerRasterizer, PathCmd, Pixmap, PixmapCache, RasterRequest, build_pixmap,
    commands_to_path, path_commands, pixmap_side,
};
pub use record::{PointRecord, SpotId};
pub use resolve::{
    Attribute, AttributeUpdate, AttributeValue, MarkerStyle, ResolvedStyle, ScatterOptions,
    Values, format_tool_tip, resolve, resolve_attribute,
};
pub use scene::{Changes, DetachedScene, EventDisposition, SceneHost, ScatterListener};
pub use style::{BrushRef, Pen, PenRef, StyleRef, solid_brush};
pub use symbol::{BAR, CIRCLE, DIAMOND, PLUS, SQUARE, SymbolDefinition, SymbolRegistry, TRIANGLE};
pub use ui_events::pointer::PointerButton;
pub use visual::{
    MarkerPainter, PathMarker, RasterMarker, RefreshStats, VisualKind, VisualManager,
    VisualObject, paint_visual,
};
