// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item options and the default/override overlay.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::Point;

use crate::error::{ScatterError, check_size};
use crate::record::PointRecord;
use crate::style::{BrushRef, Pen, PenRef, solid_brush};
use crate::symbol::{CIRCLE, SymbolRegistry};

/// Which visual variant an item builds for its spots.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    /// Raster markers in pixel mode, path markers otherwise.
    #[default]
    Standard,
    /// Path markers whose height scales with the spot size (error bars).
    Bar,
}

/// Per-item configuration and attribute defaults.
#[derive(Clone, Debug)]
pub struct ScatterOptions {
    /// Default marker size (device pixels in pixel mode, data units otherwise).
    pub size: f64,
    /// Default symbol name.
    pub symbol: String,
    /// Default outline style.
    pub pen: PenRef,
    /// Default fill style.
    pub brush: BrushRef,
    /// Pixel mode: markers keep a fixed on-screen size regardless of zoom.
    pub px_mode: bool,
    /// All markers share one rasterized appearance when nothing is overridden.
    pub identical: bool,
    /// Default tool tip template (`%1` is x, `%2` is y).
    pub tool_tip: Option<String>,
    /// Visual variant.
    pub marker_style: MarkerStyle,
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self {
            size: 7.0,
            symbol: CIRCLE.into(),
            pen: PenRef::new(Pen::rgb8(200, 200, 200)),
            brush: solid_brush(100, 100, 150),
            px_mode: true,
            identical: false,
            tool_tip: None,
            marker_style: MarkerStyle::Standard,
        }
    }
}

impl ScatterOptions {
    /// Returns `true` if spots are drawn as screen-pinned raster markers.
    ///
    /// Bar items always use data-space path markers, whatever `px_mode` says.
    #[must_use]
    pub fn pins_to_screen(&self) -> bool {
        self.px_mode && self.marker_style == MarkerStyle::Standard
    }
}

/// Attributes that follow the default/override overlay.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Marker size.
    Size,
    /// Symbol name.
    Symbol,
    /// Outline style.
    Pen,
    /// Fill style.
    Brush,
    /// Tool tip template.
    ToolTip,
}

impl Attribute {
    /// Lower-case attribute name, as used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Symbol => "symbol",
            Self::Pen => "pen",
            Self::Brush => "brush",
            Self::ToolTip => "tool tip",
        }
    }
}

/// A single value for one [`Attribute`].
#[derive(Clone, Debug)]
pub enum AttributeValue {
    /// Marker size.
    Size(f64),
    /// Symbol name.
    Symbol(String),
    /// Outline style.
    Pen(PenRef),
    /// Fill style.
    Brush(BrushRef),
    /// Tool tip template; `None` disables tool tips.
    ToolTip(Option<String>),
}

impl AttributeValue {
    /// The attribute this value belongs to.
    #[must_use]
    pub fn attribute(&self) -> Attribute {
        match self {
            Self::Size(_) => Attribute::Size,
            Self::Symbol(_) => Attribute::Symbol,
            Self::Pen(_) => Attribute::Pen,
            Self::Brush(_) => Attribute::Brush,
            Self::ToolTip(_) => Attribute::ToolTip,
        }
    }

    /// Checks sizes and symbol names.
    pub(crate) fn validate(&self, registry: &SymbolRegistry) -> Result<(), ScatterError> {
        match self {
            Self::Size(size) => check_size(*size).map(drop),
            Self::Symbol(name) => registry.lookup(name).map(drop),
            Self::Pen(_) | Self::Brush(_) | Self::ToolTip(_) => Ok(()),
        }
    }

    /// Stores this value as the default in `options`.
    pub(crate) fn apply_default(self, options: &mut ScatterOptions) {
        match self {
            Self::Size(size) => options.size = size,
            Self::Symbol(name) => options.symbol = name,
            Self::Pen(pen) => options.pen = pen,
            Self::Brush(brush) => options.brush = brush,
            Self::ToolTip(tip) => options.tool_tip = tip,
        }
    }

    /// Stores this value as an override on `record`.
    pub(crate) fn apply_override<D>(self, record: &mut PointRecord<D>) {
        match self {
            Self::Size(size) => record.size = Some(size),
            Self::Symbol(name) => record.symbol = Some(name),
            Self::Pen(pen) => record.pen = Some(pen),
            Self::Brush(brush) => record.brush = Some(brush),
            Self::ToolTip(tip) => record.tool_tip = tip,
        }
    }
}

/// One value for every spot, or one value per spot.
#[derive(Clone, Debug)]
pub enum Values<T> {
    /// Broadcast to every spot.
    All(T),
    /// Element-wise; the length must equal the number of spots.
    Each(Vec<T>),
}

impl<T> Values<T> {
    fn check_len(&self, what: &'static str, expected: usize) -> Result<(), ScatterError> {
        match self {
            Self::Each(values) if values.len() != expected => Err(ScatterError::LengthMismatch {
                what,
                expected,
                actual: values.len(),
            }),
            _ => Ok(()),
        }
    }

    /// The value for spot `i`.
    fn get(&self, i: usize) -> Option<&T> {
        match self {
            Self::All(value) => Some(value),
            Self::Each(values) => values.get(i),
        }
    }

    /// Every distinct value, once.
    fn values(&self) -> &[T] {
        match self {
            Self::All(value) => core::slice::from_ref(value),
            Self::Each(values) => values,
        }
    }
}

/// Override values for one attribute across a set of spots.
#[derive(Clone, Debug)]
pub enum AttributeUpdate {
    /// Marker sizes.
    Size(Values<f64>),
    /// Symbol names.
    Symbol(Values<String>),
    /// Outline styles.
    Pen(Values<PenRef>),
    /// Fill styles.
    Brush(Values<BrushRef>),
    /// Tool tip templates.
    ToolTip(Values<String>),
}

impl AttributeUpdate {
    /// The attribute this update touches.
    #[must_use]
    pub fn attribute(&self) -> Attribute {
        match self {
            Self::Size(_) => Attribute::Size,
            Self::Symbol(_) => Attribute::Symbol,
            Self::Pen(_) => Attribute::Pen,
            Self::Brush(_) => Attribute::Brush,
            Self::ToolTip(_) => Attribute::ToolTip,
        }
    }

    /// Checks the length against `len` spots, then every size and symbol.
    pub(crate) fn validate(&self, len: usize, registry: &SymbolRegistry) -> Result<(), ScatterError> {
        let what = self.attribute().name();
        match self {
            Self::Size(values) => {
                values.check_len(what, len)?;
                for size in values.values() {
                    check_size(*size)?;
                }
            }
            Self::Symbol(values) => {
                values.check_len(what, len)?;
                for name in values.values() {
                    registry.lookup(name)?;
                }
            }
            Self::Pen(values) => values.check_len(what, len)?,
            Self::Brush(values) => values.check_len(what, len)?,
            Self::ToolTip(values) => values.check_len(what, len)?,
        }
        Ok(())
    }

    /// Writes the overrides element-wise. Call [`validate`](Self::validate) first.
    pub(crate) fn apply<D>(&self, records: &mut [PointRecord<D>]) {
        for (i, rec) in records.iter_mut().enumerate() {
            match self {
                Self::Size(values) => {
                    if let Some(size) = values.get(i) {
                        rec.size = Some(*size);
                    }
                }
                Self::Symbol(values) => {
                    if let Some(name) = values.get(i) {
                        rec.symbol = Some(name.clone());
                    }
                }
                Self::Pen(values) => {
                    if let Some(pen) = values.get(i) {
                        rec.pen = Some(pen.clone());
                    }
                }
                Self::Brush(values) => {
                    if let Some(brush) = values.get(i) {
                        rec.brush = Some(brush.clone());
                    }
                }
                Self::ToolTip(values) => {
                    if let Some(tip) = values.get(i) {
                        rec.tool_tip = Some(tip.clone());
                    }
                }
            }
        }
    }
}

/// Removes the override for `attribute` from every record.
pub(crate) fn clear_override<D>(records: &mut [PointRecord<D>], attribute: Attribute) {
    for rec in records {
        match attribute {
            Attribute::Size => rec.size = None,
            Attribute::Symbol => rec.symbol = None,
            Attribute::Pen => rec.pen = None,
            Attribute::Brush => rec.brush = None,
            Attribute::ToolTip => rec.tool_tip = None,
        }
    }
}

/// The effective appearance of one spot.
#[derive(Copy, Clone, Debug)]
pub struct ResolvedStyle<'a> {
    /// Marker size.
    pub size: f64,
    /// Symbol name.
    pub symbol: &'a str,
    /// Outline style.
    pub pen: &'a PenRef,
    /// Fill style.
    pub brush: &'a BrushRef,
    /// Tool tip template.
    pub tool_tip: Option<&'a str>,
}

/// Applies the overlay: each attribute is the record's override if present,
/// else the item default.
#[must_use]
pub fn resolve<'a, D>(record: &'a PointRecord<D>, options: &'a ScatterOptions) -> ResolvedStyle<'a> {
    ResolvedStyle {
        size: record.size.unwrap_or(options.size),
        symbol: record.symbol.as_deref().unwrap_or(&options.symbol),
        pen: record.pen.as_ref().unwrap_or(&options.pen),
        brush: record.brush.as_ref().unwrap_or(&options.brush),
        tool_tip: record.tool_tip.as_deref().or(options.tool_tip.as_deref()),
    }
}

/// Resolves a single attribute to an owned value.
#[must_use]
pub fn resolve_attribute<D>(
    record: &PointRecord<D>,
    options: &ScatterOptions,
    attribute: Attribute,
) -> AttributeValue {
    let style = resolve(record, options);
    match attribute {
        Attribute::Size => AttributeValue::Size(style.size),
        Attribute::Symbol => AttributeValue::Symbol(style.symbol.into()),
        Attribute::Pen => AttributeValue::Pen(style.pen.clone()),
        Attribute::Brush => AttributeValue::Brush(style.brush.clone()),
        Attribute::ToolTip => AttributeValue::ToolTip(style.tool_tip.map(String::from)),
    }
}

/// Expands a tool tip template: `%1` becomes the x coordinate, `%2` the y.
#[must_use]
pub fn format_tool_tip(template: &str, position: Point) -> String {
    template
        .replace("%1", &position.x.to_string())
        .replace("%2", &position.y.to_string())
}
