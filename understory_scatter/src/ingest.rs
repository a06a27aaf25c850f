// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Normalizing ingest input into [`PointRecord`]s.
//!
//! A [`SpotBatch`] carries exactly one of three shapes:
//!
//! - a list of [`SpotDescriptor`]s (one per spot, each with its own overrides),
//! - parallel `x` and `y` value lists,
//! - a list of pre-packed positions,
//!
//! plus optional keyword updates ([`AttributeUpdate`]) and a payload list that
//! apply to the new spots only. Everything is validated before any record is
//! produced, so a rejected batch never reaches the store.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::error::{DescriptorIssue, ScatterError, check_size};
use crate::record::PointRecord;
use crate::resolve::AttributeUpdate;
use crate::style::{BrushRef, PenRef};
use crate::symbol::SymbolRegistry;

/// A loosely typed descriptor value, for building descriptors from key/value
/// maps (see [`SpotDescriptor::from_entries`]).
#[derive(Clone, Debug)]
pub enum SpotValue<D = ()> {
    /// A scalar (`x`, `y`, `size`).
    Number(f64),
    /// A position (`pos`).
    Point(Point),
    /// A string (`symbol`).
    Text(String),
    /// An outline style (`pen` / `stroke`).
    Pen(PenRef),
    /// A fill style (`brush` / `fill`).
    Brush(BrushRef),
    /// A user payload (`data`).
    Data(D),
}

/// Description of one spot: a position plus optional overrides.
#[derive(Clone, Debug)]
pub struct SpotDescriptor<D = ()> {
    pos: Option<Point>,
    x: Option<f64>,
    y: Option<f64>,
    size: Option<f64>,
    symbol: Option<String>,
    pen: Option<PenRef>,
    brush: Option<BrushRef>,
    data: Option<D>,
}

impl<D> Default for SpotDescriptor<D> {
    fn default() -> Self {
        Self {
            pos: None,
            x: None,
            y: None,
            size: None,
            symbol: None,
            pen: None,
            brush: None,
            data: None,
        }
    }
}

impl<D> SpotDescriptor<D> {
    /// A descriptor positioned at `pos`.
    pub fn at(pos: impl Into<Point>) -> Self {
        Self {
            pos: Some(pos.into()),
            ..Self::default()
        }
    }

    /// Sets the size override.
    #[must_use]
    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the symbol override.
    #[must_use]
    pub fn symbol(mut self, name: impl Into<String>) -> Self {
        self.symbol = Some(name.into());
        self
    }

    /// Sets the outline override.
    #[must_use]
    pub fn pen(mut self, pen: PenRef) -> Self {
        self.pen = Some(pen);
        self
    }

    /// Sets the fill override.
    #[must_use]
    pub fn brush(mut self, brush: BrushRef) -> Self {
        self.brush = Some(brush);
        self
    }

    /// Attaches a user payload.
    #[must_use]
    pub fn data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }

    /// Builds a descriptor from key/value pairs.
    ///
    /// Recognized keys are `pos`, `x`, `y`, `size`, `symbol`, `pen` (alias
    /// `stroke`), `brush` (alias `fill`), and `data`. A key given twice, or
    /// given together with its alias, is a conflict; so is `pos` together with
    /// `x` or `y`.
    pub fn from_entries<K: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, SpotValue<D>)>,
    ) -> Result<Self, DescriptorIssue> {
        let mut desc = Self::default();
        for (key, value) in entries {
            let key = key.as_ref();
            match (key, value) {
                ("pos", SpotValue::Point(p)) => set_once(&mut desc.pos, p, "pos")?,
                ("x", SpotValue::Number(v)) => set_once(&mut desc.x, v, "x")?,
                ("y", SpotValue::Number(v)) => set_once(&mut desc.y, v, "y")?,
                ("size", SpotValue::Number(v)) => set_once(&mut desc.size, v, "size")?,
                ("symbol", SpotValue::Text(s)) => set_once(&mut desc.symbol, s, "symbol")?,
                ("pen" | "stroke", SpotValue::Pen(p)) => set_once(&mut desc.pen, p, "pen")?,
                ("brush" | "fill", SpotValue::Brush(b)) => set_once(&mut desc.brush, b, "brush")?,
                ("data", SpotValue::Data(d)) => set_once(&mut desc.data, d, "data")?,
                (k, _) => {
                    return Err(match canonical_key(k) {
                        Some(name) => DescriptorIssue::WrongValueType(name),
                        None => DescriptorIssue::UnknownKey(k.into()),
                    });
                }
            }
        }
        if desc.pos.is_some() {
            if desc.x.is_some() {
                return Err(DescriptorIssue::ConflictingKeys("pos", "x"));
            }
            if desc.y.is_some() {
                return Err(DescriptorIssue::ConflictingKeys("pos", "y"));
            }
        }
        Ok(desc)
    }

    fn position(&self) -> Result<Point, DescriptorIssue> {
        match (self.pos, self.x, self.y) {
            (Some(p), _, _) => Ok(p),
            (None, Some(x), Some(y)) => Ok(Point::new(x, y)),
            _ => Err(DescriptorIssue::MissingPosition),
        }
    }

    fn into_record(self, registry: &SymbolRegistry) -> Result<PointRecord<D>, DescriptorError> {
        let position = self.position().map_err(DescriptorError::Issue)?;
        if let Some(size) = self.size {
            check_size(size).map_err(DescriptorError::Scatter)?;
        }
        if let Some(name) = &self.symbol {
            registry.lookup(name).map_err(DescriptorError::Scatter)?;
        }
        Ok(PointRecord {
            position,
            size: self.size,
            symbol: self.symbol,
            pen: self.pen,
            brush: self.brush,
            tool_tip: None,
            data: self.data,
        })
    }
}

enum DescriptorError {
    Issue(DescriptorIssue),
    Scatter(ScatterError),
}

fn set_once<T>(slot: &mut Option<T>, value: T, key: &'static str) -> Result<(), DescriptorIssue> {
    if slot.is_some() {
        return Err(DescriptorIssue::ConflictingKeys(key, key));
    }
    *slot = Some(value);
    Ok(())
}

fn canonical_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "pos" => "pos",
        "x" => "x",
        "y" => "y",
        "size" => "size",
        "symbol" => "symbol",
        "pen" | "stroke" => "pen",
        "brush" | "fill" => "brush",
        "data" => "data",
        _ => return None,
    })
}

/// An untyped positional ingest argument.
///
/// One argument must be a descriptor list or a position list; two must both be
/// value lists (`x`, then `y`).
#[derive(Clone, Debug)]
pub enum PositionalArg<D = ()> {
    /// A list of spot descriptors.
    Spots(Vec<SpotDescriptor<D>>),
    /// A list of scalar values.
    Values(Vec<f64>),
    /// A list of pre-packed positions.
    Positions(Vec<Point>),
}

#[derive(Clone, Debug)]
enum Form<D> {
    Spots(Vec<SpotDescriptor<D>>),
    Xy(Vec<f64>, Vec<f64>),
    Positions(Vec<Point>),
}

/// Input for [`ScatterItem::replace_all`](crate::ScatterItem::replace_all)
/// and [`ScatterItem::append`](crate::ScatterItem::append).
#[derive(Clone, Debug)]
pub struct SpotBatch<D = ()> {
    form: Option<Form<D>>,
    forms: usize,
    updates: Vec<AttributeUpdate>,
    data: Option<Vec<D>>,
}

impl<D> Default for SpotBatch<D> {
    fn default() -> Self {
        Self {
            form: None,
            forms: 0,
            updates: Vec::new(),
            data: None,
        }
    }
}

impl<D> SpotBatch<D> {
    /// An empty batch (no spots).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch of spot descriptors.
    #[must_use]
    pub fn from_spots(spots: Vec<SpotDescriptor<D>>) -> Self {
        Self::new().spots(spots)
    }

    /// A batch of parallel `x` / `y` values.
    #[must_use]
    pub fn from_xy(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new().xy(x, y)
    }

    /// A batch of pre-packed positions.
    #[must_use]
    pub fn from_positions(positions: impl IntoIterator<Item = impl Into<Point>>) -> Self {
        Self::new().positions(positions)
    }

    /// Interprets up to two untyped positional arguments.
    pub fn from_positional(args: Vec<PositionalArg<D>>) -> Result<Self, ScatterError> {
        let given = args.len();
        if given > 2 {
            return Err(ScatterError::TooManyArguments { given });
        }
        let shape = |index| ScatterError::InvalidSpotDescriptor {
            index,
            issue: DescriptorIssue::PositionalShape,
        };
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (None, _) => Ok(Self::new()),
            (Some(PositionalArg::Spots(spots)), None) => Ok(Self::from_spots(spots)),
            (Some(PositionalArg::Positions(p)), None) => Ok(Self::from_positions(p)),
            (Some(PositionalArg::Values(_)), None) => Err(shape(0)),
            (Some(PositionalArg::Values(x)), Some(PositionalArg::Values(y))) => {
                Ok(Self::from_xy(x, y))
            }
            (Some(PositionalArg::Values(_)), Some(_)) => Err(shape(1)),
            (Some(_), Some(_)) => Err(shape(0)),
        }
    }

    fn set_form(mut self, form: Form<D>) -> Self {
        self.forms += 1;
        self.form = Some(form);
        self
    }

    /// Uses a descriptor list. Only one form may be set per batch.
    #[must_use]
    pub fn spots(self, spots: Vec<SpotDescriptor<D>>) -> Self {
        self.set_form(Form::Spots(spots))
    }

    /// Uses parallel `x` / `y` value lists. Only one form may be set per batch.
    #[must_use]
    pub fn xy(self, x: Vec<f64>, y: Vec<f64>) -> Self {
        self.set_form(Form::Xy(x, y))
    }

    /// Uses pre-packed positions. Only one form may be set per batch.
    #[must_use]
    pub fn positions(self, positions: impl IntoIterator<Item = impl Into<Point>>) -> Self {
        let positions = positions.into_iter().map(Into::into).collect();
        self.set_form(Form::Positions(positions))
    }

    /// Adds a keyword attribute update applied to the new spots.
    #[must_use]
    pub fn with(mut self, update: AttributeUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Attaches one payload per new spot.
    #[must_use]
    pub fn with_data(mut self, data: Vec<D>) -> Self {
        self.data = Some(data);
        self
    }

    /// Validates the whole batch and produces its records.
    pub(crate) fn normalize(
        self,
        registry: &SymbolRegistry,
    ) -> Result<Vec<PointRecord<D>>, ScatterError> {
        if self.forms > 1 {
            return Err(ScatterError::TooManyArguments { given: self.forms });
        }
        let mut records = match self.form {
            None => Vec::new(),
            Some(Form::Spots(spots)) => {
                let mut records = Vec::with_capacity(spots.len());
                for (index, desc) in spots.into_iter().enumerate() {
                    match desc.into_record(registry) {
                        Ok(rec) => records.push(rec),
                        Err(DescriptorError::Issue(issue)) => {
                            return Err(ScatterError::InvalidSpotDescriptor { index, issue });
                        }
                        Err(DescriptorError::Scatter(err)) => return Err(err),
                    }
                }
                records
            }
            Some(Form::Xy(x, y)) => {
                if x.len() != y.len() {
                    return Err(ScatterError::LengthMismatch {
                        what: "y",
                        expected: x.len(),
                        actual: y.len(),
                    });
                }
                x.into_iter()
                    .zip(y)
                    .map(|p| PointRecord::new(p))
                    .collect()
            }
            Some(Form::Positions(positions)) => {
                positions.into_iter().map(PointRecord::new).collect()
            }
        };

        for update in &self.updates {
            update.validate(records.len(), registry)?;
        }
        if let Some(data) = &self.data {
            if data.len() != records.len() {
                return Err(ScatterError::LengthMismatch {
                    what: "data",
                    expected: records.len(),
                    actual: data.len(),
                });
            }
        }

        for update in &self.updates {
            update.apply(&mut records);
        }
        if let Some(data) = self.data {
            for (rec, d) in records.iter_mut().zip(data) {
                rec.data = Some(d);
            }
        }
        Ok(records)
    }
}
