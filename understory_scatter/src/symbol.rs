// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named library of normalized marker shapes.
//!
//! Every symbol is a closed outline inside the unit box `[-0.5, 0.5]²`
//! centered at the origin. The geometry builder scales it to the marker size.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{BezPath, Circle, Shape};

use crate::error::ScatterError;

/// Name of the built-in circle.
pub const CIRCLE: &str = "o";
/// Name of the built-in square.
pub const SQUARE: &str = "s";
/// Name of the built-in upward triangle.
pub const TRIANGLE: &str = "t";
/// Name of the built-in diamond.
pub const DIAMOND: &str = "d";
/// Name of the built-in plus-shaped cross.
pub const PLUS: &str = "+";
/// Name of the built-in bar (an `H` rotated by 90°), used by error bars.
pub const BAR: &str = "b";

/// Accuracy of the cubic approximation used for the unit circle.
const UNIT_TOLERANCE: f64 = 1e-3;

const TRIANGLE_VERTICES: &[(f64, f64)] = &[(-0.5, -0.5), (0.0, 0.5), (0.5, -0.5)];

const DIAMOND_VERTICES: &[(f64, f64)] = &[(0.0, -0.5), (-0.4, 0.0), (0.0, 0.5), (0.4, 0.0)];

const PLUS_VERTICES: &[(f64, f64)] = &[
    (-0.5, -0.05),
    (-0.5, 0.05),
    (-0.05, 0.05),
    (-0.05, 0.5),
    (0.05, 0.5),
    (0.05, 0.05),
    (0.5, 0.05),
    (0.5, -0.05),
    (0.05, -0.05),
    (0.05, -0.5),
    (-0.05, -0.5),
    (-0.05, -0.05),
];

const BAR_VERTICES: &[(f64, f64)] = &[
    (-0.5, -0.5),
    (0.0, -0.5),
    (0.0, 0.5),
    (-0.5, 0.5),
    (0.5, 0.5),
    (0.0, 0.5),
    (0.0, -0.5),
    (0.5, -0.5),
];

/// A named marker outline in the unit box.
#[derive(Clone, Debug)]
pub struct SymbolDefinition {
    name: String,
    path: BezPath,
}

impl SymbolDefinition {
    /// Builds a closed polygon from vertices given in unit-box coordinates.
    pub fn from_vertices(name: impl Into<String>, vertices: &[(f64, f64)]) -> Self {
        Self {
            name: name.into(),
            path: polygon(vertices),
        }
    }

    /// Wraps an arbitrary unit-box path (e.g. one with curves).
    pub fn from_path(name: impl Into<String>, path: BezPath) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// The registry name of this symbol.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit-box outline.
    #[must_use]
    pub fn path(&self) -> &BezPath {
        &self.path
    }
}

/// Turns a vertex list into a closed path: move to the first vertex, line to
/// the rest, close.
fn polygon(vertices: &[(f64, f64)]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = vertices.iter().copied();
    if let Some(first) = iter.next() {
        path.move_to(first);
        for v in iter {
            path.line_to(v);
        }
        path.close_path();
    }
    path
}

/// Mapping from symbol name to [`SymbolDefinition`].
///
/// A registry is populated up front and then shared read-only (typically
/// behind an `Arc`) by every scatter item that uses it.
#[derive(Clone, Debug, Default)]
pub struct SymbolRegistry {
    symbols: HashMap<String, SymbolDefinition>,
}

impl SymbolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in symbols
    /// ([`CIRCLE`], [`SQUARE`], [`TRIANGLE`], [`DIAMOND`], [`PLUS`], [`BAR`]).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let circle: BezPath = Circle::new((0.0, 0.0), 0.5)
            .path_elements(UNIT_TOLERANCE)
            .collect();
        registry.register_path(CIRCLE, circle);
        registry.register(SQUARE, &[(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]);
        registry.register(TRIANGLE, TRIANGLE_VERTICES);
        registry.register(DIAMOND, DIAMOND_VERTICES);
        registry.register(PLUS, PLUS_VERTICES);
        registry.register(BAR, BAR_VERTICES);
        registry
    }

    /// Registers (or replaces) a polygonal symbol.
    pub fn register(&mut self, name: &str, vertices: &[(f64, f64)]) -> &mut Self {
        self.insert(SymbolDefinition::from_vertices(name, vertices))
    }

    /// Registers (or replaces) a symbol with an arbitrary unit-box path.
    pub fn register_path(&mut self, name: &str, path: BezPath) -> &mut Self {
        self.insert(SymbolDefinition::from_path(name, path))
    }

    fn insert(&mut self, def: SymbolDefinition) -> &mut Self {
        self.symbols.insert(def.name.clone(), def);
        self
    }

    /// Looks up a symbol by name.
    pub fn lookup(&self, name: &str) -> Result<&SymbolDefinition, ScatterError> {
        self.symbols
            .get(name)
            .ok_or_else(|| ScatterError::UnknownSymbol(name.into()))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if no symbols are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
