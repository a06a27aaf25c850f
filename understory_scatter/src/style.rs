// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque, identity-compared style handles for marker outlines and fills.
//!
//! Style values are produced by whatever parses user-facing color/pen
//! descriptors. The scatter core never inspects them beyond reading the
//! outline width and passing them to a rasterizer or painter, so they are
//! carried as [`StyleRef`] handles: cheap to clone, and compared and hashed by
//! identity. Two handles built from equal values are *different* styles as far
//! as caching is concerned; share a handle to share cached pixmaps.

use alloc::sync::Arc;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;

use kurbo::Stroke;
use peniko::{Brush, Color};

/// Shared, identity-compared handle to a style value.
pub struct StyleRef<T>(Arc<T>);

impl<T> StyleRef<T> {
    /// Wraps a style value in a new handle with a fresh identity.
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns `true` if both handles refer to the same style value.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Address-based identity of this handle.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T> Clone for StyleRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for StyleRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::same(self, other)
    }
}

impl<T> Eq for StyleRef<T> {}

impl<T> Hash for StyleRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl<T> Deref for StyleRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for StyleRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StyleRef").field(&*self.0).finish()
    }
}

impl<T> From<T> for StyleRef<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Outline style: the paint used for the outline and its stroke geometry.
#[derive(Clone, Debug)]
pub struct Pen {
    /// Paint for the outline.
    pub brush: Brush,
    /// Stroke parameters (width, joins, caps, dashes).
    ///
    /// A width of `0.0` denotes a cosmetic hairline; marker pixmaps draw it
    /// one unit wide.
    pub stroke: Stroke,
}

impl Pen {
    /// Creates a pen with the given paint and width.
    pub fn new(brush: impl Into<Brush>, width: f64) -> Self {
        Self {
            brush: brush.into(),
            stroke: Stroke::new(width),
        }
    }

    /// Creates a one-unit pen from an opaque 8-bit RGB color.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(Color::from_rgb8(r, g, b), 1.0)
    }

    /// Outline width in local units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.stroke.width
    }

    /// Returns a copy of this pen with a different width.
    #[must_use]
    pub fn with_width(mut self, width: f64) -> Self {
        self.stroke.width = width;
        self
    }
}

/// Handle to an outline style.
pub type PenRef = StyleRef<Pen>;

/// Handle to a fill style.
pub type BrushRef = StyleRef<Brush>;

/// Creates a fill handle from an opaque 8-bit RGB color.
pub fn solid_brush(r: u8, g: u8, b: u8) -> BrushRef {
    StyleRef::new(Brush::Solid(Color::from_rgb8(r, g, b)))
}
