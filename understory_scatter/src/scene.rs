// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborators outside the core: the host scene and change/click listeners.

use crate::item::ScatterItem;
use crate::record::SpotId;

bitflags::bitflags! {
    /// What a mutation changed, as reported to [`ScatterListener::plot_changed`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Changes: u8 {
        /// Spots were added, removed, or moved.
        const POINTS = 0b0000_0001;
        /// Resolved appearance (size, symbol, pen, brush, tool tip) changed.
        const STYLE  = 0b0000_0010;
        /// Rendering mode (pixel mode, identical markers) changed.
        const MODE   = 0b0000_0100;
    }
}

/// The host scene graph that visual objects live in.
///
/// The core attaches a visual object when it is first created and detaches it
/// when it is destroyed (replacement, clear, pixel-mode flip). Hosts that keep
/// their own per-spot nodes mirror these calls.
pub trait SceneHost {
    /// A visual object for `spot` now exists.
    fn attach(&mut self, spot: SpotId);
    /// The visual object for `spot` is gone.
    fn detach(&mut self, spot: SpotId);
}

/// A scene that ignores attach/detach.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedScene;

impl SceneHost for DetachedScene {
    fn attach(&mut self, _spot: SpotId) {}
    fn detach(&mut self, _spot: SpotId) {}
}

/// Receives change and click notifications from a [`ScatterItem`].
///
/// Both methods default to doing nothing.
pub trait ScatterListener<D> {
    /// Called once per logical mutation, never once per spot.
    fn plot_changed(&mut self, item: &ScatterItem<D>, changes: Changes) {
        let _ = (item, changes);
    }

    /// Called when a primary click hits at least one spot; `points` is front
    /// to back.
    fn clicked(&mut self, item: &ScatterItem<D>, points: &[SpotId]) {
        let _ = (item, points);
    }
}

/// Whether an input event was handled or should keep propagating.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventDisposition {
    /// The event was handled.
    Consumed,
    /// The event should propagate to other handlers.
    Ignored,
}
