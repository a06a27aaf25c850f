// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello CPU backend for `understory_scatter`.
//!
//! - [`VelloCpuRasterizer`] implements [`MarkerRasterizer`] by painting each
//!   marker outline into a small sparse-strips [`RenderContext`] and reading
//!   back straight-alpha RGBA8.
//! - [`VelloCpuMarkerPainter`] implements [`MarkerPainter`], drawing a scatter
//!   item's visual objects into a caller-owned [`RenderContext`] under a
//!   data-to-device view transform.
//!
//! ```no_run
//! use kurbo::Affine;
//! use understory_scatter::{ScatterItem, SpotBatch};
//! use understory_scatter_vello_cpu::{VelloCpuMarkerPainter, VelloCpuRasterizer};
//! use vello_cpu::RenderContext;
//!
//! let mut item: ScatterItem = ScatterItem::new(VelloCpuRasterizer::new());
//! item.replace_all(SpotBatch::from_xy(vec![1.0, 2.0], vec![3.0, 4.0])).unwrap();
//!
//! let mut ctx = RenderContext::new(256, 256);
//! let view = Affine::scale(20.0);
//! item.paint(&mut VelloCpuMarkerPainter::new(&mut ctx, view)).unwrap();
//! ```

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, BezPath, Cap, Join, Point, Stroke};
use peniko::{Blob, Brush, ImageAlphaType, ImageData, ImageFormat, ImageSampler};
use understory_scatter::{
    MarkerImage, MarkerPainter, MarkerRasterizer, PathCmd, PathMarker, RasterError, RasterMarker,
    RasterRequest, path_commands,
};
use vello_cpu::kurbo::{
    Affine as CpuAffine, BezPath as CpuBezPath, Cap as CpuCap, Join as CpuJoin, Rect as CpuRect,
    Stroke as CpuStroke,
};
use vello_cpu::{Image as CpuImage, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};

/// Failures specific to the Vello CPU rasterizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VelloCpuRasterError {
    /// The requested image does not fit a `vello_cpu` render target.
    ImageTooLarge {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The rendered buffer did not match the requested dimensions.
    BufferMismatch,
}

impl fmt::Display for VelloCpuRasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageTooLarge { width, height } => {
                write!(f, "marker image {width}x{height} exceeds the render target limit")
            }
            Self::BufferMismatch => f.write_str("rendered buffer does not match marker image size"),
        }
    }
}

impl core::error::Error for VelloCpuRasterError {}

fn affine_to_cpu(xf: Affine) -> CpuAffine {
    CpuAffine::new(xf.as_coeffs())
}

fn commands_to_cpu(commands: &[PathCmd]) -> CpuBezPath {
    let mut p = CpuBezPath::new();
    for cmd in commands {
        match *cmd {
            PathCmd::MoveTo(pt) => p.move_to((pt.x, pt.y)),
            PathCmd::LineTo(pt) => p.line_to((pt.x, pt.y)),
            PathCmd::QuadTo(c, pt) => p.quad_to((c.x, c.y), (pt.x, pt.y)),
            PathCmd::CurveTo(c1, c2, pt) => p.curve_to((c1.x, c1.y), (c2.x, c2.y), (pt.x, pt.y)),
            PathCmd::Close => p.close_path(),
        }
    }
    p
}

fn cap_to_cpu(cap: Cap) -> CpuCap {
    match cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    }
}

fn stroke_to_cpu(style: &Stroke, width: f64) -> CpuStroke {
    let mut stroke = CpuStroke::new(width);
    stroke.miter_limit = style.miter_limit;
    stroke.join = match style.join {
        Join::Bevel => CpuJoin::Bevel,
        Join::Miter => CpuJoin::Miter,
        Join::Round => CpuJoin::Round,
    };
    stroke.start_cap = cap_to_cpu(style.start_cap);
    stroke.end_cap = cap_to_cpu(style.end_cap);
    stroke
}

fn set_brush(ctx: &mut RenderContext, brush: &Brush) {
    match brush.clone() {
        Brush::Solid(color) => ctx.set_paint(color),
        Brush::Gradient(gradient) => ctx.set_paint(gradient),
        Brush::Image(image_brush) => {
            let source = ImageSource::from_peniko_image_data(&image_brush.image);
            ctx.set_paint(CpuImage {
                image: source,
                sampler: image_brush.sampler,
            });
        }
    }
}

fn render_settings() -> RenderSettings {
    RenderSettings {
        // Marker images are read back as RGBA8; keep the u8 pipeline even if
        // `f32_pipeline` is enabled elsewhere in the build.
        render_mode: RenderMode::OptimizeSpeed,
        ..RenderSettings::default()
    }
}

/// Rasterizes marker outlines with `vello_cpu`.
///
/// One render context is kept and reused while consecutive requests share
/// the same image size.
pub struct VelloCpuRasterizer {
    ctx: Option<(u16, u16, RenderContext)>,
}

impl fmt::Debug for VelloCpuRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VelloCpuRasterizer")
            .field("target", &self.ctx.as_ref().map(|(w, h, _)| (*w, *h)))
            .finish_non_exhaustive()
    }
}

impl Default for VelloCpuRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloCpuRasterizer {
    /// Creates a rasterizer with no render target yet.
    #[must_use]
    pub fn new() -> Self {
        Self { ctx: None }
    }

    fn context(&mut self, width: u16, height: u16) -> &mut RenderContext {
        let reuse = matches!(&self.ctx, Some((w, h, _)) if *w == width && *h == height);
        if !reuse {
            self.ctx = None;
        }
        let (_, _, ctx) = self.ctx.get_or_insert_with(|| {
            (
                width,
                height,
                RenderContext::new_with(width, height, render_settings()),
            )
        });
        if reuse {
            ctx.reset();
        }
        ctx
    }
}

impl MarkerRasterizer for VelloCpuRasterizer {
    fn rasterize(&mut self, request: &RasterRequest<'_>) -> Result<MarkerImage, RasterError> {
        let too_large = || {
            RasterError::new(VelloCpuRasterError::ImageTooLarge {
                width: request.width,
                height: request.height,
            })
        };
        let width = u16::try_from(request.width).map_err(|_| too_large())?;
        let height = u16::try_from(request.height).map_err(|_| too_large())?;
        if width == 0 || height == 0 {
            return Err(too_large());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(width, height, "rasterizing marker");

        let path = commands_to_cpu(request.commands);
        let ctx = self.context(width, height);
        ctx.set_transform(affine_to_cpu(request.transform));
        set_brush(ctx, request.fill);
        ctx.fill_path(&path);
        ctx.set_stroke(stroke_to_cpu(request.stroke, request.stroke.width));
        set_brush(ctx, request.stroke_brush);
        ctx.stroke_path(&path);
        ctx.flush();

        let mut pixmap = Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);
        let unpremul = pixmap.take_unpremultiplied();
        let mut bytes = Vec::with_capacity(unpremul.len() * 4);
        for p in unpremul {
            bytes.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        MarkerImage::new(request.width, request.height, bytes)
            .ok_or_else(|| RasterError::new(VelloCpuRasterError::BufferMismatch))
    }
}

/// Draws scatter visual objects into a `vello_cpu` render context.
///
/// `view` maps data coordinates to device pixels. Path markers are drawn
/// under it; raster markers are placed at the device position of their spot
/// and drawn unscaled.
pub struct VelloCpuMarkerPainter<'ctx> {
    /// Underlying Vello CPU render context to draw into.
    pub ctx: &'ctx mut RenderContext,
    view: Affine,
}

impl fmt::Debug for VelloCpuMarkerPainter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VelloCpuMarkerPainter")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl<'ctx> VelloCpuMarkerPainter<'ctx> {
    /// Creates a painter drawing into `ctx` under the data-to-device `view`.
    pub fn new(ctx: &'ctx mut RenderContext, view: Affine) -> Self {
        Self { ctx, view }
    }

    /// The data-to-device transform.
    #[must_use]
    pub fn view(&self) -> Affine {
        self.view
    }

    /// Replaces the data-to-device transform, e.g. after a pan or zoom.
    pub fn set_view(&mut self, view: Affine) {
        self.view = view;
    }
}

impl MarkerPainter for VelloCpuMarkerPainter<'_> {
    fn draw_raster(&mut self, position: Point, marker: &RasterMarker) {
        let image = &marker.pixmap;
        let data = ImageData {
            data: Blob::from(image.pixels().to_vec()),
            format: ImageFormat::Rgba8,
            alpha_type: ImageAlphaType::Alpha,
            width: image.width(),
            height: image.height(),
        };
        let origin = self.view * position + marker.offset;
        self.ctx
            .set_transform(affine_to_cpu(Affine::translate(origin.to_vec2())));
        self.ctx.set_paint(CpuImage {
            image: ImageSource::from_peniko_image_data(&data),
            sampler: ImageSampler::default(),
        });
        let rect = CpuRect::new(0.0, 0.0, f64::from(image.width()), f64::from(image.height()));
        self.ctx.fill_rect(&rect);
    }

    fn draw_path(&mut self, position: Point, marker: &PathMarker) {
        let xf = self.view * Affine::translate(position.to_vec2()) * marker.transform;
        let path = commands_to_cpu(&path_commands(&marker.path));
        self.ctx.set_transform(affine_to_cpu(xf));
        set_brush(self.ctx, &marker.brush);
        self.ctx.fill_path(&path);

        set_brush(self.ctx, &marker.pen.brush);
        if marker.pen.width() == 0.0 {
            // Cosmetic pens are one device pixel wide regardless of the view.
            let device: BezPath = xf * marker.path.clone();
            self.ctx.set_transform(CpuAffine::IDENTITY);
            self.ctx.set_stroke(stroke_to_cpu(&marker.pen.stroke, 1.0));
            self.ctx
                .stroke_path(&commands_to_cpu(&path_commands(&device)));
        } else {
            self.ctx
                .set_stroke(stroke_to_cpu(&marker.pen.stroke, marker.pen.width()));
            self.ctx.stroke_path(&path);
        }
    }
}
