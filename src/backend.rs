//! `RenderMethod`: the sole boundary between the retained scene graph and a
//! concrete rasterizer. [`sw`] implements it fully in software; [`gpu`] is a
//! thin, feature-gated stub that reuses the teacher's wgpu plumbing for the
//! parts that have a direct counterpart.

use crate::error::{Error, Result};
use crate::geom::{Matrix, Point};
use crate::render::{
    BlendMethod, ColorSpace, CompositionFlag, RenderEffect, RenderRegion, RenderShape,
    RenderSurface, RenderUpdateFlag,
};

/// A handle into backend-owned render data for a single prepared paint.
/// Opaque to the scene graph; only the backend that produced it knows what
/// it contains.
pub trait RenderData: std::fmt::Debug {}

/// An off-screen composite target acquired via [`RenderMethod::target`].
pub trait Compositor: std::fmt::Debug {}

/// The backend contract every rasterizer (software, GL, WebGPU) implements.
/// The paint graph (`crate::paint`) only ever talks to its scene through
/// this trait; it never depends on a concrete rasterizer.
pub trait RenderMethod {
    type RenderData: RenderData;
    type Compositor: Compositor;

    /// Build or update backend data for a shape. `prev` is the shape's
    /// previous render data, if any — implementations should reuse its
    /// storage (tessellation cache, texture) rather than reallocate when
    /// `flags` shows the relevant piece didn't change.
    fn prepare_shape(
        &mut self,
        shape: &RenderShape,
        prev: Option<Self::RenderData>,
        transform: &Matrix,
        clips: &[Self::RenderData],
        opacity: u8,
        flags: RenderUpdateFlag,
        is_clipper: bool,
    ) -> Result<Self::RenderData>;

    /// Build or update backend data for a bitmap.
    fn prepare_surface(
        &mut self,
        surface: &RenderSurface,
        prev: Option<Self::RenderData>,
        transform: &Matrix,
        clips: &[Self::RenderData],
        opacity: u8,
        flags: RenderUpdateFlag,
    ) -> Result<Self::RenderData>;

    /// Precompute an effect's kernel/LUT for the given transform (e.g. blur
    /// radius in device pixels after scale).
    fn prepare_effect(&mut self, effect: &RenderEffect, transform: &Matrix);

    /// Bracket a frame: called once before any `render_*` call.
    fn pre_render(&mut self) -> bool;
    /// Bracket a frame: called once after all `render_*` calls.
    fn post_render(&mut self) -> bool;

    fn render_shape(&mut self, rd: &Self::RenderData) -> bool;
    fn render_image(&mut self, rd: &Self::RenderData) -> bool;
    /// Runs a post effect over `cmp`'s contents. `direct` means the effect
    /// may write straight into `cmp` rather than via an intermediate buffer.
    fn render_effect(&mut self, cmp: &mut Self::Compositor, effect: &RenderEffect, direct: bool) -> bool;

    /// Acquires an off-screen render target sized to `region`.
    fn target(&mut self, region: RenderRegion, cs: ColorSpace, flags: CompositionFlag) -> Result<Self::Compositor>;
    fn begin_composite(&mut self, cmp: &mut Self::Compositor, method: crate::render::MaskMethod, opacity: u8) -> bool;
    fn end_composite(&mut self, cmp: Self::Compositor) -> bool;

    /// A prepared paint's screen-space region.
    fn region(&self, rd: &Self::RenderData) -> RenderRegion;
    /// A prepared paint's 4-corner quad under `m`, for hit-testing / bounds queries.
    fn bounds(&self, rd: &Self::RenderData, m: &Matrix) -> [Point; 4];

    fn blend(&mut self, method: BlendMethod) -> bool;

    fn viewport(&mut self, region: RenderRegion);
    fn get_viewport(&self) -> RenderRegion;

    fn dispose(&mut self, rd: Self::RenderData);

    fn color_space(&self) -> ColorSpace;

    /// Completes any outstanding backend work (e.g. GPU queue submission).
    fn sync(&mut self) -> bool;
    /// Resets per-frame backend state.
    fn clear(&mut self) -> bool;
}

pub mod sw;

#[cfg(feature = "gpu")]
pub mod gpu;
