//! Software rasterizer: the only backend specified in full. Fills are
//! tessellated with `lyon` (mirroring the teacher's `shape.rs` tessellation
//! pipeline) and rasterized with a scanline point-in-triangle test; strokes
//! reuse [`crate::stroke::tessellate_stroke`]'s mesh the same way.

use lyon::lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};
use lyon::path::Path as LyonPath;

use crate::error::{Error, Result};
use crate::fill::{Fill, Gradient};
use crate::geom::{Matrix, Point};
use crate::path::{FillRule, Path, PathCommand};
use crate::render::{
    mask_region_merging, BlendMethod, ColorSpace, CompositionFlag, MaskMethod, RenderEffect,
    RenderRegion, RenderShape, RenderSurface, RenderUpdateFlag,
};
use crate::stroke::{tessellate_stroke, StrokeMesh};

use super::{Compositor, RenderData, RenderMethod};

struct VertexConverter;

impl lyon::tessellation::FillVertexConstructor<Point> for VertexConverter {
    fn new_vertex(&mut self, vertex: FillVertex) -> Point {
        let p = vertex.position();
        Point::new(p.x, p.y)
    }
}

fn to_lyon_path(path: &Path) -> LyonPath {
    let mut builder = LyonPath::builder();
    let mut cursor = 0usize;
    let mut started = false;
    for cmd in &path.commands {
        match cmd {
            PathCommand::MoveTo => {
                if started {
                    builder.end(false);
                }
                let p = path.points[cursor];
                builder.begin(lyon::geom::point(p.x, p.y));
                cursor += 1;
                started = true;
            }
            PathCommand::LineTo => {
                let p = path.points[cursor];
                builder.line_to(lyon::geom::point(p.x, p.y));
                cursor += 1;
            }
            PathCommand::CubicTo => {
                let c1 = path.points[cursor];
                let c2 = path.points[cursor + 1];
                let end = path.points[cursor + 2];
                builder.cubic_bezier_to(
                    lyon::geom::point(c1.x, c1.y),
                    lyon::geom::point(c2.x, c2.y),
                    lyon::geom::point(end.x, end.y),
                );
                cursor += 3;
            }
            PathCommand::Close => {
                builder.end(true);
                started = false;
            }
        }
    }
    if started {
        builder.end(false);
    }
    builder.build()
}

/// Tessellates `path`'s fill into a CPU-side triangle list in local space.
fn tessellate_fill(path: &Path, rule: FillRule, tessellator: &mut FillTessellator) -> Result<VertexBuffers<Point, u32>> {
    let lyon_path = to_lyon_path(path);
    let lyon_rule = match rule {
        FillRule::NonZero => lyon::path::FillRule::NonZero,
        FillRule::EvenOdd => lyon::path::FillRule::EvenOdd,
    };
    let options = FillOptions::default().with_fill_rule(lyon_rule);
    let mut buffers = VertexBuffers::new();
    tessellator
        .tessellate_path(&lyon_path, &options, &mut BuffersBuilder::new(&mut buffers, VertexConverter))
        .map_err(|e| Error::FailedAllocation(format!("fill tessellation failed: {e:?}")))?;
    Ok(buffers)
}

#[derive(Debug, Clone)]
struct Paint {
    color: [u8; 4],
    gradient: Option<Gradient>,
}

impl Paint {
    /// Samples the paint at a local-space point. Gradients are evaluated by
    /// projecting `p` onto the gradient's own geometry, matching the
    /// `t`-parameterization `Gradient::sample` expects.
    fn sample(&self, p: Point) -> [u8; 4] {
        match &self.gradient {
            None => self.color,
            Some(g) => {
                let local = g.transform.transform_point(p);
                let t = match &g.fill {
                    Fill::Linear(l) => {
                        let d = l.p2 - l.p1;
                        let len2 = d.length2().max(crate::geom::EPSILON);
                        ((local - l.p1).x * d.x + (local - l.p1).y * d.y) / len2
                    }
                    Fill::Radial(r) => match r.correct() {
                        Some((focal, fr)) => radial_t(local, r.center, r.radius, focal, fr),
                        None => return g.stops.last().map_or([0, 0, 0, 0], |s| s.color),
                    },
                };
                g.sample(t)
            }
        }
    }
}

/// Solves for the gradient ramp parameter `t` such that `p` lies on the
/// circle interpolated between the focal circle (`t=0`) and the end circle
/// (`t=1`), following the standard two-circle radial gradient construction.
fn radial_t(p: Point, center: Point, radius: f32, focal: Point, focal_radius: f32) -> f32 {
    let cdx = center.x - focal.x;
    let cdy = center.y - focal.y;
    let dr = radius - focal_radius;
    let dx = p.x - focal.x;
    let dy = p.y - focal.y;

    let a = cdx * cdx + cdy * cdy - dr * dr;
    let b = dx * cdx + dy * cdy + focal_radius * dr;
    let c = dx * dx + dy * dy - focal_radius * focal_radius;

    if a.abs() < crate::geom::EPSILON {
        if b.abs() < crate::geom::EPSILON {
            return 0.0;
        }
        return c / (2.0 * b);
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return 1.0;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (b + sqrt_disc) / a;
    let t2 = (b - sqrt_disc) / a;
    t1.max(t2)
}

#[derive(Debug)]
pub struct SwShapeData {
    fill_triangles: Vec<[Point; 3]>,
    fill: Option<Paint>,
    stroke_mesh: Option<StrokeMesh>,
    stroke: Option<Paint>,
    stroke_first: bool,
    region: RenderRegion,
    opacity: u8,
    /// One triangle fan per active clipper; a pixel survives only if it
    /// falls inside every group's union (an empty list means unclipped).
    clip_groups: Vec<Vec<[Point; 3]>>,
}

impl RenderData for SwShapeData {}

#[derive(Debug)]
pub struct SwSurfaceData {
    surface: RenderSurface,
    /// Unclipped placement, used to map a destination pixel back to a
    /// source texel; `region` (possibly clip-shrunk) is what callers query
    /// via `RenderMethod::region` for bounds bookkeeping.
    origin: RenderRegion,
    region: RenderRegion,
    opacity: u8,
    clip_groups: Vec<Vec<[Point; 3]>>,
}

impl RenderData for SwSurfaceData {}

#[derive(Debug)]
pub enum SwRenderData {
    Shape(SwShapeData),
    Surface(SwSurfaceData),
}

impl RenderData for SwRenderData {}

#[derive(Debug)]
pub struct SwCompositor {
    surface: RenderSurface,
    region: RenderRegion,
    method: MaskMethod,
    opacity: u8,
}

impl Compositor for SwCompositor {}

/// The software `RenderMethod`. Owns the main pixel buffer and a stack of
/// off-screen compositors pushed by `begin_composite`/popped by
/// `end_composite`.
pub struct SwEngine {
    surface: RenderSurface,
    viewport: RenderRegion,
    blend: BlendMethod,
    tessellator: FillTessellator,
}

impl SwEngine {
    pub fn new(w: u32, h: u32, cs: ColorSpace) -> Self {
        let surface = RenderSurface::new(w, h, cs);
        let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: w as i32, max_y: h as i32 };
        SwEngine { surface, viewport, blend: BlendMethod::Normal, tessellator: FillTessellator::new() }
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    fn raster_triangle(
        surface: &mut RenderSurface,
        viewport: RenderRegion,
        tri: [Point; 3],
        paint: &Paint,
        opacity: u8,
        blend: BlendMethod,
        clip_groups: &[Vec<[Point; 3]>],
    ) {
        let min_x = tri.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(viewport.min_x as f32) as i32;
        let max_x = tri.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(viewport.max_x as f32) as i32;
        let min_y = tri.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(viewport.min_y as f32) as i32;
        let max_y = tri.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(viewport.max_y as f32) as i32;

        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let area = edge(a, b, c);
        if area.abs() < crate::geom::EPSILON {
            return;
        }

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b, c, p);
                let w1 = edge(c, a, p);
                let w2 = edge(a, b, p);
                let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
                if !inside {
                    continue;
                }
                if !point_passes_clips(p, clip_groups) {
                    continue;
                }
                let color = paint.sample(p);
                blend_pixel(surface, x as u32, y as u32, color, opacity, blend);
            }
        }
    }
}

fn edge(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_in_triangle(p: Point, tri: [Point; 3]) -> bool {
    let (a, b, c) = (tri[0], tri[1], tri[2]);
    let w0 = edge(b, c, p);
    let w1 = edge(c, a, p);
    let w2 = edge(a, b, p);
    (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0)
}

/// A point survives when it falls inside every clipper's own triangle union
/// (intersection of clippers); an empty list means nothing is clipping.
fn point_passes_clips(p: Point, clip_groups: &[Vec<[Point; 3]>]) -> bool {
    clip_groups.iter().all(|group| group.iter().any(|tri| point_in_triangle(p, *tri)))
}

fn blend_pixel(surface: &mut RenderSurface, x: u32, y: u32, src: [u8; 4], opacity: u8, method: BlendMethod) {
    if x >= surface.w || y >= surface.h {
        return;
    }
    let idx = (y * surface.stride + x) as usize;
    let dst = surface.data[idx].to_le_bytes();
    let sa = (src[3] as u32 * opacity as u32 / 255) as u8;
    let mix = |s: u8, d: u8| -> u8 {
        match method {
            BlendMethod::Normal => s,
            BlendMethod::Multiply => ((s as u32 * d as u32) / 255) as u8,
            BlendMethod::Screen => 255 - (((255 - s as u32) * (255 - d as u32)) / 255) as u8,
            BlendMethod::Add => (s as u32 + d as u32).min(255) as u8,
            BlendMethod::Difference => (s as i32 - d as i32).unsigned_abs() as u8,
            _ => s,
        }
    };
    let sr = mix(src[0], dst[0]);
    let sg = mix(src[1], dst[1]);
    let sb = mix(src[2], dst[2]);
    let a = sa as f32 / 255.0;
    let out = [
        crate::geom::lerp_u8(dst[0], sr, a),
        crate::geom::lerp_u8(dst[1], sg, a),
        crate::geom::lerp_u8(dst[2], sb, a),
        dst[3].max(sa),
    ];
    surface.data[idx] = u32::from_le_bytes(out);
}

/// Collects each clipper's own fill triangles (already in the same
/// world-space frame the clipped shape was prepared in, since `PaintArena`
/// updates the clipper with the same propagated matrix) into one group per
/// clipper, and the intersection of their bounding regions for a cheap
/// early-out before the per-pixel test.
fn clip_groups_from(clips: &[SwRenderData], base_region: RenderRegion) -> (Vec<Vec<[Point; 3]>>, RenderRegion) {
    let mut groups = Vec::with_capacity(clips.len());
    let mut region = base_region;
    for clip in clips {
        if let SwRenderData::Shape(s) = clip {
            region = RenderRegion::intersect(region, s.region);
            groups.push(s.fill_triangles.clone());
        }
    }
    (groups, region)
}

impl RenderMethod for SwEngine {
    type RenderData = SwRenderData;
    type Compositor = SwCompositor;

    fn prepare_shape(
        &mut self,
        shape: &RenderShape,
        _prev: Option<Self::RenderData>,
        transform: &Matrix,
        clips: &[Self::RenderData],
        opacity: u8,
        _flags: RenderUpdateFlag,
        _is_clipper: bool,
    ) -> Result<Self::RenderData> {
        let transformed = shape.path.transform(transform);

        let buffers = tessellate_fill(&transformed, shape.rule, &mut self.tessellator)?;
        let fill_triangles: Vec<[Point; 3]> = buffers
            .indices
            .chunks_exact(3)
            .map(|t| [buffers.vertices[t[0] as usize], buffers.vertices[t[1] as usize], buffers.vertices[t[2] as usize]])
            .collect();

        let stroke_mesh = tessellate_stroke(shape, transform);

        let mut region = transformed.bounds().unwrap_or_else(crate::geom::BBox::empty);
        if let Some(mesh) = &stroke_mesh {
            region.include(Point::new(mesh.bounds.min_x as f32, mesh.bounds.min_y as f32));
            region.include(Point::new(mesh.bounds.max_x as f32, mesh.bounds.max_y as f32));
        }
        if region.is_empty() {
            region = crate::geom::BBox { min: Point::ZERO, max: Point::ZERO };
        }

        let region = RenderRegion {
            min_x: region.min.x.floor() as i32,
            min_y: region.min.y.floor() as i32,
            max_x: region.max.x.ceil() as i32,
            max_y: region.max.y.ceil() as i32,
        };
        let (clip_groups, region) = clip_groups_from(clips, region);

        Ok(SwRenderData::Shape(SwShapeData {
            fill_triangles,
            fill: Some(Paint { color: shape.color, gradient: shape.fill.clone() }),
            stroke_mesh,
            stroke: shape.stroke.as_ref().map(|s| Paint { color: s.color, gradient: s.fill.clone() }),
            stroke_first: shape.stroke_first(),
            region,
            opacity,
            clip_groups,
        }))
    }

    fn prepare_surface(
        &mut self,
        surface: &RenderSurface,
        _prev: Option<Self::RenderData>,
        _transform: &Matrix,
        clips: &[Self::RenderData],
        opacity: u8,
        _flags: RenderUpdateFlag,
    ) -> Result<Self::RenderData> {
        let origin = RenderRegion { min_x: 0, min_y: 0, max_x: surface.w as i32, max_y: surface.h as i32 };
        let (clip_groups, region) = clip_groups_from(clips, origin);
        Ok(SwRenderData::Surface(SwSurfaceData {
            surface: surface.clone(),
            origin,
            region,
            opacity,
            clip_groups,
        }))
    }

    fn prepare_effect(&mut self, _effect: &RenderEffect, _transform: &Matrix) {}

    fn pre_render(&mut self) -> bool {
        true
    }

    fn post_render(&mut self) -> bool {
        true
    }

    fn render_shape(&mut self, rd: &Self::RenderData) -> bool {
        let SwRenderData::Shape(shape) = rd else { return false };
        let paint_stroke = |engine: &mut Self| {
            if let (Some(mesh), Some(paint)) = (&shape.stroke_mesh, &shape.stroke) {
                for tri in mesh.indices.chunks_exact(3) {
                    let t = [mesh.vertices[tri[0] as usize], mesh.vertices[tri[1] as usize], mesh.vertices[tri[2] as usize]];
                    Self::raster_triangle(&mut engine.surface, engine.viewport, t, paint, shape.opacity, engine.blend, &shape.clip_groups);
                }
            }
        };
        let paint_fill = |engine: &mut Self| {
            if let Some(paint) = &shape.fill {
                for tri in &shape.fill_triangles {
                    Self::raster_triangle(&mut engine.surface, engine.viewport, *tri, paint, shape.opacity, engine.blend, &shape.clip_groups);
                }
            }
        };
        if shape.stroke_first {
            paint_stroke(self);
            paint_fill(self);
        } else {
            paint_fill(self);
            paint_stroke(self);
        }
        true
    }

    fn render_image(&mut self, rd: &Self::RenderData) -> bool {
        let SwRenderData::Surface(data) = rd else { return false };
        let region = RenderRegion::intersect(data.region, self.viewport);
        for y in region.min_y.max(0)..region.max_y {
            for x in region.min_x.max(0)..region.max_x {
                let sx = x - data.origin.min_x;
                let sy = y - data.origin.min_y;
                if sx < 0 || sy < 0 || sx as u32 >= data.surface.w || sy as u32 >= data.surface.h {
                    continue;
                }
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if !point_passes_clips(p, &data.clip_groups) {
                    continue;
                }
                let src = data.surface.data[(sy as u32 * data.surface.stride + sx as u32) as usize].to_le_bytes();
                blend_pixel(&mut self.surface, x as u32, y as u32, src, data.opacity, self.blend);
            }
        }
        true
    }

    fn render_effect(&mut self, cmp: &mut Self::Compositor, effect: &RenderEffect, _direct: bool) -> bool {
        match effect {
            RenderEffect::Fill { color } => {
                for px in cmp.surface.data.iter_mut() {
                    let dst = px.to_le_bytes();
                    *px = u32::from_le_bytes([color[0], color[1], color[2], dst[3]]);
                }
                true
            }
            RenderEffect::GaussianBlur { sigma, .. } => {
                box_blur(&mut cmp.surface, (*sigma).max(0.0) as u32);
                true
            }
            _ => true,
        }
    }

    fn target(&mut self, region: RenderRegion, cs: ColorSpace, flags: CompositionFlag) -> Result<Self::Compositor> {
        if region.invalid() {
            return Err(Error::InvalidArguments("target region must be non-empty".into()));
        }
        let surface = RenderSurface::new(region.w().max(0) as u32, region.h().max(0) as u32, cs);
        let _ = flags;
        Ok(SwCompositor { surface, region, method: MaskMethod::None, opacity: 255 })
    }

    fn begin_composite(&mut self, cmp: &mut Self::Compositor, method: MaskMethod, opacity: u8) -> bool {
        cmp.method = method;
        cmp.opacity = opacity;
        true
    }

    fn end_composite(&mut self, cmp: Self::Compositor) -> bool {
        let expand = mask_region_merging(cmp.method);
        let dest_region = if expand { cmp.region } else { RenderRegion::intersect(cmp.region, self.viewport) };
        for y in dest_region.min_y.max(0)..dest_region.max_y {
            for x in dest_region.min_x.max(0)..dest_region.max_x {
                let sx = (x - cmp.region.min_x) as u32;
                let sy = (y - cmp.region.min_y) as u32;
                if sx >= cmp.surface.w || sy >= cmp.surface.h {
                    continue;
                }
                let src = cmp.surface.data[(sy * cmp.surface.stride + sx) as usize].to_le_bytes();
                blend_pixel(&mut self.surface, x as u32, y as u32, src, cmp.opacity, BlendMethod::Normal);
            }
        }
        true
    }

    fn region(&self, rd: &Self::RenderData) -> RenderRegion {
        match rd {
            SwRenderData::Shape(s) => s.region,
            SwRenderData::Surface(s) => s.region,
        }
    }

    fn bounds(&self, rd: &Self::RenderData, m: &Matrix) -> [Point; 4] {
        let r = self.region(rd);
        [
            m.transform_point(Point::new(r.min_x as f32, r.min_y as f32)),
            m.transform_point(Point::new(r.max_x as f32, r.min_y as f32)),
            m.transform_point(Point::new(r.max_x as f32, r.max_y as f32)),
            m.transform_point(Point::new(r.min_x as f32, r.max_y as f32)),
        ]
    }

    fn blend(&mut self, method: BlendMethod) -> bool {
        self.blend = method;
        true
    }

    fn viewport(&mut self, region: RenderRegion) {
        self.viewport = region;
    }

    fn get_viewport(&self) -> RenderRegion {
        self.viewport
    }

    fn dispose(&mut self, _rd: Self::RenderData) {}

    fn color_space(&self) -> ColorSpace {
        self.surface.cs
    }

    fn sync(&mut self) -> bool {
        true
    }

    fn clear(&mut self) -> bool {
        for p in self.surface.data.iter_mut() {
            *p = 0;
        }
        true
    }
}

/// Separable box blur used as the `GaussianBlur` effect's approximation,
/// following the common three-pass-box-blur-approximates-gaussian technique.
fn box_blur(surface: &mut RenderSurface, radius: u32) {
    if radius == 0 {
        return;
    }
    let (w, h) = (surface.w as i32, surface.h as i32);
    let mut tmp = surface.data.clone();
    for y in 0..h {
        for x in 0..w {
            let mut sum = [0u32; 4];
            let mut count = 0u32;
            for dx in -(radius as i32)..=(radius as i32) {
                let sx = x + dx;
                if sx < 0 || sx >= w {
                    continue;
                }
                let px = surface.data[(y * w + sx) as usize].to_le_bytes();
                for c in 0..4 {
                    sum[c] += px[c] as u32;
                }
                count += 1;
            }
            let out = [
                (sum[0] / count) as u8,
                (sum[1] / count) as u8,
                (sum[2] / count) as u8,
                (sum[3] / count) as u8,
            ];
            tmp[(y * w + x) as usize] = u32::from_le_bytes(out);
        }
    }
    surface.data.copy_from_slice(&tmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::render::RenderShape;

    #[test]
    fn solid_triangle_is_rasterized() {
        let mut path = Path::new();
        path.move_to(10.0, 10.0);
        path.line_to(50.0, 10.0);
        path.line_to(30.0, 50.0);
        path.close();

        let shape = RenderShape { path, color: [255, 0, 0, 255], ..Default::default() };

        let mut engine = SwEngine::new(64, 64, ColorSpace::Abgr8888);
        let rd = engine.prepare_shape(&shape, None, &Matrix::IDENTITY, &[], 255, RenderUpdateFlag::ALL, false).unwrap();
        assert!(engine.render_shape(&rd));
        let center = engine.surface().data[(30 * 64 + 25) as usize];
        assert_ne!(center, 0);
    }

    #[test]
    fn region_matches_path_bounds() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(20.0, 0.0);
        path.line_to(20.0, 20.0);
        path.close();
        let shape = RenderShape { path, color: [0, 0, 0, 255], ..Default::default() };
        let mut engine = SwEngine::new(32, 32, ColorSpace::Abgr8888);
        let rd = engine.prepare_shape(&shape, None, &Matrix::IDENTITY, &[], 255, RenderUpdateFlag::ALL, false).unwrap();
        let region = engine.region(&rd);
        assert_eq!(region.min_x, 0);
        assert_eq!(region.max_x, 20);
    }

    #[test]
    fn clip_restricts_fill_to_the_clipper_shape() {
        let mut square = Path::new();
        square.append_rect(0.0, 0.0, 40.0, 40.0, 0.0, 0.0, true);
        let square_shape = RenderShape { path: square, color: [255, 0, 0, 255], ..Default::default() };

        let mut circle = Path::new();
        circle.append_circle(20.0, 20.0, 10.0, 10.0, true);
        let circle_shape = RenderShape { path: circle, ..Default::default() };

        let mut engine = SwEngine::new(40, 40, ColorSpace::Abgr8888);
        let clip_rd = engine.prepare_shape(&circle_shape, None, &Matrix::IDENTITY, &[], 255, RenderUpdateFlag::ALL, false).unwrap();
        let rd = engine.prepare_shape(&square_shape, None, &Matrix::IDENTITY, std::slice::from_ref(&clip_rd), 255, RenderUpdateFlag::ALL, false).unwrap();
        assert!(engine.render_shape(&rd));

        let center = engine.surface().data[(20 * 40 + 20) as usize].to_le_bytes();
        let corner = engine.surface().data[(2 * 40 + 2) as usize].to_le_bytes();
        assert_eq!(center, [255, 0, 0, 255]);
        assert_eq!(corner, [0, 0, 0, 0]);
    }
}
