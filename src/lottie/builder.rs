//! Builds a [`crate::scene::Scene`] paint tree from a [`Composition`] at a
//! given playhead frame. Mirrors `tvgLottieBuilder`'s `update()`: walk layers
//! back-to-front, compose transforms/opacity down the parent chain, apply
//! mattes, and for shape layers walk the content tree accumulating paint
//! state the way Lottie's own "propagator" does.

use crate::backend::RenderMethod;
use crate::engine::FontRegistry;
use crate::fill::{ColorStop, Gradient};
use crate::geom::{CubicBezier, Matrix, Point};
use crate::paint::{PaintArena, PaintId, PaintKind};
use crate::path::{Path, PathCommand};
use crate::picture::Picture;
use crate::render::{Dash, RenderShape, RenderStroke, StrokeJoin};
use crate::scene::Scene;
use crate::text::Text;

use super::model::{
    Composition, FillRule as LottieFillRule, GradientKind, GradientSpec, Layer, LayerKind,
    MatteType, ShapeNode, Transform as LottieTransform,
};

/// Stateless: all per-build data lives in the arena it writes into.
#[derive(Debug, Default)]
pub struct LottieBuilder;

impl LottieBuilder {
    pub fn new() -> Self {
        LottieBuilder
    }

    /// Rebuilds the whole composition at `frame`, returning the root scene's
    /// paint id. Deterministic: the same `(comp, frame, fonts)` always
    /// produces an identical tree. `fonts` resolves text layers' `font_family`
    /// into glyph outlines; a layer whose family isn't registered falls back
    /// to a flat color box.
    pub fn build<R: RenderMethod>(&self, arena: &mut PaintArena<R>, comp: &Composition, frame: f32, fonts: &FontRegistry) -> PaintId {
        let frame = comp.clamp_frame(frame);
        let root = build_layer_list(arena, &comp.layers, comp, frame, fonts);

        let mut clip_path = Path::new();
        clip_path.append_rect(0.0, 0.0, comp.width as f32, comp.height as f32, 0.0, 0.0, true);
        let clip_id = arena.insert(PaintKind::Shape(RenderShape { path: clip_path, ..Default::default() }));
        let _ = arena.clip(root, clip_id);
        root
    }
}

fn build_layer_list<R: RenderMethod>(
    arena: &mut PaintArena<R>,
    layers: &[Layer],
    comp: &Composition,
    frame: f32,
    fonts: &FontRegistry,
) -> PaintId {
    let scene_id = arena.insert(PaintKind::Scene(Scene::default()));

    // A layer with a matte type consumes the layer immediately above it in
    // the array as its matte source; that source is skipped in normal
    // z-order (it only ever renders through the mask).
    let mut consumed = vec![false; layers.len()];
    for (i, layer) in layers.iter().enumerate() {
        if layer.matte_type != MatteType::None && i > 0 {
            consumed[i - 1] = true;
        }
    }

    // Reverse walk: Lottie's array is top-down z-order; we emit back-to-front.
    for i in (0..layers.len()).rev() {
        if consumed[i] {
            continue;
        }
        let layer = &layers[i];
        if !layer.visible_at(frame) {
            continue;
        }
        let Some(content_id) = build_layer_content(arena, layer, comp, frame, fonts) else {
            continue;
        };
        if layer.matte_type != MatteType::None && i > 0 {
            if let Some(source_id) = build_layer_content(arena, &layers[i - 1], comp, frame, fonts) {
                if let Some(method) = layer.matte_type.to_mask_method() {
                    let _ = arena.mask(content_id, source_id, method);
                }
            }
        }
        if let Some(node) = arena.get_mut(scene_id) {
            if let PaintKind::Scene(s) = &mut node.kind {
                s.push(content_id);
            }
        }
    }
    scene_id
}

fn build_layer_content<R: RenderMethod>(
    arena: &mut PaintArena<R>,
    layer: &Layer,
    comp: &Composition,
    global_frame: f32,
    fonts: &FontRegistry,
) -> Option<PaintId> {
    let local_frame = layer_local_frame(layer, comp, global_frame);

    let content_kind = match layer.kind {
        LayerKind::Null => PaintKind::Scene(Scene::default()),
        LayerKind::Solid => {
            let mut path = Path::new();
            path.append_rect(0.0, 0.0, layer.width, layer.height, 0.0, 0.0, true);
            PaintKind::Shape(RenderShape { path, color: layer.solid_color, ..Default::default() })
        }
        LayerKind::Image => {
            let surface = layer.image_asset.as_deref().and_then(|id| comp.image(id))?.clone();
            PaintKind::Picture(Picture::bitmap(surface))
        }
        LayerKind::Precomp => {
            let sub_layers = layer.precomp_ref.as_deref().and_then(|id| comp.precomp(id))?;
            let sub_scene = build_layer_list(arena, sub_layers, comp, local_frame, fonts);
            return Some(finish_layer_wrapper(arena, layer, sub_scene, global_frame));
        }
        LayerKind::Shape => {
            let children = build_group(arena, &layer.shapes, local_frame);
            let mut scene = Scene::default();
            scene.children = children;
            PaintKind::Scene(scene)
        }
        LayerKind::Text => {
            let doc = layer.text.as_ref()?;
            build_text_content(arena, doc, fonts)
        }
    };
    let content_id = arena.insert(content_kind);
    Some(finish_layer_wrapper(arena, layer, content_id, global_frame))
}

/// Lays `doc` out against its registered font (as `text::Text::layout`
/// produces one path per glyph) and wraps the outlines in a scene. Falls
/// back to a flat color box, as before, when `doc.font_family` isn't
/// registered — there's no bundled font backend to substitute.
fn build_text_content<R: RenderMethod>(
    arena: &mut PaintArena<R>,
    doc: &crate::lottie::model::TextDocument,
    fonts: &FontRegistry,
) -> PaintKind {
    let Some(source) = fonts.get(&doc.font_family) else {
        tracing::warn!(font_family = %doc.font_family, "font not registered, rendering text layer as a flat box");
        let (w, h) = doc.box_size.unwrap_or((200.0, doc.font_size * doc.line_spacing));
        let mut path = Path::new();
        path.append_rect(0.0, 0.0, w, h, 0.0, 0.0, true);
        return PaintKind::Shape(RenderShape { path, color: doc.color, ..Default::default() });
    };

    let text = Text {
        content: doc.text.clone(),
        font_size: doc.font_size,
        line_spacing: doc.line_spacing,
        color: doc.color,
        box_size: doc.box_size,
        ..Default::default()
    };
    let glyph_paths = text.layout(source.as_ref());

    let mut scene = Scene::default();
    for path in glyph_paths {
        let shape = RenderShape { path, color: doc.color, ..Default::default() };
        let id = arena.insert(PaintKind::Shape(shape));
        scene.push(id);
    }
    PaintKind::Scene(scene)
}

/// `frame /= timeStretch`, or the time-remap property's value (a time in
/// seconds) converted to frames via the composition frame rate.
fn layer_local_frame(layer: &Layer, comp: &Composition, global_frame: f32) -> f32 {
    if let Some(remap) = &layer.time_remap {
        return remap.value_at(global_frame) * comp.frame_rate;
    }
    if layer.time_stretch != 0.0 {
        global_frame / layer.time_stretch
    } else {
        global_frame
    }
}

fn finish_layer_wrapper<R: RenderMethod>(
    arena: &mut PaintArena<R>,
    layer: &Layer,
    content_id: PaintId,
    frame: f32,
) -> PaintId {
    let mut scene = Scene::default();
    scene.push(content_id);
    let wrapper = arena.insert(PaintKind::Scene(scene));

    let extra_rotation = if layer.transform.auto_orient { auto_orient_angle(&layer.transform, frame) } else { 0.0 };
    let m = compose_transform(&layer.transform, frame, extra_rotation);
    arena.set_transform(wrapper, m);

    let opacity_pct = layer.transform.opacity.value_at(frame);
    arena.set_opacity(wrapper, pct_to_u8(opacity_pct));
    arena.set_blend(wrapper, layer.blend);
    wrapper
}

/// `translate(position) * scale(scale) * rotate(rotation+auto) * translate(-anchor)`,
/// built with `translate(-anchor)` as the leftmost factor so it is the first
/// one applied under this crate's row-vector `post_mul` convention.
fn compose_transform(t: &LottieTransform, frame: f32, extra_rotation: f32) -> Matrix {
    let anchor = t.anchor.value_at(frame);
    let position = t.position.value_at(frame);
    let scale = t.scale.value_at(frame);
    let rotation = t.rotation.value_at(frame) + extra_rotation;

    let mut m = Matrix::translation(Point::new(-anchor.x, -anchor.y));
    m = m.post_mul(&Matrix::rotation(rotation));
    m = m.post_mul(&Matrix::scale(Point::new(scale.x / 100.0, scale.y / 100.0)));
    m = m.post_mul(&Matrix::translation(position));
    m
}

/// The tangent angle of the position property at `frame`, via a central
/// finite difference — the position path itself has no closed-form
/// derivative once it's piecewise-eased keyframes.
fn auto_orient_angle(t: &LottieTransform, frame: f32) -> f32 {
    const H: f32 = 0.5;
    let p0 = t.position.value_at(frame - H);
    let p1 = t.position.value_at(frame + H);
    (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees()
}

fn pct_to_u8(pct: f32) -> u8 {
    ((pct / 100.0) * 255.0).round().clamp(0.0, 255.0) as u8
}

fn color_with_opacity(c: [u8; 4], opacity_pct: f32) -> [u8; 4] {
    let a = (c[3] as f32 * (opacity_pct / 100.0)).round().clamp(0.0, 255.0) as u8;
    [c[0], c[1], c[2], a]
}

fn to_path_fill_rule(r: LottieFillRule) -> crate::path::FillRule {
    match r {
        LottieFillRule::NonZero => crate::path::FillRule::NonZero,
        LottieFillRule::EvenOdd => crate::path::FillRule::EvenOdd,
    }
}

fn gradient_from_spec(spec: &GradientSpec, frame: f32) -> Gradient {
    let start = spec.start.value_at(frame);
    let end = spec.end.value_at(frame);
    let mut g = match spec.kind {
        GradientKind::Linear => Gradient::linear(start, end),
        GradientKind::Radial => Gradient::radial(start, start.dist(end), start, 0.0),
    };
    let stops = spec
        .stops
        .iter()
        .map(|s| ColorStop { offset: s.offset.value_at(frame) / 100.0, color: s.color.value_at(frame) })
        .collect();
    g.set_stops(stops);
    g
}

/// A single `nPoints`/`innerRadius`/`outerRadius` star or polygon path,
/// centered on `position`, starting straight up and winding clockwise.
/// `inner_roundness`/`outer_roundness` (0-100) bulge each vertex into a
/// smooth cubic corner the same way [`crate::path::Path::append_rect`]
/// rounds a corner with a kappa-scaled handle tangent to the vertex; zero
/// roundness collapses the handles onto the vertices, reproducing a sharp
/// corner exactly.
#[allow(clippy::too_many_arguments)]
fn build_polystar_path(
    is_star: bool,
    center: Point,
    point_count: f32,
    inner_radius: f32,
    outer_radius: f32,
    inner_roundness: f32,
    outer_roundness: f32,
    rotation_deg: f32,
) -> Path {
    let n = point_count.max(3.0).round() as i32;
    let vertices = if is_star { n * 2 } else { n };
    let step = std::f32::consts::TAU / vertices as f32;
    let start_angle = rotation_deg.to_radians() - std::f32::consts::FRAC_PI_2;

    let corners: Vec<(Point, Point, f32)> = (0..vertices)
        .map(|i| {
            let is_inner = is_star && i % 2 == 1;
            let radius = if is_inner { inner_radius } else { outer_radius };
            let roundness = if is_inner { inner_roundness } else { outer_roundness };
            let angle = start_angle + step * i as f32;
            let pos = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
            let tangent = Point::new(-angle.sin(), angle.cos());
            let handle = radius * (roundness / 100.0).clamp(0.0, 1.0) * crate::geom::PATH_KAPPA;
            (pos, tangent, handle)
        })
        .collect();

    let mut path = Path::new();
    let (first_pos, _, _) = corners[0];
    path.move_to(first_pos.x, first_pos.y);
    for i in 1..corners.len() {
        let (prev_pos, prev_tan, prev_handle) = corners[i - 1];
        let (pos, tan, handle) = corners[i];
        let c1 = prev_pos + prev_tan * prev_handle;
        let c2 = pos - tan * handle;
        path.cubic_to(c1.x, c1.y, c2.x, c2.y, pos.x, pos.y);
    }
    let (last_pos, last_tan, last_handle) = corners[corners.len() - 1];
    let (first_pos, first_tan, first_handle) = corners[0];
    let c1 = last_pos + last_tan * last_handle;
    let c2 = first_pos - first_tan * first_handle;
    path.cubic_to(c1.x, c1.y, c2.x, c2.y, first_pos.x, first_pos.y);
    path.close();
    path
}

/// Approximates Lottie's "offset path" shape modifier: flattens the path,
/// then pushes each vertex out along its local bisector normal by `amount`
/// (negative shrinks). `join` picks the corner behavior the same way the
/// stroker does: `Miter` extends toward the mitered apex, `Bevel`/`Round`
/// settle for the plain bisector offset. This is a vertex displacement, not
/// a true outline reconstruction, so self-intersections at sharp inward
/// offsets aren't resolved.
fn offset_path(path: &Path, amount: f32, join: StrokeJoin) -> Path {
    let mut out = Path::new();
    for (poly, closed) in flatten_for_offset(path) {
        let offset = offset_polyline(&poly, closed, amount, join);
        if offset.len() < 2 {
            continue;
        }
        out.move_to(offset[0].x, offset[0].y);
        for p in &offset[1..] {
            out.line_to(p.x, p.y);
        }
        if closed {
            out.close();
        }
    }
    out
}

fn flatten_for_offset(path: &Path) -> Vec<(Vec<Point>, bool)> {
    let mut out = Vec::new();
    let mut poly: Vec<Point> = Vec::new();
    let mut closed = false;
    let mut cursor = Point::ZERO;
    let mut pts = path.points.iter().copied();

    for cmd in &path.commands {
        match cmd {
            PathCommand::MoveTo => {
                if poly.len() > 1 {
                    out.push((std::mem::take(&mut poly), closed));
                }
                poly.clear();
                closed = false;
                let p = pts.next().unwrap();
                cursor = p;
                poly.push(p);
            }
            PathCommand::LineTo => {
                let p = pts.next().unwrap();
                cursor = p;
                poly.push(p);
            }
            PathCommand::CubicTo => {
                let c1 = pts.next().unwrap();
                let c2 = pts.next().unwrap();
                let p = pts.next().unwrap();
                let bez = CubicBezier::new(cursor, c1, c2, p);
                let steps = bez.segments().max(1);
                for i in 1..=steps {
                    let t = i as f32 / steps as f32;
                    poly.push(bez.at(t));
                }
                cursor = p;
            }
            PathCommand::Close => {
                closed = true;
            }
        }
    }
    if poly.len() > 1 {
        out.push((poly, closed));
    }
    out
}

fn offset_polyline(pts: &[Point], closed: bool, amount: f32, join: StrokeJoin) -> Vec<Point> {
    if pts.len() < 2 {
        return pts.to_vec();
    }
    let mut ring = pts.to_vec();
    if closed && ring.first() != ring.last() {
        ring.push(ring[0]);
    }
    let m = ring.len();
    let mut out = Vec::with_capacity(m);
    for i in 0..m {
        let prev = if i == 0 { if closed { ring[m - 2] } else { ring[0] } } else { ring[i - 1] };
        let cur = ring[i];
        let next = if i + 1 < m { ring[i + 1] } else if closed { ring[1] } else { ring[m - 1] };

        let normal_in = prev.direction_to(cur).map(|d| Point::new(-d.y, d.x));
        let normal_out = cur.direction_to(next).map(|d| Point::new(-d.y, d.x));
        let normal = match (normal_in, normal_out) {
            (Some(a), Some(b)) => {
                let bisector = a + b;
                let len = bisector.length();
                if len <= crate::geom::EPSILON {
                    a
                } else {
                    let unit = bisector * (1.0 / len);
                    match join {
                        StrokeJoin::Miter => {
                            let cos_half = ((1.0 + a.dot(b)) * 0.5).max(0.01).sqrt();
                            unit * (1.0 / cos_half).min(4.0)
                        }
                        StrokeJoin::Bevel | StrokeJoin::Round => unit,
                    }
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => Point::ZERO,
        };
        out.push(cur + normal * amount);
    }
    out
}

/// Walks one shape-layer group's content list, accumulating path geometry
/// into `acc_path` until a paint node (Fill/Stroke/Gradient variant) is hit,
/// at which point a shape paint is emitted with whatever has accumulated so
/// far — mirroring the propagator/merging behavior described for shape-layer
/// traversal, simplified to a single accumulated path per group rather than
/// a full fork-on-fragmentation context stack.
fn build_group<R: RenderMethod>(arena: &mut PaintArena<R>, nodes: &[ShapeNode], frame: f32) -> Vec<PaintId> {
    let mut out: Vec<PaintId> = Vec::new();
    let mut acc_path = Path::new();
    let mut roundness_override: Option<f32> = None;

    for node in nodes {
        match node {
            ShapeNode::Group { transform, children, .. } => {
                let child_ids = build_group(arena, children, frame);
                let mut scene = Scene::default();
                scene.children = child_ids;
                let group_id = arena.insert(PaintKind::Scene(scene));
                if let Some(t) = transform {
                    arena.set_transform(group_id, compose_transform(t, frame, 0.0));
                    arena.set_opacity(group_id, pct_to_u8(t.opacity.value_at(frame)));
                }
                out.push(group_id);
            }

            ShapeNode::Rect { position, size, radius, clockwise } => {
                let p = position.value_at(frame);
                let s = size.value_at(frame);
                let r = roundness_override.unwrap_or_else(|| radius.value_at(frame));
                acc_path.append_rect(p.x - s.x * 0.5, p.y - s.y * 0.5, s.x, s.y, r, r, *clockwise);
            }
            ShapeNode::Ellipse { position, size, clockwise } => {
                let p = position.value_at(frame);
                let s = size.value_at(frame);
                acc_path.append_circle(p.x, p.y, s.x * 0.5, s.y * 0.5, *clockwise);
            }
            ShapeNode::Path { path, .. } => {
                acc_path.append(&path.value_at(frame));
            }
            ShapeNode::Polystar { is_star, position, points, inner_radius, outer_radius, inner_roundness, outer_roundness, rotation } => {
                let star = build_polystar_path(
                    *is_star,
                    position.value_at(frame),
                    points.value_at(frame),
                    inner_radius.value_at(frame),
                    outer_radius.value_at(frame),
                    inner_roundness.value_at(frame),
                    outer_roundness.value_at(frame),
                    rotation.value_at(frame),
                );
                acc_path.append(&star);
            }

            ShapeNode::RoundedCorner { radius } => {
                roundness_override = Some(radius.value_at(frame));
            }
            ShapeNode::OffsetPath { amount, join, .. } => {
                let offset = amount.value_at(frame);
                if offset.abs() > crate::geom::EPSILON {
                    acc_path = offset_path(&acc_path, offset, *join);
                }
            }

            ShapeNode::Trim { start, end, offset, simultaneous } => {
                let off = offset.value_at(frame) / 100.0;
                let b = (start.value_at(frame) / 100.0 + off).rem_euclid(1.0);
                let e = (end.value_at(frame) / 100.0 + off).rem_euclid(1.0);
                if let Some(trimmed) = acc_path.trim(b, e, *simultaneous) {
                    acc_path = trimmed;
                }
            }

            ShapeNode::Repeater { count, offset, start_opacity, end_opacity, position, anchor, scale, rotation, order_inverted } => {
                let n = count.value_at(frame).round().max(0.0) as i32;
                let unit: Vec<PaintId> = out.drain(..).collect();
                let off = offset.value_at(frame);
                let anchor = anchor.value_at(frame);
                let position = position.value_at(frame);
                let scale_pct = scale.value_at(frame);
                let rotation_deg = rotation.value_at(frame);
                let start_op = start_opacity.value_at(frame);
                let end_op = end_opacity.value_at(frame);

                for k in 0..n {
                    let index = if *order_inverted { n - 1 - k } else { k };
                    let step = index as f32 + off;

                    // Each copy is offset by `step` multiples of the
                    // per-repeat position/rotation and scaled by
                    // `scale_pct^step`, compounding like nested transforms.
                    let step_scale = Point::new((scale_pct.x / 100.0).powf(step), (scale_pct.y / 100.0).powf(step));
                    let mut m = Matrix::translation(Point::new(-anchor.x, -anchor.y));
                    m = m.post_mul(&Matrix::rotation(rotation_deg * step));
                    m = m.post_mul(&Matrix::scale(step_scale));
                    m = m.post_mul(&Matrix::translation(position * step));

                    let mut scene = Scene::default();
                    for id in &unit {
                        if let Some(kind) = arena.get(*id).map(|n| n.kind.clone()) {
                            let copy_id = arena.insert(kind);
                            if let Some(src) = arena.get(*id) {
                                let (tr, op, bl) = (src.tr, src.opacity, src.blend);
                                if let Some(dst) = arena.get_mut(copy_id) {
                                    dst.tr = tr;
                                    dst.opacity = op;
                                    dst.blend = bl;
                                }
                            }
                            scene.push(copy_id);
                        }
                    }
                    let wrapper = arena.insert(PaintKind::Scene(scene));
                    arena.set_transform(wrapper, m);
                    let t = if n > 1 { k as f32 / (n as f32 - 1.0) } else { 0.0 };
                    arena.set_opacity(wrapper, pct_to_u8(start_op + (end_op - start_op) * t));
                    out.push(wrapper);
                }
            }

            ShapeNode::SolidFill { color, opacity, rule } => {
                let color = color_with_opacity(color.value_at(frame), opacity.value_at(frame));
                let shape = RenderShape {
                    path: acc_path.clone(),
                    color,
                    rule: to_path_fill_rule(*rule),
                    ..Default::default()
                };
                out.push(arena.insert(PaintKind::Shape(shape)));
            }

            ShapeNode::SolidStroke { color, opacity, width, dash, dash_offset, cap, join, miter_limit } => {
                let color = color_with_opacity(color.value_at(frame), opacity.value_at(frame));
                let stroke = RenderStroke {
                    width: width.value_at(frame),
                    color,
                    dash: Dash {
                        pattern: dash.iter().map(|p| p.value_at(frame)).collect(),
                        offset: dash_offset.value_at(frame),
                    },
                    miterlimit: *miter_limit,
                    cap: *cap,
                    join: *join,
                    ..Default::default()
                };
                let shape = RenderShape { path: acc_path.clone(), stroke: Some(stroke), ..Default::default() };
                out.push(arena.insert(PaintKind::Shape(shape)));
            }

            ShapeNode::GradientFill { gradient, rule } => {
                let fill = gradient_from_spec(gradient, frame);
                let shape = RenderShape {
                    path: acc_path.clone(),
                    fill: Some(fill),
                    rule: to_path_fill_rule(*rule),
                    ..Default::default()
                };
                out.push(arena.insert(PaintKind::Shape(shape)));
            }

            ShapeNode::GradientStroke { gradient, width, dash, dash_offset, cap, join, miter_limit } => {
                let fill = gradient_from_spec(gradient, frame);
                let stroke = RenderStroke {
                    width: width.value_at(frame),
                    fill: Some(fill),
                    dash: Dash {
                        pattern: dash.iter().map(|p| p.value_at(frame)).collect(),
                        offset: dash_offset.value_at(frame),
                    },
                    miterlimit: *miter_limit,
                    cap: *cap,
                    join: *join,
                    ..Default::default()
                };
                let shape = RenderShape { path: acc_path.clone(), stroke: Some(stroke), ..Default::default() };
                out.push(arena.insert(PaintKind::Shape(shape)));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sw::SwEngine;
    use crate::lottie::model::{Keyframe, Property};
    use crate::render::ColorSpace;

    fn empty_composition() -> Composition {
        Composition { width: 100, height: 100, start_frame: 0.0, end_frame: 60.0, frame_rate: 30.0, layers: Vec::new(), assets: Vec::new() }
    }

    fn solid_layer() -> Layer {
        Layer {
            id: 1,
            parent_id: None,
            kind: LayerKind::Solid,
            name: None,
            hidden: false,
            transform: LottieTransform::default(),
            in_frame: 0.0,
            out_frame: 60.0,
            start_frame: 0.0,
            time_stretch: 1.0,
            time_remap: None,
            blend: crate::render::BlendMethod::Normal,
            matte_type: MatteType::None,
            is_matte_source: false,
            width: 40.0,
            height: 40.0,
            solid_color: [255, 0, 0, 255],
            image_asset: None,
            precomp_ref: None,
            shapes: Vec::new(),
            text: None,
        }
    }

    struct BlockGlyphFont;

    impl crate::text::GlyphSource for BlockGlyphFont {
        fn units_per_em(&self) -> f32 {
            1000.0
        }

        fn glyph(&self, ch: char) -> Option<crate::text::Glyph> {
            if ch == ' ' {
                return Some(crate::text::Glyph { path: Path::new(), advance: 500.0 });
            }
            let mut path = Path::new();
            path.append_rect(0.0, 0.0, 500.0, 700.0, 0.0, 0.0, true);
            Some(crate::text::Glyph { path, advance: 600.0 })
        }
    }

    fn text_layer() -> Layer {
        let mut layer = solid_layer();
        layer.kind = LayerKind::Text;
        layer.text = Some(crate::lottie::model::TextDocument {
            text: "hi".to_string(),
            font_family: "Roboto".to_string(),
            font_size: 10.0,
            line_spacing: 1.0,
            color: [0, 0, 0, 255],
            box_size: None,
        });
        layer
    }

    #[test]
    fn text_layer_lays_out_glyphs_when_font_is_registered() {
        let mut comp = empty_composition();
        comp.layers.push(text_layer());
        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let builder = LottieBuilder::new();
        let mut fonts = FontRegistry::new();
        fonts.register("Roboto", std::sync::Arc::new(BlockGlyphFont));

        let root = builder.build(&mut arena, &comp, 0.0, &fonts);
        let root_node = arena.get(root).unwrap();
        let PaintKind::Scene(root_scene) = &root_node.kind else { panic!("expected scene") };
        let layer_wrapper = arena.get(root_scene.children[0]).unwrap();
        let PaintKind::Scene(wrapper_scene) = &layer_wrapper.kind else { panic!("expected scene") };
        let text_node = arena.get(wrapper_scene.children[0]).unwrap();
        let PaintKind::Scene(text_scene) = &text_node.kind else { panic!("expected text scene") };
        assert_eq!(text_scene.children.len(), 2);
    }

    #[test]
    fn text_layer_falls_back_to_a_flat_box_when_font_is_unregistered() {
        let mut comp = empty_composition();
        comp.layers.push(text_layer());
        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let builder = LottieBuilder::new();
        let fonts = FontRegistry::new();

        let root = builder.build(&mut arena, &comp, 0.0, &fonts);
        let root_node = arena.get(root).unwrap();
        let PaintKind::Scene(root_scene) = &root_node.kind else { panic!("expected scene") };
        let layer_wrapper = arena.get(root_scene.children[0]).unwrap();
        let PaintKind::Scene(wrapper_scene) = &layer_wrapper.kind else { panic!("expected scene") };
        let text_node = arena.get(wrapper_scene.children[0]).unwrap();
        assert!(matches!(text_node.kind, PaintKind::Shape(_)));
    }

    #[test]
    fn build_wraps_root_in_a_composition_sized_clip() {
        let mut comp = empty_composition();
        comp.layers.push(solid_layer());
        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let builder = LottieBuilder::new();
        let fonts = FontRegistry::new();
        let root = builder.build(&mut arena, &comp, 0.0, &fonts);
        let node = arena.get(root).unwrap();
        assert!(matches!(node.kind, PaintKind::Scene(_)));
        assert!(node.clipper.is_some());
    }

    #[test]
    fn animated_position_moves_the_shape_linearly() {
        let mut comp = empty_composition();
        let mut layer = solid_layer();
        layer.transform.position = Property::keyframed(vec![
            Keyframe::linear(0.0, Point::new(0.0, 0.0)),
            Keyframe::linear(60.0, Point::new(100.0, 0.0)),
        ]);
        comp.layers.push(layer);

        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let builder = LottieBuilder::new();
        let fonts = FontRegistry::new();

        for (frame, expected_x) in [(0.0, 0.0), (30.0, 50.0), (60.0, 100.0)] {
            let root = builder.build(&mut arena, &comp, frame, &fonts);
            let scene_node = arena.get(root).unwrap();
            let PaintKind::Scene(scene) = &scene_node.kind else { panic!("expected scene") };
            let layer_wrapper = arena.get(scene.children[0]).unwrap();
            assert!((layer_wrapper.tr.m.e13 - expected_x).abs() < 1e-3, "frame {frame}: {}", layer_wrapper.tr.m.e13);
        }
    }

    #[test]
    fn repeater_expands_into_n_opacity_stepped_copies() {
        let mut engine = SwEngine::new(64, 64, ColorSpace::Abgr8888);
        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let mut path = Path::new();
        path.append_rect(0.0, 0.0, 10.0, 10.0, 0.0, 0.0, true);
        let nodes = vec![
            ShapeNode::Rect { position: Property::constant(Point::new(5.0, 5.0)), size: Property::constant(Point::new(10.0, 10.0)), radius: Property::constant(0.0), clockwise: true },
            ShapeNode::SolidFill { color: Property::constant([255, 255, 255, 255]), opacity: Property::constant(100.0), rule: LottieFillRule::NonZero },
            ShapeNode::Repeater {
                count: Property::constant(3.0),
                offset: Property::constant(0.0),
                start_opacity: Property::constant(100.0),
                end_opacity: Property::constant(0.0),
                position: Property::constant(Point::new(20.0, 0.0)),
                anchor: Property::constant(Point::ZERO),
                scale: Property::constant(Point::new(100.0, 100.0)),
                rotation: Property::constant(0.0),
                order_inverted: false,
            },
        ];
        let out = build_group(&mut arena, &nodes, 0.0);
        assert_eq!(out.len(), 3);
        let _ = engine.sync();
    }
}
