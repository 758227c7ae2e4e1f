//! Hand-rolled stroke tessellator: expands a [`RenderShape`]'s stroke into a
//! triangle mesh. Distinct from the fill path (which the backend tessellates
//! with `lyon`) because stroke geometry needs explicit join/cap control that
//! a generic fill tessellator doesn't expose.

use crate::geom::{self, CubicBezier, Matrix, Point};
use crate::path::{Path, PathCommand};
use crate::render::{Dash, RenderRegion, RenderShape, RenderStroke, StrokeCap, StrokeJoin};

#[derive(Debug, Clone, Default)]
pub struct StrokeMesh {
    pub vertices: Vec<Point>,
    pub indices: Vec<u32>,
    pub bounds: RenderRegion,
}

impl StrokeMesh {
    fn push_tri(&mut self, a: Point, b: Point, c: Point) {
        let base = self.vertices.len() as u32;
        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
        for p in [a, b, c] {
            self.bounds.min_x = self.bounds.min_x.min(p.x.floor() as i32);
            self.bounds.min_y = self.bounds.min_y.min(p.y.floor() as i32);
            self.bounds.max_x = self.bounds.max_x.max(p.x.ceil() as i32);
            self.bounds.max_y = self.bounds.max_y.max(p.y.ceil() as i32);
        }
    }

    fn push_quad(&mut self, a: Point, b: Point, c: Point, d: Point) {
        self.push_tri(a, b, c);
        self.push_tri(a, c, d);
    }
}

/// Walks `path`'s arc length alternately emitting and skipping according to
/// `dash.pattern`, starting offset by `dash.offset`. Produces a new path made
/// of disjoint `MoveTo`-started "on" subpaths.
pub fn expand_dash(path: &Path, dash: &Dash) -> Path {
    if dash.pattern.is_empty() || dash.pattern.iter().all(|&d| d <= 0.0) {
        return path.clone();
    }

    let cycle: f32 = dash.pattern.iter().sum();
    if cycle <= crate::geom::EPSILON {
        return path.clone();
    }

    let mut out = Path::new();
    for sub in split_subpaths(path) {
        let total = path_len(&sub);
        if total <= crate::geom::EPSILON {
            continue;
        }

        let mut offset = dash.offset.rem_euclid(cycle);
        let mut idx = 0usize;
        let mut on = true;
        while offset > dash.pattern[idx] {
            offset -= dash.pattern[idx];
            idx = (idx + 1) % dash.pattern.len();
            on = !on;
        }
        let mut remaining_in_seg = dash.pattern[idx] - offset;

        let mut walked = 0.0f32;
        let mut pen_down = false;
        while walked < total {
            let step = remaining_in_seg.min(total - walked);
            if on && step > crate::geom::EPSILON {
                let (a, b) = (walked, walked + step);
                append_arc_range(&sub, total, a, b, &mut out, &mut pen_down);
            } else {
                pen_down = false;
            }
            walked += step;
            remaining_in_seg -= step;
            if remaining_in_seg <= crate::geom::EPSILON {
                idx = (idx + 1) % dash.pattern.len();
                remaining_in_seg = dash.pattern[idx];
                on = !on;
                pen_down = false;
            }
        }
    }
    out
}

fn split_subpaths(path: &Path) -> Vec<Path> {
    let mut out = Vec::new();
    let mut cur = Path::new();
    let mut pts = path.points.iter().copied();
    for cmd in &path.commands {
        match cmd {
            PathCommand::MoveTo => {
                if !cur.commands.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                let p = pts.next().unwrap();
                cur.move_to(p.x, p.y);
            }
            PathCommand::LineTo => {
                let p = pts.next().unwrap();
                cur.line_to(p.x, p.y);
            }
            PathCommand::CubicTo => {
                let c1 = pts.next().unwrap();
                let c2 = pts.next().unwrap();
                let p = pts.next().unwrap();
                cur.cubic_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
            }
            PathCommand::Close => cur.close(),
        }
    }
    if !cur.commands.is_empty() {
        out.push(cur);
    }
    out
}

fn path_len(p: &Path) -> f32 {
    p.length()
}

/// Appends the portion of `sub`'s arc length in `[a, b]` onto `out`, using
/// `path.trim` scaled into fractions of `sub`'s own (already known) length.
fn append_arc_range(sub: &Path, total: f32, a: f32, b: f32, out: &mut Path, pen_down: &mut bool) {
    if total <= crate::geom::EPSILON {
        return;
    }
    let begin = (a / total).clamp(0.0, 1.0);
    let end = (b / total).clamp(0.0, 1.0);
    if let Some(piece) = sub.trim(begin, end, false) {
        out.append(&piece);
    }
    *pen_down = true;
}

/// Produces the triangle mesh for `shape`'s stroke in device space. `ctm`
/// transforms local path coordinates into device coordinates; the stroke
/// radius is scaled by the CTM's uniform scale factor.
pub fn tessellate_stroke(shape: &RenderShape, ctm: &Matrix) -> Option<StrokeMesh> {
    let stroke = shape.stroke.as_ref()?;
    if stroke.width <= crate::geom::EPSILON {
        return None;
    }

    let mut local = shape.path.clone();
    if !stroke.dash.pattern.is_empty() {
        local = expand_dash(&local, &stroke.dash);
    } else if stroke.trim_valid() {
        local = local.trim(stroke.trim_begin, stroke.trim_end, stroke.trim_simultaneous).unwrap_or(local);
    }

    let screen = local.transform(ctm);
    let r = stroke.width * 0.5 * ctm.uniform_scale();
    if r <= crate::geom::EPSILON {
        return None;
    }

    let mut mesh = StrokeMesh::default();
    for (polyline, closed) in flatten_subpaths(&screen) {
        stroke_polyline(&polyline, closed, r, stroke, &mut mesh);
    }
    Some(mesh)
}

/// Flattens each subpath of `path` into a polyline (cubics sampled via
/// [`CubicBezier::segments`]), paired with whether it ends in `Close`.
fn flatten_subpaths(path: &Path) -> Vec<(Vec<Point>, bool)> {
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

fn normal(dir: Point) -> Point {
    Point::new(-dir.y, dir.x)
}

fn stroke_polyline(pts: &[Point], closed: bool, r: f32, stroke: &RenderStroke, mesh: &mut StrokeMesh) {
    if pts.len() < 2 {
        return;
    }

    let mut pts = pts.to_vec();
    if closed && pts.first() != pts.last() {
        pts.push(pts[0]);
    }

    let mut first_dir: Option<Point> = None;
    let mut prev_dir: Option<Point> = None;
    let mut prev = pts[0];
    let first_pt = pts[0];

    for &curr in &pts[1..] {
        let d = curr - prev;
        let len = d.length();
        if len <= crate::geom::EPSILON {
            continue;
        }
        let dir = d * (1.0 / len);
        let n = normal(dir);

        mesh.push_quad(prev + n * r, curr + n * r, curr - n * r, prev - n * r);

        if let Some(pd) = prev_dir {
            emit_join(prev, pd, dir, r, stroke, mesh);
        } else {
            first_dir = Some(dir);
        }

        prev_dir = Some(dir);
        prev = curr;
    }

    if closed {
        if let (Some(pd), Some(fd)) = (prev_dir, first_dir) {
            emit_join(first_pt, pd, fd, r, stroke, mesh);
        }
    } else {
        if let Some(fd) = first_dir {
            emit_cap(first_pt, fd * -1.0, r, stroke.cap, mesh);
        }
        if let Some(pd) = prev_dir {
            emit_cap(prev, pd, r, stroke.cap, mesh);
        }
    }
}

fn emit_cap(p: Point, outward: Point, r: f32, cap: StrokeCap, mesh: &mut StrokeMesh) {
    let n = normal(outward);
    match cap {
        StrokeCap::Butt => {}
        StrokeCap::Square => {
            let ext = p + outward * r;
            mesh.push_quad(p + n * r, ext + n * r, ext - n * r, p - n * r);
        }
        StrokeCap::Round => {
            let steps = geom::arc_segments(r, std::f32::consts::PI);
            let start_angle = n.y.atan2(n.x);
            for i in 0..steps {
                let a0 = start_angle + std::f32::consts::PI * (i as f32) / steps as f32;
                let a1 = start_angle + std::f32::consts::PI * ((i + 1) as f32) / steps as f32;
                let v0 = p + Point::new(a0.cos(), a0.sin()) * r;
                let v1 = p + Point::new(a1.cos(), a1.sin()) * r;
                mesh.push_tri(p, v0, v1);
            }
        }
    }
}

fn emit_join(center: Point, prev_dir: Point, curr_dir: Point, r: f32, stroke: &RenderStroke, mesh: &mut StrokeMesh) {
    let n_prev = normal(prev_dir);
    let n_curr = normal(curr_dir);
    let cross = prev_dir.cross(curr_dir);
    if cross.abs() <= crate::geom::EPSILON {
        // A direction reversal (180° cusp) still needs a cap-like fan for round
        // joins, since the two offset edges land on opposite sides of `center`
        // rather than meeting at a point.
        if stroke.join == StrokeJoin::Round && prev_dir.dot(curr_dir) < 0.0 {
            emit_half_disc(center, n_prev, r, mesh);
        }
        return;
    }

    // Outer corners are on the side the turn bends away from.
    let (outer_prev, outer_curr) = if cross > 0.0 {
        (center - n_prev * r, center - n_curr * r)
    } else {
        (center + n_prev * r, center + n_curr * r)
    };

    match stroke.join {
        StrokeJoin::Bevel => {
            mesh.push_tri(outer_prev, outer_curr, center);
        }
        StrokeJoin::Round => {
            let a0 = (outer_prev.y - center.y).atan2(outer_prev.x - center.x);
            let mut a1 = (outer_curr.y - center.y).atan2(outer_curr.x - center.x);
            if cross > 0.0 && a1 > a0 {
                a1 -= std::f32::consts::TAU;
            } else if cross < 0.0 && a1 < a0 {
                a1 += std::f32::consts::TAU;
            }
            let steps = geom::arc_segments(r, (a1 - a0).abs());
            for i in 0..steps {
                let t0 = a0 + (a1 - a0) * (i as f32) / steps as f32;
                let t1 = a0 + (a1 - a0) * ((i + 1) as f32) / steps as f32;
                let v0 = center + Point::new(t0.cos(), t0.sin()) * r;
                let v1 = center + Point::new(t1.cos(), t1.sin()) * r;
                mesh.push_tri(center, v0, v1);
            }
        }
        StrokeJoin::Miter => {
            let sum = n_prev + n_curr;
            let sum_len2 = sum.length2();
            if sum_len2 <= crate::geom::EPSILON {
                mesh.push_tri(outer_prev, outer_curr, center);
                return;
            }
            let scale = 2.0 * r * r / sum_len2;
            let apex_offset = sum * scale;
            let apex = if cross > 0.0 { center - apex_offset } else { center + apex_offset };
            if apex.dist(center) >= stroke.miterlimit * r {
                mesh.push_tri(outer_prev, outer_curr, center);
            } else {
                mesh.push_tri(outer_prev, apex, center);
                mesh.push_tri(apex, outer_curr, center);
            }
        }
    }
}

/// A half-circle fan on the `n`-facing side of `center`, used for a round
/// join at a 180° direction reversal where the two offset edges land on
/// opposite sides instead of meeting at a corner.
fn emit_half_disc(center: Point, n: Point, r: f32, mesh: &mut StrokeMesh) {
    let steps = geom::arc_segments(r, std::f32::consts::PI);
    let start_angle = n.y.atan2(n.x);
    for i in 0..steps {
        let a0 = start_angle + std::f32::consts::PI * (i as f32) / steps as f32;
        let a1 = start_angle + std::f32::consts::PI * ((i + 1) as f32) / steps as f32;
        let v0 = center + Point::new(a0.cos(), a0.sin()) * r;
        let v1 = center + Point::new(a1.cos(), a1.sin()) * r;
        mesh.push_tri(center, v0, v1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderShape;

    fn straight_line_shape(width: f32) -> RenderShape {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(100.0, 0.0);
        RenderShape { path, stroke: Some(RenderStroke { width, ..Default::default() }), ..Default::default() }
    }

    #[test]
    fn zero_width_stroke_produces_no_mesh() {
        let shape = straight_line_shape(0.0);
        assert!(tessellate_stroke(&shape, &Matrix::IDENTITY).is_none());
    }

    #[test]
    fn straight_stroke_bounds_match_width() {
        let shape = straight_line_shape(4.0);
        let mesh = tessellate_stroke(&shape, &Matrix::IDENTITY).unwrap();
        assert!(mesh.bounds.min_y <= -1 && mesh.bounds.max_y >= 1);
        assert!(mesh.bounds.max_x >= 99);
    }

    #[test]
    fn round_cap_triangle_count_scales_with_radius() {
        let thin = straight_line_shape(2.0);
        let thick = {
            let mut s = straight_line_shape(200.0);
            if let Some(stroke) = &mut s.stroke {
                stroke.cap = StrokeCap::Round;
            }
            s
        };
        let mut thin = thin;
        thin.stroke.as_mut().unwrap().cap = StrokeCap::Round;

        let thin_mesh = tessellate_stroke(&thin, &Matrix::IDENTITY).unwrap();
        let thick_mesh = tessellate_stroke(&thick, &Matrix::IDENTITY).unwrap();
        assert!(
            thick_mesh.indices.len() > thin_mesh.indices.len(),
            "a thicker round cap should flatten into more triangles, not a fixed 4"
        );
    }

    #[test]
    fn round_join_emits_half_disc_on_reversal() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(50.0, 0.0);
        path.line_to(0.0, 0.0);
        let shape = RenderShape {
            path,
            stroke: Some(RenderStroke { width: 10.0, join: StrokeJoin::Round, ..Default::default() }),
            ..Default::default()
        };
        let mesh = tessellate_stroke(&shape, &Matrix::IDENTITY).unwrap();
        assert!(!mesh.indices.is_empty());
    }

    #[test]
    fn dash_expansion_drops_gaps() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(100.0, 0.0);
        let dash = Dash { pattern: vec![10.0, 10.0], offset: 0.0 };
        let dashed = expand_dash(&path, &dash);
        assert!(dashed.length() < path.length());
    }
}
