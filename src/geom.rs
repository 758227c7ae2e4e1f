//! Geometry primitives for the Vectos library.
//!
//! This module provides the point, matrix, line and cubic Bézier types that
//! everything else in the crate builds on. Matrix composition follows the
//! row-vector convention: a [`Point`] is transformed by post-multiplying it
//! against a [`Matrix`].

/// Tolerance used for scalar/matrix comparisons (radian detection, zero
/// checks). Screen-space path trimming uses the coarser [`PATH_EPSILON`]
/// instead, since it operates on accumulated arc-length in device units.
pub const EPSILON: f32 = 1.0e-6;

/// Tolerance used when comparing arc-length positions during path trimming.
pub const PATH_EPSILON: f32 = 1.0e-4;

/// Kappa: the cubic-Bézier control-point offset that best approximates a
/// quarter circle of unit radius.
pub const PATH_KAPPA: f32 = 0.552284;

const PI: f32 = std::f32::consts::PI;
const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

#[inline]
pub fn zero(a: f32) -> bool {
    a.abs() <= EPSILON
}

#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    zero(a - b)
}

/// A 2D point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length2(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Approximate distance to `other` using the alpha-max-plus-beta-min
    /// algorithm (`max + 0.375 * min`). Error stays under 7%; used in inner
    /// loops where an exact `sqrt` would dominate the cost.
    #[inline]
    pub fn approx_dist(self, other: Point) -> f32 {
        let dx = (other.x - self.x).abs();
        let dy = (other.y - self.y).abs();
        if dx > dy {
            dx + dy * 0.375
        } else {
            dy + dx * 0.375
        }
    }

    #[inline]
    pub fn dist(self, other: Point) -> f32 {
        (other - self).length()
    }

    #[inline]
    pub fn dot(self, rhs: Point) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    #[inline]
    pub fn cross(self, rhs: Point) -> f32 {
        self.x * rhs.y - rhs.x * self.y
    }

    /// Unit-length direction from `self` to `other`, or `None` if they
    /// coincide.
    #[inline]
    pub fn direction_to(self, other: Point) -> Option<Point> {
        let d = other - self;
        let len = d.length();
        if len <= EPSILON {
            None
        } else {
            Some(Point::new(d.x / len, d.y / len))
        }
    }

    #[inline]
    pub fn normalize(&mut self) {
        let len = self.length();
        if len > EPSILON {
            self.x /= len;
            self.y /= len;
        }
    }

    /// The left-hand normal of a direction vector: `(-y, x)`.
    #[inline]
    pub fn normal(self) -> Point {
        Point::new(-self.y, self.x)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        zero(self.x) && zero(self.y)
    }

    #[inline]
    pub fn min(self, rhs: Point) -> Point {
        Point::new(self.x.min(rhs.x), self.y.min(rhs.y))
    }

    #[inline]
    pub fn max(self, rhs: Point) -> Point {
        Point::new(self.x.max(rhs.x), self.y.max(rhs.y))
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Point;
    #[inline]
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Orientation of three points, used by the stroker to pick a join's arc
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Linear,
    Clockwise,
    CounterClockwise,
}

pub fn orientation(p1: Point, p2: Point, p3: Point) -> Orientation {
    let val = (p2 - p1).cross(p3 - p1);
    if zero(val) {
        Orientation::Linear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// A 3x3 affine matrix in row-major form (the bottom row is implicitly
/// `[0, 0, 1]` for every matrix the engine constructs, but is tracked
/// explicitly to mirror the source layout).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub e11: f32,
    pub e12: f32,
    pub e13: f32,
    pub e21: f32,
    pub e22: f32,
    pub e23: f32,
    pub e31: f32,
    pub e32: f32,
    pub e33: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        e11: 1.0,
        e12: 0.0,
        e13: 0.0,
        e21: 0.0,
        e22: 1.0,
        e23: 0.0,
        e31: 0.0,
        e32: 0.0,
        e33: 1.0,
    };

    pub fn translation(p: Point) -> Self {
        let mut m = Self::IDENTITY;
        m.e13 = p.x;
        m.e23 = p.y;
        m
    }

    pub fn scale(p: Point) -> Self {
        let mut m = Self::IDENTITY;
        m.e11 = p.x;
        m.e22 = p.y;
        m
    }

    pub fn rotation(degree: f32) -> Self {
        let radian = degree * (PI / 180.0);
        let (s, c) = radian.sin_cos();
        Matrix {
            e11: c,
            e12: -s,
            e13: 0.0,
            e21: s,
            e22: c,
            e23: 0.0,
            e31: 0.0,
            e32: 0.0,
            e33: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Matrix multiplication `self * rhs` (applies `self` first, then `rhs`,
    /// under row-vector post-multiplication: `p * self * rhs`).
    pub fn post_mul(&self, rhs: &Matrix) -> Matrix {
        Matrix {
            e11: self.e11 * rhs.e11 + self.e12 * rhs.e21 + self.e13 * rhs.e31,
            e12: self.e11 * rhs.e12 + self.e12 * rhs.e22 + self.e13 * rhs.e32,
            e13: self.e11 * rhs.e13 + self.e12 * rhs.e23 + self.e13 * rhs.e33,
            e21: self.e21 * rhs.e11 + self.e22 * rhs.e21 + self.e23 * rhs.e31,
            e22: self.e21 * rhs.e12 + self.e22 * rhs.e22 + self.e23 * rhs.e32,
            e23: self.e21 * rhs.e13 + self.e22 * rhs.e23 + self.e23 * rhs.e33,
            e31: self.e31 * rhs.e11 + self.e32 * rhs.e21 + self.e33 * rhs.e31,
            e32: self.e31 * rhs.e12 + self.e32 * rhs.e22 + self.e33 * rhs.e32,
            e33: self.e31 * rhs.e13 + self.e32 * rhs.e23 + self.e33 * rhs.e33,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            p.x * self.e11 + p.y * self.e12 + self.e13,
            p.x * self.e21 + p.y * self.e22 + self.e23,
        )
    }

    /// Transforms a vector (ignores translation).
    pub fn transform_vector(&self, p: Point) -> Point {
        Point::new(p.x * self.e11 + p.y * self.e12, p.x * self.e21 + p.y * self.e22)
    }

    pub fn determinant(&self) -> f32 {
        self.e11 * (self.e22 * self.e33 - self.e23 * self.e32)
            - self.e12 * (self.e21 * self.e33 - self.e23 * self.e31)
            + self.e13 * (self.e21 * self.e32 - self.e22 * self.e31)
    }

    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.determinant();
        if zero(det) {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Matrix {
            e11: (self.e22 * self.e33 - self.e23 * self.e32) * inv_det,
            e12: (self.e13 * self.e32 - self.e12 * self.e33) * inv_det,
            e13: (self.e12 * self.e23 - self.e13 * self.e22) * inv_det,
            e21: (self.e23 * self.e31 - self.e21 * self.e33) * inv_det,
            e22: (self.e11 * self.e33 - self.e13 * self.e31) * inv_det,
            e23: (self.e13 * self.e21 - self.e11 * self.e23) * inv_det,
            e31: (self.e21 * self.e32 - self.e22 * self.e31) * inv_det,
            e32: (self.e12 * self.e31 - self.e11 * self.e32) * inv_det,
            e33: (self.e11 * self.e22 - self.e12 * self.e21) * inv_det,
        })
    }

    /// Absolute rotation angle, in radians, derived from the matrix's first
    /// column.
    pub fn radian(&self) -> f32 {
        self.e21.atan2(self.e11).abs()
    }

    /// Whether the matrix only rotates by 0, 90 or 180 degrees (no
    /// arbitrary-angle rotation component), used by the fast-track
    /// rectangle-clip/mask optimisation.
    pub fn right_angle(&self) -> bool {
        let r = self.radian();
        zero(r) || zero(r - HALF_PI) || zero(r - PI)
    }

    pub fn skewed(&self) -> bool {
        !zero(self.e21 + self.e12)
    }

    pub fn uniform_scale(&self) -> f32 {
        (self.e11 * self.e11 + self.e21 * self.e21).sqrt()
    }

    pub fn scale2(&self) -> Point {
        Point::new(
            (self.e11 * self.e11 + self.e21 * self.e21).sqrt(),
            (self.e12 * self.e12 + self.e22 * self.e22).sqrt(),
        )
    }

    pub fn translation_part(&self) -> Point {
        Point::new(self.e13, self.e23)
    }
}

impl std::ops::Mul for Matrix {
    type Output = Matrix;
    #[inline]
    fn mul(self, rhs: Matrix) -> Matrix {
        self.post_mul(&rhs)
    }
}

/// A line segment, used by path trimming and the stroker's fast path for
/// straight edges.
#[derive(Debug, Clone, Copy)]
pub struct Line {
    pub pt1: Point,
    pub pt2: Point,
}

impl Line {
    pub fn new(pt1: Point, pt2: Point) -> Self {
        Self { pt1, pt2 }
    }

    pub fn length(&self) -> f32 {
        self.pt1.dist(self.pt2)
    }

    /// Splits the line at arc-length fraction `at` into two segments meeting
    /// at the interpolated point.
    pub fn split(&self, at: f32) -> (Line, Line) {
        let mid = Point::new(
            self.pt1.x + (self.pt2.x - self.pt1.x) * at,
            self.pt1.y + (self.pt2.y - self.pt1.y) * at,
        );
        (Line::new(self.pt1, mid), Line::new(mid, self.pt2))
    }
}

/// An axis-aligned bounding box in floating point, used while computing
/// bounds before they are rounded out to an integer [`crate::render::RenderRegion`].
#[derive(Debug, Clone, Copy)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            min: Point::new(f32::MAX, f32::MAX),
            max: Point::new(f32::MIN, f32::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn include(&mut self, p: Point) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// A cubic Bézier curve.
#[derive(Debug, Clone, Copy)]
pub struct CubicBezier {
    pub start: Point,
    pub ctrl1: Point,
    pub ctrl2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn new(start: Point, ctrl1: Point, ctrl2: Point, end: Point) -> Self {
        Self { start, ctrl1, ctrl2, end }
    }

    /// Evaluates the curve at parametric `t` using de Casteljau's algorithm.
    pub fn at(&self, t: f32) -> Point {
        let ab = lerp_pt(self.start, self.ctrl1, t);
        let bc = lerp_pt(self.ctrl1, self.ctrl2, t);
        let cd = lerp_pt(self.ctrl2, self.end, t);
        let abc = lerp_pt(ab, bc, t);
        let bcd = lerp_pt(bc, cd, t);
        lerp_pt(abc, bcd, t)
    }

    /// Splits into two cubics meeting at `B(t)` via de Casteljau.
    pub fn split(&self, t: f32) -> (CubicBezier, CubicBezier) {
        let ab = lerp_pt(self.start, self.ctrl1, t);
        let bc = lerp_pt(self.ctrl1, self.ctrl2, t);
        let cd = lerp_pt(self.ctrl2, self.end, t);
        let abc = lerp_pt(ab, bc, t);
        let bcd = lerp_pt(bc, cd, t);
        let abcd = lerp_pt(abc, bcd, t);
        (
            CubicBezier::new(self.start, ab, abc, abcd),
            CubicBezier::new(abcd, bcd, cd, self.end),
        )
    }

    /// Adaptive-subdivision arc length: recurse while the control-polygon
    /// length disagrees with the chord length by more than [`EPSILON`],
    /// otherwise return the chord length. Matches the source's termination
    /// rule exactly so degenerate/near-linear curves don't recurse forever.
    pub fn length(&self) -> f32 {
        let poly = self.start.approx_dist(self.ctrl1)
            + self.ctrl1.approx_dist(self.ctrl2)
            + self.ctrl2.approx_dist(self.end);
        let chord = self.start.approx_dist(self.end);
        if (poly - chord).abs() > EPSILON {
            let (left, right) = self.split(0.5);
            left.length() + right.length()
        } else {
            poly
        }
    }

    /// Finds the parametric `t` at which the accumulated arc length from
    /// `start` equals `at` (given the curve's total `length`), via repeated
    /// bisection on the length of the left sub-curve.
    pub fn t_at_length(&self, at: f32, total_length: f32) -> f32 {
        if at >= total_length {
            return 1.0;
        }
        if at <= 0.0 {
            return 0.0;
        }
        let mut lo = 0.0f32;
        let mut hi = 1.0f32;
        let mut t = 0.5f32;
        for _ in 0..32 {
            let (left, _right) = self.split(t);
            let len = left.length();
            if (len - at).abs() < EPSILON {
                break;
            }
            if len < at {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }

    /// Extrema-based bounding box: solves the derivative quadratics for x
    /// and y separately and folds the roots (plus the endpoints) into
    /// `bbox`.
    pub fn bounds(&self, bbox: &mut BBox) {
        bbox.include(self.start);
        bbox.include(self.end);
        for axis in 0..2 {
            let p0 = axis_of(self.start, axis);
            let p1 = axis_of(self.ctrl1, axis);
            let p2 = axis_of(self.ctrl2, axis);
            let p3 = axis_of(self.end, axis);
            // derivative of the cubic Bernstein polynomial: At^2 + Bt + C
            let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
            let b = 2.0 * (p0 - 2.0 * p1 + p2);
            let c = p1 - p0;
            for t in quadratic_roots(a, b, c) {
                if (0.0..=1.0).contains(&t) {
                    let pt = self.at(t);
                    bbox.include(pt);
                }
            }
        }
    }

    /// Piecewise-linear step count proportional to on-screen arc length,
    /// used by the stroker when flattening curves.
    pub fn segments(&self) -> u32 {
        let len = self.length();
        ((len / 3.0).sqrt().ceil() as u32).max(2)
    }

    pub fn transform(&self, m: &Matrix) -> CubicBezier {
        CubicBezier::new(
            m.transform_point(self.start),
            m.transform_point(self.ctrl1),
            m.transform_point(self.ctrl2),
            m.transform_point(self.end),
        )
    }
}

/// Step count for a circular arc of `radius` sweeping `sweep` radians, using
/// the same `sqrt(len/3)` heuristic as [`CubicBezier::segments`] applied to
/// the arc's own length — used by the stroker's round caps/joins, where
/// there's no literal control cage to measure, only a radius and a sweep.
pub fn arc_segments(radius: f32, sweep: f32) -> u32 {
    let len = radius.abs() * sweep.abs();
    ((len / 3.0).sqrt().ceil() as u32).max(4)
}

fn axis_of(p: Point, axis: u8) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

fn quadratic_roots(a: f32, b: f32, c: f32) -> smallvec::SmallVec<[f32; 2]> {
    let mut roots = smallvec::SmallVec::new();
    if zero(a) {
        if !zero(b) {
            roots.push(-c / b);
        }
        return roots;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return roots;
    }
    let sq = disc.sqrt();
    roots.push((-b + sq) / (2.0 * a));
    roots.push((-b - sq) / (2.0 * a));
    roots
}

#[inline]
fn lerp_pt(a: Point, b: Point, t: f32) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Generic linear interpolation, used throughout fills, Lottie keyframes and
/// stroking.
#[inline]
pub fn lerp<T>(start: T, end: T, t: f32) -> T
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<f32, Output = T>,
{
    start + (end - start) * t
}

pub fn lerp_u8(start: u8, end: u8, t: f32) -> u8 {
    (start as f32 + (end as f32 - start as f32) * t).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_points() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(Matrix::IDENTITY.transform_point(p), p);
    }

    #[test]
    fn inverse_undoes_transform() {
        let m = Matrix::translation(Point::new(5.0, -2.0)).post_mul(&Matrix::rotation(37.0));
        let inv = m.inverse().unwrap();
        let p = Point::new(12.0, -7.0);
        let back = inv.transform_point(m.transform_point(p));
        assert!((back.x - p.x).abs() < 1e-3);
        assert!((back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn bezier_length_matches_straight_chord() {
        let b = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        );
        assert!((b.length() - 30.0).abs() < 1e-2);
    }

    #[test]
    fn bezier_split_meets_at_t() {
        let b = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );
        let (left, right) = b.split(0.5);
        assert!((left.end.x - b.at(0.5).x).abs() < 1e-4);
        assert_eq!(left.end.x, right.start.x);
        assert_eq!(left.end.y, right.start.y);
    }

    #[test]
    fn right_angle_detection() {
        assert!(Matrix::rotation(90.0).right_angle());
        assert!(!Matrix::rotation(37.0).right_angle());
    }
}
