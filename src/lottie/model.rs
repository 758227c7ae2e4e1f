//! The Lottie document model: keyframed properties, the layer tree, and the
//! shape-layer content tree. This is data only — [`super::builder`] walks it
//! into a rendered [`crate::scene::Scene`].

use crate::geom::Point;
use crate::render::{BlendMethod, MaskMethod, StrokeCap, StrokeJoin};

/// How a property extrapolates before its first keyframe / after its last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    None,
    InCycle,
    InPingPong,
    InOffset,
    InContinue,
}

/// One keyframe of a [`Property`]. `hold` freezes the value until the next
/// keyframe's frame number instead of interpolating toward it.
#[derive(Debug, Clone, Copy)]
pub struct Keyframe<T> {
    pub frame: f32,
    pub value: T,
    pub hold: bool,
    /// Cubic-bezier ease-out handle for the outgoing segment, in (time, value)
    /// fractional space, as Lottie's `o` field encodes it.
    pub out_tangent: Option<Point>,
    /// Cubic-bezier ease-in handle for the incoming segment (Lottie's `i`).
    pub in_tangent: Option<Point>,
}

impl<T> Keyframe<T> {
    pub fn linear(frame: f32, value: T) -> Self {
        Keyframe { frame, value, hold: false, out_tangent: None, in_tangent: None }
    }
}

/// Anything a [`Property`] can hold: lerp between two values, weighted by an
/// eased `[0,1]` factor.
pub trait Lerp: Copy + Default {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(self, to: Self, t: f32) -> Self {
        Point::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t))
    }
}

impl Lerp for [u8; 4] {
    fn lerp(self, to: Self, t: f32) -> Self {
        [
            crate::geom::lerp_u8(self[0], to[0], t),
            crate::geom::lerp_u8(self[1], to[1], t),
            crate::geom::lerp_u8(self[2], to[2], t),
            crate::geom::lerp_u8(self[3], to[3], t),
        ]
    }
}

/// A keyframed scalar/vector/color property, or a plain static value when
/// `frames` is empty — mirroring the source's `statical` shortcut.
#[derive(Debug, Clone)]
pub struct Property<T: Lerp> {
    pub frames: Vec<Keyframe<T>>,
    pub value: T,
    pub loop_in: LoopMode,
    pub loop_out: LoopMode,
}

impl<T: Lerp> Property<T> {
    pub fn constant(value: T) -> Self {
        Property { frames: Vec::new(), value, loop_in: LoopMode::None, loop_out: LoopMode::None }
    }

    pub fn keyframed(frames: Vec<Keyframe<T>>) -> Self {
        let value = match frames.first().or_else(|| frames.last()) {
            Some(k) => k.value,
            None => {
                tracing::warn!("property has no keyframes, falling back to default value");
                T::default()
            }
        };
        Property { frames, value, loop_in: LoopMode::None, loop_out: LoopMode::None }
    }

    pub fn is_static(&self) -> bool {
        self.frames.len() <= 1
    }

    /// Evaluates the property at `frame`, applying loop-mode extrapolation
    /// outside the keyframe range and a cubic ease curve inside it.
    pub fn value_at(&self, frame: f32) -> T {
        if self.frames.is_empty() {
            return self.value;
        }
        if self.frames.len() == 1 {
            return self.frames[0].value;
        }

        let first = self.frames.first().unwrap();
        let last = self.frames.last().unwrap();
        let span = last.frame - first.frame;

        let frame = if frame < first.frame {
            extrapolate(frame, first.frame, span, self.loop_in)
        } else if frame > last.frame {
            extrapolate(frame, first.frame, span, self.loop_out)
        } else {
            frame
        };

        let idx = match self.frames.binary_search_by(|k| k.frame.partial_cmp(&frame).unwrap()) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) if i >= self.frames.len() => self.frames.len() - 1,
            Err(i) => i - 1,
        };
        let a = &self.frames[idx];
        if idx + 1 >= self.frames.len() || a.hold {
            return a.value;
        }
        let b = &self.frames[idx + 1];
        let span = (b.frame - a.frame).max(crate::geom::EPSILON);
        let raw_t = ((frame - a.frame) / span).clamp(0.0, 1.0);
        let t = ease(raw_t, a.out_tangent, b.in_tangent);
        a.value.lerp(b.value, t)
    }
}

/// Folds `frame` back into `[first, first+span]` per a loop mode. `InOffset`
/// carries the net delta across the range forward each cycle; the others
/// fold the fractional phase without accumulating drift.
fn extrapolate(frame: f32, first: f32, span: f32, mode: LoopMode) -> f32 {
    if span <= 0.0 {
        return first;
    }
    let delta = frame - first;
    match mode {
        LoopMode::None => frame.clamp(first, first + span),
        LoopMode::InCycle | LoopMode::InOffset => {
            let phase = delta.rem_euclid(span);
            first + phase
        }
        LoopMode::InPingPong => {
            let period = 2.0 * span;
            let phase = delta.rem_euclid(period);
            first + if phase > span { period - phase } else { phase }
        }
        LoopMode::InContinue => frame.clamp(first, first + span),
    }
}

/// Applies a cubic-bezier ease curve defined by Lottie's `o`/`i` tangent
/// handles to a linear `[0,1]` time fraction, via bisection on the curve's
/// x(t) component (matches the CSS `cubic-bezier` evaluation shape).
fn ease(t: f32, out_tangent: Option<Point>, in_tangent: Option<Point>) -> f32 {
    let (Some(o), Some(i)) = (out_tangent, in_tangent) else {
        return t;
    };
    let x1 = o.x.clamp(0.0, 1.0);
    let x2 = 1.0 - i.x.clamp(0.0, 1.0);
    let y1 = o.y;
    let y2 = 1.0 - i.y;

    let bezier = |u: f32, p1: f32, p2: f32| -> f32 {
        let mu = 1.0 - u;
        3.0 * mu * mu * u * p1 + 3.0 * mu * u * u * p2 + u * u * u
    };

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut u = t;
    for _ in 0..20 {
        let x = bezier(u, x1, x2);
        if (x - t).abs() < 1e-4 {
            break;
        }
        if x < t {
            lo = u;
        } else {
            hi = u;
        }
        u = (lo + hi) * 0.5;
    }
    bezier(u, y1, y2)
}

pub type FloatProperty = Property<f32>;
pub type PointProperty = Property<Point>;
pub type ColorProperty = Property<[u8; 4]>;

/// A keyframed path. Unlike scalar/point/color properties this isn't
/// blanket-`Lerp`-able: morphing only makes sense between two paths with
/// matching command sequences, so interpolation falls back to holding the
/// bracketing keyframe's path when the shapes don't line up.
#[derive(Debug, Clone)]
pub struct PathProperty {
    pub frames: Vec<(f32, crate::path::Path)>,
    pub value: crate::path::Path,
}

impl PathProperty {
    pub fn constant(value: crate::path::Path) -> Self {
        PathProperty { frames: Vec::new(), value }
    }

    pub fn value_at(&self, frame: f32) -> crate::path::Path {
        if self.frames.is_empty() {
            return self.value.clone();
        }
        if self.frames.len() == 1 {
            return self.frames[0].1.clone();
        }
        let idx = self.frames.partition_point(|(f, _)| *f <= frame).saturating_sub(1);
        let (fa, a) = &self.frames[idx];
        if idx + 1 >= self.frames.len() {
            return a.clone();
        }
        let (fb, b) = &self.frames[idx + 1];
        if a.commands != b.commands || a.points.len() != b.points.len() {
            tracing::warn!(frame_a = *fa, frame_b = *fb, "path keyframes don't line up, holding the earlier one");
            return a.clone();
        }
        let span = (fb - fa).max(crate::geom::EPSILON);
        let t = ((frame - fa) / span).clamp(0.0, 1.0);
        let points = a.points.iter().zip(&b.points).map(|(pa, pb)| pa.lerp(*pb, t)).collect();
        crate::path::Path { commands: a.commands.clone(), points }
    }
}

/// A Lottie transform: anchored position/scale/rotation/opacity, composed as
/// `translate(position) * scale(scale) * rotate(rotation) * translate(-anchor)`.
#[derive(Debug, Clone)]
pub struct Transform {
    pub anchor: PointProperty,
    pub position: PointProperty,
    pub scale: PointProperty,
    pub rotation: FloatProperty,
    pub opacity: Property<f32>,
    pub auto_orient: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            anchor: Property::constant(Point::ZERO),
            position: Property::constant(Point::ZERO),
            scale: Property::constant(Point::new(100.0, 100.0)),
            rotation: Property::constant(0.0),
            opacity: Property::constant(100.0),
            auto_orient: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone)]
pub struct GradientStop {
    pub offset: FloatProperty,
    pub color: ColorProperty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Debug, Clone)]
pub struct GradientSpec {
    pub kind: GradientKind,
    pub start: PointProperty,
    pub end: PointProperty,
    pub opacity: FloatProperty,
    pub stops: Vec<GradientStop>,
}

/// One node of a shape layer's content tree (Lottie's `shapes` array).
#[derive(Debug, Clone)]
pub enum ShapeNode {
    Group { name: Option<String>, transform: Option<Transform>, children: Vec<ShapeNode> },
    Rect { position: PointProperty, size: PointProperty, radius: FloatProperty, clockwise: bool },
    Ellipse { position: PointProperty, size: PointProperty, clockwise: bool },
    Path { path: PathProperty, clockwise: bool },
    Polystar { is_star: bool, position: PointProperty, points: FloatProperty, inner_radius: FloatProperty, outer_radius: FloatProperty, inner_roundness: FloatProperty, outer_roundness: FloatProperty, rotation: FloatProperty },
    Trim { start: FloatProperty, end: FloatProperty, offset: FloatProperty, simultaneous: bool },
    Repeater { count: FloatProperty, offset: FloatProperty, start_opacity: FloatProperty, end_opacity: FloatProperty, position: PointProperty, anchor: PointProperty, scale: PointProperty, rotation: FloatProperty, order_inverted: bool },
    RoundedCorner { radius: FloatProperty },
    OffsetPath { amount: FloatProperty, miter_limit: f32, join: StrokeJoin },
    SolidFill { color: ColorProperty, opacity: FloatProperty, rule: FillRule },
    SolidStroke { color: ColorProperty, opacity: FloatProperty, width: FloatProperty, dash: Vec<FloatProperty>, dash_offset: FloatProperty, cap: StrokeCap, join: StrokeJoin, miter_limit: f32 },
    GradientFill { gradient: GradientSpec, rule: FillRule },
    GradientStroke { gradient: GradientSpec, width: FloatProperty, dash: Vec<FloatProperty>, dash_offset: FloatProperty, cap: StrokeCap, join: StrokeJoin, miter_limit: f32 },
}

impl ShapeNode {
    pub fn hidden(&self) -> bool {
        false
    }
}

/// What kind of matte composite a layer immediately above acts as for this
/// layer (Lottie `tt`); maps onto [`MaskMethod`] when building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatteType {
    #[default]
    None,
    Alpha,
    InvAlpha,
    Luma,
    InvLuma,
}

impl MatteType {
    pub fn to_mask_method(self) -> Option<MaskMethod> {
        match self {
            MatteType::None => None,
            MatteType::Alpha => Some(MaskMethod::Alpha),
            MatteType::InvAlpha => Some(MaskMethod::InverseAlpha),
            MatteType::Luma => Some(MaskMethod::Luma),
            MatteType::InvLuma => Some(MaskMethod::InverseLuma),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerKind {
    Precomp,
    Solid,
    Image,
    #[default]
    Null,
    Shape,
    Text,
}

#[derive(Debug, Clone)]
pub struct TextDocument {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub line_spacing: f32,
    pub color: [u8; 4],
    pub box_size: Option<(f32, f32)>,
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub kind: LayerKind,
    pub name: Option<String>,
    pub hidden: bool,
    pub transform: Transform,
    pub in_frame: f32,
    pub out_frame: f32,
    pub start_frame: f32,
    pub time_stretch: f32,
    pub time_remap: Option<FloatProperty>,
    pub blend: BlendMethod,
    pub matte_type: MatteType,
    /// Set by the builder once matte/target layers have been paired, not by
    /// the parser: `true` when this layer is consumed as another's matte
    /// source and must not also be rendered in normal z-order.
    pub is_matte_source: bool,
    pub width: f32,
    pub height: f32,
    pub solid_color: [u8; 4],
    pub image_asset: Option<String>,
    pub precomp_ref: Option<String>,
    pub shapes: Vec<ShapeNode>,
    pub text: Option<TextDocument>,
}

impl Layer {
    pub fn visible_at(&self, frame: f32) -> bool {
        !self.hidden && frame >= self.in_frame && frame <= self.out_frame
    }
}

/// A referenced asset: either a precomposition's own layer list, or an
/// image's pixel surface.
#[derive(Debug, Clone)]
pub enum Asset {
    Precomp { id: String, layers: Vec<Layer> },
    Image { id: String, surface: crate::render::RenderSurface },
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub width: u32,
    pub height: u32,
    pub start_frame: f32,
    pub end_frame: f32,
    pub frame_rate: f32,
    pub layers: Vec<Layer>,
    pub assets: Vec<Asset>,
}

impl Composition {
    pub fn frame_count(&self) -> f32 {
        self.end_frame - self.start_frame
    }

    pub fn duration_secs(&self) -> f32 {
        self.frame_count() / self.frame_rate
    }

    pub fn clamp_frame(&self, frame: f32) -> f32 {
        frame.clamp(self.start_frame, self.end_frame)
    }

    pub fn precomp(&self, ref_id: &str) -> Option<&[Layer]> {
        self.assets.iter().find_map(|a| match a {
            Asset::Precomp { id, layers } if id == ref_id => Some(layers.as_slice()),
            _ => None,
        })
    }

    pub fn image(&self, ref_id: &str) -> Option<&crate::render::RenderSurface> {
        self.assets.iter().find_map(|a| match a {
            Asset::Image { id, surface } if id == ref_id => Some(surface),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_property_ignores_frame() {
        let p = Property::constant(42.0f32);
        assert_eq!(p.value_at(0.0), 42.0);
        assert_eq!(p.value_at(1000.0), 42.0);
    }

    #[test]
    fn keyframed_property_interpolates_linearly_without_tangents() {
        let p = Property::keyframed(vec![Keyframe::linear(0.0, 0.0f32), Keyframe::linear(60.0, 100.0)]);
        assert_eq!(p.value_at(0.0), 0.0);
        assert_eq!(p.value_at(60.0), 100.0);
        assert!((p.value_at(30.0) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn hold_keyframe_freezes_value_until_next() {
        let mut p = Property::keyframed(vec![Keyframe::linear(0.0, 1.0f32), Keyframe::linear(60.0, 2.0)]);
        p.frames[0].hold = true;
        assert_eq!(p.value_at(30.0), 1.0);
    }

    #[test]
    fn in_cycle_loop_wraps_past_the_last_keyframe() {
        let mut p = Property::keyframed(vec![Keyframe::linear(0.0, 0.0f32), Keyframe::linear(60.0, 100.0)]);
        p.loop_out = LoopMode::InCycle;
        assert!((p.value_at(70.0) - p.value_at(10.0)).abs() < 1e-3);
    }
}
