//! Render-side shape data: the flattened form the backend actually draws,
//! as opposed to the retained paint graph in [`crate::paint`].

use crate::fill::Gradient;
use crate::path::{FillRule, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeCap {
    Butt,
    #[default]
    Square,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeJoin {
    #[default]
    Bevel,
    Round,
    Miter,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dash {
    pub pattern: Vec<f32>,
    pub offset: f32,
}

#[derive(Debug, Clone)]
pub struct RenderStroke {
    pub width: f32,
    pub color: [u8; 4],
    pub fill: Option<Gradient>,
    pub dash: Dash,
    pub miterlimit: f32,
    pub trim_begin: f32,
    pub trim_end: f32,
    pub trim_simultaneous: bool,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
    /// When true the stroke is rendered before the fill instead of after.
    pub first: bool,
}

impl Default for RenderStroke {
    fn default() -> Self {
        RenderStroke {
            width: 0.0,
            color: [0, 0, 0, 255],
            fill: None,
            dash: Dash::default(),
            miterlimit: 4.0,
            trim_begin: 0.0,
            trim_end: 1.0,
            trim_simultaneous: true,
            cap: StrokeCap::default(),
            join: StrokeJoin::default(),
            first: false,
        }
    }
}

impl RenderStroke {
    /// A trim range of `(0,1)` is the identity — nothing to clip.
    pub fn trim_valid(&self) -> bool {
        self.trim_begin != 0.0 || self.trim_end != 1.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderShape {
    pub path: Path,
    pub fill: Option<Gradient>,
    pub color: [u8; 4],
    pub stroke: Option<RenderStroke>,
    pub rule: FillRule,
}

impl RenderShape {
    pub fn stroke_width(&self) -> f32 {
        self.stroke.as_ref().map_or(0.0, |s| s.width)
    }

    pub fn stroke_first(&self) -> bool {
        self.stroke.as_ref().is_some_and(|s| s.first)
    }

    pub fn trim_path(&self) -> bool {
        self.stroke.as_ref().is_some_and(|s| s.trim_valid())
    }
}

/// Bitmask of what changed on a paint since it was last prepared by the
/// backend, so a `RenderMethod` can reuse cached geometry for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderUpdateFlag(pub u16);

impl RenderUpdateFlag {
    pub const NONE: Self = Self(0);
    pub const PATH: Self = Self(1);
    pub const COLOR: Self = Self(2);
    pub const GRADIENT: Self = Self(4);
    pub const STROKE: Self = Self(8);
    pub const TRANSFORM: Self = Self(16);
    pub const IMAGE: Self = Self(32);
    pub const GRADIENT_STROKE: Self = Self(64);
    pub const BLEND: Self = Self(128);
    pub const CLIP: Self = Self(256);
    pub const ALL: Self = Self(0xffff);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn none(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for RenderUpdateFlag {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for RenderUpdateFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Bitmask describing why an off-screen composite target is being acquired,
/// so a backend can skip unneeded buffers (e.g. no alpha channel if opacity
/// compositing isn't in play).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositionFlag(pub u8);

impl CompositionFlag {
    pub const INVALID: Self = Self(0);
    pub const OPACITY: Self = Self(1);
    pub const BLENDING: Self = Self(2);
    pub const MASKING: Self = Self(4);
    pub const POST_PROCESSING: Self = Self(8);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CompositionFlag {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CompositionFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Returns whether masking with `method` can only shrink the composited
/// region (`false`) or might expand it beyond the masked shape's own bounds
/// (`true`) — governs whether the mask region is intersected or unioned with
/// its target when computing the composite's dirty rect.
pub fn mask_region_merging(method: MaskMethod) -> bool {
    match method {
        MaskMethod::Alpha
        | MaskMethod::InverseAlpha
        | MaskMethod::Luma
        | MaskMethod::InverseLuma
        | MaskMethod::Subtract
        | MaskMethod::Intersect => false,
        MaskMethod::Add | MaskMethod::Difference | MaskMethod::Lighten | MaskMethod::Darken => true,
        MaskMethod::None => false,
    }
}

/// Integer bounding box in device pixels, min-inclusive/max-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderRegion {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl RenderRegion {
    pub fn valid(&self) -> bool {
        self.max_x > self.min_x && self.max_y > self.min_y
    }

    pub fn invalid(&self) -> bool {
        !self.valid()
    }

    pub fn x(&self) -> i32 {
        self.min_x
    }

    pub fn y(&self) -> i32 {
        self.min_y
    }

    pub fn w(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn h(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn intersect(lhs: RenderRegion, rhs: RenderRegion) -> RenderRegion {
        let mut ret = RenderRegion {
            min_x: lhs.min_x.max(rhs.min_x),
            min_y: lhs.min_y.max(rhs.min_y),
            max_x: lhs.max_x.min(rhs.max_x),
            max_y: lhs.max_y.min(rhs.max_y),
        };
        if ret.min_x > ret.max_x {
            ret.max_x = ret.min_x;
        }
        if ret.min_y > ret.max_y {
            ret.max_y = ret.min_y;
        }
        ret
    }

    pub fn add(&mut self, rhs: RenderRegion) {
        self.min_x = self.min_x.min(rhs.min_x);
        self.min_y = self.min_y.min(rhs.min_y);
        self.max_x = self.max_x.max(rhs.max_x);
        self.max_y = self.max_y.max(rhs.max_y);
    }

    pub fn contains(&self, rhs: &RenderRegion) -> bool {
        self.min_x <= rhs.min_x && self.max_x >= rhs.max_x && self.min_y <= rhs.min_y && self.max_y >= rhs.max_y
    }

    pub fn intersects(&self, rhs: &RenderRegion) -> bool {
        rhs.min_x < self.max_x && rhs.max_x > self.min_x && rhs.min_y < self.max_y && rhs.max_y > self.min_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Abgr8888,
    Abgr8888S,
    Argb8888,
    Argb8888S,
    Grayscale8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMethod {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Add,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMethod {
    #[default]
    None,
    Alpha,
    InverseAlpha,
    Luma,
    InverseLuma,
    Add,
    Subtract,
    Intersect,
    Difference,
    Lighten,
    Darken,
}

/// Post-processing effects applied to a scene's composited output.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEffect {
    GaussianBlur { sigma: f32, direction: u8, border: u8, quality: u8 },
    DropShadow { color: [u8; 4], angle: f32, distance: f32, sigma: f32, quality: u8 },
    Fill { color: [u8; 4] },
    Tint { black: [u8; 3], white: [u8; 3], intensity: f32 },
    Tritone { shadow: [u8; 3], midtone: [u8; 3], highlight: [u8; 3] },
}

#[derive(Debug, Clone)]
pub struct RenderSurface {
    pub data: Vec<u32>,
    pub stride: u32,
    pub w: u32,
    pub h: u32,
    pub cs: ColorSpace,
    pub premultiplied: bool,
}

impl RenderSurface {
    pub fn new(w: u32, h: u32, cs: ColorSpace) -> Self {
        RenderSurface { data: vec![0; (w * h) as usize], stride: w, w, h, cs, premultiplied: true }
    }
}
