//! Picture: a loaded vector subtree (SVG/Lottie) or a bitmap, fitted into a
//! target `(w, h)` box by uniform scale-and-center. The two content kinds
//! are mutually exclusive — a picture is never both.

use crate::geom::Matrix;
use crate::paint::PaintId;
use crate::render::RenderSurface;

#[derive(Debug, Clone)]
pub enum PictureContent {
    /// Root of a vector subtree already living in the same `PaintArena`.
    Vector(PaintId),
    Bitmap(RenderSurface),
}

#[derive(Debug, Clone)]
pub struct Picture {
    pub content: PictureContent,
    /// Target display size. `(0, 0)` means "use the content's natural size".
    pub w: f32,
    pub h: f32,
    /// Natural size of the loaded content, used to compute the fit scale.
    pub natural_w: f32,
    pub natural_h: f32,
}

impl Picture {
    pub fn vector(root: PaintId, natural_w: f32, natural_h: f32) -> Self {
        Picture { content: PictureContent::Vector(root), w: 0.0, h: 0.0, natural_w, natural_h }
    }

    pub fn bitmap(surface: RenderSurface) -> Self {
        let (natural_w, natural_h) = (surface.w as f32, surface.h as f32);
        Picture { content: PictureContent::Bitmap(surface), w: 0.0, h: 0.0, natural_w, natural_h }
    }

    pub fn size(&mut self, w: f32, h: f32) {
        self.w = w;
        self.h = h;
    }

    /// Uniform scale that fits the natural size into the target box without
    /// distortion, followed by a translation that centers it — the same
    /// `min(w/vw, h/vh)` fit the source uses for viewBox-driven resizing,
    /// generalized here with explicit centering since the target box is
    /// rarely the same aspect ratio as the content.
    pub fn fit_transform(&self) -> Matrix {
        if self.w <= 0.0 || self.h <= 0.0 || self.natural_w <= 0.0 || self.natural_h <= 0.0 {
            return Matrix::IDENTITY;
        }
        let sx = self.w / self.natural_w;
        let sy = self.h / self.natural_h;
        let scale = sx.min(sy);
        let scaled_w = self.natural_w * scale;
        let scaled_h = self.natural_h * scale;
        let tx = (self.w - scaled_w) * 0.5;
        let ty = (self.h - scaled_h) * 0.5;
        Matrix { e11: scale, e12: 0.0, e13: tx, e21: 0.0, e22: scale, e23: ty, e31: 0.0, e32: 0.0, e33: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_transform_is_identity_without_a_target_size() {
        let pic = Picture::vector(PaintId(0), 100.0, 50.0);
        assert_eq!(pic.fit_transform(), Matrix::IDENTITY);
    }

    #[test]
    fn fit_transform_centers_narrower_content() {
        let mut pic = Picture::vector(PaintId(0), 100.0, 100.0);
        pic.size(200.0, 100.0);
        let m = pic.fit_transform();
        assert!((m.e11 - 1.0).abs() < 1e-6);
        assert!((m.e13 - 50.0).abs() < 1e-6);
    }
}
