//! Scene: an ordered group of child paints, with its own blend/mask/effect
//! stack. Lives inside [`crate::paint::PaintNode`] as one [`crate::paint::PaintKind`] variant;
//! the arena in `paint.rs` walks `children` to update/render it.

use crate::paint::PaintId;
use crate::render::{BlendMethod, CompositionFlag, MaskMethod, RenderEffect, RenderRegion};

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub children: Vec<PaintId>,
    pub effects: Vec<RenderEffect>,
    /// Viewport captured at the start of the last `update`, used by `bounds`
    /// to clamp the merged children region the same way the backend's
    /// current scissor does.
    pub viewport: RenderRegion,
    /// Opacity to apply at composite time once `needs_composition` decided
    /// this scene must go through an intermediate buffer.
    pub composite_opacity: u8,
}

impl Scene {
    pub fn push(&mut self, id: PaintId) {
        self.children.push(id);
    }

    pub fn remove(&mut self, id: PaintId) {
        self.children.retain(|c| *c != id);
    }

    /// Decides whether this scene needs an intermediate composite buffer,
    /// and if so which purposes apply. A lone shape child never needs one
    /// on its own account — compositing would be redundant since the shape
    /// already carries its own color/opacity.
    pub fn needs_composition(
        &self,
        blend: BlendMethod,
        mask: MaskMethod,
        opacity: u8,
        single_child_is_shape: bool,
    ) -> CompositionFlag {
        if opacity == 0 || self.children.is_empty() {
            return CompositionFlag::INVALID;
        }

        let mut flag = CompositionFlag::INVALID;
        if !self.effects.is_empty() {
            flag |= CompositionFlag::POST_PROCESSING;
        }
        if mask != MaskMethod::None {
            flag |= CompositionFlag::MASKING;
        }
        if blend != BlendMethod::Normal {
            flag |= CompositionFlag::BLENDING;
        }

        if opacity == 255 {
            return flag;
        }
        if self.children.len() == 1 && single_child_is_shape {
            return flag;
        }

        flag | CompositionFlag::OPACITY
    }

    /// Merges `child_regions` (already-computed screen regions, one per
    /// child) and clamps to `self.viewport`, the same merge-then-clip order
    /// as the source.
    pub fn bounds(&self, child_regions: &[RenderRegion]) -> RenderRegion {
        if child_regions.is_empty() {
            return RenderRegion::default();
        }
        let mut merged = child_regions[0];
        for r in &child_regions[1..] {
            merged.add(*r);
        }
        RenderRegion::intersect(merged, self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_shape_at_full_opacity_skips_composition() {
        let scene = Scene { children: vec![PaintId(1)], ..Default::default() };
        let flag = scene.needs_composition(BlendMethod::Normal, MaskMethod::None, 255, true);
        assert_eq!(flag, CompositionFlag::INVALID);
    }

    #[test]
    fn translucent_multi_child_scene_needs_opacity_composition() {
        let scene = Scene { children: vec![PaintId(1), PaintId(2)], ..Default::default() };
        let flag = scene.needs_composition(BlendMethod::Normal, MaskMethod::None, 128, false);
        assert!(flag.contains(CompositionFlag::OPACITY));
    }
}
