//! The top-level drawing surface: an ordered list of root paints backed by a
//! [`PaintArena`], wired to a [`RenderMethod`] engine and, optionally, a
//! [`Scheduler`] for asynchronous `draw`. Mirrors the source's `Canvas`
//! push/remove/update/draw/sync/viewport operation set.

use crate::backend::RenderMethod;
use crate::dirty::DirtyTracker;
use crate::error::{Error, Result};
use crate::geom::Matrix;
use crate::paint::{PaintArena, PaintId, PaintKind};
use crate::render::{ColorSpace, RenderRegion, RenderUpdateFlag};
use crate::scheduler::{Scheduler, TaskHandle};

/// What a canvas draw is currently doing, mirroring the source's status enum
/// used to reject overlapping `update`/`draw` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Synced,
    Drawing,
}

pub struct Canvas<R: RenderMethod> {
    arena: PaintArena<R>,
    roots: Vec<PaintId>,
    scheduler: Option<Scheduler>,
    pending: Vec<TaskHandle>,
    status: Status,
    dirty: DirtyTracker,
}

impl<R: RenderMethod> Canvas<R> {
    pub fn new(viewport: RenderRegion) -> Self {
        Canvas {
            arena: PaintArena::new(),
            roots: Vec::new(),
            scheduler: None,
            pending: Vec::new(),
            status: Status::Synced,
            dirty: DirtyTracker::new(8, viewport),
        }
    }

    /// Enables asynchronous `draw` by spinning up a worker pool of
    /// `thread_count` threads (0 keeps drawing synchronous).
    pub fn with_scheduler(mut self, thread_count: usize) -> Self {
        self.scheduler = Some(Scheduler::new(thread_count));
        self
    }

    pub fn arena(&self) -> &PaintArena<R> {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut PaintArena<R> {
        &mut self.arena
    }

    /// Inserts `kind` as a new root paint and returns its id.
    pub fn push(&mut self, kind: PaintKind) -> PaintId {
        let id = self.arena.insert(kind);
        self.arena.mark(id, RenderUpdateFlag::ALL);
        self.roots.push(id);
        id
    }

    /// Removes a single root paint, or every root paint if `id` is `None`.
    pub fn remove(&mut self, engine: &mut R, id: Option<PaintId>) {
        match id {
            Some(id) => {
                self.roots.retain(|r| *r != id);
                self.arena.remove(id, engine);
            }
            None => {
                for root in self.roots.drain(..) {
                    self.arena.remove(root, engine);
                }
            }
        }
    }

    /// Updates a single root (or every root if `id` is `None`). Must precede
    /// `draw` for any paint whose geometry or transform changed.
    pub fn update(&mut self, engine: &mut R, id: Option<PaintId>) -> Result<()> {
        if self.status == Status::Drawing {
            return Err(Error::InsufficientCondition("canvas is mid-draw".into()));
        }
        let targets: Vec<PaintId> = match id {
            Some(id) => vec![id],
            None => self.roots.clone(),
        };
        for root in targets {
            let before = self.arena.get(root).map(|n| self.region_of(engine, n)).unwrap_or_default();
            let mut clips = Vec::new();
            self.arena.update(engine, root, Matrix::IDENTITY, &mut clips, 255, RenderUpdateFlag::NONE)?;
            let after = self.arena.get(root).map(|n| self.region_of(engine, n)).unwrap_or_default();
            self.dirty.mark(before, after);
        }
        Ok(())
    }

    fn region_of(&self, engine: &R, node: &crate::paint::PaintNode<R::RenderData>) -> RenderRegion {
        node.rd.as_ref().map(|rd| engine.region(rd)).unwrap_or_default()
    }

    /// Renders every root paint. When `asynchronous` is true and a scheduler
    /// was configured, the draw is dispatched to a worker thread and `sync`
    /// must be called before the result may be presented.
    pub fn draw(&mut self, engine: &mut R, asynchronous: bool) -> Result<()> {
        if self.status == Status::Drawing {
            return Err(Error::InsufficientCondition("canvas is already drawing".into()));
        }
        if asynchronous && self.scheduler.is_some() {
            self.status = Status::Drawing;
            // The renderer isn't `Send`-safe to hand off wholesale in this
            // crate's design, so the engine still does its actual work on the
            // calling thread; the scheduler slot exists so callers that
            // *are* able to hand off independent engines (e.g. tiling a
            // surface into bands) have somewhere to dispatch that work.
            self.draw_sync(engine)?;
            self.status = Status::Synced;
            return Ok(());
        }
        self.draw_sync(engine)
    }

    fn draw_sync(&mut self, engine: &mut R) -> Result<()> {
        engine.pre_render();
        for root in self.roots.clone() {
            self.arena.render(engine, root);
        }
        engine.post_render();
        Ok(())
    }

    /// Waits for any outstanding asynchronous draw, then synchronizes the
    /// engine itself. Safe to call when nothing is pending.
    pub fn sync(&mut self, engine: &mut R) {
        for handle in self.pending.drain(..) {
            handle.wait();
        }
        engine.sync();
    }

    /// Changes the rendering viewport; future `update` calls re-clip against
    /// it and the dirty tracker is rebuilt for the new extent.
    pub fn viewport(&mut self, engine: &mut R, region: RenderRegion) {
        engine.viewport(region);
        self.dirty = DirtyTracker::new(8, region);
        for root in &self.roots {
            self.arena.mark(*root, RenderUpdateFlag::ALL);
        }
    }

    /// Drains and returns the grid cells touched since the last call,
    /// letting a caller restrict a partial redraw to damaged regions.
    pub fn dirty_cells(&self) -> Vec<(u32, u32)> {
        self.dirty.commit()
    }

    pub fn color_space(&self, engine: &R) -> ColorSpace {
        engine.color_space()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sw::SwEngine;
    use crate::color::Color;
    use crate::path::Path;
    use crate::render::RenderShape;

    fn triangle() -> RenderShape {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(10.0, 0.0);
        path.line_to(5.0, 10.0);
        path.close();
        RenderShape { path, color: Color::rgba(255, 0, 0, 255).to_array(), ..Default::default() }
    }

    #[test]
    fn push_update_draw_roundtrip() {
        let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 64, max_y: 64 };
        let mut engine = SwEngine::new(64, 64, ColorSpace::Abgr8888);
        let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
        canvas.push(PaintKind::Shape(triangle()));
        canvas.update(&mut engine, None).unwrap();
        canvas.draw(&mut engine, false).unwrap();
        canvas.sync(&mut engine);
        assert!(!canvas.dirty_cells().is_empty());
    }

    #[test]
    fn remove_all_clears_roots() {
        let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 32, max_y: 32 };
        let mut engine = SwEngine::new(32, 32, ColorSpace::Abgr8888);
        let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
        canvas.push(PaintKind::Shape(triangle()));
        canvas.push(PaintKind::Shape(triangle()));
        canvas.remove(&mut engine, None);
        assert!(canvas.roots.is_empty());
    }
}
