//! # vectos
//!
//! vectos is a portable, retained-mode 2D vector graphics engine built in
//! Rust. Shapes, gradients, scenes, pictures and text live in a
//! [`PaintArena`](paint::PaintArena) addressed by [`PaintId`](paint::PaintId),
//! with a two-pass update/render dispatch driven by a pluggable
//! [`RenderMethod`](backend::RenderMethod) backend. A software rasterizer
//! (`backend::sw`) is built in; a `wgpu`-backed GPU backend is available
//! behind the `gpu` feature.
//!
//! ## Features
//!
//! - **Retained scene graph**: shapes, nested scenes, pictures (vector or
//!   bitmap) and text as one arena of paints with clip/mask composition.
//! - **Software rasterizer**: scanline fill via `lyon` tessellation plus a
//!   hand-rolled stroke tessellator with explicit join/cap control.
//! - **Lottie playback**: a keyframed document model and a per-frame
//!   builder that regenerates a paint subtree for any given time.
//! - **Async updates**: an optional work-stealing [`Scheduler`](scheduler::Scheduler)
//!   lets [`Canvas::draw`](canvas::Canvas::draw) run off the calling thread.
//! - **Process-wide engine handle**: [`Engine::init`](engine::Engine::init)/
//!   [`term`](engine::Engine::term) own a scheduler plus a
//!   [`FontRegistry`](engine::FontRegistry) the Lottie builder consults for
//!   text layers.
//! - **Save/load**: a tagged-binary format for lossless round-tripping and
//!   an animated GIF encoder for sharing a rendered timeline.
//!
//! ## Getting started
//!
//! ```no_run
//! use vectos::backend::sw::SwEngine;
//! use vectos::canvas::Canvas;
//! use vectos::paint::PaintKind;
//! use vectos::path::Path;
//! use vectos::render::{ColorSpace, RenderRegion, RenderShape};
//!
//! let mut engine = SwEngine::new(256, 256, ColorSpace::Abgr8888);
//! let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 256, max_y: 256 };
//! let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
//!
//! let mut path = Path::new();
//! path.append_rect(10.0, 10.0, 100.0, 80.0, 0.0, 0.0, true);
//! let shape = RenderShape { path, color: [255, 0, 0, 255], ..Default::default() };
//! canvas.push(PaintKind::Shape(shape));
//!
//! canvas.update(&mut engine, None).unwrap();
//! canvas.draw(&mut engine, false).unwrap();
//! ```

pub mod backend;
pub mod canvas;
pub mod color;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod fill;
pub mod geom;
pub mod lottie;
pub mod paint;
pub mod path;
pub mod picture;
pub mod render;
pub mod saver;
pub mod scene;
pub mod scheduler;
pub mod stroke;
pub mod text;

pub use canvas::Canvas;
pub use color::Color;
pub use error::{Error, Result};
pub use paint::{PaintArena, PaintId, PaintKind};
