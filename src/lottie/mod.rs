//! Lottie animation support: a keyframed document model plus a per-frame
//! builder that regenerates a paint subtree from it, in place of a client
//! assembling the scene graph by hand.

pub mod builder;
pub mod expressions;
pub mod model;

pub use builder::LottieBuilder;
pub use model::{Composition, Layer, LayerKind};
