//! Save/load backends for the paint graph: a tagged-binary format for
//! lossless round-tripping and a GIF encoder for exporting an animation
//! timeline as a shareable raster file.

pub mod gif;
pub mod tvg;
