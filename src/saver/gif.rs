//! Animated GIF encoder: median-cut palette per frame (built over a k-d
//! tree, as in `tvgGifEncoder.cpp`'s "modified median split"), LZW-compressed
//! 8-bit indexed frames, a `NETSCAPE2.0` loop extension, and a per-frame
//! graphics-control extension carrying the inter-frame delay.
//!
//! Unlike the tagged-binary saver this writes a format real GIF viewers must
//! decode, so the byte layout (block tags, header strings, packed flag
//! bytes) follows the GIF89a spec and the source's implementation of it
//! exactly; only the palette-index 0 convention (reserved for transparency,
//! rather than the source's 1-based color range with a node-128 patch-up)
//! is simplified, noted inline below.

use std::io::Write;

use ahash::{HashMap, HashMapExt};

use crate::error::{Error, Result};
use crate::render::RenderSurface;

const BIT_DEPTH: u32 = 8;
const PALETTE_SIZE: usize = 1 << BIT_DEPTH;
const TRANSPARENT_IDX: u8 = 0;
const TRANSPARENT_THRESHOLD: i32 = 127;

fn io_err(e: std::io::Error) -> Error {
    Error::Unknown(e.to_string())
}

/// A 256-color palette plus the k-d tree used to find the closest entry to
/// an arbitrary RGB triple. `tree_split_elt`/`tree_split` are a heap-shaped
/// tree over `colors`: node `i`'s children are `2i`/`2i+1`, and indices
/// `256..512` are implicit leaves holding `colors[i - 256]`.
struct Palette {
    colors: [[u8; 3]; PALETTE_SIZE],
    tree_split_elt: [u8; PALETTE_SIZE],
    tree_split: [u8; PALETTE_SIZE],
}

impl Palette {
    fn empty() -> Self {
        Palette { colors: [[0, 0, 0]; PALETTE_SIZE], tree_split_elt: [0; PALETTE_SIZE], tree_split: [0; PALETTE_SIZE] }
    }

    fn closest_index(&self, rgb: [u8; 3]) -> u8 {
        let mut best_ind: i32 = 1;
        let mut best_diff: i32 = i32::MAX;
        self.search(rgb, 1, &mut best_ind, &mut best_diff);
        best_ind as u8
    }

    fn search(&self, rgb: [u8; 3], node: usize, best_ind: &mut i32, best_diff: &mut i32) {
        if node > PALETTE_SIZE - 1 {
            let ind = node - PALETTE_SIZE;
            if ind == TRANSPARENT_IDX as usize {
                return;
            }
            let c = self.colors[ind];
            let diff = (rgb[0] as i32 - c[0] as i32).abs()
                + (rgb[1] as i32 - c[1] as i32).abs()
                + (rgb[2] as i32 - c[2] as i32).abs();
            if diff < *best_diff {
                *best_diff = diff;
                *best_ind = ind as i32;
            }
            return;
        }

        let comp = self.tree_split_elt[node] as usize;
        let split_pos = self.tree_split[node] as i32;
        let split_comp = rgb[comp] as i32;

        if split_pos > split_comp {
            self.search(rgb, node * 2, best_ind, best_diff);
            if *best_diff > split_pos - split_comp {
                self.search(rgb, node * 2 + 1, best_ind, best_diff);
            }
        } else {
            self.search(rgb, node * 2 + 1, best_ind, best_diff);
            if *best_diff > split_comp - split_pos {
                self.search(rgb, node * 2, best_ind, best_diff);
            }
        }
    }
}

/// Builds a palette by recursively splitting `pixels` along its widest axis
/// and averaging each leaf bucket ("modified median split"), using
/// `select_nth_unstable_by_key` in place of the source's hand-rolled
/// quickselect partition for the same "find the median without a full sort"
/// operation.
fn build_palette(pixels: &mut [[u8; 3]]) -> Palette {
    let mut pal = Palette::empty();
    split_palette(&mut pal, pixels, 0, PALETTE_SIZE, PALETTE_SIZE / 2, PALETTE_SIZE / 4, 1);
    // Index 0 is reserved for transparency rather than holding a color
    // this tree split happened to average into it.
    pal.colors[0] = [0, 0, 0];
    pal
}

fn split_palette(pal: &mut Palette, pixels: &mut [[u8; 3]], first_elt: usize, last_elt: usize, split_elt: usize, split_dist: usize, tree_node: usize) {
    if last_elt <= first_elt || pixels.is_empty() {
        return;
    }

    if last_elt == first_elt + 1 {
        let n = pixels.len() as u64;
        let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
        for p in pixels.iter() {
            r += p[0] as u64;
            g += p[1] as u64;
            b += p[2] as u64;
        }
        r += n / 2;
        g += n / 2;
        b += n / 2;
        pal.colors[first_elt] = [(r / n) as u8, (g / n) as u8, (b / n) as u8];
        return;
    }

    let mut min = [255u8; 3];
    let mut max = [0u8; 3];
    for p in pixels.iter() {
        for c in 0..3 {
            if p[c] < min[c] {
                min[c] = p[c];
            }
            if p[c] > max[c] {
                max[c] = p[c];
            }
        }
    }
    let range = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
    let mut split_com = 1;
    if range[2] > range[1] {
        split_com = 2;
    }
    if range[0] > range[2] && range[0] > range[1] {
        split_com = 0;
    }

    let sub_a = (pixels.len() * (split_elt - first_elt) / (last_elt - first_elt)).min(pixels.len());
    if sub_a > 0 && sub_a < pixels.len() {
        pixels.select_nth_unstable_by_key(sub_a, |p| p[split_com]);
    }

    pal.tree_split_elt[tree_node] = split_com as u8;
    pal.tree_split[tree_node] = pixels[sub_a.min(pixels.len() - 1)][split_com];

    let (left, right) = pixels.split_at_mut(sub_a);
    split_palette(pal, left, first_elt, split_elt, split_elt.saturating_sub(split_dist), split_dist / 2, tree_node * 2);
    split_palette(pal, right, split_elt, last_elt, split_elt + split_dist, split_dist / 2, tree_node * 2 + 1);
}

/// Collects the RGB of every pixel that changed from `prev` (or every
/// opaque-enough pixel, on the first frame), so the palette is biased toward
/// colors this frame actually introduces.
fn pick_changed(prev: Option<&[[u8; 4]]>, cur: &[[u8; 4]], transparent: bool) -> Vec<[u8; 3]> {
    match prev {
        None => cur.iter().filter(|p| p[3] as i32 >= TRANSPARENT_THRESHOLD).map(|p| [p[0], p[1], p[2]]).collect(),
        Some(prev) => prev
            .iter()
            .zip(cur.iter())
            .filter(|(_, c)| c[3] as i32 >= TRANSPARENT_THRESHOLD)
            .filter(|(p, c)| transparent || p[0] != c[0] || p[1] != c[1] || p[2] != c[2])
            .map(|(_, c)| [c[0], c[1], c[2]])
            .collect(),
    }
}

/// Maps every pixel to a palette index, routing pixels that are either
/// below-threshold alpha (`transparent` mode) or unchanged from the
/// previous frame (delta mode) to the transparent index instead of the
/// nearest color.
fn threshold_image(prev: Option<&[[u8; 4]]>, cur: &[[u8; 4]], pal: &Palette, transparent: bool) -> Vec<u8> {
    let mut out = vec![0u8; cur.len()];
    for i in 0..cur.len() {
        let c = cur[i];
        if transparent {
            out[i] = if (c[3] as i32) < TRANSPARENT_THRESHOLD { TRANSPARENT_IDX } else { pal.closest_index([c[0], c[1], c[2]]) };
            continue;
        }
        if let Some(prev) = prev {
            let p = prev[i];
            if p[0] == c[0] && p[1] == c[1] && p[2] == c[2] {
                out[i] = TRANSPARENT_IDX;
                continue;
            }
        }
        out[i] = pal.closest_index([c[0], c[1], c[2]]);
    }
    out
}

/// Accumulates LZW codes a bit at a time into 255-byte GIF data sub-blocks.
struct BitWriter {
    bit_index: u8,
    byte: u8,
    chunk: Vec<u8>,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { bit_index: 0, byte: 0, chunk: Vec::with_capacity(255) }
    }

    fn write_bit(&mut self, w: &mut impl Write, bit: u32) -> Result<()> {
        self.byte |= ((bit & 1) << self.bit_index) as u8;
        self.bit_index += 1;
        if self.bit_index > 7 {
            self.chunk.push(self.byte);
            self.bit_index = 0;
            self.byte = 0;
            if self.chunk.len() == 255 {
                self.flush_chunk(w)?;
            }
        }
        Ok(())
    }

    fn write_code(&mut self, w: &mut impl Write, mut code: u32, length: u32) -> Result<()> {
        for _ in 0..length {
            self.write_bit(w, code)?;
            code >>= 1;
        }
        Ok(())
    }

    fn flush_chunk(&mut self, w: &mut impl Write) -> Result<()> {
        if self.chunk.is_empty() {
            return Ok(());
        }
        w.write_all(&[self.chunk.len() as u8]).map_err(io_err)?;
        w.write_all(&self.chunk).map_err(io_err)?;
        self.chunk.clear();
        Ok(())
    }

    fn finish(&mut self, w: &mut impl Write) -> Result<()> {
        while self.bit_index != 0 {
            self.write_bit(w, 0)?;
        }
        self.flush_chunk(w)
    }
}

/// LZW-compresses `indices` (one palette index per pixel) the way the
/// source's dictionary-reset-at-4095 encoder does, using an `ahash` map in
/// place of its fixed 4096-entry node array for the code dictionary.
fn write_lzw(w: &mut impl Write, indices: &[u8]) -> Result<()> {
    let clear_code: u32 = 1 << BIT_DEPTH;
    let end_code = clear_code + 1;
    let min_code_size = BIT_DEPTH;
    let mut code_size = min_code_size + 1;
    let mut next_code = clear_code + 1;
    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();

    let mut bits = BitWriter::new();
    bits.write_code(w, clear_code, code_size)?;

    let mut cur_code: i32 = -1;
    for &val in indices {
        if cur_code < 0 {
            cur_code = val as i32;
        } else if let Some(&next) = dict.get(&(cur_code as u16, val)) {
            cur_code = next as i32;
        } else {
            bits.write_code(w, cur_code as u32, code_size)?;
            next_code += 1;
            dict.insert((cur_code as u16, val), next_code as u16);
            if next_code >= (1 << code_size) {
                code_size += 1;
            }
            if next_code == 4095 {
                bits.write_code(w, clear_code, code_size)?;
                dict.clear();
                code_size = min_code_size + 1;
                next_code = clear_code + 1;
            }
            cur_code = val as i32;
        }
    }
    bits.write_code(w, cur_code as u32, code_size)?;
    bits.write_code(w, clear_code, code_size)?;
    bits.write_code(w, end_code, min_code_size + 1)?;
    bits.finish(w)?;
    w.write_all(&[0]).map_err(io_err)
}

fn write_graphics_control(w: &mut impl Write, delay_cs: u16, transparent: bool) -> Result<()> {
    w.write_all(&[0x21, 0xf9, 0x04, if transparent { 0x09 } else { 0x05 }]).map_err(io_err)?;
    w.write_all(&delay_cs.to_le_bytes()).map_err(io_err)?;
    w.write_all(&[TRANSPARENT_IDX, 0]).map_err(io_err)
}

fn write_image_descriptor(w: &mut impl Write, width: u32, height: u32, pal: &Palette) -> Result<()> {
    w.write_all(&[0x2c]).map_err(io_err)?;
    w.write_all(&[0, 0, 0, 0]).map_err(io_err)?;
    w.write_all(&(width as u16).to_le_bytes()).map_err(io_err)?;
    w.write_all(&(height as u16).to_le_bytes()).map_err(io_err)?;
    w.write_all(&[0x80 + (BIT_DEPTH as u8) - 1]).map_err(io_err)?;
    for color in &pal.colors {
        w.write_all(color).map_err(io_err)?;
    }
    w.write_all(&[BIT_DEPTH as u8]).map_err(io_err)
}

/// Writes frames one at a time to an animated GIF stream, keeping the
/// previous frame around to build delta-aware palettes and transparency.
pub struct GifEncoder<W: Write> {
    w: W,
    width: u32,
    height: u32,
    prev_frame: Option<Vec<[u8; 4]>>,
}

impl<W: Write> GifEncoder<W> {
    /// Writes the GIF header, a dummy 2-color global table, and a
    /// `NETSCAPE2.0` infinite-loop extension.
    pub fn begin(mut w: W, width: u32, height: u32) -> Result<Self> {
        w.write_all(b"GIF89a").map_err(io_err)?;
        w.write_all(&(width as u16).to_le_bytes()).map_err(io_err)?;
        w.write_all(&(height as u16).to_le_bytes()).map_err(io_err)?;
        w.write_all(&[0xf0, 0, 0]).map_err(io_err)?;
        w.write_all(&[0, 0, 0, 0, 0, 0]).map_err(io_err)?;

        w.write_all(&[0x21, 0xff, 11]).map_err(io_err)?;
        w.write_all(b"NETSCAPE2.0").map_err(io_err)?;
        w.write_all(&[3, 1, 0, 0, 0]).map_err(io_err)?;

        Ok(GifEncoder { w, width, height, prev_frame: None })
    }

    /// Writes one frame. `rgba` must hold `width * height` pixels packed the
    /// same way [`RenderSurface::data`] is (`[r, g, b, a]` little-endian
    /// `u32`s, per the convention `backend::sw`'s blending already uses).
    /// `transparent` marks below-threshold-alpha pixels as see-through
    /// instead of the delta-coding default of treating unchanged pixels as
    /// transparent.
    pub fn write_frame(&mut self, rgba: &[u32], delay_cs: u16, transparent: bool) -> Result<()> {
        if rgba.len() != (self.width * self.height) as usize {
            return Err(Error::InvalidArguments("frame size does not match encoder dimensions".into()));
        }
        let pixels: Vec<[u8; 4]> = rgba.iter().map(|p| p.to_le_bytes()).collect();

        let mut changed = pick_changed(self.prev_frame.as_deref(), &pixels, transparent);
        let pal = build_palette(&mut changed);
        let indices = threshold_image(self.prev_frame.as_deref(), &pixels, &pal, transparent);

        write_graphics_control(&mut self.w, delay_cs, transparent)?;
        write_image_descriptor(&mut self.w, self.width, self.height, &pal)?;
        write_lzw(&mut self.w, &indices)?;

        self.prev_frame = Some(pixels);
        Ok(())
    }

    /// Writes the GIF trailer and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.w.write_all(&[0x3b]).map_err(io_err)?;
        Ok(self.w)
    }
}

/// Encodes a sequence of `(surface, delay in centiseconds)` frames into a
/// complete in-memory GIF. All surfaces must share the first frame's
/// dimensions.
pub fn encode(frames: &[(RenderSurface, u16)]) -> Result<Vec<u8>> {
    let (first, _) = frames.first().ok_or_else(|| Error::InvalidArguments("no frames to encode".into()))?;
    let mut encoder = GifEncoder::begin(Vec::new(), first.w, first.h)?;
    for (surface, delay) in frames {
        if surface.w != encoder.width || surface.h != encoder.height {
            return Err(Error::InvalidArguments("all frames must share dimensions".into()));
        }
        encoder.write_frame(&surface.data, *delay, false)?;
    }
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ColorSpace;

    fn solid_surface(w: u32, h: u32, rgba: [u8; 4]) -> RenderSurface {
        let mut s = RenderSurface::new(w, h, ColorSpace::Abgr8888);
        let px = u32::from_le_bytes(rgba);
        s.data.iter_mut().for_each(|p| *p = px);
        s
    }

    #[test]
    fn encodes_a_two_frame_animation_with_gif_framing_intact() {
        let frames = vec![(solid_surface(4, 4, [255, 0, 0, 255]), 10u16), (solid_surface(4, 4, [0, 255, 0, 255]), 10u16)];
        let bytes = encode(&frames).unwrap();

        assert_eq!(&bytes[0..6], b"GIF89a");
        assert_eq!(bytes.last(), Some(&0x3b));
        assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
        assert!(bytes.len() > 20);
    }

    #[test]
    fn build_palette_handles_empty_input_without_panicking() {
        let mut pixels: Vec<[u8; 3]> = Vec::new();
        let pal = build_palette(&mut pixels);
        assert_eq!(pal.colors[0], [0, 0, 0]);
    }

    #[test]
    fn closest_index_picks_the_nearer_of_two_extreme_colors() {
        let mut pixels = vec![[0u8, 0, 0]; 50];
        pixels.extend(vec![[255u8, 255, 255]; 50]);
        let pal = build_palette(&mut pixels);
        let near_black = pal.closest_index([10, 10, 10]);
        let near_white = pal.closest_index([250, 250, 250]);
        assert_ne!(near_black, near_white);
    }
}
