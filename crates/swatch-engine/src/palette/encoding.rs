//! Bit-exact pixel encoding of style entries.
//!
//! Each entry owns a block of [`PIXELS_PER_ENTRY`] RGBA pixels starting at
//! its cell origin:
//!
//! ```text
//! pixel 0: fill   R G B  A = round(alpha * 255)
//! pixel 1: stroke R G B  A = round(alpha * 255)
//! pixel 2: R = round(width * 255)  G = round(alignment * 255)  B = 0  A = 255
//! pixel 3: padding
//! ```
//!
//! The shader stages read these pixels back; changing the layout here means
//! changing the generated programs too.

use crate::paint::{unit_to_byte, Rgb, Style};

/// Pixels reserved per style entry (fill, stroke color, stroke params, pad).
pub const PIXELS_PER_ENTRY: u32 = 4;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

#[inline]
fn write_color(color: Rgb, alpha: f32, out: &mut [u8]) {
    let [r, g, b] = color.to_bytes();
    out[0] = r;
    out[1] = g;
    out[2] = b;
    out[3] = unit_to_byte(alpha);
}

/// Encodes `style` into the first three pixels of `block`.
///
/// `block` must be at least 12 bytes; the padding pixel is left untouched.
pub(super) fn encode_style(style: &Style, block: &mut [u8]) {
    write_color(style.fill.color, style.fill.alpha, &mut block[0..4]);
    write_color(style.stroke.color, style.stroke.alpha, &mut block[4..8]);

    let params = &mut block[8..12];
    params[0] = unit_to_byte(style.stroke.width);
    params[1] = unit_to_byte(style.stroke.alignment);
    params[2] = 0;
    // Opaque marker so samplers never treat the params pixel as transparent.
    params[3] = 255;
}

/// Byte offset of pixel `(x, y)` in an atlas `atlas_size` pixels wide.
#[inline]
pub(super) fn pixel_offset(x: u32, y: u32, atlas_size: u32) -> usize {
    (y as usize * atlas_size as usize + x as usize) * BYTES_PER_PIXEL
}
