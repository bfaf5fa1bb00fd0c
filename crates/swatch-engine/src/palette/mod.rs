//! Style palette: an RGBA atlas used as a lookup table from style id to
//! fill/stroke attributes.
//!
//! Shapes store a small style id instead of per-vertex colors, so restyling a
//! shape rewrites a few atlas pixels rather than its geometry.

mod encoding;
mod entry;
mod palette;

pub use encoding::{BYTES_PER_PIXEL, PIXELS_PER_ENTRY};
pub use entry::{AtlasView, StyleEntry, StyleId};
pub use palette::{Palette, PaletteConfig, SharedPalette, MAX_ATLAS_SIZE};
