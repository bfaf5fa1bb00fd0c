//! Style model shared by the palette, the graphics facade and renderers.
//!
//! Scope:
//! - 24-bit colors and 8-bit channel quantization
//! - fill/stroke attribute records and their partial updates
//! - blend modes

pub mod blend;
pub mod color;
pub mod style;

pub use blend::BlendMode;
pub use color::{unit_to_byte, Rgb};
pub use style::{FillPatch, FillStyle, StrokePatch, StrokeStyle, Style, StylePatch};
