//! Coordinate and geometry types shared by the palette, geometry and renderers.
//!
//! Canonical CPU space:
//! - Shape space in logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Renderers convert to NDC with a projection built from the viewport.

mod affine;
mod rect;
mod vec2;
mod viewport;

pub use affine::Affine;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
