//! Swatch engine crate.
//!
//! Palette-encoded vector shape rendering: shapes reference fill/stroke
//! styles stored as pixels of a lookup atlas instead of carrying colors, and
//! a multi-texture batch renderer draws them in as few calls as the
//! texture-unit limit and blend changes allow.
//!
//! Layers, leaf first:
//! - [`palette`]: style ids, atlas encoding and commit
//! - [`geometry`] / [`path`]: per-shape vertices with style-id colors
//! - [`graphics`]: the `begin_fill` / `line_style` / `end_fill` facade
//! - [`shader`]: GLSL generation cached by texture-unit count
//! - [`batch`]: draw-call grouping behind host capability traits
//! - [`render`]: the wgpu implementation of those traits

pub mod batch;
pub mod coords;
pub mod geometry;
pub mod graphics;
pub mod logging;
pub mod paint;
pub mod palette;
pub mod path;
pub mod render;
pub mod shader;
pub mod texture;
