//! Palette batch program generation.
//!
//! The vertex stage decodes a style id from the vertex color, locates that
//! style's cell in the palette bound to the vertex's texture unit and reads
//! fill color, stroke color and stroke params from it. The fragment stage
//! blends a stroke ring over the fill.
//!
//! Known limitation: the stroke anti-aliasing gap is a fixed
//! `max(0.075, width * 0.1)` and does not adapt to zoom or DPI.

mod generator;
mod templates;

pub use generator::{
    generate_sample_src, generate_sampler_decls, ProgramSource, Shader, ShaderGenerator,
    ShaderUniforms, FIRST_TEXTURE_BINDING,
};
