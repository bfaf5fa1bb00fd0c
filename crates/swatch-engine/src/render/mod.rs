//! wgpu host adapter for the batch renderer.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - The vertex stage converts to NDC with a projection built from the viewport.
//! - Generated GLSL is compiled through naga; wgpu never sees GLSL text.

mod compile;
mod ctx;
mod pipeline;
mod wgpu_backend;

pub use compile::{compile_glsl, ShaderCompileError};
pub use ctx::{RenderCtx, RenderTarget};
pub use wgpu_backend::WgpuBatchBackend;
