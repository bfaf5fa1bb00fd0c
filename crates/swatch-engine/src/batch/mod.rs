//! Multi-texture batching.
//!
//! Shapes are queued as [`BatchElement`]s and flushed once per frame (or
//! whenever the host needs the canvas up to date). A flush packs every
//! queued shape into one interleaved vertex/index buffer and splits it into
//! [`DrawCall`]s at blend-mode changes and whenever the texture-unit limit
//! is reached.

mod backend;
mod draw_call;
mod element;
mod renderer;

pub use backend::{BatchBackend, DrawSink, TextureBinder, VertexSink};
pub use draw_call::DrawCall;
pub use element::{BatchElement, BatchQueue, BatchVertex};
pub use renderer::{BatchConfig, BatchRenderer, FlushStats, MAX_POOL_BUFFERS};
