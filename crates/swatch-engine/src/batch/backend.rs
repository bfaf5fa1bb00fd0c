//! Capability traits a host engine implements to receive batched draws.

use std::rc::Rc;

use crate::shader::Shader;
use crate::texture::TextureHandle;

use super::{BatchVertex, DrawCall};

/// Receives the interleaved buffers of a flush.
pub trait VertexSink {
    /// Whether one GPU buffer may be written more than once per frame.
    ///
    /// Some drivers stall or corrupt when a buffer is rewritten while an
    /// earlier draw from the same frame still reads it.
    fn can_upload_same_buffer(&self) -> bool {
        true
    }

    /// Uploads into pool buffer `slot`. Subsequent draws read from it.
    fn upload(&mut self, slot: usize, vertices: &[BatchVertex], indices: &[u32]);
}

/// Binds textures to units for the next draw.
pub trait TextureBinder {
    fn bind_texture(&mut self, unit: usize, texture: &Rc<TextureHandle>);
}

/// Issues draws against the last uploaded buffer and bound textures.
pub trait DrawSink {
    fn draw(&mut self, shader: &Shader, call: &DrawCall);
}

/// Everything [`BatchRenderer::flush`](super::BatchRenderer::flush) needs.
pub trait BatchBackend: VertexSink + TextureBinder + DrawSink {}

impl<T: VertexSink + TextureBinder + DrawSink> BatchBackend for T {}
