use std::rc::Rc;

use crate::paint::BlendMode;
use crate::texture::TextureHandle;

/// One GPU draw: a contiguous index range sharing a blend mode and a bounded
/// set of textures. `textures[i]` is bound to unit `i`.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub start: u32,
    pub size: u32,
    pub blend: BlendMode,
    pub textures: Vec<Rc<TextureHandle>>,
}

impl DrawCall {
    pub(super) fn open(start: u32, blend: BlendMode) -> Self {
        Self { start, size: 0, blend, textures: Vec::new() }
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Index range in the uploaded index buffer.
    #[inline]
    pub fn range(&self) -> std::ops::Range<u32> {
        self.start..self.start + self.size
    }
}
