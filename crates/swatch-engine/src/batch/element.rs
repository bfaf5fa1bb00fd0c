use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::geometry::BatchGeometry;
use crate::paint::BlendMode;
use crate::texture::TextureHandle;

/// Interleaved vertex as uploaded to the GPU.
///
/// `texture_unit` is the slot the element's texture occupies in its draw
/// call; the vertex stage uses it to pick the sampler.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
    pub texture_unit: f32,
}

/// One shape submitted for batching.
#[derive(Debug, Clone)]
pub struct BatchElement {
    pub texture: Rc<TextureHandle>,
    pub blend_mode: BlendMode,
    pub geometry: Rc<BatchGeometry>,
}

impl BatchElement {
    pub fn new(texture: Rc<TextureHandle>, blend_mode: BlendMode, geometry: Rc<BatchGeometry>) -> Self {
        Self { texture, blend_mode, geometry }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geometry.index_count() == 0 || self.geometry.vertex_count() == 0
    }

    /// Blend mode after mapping onto the texture's alpha representation.
    #[inline]
    pub fn effective_blend(&self) -> BlendMode {
        self.blend_mode.for_alpha(self.texture.premultiplied_alpha())
    }
}

/// Per-frame submission queue.
///
/// Elements are drawn in push order; the renderer never reorders them.
#[derive(Debug, Default)]
pub struct BatchQueue {
    elements: Vec<BatchElement>,
    vertex_count: usize,
    index_count: usize,
}

impl BatchQueue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `element`. Elements without geometry are dropped.
    pub fn push(&mut self, element: BatchElement) -> bool {
        if element.is_empty() {
            return false;
        }
        self.vertex_count += element.geometry.vertex_count();
        self.index_count += element.geometry.index_count();
        self.elements.push(element);
        true
    }

    /// Clears queued elements. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.elements.clear();
        self.vertex_count = 0;
        self.index_count = 0;
    }

    #[inline]
    pub fn elements(&self) -> &[BatchElement] {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total vertices across queued elements.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Total indices across queued elements.
    #[inline]
    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(indices: Vec<u32>) -> BatchElement {
        let geometry = BatchGeometry {
            positions: vec![[0.0, 0.0]; 3],
            uvs: vec![[0.0, 0.0]; 3],
            colors: vec![[0, 0, 0, 255]; 3],
            indices,
        };
        BatchElement::new(Rc::new(TextureHandle::new(4, 4, false)), BlendMode::Normal, Rc::new(geometry))
    }

    #[test]
    fn vertex_is_24_bytes() {
        assert_eq!(std::mem::size_of::<BatchVertex>(), 24);
    }

    #[test]
    fn empty_elements_are_dropped() {
        let mut queue = BatchQueue::new();
        assert!(!queue.push(element(Vec::new())));
        assert!(queue.is_empty());

        assert!(queue.push(element(vec![0, 1, 2])));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.vertex_count(), 3);
        assert_eq!(queue.index_count(), 3);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.index_count(), 0);
    }

    #[test]
    fn straight_alpha_textures_use_npm_blend() {
        let e = element(vec![0, 1, 2]);
        assert_eq!(e.effective_blend(), BlendMode::NormalNpm);
    }
}
