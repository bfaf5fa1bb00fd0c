use std::collections::HashMap;
use std::rc::Rc;

use crate::paint::BlendMode;
use crate::shader::{Shader, ShaderGenerator};
use crate::texture::{TextureHandle, TextureId};

use super::{BatchBackend, BatchElement, BatchQueue, BatchVertex, DrawCall};

/// Upload buffers a frame cycles through when the backend cannot reuse one.
pub const MAX_POOL_BUFFERS: usize = 16;

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Texture units per draw call. Clamped to at least 1.
    pub max_textures: usize,
    /// Overrides [`VertexSink::can_upload_same_buffer`](super::VertexSink::can_upload_same_buffer)
    /// when set.
    pub can_upload_same_buffer: Option<bool>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_textures: 8, can_upload_same_buffer: None }
    }
}

/// Summary of one [`BatchRenderer::flush`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub elements: usize,
    pub draw_calls: usize,
    pub vertices: usize,
    pub indices: usize,
    /// Pool buffer the flush uploaded into.
    pub buffer_slot: usize,
}

/// Slot a texture holds in the draw call opened at `epoch`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct TextureStamp {
    epoch: u64,
    slot: usize,
}

/// Groups queued shapes into as few draw calls as the texture-unit limit
/// and blend-mode changes allow, then hands them to a [`BatchBackend`].
///
/// Draw order always equals submission order.
#[derive(Debug)]
pub struct BatchRenderer {
    config: BatchConfig,
    shader: Shader,
    queue: BatchQueue,

    vertices: Vec<BatchVertex>,
    indices: Vec<u32>,
    draw_calls: Vec<DrawCall>,

    /// Bumped at every group boundary. A texture whose stamp carries the
    /// current epoch already has a slot in the open group.
    epoch: u64,
    stamps: HashMap<TextureId, TextureStamp>,

    frame: u64,
    flush_id: usize,
    pool_size: usize,
}

impl BatchRenderer {
    pub fn new(config: BatchConfig) -> Self {
        Self::with_generator(config, &mut ShaderGenerator::default())
    }

    /// Uses `generator` so several renderers can share its program cache.
    pub fn with_generator(mut config: BatchConfig, generator: &mut ShaderGenerator) -> Self {
        config.max_textures = config.max_textures.max(1);
        let shader = generator.generate_shader(config.max_textures);
        Self {
            config,
            shader,
            queue: BatchQueue::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            draw_calls: Vec::new(),
            epoch: 0,
            stamps: HashMap::new(),
            frame: 0,
            flush_id: 0,
            pool_size: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[inline]
    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    #[inline]
    pub fn shader_mut(&mut self) -> &mut Shader {
        &mut self.shader
    }

    #[inline]
    pub fn queue(&self) -> &BatchQueue {
        &self.queue
    }

    /// Draw calls built by the last flush.
    #[inline]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Buffers allocated so far in the upload pool.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Queues `element` for the next flush. Returns `false` if it was dropped
    /// for having no geometry.
    pub fn render(&mut self, element: BatchElement) -> bool {
        self.queue.push(element)
    }

    /// Starts a new frame: advances the texture touch counter and rewinds the
    /// buffer pool.
    ///
    /// Call once per frame before the first flush. Without it the pool slot
    /// keeps advancing and wraps after [`MAX_POOL_BUFFERS`] flushes, which
    /// overwrites buffers an earlier draw of the same submission may still read.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.flush_id = 0;
    }

    /// Builds draw calls from the queue, uploads the buffers and issues the
    /// draws. Does nothing if the queue is empty.
    pub fn flush<B: BatchBackend + ?Sized>(&mut self, backend: &mut B) -> FlushStats {
        if self.queue.is_empty() {
            return FlushStats::default();
        }

        let first_epoch = self.epoch + 1;
        self.build_draw_calls();

        let reuse = self
            .config
            .can_upload_same_buffer
            .unwrap_or_else(|| backend.can_upload_same_buffer());
        let buffer_slot = if reuse {
            0
        } else {
            let slot = self.flush_id % MAX_POOL_BUFFERS;
            self.flush_id += 1;
            slot
        };
        self.pool_size = self.pool_size.max(buffer_slot + 1);
        backend.upload(buffer_slot, &self.vertices, &self.indices);

        for call in &self.draw_calls {
            for (unit, texture) in call.textures.iter().enumerate() {
                texture.touch(self.frame);
                backend.bind_texture(unit, texture);
                self.shader.uniforms.sampler_sizes[unit] = inverse_size(texture);
            }
            backend.draw(&self.shader, call);
        }

        let stats = FlushStats {
            elements: self.queue.len(),
            draw_calls: self.draw_calls.len(),
            vertices: self.vertices.len(),
            indices: self.indices.len(),
            buffer_slot,
        };
        log::trace!(
            "batch flush: {} elements, {} draw calls, {} vertices, {} indices",
            stats.elements,
            stats.draw_calls,
            stats.vertices,
            stats.indices
        );

        self.queue.clear();
        self.stamps.retain(|_, stamp| stamp.epoch >= first_epoch);
        stats
    }

    fn build_draw_calls(&mut self) {
        let max_textures = self.shader.max_textures();

        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
        self.vertices.reserve(self.queue.vertex_count());
        self.indices.reserve(self.queue.index_count());

        self.epoch += 1;
        let mut blend: Option<BlendMode> = None;
        let mut group = DrawCall::open(0, BlendMode::default());
        let mut texture_count = 0usize;
        let mut last_texture: Option<TextureId> = None;
        let mut slot = 0usize;

        for element in self.queue.elements() {
            let texture = &element.texture;
            if texture.is_destroyed() {
                log::warn!("skipping shape bound to destroyed texture {:?}", texture.id());
                continue;
            }

            let mode = element.effective_blend();
            if blend != Some(mode) {
                blend = Some(mode);
                texture_count = max_textures;
                last_texture = None;
                self.epoch += 1;
            }

            if last_texture != Some(texture.id()) {
                last_texture = Some(texture.id());
                match self.stamps.get(&texture.id()) {
                    Some(stamp) if stamp.epoch == self.epoch => slot = stamp.slot,
                    _ => {
                        if texture_count >= max_textures {
                            let start = self.indices.len() as u32;
                            close_group(&mut self.draw_calls, group, start);
                            group = DrawCall::open(start, mode);
                            texture_count = 0;
                            self.epoch += 1;
                        }
                        slot = texture_count;
                        texture_count += 1;
                        group.textures.push(Rc::clone(texture));
                        self.stamps.insert(texture.id(), TextureStamp { epoch: self.epoch, slot });
                    }
                }
            }

            pack(&mut self.vertices, &mut self.indices, element, slot as f32);
        }

        let end = self.indices.len() as u32;
        close_group(&mut self.draw_calls, group, end);
    }
}

fn close_group(draw_calls: &mut Vec<DrawCall>, mut group: DrawCall, end: u32) {
    group.size = end - group.start;
    if group.size > 0 {
        draw_calls.push(group);
    }
}

fn pack(vertices: &mut Vec<BatchVertex>, indices: &mut Vec<u32>, element: &BatchElement, unit: f32) {
    let geometry = &element.geometry;
    let base = vertices.len() as u32;

    vertices.extend(
        geometry
            .positions
            .iter()
            .zip(&geometry.uvs)
            .zip(&geometry.colors)
            .map(|((&position, &uv), &color)| BatchVertex { position, uv, color, texture_unit: unit }),
    );
    indices.extend(geometry.indices.iter().map(|&i| base + i));
}

fn inverse_size(texture: &TextureHandle) -> [f32; 2] {
    [1.0 / texture.width().max(1) as f32, 1.0 / texture.height().max(1) as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{DrawSink, TextureBinder, VertexSink};
    use crate::geometry::BatchGeometry;

    #[derive(Default)]
    struct Recorder {
        reuse: bool,
        uploads: Vec<(usize, usize, Vec<u32>)>,
        binds: Vec<(usize, TextureId)>,
        draws: Vec<(u32, u32, BlendMode, Vec<[f32; 2]>)>,
        vertices: Vec<BatchVertex>,
    }

    impl VertexSink for Recorder {
        fn can_upload_same_buffer(&self) -> bool {
            self.reuse
        }

        fn upload(&mut self, slot: usize, vertices: &[BatchVertex], indices: &[u32]) {
            self.uploads.push((slot, vertices.len(), indices.to_vec()));
            self.vertices = vertices.to_vec();
        }
    }

    impl TextureBinder for Recorder {
        fn bind_texture(&mut self, unit: usize, texture: &Rc<TextureHandle>) {
            self.binds.push((unit, texture.id()));
        }
    }

    impl DrawSink for Recorder {
        fn draw(&mut self, shader: &Shader, call: &DrawCall) {
            let sizes = shader.uniforms.sampler_sizes[..call.texture_count()].to_vec();
            self.draws.push((call.start, call.size, call.blend, sizes));
        }
    }

    fn recorder() -> Recorder {
        Recorder { reuse: true, ..Recorder::default() }
    }

    fn texture(size: u32) -> Rc<TextureHandle> {
        Rc::new(TextureHandle::new(size, size, true))
    }

    fn triangle() -> Rc<BatchGeometry> {
        Rc::new(BatchGeometry {
            positions: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            uvs: vec![[0.0, 0.0]; 3],
            colors: vec![[0, 0, 1, 255]; 3],
            indices: vec![0, 1, 2],
        })
    }

    fn shape(texture: &Rc<TextureHandle>, blend: BlendMode) -> BatchElement {
        BatchElement::new(Rc::clone(texture), blend, triangle())
    }

    fn renderer(max_textures: usize) -> BatchRenderer {
        BatchRenderer::new(BatchConfig { max_textures, can_upload_same_buffer: None })
    }

    #[test]
    fn empty_queue_does_nothing() {
        let mut r = renderer(4);
        let mut backend = recorder();
        assert_eq!(r.flush(&mut backend), FlushStats::default());
        assert!(backend.uploads.is_empty());
        assert!(backend.draws.is_empty());
    }

    #[test]
    fn textures_share_one_group_under_the_unit_limit() {
        let (t1, t2) = (texture(4), texture(8));
        let mut r = renderer(2);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));

        let mut backend = recorder();
        let stats = r.flush(&mut backend);

        assert_eq!(stats.draw_calls, 1);
        let call = &r.draw_calls()[0];
        assert_eq!((call.start, call.size), (0, 9));
        assert_eq!(call.textures.len(), 2);
        assert!(Rc::ptr_eq(&call.textures[0], &t1));
        assert!(Rc::ptr_eq(&call.textures[1], &t2));

        // submission order, with the unit of each shape's texture
        let units: Vec<f32> = backend.vertices.iter().map(|v| v.texture_unit).collect();
        assert_eq!(units, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(backend.uploads[0].2, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn blend_change_forces_a_new_group() {
        let t1 = texture(4);
        let mut r = renderer(8);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t1, BlendMode::Add));

        let mut backend = recorder();
        r.flush(&mut backend);

        assert_eq!(backend.draws.len(), 2);
        assert_eq!((backend.draws[0].0, backend.draws[0].1), (0, 3));
        assert_eq!(backend.draws[0].2, BlendMode::Normal);
        assert_eq!((backend.draws[1].0, backend.draws[1].1), (3, 3));
        assert_eq!(backend.draws[1].2, BlendMode::Add);
        // the texture is rebound for the second group
        assert_eq!(backend.binds, vec![(0, t1.id()), (0, t1.id())]);
    }

    #[test]
    fn blend_break_and_unit_limit_on_the_same_shape() {
        let (t1, t2, t3) = (texture(4), texture(4), texture(4));
        let mut r = renderer(2);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));
        r.render(shape(&t3, BlendMode::Add));
        r.render(shape(&t1, BlendMode::Add));
        r.render(shape(&t2, BlendMode::Add));

        let mut backend = recorder();
        r.flush(&mut backend);

        let draws: Vec<_> = backend.draws.iter().map(|d| (d.0, d.1, d.2)).collect();
        assert_eq!(
            draws,
            vec![(0, 6, BlendMode::Normal), (6, 6, BlendMode::Add), (12, 3, BlendMode::Add)]
        );
        let counts: Vec<usize> = r.draw_calls().iter().map(DrawCall::texture_count).collect();
        assert_eq!(counts, vec![2, 2, 1]);

        let units: Vec<f32> = backend.vertices.iter().step_by(3).map(|v| v.texture_unit).collect();
        assert_eq!(units, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unit_limit_splits_groups() {
        let (t1, t2) = (texture(4), texture(4));
        let mut r = renderer(1);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));

        let mut backend = recorder();
        r.flush(&mut backend);

        let ranges: Vec<_> = r.draw_calls().iter().map(DrawCall::range).collect();
        assert_eq!(ranges, vec![0..3, 3..9]);
    }

    #[test]
    fn returning_texture_reuses_its_slot() {
        let (t1, t2) = (texture(4), texture(4));
        let mut r = renderer(4);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));
        r.render(shape(&t1, BlendMode::Normal));

        let mut backend = recorder();
        r.flush(&mut backend);

        assert_eq!(r.draw_calls().len(), 1);
        assert_eq!(r.draw_calls()[0].texture_count(), 2);
        let units: Vec<f32> = backend.vertices.iter().step_by(3).map(|v| v.texture_unit).collect();
        assert_eq!(units, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_shapes_are_not_queued() {
        let t1 = texture(4);
        let mut r = renderer(4);
        let empty = BatchElement::new(Rc::clone(&t1), BlendMode::Normal, Rc::new(BatchGeometry::default()));
        assert!(!r.render(empty));
        assert!(r.queue().is_empty());
    }

    #[test]
    fn destroyed_textures_are_skipped() {
        let (t1, t2) = (texture(4), texture(4));
        t2.destroy();
        let mut r = renderer(4);
        r.render(shape(&t2, BlendMode::Normal));
        r.render(shape(&t1, BlendMode::Normal));

        let mut backend = recorder();
        let stats = r.flush(&mut backend);
        assert_eq!(stats.indices, 3);
        assert_eq!(backend.binds, vec![(0, t1.id())]);
    }

    #[test]
    fn sampler_sizes_follow_bound_textures() {
        let (t1, t2) = (texture(64), texture(128));
        let mut r = renderer(4);
        r.render(shape(&t1, BlendMode::Normal));
        r.render(shape(&t2, BlendMode::Normal));

        let mut backend = recorder();
        r.flush(&mut backend);
        assert_eq!(backend.draws[0].3, vec![[1.0 / 64.0, 1.0 / 64.0], [1.0 / 128.0, 1.0 / 128.0]]);
    }

    #[test]
    fn buffer_pool_round_robins_without_reuse() {
        let t1 = texture(4);
        let mut r = renderer(4);
        let mut backend = Recorder::default();

        r.begin_frame();
        for _ in 0..3 {
            r.render(shape(&t1, BlendMode::Normal));
            r.flush(&mut backend);
        }
        let slots: Vec<usize> = backend.uploads.iter().map(|u| u.0).collect();
        assert_eq!(slots, vec![0, 1, 2]);
        assert_eq!(r.pool_size(), 3);

        r.begin_frame();
        r.render(shape(&t1, BlendMode::Normal));
        assert_eq!(r.flush(&mut backend).buffer_slot, 0);
        assert_eq!(r.pool_size(), 3);
    }

    #[test]
    fn buffer_pool_wraps_when_frames_are_not_started() {
        let t1 = texture(4);
        let mut r = renderer(4);
        let mut backend = Recorder::default();

        let slots: Vec<usize> = (0..50)
            .map(|_| {
                r.render(shape(&t1, BlendMode::Normal));
                r.flush(&mut backend).buffer_slot
            })
            .collect();

        assert_eq!(r.pool_size(), MAX_POOL_BUFFERS);
        assert_eq!(slots[MAX_POOL_BUFFERS - 1], MAX_POOL_BUFFERS - 1);
        assert_eq!(slots[MAX_POOL_BUFFERS], 0);
        assert!(slots.iter().all(|&slot| slot < MAX_POOL_BUFFERS));
    }

    #[test]
    fn config_override_beats_backend_report() {
        let t1 = texture(4);
        let mut r = BatchRenderer::new(BatchConfig { max_textures: 4, can_upload_same_buffer: Some(true) });
        let mut backend = Recorder::default();
        for _ in 0..2 {
            r.render(shape(&t1, BlendMode::Normal));
            assert_eq!(r.flush(&mut backend).buffer_slot, 0);
        }
    }

    #[test]
    fn bound_textures_are_touched_with_the_frame() {
        let t1 = texture(4);
        let mut r = renderer(4);
        r.begin_frame();
        r.begin_frame();
        r.render(shape(&t1, BlendMode::Normal));
        r.flush(&mut recorder());
        assert_eq!(t1.touched(), 2);
    }

    #[test]
    fn epoch_only_grows() {
        let t1 = texture(4);
        let mut r = renderer(4);
        let mut backend = recorder();
        let mut last = r.epoch();
        for _ in 0..3 {
            r.render(shape(&t1, BlendMode::Normal));
            r.flush(&mut backend);
            assert!(r.epoch() > last);
            last = r.epoch();
        }
        assert!(r.queue().is_empty());
    }

    #[test]
    fn max_textures_is_at_least_one() {
        let r = renderer(0);
        assert_eq!(r.config().max_textures, 1);
        assert_eq!(r.shader().max_textures(), 1);
    }
}
