use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use anyhow::{Context, Result};

use crate::batch::{BatchVertex, DrawCall, DrawSink, TextureBinder, VertexSink};
use crate::coords::Viewport;
use crate::paint::BlendMode;
use crate::shader::{Shader, FIRST_TEXTURE_BINDING};
use crate::texture::{TextureHandle, TextureId};

use super::compile::{compile_glsl, ShaderCompileError};
use super::pipeline::{
    bind_group_layout_entries, blend_state, globals_size, pack_globals, vertex_layout,
};
use super::{RenderCtx, RenderTarget};

/// Initial vertex/index capacity of a pool buffer.
const MIN_BUFFER_ELEMENTS: usize = 256;

const ALL_BLEND_MODES: [BlendMode; 7] = [
    BlendMode::Normal,
    BlendMode::Add,
    BlendMode::Multiply,
    BlendMode::Screen,
    BlendMode::NormalNpm,
    BlendMode::AddNpm,
    BlendMode::ScreenNpm,
];

struct PooledBuffer {
    vbo: wgpu::Buffer,
    vbo_capacity: usize,
    ibo: wgpu::Buffer,
    ibo_capacity: usize,
}

struct GpuTexture {
    handle: Weak<TextureHandle>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    version: u64,
}

/// Compiled program for one texture-unit count.
struct Program {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

struct RecordedDraw {
    pipeline: (usize, BlendMode),
    bind_group: wgpu::BindGroup,
    buffer_slot: usize,
    range: std::ops::Range<u32>,
}

/// wgpu implementation of the batch capability traits.
///
/// `BatchRenderer::flush` records into this backend; [`encode`](Self::encode)
/// replays the recorded draws into a render pass. Buffer writes go through
/// the queue and land before the encoded pass executes, so every flush of a
/// frame needs its own pool buffer; the backend reports
/// `can_upload_same_buffer() == false` accordingly.
///
/// `TextureHandle`s are mirrored lazily: a GPU texture is created on first
/// bind and re-uploaded whenever the handle's version moves.
pub struct WgpuBatchBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    viewport: Viewport,

    sampler: wgpu::Sampler,
    fallback: GpuTexture,

    buffers: Vec<PooledBuffer>,
    active_buffer: usize,

    textures: HashMap<TextureId, GpuTexture>,
    bound: Vec<Option<TextureId>>,

    programs: HashMap<usize, Program>,
    pipelines: HashMap<(usize, BlendMode), wgpu::RenderPipeline>,
    failed_programs: Vec<usize>,

    recorded: Vec<RecordedDraw>,
}

impl WgpuBatchBackend {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("swatch palette sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let fallback = create_texture(ctx.device, 1, 1, "swatch fallback texture");

        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            surface_format: ctx.surface_format,
            viewport: ctx.viewport,
            sampler,
            fallback,
            buffers: Vec::new(),
            active_buffer: 0,
            textures: HashMap::new(),
            bound: Vec::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            failed_programs: Vec::new(),
            recorded: Vec::new(),
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Texture units the device can sample in one vertex stage.
    pub fn max_texture_units(&self) -> usize {
        self.device.limits().max_sampled_textures_per_shader_stage as usize
    }

    /// Buffers in the upload pool.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.buffers.len()
    }

    /// Draws recorded since the last [`encode`](Self::encode).
    #[inline]
    pub fn pending_draws(&self) -> usize {
        self.recorded.len()
    }

    /// Compiles `shader`'s program and builds its pipelines for every blend
    /// mode up front.
    pub fn prepare(&mut self, shader: &Shader) -> Result<()> {
        let units = shader.max_textures();
        anyhow::ensure!(
            units <= self.max_texture_units(),
            "{units} texture units requested, device supports {}",
            self.max_texture_units()
        );

        for mode in ALL_BLEND_MODES {
            self.ensure_pipeline(shader, mode)
                .with_context(|| format!("building {mode:?} pipeline for {units} texture units"))?;
        }
        Ok(())
    }

    /// Replays recorded draws into `target` and clears the recording.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) {
        if self.recorded.is_empty() {
            return;
        }

        {
            let mut rpass = target.begin_load_pass("swatch batch pass");

            for draw in &self.recorded {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline) else { continue };
                let Some(buffer) = self.buffers.get(draw.buffer_slot) else { continue };

                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &draw.bind_group, &[]);
                rpass.set_vertex_buffer(0, buffer.vbo.slice(..));
                rpass.set_index_buffer(buffer.ibo.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(draw.range.clone(), 0, 0..1);
            }
        }

        self.recorded.clear();
    }

    /// GPU textures currently mirrored.
    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Releases GPU mirrors whose handle is gone, was destroyed, or has not
    /// been bound for more than `max_idle` frames before `frame`.
    pub fn collect_textures(&mut self, frame: u64, max_idle: u64) {
        let before = self.textures.len();
        self.textures.retain(|_, gpu| {
            gpu.handle.upgrade().is_some_and(|handle| {
                !handle.is_destroyed() && handle.touched().saturating_add(max_idle) >= frame
            })
        });
        let released = before - self.textures.len();
        if released > 0 {
            log::debug!("released {released} GPU textures");
        }
    }

    fn ensure_program(&mut self, shader: &Shader) -> Result<(), ShaderCompileError> {
        let units = shader.max_textures();
        if self.programs.contains_key(&units) {
            return Ok(());
        }

        let vertex = compile_glsl(naga::ShaderStage::Vertex, &shader.program.vertex)?;
        let fragment = compile_glsl(naga::ShaderStage::Fragment, &shader.program.fragment)?;

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("swatch batch vertex"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vertex)),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("swatch batch fragment"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(fragment)),
        });

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("swatch batch bgl"),
                    entries: &bind_group_layout_entries(units),
                });

        let pipeline_layout =
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("swatch batch pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        self.programs.insert(
            units,
            Program { vertex, fragment, bind_group_layout, pipeline_layout },
        );
        Ok(())
    }

    fn ensure_pipeline(&mut self, shader: &Shader, blend: BlendMode) -> Result<(), ShaderCompileError> {
        let key = (shader.max_textures(), blend);
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        self.ensure_program(shader)?;
        let Some(program) = self.programs.get(&key.0) else { return Ok(()) };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("swatch batch pipeline"),
            layout: Some(&program.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(blend_state(blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn sync_texture(&mut self, handle: &Rc<TextureHandle>) {
        let gpu = self.textures.entry(handle.id()).or_insert_with(|| {
            let mut gpu =
                create_texture(&self.device, handle.width(), handle.height(), "swatch batch texture");
            gpu.handle = Rc::downgrade(handle);
            gpu
        });

        if gpu.version == handle.version() {
            return;
        }

        let pixels = handle.pixels();
        if pixels.is_empty() {
            return;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * handle.width()),
                rows_per_image: Some(handle.height()),
            },
            wgpu::Extent3d {
                width: handle.width(),
                height: handle.height(),
                depth_or_array_layers: 1,
            },
        );
        gpu.version = handle.version();
        log::trace!("uploaded texture {:?} v{}", handle.id(), handle.version());
    }

    fn ensure_buffer(&mut self, slot: usize, vertices: usize, indices: usize) {
        while self.buffers.len() <= slot {
            log::debug!("growing batch buffer pool to {}", self.buffers.len() + 1);
            let buffer = PooledBuffer {
                vbo: create_buffer(
                    &self.device,
                    (MIN_BUFFER_ELEMENTS * std::mem::size_of::<BatchVertex>()) as u64,
                    wgpu::BufferUsages::VERTEX,
                    "swatch batch vbo",
                ),
                vbo_capacity: MIN_BUFFER_ELEMENTS,
                ibo: create_buffer(
                    &self.device,
                    (MIN_BUFFER_ELEMENTS * std::mem::size_of::<u32>()) as u64,
                    wgpu::BufferUsages::INDEX,
                    "swatch batch ibo",
                ),
                ibo_capacity: MIN_BUFFER_ELEMENTS,
            };
            self.buffers.push(buffer);
        }

        let buffer = &mut self.buffers[slot];
        if vertices > buffer.vbo_capacity {
            let capacity = vertices.next_power_of_two();
            buffer.vbo = create_buffer(
                &self.device,
                (capacity * std::mem::size_of::<BatchVertex>()) as u64,
                wgpu::BufferUsages::VERTEX,
                "swatch batch vbo",
            );
            buffer.vbo_capacity = capacity;
        }
        if indices > buffer.ibo_capacity {
            let capacity = indices.next_power_of_two();
            buffer.ibo = create_buffer(
                &self.device,
                (capacity * std::mem::size_of::<u32>()) as u64,
                wgpu::BufferUsages::INDEX,
                "swatch batch ibo",
            );
            buffer.ibo_capacity = capacity;
        }
    }
}

impl VertexSink for WgpuBatchBackend {
    fn can_upload_same_buffer(&self) -> bool {
        false
    }

    fn upload(&mut self, slot: usize, vertices: &[BatchVertex], indices: &[u32]) {
        self.ensure_buffer(slot, vertices.len(), indices.len());
        let buffer = &self.buffers[slot];
        self.queue.write_buffer(&buffer.vbo, 0, bytemuck::cast_slice(vertices));
        self.queue.write_buffer(&buffer.ibo, 0, bytemuck::cast_slice(indices));
        self.active_buffer = slot;
    }
}

impl TextureBinder for WgpuBatchBackend {
    fn bind_texture(&mut self, unit: usize, texture: &Rc<TextureHandle>) {
        if texture.is_destroyed() {
            log::warn!("bind of destroyed texture {:?} ignored", texture.id());
            return;
        }
        self.sync_texture(texture);
        if self.bound.len() <= unit {
            self.bound.resize(unit + 1, None);
        }
        self.bound[unit] = Some(texture.id());
    }
}

impl DrawSink for WgpuBatchBackend {
    fn draw(&mut self, shader: &Shader, call: &DrawCall) {
        let key = (shader.max_textures(), call.blend);
        if self.failed_programs.contains(&key.0) {
            return;
        }
        if let Err(err) = self.ensure_pipeline(shader, call.blend) {
            log::error!("{err}");
            self.failed_programs.push(key.0);
            return;
        }
        let Some(program) = self.programs.get(&key.0) else { return };

        let globals = pack_globals(&self.viewport.projection(), &shader.uniforms);
        let ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("swatch batch globals"),
            size: globals_size(key.0),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&ubo, 0, bytemuck::cast_slice(&globals));

        let views: Vec<&wgpu::TextureView> = (0..key.0)
            .map(|unit| {
                let bound = if unit < call.texture_count() {
                    self.bound.get(unit).copied().flatten()
                } else {
                    None
                };
                bound
                    .and_then(|id| self.textures.get(&id))
                    .map_or(&self.fallback.view, |t| &t.view)
            })
            .collect();

        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        entries.extend(views.iter().enumerate().map(|(i, &view)| wgpu::BindGroupEntry {
            binding: FIRST_TEXTURE_BINDING + i as u32,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("swatch batch bind group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        self.recorded.push(RecordedDraw {
            pipeline: key,
            bind_group,
            buffer_slot: self.active_buffer,
            range: call.range(),
        });
        self.bound.clear();
    }
}

fn create_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        // Palette bytes are raw data, not sRGB-encoded color.
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { handle: Weak::new(), texture, view, version: 0 }
}

fn create_buffer(device: &wgpu::Device, size: u64, usage: wgpu::BufferUsages, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
