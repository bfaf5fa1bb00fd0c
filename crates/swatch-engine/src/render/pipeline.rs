//! Pipeline building blocks for the palette batch program.

use std::num::NonZeroU64;

use crate::batch::BatchVertex;
use crate::paint::BlendMode;
use crate::shader::{ShaderUniforms, FIRST_TEXTURE_BINDING};

// ── blend ─────────────────────────────────────────────────────────────────

fn component(src: wgpu::BlendFactor, dst: wgpu::BlendFactor) -> wgpu::BlendComponent {
    wgpu::BlendComponent { src_factor: src, dst_factor: dst, operation: wgpu::BlendOperation::Add }
}

/// wgpu blend state for `mode`. Base modes expect premultiplied color,
/// `*Npm` modes straight alpha.
pub(super) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::BlendFactor::{Dst, One, OneMinusSrc, OneMinusSrcAlpha, SrcAlpha};

    let over = component(One, OneMinusSrcAlpha);
    let (color, alpha) = match mode {
        BlendMode::Normal => (over, over),
        BlendMode::Add => (component(One, One), component(One, One)),
        BlendMode::Multiply => (component(Dst, OneMinusSrcAlpha), over),
        BlendMode::Screen => (component(One, OneMinusSrc), over),
        BlendMode::NormalNpm => (component(SrcAlpha, OneMinusSrcAlpha), over),
        BlendMode::AddNpm => (component(SrcAlpha, One), component(One, One)),
        BlendMode::ScreenNpm => (component(SrcAlpha, OneMinusSrc), over),
    };
    wgpu::BlendState { color, alpha }
}

// ── vertex layout ─────────────────────────────────────────────────────────

const VERTEX_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // uv
    2 => Unorm8x4,  // style color
    3 => Float32    // texture unit
];

pub(super) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BatchVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

// ── globals uniform ───────────────────────────────────────────────────────

/// `projectionMatrix` + `translationMatrix` + `tint`, in floats.
const GLOBALS_HEADER: usize = 16 + 16 + 4;

/// Byte size of the `Globals` block for `units` texture units (std140).
pub(super) fn globals_size(units: usize) -> u64 {
    ((GLOBALS_HEADER + 4 * units) * std::mem::size_of::<f32>()) as u64
}

/// Never zero: the header alone is 144 bytes.
pub(super) fn globals_min_binding_size(units: usize) -> Option<NonZeroU64> {
    NonZeroU64::new(globals_size(units))
}

/// Packs the `Globals` block. Each `uSamplersSize` entry is a padded vec4.
pub(super) fn pack_globals(projection: &[f32; 16], uniforms: &ShaderUniforms) -> Vec<f32> {
    let mut data = Vec::with_capacity(GLOBALS_HEADER + 4 * uniforms.sampler_sizes.len());
    data.extend_from_slice(projection);
    data.extend_from_slice(&uniforms.translation_matrix);
    data.extend_from_slice(&uniforms.tint);
    for [w, h] in &uniforms.sampler_sizes {
        data.extend_from_slice(&[*w, *h, 0.0, 0.0]);
    }
    data
}

// ── bind group layout ─────────────────────────────────────────────────────

pub(super) fn bind_group_layout_entries(units: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: globals_min_binding_size(units),
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
            count: None,
        },
    ];
    entries.extend((0..units).map(|i| wgpu::BindGroupLayoutEntry {
        binding: FIRST_TEXTURE_BINDING + i as u32,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }));
    entries
}
