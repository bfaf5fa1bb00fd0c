use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use super::templates::{FRAGMENT_TEMPLATE, VERTEX_TEMPLATE};

/// Binding index of the first texture unit; units follow consecutively.
pub const FIRST_TEXTURE_BINDING: u32 = 2;

/// Generated vertex/fragment source pair for a fixed texture-unit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub max_textures: usize,
    pub vertex: String,
    pub fragment: String,
}

/// Per-shader uniform values.
///
/// `sampler_sizes[i]` holds `(1 / width, 1 / height)` of the texture bound
/// to unit `i`; the batch renderer rewrites it before every draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderUniforms {
    pub tint: [f32; 4],
    /// Column-major 4×4.
    pub translation_matrix: [f32; 16],
    pub sampler_units: Vec<i32>,
    pub sampler_sizes: Vec<[f32; 2]>,
}

impl ShaderUniforms {
    fn new(max_textures: usize) -> Self {
        Self {
            tint: [1.0; 4],
            translation_matrix: IDENTITY,
            sampler_units: (0..max_textures as i32).collect(),
            sampler_sizes: vec![[0.0; 2]; max_textures],
        }
    }
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// A cached program plus a fresh set of uniforms.
#[derive(Debug, Clone)]
pub struct Shader {
    pub program: Rc<ProgramSource>,
    pub uniforms: ShaderUniforms,
}

impl Shader {
    #[inline]
    pub fn max_textures(&self) -> usize {
        self.program.max_textures
    }
}

/// Builds palette batch programs and caches them by texture-unit count.
#[derive(Debug)]
pub struct ShaderGenerator {
    vertex_template: String,
    fragment_template: String,
    programs: HashMap<usize, Rc<ProgramSource>>,
}

impl Default for ShaderGenerator {
    fn default() -> Self {
        Self::new(VERTEX_TEMPLATE, FRAGMENT_TEMPLATE)
    }
}

impl ShaderGenerator {
    pub fn new(vertex_template: impl Into<String>, fragment_template: impl Into<String>) -> Self {
        Self {
            vertex_template: vertex_template.into(),
            fragment_template: fragment_template.into(),
            programs: HashMap::new(),
        }
    }

    /// Returns the program for `max_textures` units (generated on first use)
    /// with default uniforms. `max_textures` below one is treated as one.
    pub fn generate_shader(&mut self, max_textures: usize) -> Shader {
        let max_textures = max_textures.max(1);
        let program = match self.programs.get(&max_textures) {
            Some(program) => Rc::clone(program),
            None => {
                log::debug!("generating palette program for {max_textures} texture units");
                let program = Rc::new(self.build_program(max_textures));
                self.programs.insert(max_textures, Rc::clone(&program));
                program
            }
        };

        Shader { program, uniforms: ShaderUniforms::new(max_textures) }
    }

    /// Number of cached programs.
    #[inline]
    pub fn cached_programs(&self) -> usize {
        self.programs.len()
    }

    fn build_program(&self, max_textures: usize) -> ProgramSource {
        let count = max_textures.to_string();
        let vertex = self
            .vertex_template
            .replace("%count%", &count)
            .replace("%samplers%", &generate_sampler_decls(max_textures))
            .replace("%data_loop%", &generate_sample_src(max_textures));
        let fragment = self.fragment_template.replace("%count%", &count);

        ProgramSource { max_textures, vertex, fragment }
    }
}

/// Texture declarations for units `0..max_textures`.
pub fn generate_sampler_decls(max_textures: usize) -> String {
    let mut src = String::new();
    for i in 0..max_textures {
        let _ = writeln!(
            src,
            "layout(set = 0, binding = {}) uniform texture2D uSamplers{i};",
            FIRST_TEXTURE_BINDING as usize + i
        );
    }
    src
}

/// The `if / else if` chain that reads fill, stroke color and stroke params
/// of the shape's palette cell from the unit selected by `aTextureId`.
///
/// The last unit is the unconditional `else` branch.
pub fn generate_sample_src(max_textures: usize) -> String {
    let mut src = String::from("\n");
    for i in 0..max_textures {
        src.push_str("    ");
        if i > 0 {
            src.push_str("else ");
        }
        if i + 1 < max_textures {
            let _ = write!(src, "if (aTextureId < {i}.5) ");
        }
        let _ = write!(
            src,
            "{{
        vec2 size = globals.uSamplersSize[{i}].xy;
        vec2 p = paletteCell(shapeId, size);
        fillColor = textureLod(sampler2D(uSamplers{i}, uPaletteSampler), p, 0.0);
        strokeColor = textureLod(sampler2D(uSamplers{i}, uPaletteSampler), p + vec2(size.x, 0.0), 0.0);
        strokeParams = textureLod(sampler2D(uSamplers{i}, uPaletteSampler), p + vec2(2.0 * size.x, 0.0), 0.0);
    }}
"
        );
    }
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_are_cached_by_texture_count() {
        let mut generator = ShaderGenerator::default();
        let a = generator.generate_shader(4);
        let b = generator.generate_shader(4);
        let c = generator.generate_shader(2);

        assert!(Rc::ptr_eq(&a.program, &b.program));
        assert!(!Rc::ptr_eq(&a.program, &c.program));
        assert_eq!(generator.cached_programs(), 2);
    }

    #[test]
    fn uniforms_are_fresh_per_call() {
        let mut generator = ShaderGenerator::default();
        let mut a = generator.generate_shader(3);
        a.uniforms.sampler_sizes[0] = [0.5, 0.5];
        let b = generator.generate_shader(3);
        assert_eq!(b.uniforms.sampler_sizes, vec![[0.0, 0.0]; 3]);
        assert_eq!(b.uniforms.sampler_units, vec![0, 1, 2]);
        assert_eq!(b.uniforms.tint, [1.0; 4]);
    }

    #[test]
    fn placeholders_are_substituted() {
        let mut generator = ShaderGenerator::default();
        let shader = generator.generate_shader(5);
        let vertex = &shader.program.vertex;
        assert!(!vertex.contains('%'));
        assert!(vertex.contains("uSamplersSize[5]"));
        assert!(vertex.contains("uniform texture2D uSamplers4;"));
        assert!(!vertex.contains("uSamplers5"));
        assert!(!shader.program.fragment.contains('%'));
    }

    #[test]
    fn sample_chain_has_one_branch_per_unit() {
        let src = generate_sample_src(3);
        assert_eq!(src.matches("fillColor =").count(), 3);
        assert!(src.contains("if (aTextureId < 0.5)"));
        assert!(src.contains("else if (aTextureId < 1.5)"));
        // last unit is the fallback branch
        assert!(!src.contains("aTextureId < 2.5"));
        assert!(src.contains("else {"));
    }

    #[test]
    fn single_unit_chain_is_unconditional() {
        let src = generate_sample_src(1);
        assert!(!src.contains("if"));
        assert!(src.contains("uSamplers0"));
    }

    #[test]
    fn zero_units_clamps_to_one() {
        let mut generator = ShaderGenerator::default();
        assert_eq!(generator.generate_shader(0).max_textures(), 1);
    }

    #[test]
    fn custom_templates_get_count() {
        let mut generator = ShaderGenerator::new("v %count%", "f %count%");
        let shader = generator.generate_shader(7);
        assert_eq!(shader.program.vertex, "v 7");
        assert_eq!(shader.program.fragment, "f 7");
    }

    fn parse(stage: naga::ShaderStage, source: &str) {
        let mut frontend = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options::from(stage);
        frontend.parse(&options, source).unwrap_or_else(|errors| {
            panic!("{stage:?} program failed to parse: {}", errors.emit_to_string(source))
        });
    }

    #[test]
    fn generated_programs_parse() {
        let mut generator = ShaderGenerator::default();
        for units in [1, 2, 8] {
            let shader = generator.generate_shader(units);
            parse(naga::ShaderStage::Vertex, &shader.program.vertex);
            parse(naga::ShaderStage::Fragment, &shader.program.fragment);
        }
    }
}
