use std::fmt;

/// Error returned when a generated GLSL program does not compile.
#[derive(Debug, Clone)]
pub struct ShaderCompileError {
    pub stage: naga::ShaderStage,
    /// Rendered naga diagnostics.
    pub message: String,
}

impl fmt::Display for ShaderCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} shader compile error: {}", self.stage, self.message)
    }
}

impl std::error::Error for ShaderCompileError {}

/// Parses GLSL 450 source for `stage` into a naga module.
pub fn compile_glsl(stage: naga::ShaderStage, source: &str) -> Result<naga::Module, ShaderCompileError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage);
    frontend.parse(&options, source).map_err(|errors| ShaderCompileError {
        stage,
        message: errors.emit_to_string(source),
    })
}
