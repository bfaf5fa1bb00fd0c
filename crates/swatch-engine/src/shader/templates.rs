//! GLSL 450 templates for the palette batch program.
//!
//! Placeholders:
//! - `%count%`     number of texture units
//! - `%samplers%`  per-unit texture declarations
//! - `%data_loop%` per-unit palette lookup chain
//!
//! Bindings (set 0): 0 = `Globals` uniform block, 1 = palette sampler,
//! `2 + i` = texture unit `i`.

pub(super) const VERTEX_TEMPLATE: &str = r#"#version 450

layout(location = 0) in vec2 aVertexPosition;
layout(location = 1) in vec2 aTextureCoord;
layout(location = 2) in vec4 aColor;
layout(location = 3) in float aTextureId;

layout(set = 0, binding = 0) uniform Globals {
    mat4 projectionMatrix;
    mat4 translationMatrix;
    vec4 tint;
    vec4 uSamplersSize[%count%];
} globals;

layout(set = 0, binding = 1) uniform sampler uPaletteSampler;
%samplers%
layout(location = 0) out vec2 vTextureCoord;
layout(location = 1) out vec4 vColor;
layout(location = 2) out vec4 vFillColor;
layout(location = 3) out vec4 vStrokeColor;
layout(location = 4) out vec4 vStrokeData;

// (r, g, b, a) -> g * 256 + b, all channels normalized from bytes.
const vec4 cColor2ID = vec4(0.0, 256.0 * 255.0, 255.0, 0.0);

vec2 paletteCell(float shapeId, vec2 size) {
    float perRow = floor(1.0 / (size.x * 4.0) + 0.5);
    vec2 cell = vec2(4.0 * mod(shapeId, perRow), floor(shapeId / perRow));
    return size * (cell + 0.5);
}

void main() {
    vec4 world = globals.translationMatrix * vec4(aVertexPosition, 0.0, 1.0);
    gl_Position = globals.projectionMatrix * world;

    float shapeId = floor(dot(aColor, cColor2ID) + 0.5);

    vec4 fillColor = vec4(0.0);
    vec4 strokeColor = vec4(0.0);
    vec4 strokeParams = vec4(0.0);
%data_loop%
    vFillColor = fillColor;
    vStrokeColor = strokeColor;
    vStrokeData = vec4(aColor.r, strokeParams.x, strokeParams.y, 0.0);
    vTextureCoord = aTextureCoord;
    vColor = globals.tint;
}
"#;

pub(super) const FRAGMENT_TEMPLATE: &str = r#"#version 450

layout(location = 0) in vec2 vTextureCoord;
layout(location = 1) in vec4 vColor;
layout(location = 2) in vec4 vFillColor;
layout(location = 3) in vec4 vStrokeColor;
layout(location = 4) in vec4 vStrokeData;

layout(location = 0) out vec4 fragColor;

void main() {
    vec2 uv = vTextureCoord;

    float width = vStrokeData.y;
    float factor = abs(uv.y - 0.5) * 2.0;
    float gap = max(0.075, width * 0.1);

    vec4 stroke = vStrokeColor * (1.0 - smoothstep(width - gap, width + gap, factor));

    fragColor = vColor * mix(vFillColor, stroke, vStrokeData.x);
}
"#;
