// ============================================================================
// GPU SHADERS — all WGSL code kept inline for containment
// ============================================================================

// ============================================================================
// FULL-SCREEN QUAD — vertex stage shared by both blur passes
// ============================================================================
//
// Positions arrive already in clip space (corners at ±1), so the vertex
// stage is a pass-through.
pub const FULLSCREEN_QUAD_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}
"#;

// ============================================================================
// SEPARABLE BLUR — horizontal pass (capture → intermediate)
// ============================================================================
//
// 9 taps at radius 4, weight(i) = exp(-0.5 * i² / (r² * 0.5)).  The tap
// spacing is one texel scaled by `blur_strength`, so strength widens the
// kernel.  Sample coordinates are clamped to [0,1].
pub const HORIZONTAL_BLUR_SHADER: &str = r#"
struct BlurConstants {
    texture_size: vec2<f32>,
    blur_strength: f32,
    _pad: f32,
};

@group(0) @binding(0) var<uniform> constants: BlurConstants;
@group(0) @binding(1) var source_sampler: sampler;
@group(1) @binding(0) var source_texture: texture_2d<f32>;

struct FragmentInput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

const RADIUS: i32 = 4;

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let pixel_size = 1.0 / constants.texture_size.x;
    let r2 = f32(RADIUS * RADIUS);
    var color = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    var total_weight = 0.0;
    for (var i: i32 = -RADIUS; i <= RADIUS; i = i + 1) {
        let offset = f32(i);
        var sample_uv = in.uv + vec2<f32>(pixel_size * offset * constants.blur_strength, 0.0);
        sample_uv = clamp(sample_uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
        let weight = exp(-0.5 * (offset * offset) / (r2 * 0.5));
        color = color + textureSampleLevel(source_texture, source_sampler, sample_uv, 0.0) * weight;
        total_weight = total_weight + weight;
    }
    return color / total_weight;
}
"#;

// ============================================================================
// SEPARABLE BLUR — vertical pass (intermediate → result)
// ============================================================================
pub const VERTICAL_BLUR_SHADER: &str = r#"
struct BlurConstants {
    texture_size: vec2<f32>,
    blur_strength: f32,
    _pad: f32,
};

@group(0) @binding(0) var<uniform> constants: BlurConstants;
@group(0) @binding(1) var source_sampler: sampler;
@group(1) @binding(0) var source_texture: texture_2d<f32>;

struct FragmentInput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

const RADIUS: i32 = 4;

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let pixel_size = 1.0 / constants.texture_size.y;
    let r2 = f32(RADIUS * RADIUS);
    var color = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    var total_weight = 0.0;
    for (var i: i32 = -RADIUS; i <= RADIUS; i = i + 1) {
        let offset = f32(i);
        var sample_uv = in.uv + vec2<f32>(0.0, pixel_size * offset * constants.blur_strength);
        sample_uv = clamp(sample_uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
        let weight = exp(-0.5 * (offset * offset) / (r2 * 0.5));
        color = color + textureSampleLevel(source_texture, source_sampler, sample_uv, 0.0) * weight;
        total_weight = total_weight + weight;
    }
    return color / total_weight;
}
"#;
