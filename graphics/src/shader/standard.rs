//! Built-in shaders, created on demand by the render context.
//!
//! Each shader declares only the engine uniforms it needs; the render pass skips
//! the rest.

use super::{BlendMode, RenderStateFlags, ShaderDescriptor};
use kestrel_core::mesh::Topology;

/// Key for the context's standard shader registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardShader {
    /// Vertex color times a `tint` uniform.
    Unlit,
    /// Vertex color times `tint` times a texture.
    UnlitTextured,
    /// Per-pixel Blinn-Phong with the world lights.
    BlinnPhong,
    /// Colored point sprites with a per-vertex `size`.
    Particles,
    /// View-space normals as color.
    DebugNormals,
}

impl StandardShader {
    /// Every standard shader.
    pub const ALL: [StandardShader; 5] = [
        StandardShader::Unlit,
        StandardShader::UnlitTextured,
        StandardShader::BlinnPhong,
        StandardShader::Particles,
        StandardShader::DebugNormals,
    ];

    /// Debug label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unlit => "standard_unlit",
            Self::UnlitTextured => "standard_unlit_textured",
            Self::BlinnPhong => "standard_blinn_phong",
            Self::Particles => "standard_particles",
            Self::DebugNormals => "standard_debug_normals",
        }
    }

    /// Topology meshes drawn with this shader are expected to use.
    pub fn preferred_topology(&self) -> Topology {
        match self {
            Self::Particles => Topology::Points,
            _ => Topology::Triangles,
        }
    }

    /// Descriptor the context builds the shader from.
    pub fn descriptor(&self) -> ShaderDescriptor {
        let (vertex, fragment) = match self {
            Self::Unlit => (UNLIT_VS, UNLIT_FS),
            Self::UnlitTextured => (UNLIT_TEXTURED_VS, UNLIT_TEXTURED_FS),
            Self::BlinnPhong => (BLINN_PHONG_VS, BLINN_PHONG_FS),
            Self::Particles => (PARTICLES_VS, PARTICLES_FS),
            Self::DebugNormals => (DEBUG_NORMALS_VS, DEBUG_NORMALS_FS),
        };
        let descriptor = ShaderDescriptor::new(vertex, fragment).with_label(self.label());
        match self {
            Self::Particles => descriptor
                .with_flags(RenderStateFlags::DEPTH_TEST)
                .with_blend_mode(BlendMode::Additive),
            _ => descriptor,
        }
    }
}

const UNLIT_VS: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> g_projection: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = g_projection * g_view * g_model * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

const UNLIT_FS: &str = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color * tint;
}
"#;

const UNLIT_TEXTURED_VS: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> g_projection: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = g_projection * g_view * g_model * vec4<f32>(position, 1.0);
    out.color = color;
    out.uv = uv;
    return out;
}
"#;

const UNLIT_TEXTURED_FS: &str = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;
@group(1) @binding(1) var tex: texture_2d<f32>;
@group(1) @binding(2) var tex_sampler: sampler;

struct FragmentInput {
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    return in.color * tint * textureSample(tex, tex_sampler, in.uv);
}
"#;

const BLINN_PHONG_VS: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> g_projection: mat4x4<f32>;
@group(0) @binding(3) var<uniform> g_normal_matrix: mat3x3<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_position: vec3<f32>,
    @location(1) view_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let view_position = g_view * g_model * vec4<f32>(position, 1.0);
    out.clip_position = g_projection * view_position;
    out.view_position = view_position.xyz;
    out.view_normal = normalize(g_normal_matrix * normal);
    out.uv = uv;
    return out;
}
"#;

const BLINN_PHONG_FS: &str = r#"
@group(0) @binding(4) var<uniform> g_ambient_light: vec4<f32>;
@group(0) @binding(5) var<uniform> g_light_position_type: array<vec4<f32>, 4>;
@group(0) @binding(6) var<uniform> g_light_color_range: array<vec4<f32>, 4>;

@group(1) @binding(0) var<uniform> color: vec4<f32>;
@group(1) @binding(1) var<uniform> specularity: f32;
@group(1) @binding(2) var tex: texture_2d<f32>;
@group(1) @binding(3) var tex_sampler: sampler;

struct FragmentInput {
    @location(0) view_position: vec3<f32>,
    @location(1) view_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let albedo = color * textureSample(tex, tex_sampler, in.uv);
    let normal = normalize(in.view_normal);
    let to_eye = normalize(-in.view_position);

    var diffuse = vec3<f32>(0.0);
    var specular = vec3<f32>(0.0);
    for (var i = 0; i < 4; i = i + 1) {
        let position_type = g_light_position_type[i];
        let color_range = g_light_color_range[i];
        if (position_type.w > 1.5) {
            continue;
        }

        var to_light = -normalize(position_type.xyz);
        var attenuation = 1.0;
        if (position_type.w < 0.5) {
            let offset = position_type.xyz - in.view_position;
            let distance = length(offset);
            to_light = offset / max(distance, 0.0001);
            attenuation = clamp(1.0 - distance / color_range.w, 0.0, 1.0);
        }

        let n_dot_l = max(dot(normal, to_light), 0.0);
        diffuse = diffuse + color_range.rgb * n_dot_l * attenuation;

        if (specularity > 0.0 && n_dot_l > 0.0) {
            let half_vector = normalize(to_light + to_eye);
            let n_dot_h = max(dot(normal, half_vector), 0.0);
            specular = specular + color_range.rgb * pow(n_dot_h, specularity) * attenuation;
        }
    }

    let lit = albedo.rgb * (g_ambient_light.rgb + diffuse) + specular;
    return vec4<f32>(lit, albedo.a);
}
"#;

const PARTICLES_VS: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> g_projection: mat4x4<f32>;
@group(0) @binding(3) var<uniform> g_viewport: vec4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) point_size: f32,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) size: f32,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = g_projection * g_view * g_model * vec4<f32>(position, 1.0);
    out.color = color;
    // Pixel size at the viewport height, shrinking with distance.
    out.point_size = size * g_viewport.w * g_projection[1][1] / max(out.clip_position.w, 0.0001);
    return out;
}
"#;

const PARTICLES_FS: &str = r#"
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var tex_sampler: sampler;

struct FragmentInput {
    @location(0) color: vec4<f32>,
    @location(1) point_size: f32,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    return in.color * textureSample(tex, tex_sampler, vec2<f32>(0.5, 0.5));
}
"#;

const DEBUG_NORMALS_VS: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> g_projection: mat4x4<f32>;
@group(0) @binding(3) var<uniform> g_normal_matrix: mat3x3<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = g_projection * g_view * g_model * vec4<f32>(position, 1.0);
    out.view_normal = g_normal_matrix * normal;
    return out;
}
"#;

const DEBUG_NORMALS_FS: &str = r#"
@fragment
fn fs_main(@location(0) view_normal: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(normalize(view_normal) * 0.5 + 0.5, 1.0);
}
"#;
