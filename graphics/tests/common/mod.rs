//! Common utilities for render integration tests.
//!
//! Every test runs against the recording dummy backend, so assertions are made on
//! the exact command stream the core produced.

#![allow(dead_code)]

use std::sync::Arc;

use kestrel_graphics::backend::{BackendCommand, BufferHandle, UniformData};
use kestrel_graphics::shader::UniformId;
use kestrel_graphics::{
    ContextParameters, DummyBackend, Mesh, MeshDescriptor, RenderContext, ShaderDescriptor,
    ShaderProgram,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Test Context
// ============================================================================

/// A render context on a dummy backend the test can inspect.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub context: RenderContext,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_parameters(ContextParameters::default())
    }

    pub fn with_parameters(parameters: ContextParameters) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let context = RenderContext::new(backend.clone()).with_parameters(parameters);
        Self { backend, context }
    }

    pub fn mesh(&self, descriptor: MeshDescriptor) -> Arc<Mesh> {
        Mesh::new(&self.context, descriptor).expect("Failed to create mesh")
    }

    pub fn shader(&self, vertex: &str, fragment: &str) -> Arc<ShaderProgram> {
        ShaderProgram::new(&self.context, ShaderDescriptor::new(vertex, fragment))
            .expect("Failed to build shader")
    }

    /// Drop every recorded command.
    pub fn clear_commands(&self) {
        self.backend.clear_commands();
    }

    pub fn commands(&self) -> Vec<BackendCommand> {
        self.backend.commands()
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendCommand) -> bool) -> usize {
        self.backend.commands().iter().filter(|c| predicate(c)).count()
    }

    /// Current bytes of a vertex buffer as little-endian `f32`s.
    pub fn buffer_floats(&self, buffer: BufferHandle) -> Vec<f32> {
        self.backend
            .buffer_data(buffer)
            .expect("buffer is not live")
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect()
    }

    /// Last value pushed to `uniform`.
    pub fn last_uniform(&self, uniform: UniformId) -> Option<UniformData> {
        self.backend.commands().into_iter().rev().find_map(|c| match c {
            BackendCommand::SetUniform {
                uniform: u, value, ..
            } if u == uniform => Some(value),
            _ => None,
        })
    }
}

// ============================================================================
// Shader Sources
// ============================================================================

/// Position plus color inputs, both transformed by every matrix role.
pub const COLOR_VS: &str = r#"
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

pub const COLOR_FS: &str = r#"
@group(1) @binding(0) var<uniform> brightness: f32;

@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color * brightness;
}
"#;

/// Fragment shader with a texture, a tint and a scalar.
pub const TEXTURED_FS: &str = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;
@group(1) @binding(1) var<uniform> brightness: f32;
@group(1) @binding(2) var albedo: texture_2d<f32>;
@group(1) @binding(3) var albedo_sampler: sampler;

@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color * tint * brightness * textureSample(albedo, albedo_sampler, vec2<f32>(0.5));
}
"#;
