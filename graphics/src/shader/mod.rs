//! Shader programs and reflection.
//!
//! # Overview
//!
//! A [`ShaderProgram`] is built from a [`ShaderDescriptor`]: WGSL vertex and
//! fragment sources plus initial render state. Building parses and validates both
//! sources with naga, reflects their inputs, and links the program on the backend.
//! Reflection happens exactly once per successful build or
//! [`rebuild`](ShaderProgram::rebuild).
//!
//! Uniforms named with the `g_` prefix are engine-managed (see [`GlobalRole`]): the
//! render pass computes and pushes them, and they never appear among a material's
//! uniforms. Everything else is a material uniform.
//!
//! # Example
//!
//! ```ignore
//! let shader = ShaderProgram::new(
//!     &context,
//!     ShaderDescriptor::new(vertex_wgsl, fragment_wgsl)
//!         .with_flags(RenderStateFlags::DEPTH_TEST | RenderStateFlags::DEPTH_WRITE)
//!         .with_label("terrain"),
//! )?;
//!
//! for name in shader.material_uniform_names() {
//!     println!("material uniform: {name}");
//! }
//! ```

mod error;
mod reflection;
mod standard;
mod uniform;

use std::sync::Arc;

use kestrel_core::profiling::{profile_message, profile_scope};
use parking_lot::RwLock;

use crate::backend::{ProgramDescriptor, ProgramHandle};
use crate::context::RenderContext;
use crate::device::{GraphicsDevice, ResourceId};
use crate::mesh::Mesh;

pub use error::ShaderError;
pub use reflection::{compile_stage, reflect, ShaderReflection, RESERVED_ATTRIBUTES};
pub use standard::StandardShader;
pub use uniform::{
    AttributeInfo, GlobalBindings, GlobalRole, ShaderStageFlags, UniformId, UniformInfo,
    UniformType,
};

bitflags::bitflags! {
    /// Fixed-function depth state of a program.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderStateFlags: u32 {
        /// Reject fragments behind the depth buffer.
        const DEPTH_TEST = 1 << 0;
        /// Write fragment depth.
        const DEPTH_WRITE = 1 << 1;
    }
}

impl Default for RenderStateFlags {
    fn default() -> Self {
        Self::DEPTH_TEST | Self::DEPTH_WRITE
    }
}

/// Color blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending.
    #[default]
    Disabled,
    /// `src * alpha + dst * (1 - alpha)`.
    AlphaBlending,
    /// `src + dst`.
    Additive,
}

/// Render state applied whenever the program is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderState {
    pub flags: RenderStateFlags,
    pub blend: BlendMode,
}

/// Descriptor for building a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub vertex_source: String,
    pub fragment_source: String,
    pub state: RenderState,
    pub label: Option<String>,
}

impl ShaderDescriptor {
    /// Describe a program from WGSL sources with depth test and write enabled.
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            state: RenderState::default(),
            label: None,
        }
    }

    /// Set the depth flags.
    pub fn with_flags(mut self, flags: RenderStateFlags) -> Self {
        self.state.flags = flags;
        self
    }

    /// Set the blend mode.
    pub fn with_blend_mode(mut self, blend: BlendMode) -> Self {
        self.state.blend = blend;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

struct ProgramState {
    handle: ProgramHandle,
    reflection: Arc<ShaderReflection>,
    descriptor: ShaderDescriptor,
    generation: u64,
}

/// What a draw needs from a program, taken under one lock.
#[derive(Debug, Clone)]
pub(crate) struct ProgramSnapshot {
    pub handle: ProgramHandle,
    pub state: RenderState,
    pub generation: u64,
    pub reflection: Arc<ShaderReflection>,
}

/// A linked GPU program and its reflection.
///
/// Programs are reference-counted; dropping the last reference destroys the
/// backend program and forgets every cached mesh binding made for it.
pub struct ShaderProgram {
    device: Arc<GraphicsDevice>,
    id: ResourceId,
    state: RwLock<ProgramState>,
}

impl ShaderProgram {
    /// Build, reflect and link a program.
    ///
    /// # Errors
    ///
    /// Returns the parse, validation, reflection or link diagnostic. No program
    /// exists after a failure.
    pub fn new(
        context: &RenderContext,
        descriptor: ShaderDescriptor,
    ) -> Result<Arc<Self>, ShaderError> {
        let device = Arc::clone(context.device());
        let (handle, reflection) = build(&device, &descriptor)?;

        device.update_stats(|stats| stats.shaders += 1);
        log::debug!(
            "ShaderProgram: built {:?} ({} attributes, {} uniforms)",
            descriptor.label,
            reflection.attributes().len(),
            reflection.uniforms().len()
        );

        Ok(Arc::new(Self {
            id: device.allocate_id(),
            device,
            state: RwLock::new(ProgramState {
                handle,
                reflection: Arc::new(reflection),
                descriptor,
                generation: 0,
            }),
        }))
    }

    /// Rebuild the program in place from new sources.
    ///
    /// On success the generation is bumped, so materials and cached mesh bindings
    /// re-derive against the new reflection. On failure the previous program and
    /// reflection stay in use.
    pub fn rebuild(&self, descriptor: ShaderDescriptor) -> Result<(), ShaderError> {
        let (handle, reflection) = build(&self.device, &descriptor)?;

        let old_handle = {
            let mut state = self.state.write();
            let old = state.handle;
            state.handle = handle;
            state.reflection = Arc::new(reflection);
            state.descriptor = descriptor;
            state.generation += 1;
            old
        };

        self.device.forget_program(old_handle);
        self.device.backend().destroy_program(old_handle);
        self.device.purge_shader_bindings(self.id);
        profile_message!("shader rebuilt");
        log::debug!(
            "ShaderProgram: rebuilt {:?} (generation {})",
            self.label(),
            self.generation()
        );
        Ok(())
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Incremented by every successful rebuild.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn label(&self) -> Option<String> {
        self.state.read().descriptor.label.clone()
    }

    pub fn render_state(&self) -> RenderState {
        self.state.read().descriptor.state
    }

    /// Change depth/blend state without rebuilding.
    pub fn set_render_state(&self, state: RenderState) {
        self.state.write().descriptor.state = state;
    }

    /// Sources and state the current program was built from.
    pub fn descriptor(&self) -> ShaderDescriptor {
        self.state.read().descriptor.clone()
    }

    /// Reflection of the current program.
    pub fn reflection(&self) -> Arc<ShaderReflection> {
        Arc::clone(&self.state.read().reflection)
    }

    /// Vertex input names in declaration order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.state
            .read()
            .reflection
            .attributes()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Names of the uniforms a material can set.
    pub fn material_uniform_names(&self) -> Vec<String> {
        self.state
            .read()
            .reflection
            .material_uniforms()
            .map(|u| u.name.clone())
            .collect()
    }

    /// Look up any declared uniform.
    pub fn uniform(&self, name: &str) -> Option<UniformInfo> {
        self.state.read().reflection.uniform(name).cloned()
    }

    /// Uniform id bound to an engine role, if declared.
    pub fn global_uniform(&self, role: GlobalRole) -> Option<UniformId> {
        self.state.read().reflection.globals().get(role)
    }

    /// Check that `mesh` supplies every vertex input of this program.
    ///
    /// Drawing never fails on a mismatch (missing inputs get a constant default);
    /// this lists the mismatches that silent defaulting would hide.
    pub fn validate_mesh(&self, mesh: &Mesh) -> Result<(), String> {
        let reflection = self.reflection();
        let problems: Vec<String> = reflection
            .attributes()
            .iter()
            .filter_map(|attribute| match mesh.attribute_kind(&attribute.name) {
                None => Some(format!(
                    "missing attribute '{}' ({}x {:?})",
                    attribute.name, attribute.components, attribute.scalar_kind
                )),
                Some(kind) if !attribute.accepts(kind) => Some(format!(
                    "attribute '{}' is {:?}, shader expects {}x {:?}",
                    attribute.name, kind, attribute.components, attribute.scalar_kind
                )),
                Some(_) => None,
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "mesh {:?} does not match shader {:?}: {}",
                mesh.name(),
                self.label(),
                problems.join("; ")
            ))
        }
    }

    pub(crate) fn snapshot(&self) -> ProgramSnapshot {
        let state = self.state.read();
        ProgramSnapshot {
            handle: state.handle,
            state: state.descriptor.state,
            generation: state.generation,
            reflection: Arc::clone(&state.reflection),
        }
    }
}

fn build(
    device: &GraphicsDevice,
    descriptor: &ShaderDescriptor,
) -> Result<(ProgramHandle, ShaderReflection), ShaderError> {
    profile_scope!("shader_build");

    let result = compile_stage("vertex", &descriptor.vertex_source)
        .and_then(|vertex| {
            let fragment = compile_stage("fragment", &descriptor.fragment_source)?;
            reflect(&vertex, &fragment)
        })
        .and_then(|reflection| {
            let handle = device.backend().create_program(&ProgramDescriptor {
                label: descriptor.label.as_deref(),
                vertex_source: &descriptor.vertex_source,
                fragment_source: &descriptor.fragment_source,
                attributes: reflection.attributes(),
                uniforms: reflection.uniforms(),
                state: descriptor.state,
            })?;
            Ok((handle, reflection))
        });

    if let Err(e) = &result {
        log::error!("Shader {:?} failed to build: {}", descriptor.label, e);
    }
    result
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        let handle = self.state.get_mut().handle;
        self.device.forget_program(handle);
        self.device.backend().destroy_program(handle);
        self.device.purge_shader_bindings(self.id);
        self.device
            .update_stats(|stats| stats.shaders = stats.shaders.saturating_sub(1));
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("label", &state.descriptor.label)
            .field("generation", &state.generation)
            .field("attributes", &state.reflection.attributes().len())
            .field("uniforms", &state.reflection.uniforms().len())
            .finish()
    }
}

// Ensure ShaderProgram is Send + Sync
static_assertions::assert_impl_all!(ShaderProgram: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return g_model * vec4<f32>(position, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint;
}
"#;

    fn create_test_context() -> (Arc<DummyBackend>, RenderContext) {
        let backend = Arc::new(DummyBackend::new());
        let context = RenderContext::new(backend.clone());
        (backend, context)
    }

    #[test]
    fn test_shader_build() {
        let (_backend, context) = create_test_context();
        let shader = ShaderProgram::new(
            &context,
            ShaderDescriptor::new(VERTEX, FRAGMENT).with_label("test"),
        )
        .unwrap();

        assert_eq!(shader.material_uniform_names(), vec!["tint".to_string()]);
        assert_eq!(shader.attribute_names(), vec!["position".to_string()]);
        assert!(shader.global_uniform(GlobalRole::Model).is_some());
        assert_eq!(shader.generation(), 0);
        assert_eq!(context.stats().shaders, 1);
    }

    #[test]
    fn test_link_failure_reported() {
        let (backend, context) = create_test_context();
        backend.fail_next_program("undefined varying");
        let err =
            ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
        assert!(err.to_string().contains("undefined varying"));
        assert_eq!(context.stats().shaders, 0);
    }

    #[test]
    fn test_rebuild_failure_keeps_previous() {
        let (_backend, context) = create_test_context();
        let shader = ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap();
        let before = shader.reflection();

        let result = shader.rebuild(ShaderDescriptor::new("not wgsl", FRAGMENT));
        assert!(matches!(result, Err(ShaderError::Parse { .. })));
        assert_eq!(shader.generation(), 0);
        assert_eq!(*shader.reflection(), *before);
    }

    #[test]
    fn test_rebuild_success_bumps_generation() {
        let (backend, context) = create_test_context();
        let shader = ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap();
        let old_handle = shader.snapshot().handle;

        let fragment = r#"
@group(1) @binding(0) var<uniform> brightness: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(brightness);
}
"#;
        shader.rebuild(ShaderDescriptor::new(VERTEX, fragment)).unwrap();
        assert_eq!(shader.generation(), 1);
        assert_eq!(shader.material_uniform_names(), vec!["brightness".to_string()]);
        assert!(backend
            .commands()
            .contains(&crate::backend::BackendCommand::DestroyProgram(old_handle)));
    }

    #[test]
    fn test_drop_destroys_program() {
        let (backend, context) = create_test_context();
        let shader = ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap();
        let handle = shader.snapshot().handle;
        drop(shader);
        assert!(backend
            .commands()
            .contains(&crate::backend::BackendCommand::DestroyProgram(handle)));
        assert_eq!(context.stats().shaders, 0);
    }
}
