//! # Kestrel Graphics
//!
//! Real-time rendering middle layer over an immediate-mode GPU backend.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderContext`] - Owner of the backend, frame boundaries and statistics
//! - [`Mesh`] - Named vertex attributes interleaved into one GPU buffer
//! - [`ShaderProgram`] - WGSL programs with reflected attributes and uniforms
//! - [`Material`] - Per-program uniform values with type-checked setters
//! - [`RenderPass`] - Camera, lights and draw submission with binding caching
//! - [`backend`] - The [`GpuBackend`] trait and the recording `dummy` backend
//!
//! ## Example
//!
//! ```ignore
//! use kestrel_graphics::{Material, Mesh, RenderContext, RenderPassBuilder, StandardShader};
//!
//! let context = RenderContext::new(Arc::new(DummyBackend::new()));
//! let mesh = Mesh::new(&context, generators::sphere(1.0, 32, 16))?;
//! let material = Material::new(&context, context.standard_shader(StandardShader::BlinnPhong)?)?;
//!
//! context.begin_frame();
//! let mut pass = RenderPassBuilder::new().with_camera(&camera).build(&context);
//! pass.draw(&mesh, Mat4::IDENTITY, &material)?;
//! pass.finish();
//! context.end_frame();
//! ```

pub mod backend;
mod binding;
mod context;
mod device;
mod error;
mod material;
mod mesh;
mod render_pass;
pub mod shader;
mod stats;
mod texture;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::DummyBackend;
pub use backend::{BackendError, GpuBackend};
pub use binding::{AttributeSource, BindingCacheStats, MeshBinding, SlotBinding};
pub use context::{ContextParameters, RenderContext};
pub use device::{GraphicsDevice, ResourceId};
pub use error::{GraphicsError, MaterialError, RenderError};
pub use material::{Material, UniformValue};
pub use mesh::Mesh;
pub use render_pass::{RenderPass, RenderPassBuilder};
pub use shader::{
    BlendMode, GlobalRole, RenderState, RenderStateFlags, ShaderDescriptor, ShaderError,
    ShaderProgram, StandardShader, UniformType,
};
pub use stats::RenderStats;
pub use texture::{Texture, TextureDescriptor, TextureFormat, TextureKind};

pub use kestrel_core::mesh::{
    generators, AttributeData, AttributeKind, IndexSet, InterleavedLayout, MeshDescriptor,
    MeshError, Topology,
};
pub use kestrel_core::scene::{Camera, Light, LightType, Projection, WorldLights, MAX_LIGHTS};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Only logs the version; contexts need no global setup.
pub fn init() {
    log::info!("Kestrel Graphics v{} initialized", VERSION);
}
