//! GPU backend abstraction layer.
//!
//! The rendering core drives the GPU through the [`GpuBackend`] trait: an
//! immediate-mode, GL-shaped command surface. Every call executes before it
//! returns; there is no command recording or deferred submission at this level.
//!
//! # Available Backends
//!
//! - `dummy` (default): records every call as a [`BackendCommand`] instead of
//!   talking to a GPU, for tests and headless runs
//!
//! # Integer ids
//!
//! Programs are created from a [`ProgramDescriptor`] that already carries the
//! reflected attribute slots and uniform table. Later calls name uniforms by
//! [`UniformId`] and attributes by slot only, so a backend maps those integers to
//! its own locations once, at program creation.

#[cfg(feature = "dummy")]
pub mod dummy;
mod error;

use glam::{Mat3, Mat4, Vec3, Vec4};
use kestrel_core::mesh::{AttributeKind, Topology};
use kestrel_core::scene::PixelViewport;

use crate::shader::{AttributeInfo, RenderState, UniformId, UniformInfo};
use crate::texture::TextureDescriptor;

#[cfg(feature = "dummy")]
pub use dummy::{BackendCommand, DummyBackend};
pub use error::BackendError;

/// Handle to a backend buffer (vertex or index data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Handle to a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Handle to a linked backend program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// A uniform value as pushed to the GPU.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Whole `array<vec4<f32>, N>`, element 0 first.
    Vec4Array(Vec<Vec4>),
}

/// Everything a backend needs to create a program.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor<'a> {
    pub label: Option<&'a str>,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    /// Vertex inputs with their engine-assigned slots.
    pub attributes: &'a [AttributeInfo],
    /// Every uniform the program declares, engine-managed ones included.
    pub uniforms: &'a [UniformInfo],
    pub state: RenderState,
}

/// Immediate-mode GPU interface.
///
/// Implementations must be `Send + Sync`; the core still calls them from one
/// thread at a time.
pub trait GpuBackend: Send + Sync + 'static {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    // === Buffers ===

    fn create_vertex_buffer(
        &self,
        data: &[u8],
        label: Option<&str>,
    ) -> Result<BufferHandle, BackendError>;

    fn create_index_buffer(
        &self,
        indices: &[u32],
        label: Option<&str>,
    ) -> Result<BufferHandle, BackendError>;

    /// Replace the whole contents of a buffer (its size may change).
    fn update_buffer(&self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    // === Textures ===

    /// Create a texture; `data` holds tightly packed RGBA8 texels, cube faces in
    /// +X, -X, +Y, -Y, +Z, -Z order.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<TextureHandle, BackendError>;

    fn destroy_texture(&self, texture: TextureHandle);

    // === Programs ===

    fn create_program(&self, descriptor: &ProgramDescriptor<'_>)
        -> Result<ProgramHandle, BackendError>;

    fn destroy_program(&self, program: ProgramHandle);

    // === Passes ===

    fn begin_pass(&self, viewport: PixelViewport, label: Option<&str>);

    fn clear(&self, color: Option<Vec4>, depth: Option<f32>);

    fn end_pass(&self);

    // === Drawing ===

    fn use_program(&self, program: ProgramHandle, state: &RenderState);

    fn set_uniform(&self, program: ProgramHandle, uniform: UniformId, value: &UniformData);

    fn bind_texture(
        &self,
        program: ProgramHandle,
        uniform: UniformId,
        unit: u32,
        texture: TextureHandle,
    );

    fn bind_vertex_buffer(&self, buffer: BufferHandle);

    /// Source attribute `slot` from the bound vertex buffer.
    fn set_attribute_pointer(&self, slot: u32, kind: AttributeKind, stride: u32, offset: u32);

    /// Disable the per-vertex array for `slot` and feed it a constant.
    fn set_constant_attribute(&self, slot: u32, value: Vec4);

    /// Non-indexed draw of `count` vertices starting at `first`.
    fn draw(&self, topology: Topology, first: u32, count: u32);

    fn draw_indexed(&self, topology: Topology, indices: BufferHandle, count: u32);
}
