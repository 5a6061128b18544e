//! Render context.
//!
//! The [`RenderContext`] is the entry point of the crate: it wraps a backend in a
//! [`GraphicsDevice`], knows the drawable size, drives frame boundaries and keeps
//! the few shared resources every scene needs (the standard shaders and the white
//! default textures materials fall back to).
//!
//! # Example
//!
//! ```ignore
//! let context = RenderContext::new(Arc::new(DummyBackend::new()))
//!     .with_parameters(ContextParameters::default().with_drawable_size(1280, 720));
//!
//! context.begin_frame();
//! {
//!     let mut pass = RenderPassBuilder::new().with_camera(&camera).build(&context);
//!     pass.draw(&mesh, Mat4::IDENTITY, &material)?;
//! }
//! context.end_frame();
//! println!("{}", context.last_frame_stats());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::UVec2;
use kestrel_core::profiling::{frame_mark, profile_message, profile_plot};
use parking_lot::Mutex;

use crate::backend::GpuBackend;
use crate::binding::BindingCacheStats;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::shader::{ShaderError, ShaderProgram, StandardShader};
use crate::stats::RenderStats;
use crate::texture::{Texture, TextureKind};

/// Tunables of a [`RenderContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextParameters {
    /// Initial drawable size in pixels.
    pub drawable_size: UVec2,
    /// Texture units a single draw may bind.
    pub max_texture_units: u32,
    /// Reuse attribute bindings across draws of the same mesh and program.
    pub binding_cache: bool,
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self {
            drawable_size: UVec2::new(800, 600),
            max_texture_units: 16,
            binding_cache: true,
        }
    }
}

impl ContextParameters {
    pub fn with_drawable_size(mut self, width: u32, height: u32) -> Self {
        self.drawable_size = UVec2::new(width, height);
        self
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    pub fn with_binding_cache(mut self, enabled: bool) -> Self {
        self.binding_cache = enabled;
        self
    }
}

/// Owner of the device and per-frame bookkeeping.
pub struct RenderContext {
    device: Arc<GraphicsDevice>,
    parameters: ContextParameters,
    drawable_size: Mutex<UVec2>,
    frame_index: AtomicU64,
    last_frame: Mutex<RenderStats>,
    // 0 means no pass is open.
    active_pass: AtomicU64,
    next_pass: AtomicU64,
    standard_shaders: Mutex<HashMap<StandardShader, Arc<ShaderProgram>>>,
    white_texture: Mutex<Option<Arc<Texture>>>,
    white_cubemap: Mutex<Option<Arc<Texture>>>,
}

impl RenderContext {
    /// Create a context with default parameters.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Self {
        let parameters = ContextParameters::default();
        log::info!("RenderContext: created on {} backend", backend.name());
        Self {
            device: Arc::new(GraphicsDevice::new(backend, parameters.binding_cache)),
            parameters,
            drawable_size: Mutex::new(parameters.drawable_size),
            frame_index: AtomicU64::new(0),
            last_frame: Mutex::new(RenderStats::default()),
            active_pass: AtomicU64::new(0),
            next_pass: AtomicU64::new(1),
            standard_shaders: Mutex::new(HashMap::new()),
            white_texture: Mutex::new(None),
            white_cubemap: Mutex::new(None),
        }
    }

    /// Replace the parameters.
    pub fn with_parameters(mut self, parameters: ContextParameters) -> Self {
        self.device.set_binding_cache_enabled(parameters.binding_cache);
        *self.drawable_size.get_mut() = parameters.drawable_size;
        self.parameters = parameters;
        self
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    pub fn parameters(&self) -> &ContextParameters {
        &self.parameters
    }

    /// Size of the default render target in pixels.
    pub fn drawable_size(&self) -> UVec2 {
        *self.drawable_size.lock()
    }

    /// Record a resize of the default render target.
    pub fn set_drawable_size(&self, size: UVec2) {
        log::debug!("RenderContext: drawable resized to {}x{}", size.x, size.y);
        *self.drawable_size.lock() = size;
    }

    /// Enable or disable the mesh binding cache at runtime.
    pub fn set_binding_cache_enabled(&self, enabled: bool) {
        self.device.set_binding_cache_enabled(enabled);
    }

    // === Frames ===

    /// Start a frame: per-frame counters restart from zero.
    pub fn begin_frame(&self) {
        self.device.reset_frame_counters();
        log::trace!(
            "RenderContext: begin frame {}",
            self.frame_index.load(Ordering::Relaxed)
        );
    }

    /// End a frame and publish its statistics through [`last_frame_stats`](Self::last_frame_stats).
    pub fn end_frame(&self) {
        let stats = self.device.stats();
        *self.last_frame.lock() = stats;
        let frame = self.frame_index.fetch_add(1, Ordering::Relaxed);
        log::trace!("RenderContext: end frame {frame}: {stats}");
        profile_plot!("draw_calls", stats.draw_calls);
        profile_plot!("mesh_bytes", stats.mesh_bytes);
        frame_mark!();
    }

    /// Frames ended so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(Ordering::Relaxed)
    }

    /// Live statistics of the frame in progress.
    pub fn stats(&self) -> RenderStats {
        self.device.stats()
    }

    /// Statistics captured by the last [`end_frame`](Self::end_frame).
    pub fn last_frame_stats(&self) -> RenderStats {
        *self.last_frame.lock()
    }

    pub fn binding_cache_stats(&self) -> BindingCacheStats {
        self.device.binding_cache_stats()
    }

    // === Shared resources ===

    /// Built-in program of `kind`, built on first use and shared afterwards.
    pub fn standard_shader(&self, kind: StandardShader) -> Result<Arc<ShaderProgram>, ShaderError> {
        let mut shaders = self.standard_shaders.lock();
        if let Some(shader) = shaders.get(&kind) {
            return Ok(Arc::clone(shader));
        }
        let shader = ShaderProgram::new(self, kind.descriptor())?;
        shaders.insert(kind, Arc::clone(&shader));
        Ok(shader)
    }

    /// 1x1 opaque white texture, the default for unset 2D samplers.
    pub fn white_texture(&self) -> Result<Arc<Texture>, GraphicsError> {
        self.shared_texture(&self.white_texture, TextureKind::Texture2D, "white")
    }

    /// 1x1 opaque white cube map, the default for unset cube samplers.
    pub fn white_cubemap(&self) -> Result<Arc<Texture>, GraphicsError> {
        self.shared_texture(&self.white_cubemap, TextureKind::CubeMap, "white_cube")
    }

    fn shared_texture(
        &self,
        slot: &Mutex<Option<Arc<Texture>>>,
        kind: TextureKind,
        label: &str,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let mut slot = slot.lock();
        if let Some(texture) = slot.as_ref() {
            return Ok(Arc::clone(texture));
        }
        let texture = Texture::solid(self, kind, [255; 4], label)?;
        *slot = Some(Arc::clone(&texture));
        Ok(texture)
    }

    // === Pass tracking ===

    /// Mark a new pass as current and return its serial. A pass still open is
    /// abandoned and its backend pass ended.
    pub(crate) fn open_pass(&self) -> u64 {
        let serial = self.next_pass.fetch_add(1, Ordering::Relaxed);
        let previous = self.active_pass.swap(serial, Ordering::AcqRel);
        if previous != 0 {
            log::warn!(
                "RenderContext: render pass {previous} abandoned by pass {serial} before finishing"
            );
            self.device.backend().end_pass();
            profile_message!("render pass abandoned");
        }
        serial
    }

    pub(crate) fn is_pass_active(&self, serial: u64) -> bool {
        self.active_pass.load(Ordering::Acquire) == serial
    }

    /// Close pass `serial` if it is still current.
    pub(crate) fn close_pass(&self, serial: u64) -> bool {
        self.active_pass
            .compare_exchange(serial, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("device", &self.device)
            .field("parameters", &self.parameters)
            .field("drawable_size", &self.drawable_size())
            .field("frame_index", &self.frame_index())
            .finish()
    }
}

// Ensure RenderContext is Send + Sync
static_assertions::assert_impl_all!(RenderContext: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn create_test_context() -> RenderContext {
        RenderContext::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_default_parameters() {
        let context = create_test_context();
        assert_eq!(context.drawable_size(), UVec2::new(800, 600));
        assert_eq!(context.parameters().max_texture_units, 16);
        assert!(context.parameters().binding_cache);
    }

    #[test]
    fn test_with_parameters() {
        let context = create_test_context().with_parameters(
            ContextParameters::default()
                .with_drawable_size(320, 240)
                .with_max_texture_units(2),
        );
        assert_eq!(context.drawable_size(), UVec2::new(320, 240));
        assert_eq!(context.parameters().max_texture_units, 2);
    }

    #[test]
    fn test_white_texture_is_shared() {
        let context = create_test_context();
        let a = context.white_texture().unwrap();
        let b = context.white_texture().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(context.white_cubemap().unwrap().kind(), TextureKind::CubeMap);
        assert_eq!(context.stats().textures, 2);
    }

    #[test]
    fn test_standard_shader_is_shared() {
        let context = create_test_context();
        let a = context.standard_shader(StandardShader::Unlit).unwrap();
        let b = context.standard_shader(StandardShader::Unlit).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_pass_serials() {
        let context = create_test_context();
        let first = context.open_pass();
        assert!(context.is_pass_active(first));

        let second = context.open_pass();
        assert!(!context.is_pass_active(first));
        assert!(!context.close_pass(first));
        assert!(context.close_pass(second));
        assert!(!context.is_pass_active(second));
    }

    #[test]
    fn test_frame_stats_snapshot() {
        let context = create_test_context();
        context.begin_frame();
        context.device().update_stats(|s| s.draw_calls += 3);
        context.end_frame();
        assert_eq!(context.last_frame_stats().draw_calls, 3);
        assert_eq!(context.frame_index(), 1);

        context.begin_frame();
        assert_eq!(context.stats().draw_calls, 0);
        assert_eq!(context.last_frame_stats().draw_calls, 3);
    }
}
