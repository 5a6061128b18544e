//! Graphics device.
//!
//! The [`GraphicsDevice`] owns the backend and the state every GPU resource shares:
//! resource ids, render statistics, the currently bound program and vertex buffer,
//! and the mesh binding cache. Meshes, programs and textures hold an
//! `Arc<GraphicsDevice>` so they can release their backend objects on drop. The
//! device is created by [`RenderContext::new`](crate::RenderContext::new).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{BufferHandle, GpuBackend, ProgramHandle};
use crate::binding::{BindingCache, BindingCacheStats, BindingKey, MeshBinding};
use crate::shader::RenderState;
use crate::stats::RenderStats;

/// Identity of a mesh, program or texture, unique within one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

#[derive(Debug, Default)]
struct BoundState {
    program: Option<(ProgramHandle, RenderState)>,
    vertex_buffer: Option<BufferHandle>,
}

/// Shared owner of the backend and cross-resource state.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync`; all mutable state sits behind locks or
/// atomics. Draw submission itself is expected from one thread at a time.
pub struct GraphicsDevice {
    backend: Arc<dyn GpuBackend>,
    next_id: AtomicU64,
    stats: Mutex<RenderStats>,
    bound: Mutex<BoundState>,
    bindings: Mutex<BindingCache>,
    binding_cache_enabled: AtomicBool,
}

impl GraphicsDevice {
    pub(crate) fn new(backend: Arc<dyn GpuBackend>, binding_cache_enabled: bool) -> Self {
        Self {
            backend,
            next_id: AtomicU64::new(1),
            stats: Mutex::new(RenderStats::default()),
            bound: Mutex::new(BoundState::default()),
            bindings: Mutex::new(BindingCache::default()),
            binding_cache_enabled: AtomicBool::new(binding_cache_enabled),
        }
    }

    /// The backend every resource of this device lives on.
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub(crate) fn allocate_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // === Statistics ===

    /// Snapshot of the live statistics.
    pub fn stats(&self) -> RenderStats {
        *self.stats.lock()
    }

    pub(crate) fn update_stats(&self, f: impl FnOnce(&mut RenderStats)) {
        f(&mut self.stats.lock());
    }

    pub(crate) fn reset_frame_counters(&self) {
        self.stats.lock().reset_frame_counters();
    }

    // === Bound state ===

    /// Make `program` current, skipping the backend call when it already is.
    pub(crate) fn use_program(&self, program: ProgramHandle, state: RenderState) {
        let mut bound = self.bound.lock();
        if bound.program == Some((program, state)) {
            return;
        }
        self.backend.use_program(program, &state);
        bound.program = Some((program, state));
        drop(bound);
        self.update_stats(|stats| stats.state_changes += 1);
    }

    /// Bind `buffer` as the vertex source, skipping the backend call when it already is.
    pub(crate) fn bind_vertex_buffer(&self, buffer: BufferHandle) {
        let mut bound = self.bound.lock();
        if bound.vertex_buffer == Some(buffer) {
            return;
        }
        self.backend.bind_vertex_buffer(buffer);
        bound.vertex_buffer = Some(buffer);
        drop(bound);
        self.update_stats(|stats| stats.state_changes += 1);
    }

    /// Whether `program` is the program last made current.
    pub(crate) fn is_program_bound(&self, program: ProgramHandle) -> bool {
        matches!(self.bound.lock().program, Some((bound, _)) if bound == program)
    }

    pub(crate) fn forget_program(&self, program: ProgramHandle) {
        let mut bound = self.bound.lock();
        if matches!(bound.program, Some((p, _)) if p == program) {
            bound.program = None;
        }
    }

    pub(crate) fn forget_buffer(&self, buffer: BufferHandle) {
        let mut bound = self.bound.lock();
        if bound.vertex_buffer == Some(buffer) {
            bound.vertex_buffer = None;
        }
    }

    // === Binding cache ===

    pub(crate) fn mesh_binding(
        &self,
        key: BindingKey,
        derive: impl FnOnce() -> MeshBinding,
    ) -> Arc<MeshBinding> {
        let mut cache = self.bindings.lock();
        if self.binding_cache_enabled.load(Ordering::Relaxed) {
            cache.get_or_insert_with(key, derive)
        } else {
            cache.record_uncached();
            Arc::new(derive())
        }
    }

    pub(crate) fn purge_mesh_bindings(&self, mesh: ResourceId) {
        self.bindings.lock().purge_mesh(mesh);
    }

    pub(crate) fn purge_shader_bindings(&self, shader: ResourceId) {
        self.bindings.lock().purge_shader(shader);
    }

    pub(crate) fn set_binding_cache_enabled(&self, enabled: bool) {
        self.binding_cache_enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            let mut cache = self.bindings.lock();
            let stats = cache.stats();
            *cache = BindingCache::default();
            log::debug!(
                "GraphicsDevice: binding cache disabled, dropped {} entries",
                stats.entries
            );
        }
    }

    /// Hit/miss counters of the mesh binding cache.
    pub fn binding_cache_stats(&self) -> BindingCacheStats {
        self.bindings.lock().stats()
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("backend", &self.backend.name())
            .field("stats", &self.stats())
            .field("binding_cache", &self.binding_cache_stats())
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCommand, DummyBackend};

    fn create_test_device() -> (Arc<DummyBackend>, GraphicsDevice) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone(), true);
        (backend, device)
    }

    #[test]
    fn test_ids_are_unique() {
        let (_backend, device) = create_test_device();
        let a = device.allocate_id();
        let b = device.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_redundant_program_switch_skipped() {
        let (backend, device) = create_test_device();
        let state = RenderState::default();

        device.use_program(ProgramHandle(7), state);
        device.use_program(ProgramHandle(7), state);
        device.use_program(ProgramHandle(8), state);

        let switches = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, BackendCommand::UseProgram { .. }))
            .count();
        assert_eq!(switches, 2);
        assert_eq!(device.stats().state_changes, 2);
        assert!(device.is_program_bound(ProgramHandle(8)));
    }

    #[test]
    fn test_forget_buffer_rebinds() {
        let (backend, device) = create_test_device();
        device.bind_vertex_buffer(BufferHandle(3));
        device.forget_buffer(BufferHandle(3));
        device.bind_vertex_buffer(BufferHandle(3));

        let binds = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, BackendCommand::BindVertexBuffer(_)))
            .count();
        assert_eq!(binds, 2);
    }

    #[test]
    fn test_disabled_cache_always_derives() {
        let (_backend, device) = create_test_device();
        device.set_binding_cache_enabled(false);
        let key = BindingKey {
            mesh: ResourceId(1),
            shader: ResourceId(2),
            generation: 0,
        };
        let make = || MeshBinding {
            stride: 16,
            slots: Vec::new(),
        };
        device.mesh_binding(key, make);
        device.mesh_binding(key, make);

        let stats = device.binding_cache_stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 0);
    }
}
