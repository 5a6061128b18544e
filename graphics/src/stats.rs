//! Render statistics.

/// Resource accounting plus per-frame draw counters.
///
/// `draw_calls` and `state_changes` are reset by
/// [`RenderContext::begin_frame`](crate::RenderContext::begin_frame); the resource
/// fields track live objects continuously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draw calls issued to the backend this frame.
    pub draw_calls: u32,
    /// Program switches plus vertex buffer switches this frame.
    pub state_changes: u32,
    /// Live meshes.
    pub meshes: u32,
    /// Bytes held by live mesh vertex and index buffers.
    pub mesh_bytes: u64,
    /// Live shader programs.
    pub shaders: u32,
    /// Live textures.
    pub textures: u32,
    /// Bytes held by live textures.
    pub texture_bytes: u64,
}

impl RenderStats {
    /// Zero the per-frame counters, keeping resource accounting.
    pub fn reset_frame_counters(&mut self) {
        self.draw_calls = 0;
        self.state_changes = 0;
    }
}

impl std::fmt::Display for RenderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "draw calls: {}, state changes: {}, meshes: {} ({} bytes), shaders: {}, textures: {} ({} bytes)",
            self.draw_calls,
            self.state_changes,
            self.meshes,
            self.mesh_bytes,
            self.shaders,
            self.textures,
            self.texture_bytes
        )
    }
}
