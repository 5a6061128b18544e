//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It records every call as a
//! [`BackendCommand`] and keeps a CPU copy of uploaded buffers, so tests can assert
//! on exactly what the core asked the GPU to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec4;
use kestrel_core::mesh::{AttributeKind, Topology};
use kestrel_core::scene::PixelViewport;
use parking_lot::Mutex;

use crate::shader::{RenderState, UniformId};
use crate::texture::{TextureDescriptor, TextureKind};

use super::{
    BackendError, BufferHandle, GpuBackend, ProgramDescriptor, ProgramHandle, TextureHandle,
    UniformData,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CreateVertexBuffer { buffer: BufferHandle, size: usize },
    CreateIndexBuffer { buffer: BufferHandle, count: usize },
    UpdateBuffer { buffer: BufferHandle, size: usize },
    DestroyBuffer(BufferHandle),
    CreateTexture {
        texture: TextureHandle,
        kind: TextureKind,
        width: u32,
        height: u32,
    },
    DestroyTexture(TextureHandle),
    CreateProgram {
        program: ProgramHandle,
        label: Option<String>,
        attributes: Vec<(String, u32)>,
        uniforms: Vec<(String, UniformId)>,
    },
    DestroyProgram(ProgramHandle),
    BeginPass { viewport: PixelViewport },
    Clear { color: Option<Vec4>, depth: Option<f32> },
    EndPass,
    UseProgram { program: ProgramHandle, state: RenderState },
    SetUniform {
        program: ProgramHandle,
        uniform: UniformId,
        value: UniformData,
    },
    BindTexture {
        program: ProgramHandle,
        uniform: UniformId,
        unit: u32,
        texture: TextureHandle,
    },
    BindVertexBuffer(BufferHandle),
    SetAttributePointer {
        slot: u32,
        kind: AttributeKind,
        stride: u32,
        offset: u32,
    },
    SetConstantAttribute { slot: u32, value: Vec4 },
    Draw {
        topology: Topology,
        first: u32,
        count: u32,
    },
    DrawIndexed {
        topology: Topology,
        indices: BufferHandle,
        count: u32,
    },
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_handle: AtomicU64,
    commands: Mutex<Vec<BackendCommand>>,
    buffers: Mutex<HashMap<BufferHandle, Vec<u8>>>,
    fail_next_program: Mutex<Option<String>>,
    fail_next_index_buffer: Mutex<bool>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every command recorded so far.
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.commands.lock().clone()
    }

    /// Remove and return the recorded commands.
    pub fn take_commands(&self) -> Vec<BackendCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    /// Forget the recorded commands.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Current contents of a live buffer.
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.buffers.lock().get(&buffer).cloned()
    }

    /// Number of buffers created and not yet destroyed.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Make the next `create_program` call fail with `message`.
    pub fn fail_next_program(&self, message: impl Into<String>) {
        *self.fail_next_program.lock() = Some(message.into());
    }

    /// Make the next `create_index_buffer` call fail with `OutOfMemory`.
    pub fn fail_next_index_buffer(&self) {
        *self.fail_next_index_buffer.lock() = true;
    }

    fn next_id(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, command: BackendCommand) {
        log::trace!("DummyBackend: {:?}", command);
        self.commands.lock().push(command);
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_vertex_buffer(
        &self,
        data: &[u8],
        label: Option<&str>,
    ) -> Result<BufferHandle, BackendError> {
        let buffer = BufferHandle(self.next_id());
        log::trace!(
            "DummyBackend: creating vertex buffer {:?} (size: {})",
            label,
            data.len()
        );
        self.buffers.lock().insert(buffer, data.to_vec());
        self.record(BackendCommand::CreateVertexBuffer {
            buffer,
            size: data.len(),
        });
        Ok(buffer)
    }

    fn create_index_buffer(
        &self,
        indices: &[u32],
        label: Option<&str>,
    ) -> Result<BufferHandle, BackendError> {
        if std::mem::take(&mut *self.fail_next_index_buffer.lock()) {
            return Err(BackendError::OutOfMemory);
        }
        let buffer = BufferHandle(self.next_id());
        log::trace!(
            "DummyBackend: creating index buffer {:?} (count: {})",
            label,
            indices.len()
        );
        self.buffers
            .lock()
            .insert(buffer, bytemuck::cast_slice(indices).to_vec());
        self.record(BackendCommand::CreateIndexBuffer {
            buffer,
            count: indices.len(),
        });
        Ok(buffer)
    }

    fn update_buffer(&self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError> {
        match self.buffers.lock().get_mut(&buffer) {
            Some(contents) => {
                contents.clear();
                contents.extend_from_slice(data);
            }
            None => return Err(BackendError::InvalidHandle(format!("{buffer:?}"))),
        }
        self.record(BackendCommand::UpdateBuffer {
            buffer,
            size: data.len(),
        });
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.buffers.lock().remove(&buffer);
        self.record(BackendCommand::DestroyBuffer(buffer));
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<TextureHandle, BackendError> {
        if data.len() != descriptor.byte_size() {
            return Err(BackendError::ResourceCreationFailed(format!(
                "texture {:?} expects {} bytes, got {}",
                descriptor.label,
                descriptor.byte_size(),
                data.len()
            )));
        }
        let texture = TextureHandle(self.next_id());
        self.record(BackendCommand::CreateTexture {
            texture,
            kind: descriptor.kind,
            width: descriptor.width,
            height: descriptor.height,
        });
        Ok(texture)
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        self.record(BackendCommand::DestroyTexture(texture));
    }

    fn create_program(
        &self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<ProgramHandle, BackendError> {
        if let Some(message) = self.fail_next_program.lock().take() {
            return Err(BackendError::LinkFailed(message));
        }
        let program = ProgramHandle(self.next_id());
        self.record(BackendCommand::CreateProgram {
            program,
            label: descriptor.label.map(str::to_string),
            attributes: descriptor
                .attributes
                .iter()
                .map(|a| (a.name.clone(), a.slot))
                .collect(),
            uniforms: descriptor
                .uniforms
                .iter()
                .map(|u| (u.name.clone(), u.id))
                .collect(),
        });
        Ok(program)
    }

    fn destroy_program(&self, program: ProgramHandle) {
        self.record(BackendCommand::DestroyProgram(program));
    }

    fn begin_pass(&self, viewport: PixelViewport, label: Option<&str>) {
        log::trace!("DummyBackend: begin pass {:?}", label);
        self.record(BackendCommand::BeginPass { viewport });
    }

    fn clear(&self, color: Option<Vec4>, depth: Option<f32>) {
        self.record(BackendCommand::Clear { color, depth });
    }

    fn end_pass(&self) {
        self.record(BackendCommand::EndPass);
    }

    fn use_program(&self, program: ProgramHandle, state: &RenderState) {
        self.record(BackendCommand::UseProgram {
            program,
            state: *state,
        });
    }

    fn set_uniform(&self, program: ProgramHandle, uniform: UniformId, value: &UniformData) {
        self.record(BackendCommand::SetUniform {
            program,
            uniform,
            value: value.clone(),
        });
    }

    fn bind_texture(
        &self,
        program: ProgramHandle,
        uniform: UniformId,
        unit: u32,
        texture: TextureHandle,
    ) {
        self.record(BackendCommand::BindTexture {
            program,
            uniform,
            unit,
            texture,
        });
    }

    fn bind_vertex_buffer(&self, buffer: BufferHandle) {
        self.record(BackendCommand::BindVertexBuffer(buffer));
    }

    fn set_attribute_pointer(&self, slot: u32, kind: AttributeKind, stride: u32, offset: u32) {
        self.record(BackendCommand::SetAttributePointer {
            slot,
            kind,
            stride,
            offset,
        });
    }

    fn set_constant_attribute(&self, slot: u32, value: Vec4) {
        self.record(BackendCommand::SetConstantAttribute { slot, value });
    }

    fn draw(&self, topology: Topology, first: u32, count: u32) {
        self.record(BackendCommand::Draw {
            topology,
            first,
            count,
        });
    }

    fn draw_indexed(&self, topology: Topology, indices: BufferHandle, count: u32) {
        self.record(BackendCommand::DrawIndexed {
            topology,
            indices,
            count,
        });
    }
}

// Ensure DummyBackend is Send + Sync
static_assertions::assert_impl_all!(DummyBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_backend_name() {
        assert_eq!(DummyBackend::new().name(), "Dummy");
    }

    #[test]
    fn test_buffer_readback_and_update() {
        let backend = DummyBackend::new();
        let buffer = backend.create_vertex_buffer(&[1, 2, 3, 4], None).unwrap();
        assert_eq!(backend.buffer_data(buffer), Some(vec![1, 2, 3, 4]));

        backend.update_buffer(buffer, &[9; 8]).unwrap();
        assert_eq!(backend.buffer_data(buffer), Some(vec![9; 8]));

        backend.destroy_buffer(buffer);
        assert_eq!(backend.live_buffer_count(), 0);
        assert!(backend.update_buffer(buffer, &[0]).is_err());
    }

    #[test]
    fn test_index_buffer_bytes() {
        let backend = DummyBackend::new();
        let buffer = backend.create_index_buffer(&[0, 1, 2], None).unwrap();
        let bytes = backend.buffer_data(buffer).unwrap();
        let indices: Vec<u32> = bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_fail_next_program_only_once() {
        let backend = DummyBackend::new();
        backend.fail_next_program("boom");
        let desc = ProgramDescriptor {
            label: None,
            vertex_source: "",
            fragment_source: "",
            attributes: &[],
            uniforms: &[],
            state: RenderState::default(),
        };
        assert_eq!(
            backend.create_program(&desc),
            Err(BackendError::LinkFailed("boom".to_string()))
        );
        assert!(backend.create_program(&desc).is_ok());
    }

    #[test]
    fn test_fail_next_index_buffer_only_once() {
        let backend = DummyBackend::new();
        backend.fail_next_index_buffer();
        assert_eq!(
            backend.create_index_buffer(&[0, 1, 2], None),
            Err(BackendError::OutOfMemory)
        );
        assert_eq!(backend.live_buffer_count(), 0);
        assert!(backend.create_index_buffer(&[0, 1, 2], None).is_ok());
    }

    #[test]
    fn test_take_commands_drains() {
        let backend = DummyBackend::new();
        backend.draw(Topology::Points, 0, 3);
        assert_eq!(backend.take_commands().len(), 1);
        assert!(backend.commands().is_empty());
    }
}
