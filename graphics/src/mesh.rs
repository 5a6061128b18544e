//! GPU meshes.
//!
//! A [`Mesh`] owns one interleaved vertex buffer plus one index buffer per index
//! set. The interleaved layout is computed from the attribute set at creation and
//! never changes afterwards: [`Mesh::apply`] may replace attribute arrays, index
//! sets, topology and name, but cannot add attributes or change their types.
//!
//! # Example
//!
//! ```ignore
//! let mesh = Mesh::new(&context, generators::sphere(1.0, 32, 16))?;
//!
//! // Animate colors without touching the layout.
//! mesh.apply(MeshDescriptor::new().with_positions(moved_positions))?;
//! ```

use std::sync::Arc;

use glam::Vec3;
use kestrel_core::mesh::{
    AttributeData, AttributeKind, IndexSet, InterleavedLayout, MeshDescriptor, MeshError,
    Topology, VertexAttributeSet,
};
use kestrel_core::profiling::profile_function;
use parking_lot::RwLock;

use crate::backend::BufferHandle;
use crate::context::RenderContext;
use crate::device::{GraphicsDevice, ResourceId};
use crate::error::GraphicsError;

/// One index set with its GPU buffer.
#[derive(Debug, Clone)]
pub(crate) struct GpuIndexSet {
    pub set: IndexSet,
    pub buffer: BufferHandle,
}

struct MeshState {
    attributes: VertexAttributeSet,
    vertex_buffer: BufferHandle,
    vertex_bytes: u64,
    index_sets: Vec<GpuIndexSet>,
    topology: Topology,
    name: Option<String>,
}

impl MeshState {
    fn index_bytes(&self) -> u64 {
        self.index_sets
            .iter()
            .map(|s| (s.set.len() * std::mem::size_of::<u32>()) as u64)
            .sum()
    }
}

/// What a draw needs from a mesh, taken under one lock.
#[derive(Debug, Clone)]
pub(crate) struct MeshSnapshot {
    pub vertex_buffer: BufferHandle,
    pub vertex_count: u32,
    pub topology: Topology,
    pub index_sets: Vec<GpuIndexSet>,
}

/// Vertex and index data uploaded to the GPU.
///
/// Meshes are reference-counted; dropping the last reference releases the
/// buffers and forgets cached bindings made for the mesh.
pub struct Mesh {
    device: Arc<GraphicsDevice>,
    id: ResourceId,
    layout: InterleavedLayout,
    state: RwLock<MeshState>,
}

impl Mesh {
    /// Interleave and upload a mesh.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NoAttributes`](crate::MeshError::NoAttributes) for a
    /// descriptor without attributes, [`MeshError::NoVertices`](crate::MeshError::NoVertices)
    /// when every array is empty, or the backend error if a buffer cannot be created.
    pub fn new(
        context: &RenderContext,
        descriptor: MeshDescriptor,
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_function!();
        descriptor.validate()?;
        let device = Arc::clone(context.device());

        let MeshDescriptor {
            attributes,
            index_sets,
            topology,
            name,
        } = descriptor;

        let layout = InterleavedLayout::from_attributes(&attributes);
        let packed = layout.pack(&attributes);
        let vertex_buffer = device
            .backend()
            .create_vertex_buffer(&packed, name.as_deref())?;
        let index_sets = match upload_index_sets(&device, index_sets.unwrap_or_default(), &name) {
            Ok(sets) => sets,
            Err(e) => {
                device.backend().destroy_buffer(vertex_buffer);
                return Err(e);
            }
        };
        check_index_ranges(&index_sets, attributes.vertex_count(), &name);

        let state = MeshState {
            attributes,
            vertex_buffer,
            vertex_bytes: packed.len() as u64,
            index_sets,
            topology: topology.unwrap_or_default(),
            name,
        };
        let bytes = state.vertex_bytes + state.index_bytes();
        device.update_stats(|stats| {
            stats.meshes += 1;
            stats.mesh_bytes += bytes;
        });

        log::trace!(
            "Mesh: created {:?}, {} vertices, stride {}, {} index sets",
            state.name,
            state.attributes.vertex_count(),
            layout.stride(),
            state.index_sets.len()
        );

        Ok(Arc::new(Self {
            id: device.allocate_id(),
            device,
            layout,
            state: RwLock::new(state),
        }))
    }

    /// Create a new mesh holding a copy of `other`'s data.
    pub fn from_mesh(context: &RenderContext, other: &Mesh) -> Result<Arc<Self>, GraphicsError> {
        Self::new(context, other.to_descriptor())
    }

    /// Update the mesh in place.
    ///
    /// Attribute arrays present in `descriptor` replace the current ones (so the
    /// vertex count may change); index sets are replaced wholesale when given;
    /// topology and name are replaced when given. The vertex buffer is re-uploaded.
    ///
    /// # Errors
    ///
    /// [`MeshError::NewAttribute`](crate::MeshError::NewAttribute) or
    /// [`MeshError::AttributeTypeChanged`](crate::MeshError::AttributeTypeChanged) if the
    /// update would change the layout, [`MeshError::NoVertices`](crate::MeshError::NoVertices)
    /// if it would leave every array empty, or the backend error if an upload fails.
    /// The mesh and its statistics are left untouched on error.
    pub fn apply(&self, descriptor: MeshDescriptor) -> Result<(), GraphicsError> {
        profile_function!();
        let mut state = self.state.write();
        state.attributes.check_update(&descriptor.attributes)?;

        let MeshDescriptor {
            attributes,
            index_sets,
            topology,
            name,
        } = descriptor;

        let old_bytes = state.vertex_bytes + state.index_bytes();
        let backend = self.device.backend();

        let merged = if attributes.is_empty() {
            None
        } else {
            let mut merged = state.attributes.clone();
            merged.merge(attributes);
            if merged.vertex_count() == 0 {
                return Err(MeshError::NoVertices.into());
            }
            Some(merged)
        };

        // Nothing in `state` changes until every upload has succeeded.
        let uploaded = match index_sets {
            Some(sets) => Some(upload_index_sets(&self.device, sets, &state.name)?),
            None => None,
        };

        let vertices = match merged {
            Some(merged) => {
                let packed = self.layout.pack(&merged);
                if let Err(e) = backend.update_buffer(state.vertex_buffer, &packed) {
                    for set in uploaded.into_iter().flatten() {
                        backend.destroy_buffer(set.buffer);
                    }
                    return Err(e.into());
                }
                Some((merged, packed.len() as u64))
            }
            None => None,
        };

        if let Some((merged, bytes)) = vertices {
            state.attributes = merged;
            state.vertex_bytes = bytes;
        }
        if let Some(uploaded) = uploaded {
            for old in std::mem::replace(&mut state.index_sets, uploaded) {
                backend.destroy_buffer(old.buffer);
            }
        }
        if let Some(topology) = topology {
            state.topology = topology;
        }
        if name.is_some() {
            state.name = name;
        }
        check_index_ranges(&state.index_sets, state.attributes.vertex_count(), &state.name);

        let new_bytes = state.vertex_bytes + state.index_bytes();
        self.device.update_stats(|stats| {
            stats.mesh_bytes = stats.mesh_bytes.saturating_sub(old_bytes) + new_bytes;
        });
        log::trace!(
            "Mesh: updated {:?}, {} vertices",
            state.name,
            state.attributes.vertex_count()
        );
        Ok(())
    }

    /// Copy the mesh data back out as a descriptor.
    pub fn to_descriptor(&self) -> MeshDescriptor {
        let state = self.state.read();
        MeshDescriptor {
            attributes: state.attributes.clone(),
            index_sets: Some(state.index_sets.iter().map(|s| s.set.clone()).collect()),
            topology: Some(state.topology),
            name: state.name.clone(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> Option<String> {
        self.state.read().name.clone()
    }

    /// Interleaved layout of the vertex buffer.
    pub fn layout(&self) -> &InterleavedLayout {
        &self.layout
    }

    /// Copy of one attribute array.
    pub fn attribute(&self, name: &str) -> Option<AttributeData> {
        self.state.read().attributes.get(name).cloned()
    }

    /// Element type of one attribute.
    pub fn attribute_kind(&self, name: &str) -> Option<AttributeKind> {
        self.layout.get(name).map(|a| a.kind)
    }

    /// Attribute names in layout order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.layout
            .attributes()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn index_sets(&self) -> Vec<IndexSet> {
        self.state
            .read()
            .index_sets
            .iter()
            .map(|s| s.set.clone())
            .collect()
    }

    pub fn index_set_count(&self) -> usize {
        self.state.read().index_sets.len()
    }

    pub fn vertex_count(&self) -> u32 {
        self.state.read().attributes.vertex_count()
    }

    /// Topology of a non-indexed draw.
    pub fn topology(&self) -> Topology {
        self.state.read().topology
    }

    /// Bytes held in vertex and index buffers.
    pub fn data_size(&self) -> u64 {
        let state = self.state.read();
        state.vertex_bytes + state.index_bytes()
    }

    /// Axis-aligned bounds of the `position` attribute as `(min, max)`.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let state = self.state.read();
        let positions = match state.attributes.get("position")? {
            AttributeData::Vec3(p) => p,
            _ => return None,
        };
        let first = *positions.first()?;
        Some(
            positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    /// Backend handle of the interleaved vertex buffer.
    pub fn vertex_buffer(&self) -> BufferHandle {
        self.state.read().vertex_buffer
    }

    pub(crate) fn snapshot(&self) -> MeshSnapshot {
        let state = self.state.read();
        MeshSnapshot {
            vertex_buffer: state.vertex_buffer,
            vertex_count: state.attributes.vertex_count(),
            topology: state.topology,
            index_sets: state.index_sets.clone(),
        }
    }
}

fn upload_index_sets(
    device: &GraphicsDevice,
    sets: Vec<IndexSet>,
    name: &Option<String>,
) -> Result<Vec<GpuIndexSet>, GraphicsError> {
    let mut uploaded: Vec<GpuIndexSet> = Vec::with_capacity(sets.len());
    for set in sets {
        match device
            .backend()
            .create_index_buffer(&set.indices, name.as_deref())
        {
            Ok(buffer) => uploaded.push(GpuIndexSet { set, buffer }),
            Err(e) => {
                for done in uploaded {
                    device.backend().destroy_buffer(done.buffer);
                }
                return Err(e.into());
            }
        }
    }
    Ok(uploaded)
}

fn check_index_ranges(sets: &[GpuIndexSet], vertex_count: u32, name: &Option<String>) {
    for (i, gpu) in sets.iter().enumerate() {
        if let Some(max) = gpu.set.indices.iter().copied().max() {
            if max >= vertex_count {
                log::warn!(
                    "Mesh {:?}: index set {} references vertex {} but only {} vertices exist",
                    name,
                    i,
                    max,
                    vertex_count
                );
            }
        }
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let bytes = state.vertex_bytes + state.index_bytes();
        let backend = self.device.backend();

        self.device.forget_buffer(state.vertex_buffer);
        backend.destroy_buffer(state.vertex_buffer);
        for set in &state.index_sets {
            backend.destroy_buffer(set.buffer);
        }
        self.device.purge_mesh_bindings(self.id);
        self.device.update_stats(|stats| {
            stats.meshes = stats.meshes.saturating_sub(1);
            stats.mesh_bytes = stats.mesh_bytes.saturating_sub(bytes);
        });
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("name", &state.name)
            .field("vertices", &state.attributes.vertex_count())
            .field("stride", &self.layout.stride())
            .field("index_sets", &state.index_sets.len())
            .finish()
    }
}

// Ensure Mesh is Send + Sync
static_assertions::assert_impl_all!(Mesh: Send, Sync);
