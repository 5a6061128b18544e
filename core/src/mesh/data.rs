//! Mesh description values.
//!
//! This module provides:
//! - [`Topology`] - How vertices are assembled into primitives
//! - [`IndexSet`] - One drawable sub-range of a mesh
//! - [`MeshDescriptor`] - A pure description of mesh contents, used both to create
//!   a mesh and to describe an in-place update of one

use glam::{Vec2, Vec3, Vec4};

use super::attribute::{AttributeData, VertexAttributeSet};
use super::error::MeshError;

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// Each vertex is a separate point.
    Points,
    /// Every two vertices form a line.
    Lines,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    Triangles,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

impl Topology {
    /// Get the number of vertices per primitive (for non-strip topologies).
    pub fn vertices_per_primitive(&self) -> Option<u32> {
        match self {
            Self::Points => Some(1),
            Self::Lines => Some(2),
            Self::Triangles => Some(3),
            Self::LineStrip | Self::TriangleStrip => None,
        }
    }

    /// Number of primitives formed by `count` vertices or indices.
    pub fn primitive_count(&self, count: u32) -> u32 {
        match self {
            Self::Points => count,
            Self::Lines => count / 2,
            Self::Triangles => count / 3,
            Self::LineStrip => count.saturating_sub(1),
            Self::TriangleStrip => count.saturating_sub(2),
        }
    }
}

/// An ordered list of vertex indices drawn with one topology.
///
/// Indices are not checked against the vertex count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSet {
    /// Vertex indices.
    pub indices: Vec<u32>,
    /// Topology used when drawing this set.
    pub topology: Topology,
}

impl IndexSet {
    /// Create an index set.
    pub fn new(indices: Vec<u32>, topology: Topology) -> Self {
        Self { indices, topology }
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the set has no indices.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Description of mesh contents.
///
/// The descriptor is a plain value: building one has no side effects. It is handed
/// to mesh creation, or applied to an existing mesh to update it. On update, only
/// the fields that were supplied take effect:
///
/// - attributes present here overwrite the mesh's arrays of the same name (new
///   names and type changes are rejected);
/// - index sets, when supplied, replace all of the mesh's index sets;
/// - topology and name, when supplied, replace the mesh's.
///
/// # Example
///
/// ```ignore
/// let desc = MeshDescriptor::new()
///     .with_positions(positions)
///     .with_normals(normals)
///     .with_index_set(indices, Topology::Triangles)
///     .with_name("hull");
/// let mesh = Mesh::new(&context, desc)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshDescriptor {
    /// Named per-vertex arrays.
    pub attributes: VertexAttributeSet,
    /// Index sets; `None` keeps whatever the mesh already has.
    pub index_sets: Option<Vec<IndexSet>>,
    /// Topology of a non-indexed draw.
    pub topology: Option<Topology>,
    /// Debug name.
    pub name: Option<String>,
}

impl MeshDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named attribute array.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        data: impl Into<AttributeData>,
    ) -> Self {
        self.attributes.insert(name, data);
        self
    }

    /// Set the `position` attribute.
    pub fn with_positions(self, positions: Vec<Vec3>) -> Self {
        self.with_attribute("position", positions)
    }

    /// Set the `normal` attribute.
    pub fn with_normals(self, normals: Vec<Vec3>) -> Self {
        self.with_attribute("normal", normals)
    }

    /// Set the `uv` attribute.
    pub fn with_uvs(self, uvs: Vec<Vec2>) -> Self {
        self.with_attribute("uv", uvs)
    }

    /// Set the `color` attribute.
    pub fn with_colors(self, colors: Vec<Vec4>) -> Self {
        self.with_attribute("color", colors)
    }

    /// Set the `size` attribute used by point-sprite shaders.
    pub fn with_particle_sizes(self, sizes: Vec<f32>) -> Self {
        self.with_attribute("size", sizes)
    }

    /// Append an index set.
    pub fn with_index_set(mut self, indices: Vec<u32>, topology: Topology) -> Self {
        self.index_sets
            .get_or_insert_with(Vec::new)
            .push(IndexSet::new(indices, topology));
        self
    }

    /// Replace the index sets wholesale.
    pub fn with_index_sets(mut self, sets: Vec<IndexSet>) -> Self {
        self.index_sets = Some(sets);
        self
    }

    /// Set the topology of a non-indexed draw.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Set a debug name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Vertex count implied by the supplied attributes.
    pub fn vertex_count(&self) -> u32 {
        self.attributes.vertex_count()
    }

    /// Check that this descriptor can create a new mesh.
    ///
    /// At least one attribute must be present and at least one of its arrays
    /// must hold data. Shorter arrays are padded with defaults when packed.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.attributes.is_empty() {
            return Err(MeshError::NoAttributes);
        }
        if self.attributes.vertex_count() == 0 {
            return Err(MeshError::NoVertices);
        }
        Ok(())
    }
}
