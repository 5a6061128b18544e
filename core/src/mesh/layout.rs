//! Interleaved vertex layout computation and packing.
//!
//! All attributes of a mesh are stored in one vertex buffer, each vertex's fields
//! contiguous. The layout is a pure function of the attribute set:
//!
//! 1. Attributes are grouped by element type in the order
//!    `vec3`, `vec4`, `ivec4`, `vec2`, `float`, and sorted by name inside a group.
//! 2. Offsets are assigned back to back in that order.
//! 3. The stride is the sum of element sizes rounded up to [`STRIDE_ALIGNMENT`].
//!
//! # Example
//!
//! ```ignore
//! let layout = InterleavedLayout::from_attributes(&attributes);
//! let bytes = layout.pack(&attributes);
//! assert_eq!(bytes.len(), attributes.vertex_count() as usize * layout.stride() as usize);
//! ```

use super::attribute::{attribute_default, AttributeKind, ScalarKind, VertexAttributeSet};

/// Vertex stride is always a multiple of this many bytes (the size of a `vec4`).
pub const STRIDE_ALIGNMENT: u32 = 16;

/// Location of one attribute inside an interleaved vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    /// Attribute name.
    pub name: String,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
    /// Element type.
    pub kind: AttributeKind,
}

impl AttributeLayout {
    /// Number of components per element.
    pub fn component_count(&self) -> u32 {
        self.kind.component_count()
    }

    /// Scalar type of each component.
    pub fn scalar_kind(&self) -> ScalarKind {
        self.kind.scalar_kind()
    }

    /// One past the last byte this attribute occupies.
    pub fn end(&self) -> u32 {
        self.offset + self.kind.size()
    }
}

/// Offset table plus stride for one attribute set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterleavedLayout {
    attributes: Vec<AttributeLayout>,
    stride: u32,
}

impl InterleavedLayout {
    /// Compute the layout for a list of `(name, kind)` pairs.
    ///
    /// Names are expected to be unique.
    pub fn compute<'a>(attributes: impl IntoIterator<Item = (&'a str, AttributeKind)>) -> Self {
        let mut sorted: Vec<(&str, AttributeKind)> = attributes.into_iter().collect();
        sorted.sort_by(|a, b| {
            a.1.layout_rank()
                .cmp(&b.1.layout_rank())
                .then_with(|| a.0.cmp(b.0))
        });

        let mut offset = 0;
        let attributes = sorted
            .into_iter()
            .map(|(name, kind)| {
                let entry = AttributeLayout {
                    name: name.to_string(),
                    offset,
                    kind,
                };
                offset += kind.size();
                entry
            })
            .collect();

        Self {
            attributes,
            stride: align_up(offset, STRIDE_ALIGNMENT),
        }
    }

    /// Compute the layout for an attribute set.
    pub fn from_attributes(attributes: &VertexAttributeSet) -> Self {
        Self::compute(attributes.iter().map(|(name, data)| (name, data.kind())))
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&AttributeLayout> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes in offset order.
    pub fn attributes(&self) -> &[AttributeLayout] {
        &self.attributes
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Pack `attributes` into an interleaved buffer of `vertex_count × stride` bytes.
    ///
    /// Each attribute is defaulted independently for vertices past the end of its
    /// own array; padding bytes are zero.
    pub fn pack(&self, attributes: &VertexAttributeSet) -> Vec<u8> {
        let vertex_count = attributes.vertex_count() as usize;
        let stride = self.stride as usize;
        let mut bytes = vec![0u8; vertex_count * stride];

        for entry in &self.attributes {
            let size = entry.kind.size() as usize;
            let default = attribute_default(&entry.name, entry.kind);
            let data = attributes.get(&entry.name);

            for vertex in 0..vertex_count {
                let start = vertex * stride + entry.offset as usize;
                let dst = &mut bytes[start..start + size];
                let written = data.is_some_and(|d| d.write_element(vertex, dst));
                if !written {
                    dst.copy_from_slice(&default[..size]);
                }
            }
        }

        bytes
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
