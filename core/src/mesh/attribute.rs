//! Typed per-vertex attribute arrays.
//!
//! A mesh stores its vertex data as a set of *named* attribute arrays rather than
//! a fixed vertex struct. Each array has one element type, described by
//! [`AttributeKind`], and the values themselves live in a single tagged
//! [`AttributeData`] variant so "does this name exist, and with which type" is one
//! map lookup.
//!
//! # Example
//!
//! ```ignore
//! let mut set = VertexAttributeSet::new();
//! set.insert("position", vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
//! set.insert("uv", vec![Vec2::ZERO, Vec2::X]);
//!
//! // The longest array decides the vertex count; "uv" is default-filled.
//! assert_eq!(set.vertex_count(), 3);
//! ```

use std::collections::BTreeMap;

use glam::{IVec4, Vec2, Vec3, Vec4};

use super::error::MeshError;

/// Scalar type of an attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 32-bit float.
    Float,
    /// 32-bit signed integer.
    Sint,
    /// 32-bit unsigned integer.
    Uint,
}

/// Element type of a vertex attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Single float.
    Float,
    /// Two-component float vector.
    Vec2,
    /// Three-component float vector.
    Vec3,
    /// Four-component float vector.
    Vec4,
    /// Four-component signed integer vector.
    IVec4,
}

impl AttributeKind {
    /// Number of scalar components per element.
    pub fn component_count(&self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::IVec4 => 4,
        }
    }

    /// Scalar type of each component.
    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            Self::IVec4 => ScalarKind::Sint,
            _ => ScalarKind::Float,
        }
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> u32 {
        self.component_count() * 4
    }

    /// Position of this kind in the interleaving order (lower packs first).
    pub(crate) fn layout_rank(&self) -> u8 {
        match self {
            Self::Vec3 => 0,
            Self::Vec4 => 1,
            Self::IVec4 => 2,
            Self::Vec2 => 3,
            Self::Float => 4,
        }
    }
}

/// A typed array of per-vertex values.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    /// Scalar floats (e.g. particle size).
    Float(Vec<f32>),
    /// 2-component vectors (e.g. texture coordinates).
    Vec2(Vec<Vec2>),
    /// 3-component vectors (e.g. positions, normals).
    Vec3(Vec<Vec3>),
    /// 4-component vectors (e.g. colors, tangents).
    Vec4(Vec<Vec4>),
    /// 4-component integer vectors (e.g. joint indices).
    IVec4(Vec<IVec4>),
}

impl AttributeData {
    /// The element type of this array.
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Float(_) => AttributeKind::Float,
            Self::Vec2(_) => AttributeKind::Vec2,
            Self::Vec3(_) => AttributeKind::Vec3,
            Self::Vec4(_) => AttributeKind::Vec4,
            Self::IVec4(_) => AttributeKind::IVec4,
        }
    }

    /// Number of elements supplied.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Vec2(v) => v.len(),
            Self::Vec3(v) => v.len(),
            Self::Vec4(v) => v.len(),
            Self::IVec4(v) => v.len(),
        }
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write element `index` into `dst` (which must be exactly one element wide).
    ///
    /// Returns `false` when the array is shorter than `index + 1`; `dst` is left untouched.
    pub(crate) fn write_element(&self, index: usize, dst: &mut [u8]) -> bool {
        match self {
            Self::Float(v) => v.get(index).map(|e| dst.copy_from_slice(bytemuck::bytes_of(e))),
            Self::Vec2(v) => v.get(index).map(|e| dst.copy_from_slice(bytemuck::bytes_of(e))),
            Self::Vec3(v) => v.get(index).map(|e| dst.copy_from_slice(bytemuck::bytes_of(e))),
            Self::Vec4(v) => v.get(index).map(|e| dst.copy_from_slice(bytemuck::bytes_of(e))),
            Self::IVec4(v) => v.get(index).map(|e| dst.copy_from_slice(bytemuck::bytes_of(e))),
        }
        .is_some()
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<Vec2>> for AttributeData {
    fn from(v: Vec<Vec2>) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec<Vec3>> for AttributeData {
    fn from(v: Vec<Vec3>) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec<Vec4>> for AttributeData {
    fn from(v: Vec<Vec4>) -> Self {
        Self::Vec4(v)
    }
}

impl From<Vec<IVec4>> for AttributeData {
    fn from(v: Vec<IVec4>) -> Self {
        Self::IVec4(v)
    }
}

/// Default value written for vertices an attribute array does not cover.
///
/// Vectors default to zero, except that `color` is opaque white, the `w` of any
/// other 4-component float is 1.0 and a scalar named `size` is 1.0.
pub fn attribute_default(name: &str, kind: AttributeKind) -> [u8; 16] {
    let mut out = [0u8; 16];
    match kind {
        AttributeKind::Float => {
            let value: f32 = if name == "size" { 1.0 } else { 0.0 };
            out[..4].copy_from_slice(bytemuck::bytes_of(&value));
        }
        AttributeKind::Vec4 => {
            let value = if name == "color" {
                Vec4::ONE
            } else {
                Vec4::W
            };
            out.copy_from_slice(bytemuck::bytes_of(&value));
        }
        AttributeKind::Vec2 | AttributeKind::Vec3 | AttributeKind::IVec4 => {}
    }
    out
}

/// Named per-vertex attribute arrays belonging to one mesh.
///
/// Names are unique; iteration order is by name so every derived value
/// (layout, packed bytes) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexAttributeSet {
    attributes: BTreeMap<String, AttributeData>,
}

impl VertexAttributeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute array.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<AttributeData>) {
        self.attributes.insert(name.into(), data.into());
    }

    /// Look up an attribute array by name.
    pub fn get(&self, name: &str) -> Option<&AttributeData> {
        self.attributes.get(name)
    }

    /// Whether an attribute with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterate `(name, data)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeData)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate attribute names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no attributes are present.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Vertex count: the length of the longest attribute array.
    pub fn vertex_count(&self) -> u32 {
        self.attributes
            .values()
            .map(AttributeData::len)
            .max()
            .unwrap_or(0) as u32
    }

    /// Check that `update` only touches attributes that already exist here, with
    /// the same element type.
    pub fn check_update(&self, update: &VertexAttributeSet) -> Result<(), MeshError> {
        for (name, data) in update.iter() {
            match self.attributes.get(name) {
                None => return Err(MeshError::NewAttribute(name.to_string())),
                Some(existing) if existing.kind() != data.kind() => {
                    return Err(MeshError::AttributeTypeChanged {
                        name: name.to_string(),
                        expected: existing.kind(),
                        found: data.kind(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Overwrite this set's arrays with the arrays present in `update`.
    ///
    /// Callers run [`check_update`](Self::check_update) first; this does not add names.
    pub fn merge(&mut self, update: VertexAttributeSet) {
        for (name, data) in update.attributes {
            if let Some(slot) = self.attributes.get_mut(&name) {
                *slot = data;
            }
        }
    }
}
