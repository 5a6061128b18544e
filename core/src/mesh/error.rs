use thiserror::Error;

use super::attribute::AttributeKind;

/// Structural errors raised while building or updating a mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Mesh has no vertex attributes")]
    NoAttributes,

    #[error("Mesh attribute arrays are all empty")]
    NoVertices,

    #[error("Cannot add attribute '{0}' to an existing mesh")]
    NewAttribute(String),

    #[error("Attribute '{name}' changed type from {expected:?} to {found:?}")]
    AttributeTypeChanged {
        name: String,
        expected: AttributeKind,
        found: AttributeKind,
    },
}
