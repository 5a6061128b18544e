//! Graphics error types.

use thiserror::Error;

use kestrel_core::mesh::MeshError;

use crate::backend::BackendError;
use crate::shader::{ShaderError, UniformType};

/// Errors from setting material values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    /// The material's program declares no such material uniform.
    #[error("shader has no material uniform '{0}'")]
    UnknownUniform(String),
    /// The value does not have the uniform's declared type.
    #[error("uniform '{name}' is {expected:?}, got {found}")]
    TypeMismatch {
        name: String,
        expected: UniformType,
        found: &'static str,
    },
}

/// Errors from issuing draws.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A newer pass was opened on the same context.
    #[error("render pass was abandoned by a newer pass")]
    PassAbandoned,
    /// A submesh draw got a different number of materials than index sets.
    #[error("mesh has {index_sets} index sets but {materials} materials were given")]
    MaterialCountMismatch { index_sets: usize, materials: usize },
    /// A draw needs more textures than the context allows.
    #[error("draw binds more than {limit} textures")]
    TooManyTextures { limit: u32 },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors that can occur in the graphics system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphicsError {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::InvalidParameter("zero size".to_string());
        assert_eq!(err.to_string(), "invalid parameter: zero size");

        let err: GraphicsError = RenderError::MaterialCountMismatch {
            index_sets: 2,
            materials: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "mesh has 2 index sets but 1 materials were given"
        );

        let err: GraphicsError = MeshError::NewAttribute("tangent".to_string()).into();
        assert!(err.to_string().contains("tangent"));
    }
}
