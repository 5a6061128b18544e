use thiserror::Error;

use crate::backend::BackendError;

use super::uniform::UniformType;

/// Errors raised while building a shader program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaderError {
    #[error("{stage} shader failed to parse:\n{diagnostic}")]
    Parse {
        stage: &'static str,
        diagnostic: String,
    },

    #[error("{stage} shader failed validation:\n{diagnostic}")]
    Validation {
        stage: &'static str,
        diagnostic: String,
    },

    #[error("{0} shader has no {0} entry point")]
    MissingEntryPoint(&'static str),

    #[error("uniform '{name}' has unsupported type {ty}")]
    UnsupportedUniformType { name: String, ty: String },

    #[error("vertex input '{name}' has unsupported type {ty}")]
    UnsupportedAttributeType { name: String, ty: String },

    #[error("uniform '{name}' is declared with different types in the vertex and fragment stages")]
    UniformStageConflict { name: String },

    #[error("reserved uniform '{name}' must be {expected:?}, found {found:?}")]
    ReservedUniformType {
        name: String,
        expected: UniformType,
        found: UniformType,
    },

    #[error(transparent)]
    Link(#[from] BackendError),
}
