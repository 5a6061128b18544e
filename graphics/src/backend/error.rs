//! Backend error types.

use thiserror::Error;

/// Errors that can occur in backend operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// The program failed to link; carries the backend's diagnostic.
    #[error("program link failed: {0}")]
    LinkFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// A handle did not name a live resource.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
}
