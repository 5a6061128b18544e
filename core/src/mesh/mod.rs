//! CPU-side mesh types and generators.
//!
//! This module provides GPU-agnostic mesh data structures:
//!
//! - [`AttributeData`] / [`VertexAttributeSet`] - Named, typed per-vertex arrays
//! - [`InterleavedLayout`] - Offset table and stride for packing those arrays into one buffer
//! - [`MeshDescriptor`] - Description used to create or update a GPU mesh
//! - Generators for common shapes (cube, quad, sphere)
//!
//! These types are re-exported by `kestrel-graphics` for convenience.

mod attribute;
mod data;
mod error;
pub mod generators;
mod layout;

pub use attribute::{
    attribute_default, AttributeData, AttributeKind, ScalarKind, VertexAttributeSet,
};
pub use data::{IndexSet, MeshDescriptor, Topology};
pub use error::MeshError;
pub use layout::{AttributeLayout, InterleavedLayout, STRIDE_ALIGNMENT};
