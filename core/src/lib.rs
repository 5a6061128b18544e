//! # Kestrel Core
//!
//! GPU-agnostic data for the Kestrel renderer: named vertex attributes and the
//! interleaved layout they pack into, mesh descriptors, camera projection and
//! world lights.

pub mod math;
pub mod mesh;
pub mod profiling;
pub mod scene;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
