//! Camera and light state consumed by render passes.
//!
//! - [`Camera`] / [`Projection`] - View transform, projection mode and viewport
//! - [`WorldLights`] / [`Light`] - Ambient light plus a bounded set of lights

mod camera;
mod light;

pub use camera::{Camera, PixelViewport, Projection, Viewport};
pub use light::{Light, LightType, LightUniforms, WorldLights, MAX_LIGHTS};
