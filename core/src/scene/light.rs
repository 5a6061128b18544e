//! Light types for the scene.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Number of light slots a shader sees.
pub const MAX_LIGHTS: usize = 4;

/// Kind of light in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Omni light at a position, attenuated over `range`.
    Point,
    /// Infinitely distant light along a direction.
    Directional,
    /// Slot is ignored by shaders.
    #[default]
    Unused,
}

impl LightType {
    /// Type tag written into the `w` of the position/type uniform.
    pub fn tag(&self) -> f32 {
        match self {
            Self::Point => 0.0,
            Self::Directional => 1.0,
            Self::Unused => 2.0,
        }
    }
}

/// A single light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub range: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Unused,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            color: Vec3::ONE,
            range: 100.0,
        }
    }
}

impl Light {
    pub fn point(position: Vec3, color: Vec3, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            color,
            range,
            ..Self::default()
        }
    }

    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            light_type: LightType::Directional,
            direction: direction.normalize_or_zero(),
            color,
            ..Self::default()
        }
    }
}

/// Per-slot light data as the shader reads it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniforms {
    /// xyz = view-space position (point) or direction (directional), w = type tag
    pub position_type: [Vec4; MAX_LIGHTS],
    /// xyz = color, w = range
    pub color_range: [Vec4; MAX_LIGHTS],
}

/// Ambient light plus up to [`MAX_LIGHTS`] lights.
///
/// Mutated between frames; a render pass only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLights {
    lights: Vec<Light>,
    ambient: Vec3,
}

impl Default for WorldLights {
    fn default() -> Self {
        Self {
            lights: Vec::with_capacity(MAX_LIGHTS),
            ambient: Vec3::splat(0.2),
        }
    }
}

impl WorldLights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a light. Returns its slot, or `None` when all slots are taken.
    pub fn add_light(&mut self, light: Light) -> Option<usize> {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("WorldLights is full ({MAX_LIGHTS} lights); light ignored");
            return None;
        }
        self.lights.push(light);
        Some(self.lights.len() - 1)
    }

    /// Replace the light in an occupied slot. Returns `false` if the slot is empty.
    pub fn set_light(&mut self, index: usize, light: Light) -> bool {
        match self.lights.get_mut(index) {
            Some(slot) => {
                *slot = light;
                true
            }
            None => false,
        }
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn ambient_light(&self) -> Vec3 {
        self.ambient
    }

    pub fn set_ambient_light(&mut self, color: Vec3) {
        self.ambient = color;
    }

    /// Encode every slot for the shader, with positions and directions moved into
    /// the space of `view`. Slots past the last light are tagged unused.
    pub fn encode(&self, view: Mat4) -> LightUniforms {
        let mut out = LightUniforms {
            position_type: [Vec4::new(0.0, 0.0, 0.0, LightType::Unused.tag()); MAX_LIGHTS],
            color_range: [Vec4::ZERO; MAX_LIGHTS],
        };

        for (i, light) in self.lights.iter().enumerate() {
            let xyz = match light.light_type {
                LightType::Point => view.transform_point3(light.position),
                LightType::Directional => {
                    view.transform_vector3(light.direction).normalize_or_zero()
                }
                LightType::Unused => Vec3::ZERO,
            };
            out.position_type[i] = xyz.extend(light.light_type.tag());
            out.color_range[i] = light.color.extend(light.range);
        }

        out
    }
}
