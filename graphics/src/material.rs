//! Materials: named uniform values for one shader program.
//!
//! A [`Material`] holds one value for every material uniform its program declares
//! (every uniform outside the `g_` prefix). Values start at type defaults: white
//! textures, `1` vectors, identity matrices and zero scalars. Setting a name the
//! program does not declare, or a value of the wrong type, is an error.
//!
//! When the program is swapped ([`Material::set_shader`]) or rebuilt in place,
//! values whose name and type survive are kept, vanished uniforms are dropped and
//! new ones start at their defaults.
//!
//! # Example
//!
//! ```ignore
//! let shader = context.standard_shader(StandardShader::BlinnPhong)?;
//! let material = Material::new(&context, shader)?;
//! material.set("color", Vec4::new(0.8, 0.1, 0.1, 1.0))?;
//! material.set("specularity", 32.0_f32)?;
//! material.set("tex", bricks.clone())?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3, Vec4};
use parking_lot::RwLock;

use crate::backend::{GpuBackend, UniformData};
use crate::context::RenderContext;
use crate::error::{GraphicsError, MaterialError, RenderError};
use crate::shader::{ProgramSnapshot, ShaderProgram, ShaderReflection, UniformType};
use crate::texture::{Texture, TextureKind};

/// A value a material uniform can hold.
#[derive(Debug, Clone)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Texture(Arc<Texture>),
}

impl UniformValue {
    /// Whether this value can be assigned to a uniform of type `ty`.
    pub fn matches(&self, ty: UniformType) -> bool {
        match (self, ty) {
            (Self::Int(_), UniformType::Int)
            | (Self::Float(_), UniformType::Float)
            | (Self::Vec3(_), UniformType::Vec3)
            | (Self::Vec4(_), UniformType::Vec4)
            | (Self::Mat3(_), UniformType::Mat3)
            | (Self::Mat4(_), UniformType::Mat4) => true,
            (Self::Texture(t), UniformType::Texture2D) => t.kind() == TextureKind::Texture2D,
            (Self::Texture(t), UniformType::TextureCube) => t.kind() == TextureKind::CubeMap,
            _ => false,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
            Self::Texture(t) => match t.kind() {
                TextureKind::Texture2D => "texture_2d",
                TextureKind::CubeMap => "texture_cube",
            },
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<Texture>> {
        match self {
            Self::Texture(t) => Some(t),
            _ => None,
        }
    }

    fn to_uniform_data(&self) -> Option<UniformData> {
        Some(match self {
            Self::Int(v) => UniformData::Int(*v),
            Self::Float(v) => UniformData::Float(*v),
            Self::Vec3(v) => UniformData::Vec3(*v),
            Self::Vec4(v) => UniformData::Vec4(*v),
            Self::Mat3(v) => UniformData::Mat3(*v),
            Self::Mat4(v) => UniformData::Mat4(*v),
            Self::Texture(_) => return None,
        })
    }
}

impl PartialEq for UniformValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Vec3(a), Self::Vec3(b)) => a == b,
            (Self::Vec4(a), Self::Vec4(b)) => a == b,
            (Self::Mat3(a), Self::Mat3(b)) => a == b,
            (Self::Mat4(a), Self::Mat4(b)) => a == b,
            (Self::Texture(a), Self::Texture(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        Self::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

impl From<Arc<Texture>> for UniformValue {
    fn from(v: Arc<Texture>) -> Self {
        Self::Texture(v)
    }
}

struct MaterialState {
    shader: Arc<ShaderProgram>,
    generation: u64,
    values: BTreeMap<String, UniformValue>,
}

/// Uniform values for one shader program.
pub struct Material {
    name: Option<String>,
    white_texture: Arc<Texture>,
    white_cubemap: Arc<Texture>,
    state: RwLock<MaterialState>,
}

impl Material {
    /// Create a material for `shader` with every uniform at its default.
    pub fn new(context: &RenderContext, shader: Arc<ShaderProgram>) -> Result<Self, GraphicsError> {
        let material = Self {
            name: None,
            white_texture: context.white_texture()?,
            white_cubemap: context.white_cubemap()?,
            state: RwLock::new(MaterialState {
                generation: shader.generation(),
                shader,
                values: BTreeMap::new(),
            }),
        };
        {
            let mut state = material.state.write();
            let reflection = state.shader.reflection();
            state.values = material.derive_values(&reflection, BTreeMap::new());
        }
        Ok(material)
    }

    /// Set a debug name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The program this material feeds.
    pub fn shader(&self) -> Arc<ShaderProgram> {
        self.sync();
        Arc::clone(&self.state.read().shader)
    }

    /// Switch to another program, keeping values whose name and type still match.
    pub fn set_shader(&self, shader: Arc<ShaderProgram>) {
        let reflection = shader.reflection();
        let mut state = self.state.write();
        let previous = std::mem::take(&mut state.values);
        state.values = self.derive_values(&reflection, previous);
        state.generation = shader.generation();
        state.shader = shader;
    }

    /// Set a uniform value.
    ///
    /// # Errors
    ///
    /// [`MaterialError::UnknownUniform`] if the program has no material uniform of
    /// that name (engine-managed `g_` uniforms included), or
    /// [`MaterialError::TypeMismatch`] if the value has the wrong type.
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) -> Result<(), MaterialError> {
        self.sync();
        let value = value.into();
        let mut state = self.state.write();
        let ty = state
            .shader
            .uniform(name)
            .filter(|_| !name.starts_with(crate::shader::GlobalRole::PREFIX))
            .map(|info| info.ty)
            .ok_or_else(|| MaterialError::UnknownUniform(name.to_string()))?;

        if !value.matches(ty) {
            return Err(MaterialError::TypeMismatch {
                name: name.to_string(),
                expected: ty,
                found: value.type_name(),
            });
        }
        state.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Current value of a material uniform.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.sync();
        self.state.read().values.get(name).cloned()
    }

    /// Names of the uniforms this material holds, sorted.
    pub fn uniform_names(&self) -> Vec<String> {
        self.sync();
        self.state.read().values.keys().cloned().collect()
    }

    /// Re-derive values if the program was rebuilt since they were last derived.
    pub(crate) fn sync(&self) {
        let stale = {
            let state = self.state.read();
            state.generation != state.shader.generation()
        };
        if !stale {
            return;
        }

        let mut state = self.state.write();
        let generation = state.shader.generation();
        if state.generation == generation {
            return;
        }
        let reflection = state.shader.reflection();
        let previous = std::mem::take(&mut state.values);
        state.values = self.derive_values(&reflection, previous);
        state.generation = generation;
        log::debug!(
            "Material: re-derived {} uniforms for shader {:?} generation {}",
            state.values.len(),
            state.shader.label(),
            generation
        );
    }

    /// Push every value to the currently used program.
    ///
    /// Texture units are assigned from `first_unit` upwards in name order;
    /// returns the next free unit.
    pub(crate) fn bind(
        &self,
        backend: &dyn GpuBackend,
        program: &ProgramSnapshot,
        first_unit: u32,
        max_units: u32,
    ) -> Result<u32, RenderError> {
        let state = self.state.read();
        let mut unit = first_unit;

        for (name, value) in &state.values {
            let Some(info) = program.reflection.uniform(name) else {
                continue;
            };
            match value {
                UniformValue::Texture(texture) => {
                    if unit >= max_units {
                        return Err(RenderError::TooManyTextures { limit: max_units });
                    }
                    backend.bind_texture(program.handle, info.id, unit, texture.handle());
                    unit += 1;
                }
                other => {
                    if let Some(data) = other.to_uniform_data() {
                        backend.set_uniform(program.handle, info.id, &data);
                    }
                }
            }
        }
        Ok(unit)
    }

    fn derive_values(
        &self,
        reflection: &ShaderReflection,
        mut previous: BTreeMap<String, UniformValue>,
    ) -> BTreeMap<String, UniformValue> {
        reflection
            .material_uniforms()
            .map(|info| {
                let value = previous
                    .remove(&info.name)
                    .filter(|v| v.matches(info.ty))
                    .unwrap_or_else(|| self.default_value(info.ty));
                (info.name.clone(), value)
            })
            .collect()
    }

    fn default_value(&self, ty: UniformType) -> UniformValue {
        match ty {
            UniformType::Int => UniformValue::Int(0),
            UniformType::Float => UniformValue::Float(0.0),
            UniformType::Vec3 => UniformValue::Vec3(Vec3::ONE),
            UniformType::Vec4 => UniformValue::Vec4(Vec4::ONE),
            UniformType::Mat3 => UniformValue::Mat3(Mat3::IDENTITY),
            UniformType::Mat4 => UniformValue::Mat4(Mat4::IDENTITY),
            UniformType::Texture2D => UniformValue::Texture(Arc::clone(&self.white_texture)),
            UniformType::TextureCube => UniformValue::Texture(Arc::clone(&self.white_cubemap)),
        }
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("shader", &state.shader.label())
            .field("values", &state.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

// Ensure Material is Send + Sync
static_assertions::assert_impl_all!(Material: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::shader::{ShaderDescriptor, StandardShader};

    const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> offset: vec3<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return g_model * vec4<f32>(position + offset, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;
@group(1) @binding(1) var<uniform> strength: f32;
@group(1) @binding(2) var tex: texture_2d<f32>;
@group(1) @binding(3) var tex_sampler: sampler;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint * strength * textureSample(tex, tex_sampler, vec2<f32>(0.5));
}
"#;

    fn create_test_context() -> RenderContext {
        RenderContext::new(Arc::new(DummyBackend::new()))
    }

    fn create_test_material(context: &RenderContext) -> Material {
        let shader = ShaderProgram::new(context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap();
        Material::new(context, shader).unwrap()
    }

    #[test]
    fn test_defaults() {
        let context = create_test_context();
        let material = create_test_material(&context);

        assert_eq!(
            material.uniform_names(),
            vec!["offset", "strength", "tex", "tint"]
        );
        assert_eq!(material.get("tint"), Some(UniformValue::Vec4(Vec4::ONE)));
        assert_eq!(material.get("offset"), Some(UniformValue::Vec3(Vec3::ONE)));
        assert_eq!(material.get("strength"), Some(UniformValue::Float(0.0)));
        let white = context.white_texture().unwrap();
        assert_eq!(material.get("tex"), Some(UniformValue::Texture(white)));
        assert_eq!(material.get("g_model"), None);
    }

    #[test]
    fn test_cube_sampler_defaults_to_white_cubemap() {
        let context = create_test_context();
        let fragment = r#"
@group(1) @binding(0) var env: texture_cube<f32>;
@group(1) @binding(1) var env_sampler: sampler;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(env, env_sampler, vec3<f32>(0.0, 0.0, 1.0));
}
"#;
        let shader = ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, fragment)).unwrap();
        let material = Material::new(&context, shader).unwrap();

        let cube = context.white_cubemap().unwrap();
        let value = material.get("env").unwrap();
        assert_eq!(value, UniformValue::Texture(Arc::clone(&cube)));
        assert_ne!(value, UniformValue::Texture(context.white_texture().unwrap()));

        assert!(matches!(
            material.set("env", context.white_texture().unwrap()),
            Err(MaterialError::TypeMismatch { .. })
        ));
        material.set("env", cube).unwrap();
    }

    #[test]
    fn test_set_checks_name_and_type() {
        let context = create_test_context();
        let material = create_test_material(&context);

        material.set("strength", 2.0_f32).unwrap();
        assert_eq!(material.get("strength"), Some(UniformValue::Float(2.0)));

        assert_eq!(
            material.set("missing", 1.0_f32),
            Err(MaterialError::UnknownUniform("missing".to_string()))
        );
        assert_eq!(
            material.set("g_model", Mat4::IDENTITY),
            Err(MaterialError::UnknownUniform("g_model".to_string()))
        );
        assert!(matches!(
            material.set("tint", 1.0_f32),
            Err(MaterialError::TypeMismatch { .. })
        ));

        let cube = context.white_cubemap().unwrap();
        assert!(matches!(
            material.set("tex", cube),
            Err(MaterialError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_set_shader_keeps_matching_values() {
        let context = create_test_context();
        let material = create_test_material(&context);
        material.set("tint", Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
        material.set("strength", 3.0_f32).unwrap();

        let other = context.standard_shader(StandardShader::Unlit).unwrap();
        material.set_shader(other);

        assert_eq!(material.uniform_names(), vec!["tint"]);
        assert_eq!(
            material.get("tint"),
            Some(UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(material.get("strength"), None);
    }

    #[test]
    fn test_rebuild_rederives_values() {
        let context = create_test_context();
        let shader = ShaderProgram::new(&context, ShaderDescriptor::new(VERTEX, FRAGMENT)).unwrap();
        let material = Material::new(&context, Arc::clone(&shader)).unwrap();
        material.set("tint", Vec4::splat(0.5)).unwrap();

        let fragment = r#"
@group(1) @binding(0) var<uniform> tint: vec4<f32>;
@group(1) @binding(1) var<uniform> exposure: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint * exposure;
}
"#;
        shader.rebuild(ShaderDescriptor::new(VERTEX, fragment)).unwrap();

        assert_eq!(material.uniform_names(), vec!["exposure", "offset", "tint"]);
        assert_eq!(material.get("tint"), Some(UniformValue::Vec4(Vec4::splat(0.5))));
        assert_eq!(material.get("exposure"), Some(UniformValue::Float(0.0)));
    }
}
