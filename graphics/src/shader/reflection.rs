//! WGSL parsing and program reflection.
//!
//! Vertex and fragment sources are parsed and validated as separate naga modules.
//! Reflection then walks both modules once and produces a [`ShaderReflection`]:
//!
//! - vertex inputs of the vertex entry point, each given an engine slot
//!   (`position` 0, `normal` 1, `uv` 2, `color` 3, anything else 4.. in
//!   declaration order);
//! - every `var<uniform>` and texture global, each given a dense [`UniformId`];
//!   names declared in both stages share one id;
//! - the split of those uniforms into engine-managed globals (the `g_` prefix,
//!   see [`GlobalRole`]) and material uniforms.
//!
//! Samplers are not uniforms at this level; a backend pairs them with textures.

use kestrel_core::mesh::ScalarKind;
use naga::{AddressSpace, ArraySize, Binding, ImageDimension, Module, ShaderStage, TypeInner};

use super::error::ShaderError;
use super::uniform::{
    AttributeInfo, GlobalBindings, GlobalRole, ShaderStageFlags, UniformId, UniformInfo,
    UniformType,
};

/// Attribute names bound to fixed slots, in slot order.
pub const RESERVED_ATTRIBUTES: [&str; 4] = ["position", "normal", "uv", "color"];

/// Everything reflected from one linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<UniformInfo>,
    globals: GlobalBindings,
}

impl ShaderReflection {
    /// Vertex inputs, in declaration order.
    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Every uniform, engine-managed ones included, in id order.
    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    /// Look up any uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Uniforms a material may set: everything outside the reserved prefix.
    pub fn material_uniforms(&self) -> impl Iterator<Item = &UniformInfo> {
        self.uniforms
            .iter()
            .filter(|u| !u.name.starts_with(GlobalRole::PREFIX))
    }

    /// Engine-managed roles the program declares.
    pub fn globals(&self) -> &GlobalBindings {
        &self.globals
    }
}

/// Parse and validate one WGSL stage.
pub fn compile_stage(stage: &'static str, source: &str) -> Result<Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| ShaderError::Validation {
            stage,
            diagnostic: e.emit_to_string(source),
        })?;

    Ok(module)
}

/// Reflect a vertex + fragment module pair.
pub fn reflect(vertex: &Module, fragment: &Module) -> Result<ShaderReflection, ShaderError> {
    if !fragment
        .entry_points
        .iter()
        .any(|ep| ep.stage == ShaderStage::Fragment)
    {
        return Err(ShaderError::MissingEntryPoint("fragment"));
    }

    let attributes = reflect_attributes(vertex)?;

    let mut uniforms: Vec<UniformInfo> = Vec::new();
    collect_uniforms(vertex, ShaderStageFlags::VERTEX, &mut uniforms)?;
    collect_uniforms(fragment, ShaderStageFlags::FRAGMENT, &mut uniforms)?;

    let mut globals = GlobalBindings::default();
    for uniform in &uniforms {
        if !uniform.name.starts_with(GlobalRole::PREFIX) {
            continue;
        }
        let Some(role) = GlobalRole::from_uniform_name(&uniform.name) else {
            log::warn!(
                "Uniform '{}' uses the reserved prefix but names no engine role; it will not be set",
                uniform.name
            );
            continue;
        };
        let shape_ok = role.is_array() || uniform.array_size == 1;
        if uniform.ty != role.expected_type() || !shape_ok {
            return Err(ShaderError::ReservedUniformType {
                name: uniform.name.clone(),
                expected: role.expected_type(),
                found: uniform.ty,
            });
        }
        globals.set(role, uniform.id, uniform.array_size);
    }

    log::debug!(
        "Reflected {} attributes, {} uniforms ({} engine-managed)",
        attributes.len(),
        uniforms.len(),
        globals.iter().count()
    );

    Ok(ShaderReflection {
        attributes,
        uniforms,
        globals,
    })
}

fn reflect_attributes(module: &Module) -> Result<Vec<AttributeInfo>, ShaderError> {
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Vertex)
        .ok_or(ShaderError::MissingEntryPoint("vertex"))?;

    // (name, location, type) in declaration order
    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        match &argument.binding {
            Some(Binding::Location { location, .. }) => {
                inputs.push((argument.name.clone(), *location, argument.ty));
            }
            Some(Binding::BuiltIn(_)) => {}
            None => {
                if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let Some(Binding::Location { location, .. }) = &member.binding {
                            inputs.push((member.name.clone(), *location, member.ty));
                        }
                    }
                }
            }
        }
    }

    let mut next_slot = RESERVED_ATTRIBUTES.len() as u32;
    let mut attributes = Vec::with_capacity(inputs.len());
    for (name, location, ty) in inputs {
        let name = name.unwrap_or_else(|| format!("location{location}"));
        let inner = &module.types[ty].inner;
        let (scalar, components) = match inner {
            TypeInner::Scalar(scalar) => (scalar, 1),
            TypeInner::Vector { size, scalar } => (scalar, *size as u32),
            other => {
                return Err(ShaderError::UnsupportedAttributeType {
                    name,
                    ty: format!("{other:?}"),
                })
            }
        };
        let scalar_kind = match scalar.kind {
            naga::ScalarKind::Float => ScalarKind::Float,
            naga::ScalarKind::Sint => ScalarKind::Sint,
            naga::ScalarKind::Uint => ScalarKind::Uint,
            _ => {
                return Err(ShaderError::UnsupportedAttributeType {
                    name,
                    ty: format!("{inner:?}"),
                })
            }
        };

        let slot = match RESERVED_ATTRIBUTES.iter().position(|r| *r == name) {
            Some(reserved) => reserved as u32,
            None => {
                next_slot += 1;
                next_slot - 1
            }
        };

        attributes.push(AttributeInfo {
            name,
            slot,
            location,
            scalar_kind,
            components,
        });
    }

    Ok(attributes)
}

fn collect_uniforms(
    module: &Module,
    stage: ShaderStageFlags,
    uniforms: &mut Vec<UniformInfo>,
) -> Result<(), ShaderError> {
    for (_, variable) in module.global_variables.iter() {
        if !matches!(variable.space, AddressSpace::Uniform | AddressSpace::Handle) {
            continue;
        }
        let Some(name) = variable.name.clone() else {
            continue;
        };
        let Some((ty, array_size)) = uniform_type(module, variable.ty, &name)? else {
            continue;
        };

        if let Some(existing) = uniforms.iter_mut().find(|u| u.name == name) {
            if existing.ty != ty || existing.array_size != array_size {
                return Err(ShaderError::UniformStageConflict { name });
            }
            existing.stages |= stage;
            continue;
        }

        uniforms.push(UniformInfo {
            id: UniformId(uniforms.len() as u32),
            name,
            ty,
            array_size,
            stages: stage,
            binding: variable.binding.as_ref().map(|b| (b.group, b.binding)),
        });
    }
    Ok(())
}

/// Engine type and array length of a global, or `None` for samplers and
/// struct blocks, which materials cannot hold.
fn uniform_type(
    module: &Module,
    ty: naga::Handle<naga::Type>,
    name: &str,
) -> Result<Option<(UniformType, u32)>, ShaderError> {
    let unsupported = |inner: &TypeInner| ShaderError::UnsupportedUniformType {
        name: name.to_string(),
        ty: format!("{inner:?}"),
    };

    let inner = &module.types[ty].inner;
    match inner {
        TypeInner::Sampler { .. } => Ok(None),
        TypeInner::Struct { .. } => {
            log::warn!(
                "Uniform block '{name}' is a struct; it is not reflected and will not be set"
            );
            Ok(None)
        }
        TypeInner::Array { base, size, .. } => {
            let count = match size {
                ArraySize::Constant(count) => count.get(),
                _ => return Err(unsupported(inner)),
            };
            let element = &module.types[*base].inner;
            let ty = plain_uniform_type(element).ok_or_else(|| unsupported(inner))?;
            if ty.is_texture() {
                return Err(unsupported(inner));
            }
            Ok(Some((ty, count)))
        }
        other => plain_uniform_type(other)
            .map(|ty| Some((ty, 1)))
            .ok_or_else(|| unsupported(inner)),
    }
}

fn plain_uniform_type(inner: &TypeInner) -> Option<UniformType> {
    use naga::ScalarKind as Kind;

    match inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            Kind::Float => Some(UniformType::Float),
            Kind::Sint | Kind::Uint => Some(UniformType::Int),
            _ => None,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == Kind::Float => match size {
            naga::VectorSize::Tri => Some(UniformType::Vec3),
            naga::VectorSize::Quad => Some(UniformType::Vec4),
            _ => None,
        },
        TypeInner::Matrix { columns, rows, .. } => match (columns, rows) {
            (naga::VectorSize::Tri, naga::VectorSize::Tri) => Some(UniformType::Mat3),
            (naga::VectorSize::Quad, naga::VectorSize::Quad) => Some(UniformType::Mat4),
            _ => None,
        },
        TypeInner::Image {
            dim, arrayed: false, ..
        } => match dim {
            ImageDimension::D2 => Some(UniformType::Texture2D),
            ImageDimension::Cube => Some(UniformType::TextureCube),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> g_model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> g_projection: mat4x4<f32>;
@group(1) @binding(0) var<uniform> wave: f32;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(
    @location(0) tangent: vec4<f32>,
    @location(1) color: vec4<f32>,
    @location(2) position: vec3<f32>,
    @location(3) joints: vec4<u32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = g_projection * g_model * vec4<f32>(position + tangent.xyz * wave, 1.0);
    out.color = color + vec4<f32>(joints) * 0.0;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
@group(1) @binding(0) var<uniform> wave: f32;
@group(1) @binding(1) var<uniform> tint: vec4<f32>;
@group(1) @binding(2) var albedo: texture_2d<f32>;
@group(1) @binding(3) var albedo_sampler: sampler;
@group(0) @binding(2) var<uniform> g_light_color_range: array<vec4<f32>, 4>;

@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = textureSample(albedo, albedo_sampler, vec2<f32>(0.5, 0.5));
    return color * tint * texel * wave + g_light_color_range[0];
}
"#;

    fn reflect_sources(vertex: &str, fragment: &str) -> Result<ShaderReflection, ShaderError> {
        let vs = compile_stage("vertex", vertex)?;
        let fs = compile_stage("fragment", fragment)?;
        reflect(&vs, &fs)
    }

    #[test]
    fn test_attribute_slots() {
        let reflection = reflect_sources(VERTEX, FRAGMENT).unwrap();
        let slots: Vec<(&str, u32)> = reflection
            .attributes()
            .iter()
            .map(|a| (a.name.as_str(), a.slot))
            .collect();
        assert_eq!(
            slots,
            [("tangent", 4), ("color", 3), ("position", 0), ("joints", 5)]
        );

        let joints = reflection.attribute("joints").unwrap();
        assert_eq!(joints.scalar_kind, ScalarKind::Uint);
        assert_eq!(joints.components, 4);
        assert_eq!(joints.location, 3);
    }

    #[test]
    fn test_uniform_ids_and_stages() {
        let reflection = reflect_sources(VERTEX, FRAGMENT).unwrap();
        let names: Vec<&str> = reflection.uniforms().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            ["g_model", "g_projection", "wave", "tint", "albedo", "g_light_color_range"]
        );
        for (i, uniform) in reflection.uniforms().iter().enumerate() {
            assert_eq!(uniform.id, UniformId(i as u32));
        }

        let wave = reflection.uniform("wave").unwrap();
        assert_eq!(wave.stages, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT);
        assert_eq!(reflection.uniform("albedo").unwrap().ty, UniformType::Texture2D);
        assert!(reflection.uniform("albedo_sampler").is_none());
    }

    #[test]
    fn test_global_split() {
        let reflection = reflect_sources(VERTEX, FRAGMENT).unwrap();
        let material: Vec<&str> = reflection
            .material_uniforms()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(material, ["wave", "tint", "albedo"]);

        let globals = reflection.globals();
        assert_eq!(globals.get(GlobalRole::Model), Some(UniformId(0)));
        assert_eq!(globals.get(GlobalRole::View), None);
        assert_eq!(globals.array_size(GlobalRole::LightColorRange), Some(4));
    }

    #[test]
    fn test_reserved_uniform_wrong_type() {
        let vertex = r#"
@group(0) @binding(0) var<uniform> g_model: vec4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return g_model + vec4<f32>(position, 1.0);
}
"#;
        let fragment = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let err = reflect_sources(vertex, fragment).unwrap_err();
        assert_eq!(
            err,
            ShaderError::ReservedUniformType {
                name: "g_model".to_string(),
                expected: UniformType::Mat4,
                found: UniformType::Vec4,
            }
        );
    }

    #[test]
    fn test_stage_conflict() {
        let vertex = r#"
@group(1) @binding(0) var<uniform> scale: f32;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position * scale, 1.0);
}
"#;
        let fragment = r#"
@group(1) @binding(0) var<uniform> scale: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return scale;
}
"#;
        assert!(matches!(
            reflect_sources(vertex, fragment),
            Err(ShaderError::UniformStageConflict { .. })
        ));
    }

    #[test]
    fn test_struct_uniform_block_is_skipped() {
        let fragment = r#"
struct Params {
    exposure: f32,
    tint: vec4<f32>,
}

@group(1) @binding(1) var<uniform> params: Params;
@group(1) @binding(2) var<uniform> gain: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return params.tint * params.exposure * gain;
}
"#;
        let reflection = reflect_sources(VERTEX, fragment).unwrap();
        assert!(reflection.uniform("params").is_none());
        let material: Vec<&str> = reflection
            .material_uniforms()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(material, ["wave", "gain"]);
        assert_eq!(reflection.uniform("gain").unwrap().ty, UniformType::Float);
    }

    #[test]
    fn test_struct_vertex_input() {
        let vertex = r#"
struct VertexInput {
    @location(0) uv: vec2<f32>,
    @location(1) position: vec3<f32>,
    @builtin(vertex_index) index: u32,
}

@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    return vec4<f32>(input.position + vec3<f32>(input.uv, 0.0), 1.0);
}
"#;
        let fragment = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let reflection = reflect_sources(vertex, fragment).unwrap();
        let slots: Vec<(&str, u32)> = reflection
            .attributes()
            .iter()
            .map(|a| (a.name.as_str(), a.slot))
            .collect();
        assert_eq!(slots, [("uv", 2), ("position", 0)]);
    }

    #[test]
    fn test_parse_error_has_diagnostic() {
        let err = compile_stage("vertex", "fn broken( {").unwrap_err();
        match err {
            ShaderError::Parse { stage, diagnostic } => {
                assert_eq!(stage, "vertex");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fragment_entry_point() {
        let vs = compile_stage("vertex", VERTEX).unwrap();
        assert_eq!(
            reflect(&vs, &vs),
            Err(ShaderError::MissingEntryPoint("fragment"))
        );
    }
}
