//! Reflected uniform and attribute descriptions.

use kestrel_core::mesh::{AttributeKind, ScalarKind};

bitflags::bitflags! {
    /// Shader stages that read a uniform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
    }
}

/// Integer id of a uniform within one program.
///
/// Ids are dense, assigned in reflection order, and are what the draw path uses
/// instead of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformId(pub u32);

/// Type of a uniform as the engine understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Texture2D,
    TextureCube,
}

impl UniformType {
    /// Whether values of this type are textures bound to units.
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture2D | Self::TextureCube)
    }
}

/// One uniform declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub id: UniformId,
    pub name: String,
    pub ty: UniformType,
    /// Element count; 1 for non-arrays.
    pub array_size: u32,
    pub stages: ShaderStageFlags,
    /// `(group, binding)` as declared in the source.
    pub binding: Option<(u32, u32)>,
}

/// One vertex input declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    /// Engine slot the mesh attribute is bound to.
    pub slot: u32,
    /// `@location` in the source.
    pub location: u32,
    pub scalar_kind: ScalarKind,
    pub components: u32,
}

impl AttributeInfo {
    /// Whether a mesh attribute of `kind` can feed this input.
    ///
    /// Component count must match exactly; signed and unsigned integers are
    /// interchangeable.
    pub fn accepts(&self, kind: AttributeKind) -> bool {
        let scalar_ok = match (self.scalar_kind, kind.scalar_kind()) {
            (ScalarKind::Float, ScalarKind::Float) => true,
            (ScalarKind::Sint | ScalarKind::Uint, ScalarKind::Sint | ScalarKind::Uint) => true,
            _ => false,
        };
        scalar_ok && self.components == kind.component_count()
    }
}

/// Engine-managed uniform roles. Shaders opt in by declaring the uniform name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalRole {
    Model,
    View,
    Projection,
    NormalMatrix,
    Viewport,
    AmbientLight,
    LightPositionType,
    LightColorRange,
}

impl GlobalRole {
    /// Every role, in a fixed order.
    pub const ALL: [GlobalRole; 8] = [
        GlobalRole::Model,
        GlobalRole::View,
        GlobalRole::Projection,
        GlobalRole::NormalMatrix,
        GlobalRole::Viewport,
        GlobalRole::AmbientLight,
        GlobalRole::LightPositionType,
        GlobalRole::LightColorRange,
    ];

    /// Prefix that marks a uniform as engine-managed.
    pub const PREFIX: &'static str = "g_";

    /// Uniform name a shader declares to receive this role.
    pub fn uniform_name(&self) -> &'static str {
        match self {
            Self::Model => "g_model",
            Self::View => "g_view",
            Self::Projection => "g_projection",
            Self::NormalMatrix => "g_normal_matrix",
            Self::Viewport => "g_viewport",
            Self::AmbientLight => "g_ambient_light",
            Self::LightPositionType => "g_light_position_type",
            Self::LightColorRange => "g_light_color_range",
        }
    }

    /// Look up the role for a reserved uniform name.
    pub fn from_uniform_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.uniform_name() == name)
    }

    /// Type the uniform must be declared with.
    pub fn expected_type(&self) -> UniformType {
        match self {
            Self::Model | Self::View | Self::Projection => UniformType::Mat4,
            Self::NormalMatrix => UniformType::Mat3,
            Self::Viewport
            | Self::AmbientLight
            | Self::LightPositionType
            | Self::LightColorRange => UniformType::Vec4,
        }
    }

    /// Whether the role is a per-light array.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::LightPositionType | Self::LightColorRange)
    }

    fn index(&self) -> usize {
        match self {
            Self::Model => 0,
            Self::View => 1,
            Self::Projection => 2,
            Self::NormalMatrix => 3,
            Self::Viewport => 4,
            Self::AmbientLight => 5,
            Self::LightPositionType => 6,
            Self::LightColorRange => 7,
        }
    }
}

/// Which roles a program declares, and under which uniform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalBindings {
    slots: [Option<(UniformId, u32)>; 8],
}

impl GlobalBindings {
    /// Uniform id bound to `role`, if the program declares it.
    pub fn get(&self, role: GlobalRole) -> Option<UniformId> {
        self.slots[role.index()].map(|(id, _)| id)
    }

    /// Declared array length for `role`.
    pub fn array_size(&self, role: GlobalRole) -> Option<u32> {
        self.slots[role.index()].map(|(_, size)| size)
    }

    pub(crate) fn set(&mut self, role: GlobalRole, id: UniformId, array_size: u32) {
        self.slots[role.index()] = Some((id, array_size));
    }

    /// Declared roles with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (GlobalRole, UniformId)> + '_ {
        GlobalRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|id| (role, id)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
