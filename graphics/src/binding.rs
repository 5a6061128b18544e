//! Mesh-to-program attribute bindings and their cache.
//!
//! Binding a mesh to a program means deciding, for every vertex input the program
//! declares, whether it is fed from the mesh's interleaved buffer (and at which
//! offset) or from a constant because the mesh lacks a compatible attribute. The
//! answer depends only on the mesh layout and the program reflection, so it is
//! computed once per `(mesh, program, program generation)` and reused.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec4;
use kestrel_core::mesh::{AttributeKind, InterleavedLayout};

use crate::device::ResourceId;
use crate::shader::ShaderReflection;

/// Where one vertex input reads its data from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeSource {
    /// Interleaved from the mesh vertex buffer.
    Buffer { kind: AttributeKind, offset: u32 },
    /// Per-vertex array disabled; the input reads this constant.
    Constant(Vec4),
}

/// Source of one engine attribute slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotBinding {
    pub slot: u32,
    pub source: AttributeSource,
}

/// Resolved attribute sources for a mesh drawn with a program.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBinding {
    pub stride: u32,
    pub slots: Vec<SlotBinding>,
}

impl MeshBinding {
    /// Resolve every vertex input of `reflection` against `layout`.
    pub fn derive(reflection: &ShaderReflection, layout: &InterleavedLayout) -> Self {
        let slots = reflection
            .attributes()
            .iter()
            .map(|input| {
                let source = match layout.get(&input.name) {
                    Some(attribute) if input.accepts(attribute.kind) => AttributeSource::Buffer {
                        kind: attribute.kind,
                        offset: attribute.offset,
                    },
                    Some(attribute) => {
                        log::warn!(
                            "Mesh attribute '{}' is {:?} but the shader reads {}x {:?}; using a constant",
                            input.name,
                            attribute.kind,
                            input.components,
                            input.scalar_kind
                        );
                        AttributeSource::Constant(missing_attribute_value(&input.name))
                    }
                    None => AttributeSource::Constant(missing_attribute_value(&input.name)),
                };
                SlotBinding {
                    slot: input.slot,
                    source,
                }
            })
            .collect();

        Self {
            stride: layout.stride(),
            slots,
        }
    }

    /// Number of inputs fed from constants.
    pub fn constant_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.source, AttributeSource::Constant(_)))
            .count()
    }
}

/// Constant a program sees for an input the mesh does not provide.
///
/// Missing colors read opaque white so unlit shaders still show geometry.
pub fn missing_attribute_value(name: &str) -> Vec4 {
    if name == "color" {
        Vec4::ONE
    } else {
        Vec4::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BindingKey {
    pub mesh: ResourceId,
    pub shader: ResourceId,
    pub generation: u64,
}

/// Counters of the binding cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub(crate) struct BindingCache {
    entries: HashMap<BindingKey, Arc<MeshBinding>>,
    hits: u64,
    misses: u64,
}

impl BindingCache {
    pub fn get_or_insert_with(
        &mut self,
        key: BindingKey,
        derive: impl FnOnce() -> MeshBinding,
    ) -> Arc<MeshBinding> {
        if let Some(binding) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(binding);
        }
        self.misses += 1;

        // A newer generation makes older entries for the same pair unreachable.
        self.entries
            .retain(|k, _| !(k.mesh == key.mesh && k.shader == key.shader));

        let binding = Arc::new(derive());
        self.entries.insert(key, Arc::clone(&binding));
        binding
    }

    pub fn record_uncached(&mut self) {
        self.misses += 1;
    }

    pub fn purge_mesh(&mut self, mesh: ResourceId) {
        self.entries.retain(|k, _| k.mesh != mesh);
    }

    pub fn purge_shader(&mut self, shader: ResourceId) {
        self.entries.retain(|k, _| k.shader != shader);
    }

    pub fn stats(&self) -> BindingCacheStats {
        BindingCacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
