//! Render passes: camera setup and draw submission.
//!
//! A [`RenderPass`] is opened from a [`RenderPassBuilder`], targets the context's
//! drawable (or an explicit target size) through a [`Camera`], and issues draws.
//! For every draw it:
//!
//! 1. makes the program current (skipped when it already is),
//! 2. pushes the engine-managed `g_` uniforms the program declares,
//! 3. pushes the material's values and binds its textures to units `0..`,
//! 4. binds the mesh vertex buffer and points every vertex input at its
//!    interleaved attribute, or at a constant when the mesh lacks it,
//! 5. draws each index set, or the whole vertex range when there are none.
//!
//! Only one pass is current per context. Opening another abandons the previous
//! one: it is ended on the backend and any further draw through it fails with
//! [`RenderError::PassAbandoned`].
//!
//! # Example
//!
//! ```ignore
//! let mut pass = RenderPassBuilder::new()
//!     .with_camera(&camera)
//!     .with_world_lights(&lights)
//!     .with_clear_color(Vec4::new(0.1, 0.1, 0.1, 1.0))
//!     .with_label("main")
//!     .build(&context);
//!
//! pass.draw(&ground, Mat4::IDENTITY, &ground_material)?;
//! pass.draw_submeshes(&ship, ship_transform, &[&hull, &windows])?;
//! pass.finish();
//! ```

use glam::{Mat4, UVec2, Vec3, Vec4};
use kestrel_core::math::normal_matrix;
use kestrel_core::profiling::profile_scope;
use kestrel_core::scene::{Camera, LightType, LightUniforms, PixelViewport, WorldLights};

use crate::backend::UniformData;
use crate::binding::{AttributeSource, BindingKey, MeshBinding};
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::material::Material;
use crate::mesh::{GpuIndexSet, Mesh, MeshSnapshot};
use crate::shader::{GlobalRole, ProgramSnapshot, ShaderProgram};

/// Builder for [`RenderPass`].
#[derive(Debug, Clone, Default)]
pub struct RenderPassBuilder<'a> {
    camera: Option<Camera>,
    world_lights: Option<&'a WorldLights>,
    clear_color: Option<Vec4>,
    clear_depth: Option<f32>,
    target_size: Option<UVec2>,
    label: Option<String>,
}

impl<'a> RenderPassBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// View, projection and viewport for the pass. Defaults to [`Camera::new`].
    pub fn with_camera(mut self, camera: &Camera) -> Self {
        self.camera = Some(camera.clone());
        self
    }

    /// Lights read by lit shaders. Without lights the default ambient applies and
    /// every light slot is unused.
    pub fn with_world_lights(mut self, lights: &'a WorldLights) -> Self {
        self.world_lights = Some(lights);
        self
    }

    /// Clear the color buffer when the pass opens.
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = Some(color);
        self
    }

    /// Clear the depth buffer when the pass opens.
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = Some(depth);
        self
    }

    /// Render target size in pixels. Defaults to the context's drawable size.
    pub fn with_target_size(mut self, size: UVec2) -> Self {
        self.target_size = Some(size);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Open the pass, abandoning any pass still open on `context`.
    pub fn build(self, context: &'a RenderContext) -> RenderPass<'a> {
        let serial = context.open_pass();
        let camera = self.camera.unwrap_or_default();
        let target_size = self.target_size.unwrap_or_else(|| context.drawable_size());
        let viewport = camera.pixel_viewport(target_size);
        let view = camera.view_transform();
        let projection = camera.projection_transform(viewport.size());

        let default_lights;
        let lights = match self.world_lights {
            Some(lights) => lights,
            None => {
                default_lights = WorldLights::default();
                &default_lights
            }
        };
        let light_uniforms = lights.encode(view);
        let ambient = lights.ambient_light();

        let backend = context.device().backend();
        backend.begin_pass(viewport, self.label.as_deref());
        if self.clear_color.is_some() || self.clear_depth.is_some() {
            backend.clear(self.clear_color, self.clear_depth);
        }

        log::trace!(
            "RenderPass: opened {:?} ({}), viewport {}x{} at ({}, {})",
            self.label,
            serial,
            viewport.width,
            viewport.height,
            viewport.x,
            viewport.y
        );

        RenderPass {
            context,
            serial,
            label: self.label,
            camera,
            target_size,
            viewport,
            view,
            projection,
            light_uniforms,
            ambient,
            finished: false,
        }
    }
}

/// An open render pass. Ends when finished or dropped.
pub struct RenderPass<'a> {
    context: &'a RenderContext,
    serial: u64,
    label: Option<String>,
    camera: Camera,
    target_size: UVec2,
    viewport: PixelViewport,
    view: Mat4,
    projection: Mat4,
    light_uniforms: LightUniforms,
    ambient: Vec3,
    finished: bool,
}

impl<'a> RenderPass<'a> {
    /// Whether draws through this pass still reach the backend.
    pub fn is_active(&self) -> bool {
        !self.finished && self.context.is_pass_active(self.serial)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn target_size(&self) -> UVec2 {
        self.target_size
    }

    /// Viewport in pixels.
    pub fn viewport(&self) -> PixelViewport {
        self.viewport
    }

    pub fn view_transform(&self) -> Mat4 {
        self.view
    }

    /// Projection computed for this pass's viewport size.
    pub fn projection_transform(&self) -> Mat4 {
        self.projection
    }

    /// Clear the color and/or depth buffer.
    pub fn clear(&mut self, color: Option<Vec4>, depth: Option<f32>) -> Result<(), RenderError> {
        self.ensure_active()?;
        self.context.device().backend().clear(color, depth);
        Ok(())
    }

    /// Draw every index set of `mesh` with `material`, or the whole vertex range
    /// when the mesh has no index sets.
    pub fn draw(
        &mut self,
        mesh: &Mesh,
        transform: Mat4,
        material: &Material,
    ) -> Result<(), RenderError> {
        profile_scope!("render_pass_draw");
        let shader = material.shader();
        let snapshot = self.prepare(mesh, transform, &shader, Some(material))?;
        self.submit_all(&snapshot);
        Ok(())
    }

    /// Draw `mesh` with a bare program; material uniforms keep whatever values the
    /// program last received.
    pub fn draw_with_shader(
        &mut self,
        mesh: &Mesh,
        transform: Mat4,
        shader: &ShaderProgram,
    ) -> Result<(), RenderError> {
        profile_scope!("render_pass_draw");
        let snapshot = self.prepare(mesh, transform, shader, None)?;
        self.submit_all(&snapshot);
        Ok(())
    }

    /// Draw index set `i` of `mesh` with `materials[i]`.
    ///
    /// # Errors
    ///
    /// [`RenderError::MaterialCountMismatch`] unless there is exactly one material
    /// per index set; nothing is drawn in that case.
    pub fn draw_submeshes(
        &mut self,
        mesh: &Mesh,
        transform: Mat4,
        materials: &[&Material],
    ) -> Result<(), RenderError> {
        profile_scope!("render_pass_draw_submeshes");
        self.ensure_active()?;

        let index_sets = mesh.index_set_count();
        if index_sets != materials.len() {
            return Err(RenderError::MaterialCountMismatch {
                index_sets,
                materials: materials.len(),
            });
        }

        for (index, material) in materials.iter().enumerate() {
            let shader = material.shader();
            let snapshot = self.prepare(mesh, transform, &shader, Some(*material))?;
            if let Some(set) = snapshot.index_sets.get(index) {
                self.submit_indexed(set);
            }
        }
        Ok(())
    }

    /// End the pass.
    pub fn finish(mut self) {
        self.end();
    }

    fn ensure_active(&self) -> Result<(), RenderError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(RenderError::PassAbandoned)
        }
    }

    fn prepare(
        &mut self,
        mesh: &Mesh,
        transform: Mat4,
        shader: &ShaderProgram,
        material: Option<&Material>,
    ) -> Result<MeshSnapshot, RenderError> {
        self.ensure_active()?;
        let device = self.context.device();
        let backend = device.backend();

        let program = shader.snapshot();
        device.use_program(program.handle, program.state);
        self.push_globals(&program, transform);

        if let Some(material) = material {
            let limit = self.context.parameters().max_texture_units;
            material.bind(backend, &program, 0, limit)?;
        }

        let snapshot = mesh.snapshot();
        device.bind_vertex_buffer(snapshot.vertex_buffer);

        let key = BindingKey {
            mesh: mesh.id(),
            shader: shader.id(),
            generation: program.generation,
        };
        let binding =
            device.mesh_binding(key, || MeshBinding::derive(&program.reflection, mesh.layout()));
        for slot in &binding.slots {
            match slot.source {
                AttributeSource::Buffer { kind, offset } => {
                    backend.set_attribute_pointer(slot.slot, kind, binding.stride, offset)
                }
                AttributeSource::Constant(value) => {
                    backend.set_constant_attribute(slot.slot, value)
                }
            }
        }

        Ok(snapshot)
    }

    fn push_globals(&self, program: &ProgramSnapshot, model: Mat4) {
        let backend = self.context.device().backend();
        let globals = program.reflection.globals();

        for (role, id) in globals.iter() {
            let data = match role {
                GlobalRole::Model => UniformData::Mat4(model),
                GlobalRole::View => UniformData::Mat4(self.view),
                GlobalRole::Projection => UniformData::Mat4(self.projection),
                GlobalRole::NormalMatrix => UniformData::Mat3(normal_matrix(self.view * model)),
                GlobalRole::Viewport => UniformData::Vec4(self.viewport.to_vec4()),
                GlobalRole::AmbientLight => UniformData::Vec4(self.ambient.extend(1.0)),
                GlobalRole::LightPositionType => UniformData::Vec4Array(fit_light_array(
                    &self.light_uniforms.position_type,
                    globals.array_size(role).unwrap_or(1),
                    Vec4::new(0.0, 0.0, 0.0, LightType::Unused.tag()),
                )),
                GlobalRole::LightColorRange => UniformData::Vec4Array(fit_light_array(
                    &self.light_uniforms.color_range,
                    globals.array_size(role).unwrap_or(1),
                    Vec4::ZERO,
                )),
            };
            backend.set_uniform(program.handle, id, &data);
        }
    }

    fn submit_all(&self, snapshot: &MeshSnapshot) {
        if snapshot.index_sets.is_empty() {
            if snapshot.vertex_count > 0 {
                self.context
                    .device()
                    .backend()
                    .draw(snapshot.topology, 0, snapshot.vertex_count);
                self.count_draw();
            }
            return;
        }
        for set in &snapshot.index_sets {
            self.submit_indexed(set);
        }
    }

    fn submit_indexed(&self, set: &GpuIndexSet) {
        if set.set.is_empty() {
            return;
        }
        self.context.device().backend().draw_indexed(
            set.set.topology,
            set.buffer,
            set.set.len() as u32,
        );
        self.count_draw();
    }

    fn count_draw(&self) {
        self.context
            .device()
            .update_stats(|stats| stats.draw_calls += 1);
    }

    fn end(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.context.close_pass(self.serial) {
            self.context.device().backend().end_pass();
            log::trace!("RenderPass: finished {:?} ({})", self.label, self.serial);
        }
    }
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for RenderPass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("label", &self.label)
            .field("serial", &self.serial)
            .field("viewport", &self.viewport)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Truncate or pad light data to the array length a shader declares.
fn fit_light_array(values: &[Vec4], len: u32, pad: Vec4) -> Vec<Vec4> {
    let len = len as usize;
    values
        .iter()
        .copied()
        .chain(std::iter::repeat(pad))
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{BackendCommand, DummyBackend};
    use crate::shader::StandardShader;
    use glam::Vec2;
    use kestrel_core::mesh::{generators, MeshDescriptor, Topology};
    use kestrel_core::scene::{Light, MAX_LIGHTS};

    fn create_test_context() -> (Arc<DummyBackend>, RenderContext) {
        let backend = Arc::new(DummyBackend::new());
        let context = RenderContext::new(backend.clone());
        (backend, context)
    }

    #[test]
    fn test_fit_light_array() {
        let values = [Vec4::ONE; MAX_LIGHTS];
        assert_eq!(fit_light_array(&values, 2, Vec4::ZERO), vec![Vec4::ONE; 2]);

        let padded = fit_light_array(&values, 6, Vec4::ZERO);
        assert_eq!(padded.len(), 6);
        assert_eq!(padded[4], Vec4::ZERO);
    }

    #[test]
    fn test_build_begins_and_clears() {
        let (backend, context) = create_test_context();
        let pass = RenderPassBuilder::new()
            .with_clear_color(Vec4::ONE)
            .with_clear_depth(1.0)
            .build(&context);
        assert_eq!(pass.viewport().size(), UVec2::new(800, 600));
        pass.finish();

        let commands = backend.commands();
        assert!(matches!(commands[0], BackendCommand::BeginPass { .. }));
        assert_eq!(
            commands[1],
            BackendCommand::Clear {
                color: Some(Vec4::ONE),
                depth: Some(1.0)
            }
        );
        assert_eq!(commands.last(), Some(&BackendCommand::EndPass));
    }

    #[test]
    fn test_non_indexed_draw() {
        let (backend, context) = create_test_context();
        let mesh = Mesh::new(
            &context,
            MeshDescriptor::new()
                .with_positions(vec![Vec3::ZERO; 5])
                .with_topology(Topology::Points),
        )
        .unwrap();
        let shader = context.standard_shader(StandardShader::Unlit).unwrap();

        let mut pass = RenderPassBuilder::new().build(&context);
        pass.draw_with_shader(&mesh, Mat4::IDENTITY, &shader).unwrap();
        drop(pass);

        assert!(backend.commands().contains(&BackendCommand::Draw {
            topology: Topology::Points,
            first: 0,
            count: 5
        }));
        assert_eq!(context.stats().draw_calls, 1);
    }

    #[test]
    fn test_lights_padded_to_declared_size() {
        let (backend, context) = create_test_context();
        let mesh = Mesh::new(&context, generators::quad(1.0, 1.0)).unwrap();
        let shader = context.standard_shader(StandardShader::BlinnPhong).unwrap();
        let material = Material::new(&context, shader.clone()).unwrap();

        let mut lights = WorldLights::new();
        lights.add_light(Light::directional(Vec3::NEG_Y, Vec3::ONE));

        let mut pass = RenderPassBuilder::new()
            .with_world_lights(&lights)
            .build(&context);
        pass.draw(&mesh, Mat4::IDENTITY, &material).unwrap();
        pass.finish();

        let id = shader.global_uniform(GlobalRole::LightPositionType).unwrap();
        let declared = shader
            .reflection()
            .globals()
            .array_size(GlobalRole::LightPositionType)
            .unwrap();
        let pushed = backend.commands().into_iter().find_map(|c| match c {
            BackendCommand::SetUniform {
                uniform,
                value: UniformData::Vec4Array(v),
                ..
            } if uniform == id => Some(v),
            _ => None,
        });
        let pushed = pushed.unwrap();
        assert_eq!(pushed.len(), declared as usize);
        assert_eq!(pushed[0].w, LightType::Directional.tag());
        assert_eq!(pushed[1].w, LightType::Unused.tag());
    }

    #[test]
    fn test_viewport_uniform_follows_camera() {
        let (backend, context) = create_test_context();
        let mesh = Mesh::new(
            &context,
            MeshDescriptor::new()
                .with_positions(vec![Vec3::ZERO])
                .with_particle_sizes(vec![4.0])
                .with_topology(Topology::Points),
        )
        .unwrap();
        let shader = context.standard_shader(StandardShader::Particles).unwrap();

        let mut camera = Camera::new();
        camera.set_viewport(Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0));
        let mut pass = RenderPassBuilder::new()
            .with_camera(&camera)
            .with_target_size(UVec2::new(400, 300))
            .build(&context);
        pass.draw_with_shader(&mesh, Mat4::IDENTITY, &shader).unwrap();
        pass.finish();

        let id = shader.global_uniform(GlobalRole::Viewport).unwrap();
        assert!(backend.commands().contains(&BackendCommand::SetUniform {
            program: shader.snapshot().handle,
            uniform: id,
            value: UniformData::Vec4(Vec4::new(200.0, 0.0, 200.0, 300.0)),
        }));
    }

    #[test]
    fn test_too_many_textures() {
        let backend = Arc::new(DummyBackend::new());
        let context = RenderContext::new(backend).with_parameters(
            crate::context::ContextParameters::default().with_max_texture_units(0),
        );
        let mesh = Mesh::new(&context, generators::quad(1.0, 1.0)).unwrap();
        let shader = context.standard_shader(StandardShader::UnlitTextured).unwrap();
        let material = Material::new(&context, shader).unwrap();

        let mut pass = RenderPassBuilder::new().build(&context);
        assert_eq!(
            pass.draw(&mesh, Mat4::IDENTITY, &material),
            Err(RenderError::TooManyTextures { limit: 0 })
        );
    }
}
