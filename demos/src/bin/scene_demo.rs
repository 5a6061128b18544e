//! # Scene Demo
//!
//! Renders a small lit scene for a few frames on the recording dummy backend and
//! logs per-frame statistics. Exercises every standard shader, submesh drawing,
//! a shader rebuild and a drawable resize.

use std::sync::Arc;

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use kestrel_graphics::{
    generators, Camera, DummyBackend, GraphicsError, Light, Material, Mesh, MeshDescriptor,
    RenderContext, RenderPassBuilder, StandardShader, Topology, WorldLights,
};

const FRAMES: u64 = 4;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Kestrel scene demo");
    log::info!("Core version: {}", kestrel_core::VERSION);
    log::info!("Graphics version: {}", kestrel_graphics::VERSION);

    kestrel_graphics::init();

    if let Err(e) = run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), GraphicsError> {
    let backend = Arc::new(DummyBackend::new());
    let context = RenderContext::new(backend.clone());

    let sphere = Mesh::new(&context, generators::sphere(1.0, 32, 16).with_name("sphere"))?;
    let cube = Mesh::new(&context, generators::cube(0.5).with_name("cube"))?;
    let ground = Mesh::new(&context, generators::quad(10.0, 10.0).with_name("ground"))?;
    let particles = Mesh::new(&context, particle_cloud(256))?;
    let outlined = Mesh::new(&context, outlined_square())?;

    let lit = Material::new(&context, context.standard_shader(StandardShader::BlinnPhong)?)?
        .with_name("lit");
    lit.set("color", Vec4::new(0.8, 0.3, 0.2, 1.0))?;
    lit.set("specularity", 32.0_f32)?;

    let floor = Material::new(&context, context.standard_shader(StandardShader::UnlitTextured)?)?
        .with_name("floor");
    floor.set("tint", Vec4::new(0.4, 0.4, 0.45, 1.0))?;

    let sparks = Material::new(&context, context.standard_shader(StandardShader::Particles)?)?
        .with_name("sparks");
    let fill = Material::new(&context, context.standard_shader(StandardShader::Unlit)?)?
        .with_name("fill");
    let edge = Material::new(&context, context.standard_shader(StandardShader::Unlit)?)?
        .with_name("edge");
    edge.set("tint", Vec4::new(0.0, 0.0, 0.0, 1.0))?;
    let normals = context.standard_shader(StandardShader::DebugNormals)?;

    let mut camera = Camera::new();
    camera.set_perspective_projection(60.0, 0.1, 100.0);

    let mut lights = WorldLights::new();
    lights.set_ambient_light(Vec3::splat(0.15));
    lights.add_light(Light::directional(Vec3::new(-0.5, -1.0, -0.3), Vec3::ONE));
    lights.add_light(Light::point(Vec3::new(2.0, 2.0, 2.0), Vec3::new(1.0, 0.8, 0.6), 10.0));

    for frame in 0..FRAMES {
        if frame == 2 {
            // Resizing needs no camera update; the next pass reads the new aspect.
            context.set_drawable_size(UVec2::new(1280, 720));
            log::info!("Resized drawable to {}", context.drawable_size());
        }
        if frame == 3 {
            let shader = lit.shader();
            shader.rebuild(StandardShader::BlinnPhong.descriptor())?;
            log::info!(
                "Rebuilt '{}', generation {}",
                shader.label().unwrap_or_default(),
                shader.generation()
            );
        }

        let angle = frame as f32 * 0.4;
        camera.look_at(
            Vec3::new(6.0 * angle.sin(), 3.0, 6.0 * angle.cos()),
            Vec3::ZERO,
            Vec3::Y,
        );

        context.begin_frame();
        {
            let mut pass = RenderPassBuilder::new()
                .with_label("scene")
                .with_camera(&camera)
                .with_world_lights(&lights)
                .with_clear_color(Vec4::new(0.05, 0.05, 0.08, 1.0))
                .with_clear_depth(1.0)
                .build(&context);

            let ground_transform = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
                * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
            pass.draw(&ground, ground_transform, &floor)?;
            pass.draw(&sphere, Mat4::IDENTITY, &lit)?;
            for i in 0..3 {
                let offset = Vec3::new(-2.0 + 2.0 * i as f32, 0.0, -2.0);
                pass.draw(&cube, Mat4::from_translation(offset), &lit)?;
            }
            pass.draw_with_shader(&cube, Mat4::from_translation(Vec3::X * 3.0), &normals)?;
            pass.draw_submeshes(&outlined, Mat4::from_translation(Vec3::Y * 2.0), &[&fill, &edge])?;
            pass.draw(&particles, Mat4::IDENTITY, &sparks)?;
            pass.finish();
        }
        context.end_frame();

        let commands = backend.take_commands().len();
        log::info!(
            "Frame {}: {} ({} backend commands)",
            frame,
            context.last_frame_stats(),
            commands
        );
    }

    let cache = context.binding_cache_stats();
    log::info!(
        "Binding cache: {} hits, {} misses, {} entries",
        cache.hits,
        cache.misses,
        cache.entries
    );

    Ok(())
}

/// Points on a ring with fading colors and growing sizes.
fn particle_cloud(count: u32) -> MeshDescriptor {
    let mut positions = Vec::with_capacity(count as usize);
    let mut colors = Vec::with_capacity(count as usize);
    let mut sizes = Vec::with_capacity(count as usize);
    for i in 0..count {
        let t = i as f32 / count as f32;
        let angle = t * std::f32::consts::TAU * 3.0;
        positions.push(Vec3::new(angle.cos() * 4.0, t * 2.0, angle.sin() * 4.0));
        colors.push(Vec4::new(1.0, 1.0 - t, 0.2, 1.0 - t));
        sizes.push(2.0 + t * 6.0);
    }
    MeshDescriptor::new()
        .with_positions(positions)
        .with_colors(colors)
        .with_particle_sizes(sizes)
        .with_topology(Topology::Points)
        .with_name("particles")
}

/// A filled square with its outline as a second index set.
fn outlined_square() -> MeshDescriptor {
    MeshDescriptor::new()
        .with_positions(vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ])
        .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y])
        .with_index_set(vec![0, 1, 2, 0, 2, 3], Topology::Triangles)
        .with_index_set(vec![0, 1, 1, 2, 2, 3, 3, 0], Topology::Lines)
        .with_name("outlined_square")
}
