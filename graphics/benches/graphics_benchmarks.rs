use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Mat4, Vec3};

use kestrel_graphics::shader::{compile_stage, reflect, StandardShader};
use kestrel_graphics::{
    generators, Camera, DummyBackend, Light, Material, Mesh, RenderContext, RenderPassBuilder,
    WorldLights,
};

// ---------------------------------------------------------------------------
// Shader reflection
// ---------------------------------------------------------------------------

fn bench_reflect_blinn_phong(c: &mut Criterion) {
    let descriptor = StandardShader::BlinnPhong.descriptor();
    c.bench_function("compile_blinn_phong", |b| {
        b.iter(|| compile_stage("fragment", black_box(&descriptor.fragment_source)));
    });

    let vertex = compile_stage("vertex", &descriptor.vertex_source).unwrap();
    let fragment = compile_stage("fragment", &descriptor.fragment_source).unwrap();
    c.bench_function("reflect_blinn_phong", |b| {
        b.iter(|| reflect(black_box(&vertex), black_box(&fragment)));
    });
}

// ---------------------------------------------------------------------------
// Draw submission
// ---------------------------------------------------------------------------

fn bench_draw_loop(c: &mut Criterion) {
    let backend = Arc::new(DummyBackend::new());
    let context = RenderContext::new(backend.clone());
    let mesh = Mesh::new(&context, generators::sphere(1.0, 32, 16)).unwrap();
    let shader = context.standard_shader(StandardShader::BlinnPhong).unwrap();
    let material = Material::new(&context, shader).unwrap();

    let mut camera = Camera::new();
    camera.look_at(Vec3::new(0.0, 2.0, 10.0), Vec3::ZERO, Vec3::Y);
    camera.set_perspective_projection(60.0, 0.1, 100.0);
    let mut lights = WorldLights::new();
    lights.add_light(Light::directional(Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE));

    for (name, cache) in [("draw_100_cached", true), ("draw_100_uncached", false)] {
        context.set_binding_cache_enabled(cache);
        c.bench_function(name, |b| {
            b.iter(|| {
                context.begin_frame();
                let mut pass = RenderPassBuilder::new()
                    .with_camera(&camera)
                    .with_world_lights(&lights)
                    .build(&context);
                for i in 0..100 {
                    let model = Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0));
                    pass.draw(&mesh, model, &material).unwrap();
                }
                pass.finish();
                context.end_frame();
                backend.clear_commands();
            });
        });
    }
}

criterion_group!(benches, bench_reflect_blinn_phong, bench_draw_loop);
criterion_main!(benches);
