//! Benchmarks for interleaved layout computation and vertex packing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Vec2, Vec3, Vec4};
use kestrel_core::mesh::{generators, InterleavedLayout, MeshDescriptor};

fn layout_benchmarks(c: &mut Criterion) {
    let sphere = generators::sphere(1.0, 64, 32);

    c.bench_function("layout_compute_sphere", |b| {
        b.iter(|| InterleavedLayout::from_attributes(black_box(&sphere.attributes)))
    });

    let layout = InterleavedLayout::from_attributes(&sphere.attributes);
    c.bench_function("pack_sphere_64x32", |b| {
        b.iter(|| layout.pack(black_box(&sphere.attributes)))
    });

    let particles = MeshDescriptor::new()
        .with_positions(vec![Vec3::ONE; 10_000])
        .with_colors(vec![Vec4::ONE; 5_000])
        .with_uvs(vec![Vec2::ZERO; 10_000])
        .with_particle_sizes(Vec::new());
    let layout = InterleavedLayout::from_attributes(&particles.attributes);
    c.bench_function("pack_particles_with_defaults", |b| {
        b.iter(|| layout.pack(black_box(&particles.attributes)))
    });
}

criterion_group!(benches, layout_benchmarks);
criterion_main!(benches);
