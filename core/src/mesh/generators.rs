//! Mesh generators for common shapes.
//!
//! These generators produce [`MeshDescriptor`] values that can be turned into
//! GPU meshes by the graphics crate.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::data::{MeshDescriptor, Topology};

/// Generate a UV sphere.
///
/// Creates a sphere with the given radius, number of longitudinal segments,
/// and number of latitudinal rings, with `position`, `normal` and `uv`
/// attributes and one triangle index set.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole)
pub fn sphere(radius: f32, segments: u32, rings: u32) -> MeshDescriptor {
    let capacity = ((rings + 1) * (segments + 1)) as usize;
    let mut positions = Vec::with_capacity(capacity);
    let mut normals = Vec::with_capacity(capacity);
    let mut uvs = Vec::with_capacity(capacity);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let theta = ring as f32 * PI / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for segment in 0..=segments {
            let phi = segment as f32 * 2.0 * PI / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            positions.push(normal * radius);
            normals.push(normal);
            uvs.push(Vec2::new(
                segment as f32 / segments as f32,
                ring as f32 / rings as f32,
            ));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    MeshDescriptor::new()
        .with_positions(positions)
        .with_normals(normals)
        .with_uvs(uvs)
        .with_index_set(indices, Topology::Triangles)
        .with_name("sphere")
}

/// Generate a quad on the XY plane facing +Z.
///
/// UV coordinates go from (0,0) at top-left to (1,1) at bottom-right.
///
/// # Arguments
///
/// * `half_width` - Half the width of the quad along the X axis
/// * `half_height` - Half the height of the quad along the Y axis
pub fn quad(half_width: f32, half_height: f32) -> MeshDescriptor {
    let positions = vec![
        Vec3::new(-half_width, -half_height, 0.0),
        Vec3::new(half_width, -half_height, 0.0),
        Vec3::new(half_width, half_height, 0.0),
        Vec3::new(-half_width, half_height, 0.0),
    ];
    let uvs = vec![
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 0.0),
    ];

    MeshDescriptor::new()
        .with_positions(positions)
        .with_normals(vec![Vec3::Z; 4])
        .with_uvs(uvs)
        .with_index_set(vec![0, 1, 2, 2, 3, 0], Topology::Triangles)
        .with_name("quad")
}

/// Generate an axis-aligned cube centred at the origin.
///
/// Each face has its own four vertices so normals stay flat.
pub fn cube(half_extent: f32) -> MeshDescriptor {
    // (normal, tangent u, tangent v) per face
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let corners = [
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, u, v)) in faces.iter().enumerate() {
        let base = face as u32 * 4;
        for corner in corners {
            positions.push((*normal + *u * corner.x + *v * corner.y) * half_extent);
            normals.push(*normal);
            uvs.push(Vec2::new((corner.x + 1.0) * 0.5, (1.0 - corner.y) * 0.5));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshDescriptor::new()
        .with_positions(positions)
        .with_normals(normals)
        .with_uvs(uvs)
        .with_index_set(indices, Topology::Triangles)
        .with_name("cube")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::AttributeData;

    #[test]
    fn test_sphere() {
        let desc = sphere(1.0, 8, 4);
        // (rings+1) * (segments+1) = 5 * 9 = 45 vertices
        assert_eq!(desc.vertex_count(), 45);
        // rings * segments * 6 = 4 * 8 * 6 = 192 indices
        let sets = desc.index_sets.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 192);
    }

    #[test]
    fn test_sphere_positions_on_radius() {
        let desc = sphere(2.0, 6, 3);
        let Some(AttributeData::Vec3(positions)) = desc.attributes.get("position") else {
            panic!("sphere has no positions");
        };
        for p in positions {
            assert!((p.length() - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_quad() {
        let desc = quad(0.5, 0.5);
        assert_eq!(desc.vertex_count(), 4);
        assert_eq!(desc.index_sets.unwrap()[0].indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_cube() {
        let desc = cube(1.0);
        assert_eq!(desc.vertex_count(), 24);
        assert_eq!(desc.index_sets.as_ref().unwrap()[0].len(), 36);

        let Some(AttributeData::Vec3(positions)) = desc.attributes.get("position") else {
            panic!("cube has no positions");
        };
        for p in positions {
            assert_eq!(p.abs().max_element(), 1.0);
        }
    }
}
