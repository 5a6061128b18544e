//! Math type re-exports and helper functions.
//!
//! All rendering math is `f32` glam.

pub use glam;
pub use glam::{IVec4, Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};

// ===== Helper functions =====

/// Normal matrix for a model-view transform: the inverse transpose of its upper 3x3 block.
///
/// A singular transform (zero scale on some axis) yields the plain 3x3 block instead
/// of NaNs.
pub fn normal_matrix(model_view: Mat4) -> Mat3 {
    let m = Mat3::from_mat4(model_view);
    if m.determinant().abs() <= f32::EPSILON {
        return m;
    }
    m.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_matrix_rotation_is_unchanged() {
        let rotation = Mat4::from_rotation_y(0.7);
        let n = normal_matrix(rotation);
        assert!(n.abs_diff_eq(Mat3::from_mat4(rotation), 1e-5));
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let scale = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(scale);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
        assert_eq!(n.y_axis.y, 1.0);
    }

    #[test]
    fn test_normal_matrix_singular() {
        let n = normal_matrix(Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0)));
        assert!(!n.is_nan());
    }
}
