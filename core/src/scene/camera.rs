//! Camera: view transform, projection mode and viewport.
//!
//! The projection is stored as a [`Projection`] mode rather than a
//! matrix. The matrix is built when it is asked for, from the size of the viewport
//! being rendered at that moment, so a perspective camera follows window resizes
//! without the projection being set again.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective with a vertical field of view; aspect comes from the viewport.
    Perspective {
        fov_y_degrees: f32,
        near: f32,
        far: f32,
    },
    /// Orthographic with a fixed half height; half width follows the viewport aspect.
    Orthographic {
        half_height: f32,
        near: f32,
        far: f32,
    },
    /// Orthographic in pixel units, origin at the lower-left corner of the viewport.
    WindowCoordinates { near: f32, far: f32 },
    /// Caller-supplied matrix, used as is.
    Custom(Mat4),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    /// Build the projection matrix for a viewport of `viewport_size` pixels.
    pub fn matrix(&self, viewport_size: UVec2) -> Mat4 {
        let size = viewport_size.as_vec2().max(Vec2::ONE);
        let aspect = size.x / size.y;

        match *self {
            Projection::Perspective {
                fov_y_degrees,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
            Projection::WindowCoordinates { near, far } => {
                Mat4::orthographic_rh(0.0, size.x, 0.0, size.y, near, far)
            }
            Projection::Custom(matrix) => matrix,
        }
    }
}

/// Viewport rectangle, normalised to the render target (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Lower-left corner.
    pub offset: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            size: Vec2::ONE,
        }
    }
}

/// Viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelViewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelViewport {
    /// Width and height.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// `(x, y, width, height)` as floats.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

/// Camera for viewing the scene.
///
/// # Example
///
/// ```ignore
/// let mut camera = Camera::new();
/// camera.look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
/// camera.set_perspective_projection(60.0, 0.1, 100.0);
///
/// let projection = camera.projection_transform(UVec2::new(800, 600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    view: Mat4,
    projection: Projection,
    viewport: Viewport,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Projection::default(),
            viewport: Viewport::default(),
        }
    }
}

impl Camera {
    /// Camera at the origin looking down -Z with a 60 degree perspective.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the camera at `eye` looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.view = Mat4::look_at_rh(eye, target, up);
    }

    /// Set the world-to-view transform directly.
    pub fn set_view_transform(&mut self, view: Mat4) {
        self.view = view;
    }

    /// World-to-view transform.
    pub fn view_transform(&self) -> Mat4 {
        self.view
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// Switch to a perspective projection.
    pub fn set_perspective_projection(&mut self, fov_y_degrees: f32, near: f32, far: f32) {
        self.projection = Projection::Perspective {
            fov_y_degrees,
            near,
            far,
        };
    }

    /// Switch to an orthographic projection.
    pub fn set_orthographic_projection(&mut self, half_height: f32, near: f32, far: f32) {
        self.projection = Projection::Orthographic {
            half_height,
            near,
            far,
        };
    }

    /// Switch to a pixel-space orthographic projection.
    pub fn set_window_coordinates(&mut self, near: f32, far: f32) {
        self.projection = Projection::WindowCoordinates { near, far };
    }

    /// Use an explicit projection matrix.
    pub fn set_custom_projection(&mut self, matrix: Mat4) {
        self.projection = Projection::Custom(matrix);
    }

    /// Current projection mode.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Projection matrix for a viewport of `viewport_size` pixels.
    pub fn projection_transform(&self, viewport_size: UVec2) -> Mat4 {
        self.projection.matrix(viewport_size)
    }

    /// Set the normalised viewport rectangle.
    pub fn set_viewport(&mut self, offset: Vec2, size: Vec2) {
        self.viewport = Viewport { offset, size };
    }

    /// Normalised viewport rectangle.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Viewport in pixels for a render target of `target_size`.
    pub fn pixel_viewport(&self, target_size: UVec2) -> PixelViewport {
        let target = target_size.as_vec2();
        let offset = (self.viewport.offset * target).round();
        let size = (self.viewport.size * target).round();
        PixelViewport {
            x: offset.x as u32,
            y: offset.y as u32,
            width: size.x as u32,
            height: size.y as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_depends_on_viewport() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(60.0, 0.1, 100.0);

        let wide = camera.projection_transform(UVec2::new(800, 600));
        let same_aspect = camera.projection_transform(UVec2::new(400, 300));
        let square = camera.projection_transform(UVec2::new(600, 600));

        assert_eq!(wide, same_aspect);
        assert_ne!(wide, square);
        assert!((wide.x_axis.x * 800.0 / 600.0 - wide.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn test_last_setter_wins() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(45.0, 0.1, 10.0);
        camera.set_orthographic_projection(5.0, -1.0, 1.0);
        assert!(matches!(camera.projection(), Projection::Orthographic { .. }));

        let custom = Mat4::from_scale(Vec3::splat(2.0));
        camera.set_custom_projection(custom);
        assert_eq!(camera.projection_transform(UVec2::new(10, 10)), custom);
    }

    #[test]
    fn test_window_coordinates() {
        let mut camera = Camera::new();
        camera.set_window_coordinates(-1.0, 1.0);
        let projection = camera.projection_transform(UVec2::new(200, 100));

        let top_right = projection * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert!((top_right.x - 1.0).abs() < 1e-5);
        assert!((top_right.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_sized_viewport_does_not_produce_nan() {
        let camera = Camera::new();
        let projection = camera.projection_transform(UVec2::ZERO);
        assert!(!projection.is_nan());
    }

    #[test]
    fn test_pixel_viewport() {
        let mut camera = Camera::new();
        camera.set_viewport(Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0));
        let vp = camera.pixel_viewport(UVec2::new(800, 600));
        assert_eq!(
            vp,
            PixelViewport {
                x: 400,
                y: 0,
                width: 400,
                height: 600
            }
        );
        assert_eq!(vp.to_vec4(), Vec4::new(400.0, 0.0, 400.0, 600.0));
    }

    #[test]
    fn test_look_at_position() {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        assert!((camera.position() - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-5);
    }
}
