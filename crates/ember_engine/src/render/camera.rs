//! 3D perspective camera
//!
//! Position, orientation, and projection parameters for the scene camera.
//! Matrices are computed on demand; nothing is cached, so mutating any
//! field takes effect on the next frame without invalidation bookkeeping.

use crate::foundation::math::{utils, Mat4, Point3, Vec3};

/// Perspective camera in a right-handed Y-up world
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at in world space
    pub target: Vec3,
    /// Up vector for camera orientation
    pub up: Vec3,
    /// Field of view angle in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Distance to the near clipping plane
    pub near: f32,
    /// Distance to the far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - camera position in world space
    /// * `fov_degrees` - vertical field of view in degrees
    /// * `aspect` - viewport aspect ratio (width / height)
    /// * `near` / `far` - clipping plane distances, `0 < near < far`
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// World-to-view transformation
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// View-to-clip transformation
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Update the aspect ratio, typically after a window resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }
}

impl Default for Camera {
    /// A camera three units back from the origin with a 45-degree field of
    /// view at 16:9
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 3.0), 45.0, 16.0 / 9.0, 0.2, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_matrix_translates_eye_to_origin() {
        let camera = Camera::default();
        let view = camera.view_matrix();
        let eye = view.transform_point(&Point3::from(camera.position));
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_projection_is_not_identity() {
        let camera = Camera::default();
        assert_ne!(camera.projection_matrix(), Mat4::identity());
    }

    #[test]
    fn test_invalid_aspect_is_ignored() {
        let mut camera = Camera::default();
        let original = camera.aspect;
        camera.set_aspect_ratio(0.0);
        camera.set_aspect_ratio(f32::NAN);
        assert_relative_eq!(camera.aspect, original);

        camera.set_aspect_ratio(2.0);
        assert_relative_eq!(camera.aspect, 2.0);
    }
}
