//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, re-exported from nalgebra
//! under the short names the rest of the engine uses.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math helper functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }
}

/// Transform representing position, rotation (Euler angles), and scale
///
/// Rotation is stored as Euler angles in radians and applied in Z-Y-X order
/// when converted to a matrix, which matches how scene code composes object
/// transforms before submitting render commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation in radians (Euler angles: X, Y, Z)
    pub rotation: Vec3,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and uniform scale
    pub fn from_position_scale(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            scale: Vec3::new(scale, scale, scale),
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        let rotation = nalgebra::Rotation3::from_euler_angles(
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::new_translation(&self.position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform_is_identity_matrix() {
        let transform = Transform::identity();
        assert_relative_eq!(transform.to_matrix(), Mat4::identity());
    }

    #[test]
    fn test_translation_lands_in_fourth_column() {
        let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let matrix = transform.to_matrix();
        assert_relative_eq!(matrix.m14, 1.0);
        assert_relative_eq!(matrix.m24, 2.0);
        assert_relative_eq!(matrix.m34, 3.0);
    }

    #[test]
    fn test_uniform_scale_on_diagonal() {
        let transform = Transform::from_position_scale(Vec3::zeros(), 2.5);
        let matrix = transform.to_matrix();
        assert_relative_eq!(matrix.m11, 2.5);
        assert_relative_eq!(matrix.m22, 2.5);
        assert_relative_eq!(matrix.m33, 2.5);
    }
}
