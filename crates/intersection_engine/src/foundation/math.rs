//! Math utilities and types
//!
//! Provides the fundamental math types used by the intersection engine.
//! All spatial quantities are `f32` nalgebra types; the [`Transform`] type
//! carries the position/rotation/scale of scene objects and testers and
//! converts between world space and an object's local space.

pub use nalgebra::{
    Vector3,
    Matrix3,
    Quaternion,
    Unit,
};

use serde::{Deserialize, Serialize};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Smallest magnitude a scale component may have before it is treated as zero
/// by the inverse transforms.
pub const SCALE_EPSILON: f32 = 1.0e-6;

/// Reciprocal that substitutes `epsilon` (keeping the sign) for values too
/// close to zero to invert.
pub fn safe_recip(value: f32, epsilon: f32) -> f32 {
    if value.abs() < epsilon {
        1.0 / epsilon.copysign(value)
    } else {
        1.0 / value
    }
}

/// Transform representing position, rotation, and scale
///
/// Applied in TRS order: a local point is scaled, then rotated, then
/// translated. The forward axis is local `-Z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
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

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from all three components
    pub fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Builder: replace the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder: replace the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Local point to world space
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.position + self.rotation * point.component_mul(&self.scale)
    }

    /// Local vector to world space (rotation and scale, no translation)
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector.component_mul(&self.scale)
    }

    /// World point to local space
    pub fn inverse_transform_point(&self, point: &Vec3) -> Vec3 {
        self.inverse_transform_point_with(point, SCALE_EPSILON)
    }

    /// World point to local space, clamping scale components below `epsilon`
    pub fn inverse_transform_point_with(&self, point: &Vec3, epsilon: f32) -> Vec3 {
        let unrotated = self.rotation.inverse() * (point - self.position);
        unrotated.component_mul(&self.inverse_scale(epsilon))
    }

    /// World vector to local space (rotation and scale, no translation)
    pub fn inverse_transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.inverse_transform_vector_with(vector, SCALE_EPSILON)
    }

    /// World vector to local space, clamping scale components below `epsilon`
    pub fn inverse_transform_vector_with(&self, vector: &Vec3, epsilon: f32) -> Vec3 {
        (self.rotation.inverse() * vector).component_mul(&self.inverse_scale(epsilon))
    }

    /// Local surface normal to world space (inverse-transpose of the linear part)
    pub fn transform_normal(&self, normal: &Vec3) -> Vec3 {
        let scaled = normal.component_mul(&self.inverse_scale(SCALE_EPSILON));
        (self.rotation * scaled)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros)
    }

    /// Component-wise reciprocal of the scale, guarding zero components
    pub fn inverse_scale(&self, epsilon: f32) -> Vec3 {
        Vec3::new(
            safe_recip(self.scale.x, epsilon),
            safe_recip(self.scale.y, epsilon),
            safe_recip(self.scale.z, epsilon),
        )
    }

    /// Forward axis in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 0.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Transform {
        Transform::from_trs(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_euler_angles(0.3, -0.7, 1.1),
            Vec3::new(2.0, 0.5, 1.5),
        )
    }

    #[test]
    fn test_point_inverse_matches_forward() {
        let transform = sample();
        let local = Vec3::new(0.25, 0.8, -1.2);
        let world = transform.transform_point(&local);
        assert_relative_eq!(transform.inverse_transform_point(&world), local, epsilon = 1e-5);
    }

    #[test]
    fn test_normal_stays_perpendicular_under_nonuniform_scale() {
        let transform = sample();
        let tangent = Vec3::new(1.0, 1.0, 0.0);
        let normal = Vec3::new(1.0, -1.0, 0.0).normalize();

        let world_tangent = transform.transform_vector(&tangent);
        let world_normal = transform.transform_normal(&normal);
        assert_relative_eq!(world_tangent.dot(&world_normal), 0.0, epsilon = 1e-5);
        assert_relative_eq!(world_normal.norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_scale_inverse_is_finite() {
        let transform = Transform::identity().with_scale(Vec3::new(1.0, 0.0, -2.0));
        let local = transform.inverse_transform_point(&Vec3::new(1.0, 1.0, 1.0));
        assert!(local.iter().all(|c| c.is_finite()));
        assert_relative_eq!(local.z, -0.5);
    }

    #[test]
    fn test_forward_is_negative_z() {
        assert_relative_eq!(Transform::identity().forward(), Vec3::new(0.0, 0.0, -1.0));
    }
}
