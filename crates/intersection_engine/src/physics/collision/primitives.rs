//! Primitive collision shapes and intersection algorithms
//!
//! Provides basic geometric primitives (rays, triangles, oriented boxes)
//! with efficient intersection testing algorithms.

use crate::foundation::math::{Mat3, Quat, Vec3};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized, or zero for a degenerate ray)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// A zero direction yields a ray that hits nothing.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Whether the direction is usable
    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3::zeros()
    }
}

/// Where a ray met a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance along the ray
    pub distance: f32,
    /// The point of intersection
    pub point: Vec3,
    /// Face normal at the intersection point
    pub normal: Vec3,
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Slack on the barycentric bounds so rays through a shared edge are not
    /// lost between the two triangles
    const BARYCENTRIC_SLACK: f32 = 1.0e-6;

    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Same triangle with the opposite winding
    pub fn flipped(&self) -> Self {
        Self::new(self.v0, self.v2, self.v1)
    }

    /// Calculates the normal of the triangle (right-hand rule), zero when degenerate
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON * f32::EPSILON)
            .unwrap_or_else(Vec3::zeros)
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Zero-area triangle
    pub fn is_degenerate(&self) -> bool {
        self.normal() == Vec3::zeros()
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    ///
    /// This is one of the fastest ray-triangle intersection algorithms.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        self.moller_trumbore(ray, false)
    }

    /// Like [`Triangle::intersect_ray`] but only the front face (counter-clockwise
    /// winding seen from the ray) can be hit
    pub fn intersect_ray_front(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        self.moller_trumbore(ray, true)
    }

    fn moller_trumbore(&self, ray: &Ray, front_only: bool) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000_000_1;

        // Calculate edges from v0
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        // Calculate determinant
        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle, or hitting its back
        if front_only {
            if a < EPSILON {
                return None;
            }
        } else if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);

        // Hit outside triangle on u axis?
        if !(-Self::BARYCENTRIC_SLACK..=1.0 + Self::BARYCENTRIC_SLACK).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);

        // Hit outside triangle on v axis?
        if v < -Self::BARYCENTRIC_SLACK || u + v > 1.0 + Self::BARYCENTRIC_SLACK {
            return None;
        }

        // Calculate t (distance along ray)
        let t = f * edge2.dot(&q);

        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None // Behind ray origin
        }
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        // Project point onto triangle plane
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);

        // Check if point is in vertex region outside v0
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.v0;
        }

        // Check if point is in vertex region outside v1
        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.v1;
        }

        // Check if point is in vertex region outside v2
        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.v2;
        }

        // Check if point is in edge region
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v_val = d1 / (d1 - d3);
            return self.v0 + edge1 * v_val;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.v0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.v1 + (self.v2 - self.v1) * w;
        }

        // Point is inside triangle
        let denom = 1.0 / (va + vb + vc);
        if !denom.is_finite() {
            return self.v0;
        }
        let v_val = vb * denom;
        let w = vc * denom;
        self.v0 + edge1 * v_val + edge2 * w
    }
}

/// A box with its own rotation, described by center and half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Center of the box
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// Orientation of the local axes
    pub rotation: Quat,
}

impl OrientedBox {
    /// Creates a new oriented box
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            rotation,
        }
    }

    /// The three local axes as columns
    pub fn axes(&self) -> Mat3 {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// Separating Axis Theorem test against a triangle
    ///
    /// Tests 13 potential separating axes:
    /// - 3 box face normals
    /// - 1 triangle face normal
    /// - 9 box-axis / triangle-edge cross products
    pub fn intersects_triangle(&self, triangle: &Triangle) -> bool {
        const EPSILON: f32 = 0.000_001;

        // Work in the box frame so it becomes axis aligned at the origin
        let inverse = self.rotation.inverse();
        let v0 = inverse * (triangle.v0 - self.center);
        let v1 = inverse * (triangle.v1 - self.center);
        let v2 = inverse * (triangle.v2 - self.center);
        let e = self.half_extents;

        // Test axis (returns false if it's a separating axis)
        let overlaps_on = |axis: Vec3| -> bool {
            if axis.magnitude_squared() < EPSILON * EPSILON {
                return true; // Degenerate axis, skip
            }
            let p0 = axis.dot(&v0);
            let p1 = axis.dot(&v1);
            let p2 = axis.dot(&v2);
            let radius = e.x * axis.x.abs() + e.y * axis.y.abs() + e.z * axis.z.abs();
            let min = p0.min(p1).min(p2);
            let max = p0.max(p1).max(p2);
            min <= radius && max >= -radius
        };

        let box_axes = [Vec3::x(), Vec3::y(), Vec3::z()];
        if !box_axes.iter().all(|axis| overlaps_on(*axis)) {
            return false;
        }

        let edges = [v1 - v0, v2 - v1, v0 - v2];
        if !overlaps_on(edges[0].cross(&edges[1])) {
            return false;
        }

        for axis in &box_axes {
            for edge in &edges {
                if !overlaps_on(axis.cross(edge)) {
                    return false;
                }
            }
        }

        // No separating axis found
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor_triangle() -> Triangle {
        // Counter-clockwise seen from +Y
        Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0))
    }

    #[test]
    fn test_front_face_hit_and_back_face_miss() {
        let triangle = floor_triangle();
        let down = Ray::new(Vec3::new(-0.5, 2.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
        let up = Ray::new(Vec3::new(-0.5, -2.0, 0.5), Vec3::new(0.0, 1.0, 0.0));

        let (t, _, _) = triangle.intersect_ray_front(&down).unwrap();
        assert_relative_eq!(t, 2.0);
        assert!(triangle.intersect_ray_front(&up).is_none());
        assert!(triangle.intersect_ray(&up).is_some());
    }

    #[test]
    fn test_flipped_reverses_normal() {
        let triangle = floor_triangle();
        assert_relative_eq!(triangle.normal(), Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(triangle.flipped().normal(), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_degenerate_triangle_has_zero_normal() {
        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::x() * 2.0);
        assert!(triangle.is_degenerate());
        assert!(triangle.intersect_ray(&Ray::new(Vec3::new(0.5, 1.0, 0.0), -Vec3::y())).is_none());
    }

    #[test]
    fn test_closest_point_inside_and_outside() {
        let triangle = floor_triangle();
        assert_relative_eq!(triangle.closest_point(Vec3::new(-0.5, 3.0, 0.5)), Vec3::new(-0.5, 0.0, 0.5));
        assert_relative_eq!(triangle.closest_point(Vec3::new(-5.0, 0.0, -5.0)), Vec3::new(-1.0, 0.0, -1.0));
    }

    #[test]
    fn test_zero_direction_ray_is_degenerate() {
        let ray = Ray::new(Vec3::zeros(), Vec3::zeros());
        assert!(ray.is_degenerate());
        assert!(floor_triangle().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_oriented_box_triangle_sat() {
        let triangle = floor_triangle();
        let touching = OrientedBox::new(Vec3::new(0.0, 0.05, 0.0), Vec3::repeat(0.1), Quat::identity());
        let above = OrientedBox::new(Vec3::new(0.0, 0.5, 0.0), Vec3::repeat(0.1), Quat::identity());
        assert!(touching.intersects_triangle(&triangle));
        assert!(!above.intersects_triangle(&triangle));

        // Rotated 45 degrees about X an edge reaches 0.1 * sqrt(2) below the center
        let rotation = Quat::from_euler_angles(std::f32::consts::FRAC_PI_4, 0.0, 0.0);
        let upright = OrientedBox::new(Vec3::new(-0.5, 0.13, 0.5), Vec3::repeat(0.1), Quat::identity());
        let tilted = OrientedBox::new(Vec3::new(-0.5, 0.13, 0.5), Vec3::repeat(0.1), rotation);
        let tilted_high = OrientedBox::new(Vec3::new(-0.5, 0.15, 0.5), Vec3::repeat(0.1), rotation);
        assert!(!upright.intersects_triangle(&triangle));
        assert!(tilted.intersects_triangle(&triangle));
        assert!(!tilted_high.intersects_triangle(&triangle));
    }
}
