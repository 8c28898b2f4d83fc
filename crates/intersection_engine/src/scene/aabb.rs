//! Axis-aligned bounding boxes
//!
//! World- and local-space bounds for scene objects, testers, octree nodes and
//! broad-phase queries.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Transform, Vec3};

/// Axis-aligned bounding box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest AABB enclosing every point, or `None` for an empty set
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let mut bounds = Self::new(first, first);
        for point in points {
            bounds.encapsulate_point(point);
        }
        Some(bounds)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full size of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow to include a point
    pub fn encapsulate_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest AABB containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Copy grown by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        let margin = Vec3::repeat(margin);
        AABB::new(self.min - margin, self.max + margin)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if `other` lies completely inside this AABB
    pub fn contains_aabb(&self, other: &AABB) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Check if a sphere touches this AABB
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_squared_to_point(center) <= radius * radius
    }

    /// Squared distance from a point to the closest point of the box (0 inside)
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let closest = point.sup(&self.min).inf(&self.max);
        (closest - point).norm_squared()
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    ///
    /// Axes the ray runs parallel to are treated as a pure containment check so
    /// an origin lying exactly on a slab plane never produces NaN.
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray_origin[axis];
            let dir = ray_dir[axis];
            if dir.abs() < f32::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let t1 = (self.min[axis] - origin) * inv;
            let t2 = (self.max[axis] - origin) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Return entry point distance (or 0 if we're inside the box)
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// World bounds of this local box under `transform` (all eight corners)
    pub fn transformed(&self, transform: &Transform) -> AABB {
        let corners = self.corners().map(|corner| transform.transform_point(&corner));
        let mut bounds = AABB::new(corners[0], corners[0]);
        for corner in &corners[1..] {
            bounds.encapsulate_point(corner);
        }
        bounds
    }

    /// The eight corners, x varying fastest
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}
