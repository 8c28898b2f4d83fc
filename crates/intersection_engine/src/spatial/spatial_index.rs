//! Abstract spatial index interface for broad-phase culling
//!
//! This abstraction allows swapping different spatial partitioning schemes
//! (octree, grid, BVH, etc.) without changing the intersection engine.
//! Every query clears its output buffer first and reports whether it found
//! anything, so callers can reuse one scratch vector per tick.

use std::collections::HashMap;

use crate::foundation::collections::ObjectId;
use crate::foundation::math::Vec3;
use crate::physics::collision::Ray;
use crate::scene::AABB;
use crate::spatial::{Octree, OctreeConfig};

/// Broad-phase index over scene object bounds
pub trait SpatialIndex: Send + Sync {
    /// Insert objects with their current world bounds; re-adding an id
    /// replaces its old bounds
    fn add_objects(&mut self, objects: &[(ObjectId, AABB)]);

    /// Remove objects; unknown ids are ignored
    fn remove_objects(&mut self, ids: &[ObjectId]);

    /// Every indexed object
    fn objects(&self) -> Vec<ObjectId>;

    /// Bounds recorded for an object
    fn bounds_of(&self, id: ObjectId) -> Option<AABB>;

    /// Objects whose bounds overlap `bounds`
    fn intersect_bounds(&self, results: &mut Vec<ObjectId>, bounds: &AABB) -> bool;

    /// Objects whose bounds the ray enters within `max_distance`
    fn intersect_ray(&self, results: &mut Vec<ObjectId>, ray: &Ray, max_distance: f32) -> bool;

    /// Objects whose bounds touch the sphere
    fn intersect_sphere(&self, results: &mut Vec<ObjectId>, center: Vec3, radius: f32) -> bool;

    /// Release structure that no longer holds anything
    fn trim(&mut self);

    /// Clear all objects from the index
    fn clear(&mut self);

    /// Number of indexed objects
    fn len(&self) -> usize;

    /// True when nothing is indexed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Octree-based implementation of [`SpatialIndex`]
pub struct OctreeIndex {
    octree: Octree,
    /// Bounds each object was inserted with, needed to find it again
    bounds_cache: HashMap<ObjectId, AABB>,
}

impl OctreeIndex {
    /// Create an empty index with the given layout
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            octree: Octree::new(config),
            bounds_cache: HashMap::new(),
        }
    }

    /// Get a reference to the underlying octree
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Total node count, for diagnostics
    pub fn node_count(&self) -> usize {
        self.octree.node_count()
    }
}

impl Default for OctreeIndex {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl SpatialIndex for OctreeIndex {
    fn add_objects(&mut self, objects: &[(ObjectId, AABB)]) {
        for &(id, bounds) in objects {
            // Octree requires remove + re-insert for updates
            if let Some(previous) = self.bounds_cache.insert(id, bounds) {
                self.octree.remove(id, &previous);
            }
            self.octree.insert(id, bounds);
        }
    }

    fn remove_objects(&mut self, ids: &[ObjectId]) {
        for id in ids {
            if let Some(bounds) = self.bounds_cache.remove(id) {
                self.octree.remove(*id, &bounds);
            }
        }
    }

    fn objects(&self) -> Vec<ObjectId> {
        self.bounds_cache.keys().copied().collect()
    }

    fn bounds_of(&self, id: ObjectId) -> Option<AABB> {
        self.bounds_cache.get(&id).copied()
    }

    fn intersect_bounds(&self, results: &mut Vec<ObjectId>, bounds: &AABB) -> bool {
        results.clear();
        self.octree.query_bounds(bounds, results);
        !results.is_empty()
    }

    fn intersect_ray(&self, results: &mut Vec<ObjectId>, ray: &Ray, max_distance: f32) -> bool {
        results.clear();
        if ray.is_degenerate() {
            return false;
        }
        self.octree.query_ray(ray.origin, ray.direction, max_distance, results);
        !results.is_empty()
    }

    fn intersect_sphere(&self, results: &mut Vec<ObjectId>, center: Vec3, radius: f32) -> bool {
        results.clear();
        self.octree.query_sphere(center, radius, results);
        !results.is_empty()
    }

    fn trim(&mut self) {
        self.octree.trim();
    }

    fn clear(&mut self) {
        self.octree.clear();
        self.bounds_cache.clear();
    }

    fn len(&self) -> usize {
        self.bounds_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;

    fn unit_at(x: f32) -> AABB {
        AABB::from_center_extents(Vec3::new(x, 0.0, 0.0), Vec3::repeat(0.5))
    }

    #[test]
    fn test_spatial_index_insert_remove() {
        let mut index = OctreeIndex::default();
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        let id = ids.insert(());

        index.add_objects(&[(id, unit_at(0.0))]);
        assert_eq!(index.len(), 1);

        index.remove_objects(&[id]);
        assert!(index.is_empty());
        assert_eq!(index.octree().entry_count(), 0);
    }

    #[test]
    fn test_re_adding_replaces_bounds() {
        let mut index = OctreeIndex::default();
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        let id = ids.insert(());

        index.add_objects(&[(id, unit_at(0.0))]);
        index.add_objects(&[(id, unit_at(20.0))]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.octree().entry_count(), 1);

        let mut results = vec![id];
        assert!(!index.intersect_bounds(&mut results, &unit_at(0.0)));
        assert!(results.is_empty());
        assert!(index.intersect_bounds(&mut results, &unit_at(20.0)));
    }

    #[test]
    fn test_ray_and_sphere_queries() {
        let mut index = OctreeIndex::default();
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        let near = ids.insert(());
        let far = ids.insert(());
        index.add_objects(&[(near, unit_at(3.0)), (far, unit_at(30.0))]);

        let mut results = Vec::new();
        let ray = Ray::new(Vec3::zeros(), Vec3::x());
        assert!(index.intersect_ray(&mut results, &ray, 10.0));
        assert_eq!(results, vec![near]);

        assert!(index.intersect_sphere(&mut results, Vec3::new(30.0, 1.0, 0.0), 0.6));
        assert_eq!(results, vec![far]);
    }
}
