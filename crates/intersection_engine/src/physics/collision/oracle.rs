//! The shared narrow-phase surface
//!
//! A [`CollisionOracle`] is one mutable mesh collider pinned at the origin.
//! Before each narrow-phase test it is rebound to the candidate's mesh, so
//! every query runs in the candidate's local frame. It holds model-space
//! triangles, and optionally a temporary world pose used by sphere tests.
//!
//! Casts are single-sided: a ray only hits faces whose counter-clockwise
//! winding faces it. Containment is therefore decided by the pair of entry
//! points found from both ends of a line through the query point.

use std::sync::Arc;

use crate::foundation::collections::ObjectId;
use crate::foundation::math::{Transform, Vec3};
use crate::physics::collision::{OrientedBox, Ray, SurfaceHit, Triangle};
use crate::scene::{Mesh, AABB};

/// Fixed probe axis for point containment; skewed so it avoids running
/// along the edges and face diagonals of axis-aligned meshes
const CONTAINMENT_AXIS: [f32; 3] = [1.0, 2.0, 3.0];

/// What the oracle surface currently represents
#[derive(Debug, Clone, Default)]
pub enum OracleBinding {
    /// Nothing bound; every test misses
    #[default]
    Unbound,
    /// A shared static mesh at unit scale
    Shared(Arc<Mesh>),
    /// A pose baked from a skinned object into the scratch buffer
    Baked(ObjectId),
}

/// Single shared narrow-phase mesh surface
#[derive(Debug)]
pub struct CollisionOracle {
    binding: OracleBinding,
    /// Scratch buffer reused by every bake
    bake_buffer: Mesh,
    /// Local scale applied to the bound geometry
    scale: Vec3,
    triangles: Vec<Triangle>,
    bounds: Option<AABB>,
    pose: Option<Transform>,
    posed_triangles: Vec<Triangle>,
    posed_bounds: Option<AABB>,
    scale_epsilon: f32,
}

impl CollisionOracle {
    /// Create an unbound oracle
    pub fn new(scale_epsilon: f32) -> Self {
        Self {
            binding: OracleBinding::Unbound,
            bake_buffer: Mesh::default(),
            scale: Vec3::repeat(1.0),
            triangles: Vec::new(),
            bounds: None,
            pose: None,
            posed_triangles: Vec::new(),
            posed_bounds: None,
            scale_epsilon,
        }
    }

    /// Current binding
    pub fn binding(&self) -> &OracleBinding {
        &self.binding
    }

    /// True when bound to this exact shared mesh
    pub fn is_bound_to(&self, mesh: &Arc<Mesh>) -> bool {
        matches!(&self.binding, OracleBinding::Shared(bound) if Arc::ptr_eq(bound, mesh))
    }

    /// Object whose bake is currently bound, if any
    pub fn baked_object(&self) -> Option<ObjectId> {
        match self.binding {
            OracleBinding::Baked(id) => Some(id),
            _ => None,
        }
    }

    /// Bind a shared mesh at unit scale
    ///
    /// Meshes that are not readable or not triangulated are refused and the
    /// current binding is kept. Rebinding the mesh already bound is free.
    pub fn bind_mesh(&mut self, mesh: &Arc<Mesh>) -> bool {
        if !mesh.is_collidable() {
            log::warn!(
                "Skipping non-collidable mesh ({} vertices, {:?}, readable: {})",
                mesh.vertices().len(),
                mesh.topology(),
                mesh.is_readable()
            );
            return false;
        }
        if self.is_bound_to(mesh) {
            return true;
        }

        self.reset_pose();
        self.scale = Vec3::repeat(1.0);
        self.rebuild_from(mesh);
        self.binding = OracleBinding::Shared(Arc::clone(mesh));
        true
    }

    /// Bake a fresh pose through `bake` and bind it, scaled by `inverse_scale`
    ///
    /// The bake writes into the oracle's scratch buffer. On failure the
    /// previous binding and its triangles stay as they were.
    pub fn bind_baked<F>(&mut self, id: ObjectId, inverse_scale: Vec3, bake: F) -> bool
    where
        F: FnOnce(&mut Mesh) -> bool,
    {
        let mut buffer = std::mem::take(&mut self.bake_buffer);
        let baked = bake(&mut buffer) && buffer.is_collidable();
        if baked {
            self.reset_pose();
            self.scale = self.sanitize_scale(inverse_scale);
            self.rebuild_from(&buffer);
            self.binding = OracleBinding::Baked(id);
        } else {
            log::warn!("Bake for {id:?} produced no collidable geometry");
        }
        self.bake_buffer = buffer;
        baked
    }

    fn rebuild_from(&mut self, mesh: &Mesh) {
        let scale = self.scale;
        let mirrored = scale.x * scale.y * scale.z < 0.0;
        self.triangles.clear();
        self.triangles.extend(mesh.triangles().map(|triangle| {
            let scaled = Triangle::new(
                triangle.v0.component_mul(&scale),
                triangle.v1.component_mul(&scale),
                triangle.v2.component_mul(&scale),
            );
            if mirrored { scaled.flipped() } else { scaled }
        }));
        self.bounds = Self::bounds_of(&self.triangles);
    }

    fn bounds_of(triangles: &[Triangle]) -> Option<AABB> {
        AABB::from_points(triangles.iter().flat_map(|t| [&t.v0, &t.v1, &t.v2]))
    }

    /// Replace zero-ish components by the epsilon, keeping their sign
    fn sanitize_scale(&self, scale: Vec3) -> Vec3 {
        scale.map(|component| {
            if component.abs() < self.scale_epsilon {
                self.scale_epsilon.copysign(component)
            } else {
                component
            }
        })
    }

    /// Move the surface to a world pose until [`CollisionOracle::reset_pose`]
    ///
    /// Zero scale components are padded to the epsilon so the posed surface
    /// never collapses, and negative scale products flip winding so faces
    /// keep pointing outward.
    pub fn set_pose(&mut self, transform: &Transform) {
        let scale = self.sanitize_scale(transform.scale);
        let pose = Transform::from_trs(transform.position, transform.rotation, scale);
        let mirrored = scale.x * scale.y * scale.z < 0.0;

        self.posed_triangles.clear();
        self.posed_triangles.extend(self.triangles.iter().map(|triangle| {
            let posed = Triangle::new(
                pose.transform_point(&triangle.v0),
                pose.transform_point(&triangle.v1),
                pose.transform_point(&triangle.v2),
            );
            if mirrored { posed.flipped() } else { posed }
        }));
        self.posed_bounds = Self::bounds_of(&self.posed_triangles);
        self.pose = Some(pose);
        log::trace!("Oracle posed at {:?} with scale {:?}", pose.position, scale);
    }

    /// Return the surface to its local frame
    pub fn reset_pose(&mut self) {
        self.pose = None;
        self.posed_triangles.clear();
        self.posed_bounds = None;
    }

    /// Whether a world pose is applied
    pub fn is_posed(&self) -> bool {
        self.pose.is_some()
    }

    /// Pose currently applied, with its sanitized scale
    pub fn pose(&self) -> Option<&Transform> {
        self.pose.as_ref()
    }

    /// Triangles tests currently run against
    pub fn triangles(&self) -> &[Triangle] {
        if self.pose.is_some() {
            &self.posed_triangles
        } else {
            &self.triangles
        }
    }

    /// Bounds of [`CollisionOracle::triangles`]
    pub fn bounds(&self) -> Option<AABB> {
        if self.pose.is_some() {
            self.posed_bounds
        } else {
            self.bounds
        }
    }

    /// Length of the bounds diagonal, 0 when unbound
    pub fn bounds_magnitude(&self) -> f32 {
        self.bounds().map_or(0.0, |bounds| bounds.size().norm())
    }

    /// Local scale applied to the bound geometry
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Smallest scale magnitude the oracle poses with
    pub fn scale_epsilon(&self) -> f32 {
        self.scale_epsilon
    }

    /// Nearest front-face hit within `max_distance`
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        if ray.is_degenerate() {
            return None;
        }
        let bounds = self.bounds()?;
        let entry = bounds.intersect_ray(ray.origin, ray.direction)?;
        if entry > max_distance {
            return None;
        }

        let mut closest: Option<SurfaceHit> = None;
        for triangle in self.triangles() {
            let Some((t, _u, _v)) = triangle.intersect_ray_front(ray) else {
                continue;
            };
            if t <= max_distance && closest.map_or(true, |hit| t < hit.distance) {
                closest = Some(SurfaceHit {
                    distance: t,
                    point: ray.point_at(t),
                    normal: triangle.normal(),
                });
            }
        }
        closest
    }

    /// Entry points of the line through `origin` along `direction`, cast
    /// from both ends: `(forward, backward)`
    ///
    /// The forward cast starts behind `origin` and travels along `direction`;
    /// the backward cast starts ahead and travels against it. Both start
    /// outside the bounds.
    pub fn cast_through(&self, origin: Vec3, direction: Vec3) -> Option<(Vec3, Vec3)> {
        let bounds = self.bounds()?;
        let direction = direction.try_normalize(f32::EPSILON)?;
        let reach = (origin - bounds.center()).norm() + bounds.size().norm() + 1.0;

        let forward = self.raycast(&Ray::new(origin - direction * reach, direction), f32::INFINITY)?;
        let backward = self.raycast(&Ray::new(origin + direction * reach, -direction), f32::INFINITY)?;
        Some((forward.point, backward.point))
    }

    /// Whether `origin` lies between the two entry points along `direction`
    ///
    /// Exact for convex closed meshes; for other shapes it answers along
    /// this single axis only.
    pub fn contains_along(&self, origin: Vec3, direction: Vec3) -> bool {
        let Some((forward, backward)) = self.cast_through(origin, direction) else {
            return false;
        };
        let segment = forward - backward;
        let projection = (origin - backward).dot(&segment);
        (0.0..=segment.norm_squared()).contains(&projection)
    }

    /// Point containment along the fixed skewed axis
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.contains_along(point, Vec3::from(CONTAINMENT_AXIS))
    }

    /// Whether an oriented box touches the surface or sits inside it
    pub fn overlaps_box(&self, obb: &OrientedBox) -> bool {
        let Some(bounds) = self.bounds() else {
            return false;
        };
        let reach = obb.half_extents.norm();
        if !bounds.intersects_sphere(obb.center, reach) {
            return false;
        }

        self.triangles().iter().any(|triangle| obb.intersects_triangle(triangle))
            || self.contains_point(obb.center)
    }

    /// Whether a sphere touches the surface or sits inside it
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let Some(bounds) = self.bounds() else {
            return false;
        };
        if !bounds.intersects_sphere(center, radius) {
            return false;
        }

        let radius_sq = radius * radius;
        self.triangles()
            .iter()
            .any(|triangle| (triangle.closest_point(center) - center).norm_squared() <= radius_sq)
            || self.contains_point(center)
    }

    /// Drop the binding and the scratch buffers
    pub fn release(&mut self) {
        self.binding = OracleBinding::Unbound;
        self.bake_buffer = Mesh::default();
        self.scale = Vec3::repeat(1.0);
        self.triangles = Vec::new();
        self.bounds = None;
        self.pose = None;
        self.posed_triangles = Vec::new();
        self.posed_bounds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn cube() -> Arc<Mesh> {
        Arc::new(Mesh::cube(Vec3::repeat(0.5)))
    }

    fn bound_to(mesh: &Arc<Mesh>) -> CollisionOracle {
        let mut oracle = CollisionOracle::new(1.0e-4);
        assert!(oracle.bind_mesh(mesh));
        oracle
    }

    #[test]
    fn test_raycast_hits_front_face_only() {
        let oracle = bound_to(&cube());
        let outside = Ray::new(Vec3::new(0.1, 3.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
        let hit = oracle.raycast(&outside, 10.0).unwrap();
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);

        // From inside every face is seen from behind
        let inside = Ray::new(Vec3::new(0.1, 0.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
        assert!(oracle.raycast(&inside, 10.0).is_none());
    }

    #[test]
    fn test_raycast_respects_max_distance() {
        let oracle = bound_to(&cube());
        let ray = Ray::new(Vec3::new(0.1, 3.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
        assert!(oracle.raycast(&ray, 2.0).is_none());
    }

    #[test]
    fn test_containment_inside_and_outside() {
        let oracle = bound_to(&cube());
        assert!(oracle.contains_point(Vec3::new(0.1, -0.2, 0.3)));
        assert!(!oracle.contains_point(Vec3::new(0.9, 0.0, 0.0)));
        assert!(!oracle.contains_point(Vec3::new(3.0, 3.0, 3.0)));
    }

    #[test]
    fn test_rebinding_same_mesh_keeps_binding() {
        let mesh = cube();
        let mut oracle = bound_to(&mesh);
        assert!(oracle.bind_mesh(&mesh));
        assert!(oracle.is_bound_to(&mesh));
    }

    #[test]
    fn test_non_readable_mesh_keeps_previous_binding() {
        let mesh = cube();
        let mut oracle = bound_to(&mesh);
        let hidden = Arc::new(Mesh::cube(Vec3::repeat(2.0)).non_readable());
        assert!(!oracle.bind_mesh(&hidden));
        assert!(oracle.is_bound_to(&mesh));
        assert_relative_eq!(oracle.bounds().unwrap().max, Vec3::repeat(0.5));
    }

    #[test]
    fn test_baked_binding_uses_inverse_scale() {
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        let id = ids.insert(());
        let mut oracle = CollisionOracle::new(1.0e-4);

        let bound = oracle.bind_baked(id, Vec3::new(0.5, 0.5, 0.5), |out| {
            let big = Mesh::cube(Vec3::repeat(1.0));
            out.set_geometry(big.vertices(), big.indices());
            true
        });
        assert!(bound);
        assert_eq!(oracle.baked_object(), Some(id));
        assert_relative_eq!(oracle.bounds().unwrap().max, Vec3::repeat(0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_failed_bake_keeps_previous_binding() {
        let mesh = cube();
        let mut oracle = bound_to(&mesh);
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        assert!(!oracle.bind_baked(ids.insert(()), Vec3::repeat(1.0), |_| false));
        assert!(oracle.is_bound_to(&mesh));
    }

    #[test]
    fn test_mirrored_pose_keeps_outward_faces() {
        let mut oracle = bound_to(&cube());
        let mirrored = Transform::from_position(Vec3::new(2.0, 0.0, 0.0)).with_scale(Vec3::new(-1.0, 1.0, 1.0));
        oracle.set_pose(&mirrored);

        for triangle in oracle.triangles() {
            let outward = triangle.centroid() - Vec3::new(2.0, 0.0, 0.0);
            assert!(triangle.normal().dot(&outward) > 0.0);
        }
        assert!(oracle.overlaps_sphere(Vec3::new(2.1, 0.1, 0.1), 0.01));

        oracle.reset_pose();
        assert!(!oracle.is_posed());
        assert_relative_eq!(oracle.bounds().unwrap().center(), Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_scale_pose_stays_finite() {
        let mut oracle = bound_to(&cube());
        oracle.set_pose(&Transform::identity().with_scale(Vec3::new(1.0, 0.0, -1.0)));
        assert!(oracle
            .triangles()
            .iter()
            .all(|t| [t.v0, t.v1, t.v2].iter().all(|v| v.iter().all(|c| c.is_finite()))));
        assert!(oracle.overlaps_sphere(Vec3::zeros(), 0.05));
    }

    #[test]
    fn test_box_overlap_touching_and_contained() {
        let oracle = bound_to(&cube());
        let contained = OrientedBox::new(Vec3::zeros(), Vec3::repeat(0.1), Quat::identity());
        let straddling = OrientedBox::new(Vec3::new(0.5, 0.0, 0.0), Vec3::repeat(0.1), Quat::identity());
        let apart = OrientedBox::new(Vec3::new(2.0, 0.0, 0.0), Vec3::repeat(0.1), Quat::identity());
        assert!(oracle.overlaps_box(&contained));
        assert!(oracle.overlaps_box(&straddling));
        assert!(!oracle.overlaps_box(&apart));
    }

    #[test]
    fn test_release_unbinds() {
        let mut oracle = bound_to(&cube());
        oracle.release();
        assert!(matches!(oracle.binding(), OracleBinding::Unbound));
        assert!(oracle.raycast(&Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::y()), 10.0).is_none());
    }
}
