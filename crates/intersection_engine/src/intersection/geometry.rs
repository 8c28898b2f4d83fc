//! Geometric test library
//!
//! Every test runs against the [`CollisionOracle`] after it has been bound
//! to a candidate with [`configure_oracle`]. Inputs are in world space; the
//! target's local-to-world transform carries them into the oracle's frame
//! and carries results back out.

use crate::foundation::collections::ObjectId;
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::intersection::Tester;
use crate::physics::collision::{CollisionOracle, OrientedBox, Ray, SurfaceHit};
use crate::scene::SceneProvider;

/// Rebind the oracle to the candidate's surface
///
/// Every test below carries world inputs into the target frame with the
/// oracle's scale epsilon, the same one a baked surface is scaled with.
/// Static meshes are bound directly, skinned shapes are baked into the
/// oracle's scratch buffer and scaled by the inverse of the object's scale.
/// Returns `false` when the candidate is gone or its mesh is unusable; the
/// previous binding then stays in place.
pub fn configure_oracle<S>(oracle: &mut CollisionOracle, scene: &S, id: ObjectId) -> bool
where
    S: SceneProvider + ?Sized,
{
    let Some(object) = scene.object(id) else {
        return false;
    };

    if object.is_skinned() {
        let inverse_scale = object.transform().inverse_scale(oracle.scale_epsilon());
        oracle.bind_baked(id, inverse_scale, |buffer| scene.bake_mesh(id, buffer))
    } else {
        oracle.bind_mesh(object.mesh())
    }
}

/// Whether the origin of a world-space ray lies inside or on the target
///
/// The decision is made along the ray's own axis: entry points are found by
/// casting from both ends of that line, and the origin is inside when it
/// projects between them. This is exact for convex closed meshes and an
/// approximation for anything else.
pub fn test_ray_contains(oracle: &CollisionOracle, target: &Transform, ray: &Ray) -> bool {
    let epsilon = oracle.scale_epsilon();
    let origin = target.inverse_transform_point_with(&ray.origin, epsilon);
    let direction = target.inverse_transform_vector_with(&ray.direction, epsilon);
    oracle.contains_along(origin, direction)
}

/// Nearest surface hit of a world-space ray within `max_distance`
///
/// The hit is reported in world space with the world distance.
pub fn test_ray(oracle: &CollisionOracle, target: &Transform, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
    let epsilon = oracle.scale_epsilon();
    let local_direction = target.inverse_transform_vector_with(&ray.direction, epsilon);
    let stretch = local_direction.norm();
    if !(stretch.is_finite() && stretch > f32::EPSILON) {
        return None;
    }

    let local_ray = Ray::new(target.inverse_transform_point_with(&ray.origin, epsilon), local_direction);
    let local_hit = oracle.raycast(&local_ray, max_distance * stretch)?;

    let point = target.transform_point(&local_hit.point);
    Some(SurfaceHit {
        distance: (point - ray.origin).norm(),
        point,
        normal: target.transform_normal(&local_hit.normal),
    })
}

/// Whether `c` lies on the segment from `a` to `b`
///
/// Compares `|ac| + |cb|` with `|ab|`, so swapping `a` and `b` gives the same
/// answer bit for bit.
pub fn on_segment(a: Vec3, c: Vec3, b: Vec3, tolerance: f32) -> bool {
    ((a - c).norm() + (c - b).norm() - (a - b).norm()).abs() <= tolerance
}

/// Test the tester's edges against the target
///
/// Each edge is extended into a line and cast from both ends. An edge that
/// crosses the surface reports the entry point nearer the tester; an edge
/// lying wholly inside reports the tester's own position. Zero-length edges
/// and lines that miss the surface are skipped.
pub fn test_edges(oracle: &CollisionOracle, target: &Transform, tester: &Tester, tolerance: f32) -> Option<Vec3> {
    let bounds = oracle.bounds()?;
    let center = bounds.center();
    let diagonal = bounds.size().norm();
    let epsilon = oracle.scale_epsilon();
    let to_local = |point: Vec3| target.inverse_transform_point_with(&point, epsilon);
    let tester_local = to_local(tester.world_position());

    for (start, end) in tester.edges() {
        let start = to_local(tester.transform().transform_point(&start));
        let end = to_local(tester.transform().transform_point(&end));
        let Some(direction) = (end - start).try_normalize(f32::EPSILON) else {
            continue;
        };
        let reach = (start - center).norm() + (end - start).norm() + diagonal + 1.0;

        let Some(forward) = oracle.raycast(&Ray::new(start - direction * reach, direction), f32::INFINITY) else {
            continue;
        };
        let Some(backward) = oracle.raycast(&Ray::new(end + direction * reach, -direction), f32::INFINITY) else {
            continue;
        };
        let (forward, backward) = (forward.point, backward.point);

        if on_segment(start, forward, end, tolerance) || on_segment(start, backward, end, tolerance) {
            let nearer = if (forward - tester_local).norm_squared() <= (backward - tester_local).norm_squared() {
                forward
            } else {
                backward
            };
            return Some(target.transform_point(&nearer));
        }

        if on_segment(forward, start, backward, tolerance) && on_segment(forward, end, backward, tolerance) {
            return Some(tester.world_position());
        }
    }

    None
}

/// Full narrow-phase test of a tester against the bound target
///
/// Probe rays go first: any probe origin inside the target is the contact.
/// Edges are the fallback for thin or grazing overlaps the probes miss.
pub fn test_object(oracle: &CollisionOracle, target: &Transform, tester: &Tester, tolerance: f32) -> Option<Vec3> {
    let pose = tester.transform();
    for probe in tester.local_probe_rays() {
        let world_probe = Ray::new(pose.transform_point(&probe.origin), pose.transform_vector(&probe.direction));
        if test_ray_contains(oracle, target, &world_probe) {
            return Some(world_probe.origin);
        }
    }

    test_edges(oracle, target, tester, tolerance)
}

/// Whether an oriented world box overlaps the target
///
/// The box is carried into the target frame by inverse-scaling its extents
/// and inverse-rotating its orientation.
pub fn test_box(
    oracle: &CollisionOracle,
    target: &Transform,
    center: Vec3,
    half_extents: Vec3,
    orientation: Quat,
) -> bool {
    let local_center = target.inverse_transform_point_with(&center, oracle.scale_epsilon());
    let local_half_extents = half_extents.component_mul(&target.inverse_scale(oracle.scale_epsilon()));
    let local_orientation = target.rotation.inverse() * orientation;
    oracle.overlaps_box(&OrientedBox::new(local_center, local_half_extents, local_orientation))
}

/// Whether a world sphere overlaps the target
///
/// The oracle is posed at the target's world transform for the duration of
/// the test and returned to its local frame afterwards.
pub fn test_sphere(oracle: &mut CollisionOracle, target: &Transform, center: Vec3, radius: f32) -> bool {
    oracle.set_pose(target);
    let hit = oracle.overlaps_sphere(center, radius);
    oracle.reset_pose();
    hit
}
