//! On-demand queries against the indexed scene
//!
//! Raycasts, box and sphere overlap checks, player containment and the
//! per-origin "first object under the pointer" records all share the
//! engine's index and oracle with the tester pass.

use crate::foundation::collections::{ObjectId, RayOriginId};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::intersection::engine::{admits, encloses_player, IntersectionEngine, RayIntersection};
use crate::intersection::geometry;
use crate::intersection::IntersectionError;
use crate::physics::collision::{CollisionOracle, Ray};
use crate::scene::{SceneProvider, AABB};

/// Nearest surface hit of a raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Object hit
    pub object: ObjectId,
    /// World distance from the ray origin
    pub distance: f32,
    /// World hit point
    pub point: Vec3,
    /// World surface normal at the hit
    pub normal: Vec3,
}

/// Broad-phase volume of an overlap check
#[derive(Debug, Clone, Copy)]
enum BroadVolume {
    Bounds(AABB),
    Sphere { center: Vec3, radius: f32 },
}

impl BroadVolume {
    fn touches(&self, bounds: &AABB) -> bool {
        match *self {
            Self::Bounds(ref volume) => volume.intersects(bounds),
            Self::Sphere { center, radius } => bounds.intersects_sphere(center, radius),
        }
    }
}

impl IntersectionEngine {
    /// Nearest object surface along `ray` within `max_distance`
    ///
    /// Candidates are visited in order of bounds entry distance and the
    /// search stops once the next entry lies beyond the best hit. Equal
    /// distances keep the first object found.
    pub fn raycast<S>(&mut self, scene: &S, ray: &Ray, max_distance: f32, ignore: &[ObjectId]) -> Option<RayHit>
    where
        S: SceneProvider + ?Sized,
    {
        if !self.running || ray.is_degenerate() {
            return None;
        }

        let player = scene.player_bounds();
        let Self {
            config,
            index,
            oracle,
            exclusion,
            candidates,
            sorted,
            pending_removals,
            ..
        } = self;

        if !index.intersect_ray(candidates, ray, max_distance) {
            return None;
        }

        sorted.clear();
        for &id in candidates.iter() {
            if ignore.contains(&id) {
                continue;
            }
            let Some(object) = scene.object(id) else {
                pending_removals.push(id);
                continue;
            };
            if !admits(scene, exclusion.as_ref(), player, config.player_bounds_margin, id, object) {
                continue;
            }
            if let Some(entry) = object.world_bounds().intersect_ray(ray.origin, ray.direction) {
                if entry <= max_distance {
                    sorted.push((entry, id));
                }
            }
        }
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut best: Option<RayHit> = None;
        for &(entry, id) in sorted.iter() {
            if best.is_some_and(|hit| entry > hit.distance) {
                break;
            }
            let Some(object) = scene.object(id) else {
                continue;
            };
            if !geometry::configure_oracle(oracle, scene, id) {
                continue;
            }
            let Some(hit) = geometry::test_ray(oracle, object.transform(), ray, max_distance) else {
                continue;
            };
            if best.map_or(true, |current| hit.distance < current.distance) {
                best = Some(RayHit { object: id, distance: hit.distance, point: hit.point, normal: hit.normal });
            }
        }

        best
    }

    /// Objects whose surface overlaps an axis-aligned world box
    pub fn check_bounds<S>(&mut self, scene: &S, bounds: &AABB, ignore: &[ObjectId]) -> Vec<ObjectId>
    where
        S: SceneProvider + ?Sized,
    {
        self.check_box(scene, bounds.center(), bounds.extents(), Quat::identity(), ignore)
    }

    /// Objects whose surface overlaps an oriented world box
    ///
    /// Results are ordered by distance from the box center to each object's
    /// bounds center.
    pub fn check_box<S>(
        &mut self,
        scene: &S,
        center: Vec3,
        half_extents: Vec3,
        orientation: Quat,
        ignore: &[ObjectId],
    ) -> Vec<ObjectId>
    where
        S: SceneProvider + ?Sized,
    {
        if !self.running {
            return Vec::new();
        }

        let broad = AABB::from_center_extents(Vec3::zeros(), half_extents.abs())
            .transformed(&Transform::from_position_rotation(center, orientation));
        self.collect_overlaps(scene, BroadVolume::Bounds(broad), center, ignore, |oracle, target| {
            geometry::test_box(oracle, target, center, half_extents, orientation)
        })
    }

    /// Objects whose surface overlaps a world sphere
    pub fn check_sphere<S>(&mut self, scene: &S, center: Vec3, radius: f32, ignore: &[ObjectId]) -> Vec<ObjectId>
    where
        S: SceneProvider + ?Sized,
    {
        if !self.running || radius < 0.0 {
            return Vec::new();
        }

        let broad = BroadVolume::Sphere { center, radius };
        self.collect_overlaps(scene, broad, center, ignore, |oracle, target| {
            geometry::test_sphere(oracle, target, center, radius)
        })
    }

    fn collect_overlaps<S, F>(
        &mut self,
        scene: &S,
        broad: BroadVolume,
        origin: Vec3,
        ignore: &[ObjectId],
        mut test: F,
    ) -> Vec<ObjectId>
    where
        S: SceneProvider + ?Sized,
        F: FnMut(&mut CollisionOracle, &Transform) -> bool,
    {
        let player = scene.player_bounds();
        let Self {
            config,
            index,
            oracle,
            exclusion,
            candidates,
            sorted,
            pending_removals,
            ..
        } = self;

        let found = match broad {
            BroadVolume::Bounds(ref bounds) => index.intersect_bounds(candidates, bounds),
            BroadVolume::Sphere { center, radius } => index.intersect_sphere(candidates, center, radius),
        };
        if !found {
            return Vec::new();
        }

        sorted.clear();
        for &id in candidates.iter() {
            if ignore.contains(&id) {
                continue;
            }
            let Some(object) = scene.object(id) else {
                pending_removals.push(id);
                continue;
            };
            if !admits(scene, exclusion.as_ref(), player, config.player_bounds_margin, id, object) {
                continue;
            }
            let bounds = object.world_bounds();
            if broad.touches(&bounds) {
                sorted.push(((bounds.center() - origin).norm_squared(), id));
            }
        }
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut hits = Vec::new();
        for &(_, id) in sorted.iter() {
            let Some(object) = scene.object(id) else {
                continue;
            };
            if geometry::configure_oracle(oracle, scene, id) && test(oracle, object.transform()) {
                hits.push(id);
            }
        }
        hits
    }

    /// Whether the object's bounds enclose the player's bounds plus margin
    ///
    /// False when the object is gone or the scene has no player.
    pub fn contains_player_completely<S>(&self, scene: &S, id: ObjectId) -> bool
    where
        S: SceneProvider + ?Sized,
    {
        scene.object(id).is_some_and(|object| {
            encloses_player(scene.player_bounds(), self.config.player_bounds_margin, &object.world_bounds())
        })
    }

    /// Register a pointer-style ray origin; it casts along its forward axis
    pub fn add_ray_origin(&mut self, pose: Transform) -> RayOriginId {
        let id = self.ray_origins.insert(pose);
        self.ray_records.insert(id, RayIntersection::default());
        id
    }

    /// Move a ray origin
    pub fn set_ray_origin_pose(&mut self, id: RayOriginId, pose: Transform) -> Result<(), IntersectionError> {
        let current = self.ray_origins.get_mut(id).ok_or(IntersectionError::UnknownRayOrigin(id))?;
        *current = pose;
        Ok(())
    }

    /// Unregister a ray origin
    pub fn remove_ray_origin(&mut self, id: RayOriginId) -> Option<Transform> {
        self.ray_records.remove(id);
        self.disabled_ray_origins.remove(&id);
        self.ray_origins.remove(id)
    }

    /// Enable or disable a ray origin; disabling clears its record
    pub fn set_ray_origin_enabled(&mut self, id: RayOriginId, enabled: bool) {
        if !self.ray_origins.contains_key(id) {
            log::warn!("Ignoring enable toggle for unknown ray origin {id:?}");
            return;
        }
        if enabled {
            self.disabled_ray_origins.remove(&id);
        } else {
            self.disabled_ray_origins.insert(id);
            self.ray_records.insert(id, RayIntersection::default());
        }
    }

    /// Whether a ray origin is registered and enabled
    pub fn is_ray_origin_enabled(&self, id: RayOriginId) -> bool {
        self.ray_origins.contains_key(id) && !self.disabled_ray_origins.contains(&id)
    }

    /// Recast from a ray origin and store the first object hit
    ///
    /// `max_distance` falls back to the configured default. Objects on the
    /// standard ignore list are skipped. Disabled origins keep an empty
    /// record. Returns `None` for an unknown origin.
    pub fn update_raycast<S>(&mut self, scene: &S, id: RayOriginId, max_distance: Option<f32>) -> Option<RayIntersection>
    where
        S: SceneProvider + ?Sized,
    {
        let pose = *self.ray_origins.get(id)?;
        if self.disabled_ray_origins.contains(&id) {
            let record = RayIntersection::default();
            self.ray_records.insert(id, record);
            return Some(record);
        }

        let max_distance = max_distance.unwrap_or(self.config.default_ray_distance);
        let ray = Ray::new(pose.position, pose.forward());
        let ignore = std::mem::take(&mut self.standard_ignore);
        let hit = self.raycast(scene, &ray, max_distance, &ignore);
        self.standard_ignore = ignore;

        let record = hit.map_or_else(RayIntersection::default, |hit| RayIntersection {
            object: Some(hit.object),
            distance: hit.distance,
        });
        self.ray_records.insert(id, record);
        Some(record)
    }

    /// The object last found by [`IntersectionEngine::update_raycast`] and
    /// its distance, `(None, 0.0)` when nothing was hit
    pub fn first_object(&self, id: RayOriginId) -> (Option<ObjectId>, f32) {
        self.ray_records
            .get(id)
            .map_or((None, 0.0), |record| (record.object, record.distance))
    }

    /// Skip an object in every ray origin update
    pub fn add_to_standard_ignore_list(&mut self, id: ObjectId) {
        if !self.standard_ignore.contains(&id) {
            self.standard_ignore.push(id);
        }
    }

    /// Stop skipping an object in ray origin updates
    pub fn remove_from_standard_ignore_list(&mut self, id: ObjectId) {
        self.standard_ignore.retain(|ignored| *ignored != id);
    }

    /// Objects skipped by ray origin updates
    pub fn standard_ignore_list(&self) -> &[ObjectId] {
        &self.standard_ignore
    }
}
