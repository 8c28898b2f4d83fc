//! Scene access for the intersection engine
//!
//! The engine never owns scene objects. It reads them each tick through the
//! [`SceneProvider`] trait, so a host can plug in its own object store.
//! [`Scene`] is the slot-map backed store used by the demo app and tests.

use crate::foundation::collections::{ObjectId, SlotMap};
use crate::foundation::math::Vec3;
use crate::scene::{Mesh, SceneObject, ShapeSource, AABB};

/// Read access to the objects the engine tests against
pub trait SceneProvider {
    /// Look up a live object; `None` once it has been destroyed
    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    /// Every live object
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Whether the object is excluded from tester results
    fn is_locked(&self, id: ObjectId) -> bool {
        self.object(id).is_some_and(|object| object.locked)
    }

    /// Bake the current pose of a skinned object into `out`
    ///
    /// Baked vertices carry the object's world scale, matching what a
    /// skinning pipeline hands back. Returns `false` when the object is gone
    /// or has no deformable shape.
    fn bake_mesh(&self, id: ObjectId, out: &mut Mesh) -> bool {
        let Some(object) = self.object(id) else {
            return false;
        };
        let ShapeSource::Skinned { bind, pose } = object.shape() else {
            return false;
        };
        let scale = object.transform().scale;
        let baked: Vec<Vec3> = pose.iter().map(|vertex| vertex.component_mul(&scale)).collect();
        out.set_geometry(&baked, bind.indices());
        true
    }

    /// World bounds of the player's body, if there is a player
    fn player_bounds(&self) -> Option<AABB> {
        None
    }
}

/// Slot-map backed object store
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, SceneObject>,
    players: Vec<ObjectId>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its handle
    pub fn spawn(&mut self, object: SceneObject) -> ObjectId {
        self.objects.insert(object)
    }

    /// Remove an object; its handle becomes permanently invalid
    pub fn destroy(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.players.retain(|&player| player != id);
        self.objects.remove(id)
    }

    /// Borrow an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Mutably borrow an object
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// Flag an object as part of the player's body
    pub fn mark_player(&mut self, id: ObjectId) {
        if self.objects.contains_key(id) && !self.players.contains(&id) {
            self.players.push(id);
        }
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the scene holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over live objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }
}

impl SceneProvider for Scene {
    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().collect()
    }

    fn player_bounds(&self) -> Option<AABB> {
        self.players
            .iter()
            .filter_map(|&id| self.objects.get(id))
            .map(SceneObject::world_bounds)
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn cube_at(x: f32) -> SceneObject {
        SceneObject::with_mesh("cube", Transform::from_position(Vec3::new(x, 0.0, 0.0)), Arc::new(Mesh::cube(Vec3::repeat(0.5))))
    }

    #[test]
    fn test_destroyed_handle_is_dead() {
        let mut scene = Scene::new();
        let id = scene.spawn(cube_at(0.0));
        scene.destroy(id);
        let reused = scene.spawn(cube_at(1.0));
        assert!(scene.object(id).is_none());
        assert!(scene.object(reused).is_some());
        assert_ne!(id, reused);
    }

    #[test]
    fn test_player_bounds_union() {
        let mut scene = Scene::new();
        assert!(scene.player_bounds().is_none());
        let head = scene.spawn(cube_at(0.0));
        let hand = scene.spawn(cube_at(2.0));
        scene.mark_player(head);
        scene.mark_player(hand);
        let bounds = scene.player_bounds().unwrap();
        assert_relative_eq!(bounds.min.x, -0.5);
        assert_relative_eq!(bounds.max.x, 2.5);
    }

    #[test]
    fn test_bake_applies_world_scale() {
        let mut scene = Scene::new();
        let bind = Arc::new(Mesh::cube(Vec3::repeat(0.5)));
        let pose = bind.vertices().to_vec();
        let transform = Transform::identity().with_scale(Vec3::new(2.0, 2.0, 2.0));
        let skinned = scene.spawn(SceneObject::new("skin", transform, ShapeSource::Skinned { bind, pose }));
        let rigid = scene.spawn(cube_at(0.0));

        let mut baked = Mesh::default();
        assert!(scene.bake_mesh(skinned, &mut baked));
        assert_relative_eq!(baked.bounds().unwrap().max, Vec3::repeat(1.0));
        assert_eq!(baked.triangles().count(), 12);
        assert!(!scene.bake_mesh(rigid, &mut baked));
    }
}
