//! Engine-level tests over a small in-memory scene

mod scenarios;

use std::sync::Arc;

use crate::config::IntersectionConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::intersection::{IntersectionEngine, IntersectionEvent, Tester};
use crate::scene::{Mesh, SceneObject};

fn cube(half: f32) -> Arc<Mesh> {
    Arc::new(Mesh::cube(Vec3::repeat(half)))
}

fn cube_object(name: &str, position: Vec3, half: f32) -> SceneObject {
    SceneObject::with_mesh(name, Transform::from_position(position), cube(half))
}

/// Small cube probe; keep it off the target's center so probe lines miss
/// the target's corners
fn probe_at(position: Vec3) -> Tester {
    Tester::new(Transform::from_position(position), cube(0.05)).unwrap()
}

fn engine() -> IntersectionEngine {
    IntersectionEngine::with_octree(IntersectionConfig::default()).unwrap()
}

fn drain(engine: &mut IntersectionEngine) -> Vec<IntersectionEvent> {
    engine.drain_events().collect()
}
