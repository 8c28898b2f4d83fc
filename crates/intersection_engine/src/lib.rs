//! # Intersection Engine
//!
//! Spatial intersection services for VR interaction: which object is a hand
//! or pointer touching right now, what does a ray hit first, and which
//! objects overlap a box or sphere.
//!
//! ## Features
//!
//! - **Testers**: probes with their own collision shape, evaluated once per
//!   tick with Enter / Stay / Exit transitions
//! - **Broad phase**: a loose octree over scene object bounds, reconciled
//!   against the live scene every tick
//! - **Narrow phase**: exact tests against one rebindable mesh surface,
//!   including skinned shapes baked in their current pose
//! - **Queries**: raycasts, ray origins, box and sphere overlap checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use intersection_engine::prelude::*;
//!
//! fn main() -> Result<(), IntersectionError> {
//!     let mut scene = Scene::new();
//!     let cube = Arc::new(Mesh::cube(Vec3::repeat(0.5)));
//!     scene.spawn(SceneObject::with_mesh("crate", Transform::identity(), cube));
//!
//!     let mut engine = IntersectionEngine::with_octree(IntersectionConfig::default())?;
//!     engine.setup(&scene);
//!
//!     let hand = Tester::new(
//!         Transform::from_position(Vec3::new(0.1, 0.2, 0.0)),
//!         Arc::new(Mesh::cube(Vec3::repeat(0.05))),
//!     )?;
//!     let hand = engine.add_tester(hand);
//!
//!     engine.tick(&scene);
//!     for event in engine.drain_events() {
//!         println!("{:?} {:?}", event.kind, event.object);
//!     }
//!     let _touching = engine.intersected_object_for_tester(hand);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod spatial;
pub mod physics;
pub mod intersection;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, IntersectionConfig},
        foundation::{
            collections::{ObjectId, RayOriginId, TesterId},
            math::{Quat, Transform, Vec3},
        },
        intersection::{
            IntersectionEngine, IntersectionError, IntersectionEvent, IntersectionEventKind, RayHit,
            RayIntersection, Tester,
        },
        physics::collision::Ray,
        scene::{Mesh, Scene, SceneObject, SceneProvider, ShapeSource, AABB},
        spatial::{OctreeConfig, OctreeIndex, SpatialIndex},
    };
}
