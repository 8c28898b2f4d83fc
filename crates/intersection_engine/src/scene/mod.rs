//! Scene-side data the intersection engine consumes
//!
//! - [`AABB`] bounds shared by every layer
//! - [`Mesh`] model-space geometry
//! - [`SceneObject`] and [`ShapeSource`] for static and skinned shapes
//! - [`SceneProvider`], the read-only view the engine queries, and the
//!   slot-map backed [`Scene`] implementing it

mod aabb;
mod mesh;
mod scene_object;
mod provider;

pub use aabb::AABB;
pub use mesh::{Mesh, MeshTopology};
pub use scene_object::{SceneObject, ShapeSource};
pub use provider::{Scene, SceneProvider};
