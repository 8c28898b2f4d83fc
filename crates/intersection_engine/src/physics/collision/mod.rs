//! Narrow-phase collision geometry
//!
//! # Module Organization
//!
//! - [`primitives`] - Basic geometric primitives (rays, triangles, oriented boxes)
//! - [`oracle`] - The shared mesh surface every narrow-phase test runs against
//!
//! # Key Types
//!
//! - [`CollisionOracle`] - Rebindable local-space mesh collider
//! - [`Ray`], [`Triangle`], [`OrientedBox`] - Primitive geometric types
//! - [`SurfaceHit`] - Distance, point and normal of a ray hit

pub mod primitives;
pub mod oracle;

// Re-export commonly used types
pub use primitives::{OrientedBox, Ray, SurfaceHit, Triangle};
pub use oracle::{CollisionOracle, OracleBinding};
