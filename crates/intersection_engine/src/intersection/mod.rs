//! Spatial intersection engine
//!
//! Testers are probes moved by the host each frame. The engine keeps one
//! direct intersection record per tester and reports the transitions as
//! [`IntersectionEvent`]s. Ray origins, raycasts and overlap checks are
//! answered on demand from the same index and oracle.

mod engine;
mod error;
mod events;
pub mod geometry;
mod query;
mod tester;

#[cfg(test)]
mod tests;

pub use engine::{DirectIntersection, ExclusionPredicate, IntersectionEngine, RayIntersection};
pub use error::IntersectionError;
pub use events::{IntersectionEvent, IntersectionEventKind};
pub use query::RayHit;
pub use tester::Tester;
