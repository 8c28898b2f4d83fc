//! Physics module for narrow-phase intersection testing
//!
//! Only discrete, point-in-time geometric queries live here. There is no
//! dynamics and no contact resolution.

pub mod collision;

pub use collision::{
    CollisionOracle,
    OrientedBox,
    Ray,
    SurfaceHit,
    Triangle,
};
