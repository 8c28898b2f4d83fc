//! Error type for engine registration and configuration

use crate::config::ConfigError;
use crate::foundation::collections::{RayOriginId, TesterId};

/// Intersection engine errors
///
/// Only setup paths fail. Ticks and queries degrade to "no hit" instead.
#[derive(thiserror::Error, Debug)]
pub enum IntersectionError {
    /// The tester handle is not registered
    #[error("Unknown tester: {0:?}")]
    UnknownTester(TesterId),

    /// The ray origin handle is not registered
    #[error("Unknown ray origin: {0:?}")]
    UnknownRayOrigin(RayOriginId),

    /// A tester shape cannot be used for probing
    #[error("Invalid tester mesh: {0}")]
    InvalidTesterMesh(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
