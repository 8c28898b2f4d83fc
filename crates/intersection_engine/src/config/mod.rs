//! Configuration system
//!
//! [`IntersectionConfig`] carries every tunable of the engine. It can be
//! built in code, or loaded from a `.toml` / `.ron` file through the
//! [`Config`] trait. Missing keys fall back to [`Default`].

pub use serde::{Serialize, Deserialize};

use crate::spatial::OctreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed fine but is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for the intersection engine and its query service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionConfig {
    /// Candidate ceiling per tester per tick; above it the tester is skipped
    pub max_tests_per_tester: usize,

    /// Margin added around the player bounds before the "encloses the
    /// player" rejection test
    pub player_bounds_margin: f32,

    /// Smallest scale magnitude the collision oracle will pose with
    pub scale_epsilon: f32,

    /// Slack allowed by the on-segment collinearity test
    pub on_segment_tolerance: f32,

    /// Reach of ray-origin casts when the caller passes no distance
    pub default_ray_distance: f32,

    /// Undrained events kept by the engine; the oldest are dropped beyond it
    pub max_pending_events: usize,

    /// Broad-phase index layout
    pub octree: OctreeConfig,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            max_tests_per_tester: 250,
            player_bounds_margin: 0.1,
            scale_epsilon: 1.0e-4,
            on_segment_tolerance: 1.0e-4,
            default_ray_distance: 100.0,
            max_pending_events: 4096,
            octree: OctreeConfig::default(),
        }
    }
}

impl Config for IntersectionConfig {}

impl IntersectionConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tests_per_tester == 0 {
            return Err(ConfigError::Invalid("max_tests_per_tester must be at least 1".into()));
        }
        if !(self.player_bounds_margin.is_finite() && self.player_bounds_margin >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "player_bounds_margin must be a non-negative number, got {}",
                self.player_bounds_margin
            )));
        }
        if !(self.scale_epsilon.is_finite() && self.scale_epsilon > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scale_epsilon must be positive, got {}",
                self.scale_epsilon
            )));
        }
        if !(self.on_segment_tolerance.is_finite() && self.on_segment_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "on_segment_tolerance must be a non-negative number, got {}",
                self.on_segment_tolerance
            )));
        }
        if self.max_pending_events == 0 {
            return Err(ConfigError::Invalid("max_pending_events must be at least 1".into()));
        }
        if !(self.default_ray_distance.is_finite() && self.default_ray_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_ray_distance must be positive, got {}",
                self.default_ray_distance
            )));
        }
        self.octree.validate()
    }
}
