//! Scene objects as seen by the intersection engine

use std::sync::Arc;

use crate::foundation::math::{Transform, Vec3};
use crate::scene::{Mesh, AABB};

/// Where an object's collision geometry comes from
#[derive(Debug, Clone)]
pub enum ShapeSource {
    /// A shared model-space mesh
    Static(Arc<Mesh>),
    /// A deformable mesh whose current pose must be baked before testing
    Skinned {
        /// Rest-pose mesh providing the index list
        bind: Arc<Mesh>,
        /// Current model-space vertex positions, one per bind vertex
        pose: Vec<Vec3>,
    },
}

/// A renderable, intersectable scene object
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Display name, used in log output
    pub name: String,
    transform: Transform,
    shape: ShapeSource,
    /// Inactive objects are never intersection candidates
    pub active: bool,
    /// Locked objects never report intersections to testers
    pub locked: bool,
    revision: u64,
}

impl SceneObject {
    /// Create an active, unlocked object
    pub fn new(name: impl Into<String>, transform: Transform, shape: ShapeSource) -> Self {
        Self {
            name: name.into(),
            transform,
            shape,
            active: true,
            locked: false,
            revision: 0,
        }
    }

    /// Shortcut for an object with a static mesh
    pub fn with_mesh(name: impl Into<String>, transform: Transform, mesh: Arc<Mesh>) -> Self {
        Self::new(name, transform, ShapeSource::Static(mesh))
    }

    /// World transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Move the object; bumps the revision when anything changed
    pub fn set_transform(&mut self, transform: Transform) {
        if self.transform != transform {
            self.transform = transform;
            self.revision += 1;
        }
    }

    /// Replace the skinned pose; ignored for static shapes
    pub fn set_pose(&mut self, pose: Vec<Vec3>) {
        if let ShapeSource::Skinned { pose: current, .. } = &mut self.shape {
            *current = pose;
            self.revision += 1;
        }
    }

    /// Geometry source
    pub fn shape(&self) -> &ShapeSource {
        &self.shape
    }

    /// Counter that changes whenever the world bounds may have changed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Static mesh, or the bind mesh of a skinned shape
    pub fn mesh(&self) -> &Arc<Mesh> {
        match &self.shape {
            ShapeSource::Static(mesh) | ShapeSource::Skinned { bind: mesh, .. } => mesh,
        }
    }

    /// True for deformable shapes
    pub fn is_skinned(&self) -> bool {
        matches!(self.shape, ShapeSource::Skinned { .. })
    }

    /// Model-space bounds of the current shape
    pub fn local_bounds(&self) -> Option<AABB> {
        match &self.shape {
            ShapeSource::Static(mesh) => mesh.bounds(),
            ShapeSource::Skinned { pose, .. } => AABB::from_points(pose),
        }
    }

    /// World-space bounds; a point box at the position for empty shapes
    pub fn world_bounds(&self) -> AABB {
        match self.local_bounds() {
            Some(local) => local.transformed(&self.transform),
            None => AABB::new(self.transform.position, self.transform.position),
        }
    }
}
