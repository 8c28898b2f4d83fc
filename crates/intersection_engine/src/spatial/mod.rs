//! Spatial partitioning data structures
//!
//! Provides efficient spatial indexing for candidate culling, ray casting
//! and proximity queries in 3D space.

mod octree;
mod spatial_index;

pub use octree::{Octree, OctreeConfig, OctreeEntry, OctreeNode};
pub use spatial_index::{OctreeIndex, SpatialIndex};
