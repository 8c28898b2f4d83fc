//! Octree spatial partitioning structure
//!
//! Efficiently divides 3D space into hierarchical regions for fast
//! spatial queries. Each node subdivides into 8 octants when entry
//! density exceeds a threshold.
//!
//! Entries are bounding boxes, not points. An entry is stored in the deepest
//! node whose bounds contain it completely, so a box straddling an octant
//! boundary stays in the parent. The root accepts anything, including boxes
//! that leave the configured world bounds.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::collections::ObjectId;
use crate::foundation::math::Vec3;
use crate::scene::AABB;

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum entries per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,

    /// Region covered by the root node
    pub world_bounds: AABB,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
            world_bounds: AABB::new(Vec3::repeat(-1000.0), Vec3::repeat(1000.0)),
        }
    }
}

impl OctreeConfig {
    /// Reject layouts the tree cannot be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities_per_node == 0 {
            return Err(ConfigError::Invalid("octree.max_entities_per_node must be at least 1".into()));
        }
        if !(self.min_node_size.is_finite() && self.min_node_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "octree.min_node_size must be positive, got {}",
                self.min_node_size
            )));
        }
        let size = self.world_bounds.size();
        if !size.iter().all(|extent| extent.is_finite() && *extent > 0.0) {
            return Err(ConfigError::Invalid("octree.world_bounds must have positive size".into()));
        }
        Ok(())
    }
}

/// Object stored in octree with its world bounds
#[derive(Debug, Clone, Copy)]
pub struct OctreeEntry {
    /// Object handle
    pub id: ObjectId,
    /// World bounds at insertion time
    pub bounds: AABB,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Entries stored at this level
    pub entries: Vec<OctreeEntry>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn is_empty_leaf(&self) -> bool {
        self.is_leaf() && self.entries.is_empty()
    }

    /// Index of the first child completely containing `bounds`
    fn child_containing(&self, bounds: &AABB) -> Option<usize> {
        let children = self.children.as_ref()?;
        children.iter().position(|child| child.bounds.contains_aabb(bounds))
    }

    /// Subdivide this node into 8 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;

        // Octant layout: bit 0 = +X, bit 1 = +Y, bit 2 = +Z
        self.children = Some(Box::new(std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = Vec3::new(
                center.x + quarter_extents.x * sign(1),
                center.y + quarter_extents.y * sign(2),
                center.z + quarter_extents.z * sign(4),
            );
            OctreeNode::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        })));

        // Push entries that now fit a child one level down
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match self.child_containing(&entry.bounds) {
                Some(octant) => {
                    if let Some(children) = self.children.as_mut() {
                        children[octant].entries.push(entry);
                    }
                }
                None => self.entries.push(entry),
            }
        }
    }

    /// Insert an entry into this node or one of its descendants
    pub fn insert(&mut self, entry: OctreeEntry, config: &OctreeConfig) {
        if self.is_leaf() {
            let should_subdivide = self.entries.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().min() > config.min_node_size;

            if !should_subdivide {
                self.entries.push(entry);
                return;
            }
            self.subdivide();
        }

        match self.child_containing(&entry.bounds) {
            Some(octant) => {
                if let Some(children) = self.children.as_mut() {
                    children[octant].insert(entry, config);
                }
            }
            None => self.entries.push(entry),
        }
    }

    /// Remove an entry, following the insertion path of `bounds` first
    pub fn remove(&mut self, id: ObjectId, bounds: &AABB) -> bool {
        if let Some(index) = self.entries.iter().position(|entry| entry.id == id) {
            self.entries.swap_remove(index);
            return true;
        }

        let octant = self.child_containing(bounds);
        let Some(children) = self.children.as_mut() else {
            return false;
        };
        if let Some(octant) = octant {
            if children[octant].remove(id, bounds) {
                return true;
            }
        }
        children.iter_mut().any(|child| child.remove_anywhere(id))
    }

    fn remove_anywhere(&mut self, id: ObjectId) -> bool {
        if let Some(index) = self.entries.iter().position(|entry| entry.id == id) {
            self.entries.swap_remove(index);
            return true;
        }
        self.children
            .as_mut()
            .is_some_and(|children| children.iter_mut().any(|child| child.remove_anywhere(id)))
    }

    /// Collect entries whose bounds overlap `query`
    pub fn query_bounds(&self, query: &AABB, results: &mut Vec<ObjectId>) {
        // The root may hold out-of-bounds entries, so it is never pruned
        if self.depth > 0 && !self.bounds.intersects(query) {
            return;
        }

        results.extend(
            self.entries
                .iter()
                .filter(|entry| entry.bounds.intersects(query))
                .map(|entry| entry.id),
        );

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_bounds(query, results);
            }
        }
    }

    /// Collect entries whose bounds touch a sphere
    pub fn query_sphere(&self, center: Vec3, radius: f32, results: &mut Vec<ObjectId>) {
        if self.depth > 0 && !self.bounds.intersects_sphere(center, radius) {
            return;
        }

        results.extend(
            self.entries
                .iter()
                .filter(|entry| entry.bounds.intersects_sphere(center, radius))
                .map(|entry| entry.id),
        );

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_sphere(center, radius, results);
            }
        }
    }

    /// Collect entries whose bounds the ray enters within `max_distance`
    pub fn query_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32, results: &mut Vec<ObjectId>) {
        let within = |bounds: &AABB| {
            bounds
                .intersect_ray(origin, direction)
                .is_some_and(|t| t <= max_distance)
        };

        if self.depth > 0 && !within(&self.bounds) {
            return;
        }

        results.extend(
            self.entries
                .iter()
                .filter(|entry| within(&entry.bounds))
                .map(|entry| entry.id),
        );

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_ray(origin, direction, max_distance, results);
            }
        }
    }

    /// Collapse empty subtrees; returns true when this node ends up empty
    pub fn trim(&mut self) -> bool {
        if let Some(children) = self.children.as_mut() {
            let mut all_empty = true;
            for child in children.iter_mut() {
                all_empty &= child.trim();
            }
            if all_empty {
                self.children = None;
            }
        }
        self.is_empty_leaf()
    }

    /// Count nodes in this subtree, including this one
    pub fn count_nodes(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(OctreeNode::count_nodes).sum())
    }

    /// Count total entries in this node and all children
    pub fn count_entries(&self) -> usize {
        let mut count = self.entries.len();

        if let Some(ref children) = self.children {
            for child in children.iter() {
                count += child.count_entries();
            }
        }

        count
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the entire world space
    pub root: OctreeNode,

    /// Configuration
    config: OctreeConfig,
}

impl Octree {
    /// Create a new octree covering `config.world_bounds`
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(config.world_bounds, 0),
            config,
        }
    }

    /// Layout this tree was built with
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Insert an object with its world bounds
    pub fn insert(&mut self, id: ObjectId, bounds: AABB) {
        self.root.insert(OctreeEntry { id, bounds }, &self.config);
    }

    /// Remove an object previously inserted with `bounds`
    pub fn remove(&mut self, id: ObjectId, bounds: &AABB) -> bool {
        self.root.remove(id, bounds)
    }

    /// Objects whose bounds overlap `query`
    pub fn query_bounds(&self, query: &AABB, results: &mut Vec<ObjectId>) {
        self.root.query_bounds(query, results);
    }

    /// Objects whose bounds touch the sphere
    pub fn query_sphere(&self, center: Vec3, radius: f32, results: &mut Vec<ObjectId>) {
        self.root.query_sphere(center, radius, results);
    }

    /// Objects whose bounds the ray enters within `max_distance`
    pub fn query_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32, results: &mut Vec<ObjectId>) {
        self.root.query_ray(origin, direction, max_distance, results);
    }

    /// Drop empty subdivisions
    pub fn trim(&mut self) {
        self.root.trim();
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Get total entry count
    pub fn entry_count(&self) -> usize {
        self.root.count_entries()
    }

    /// Clear the octree
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
    }
}
