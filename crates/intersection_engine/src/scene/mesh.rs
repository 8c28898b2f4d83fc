//! Shape meshes for scene objects and testers
//!
//! A [`Mesh`] is pure geometry in model space: positions plus an index list.
//! Only readable, triangulated meshes can take part in narrow-phase tests;
//! everything else is still allowed in a scene (for example line gizmos) but
//! is ignored by the collision oracle.

use crate::foundation::math::Vec3;
use crate::physics::collision::Triangle;
use crate::scene::AABB;

/// How the index list of a [`Mesh`] is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshTopology {
    /// Every three indices form a triangle
    #[default]
    Triangles,
    /// Every two indices form a line segment
    Lines,
    /// Every index is a point
    Points,
}

/// Model-space mesh geometry
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    topology: MeshTopology,
    readable: bool,
    bounds: Option<AABB>,
}

impl Mesh {
    /// Create a readable triangle mesh
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = AABB::from_points(&vertices);
        Self {
            vertices,
            indices,
            topology: MeshTopology::Triangles,
            readable: true,
            bounds,
        }
    }

    /// Builder: reinterpret the index list
    pub fn with_topology(mut self, topology: MeshTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Builder: mark the vertex data as not readable from the CPU
    pub fn non_readable(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Replace the geometry in place, keeping the allocations
    pub fn set_geometry(&mut self, vertices: &[Vec3], indices: &[u32]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        self.indices.clear();
        self.indices.extend_from_slice(indices);
        self.topology = MeshTopology::Triangles;
        self.readable = true;
        self.bounds = AABB::from_points(&self.vertices);
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Index list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Index interpretation
    pub fn topology(&self) -> MeshTopology {
        self.topology
    }

    /// Whether the vertex data may be read back
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Local bounds, `None` when the mesh has no vertices
    pub fn bounds(&self) -> Option<AABB> {
        self.bounds
    }

    /// No vertices or no indices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Triangle topology with a whole number of triangles
    pub fn is_triangulated(&self) -> bool {
        self.topology == MeshTopology::Triangles && self.indices.len() % 3 == 0
    }

    /// Usable by the narrow phase
    pub fn is_collidable(&self) -> bool {
        self.readable && self.is_triangulated() && !self.is_empty()
    }

    /// Triangles of a triangle mesh; index triples pointing past the vertex
    /// list are skipped
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        let vertices = &self.vertices;
        let indices: &[u32] = if self.topology == MeshTopology::Triangles {
            &self.indices
        } else {
            &[]
        };
        indices.chunks_exact(3).filter_map(move |chunk| {
            let v0 = *vertices.get(chunk[0] as usize)?;
            let v1 = *vertices.get(chunk[1] as usize)?;
            let v2 = *vertices.get(chunk[2] as usize)?;
            Some(Triangle::new(v0, v1, v2))
        })
    }

    /// Axis-aligned box centered on the origin with outward-facing triangles
    pub fn cube(half_extents: Vec3) -> Self {
        // Corner i has x from bit 0, y from bit 1 and z from bit 2
        let vertices = (0..8u32)
            .map(|i| {
                let sign = |bit: u32| if i & bit != 0 { 1.0 } else { -1.0 };
                Vec3::new(
                    half_extents.x * sign(1),
                    half_extents.y * sign(2),
                    half_extents.z * sign(4),
                )
            })
            .collect();

        let indices = vec![
            1, 3, 7, 1, 7, 5, // +X
            0, 4, 6, 0, 6, 2, // -X
            2, 6, 7, 2, 7, 3, // +Y
            0, 1, 5, 0, 5, 4, // -Y
            4, 5, 7, 4, 7, 6, // +Z
            0, 2, 3, 0, 3, 1, // -Z
        ];

        Self::new(vertices, indices)
    }

    /// Square in the XZ plane at y = 0 facing +Y
    pub fn quad(half_size: f32) -> Self {
        let s = half_size;
        let vertices = vec![
            Vec3::new(-s, 0.0, -s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(s, 0.0, s),
            Vec3::new(-s, 0.0, s),
        ];
        Self::new(vertices, vec![0, 3, 2, 0, 2, 1])
    }
}
