//! Tester descriptor
//!
//! A tester is an interaction probe (a pointer tip, a hand volume) with its
//! own small collision shape. The engine probes candidates with rays cast
//! from anchor points on that shape, and falls back to testing the shape's
//! edges. Both the local-space probe rays and the shape's vertex/index data
//! are built lazily on first use and cached for the tester's lifetime.

use std::cell::OnceCell;
use std::sync::Arc;

use crate::foundation::math::{Transform, Vec3};
use crate::intersection::IntersectionError;
use crate::physics::collision::Ray;
use crate::scene::{Mesh, AABB};

/// Where the probe rays come from
#[derive(Debug, Clone)]
enum ProbeAnchors {
    /// One ray per unique shape vertex, pointing away from the centroid
    ShapeVertices,
    /// Rays given in world space while the tester sat at `frame`
    World { rays: Vec<Ray>, frame: Transform },
}

/// The tester's own geometry, read once from its shape
#[derive(Debug)]
struct TesterGeometry {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    /// Unique undirected edges as vertex index pairs
    edges: Vec<[u32; 2]>,
}

impl TesterGeometry {
    fn read(shape: &Mesh) -> Self {
        let vertices = shape.vertices().to_vec();
        let indices = shape.indices().to_vec();

        let mut edges: Vec<[u32; 2]> = indices
            .chunks_exact(3)
            .flat_map(|tri| [[tri[0], tri[1]], [tri[1], tri[2]], [tri[2], tri[0]]])
            .filter(|[a, b]| a != b && (*a as usize) < vertices.len() && (*b as usize) < vertices.len())
            .map(|[a, b]| if a < b { [a, b] } else { [b, a] })
            .collect();
        edges.sort_unstable();
        edges.dedup();

        Self { vertices, indices, edges }
    }
}

/// A registered interaction probe
#[derive(Debug)]
pub struct Tester {
    transform: Transform,
    moved: bool,
    /// Logical activity of the tester itself
    pub active: bool,
    /// Activity inherited from the owning hierarchy
    pub hierarchy_active: bool,
    shape: Arc<Mesh>,
    anchors: ProbeAnchors,
    probe_rays: OnceCell<Vec<Ray>>,
    geometry: OnceCell<TesterGeometry>,
}

impl Tester {
    /// Create a tester probing from every vertex of `shape`
    pub fn new(transform: Transform, shape: Arc<Mesh>) -> Result<Self, IntersectionError> {
        Self::build(transform, shape, ProbeAnchors::ShapeVertices)
    }

    /// Create a tester with explicit probe rays given in world space
    ///
    /// The rays are expressed relative to `transform` and follow the tester
    /// from then on.
    pub fn with_world_anchors(
        transform: Transform,
        shape: Arc<Mesh>,
        rays: Vec<Ray>,
    ) -> Result<Self, IntersectionError> {
        Self::build(transform, shape, ProbeAnchors::World { rays, frame: transform })
    }

    fn build(transform: Transform, shape: Arc<Mesh>, anchors: ProbeAnchors) -> Result<Self, IntersectionError> {
        if shape.is_empty() {
            return Err(IntersectionError::InvalidTesterMesh("shape has no geometry".into()));
        }
        if !shape.is_collidable() {
            return Err(IntersectionError::InvalidTesterMesh(format!(
                "shape must be a readable triangle mesh (topology {:?}, readable: {})",
                shape.topology(),
                shape.is_readable()
            )));
        }

        Ok(Self {
            transform,
            moved: true,
            active: true,
            hierarchy_active: true,
            shape,
            anchors,
            probe_rays: OnceCell::new(),
            geometry: OnceCell::new(),
        })
    }

    /// World transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Move the tester; only a real change marks it as moved
    pub fn set_transform(&mut self, transform: Transform) {
        if self.transform != transform {
            self.transform = transform;
            self.moved = true;
        }
    }

    /// Whether the tester moved since the engine last processed it
    pub fn has_moved(&self) -> bool {
        self.moved
    }

    /// Force re-evaluation on the next tick
    pub fn mark_moved(&mut self) {
        self.moved = true;
    }

    pub(crate) fn clear_moved(&mut self) {
        self.moved = false;
    }

    /// Logical activity combined with hierarchy activity
    pub fn is_active(&self) -> bool {
        self.active && self.hierarchy_active
    }

    /// The tester's own collision shape
    pub fn shape(&self) -> &Arc<Mesh> {
        &self.shape
    }

    /// World position, reported as contact when the tester is fully inside
    /// an object
    pub fn world_position(&self) -> Vec3 {
        self.transform.position
    }

    /// World bounds of the tester's shape
    pub fn world_bounds(&self) -> AABB {
        match self.shape.bounds() {
            Some(local) => local.transformed(&self.transform),
            None => AABB::new(self.transform.position, self.transform.position),
        }
    }

    fn geometry(&self) -> &TesterGeometry {
        self.geometry.get_or_init(|| TesterGeometry::read(&self.shape))
    }

    /// Cached vertex positions of the shape
    pub fn vertices(&self) -> &[Vec3] {
        &self.geometry().vertices
    }

    /// Cached triangle indices of the shape
    pub fn indices(&self) -> &[u32] {
        &self.geometry().indices
    }

    /// Unique local-space edges of the shape
    pub fn edges(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let geometry = self.geometry();
        geometry
            .edges
            .iter()
            .map(move |&[a, b]| (geometry.vertices[a as usize], geometry.vertices[b as usize]))
    }

    /// Probe rays in the tester's local frame
    pub fn local_probe_rays(&self) -> &[Ray] {
        self.probe_rays.get_or_init(|| match &self.anchors {
            ProbeAnchors::ShapeVertices => self.vertex_probe_rays(),
            ProbeAnchors::World { rays, frame } => rays
                .iter()
                .map(|ray| {
                    Ray::new(
                        frame.inverse_transform_point(&ray.origin),
                        frame.inverse_transform_vector(&ray.direction),
                    )
                })
                .collect(),
        })
    }

    fn vertex_probe_rays(&self) -> Vec<Ray> {
        let mut unique: Vec<Vec3> = Vec::new();
        for vertex in self.vertices() {
            if !unique.contains(vertex) {
                unique.push(*vertex);
            }
        }

        let centroid = unique.iter().sum::<Vec3>() / unique.len().max(1) as f32;
        unique
            .into_iter()
            .map(|vertex| {
                let outward = (vertex - centroid)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vec3::y);
                Ray::new(vertex, outward)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshTopology;
    use approx::assert_relative_eq;

    fn probe_shape() -> Arc<Mesh> {
        Arc::new(Mesh::cube(Vec3::repeat(0.1)))
    }

    #[test]
    fn test_new_tester_starts_moved_and_active() {
        let tester = Tester::new(Transform::identity(), probe_shape()).unwrap();
        assert!(tester.has_moved());
        assert!(tester.is_active());
    }

    #[test]
    fn test_hierarchy_inactive_makes_tester_inactive() {
        let mut tester = Tester::new(Transform::identity(), probe_shape()).unwrap();
        tester.hierarchy_active = false;
        assert!(!tester.is_active());
    }

    #[test]
    fn test_only_real_moves_mark_moved() {
        let mut tester = Tester::new(Transform::identity(), probe_shape()).unwrap();
        tester.clear_moved();
        tester.set_transform(Transform::identity());
        assert!(!tester.has_moved());
        tester.set_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        assert!(tester.has_moved());
    }

    #[test]
    fn test_vertex_probe_rays_point_outward() {
        let tester = Tester::new(Transform::identity(), probe_shape()).unwrap();
        let rays = tester.local_probe_rays();
        assert_eq!(rays.len(), 8);
        for ray in rays {
            assert_relative_eq!(ray.direction, ray.origin.normalize(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_world_anchors_become_local() {
        let transform = Transform::from_position(Vec3::new(5.0, 0.0, 0.0)).with_scale(Vec3::repeat(2.0));
        let anchor = Ray::new(Vec3::new(5.0, 0.2, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let tester = Tester::with_world_anchors(transform, probe_shape(), vec![anchor]).unwrap();

        let local = tester.local_probe_rays()[0];
        assert_relative_eq!(local.origin, Vec3::new(0.0, 0.1, 0.0), epsilon = 1e-6);
        assert_relative_eq!(local.direction, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_cube_edges_are_unique() {
        let tester = Tester::new(Transform::identity(), probe_shape()).unwrap();
        // 12 box edges plus one diagonal per face
        assert_eq!(tester.edges().count(), 18);
    }

    #[test]
    fn test_rejects_unusable_shapes() {
        let empty = Arc::new(Mesh::default());
        assert!(matches!(
            Tester::new(Transform::identity(), empty),
            Err(IntersectionError::InvalidTesterMesh(_))
        ));

        let lines = Arc::new(Mesh::new(vec![Vec3::zeros(), Vec3::x()], vec![0, 1]).with_topology(MeshTopology::Lines));
        assert!(Tester::new(Transform::identity(), lines).is_err());
    }
}
