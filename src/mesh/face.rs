use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::mesh::plane::Plane;
use nalgebra::Point3;

/// An indexed polygonal face referencing its mesh's vertex array.
#[derive(Debug, Clone, PartialEq)]
pub struct Face<S: Clone> {
    /// Vertex indices in counter-clockwise order around `plane.normal`
    pub indices: Vec<usize>,

    /// Plane fitted to the face loop
    pub plane: Plane,

    /// Generic metadata associated with the face
    pub metadata: Option<S>,
}

impl<S: Clone> Face<S> {
    /// Build a face and fit its plane from the mesh vertices.
    pub fn new(indices: Vec<usize>, vertices: &[Point3<Real>], metadata: Option<S>) -> Self {
        let plane = Plane::from_loop(indices.iter().map(|&i| &vertices[i]));
        Face {
            indices,
            plane,
            metadata,
        }
    }

    /// Number of vertices (and edges) of the face.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The `i`-th directed edge as `(start, end)` vertex indices.
    #[inline]
    pub fn edge(&self, i: usize) -> (usize, usize) {
        (self.indices[i], self.indices[(i + 1) % self.indices.len()])
    }

    /// Reverse the winding and the plane.
    pub fn flip(&mut self) {
        self.indices.reverse();
        self.plane = self.plane.flipped();
    }

    /// Axis-aligned bounds of the face.
    pub fn bounding_box(&self, vertices: &[Point3<Real>]) -> Aabb {
        let mut aabb = Aabb::new_invalid();
        for &i in &self.indices {
            aabb.take_point(vertices[i]);
        }
        aabb
    }

    /// Vertex-average of the face loop.
    pub fn centroid(&self, vertices: &[Point3<Real>]) -> Point3<Real> {
        let sum = self
            .indices
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, &i| acc + vertices[i].coords);
        Point3::from(sum / self.indices.len().max(1) as Real)
    }
}
