//! Primitive solids used as boolean operands.

use crate::float_types::Real;
use crate::mesh::{Face, Mesh};
use nalgebra::Point3;
use std::fmt::Debug;

impl<S: Clone + Debug + Send + Sync> Mesh<S> {
    /// Create a right prism (a box) that spans from (0, 0, 0)
    /// to (width, length, height). All dimensions must be >= 0.
    ///
    /// The eight corners are shared between the six quad faces, so the result is
    /// closed and ready for boolean operations.
    pub fn cuboid(width: Real, length: Real, height: Real, metadata: Option<S>) -> Mesh<S> {
        // Define the eight corner vertices once
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),         // 0: origin
            Point3::new(width, 0.0, 0.0),       // 1: +X
            Point3::new(width, length, 0.0),    // 2: +X+Y
            Point3::new(0.0, length, 0.0),      // 3: +Y
            Point3::new(0.0, 0.0, height),      // 4: +Z
            Point3::new(width, 0.0, height),    // 5: +X+Z
            Point3::new(width, length, height), // 6: +X+Y+Z
            Point3::new(0.0, length, height),   // 7: +Y+Z
        ];

        // Faces with counter-clockwise winding seen from outside
        let face_definitions: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // Bottom face
            [4, 5, 6, 7], // Top face
            [0, 1, 5, 4], // Front face
            [3, 7, 6, 2], // Back face
            [0, 4, 7, 3], // Left face
            [1, 2, 6, 5], // Right face
        ];

        let faces = face_definitions
            .iter()
            .map(|indices| Face::new(indices.to_vec(), &vertices, metadata.clone()))
            .collect();

        Mesh::from_faces(vertices, faces, metadata)
    }

    /// A cube spanning (0, 0, 0) to (width, width, width).
    pub fn cube(width: Real, metadata: Option<S>) -> Mesh<S> {
        Self::cuboid(width, width, width, metadata)
    }

    /// A tetrahedron with one corner at the origin and the other three on the positive axes.
    pub fn tetrahedron(size: Real, metadata: Option<S>) -> Mesh<S> {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(0.0, size, 0.0),
            Point3::new(0.0, 0.0, size),
        ];
        let face_definitions: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        let faces = face_definitions
            .iter()
            .map(|indices| Face::new(indices.to_vec(), &vertices, metadata.clone()))
            .collect();
        Mesh::from_faces(vertices, faces, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn cuboid_normals_point_out() {
        let cuboid = Mesh::<()>::cuboid(1.0, 2.0, 3.0, None);
        let center = Point3::new(0.5, 1.0, 1.5);
        for face in &cuboid.faces {
            let c = face.centroid(&cuboid.vertices);
            assert!(face.plane.normal.dot(&(c - center)) > 0.0);
        }
        assert!(cuboid.is_closed());
    }

    #[test]
    fn tetrahedron_is_closed() {
        let tet = Mesh::<()>::tetrahedron(1.0, None);
        assert!(tet.is_closed());
        assert!(tet.is_manifold());
        let slanted = &tet.faces[3];
        let expected = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert_relative_eq!(slanted.plane.normal, expected, epsilon = 1e-12);
    }
}
