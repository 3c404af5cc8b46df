//! `Mesh` struct and implementations of the `CsgOps` trait for `Mesh`

use crate::config::BooleanOp;
use crate::csg::Csg;
use crate::errors::{CsgError, ValidationError};
use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use crate::traits::CsgOps;
use geo::{Coord, LineString, Polygon as GeoPolygon, TriangulateEarcut};
use nalgebra::{Matrix4, Point3};
use std::{fmt::Debug, sync::OnceLock};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub mod face;
pub mod manifold;
pub mod plane;
pub mod shapes;
pub mod topology;

pub use face::Face;
pub use plane::Plane;
pub use topology::Topology;

/// An indexed polygon mesh: shared vertex positions and faces referencing them.
#[derive(Clone, Debug)]
pub struct Mesh<S: Clone + Send + Sync + Debug> {
    /// Vertex positions shared between faces
    pub vertices: Vec<Point3<Real>>,

    /// Faces, each a counter-clockwise loop of indices into `vertices`
    pub faces: Vec<Face<S>>,

    /// Lazily calculated AABB that spans `vertices`.
    pub bounding_box: OnceLock<Aabb>,

    /// Metadata
    pub metadata: Option<S>,
}

impl<S: Clone + Send + Sync + Debug> Default for Mesh<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + Debug> Mesh<S> {
    /// An empty mesh.
    pub const fn new() -> Self {
        Mesh {
            vertices: Vec::new(),
            faces: Vec::new(),
            bounding_box: OnceLock::new(),
            metadata: None,
        }
    }

    /// Build a mesh from already validated parts.
    pub fn from_faces(
        vertices: Vec<Point3<Real>>,
        faces: Vec<Face<S>>,
        metadata: Option<S>,
    ) -> Self {
        Mesh {
            vertices,
            faces,
            bounding_box: OnceLock::new(),
            metadata,
        }
    }

    /// Build a mesh from raw points and index loops, validating indices and coordinates.
    ///
    /// Every face receives `metadata`.
    pub fn polyhedron(
        points: &[[Real; 3]],
        faces: &[&[usize]],
        metadata: Option<S>,
    ) -> Result<Mesh<S>, ValidationError> {
        let vertices: Vec<Point3<Real>> = points
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();

        if let Some(bad) = vertices
            .iter()
            .find(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(ValidationError::InvalidCoordinate(*bad));
        }

        let mut polygons = Vec::with_capacity(faces.len());
        for (face_index, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(ValidationError::TooFewPoints {
                    face: face_index,
                    count: face.len(),
                });
            }
            if let Some(&index) = face.iter().find(|&&i| i >= vertices.len()) {
                return Err(ValidationError::IndexOutOfRange {
                    face: face_index,
                    index,
                    vertex_count: vertices.len(),
                });
            }
            polygons.push(Face::new(face.to_vec(), &vertices, metadata.clone()));
        }

        Ok(Mesh::from_faces(vertices, polygons, metadata))
    }

    /// Positions of a face's loop, in order.
    pub fn face_points<'a>(&'a self, face: &'a Face<S>) -> impl Iterator<Item = &'a Point3<Real>> + Clone + 'a {
        face.indices.iter().map(move |&i| &self.vertices[i])
    }

    /// True when every directed edge has exactly one opposite twin.
    pub fn is_closed(&self) -> bool {
        Topology::build(self).is_closed()
    }

    /// Triangulate one counter-clockwise 2D ring (ear clipping), returning index triples
    /// into `ring`.
    pub fn triangulate_2d(ring: &[Coord<Real>]) -> Vec<[usize; 3]> {
        if ring.len() < 3 {
            return Vec::new();
        }
        let polygon = GeoPolygon::new(LineString::new(ring.to_vec()), Vec::new());
        let triangulation = polygon.earcut_triangles_raw();

        // earcut may index the repeated closing coordinate; fold it back onto the ring
        let to_ring = |k: usize| -> usize { k % ring.len() };
        triangulation
            .triangle_indices
            .chunks_exact(3)
            .map(|tri| [to_ring(tri[0]), to_ring(tri[1]), to_ring(tri[2])])
            .collect()
    }

    /// Triangulate every face, returning a mesh of triangles sharing this mesh's vertices.
    ///
    /// Faces are ear-clipped in their own plane's 2D projection, so non-convex faces and
    /// the bridged hole loops produced by boolean operations triangulate correctly.
    pub fn triangulate(&self) -> Mesh<S> {
        let triangulate_face = |face: &Face<S>| -> Vec<Face<S>> {
            let projection = face.plane.projection();
            let ring: Vec<Coord<Real>> = self
                .face_points(face)
                .map(|p| projection.project(p))
                .collect();
            Self::triangulate_2d(&ring)
                .into_iter()
                .map(|[a, b, c]| Face {
                    indices: vec![face.indices[a], face.indices[b], face.indices[c]],
                    plane: face.plane,
                    metadata: face.metadata.clone(),
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let faces: Vec<Face<S>> = self.faces.iter().flat_map(triangulate_face).collect();
        #[cfg(feature = "parallel")]
        let faces: Vec<Face<S>> = self
            .faces
            .par_iter()
            .flat_map_iter(triangulate_face)
            .collect();

        Mesh::from_faces(self.vertices.clone(), faces, self.metadata.clone())
    }

    fn boolean(&self, other: &Mesh<S>, op: BooleanOp) -> Result<Mesh<S>, CsgError> {
        Ok(Csg::default().compute(self, other, op)?.mesh)
    }
}

impl<S: Clone + Send + Sync + Debug> CsgOps for Mesh<S> {
    fn union(&self, other: &Self) -> Result<Self, CsgError> {
        self.boolean(other, BooleanOp::Union)
    }

    fn difference(&self, other: &Self) -> Result<Self, CsgError> {
        self.boolean(other, BooleanOp::AMinusB)
    }

    fn intersection(&self, other: &Self) -> Result<Self, CsgError> {
        self.boolean(other, BooleanOp::Intersection)
    }

    fn xor(&self, other: &Self) -> Result<Self, CsgError> {
        self.boolean(other, BooleanOp::SymmetricDifference)
    }

    /// Apply an arbitrary 3D transform (as a 4x4 matrix) to the mesh.
    /// Face planes are refitted; a mirroring transform is compensated by flipping faces so
    /// normals keep pointing outward.
    fn transform(&self, mat: &Matrix4<Real>) -> Mesh<S> {
        let mut mesh = self.clone();
        for vert in &mut mesh.vertices {
            let homog = mat * vert.to_homogeneous();
            if let Some(p) = Point3::from_homogeneous(homog) {
                *vert = p;
            }
        }

        let mirrored = mat.fixed_view::<3, 3>(0, 0).clone_owned().determinant() < 0.0;
        for face in &mut mesh.faces {
            if mirrored {
                face.indices.reverse();
            }
            face.plane = Plane::from_loop(face.indices.iter().map(|&i| &mesh.vertices[i]));
        }

        // invalidate the old cached bounding box
        mesh.bounding_box = OnceLock::new();
        mesh
    }

    /// Returns a [`parry3d::bounding_volume::Aabb`] indicating the 3D bounds of all vertices.
    fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            if self.vertices.is_empty() {
                return Aabb::new(Point3::origin(), Point3::origin());
            }
            let mut aabb = Aabb::new_invalid();
            for v in &self.vertices {
                aabb.take_point(*v);
            }
            aabb
        })
    }

    fn inverse(&self) -> Mesh<S> {
        let mut mesh = self.clone();
        for face in &mut mesh.faces {
            face.flip();
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polyhedron_rejects_bad_index() {
        let err = Mesh::<()>::polyhedron(&[[0.0, 0.0, 0.0]; 3], &[&[0, 1, 5]], None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::IndexOutOfRange { index: 5, .. }));
    }

    #[test]
    fn polyhedron_rejects_short_face() {
        let err = Mesh::<()>::polyhedron(&[[0.0, 0.0, 0.0]; 3], &[&[0, 1]], None).unwrap_err();
        assert!(matches!(err, ValidationError::TooFewPoints { count: 2, .. }));
    }

    #[test]
    fn polyhedron_rejects_nan() {
        let err = Mesh::<()>::polyhedron(
            &[[0.0, 0.0, 0.0], [1.0, Real::NAN, 0.0], [0.0, 1.0, 0.0]],
            &[&[0, 1, 2]],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCoordinate(_)));
    }

    #[test]
    fn triangulate_keeps_area() {
        let cube = Mesh::<()>::cube(2.0, None);
        let tris = cube.triangulate();
        assert_eq!(tris.faces.len(), 12);
        assert!(tris.faces.iter().all(|f| f.len() == 3));
        assert!(tris.is_manifold());
    }

    #[test]
    fn transforms() {
        let cube = Mesh::<()>::cube(1.0, None);
        let moved = cube.translate(1.0, 2.0, 3.0);
        let bb = moved.bounding_box();
        assert_relative_eq!(bb.mins, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(bb.maxs, Point3::new(2.0, 3.0, 4.0), epsilon = 1e-12);

        let scaled = cube.scale(2.0, 1.0, 1.0);
        assert_relative_eq!(scaled.bounding_box().maxs.x, 2.0, epsilon = 1e-12);

        let rotated = cube.rotate(0.0, 0.0, 90.0);
        assert_relative_eq!(rotated.bounding_box().mins.x, -1.0, epsilon = 1e-9);

        // mirroring keeps normals outward
        let mirrored = cube.scale(-1.0, 1.0, 1.0);
        let top = mirrored
            .faces
            .iter()
            .find(|f| mirrored.face_points(f).all(|p| (p.z - 1.0).abs() < 1e-9))
            .unwrap();
        assert!(top.plane.normal.z > 0.5);

        let inverted = cube.inverse();
        assert!(inverted.faces[0].plane.normal.dot(&cube.faces[0].plane.normal) < -0.99);
    }
}
