//! Test support library
//! Provides mesh measurements shared by the integration tests.
#![allow(dead_code)]

use polycsg::{
    float_types::Real,
    mesh::{Mesh, Topology},
};
use std::fmt::Debug;

/// Returns the bounding box `[min_x, min_y, min_z, max_x, max_y, max_z]` of the vertices
/// actually used by faces.
pub fn bounding_box<S: Clone + Send + Sync + Debug>(mesh: &Mesh<S>) -> [Real; 6] {
    let mut bb = [Real::MAX, Real::MAX, Real::MAX, Real::MIN, Real::MIN, Real::MIN];
    for face in &mesh.faces {
        for p in mesh.face_points(face) {
            for axis in 0..3 {
                bb[axis] = bb[axis].min(p[axis]);
                bb[axis + 3] = bb[axis + 3].max(p[axis]);
            }
        }
    }
    bb
}

/// Enclosed volume by the divergence theorem over the triangulated faces.
///
/// Only meaningful for closed, consistently wound meshes; inward-facing shells subtract.
pub fn volume<S: Clone + Send + Sync + Debug>(mesh: &Mesh<S>) -> Real {
    let triangles = mesh.triangulate();
    triangles
        .faces
        .iter()
        .map(|face| {
            let a = triangles.vertices[face.indices[0]].coords;
            let b = triangles.vertices[face.indices[1]].coords;
            let c = triangles.vertices[face.indices[2]].coords;
            a.dot(&b.cross(&c)) / 6.0
        })
        .sum()
}

/// Total area of every face.
pub fn surface_area<S: Clone + Send + Sync + Debug>(mesh: &Mesh<S>) -> Real {
    let triangles = mesh.triangulate();
    triangles
        .faces
        .iter()
        .map(|face| {
            let a = triangles.vertices[face.indices[0]];
            let b = triangles.vertices[face.indices[1]];
            let c = triangles.vertices[face.indices[2]];
            (b - a).cross(&(c - a)).norm() * 0.5
        })
        .sum()
}

/// Number of directed edges with no reverse partner; zero for a closed mesh.
pub fn open_edges<S: Clone + Send + Sync + Debug>(mesh: &Mesh<S>) -> usize {
    Topology::build(mesh).boundary_edge_count()
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// A single counter-clockwise square in the plane `z`, spanning `[min, max]` on X and Y.
pub fn square(min: Real, max: Real, z: Real) -> Mesh<()> {
    Mesh::polyhedron(
        &[[min, min, z], [max, min, z], [max, max, z], [min, max, z]],
        &[&[0, 1, 2, 3]],
        None,
    )
    .expect("square is valid")
}
