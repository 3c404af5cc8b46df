//! Point-in-mesh classification against one operand.

use super::PointClass;
use crate::csg::geometry::RingPosition;
use crate::csg::operand::Operand;
use crate::float_types::Real;
use crate::float_types::parry3d::query::Ray;
use nalgebra::{Point3, Vector3};
use std::fmt::Debug;

/// Ray directions tried in order. None of them is parallel to an axis or a diagonal.
const RAY_DIRECTIONS: [[Real; 3]; 6] = [
    [0.8507, 0.3811, 0.3621],
    [-0.3141, 0.8902, 0.3303],
    [0.2791, -0.4017, 0.8722],
    [-0.6124, -0.5512, -0.5665],
    [0.4472, 0.1234, -0.8859],
    [-0.0911, -0.9567, 0.2764],
];

/// Below this `|normal . direction|` a ray counts as parallel to a face.
const PARALLEL: Real = 1e-9;

/// Result of locating a point against a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointHit {
    pub class: PointClass,
    /// The face the point lies on, for the on-surface classes
    pub face: Option<usize>,
}

/// Locate `p` against `operand`: on its surface first, then by ray parity.
pub fn classify_point<S: Clone + Send + Sync + Debug>(
    operand: &Operand<S>,
    p: &Point3<Real>,
    epsilon: Real,
) -> PointHit {
    if let Some(hit) = on_surface(operand, p, epsilon) {
        return hit;
    }
    for [x, y, z] in RAY_DIRECTIONS {
        let dir = Vector3::new(x, y, z).normalize();
        if let Some(crossings) = crossings(operand, p, &dir, epsilon) {
            let class = if crossings % 2 == 1 {
                PointClass::In
            } else {
                PointClass::Out
            };
            return PointHit { class, face: None };
        }
    }
    PointHit {
        class: PointClass::Unk,
        face: None,
    }
}

fn on_surface<S: Clone + Send + Sync + Debug>(
    operand: &Operand<S>,
    p: &Point3<Real>,
    epsilon: Real,
) -> Option<PointHit> {
    for f in operand.tree.query_point(p, epsilon) {
        let class = match operand.locate(f, p, epsilon) {
            RingPosition::Outside => continue,
            RingPosition::Inside => PointClass::On,
            RingPosition::Boundary => {
                let at_vertex = operand
                    .mesh
                    .face_points(operand.face(f))
                    .any(|q| (q - p).norm() <= epsilon);
                if at_vertex {
                    PointClass::Vertex
                } else {
                    PointClass::Edge
                }
            },
        };
        return Some(PointHit {
            class,
            face: Some(f),
        });
    }
    None
}

/// Faces crossed by the ray from `p` along `dir`, or `None` when the ray grazes an edge or
/// slides along a face.
fn crossings<S: Clone + Send + Sync + Debug>(
    operand: &Operand<S>,
    p: &Point3<Real>,
    dir: &Vector3<Real>,
    epsilon: Real,
) -> Option<usize> {
    let ray = Ray::new(*p, *dir);
    let mut count = 0;
    for f in operand.tree.query_ray(&ray, epsilon) {
        let plane = &operand.face(f).plane;
        let along = plane.normal.dot(dir);
        let distance = plane.signed_distance(p);
        if along.abs() < PARALLEL {
            if distance.abs() <= epsilon {
                return None;
            }
            continue;
        }
        let t = -distance / along;
        if t <= 0.0 {
            continue;
        }
        match operand.locate(f, &(p + dir * t), epsilon) {
            RingPosition::Inside => count += 1,
            RingPosition::Boundary => return None,
            RingPosition::Outside => {},
        }
    }
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsgConfig;
    use crate::csg::ids::Side;
    use crate::mesh::Mesh;

    #[test]
    fn inside_outside_and_surface() {
        let cube = Mesh::<()>::cube(2.0, None);
        let operand = Operand::new(Side::B, &cube, 0, &CsgConfig::default());
        let eps = 1e-9;

        let inside = classify_point(&operand, &Point3::new(0.5, 1.5, 1.0), eps);
        assert_eq!(inside.class, PointClass::In);
        let outside = classify_point(&operand, &Point3::new(3.0, 1.0, 1.0), eps);
        assert_eq!(outside.class, PointClass::Out);
        // coplanar with a face but beside it
        let beside = classify_point(&operand, &Point3::new(3.0, 1.0, 2.0), eps);
        assert_eq!(beside.class, PointClass::Out);

        let on = classify_point(&operand, &Point3::new(1.0, 1.0, 2.0), eps);
        assert_eq!(on.class, PointClass::On);
        let top = on.face.unwrap();
        assert!(cube.faces[top].plane.normal.z > 0.5);

        let edge = classify_point(&operand, &Point3::new(1.0, 0.0, 2.0), eps);
        assert_eq!(edge.class, PointClass::Edge);
        let corner = classify_point(&operand, &Point3::new(2.0, 2.0, 2.0), eps);
        assert_eq!(corner.class, PointClass::Vertex);
    }

    #[test]
    fn ray_above_an_open_square_escapes() {
        let square = Mesh::<()>::polyhedron(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[&[0, 1, 2, 3]],
            None,
        )
        .unwrap();
        let operand = Operand::new(Side::A, &square, 0, &CsgConfig::default());
        let above = classify_point(&operand, &Point3::new(0.5, 0.5, 1.0), 1e-9);
        assert_eq!(above.class, PointClass::Out);
    }
}
