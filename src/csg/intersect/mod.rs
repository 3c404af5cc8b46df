//! Primitive intersection records and candidate face-pair search.

use crate::csg::ids::{IObj, VertexId};
use crate::csg::operand::Operand;
use crate::float_types::Real;
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::debug;

mod detect;

pub use detect::detect;

/// For every primitive, the primitives it touches and the vertex where they touch.
///
/// Entries are recorded in both directions.
#[derive(Debug, Clone, Default)]
pub struct Intersections {
    map: HashMap<IObj, HashMap<IObj, VertexId>>,
}

impl Intersections {
    pub fn record(&mut self, a: IObj, b: IObj, v: VertexId) {
        self.map.entry(a).or_default().insert(b, v);
        self.map.entry(b).or_default().insert(a, v);
    }

    #[inline]
    pub fn intersects(&self, a: &IObj, b: &IObj) -> bool {
        self.map.get(a).is_some_and(|m| m.contains_key(b))
    }

    /// Whether `a` intersects anything at all.
    #[inline]
    pub fn touches_any(&self, a: &IObj) -> bool {
        self.map.get(a).is_some_and(|m| !m.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Regroup by resulting vertex.
    pub fn by_vertex(&self) -> VertexIntersections {
        let mut out: VertexIntersections = BTreeMap::new();
        for (a, others) in &self.map {
            for (b, &v) in others {
                let pair = if a <= b { (*a, *b) } else { (*b, *a) };
                out.entry(v).or_default().insert(pair);
            }
        }
        out
    }
}

/// Every intersection vertex with the primitive pairs that produced it.
pub type VertexIntersections = BTreeMap<VertexId, BTreeSet<(IObj, IObj)>>;

/// Face pairs `(face of a, face of b)` whose boxes overlap within epsilon, split by
/// whether the two faces share a plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    /// Each face reaches the other's plane from both sides or touches it
    pub pairs: Vec<(usize, usize)>,
    /// Faces lying in one plane; only vertex contacts are searched for here
    pub coplanar: Vec<(usize, usize)>,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.pairs.len() + self.coplanar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.coplanar.is_empty()
    }
}

/// Collect candidate face pairs through the two R-trees, both lists sorted.
pub fn candidate_pairs<S: Clone + Send + Sync + Debug>(
    a: &Operand<S>,
    b: &Operand<S>,
    epsilon: Real,
) -> Candidates {
    let mut candidates = Candidates::default();
    a.tree.overlapping_pairs(&b.tree, epsilon, |fa, fb| {
        let face_a = a.face(fa);
        let face_b = b.face(fb);
        let (lo_b, hi_b) = distance_range(b.mesh.face_points(face_b), |p| {
            face_a.plane.signed_distance(p)
        });
        if lo_b > epsilon || hi_b < -epsilon {
            return;
        }
        let (lo_a, hi_a) = distance_range(a.mesh.face_points(face_a), |p| {
            face_b.plane.signed_distance(p)
        });
        if lo_a > epsilon || hi_a < -epsilon {
            return;
        }
        let coplanar = lo_b >= -epsilon && hi_b <= epsilon && lo_a >= -epsilon && hi_a <= epsilon;
        if coplanar {
            candidates.coplanar.push((fa, fb));
        } else {
            candidates.pairs.push((fa, fb));
        }
    });
    candidates.pairs.sort_unstable();
    candidates.coplanar.sort_unstable();
    debug!(
        "{} candidate face pairs, {} coplanar",
        candidates.pairs.len(),
        candidates.coplanar.len()
    );
    candidates
}

fn distance_range<'a>(
    points: impl Iterator<Item = &'a nalgebra::Point3<Real>>,
    distance: impl Fn(&nalgebra::Point3<Real>) -> Real,
) -> (Real, Real) {
    points.fold((Real::MAX, Real::MIN), |(lo, hi), p| {
        let d = distance(p);
        (lo.min(d), hi.max(d))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsgConfig;
    use crate::csg::ids::{FaceRef, Side};
    use crate::mesh::Mesh;
    use crate::traits::CsgOps;

    #[test]
    fn records_are_symmetric() {
        let mut ix = Intersections::default();
        let v = IObj::Vertex(VertexId(1));
        let f = IObj::Face(FaceRef::new(Side::B, 4));
        ix.record(v, f, VertexId(1));
        assert!(ix.intersects(&f, &v));
        assert!(ix.touches_any(&v));

        let by_vertex = ix.by_vertex();
        assert_eq!(by_vertex.len(), 1);
        assert_eq!(by_vertex[&VertexId(1)].len(), 1);
        ix.clear();
        assert!(ix.is_empty());
    }

    #[test]
    fn candidates_skip_distant_faces_and_set_aside_coplanar_ones() {
        let config = CsgConfig::default();
        let a = Mesh::<()>::cube(1.0, None);
        let far = a.translate(5.0, 0.0, 0.0);
        let oa = Operand::new(Side::A, &a, 0, &config);
        let of = Operand::new(Side::B, &far, 8, &config);
        assert!(candidate_pairs(&oa, &of, config.epsilon).is_empty());

        // Touching cubes: the contact faces and the four side faces flush across x = 1
        // are coplanar and kept apart.
        let touching = a.translate(1.0, 0.0, 0.0);
        let ot = Operand::new(Side::B, &touching, 8, &config);
        let candidates = candidate_pairs(&oa, &ot, config.epsilon);
        assert_eq!(candidates.coplanar, vec![(0, 0), (1, 1), (2, 2), (3, 3), (5, 4)]);
        for &(ca, cb) in &candidates.coplanar {
            assert!(a.faces[ca].plane.is_coplanar_with(&touching.faces[cb].plane, 1e-9));
        }
        // each contact face against the four flush sides of the other cube, and each
        // flush side against the two perpendicular flush sides of the other cube
        assert_eq!(candidates.pairs.len(), 16);
        assert_eq!(candidates.len(), 21);
        for (fa, fb) in candidates.pairs {
            let na = a.faces[fa].plane;
            let nb = touching.faces[fb].plane;
            assert!(!na.is_coplanar_with(&nb, 1e-9));
        }
    }
}
