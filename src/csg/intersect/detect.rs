//! The five primitive intersection passes.
//!
//! Each pass runs over every candidate face pair before the next one starts, so later passes
//! see what earlier ones recorded: a vertex already welded to a vertex is never tested against
//! that vertex's edges, an edge crossing that sits on a recorded vertex is never duplicated,
//! and so on.

use super::{Candidates, Intersections};
use crate::csg::geometry::{
    RayRay, RingPosition, box_contains, boxes_overlap, point_on_segment, ray_ray_intersection,
    segment_box, segment_plane_crossing,
};
use crate::csg::ids::{EdgeRef, IObj, VertexId};
use crate::csg::operand::Operand;
use crate::csg::vertex_pool::VertexPool;
use crate::errors::CsgError;
use crate::float_types::Real;
use std::fmt::Debug;
use tracing::debug;

struct Detector<'p, 'o, 'm, S: Clone + Send + Sync + Debug> {
    a: &'o Operand<'m, S>,
    b: &'o Operand<'m, S>,
    pool: &'p mut VertexPool,
    epsilon: Real,
    found: Intersections,
}

/// Run all passes over the candidate face pairs, allocating new vertices in `pool`.
///
/// Coplanar pairs only take part in the vertex-vertex and vertex-edge passes.
pub fn detect<S: Clone + Send + Sync + Debug>(
    a: &Operand<S>,
    b: &Operand<S>,
    candidates: &Candidates,
    pool: &mut VertexPool,
    epsilon: Real,
) -> Result<Intersections, CsgError> {
    let mut detector = Detector {
        a,
        b,
        pool,
        epsilon,
        found: Intersections::default(),
    };

    let start = detector.pool.len();
    let pairs = candidates.pairs.as_slice();
    detector.vertex_vertex(pairs);
    // coplanar pairs still weld coincident vertices and vertices lying on the other's edges
    detector.vertex_vertex(&candidates.coplanar);
    detector.vertex_edge(pairs);
    detector.vertex_edge(&candidates.coplanar);
    detector.edge_edge(pairs)?;
    detector.vertex_face(pairs);
    detector.edge_face(pairs);
    debug!(
        "intersection passes over {} face pairs created {} vertices",
        candidates.len(),
        detector.pool.len() - start
    );

    Ok(detector.found)
}

impl<S: Clone + Send + Sync + Debug> Detector<'_, '_, '_, S> {
    fn vertex_vertex(&mut self, pairs: &[(usize, usize)]) {
        let eps2 = self.epsilon * self.epsilon;
        for &(fa, fb) in pairs {
            for va in self.a.face_vertices(fa) {
                for vb in self.b.face_vertices(fb) {
                    let (oa, ob) = (IObj::Vertex(va), IObj::Vertex(vb));
                    if self.found.intersects(&oa, &ob) {
                        continue;
                    }
                    let d2 = (self.pool.position(va) - self.pool.position(vb)).norm_squared();
                    if d2 < eps2 {
                        self.found.record(oa, ob, va);
                    }
                }
            }
        }
        debug!("vertex-vertex pass done");
    }

    fn vertex_edge(&mut self, pairs: &[(usize, usize)]) {
        let (a, b) = (self.a, self.b);
        for &(fa, fb) in pairs {
            for va in a.face_vertices(fa) {
                self.vertex_against_edges(va, b, fb);
            }
            for vb in b.face_vertices(fb) {
                self.vertex_against_edges(vb, a, fa);
            }
        }
        debug!("vertex-edge pass done");
    }

    fn vertex_against_edges(&mut self, v: VertexId, edges_of: &Operand<S>, face: usize) {
        let p = *self.pool.position(v);
        let ov = IObj::Vertex(v);
        for (edge, s, t) in edges_of.face_edges(face) {
            let oe = IObj::Edge(edge);
            if self.found.intersects(&ov, &oe)
                || self.found.intersects(&ov, &IObj::Vertex(s))
                || self.found.intersects(&ov, &IObj::Vertex(t))
            {
                continue;
            }
            let (ps, pt) = (self.pool.position(s), self.pool.position(t));
            if !box_contains(&segment_box(ps, pt), &p, self.epsilon) {
                continue;
            }
            if point_on_segment(&p, ps, pt, self.epsilon) {
                self.found.record(ov, oe, v);
                if let Some(rev) = edges_of.reverse(edge) {
                    self.found.record(ov, IObj::Edge(rev), v);
                }
            }
        }
    }

    /// True when an endpoint of either edge already touches the other edge or its endpoints.
    fn endpoints_related(&self, ea: (EdgeRef, VertexId, VertexId), eb: (EdgeRef, VertexId, VertexId)) -> bool {
        let (edge_a, a1, a2) = ea;
        let (edge_b, b1, b2) = eb;
        let edge_b = IObj::Edge(edge_b);
        let edge_a = IObj::Edge(edge_a);
        [a1, a2].iter().any(|&va| {
            let ov = IObj::Vertex(va);
            self.found.intersects(&ov, &edge_b)
                || self.found.intersects(&ov, &IObj::Vertex(b1))
                || self.found.intersects(&ov, &IObj::Vertex(b2))
        }) || [b1, b2]
            .iter()
            .any(|&vb| self.found.intersects(&IObj::Vertex(vb), &edge_a))
    }

    fn edge_edge(&mut self, pairs: &[(usize, usize)]) -> Result<(), CsgError> {
        let (a, b) = (self.a, self.b);
        let mut created = 0usize;
        for &(fa, fb) in pairs {
            for ea in a.face_edges(fa) {
                for eb in b.face_edges(fb) {
                    let (oa, ob) = (IObj::Edge(ea.0), IObj::Edge(eb.0));
                    if self.found.intersects(&oa, &ob) || self.endpoints_related(ea, eb) {
                        continue;
                    }
                    let (a1, a2) = (*self.pool.position(ea.1), *self.pool.position(ea.2));
                    let (b1, b2) = (*self.pool.position(eb.1), *self.pool.position(eb.2));
                    if !boxes_overlap(&segment_box(&a1, &a2), &segment_box(&b1, &b2), self.epsilon) {
                        continue;
                    }
                    match ray_ray_intersection(&a1, &a2, &b1, &b2, self.epsilon) {
                        RayRay::Intersecting { mu_a, mu_b, point } => {
                            if !(0.0..=1.0).contains(&mu_a) || !(0.0..=1.0).contains(&mu_b) {
                                continue;
                            }
                            let v = self.pool.alloc(point);
                            created += 1;
                            let rev_a = a.reverse(ea.0).map(IObj::Edge);
                            let rev_b = b.reverse(eb.0).map(IObj::Edge);
                            for x in std::iter::once(oa).chain(rev_a) {
                                for y in std::iter::once(ob).chain(rev_b) {
                                    self.found.record(x, y, v);
                                }
                            }
                        },
                        RayRay::Degenerate => {
                            let (start, end) = if (a2 - a1).norm_squared() <= (b2 - b1).norm_squared() {
                                (a1, a2)
                            } else {
                                (b1, b2)
                            };
                            return Err(CsgError::DegenerateEdge { start, end });
                        },
                        RayRay::Parallel | RayRay::None => {},
                    }
                }
            }
        }
        debug!("edge-edge pass created {} vertices", created);
        Ok(())
    }

    fn vertex_face(&mut self, pairs: &[(usize, usize)]) {
        let (a, b) = (self.a, self.b);
        for &(fa, fb) in pairs {
            for va in a.face_vertices(fa) {
                self.vertex_against_face(va, b, fb);
            }
            for vb in b.face_vertices(fb) {
                self.vertex_against_face(vb, a, fa);
            }
        }
        debug!("vertex-face pass done");
    }

    /// Whether `obj` already touches a vertex or an edge of `face`.
    fn touches_face_boundary(&self, obj: &IObj, owner: &Operand<S>, face: usize) -> bool {
        owner.face_edges(face).any(|(edge, s, _)| {
            self.found.intersects(obj, &IObj::Edge(edge)) || self.found.intersects(obj, &IObj::Vertex(s))
        })
    }

    fn vertex_against_face(&mut self, v: VertexId, owner: &Operand<S>, face: usize) {
        let (ov, of) = (IObj::Vertex(v), IObj::Face(owner.face_ref(face)));
        if self.found.intersects(&ov, &of) || self.touches_face_boundary(&ov, owner, face) {
            return;
        }
        let p = self.pool.position(v);
        if owner.locate(face, p, self.epsilon) == RingPosition::Inside {
            self.found.record(ov, of, v);
        }
    }

    fn edge_face(&mut self, pairs: &[(usize, usize)]) {
        let (a, b) = (self.a, self.b);
        let mut created = 0usize;
        for &(fa, fb) in pairs {
            for (edge, s, t) in a.face_edges(fa) {
                created += usize::from(self.edge_against_face(a, edge, s, t, b, fb));
            }
            for (edge, s, t) in b.face_edges(fb) {
                created += usize::from(self.edge_against_face(b, edge, s, t, a, fa));
            }
        }
        debug!("edge-face pass created {} vertices", created);
    }

    fn edge_against_face(
        &mut self,
        edge_owner: &Operand<S>,
        edge: EdgeRef,
        s: VertexId,
        t: VertexId,
        face_owner: &Operand<S>,
        face: usize,
    ) -> bool {
        let (oe, of) = (IObj::Edge(edge), IObj::Face(face_owner.face_ref(face)));
        if self.found.intersects(&oe, &of)
            || self.found.intersects(&IObj::Vertex(s), &of)
            || self.found.intersects(&IObj::Vertex(t), &of)
            || self.touches_face_boundary(&oe, face_owner, face)
        {
            return false;
        }
        let plane = face_owner.face(face).plane;
        let Some(p) = segment_plane_crossing(
            self.pool.position(s),
            self.pool.position(t),
            &plane,
            self.epsilon,
        ) else {
            return false;
        };
        if face_owner.locate(face, &p, self.epsilon) != RingPosition::Inside {
            return false;
        }

        let v = self.pool.alloc(p);
        self.found.record(oe, of, v);
        if let Some(rev) = edge_owner.reverse(edge) {
            self.found.record(IObj::Edge(rev), of, v);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsgConfig;
    use crate::csg::ids::Side;
    use crate::csg::intersect::candidate_pairs;
    use crate::mesh::Mesh;
    use crate::traits::CsgOps;

    fn run(a: &Mesh<()>, b: &Mesh<()>) -> (Intersections, VertexPool) {
        let config = CsgConfig::default();
        let mut pool = VertexPool::new();
        pool.reset(&a.vertices, &b.vertices);
        let oa = Operand::new(Side::A, a, 0, &config);
        let ob = Operand::new(Side::B, b, a.vertices.len() as u32, &config);
        let candidates = candidate_pairs(&oa, &ob, config.epsilon);
        let found = detect(&oa, &ob, &candidates, &mut pool, config.epsilon).unwrap();
        (found, pool)
    }

    #[test]
    fn identical_cubes_only_weld_vertices() {
        let cube = Mesh::<()>::cube(1.0, None);
        let (found, pool) = run(&cube, &cube.clone());
        assert_eq!(pool.intersection_count(), 0);
        let by_vertex = found.by_vertex();
        assert_eq!(by_vertex.len(), 8);
        for pairs in by_vertex.values() {
            assert!(pairs
                .iter()
                .all(|(x, y)| matches!((x, y), (IObj::Vertex(_), IObj::Vertex(_)))));
        }
    }

    #[test]
    fn skewed_cube_edges_cross_faces() {
        let a = Mesh::<()>::cube(2.0, None);
        let b = Mesh::<()>::cube(1.0, None)
            .rotate(0.0, 0.0, 30.0)
            .translate(1.7, 0.9, 0.5);
        let (found, pool) = run(&a, &b);
        assert!(pool.intersection_count() > 0);
        // every new vertex lies on a face plane of `a`
        for (v, _) in found.by_vertex() {
            if v.index() >= a.vertices.len() + b.vertices.len() {
                let p = pool.position(v);
                assert!(a
                    .faces
                    .iter()
                    .any(|f| f.plane.signed_distance(p).abs() < 1e-9));
            }
        }
    }
}
