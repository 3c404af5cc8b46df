//! Turns per-vertex intersection records into edge subdivisions and in-face split edges.

use crate::csg::geometry::RingPosition;
use crate::csg::ids::{EdgeKey, IObj, Side, VertexId};
use crate::csg::intersect::VertexIntersections;
use crate::csg::operand::Operand;
use crate::csg::vertex_pool::VertexPool;
use crate::float_types::Real;
use hashbrown::HashMap;
use nalgebra::Vector3;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::debug;

/// Everything the face-loop builder needs to know about where the operands meet.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    vertex_intersections: VertexIntersections,
    /// Operand vertices welded onto another vertex (vertex-vertex hits).
    vmap: HashMap<VertexId, VertexId>,
    /// Ordered interior vertices of each intersected edge, from `key.0` towards `key.1`.
    divided_edges: HashMap<EdgeKey, Vec<VertexId>>,
    /// Per side, per face: segments of the intersection curve lying in that face.
    split_edges: [Vec<Vec<EdgeKey>>; 2],
}

impl Registry {
    pub fn build<S: Clone + Send + Sync + Debug>(
        vertex_intersections: VertexIntersections,
        a: &Operand<S>,
        b: &Operand<S>,
        pool: &VertexPool,
        epsilon: Real,
    ) -> Self {
        let mut registry = Registry {
            vertex_intersections,
            vmap: HashMap::new(),
            divided_edges: HashMap::new(),
            split_edges: [vec![Vec::new(); a.face_count()], vec![Vec::new(); b.face_count()]],
        };
        registry.build_vertex_map();
        registry.divide_edges(a, b, pool);
        registry.build_split_edges(a, b, pool, epsilon);

        debug!(
            "{} intersection vertices, {} divided edges, {} welded vertices",
            registry.vertex_intersections.len(),
            registry.divided_edges.len(),
            registry.vmap.len()
        );
        registry
    }

    fn build_vertex_map(&mut self) {
        for (&v, pairs) in &self.vertex_intersections {
            for &(x, y) in pairs {
                for obj in [x, y] {
                    if let IObj::Vertex(u) = obj {
                        if u != v {
                            self.vmap.entry(u).or_insert(v);
                        }
                    }
                }
            }
        }
    }

    /// The representative of `v` after welding.
    pub fn map(&self, v: VertexId) -> VertexId {
        let mut current = v;
        // chains are at most a few links long; the bound guards against cycles
        for _ in 0..8 {
            match self.vmap.get(&current) {
                Some(&next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    fn divide_edges<S: Clone + Send + Sync + Debug>(
        &mut self,
        a: &Operand<S>,
        b: &Operand<S>,
        pool: &VertexPool,
    ) {
        // Sum of the normals of faces crossing the edge at each vertex, for tie-breaking.
        let mut face_normals: HashMap<(EdgeKey, VertexId), Vector3<Real>> = HashMap::new();
        let mut members: HashMap<EdgeKey, BTreeSet<VertexId>> = HashMap::new();

        for (&v, pairs) in &self.vertex_intersections {
            let mv = self.map(v);
            for &(x, y) in pairs {
                for (obj, partner) in [(x, y), (y, x)] {
                    let IObj::Edge(edge) = obj else {
                        continue;
                    };
                    let owner = if edge.face.side == Side::A { a } else { b };
                    let (s, t) = owner.edge_vertices(edge);
                    if mv == self.map(s) || mv == self.map(t) {
                        continue;
                    }
                    let key = EdgeKey::new(s, t);
                    members.entry(key).or_default().insert(mv);
                    let normal = face_normals.entry((key, mv)).or_insert_with(Vector3::zeros);
                    if let IObj::Face(face) = partner {
                        let face_owner = if face.side == Side::A { a } else { b };
                        *normal += face_owner.face(face.index()).plane.normal;
                    }
                }
            }
        }

        for (key, vertices) in members {
            let origin = *pool.position(key.0);
            let direction = pool.position(key.1) - origin;
            let mut ordered: Vec<(Real, Real, VertexId)> = vertices
                .into_iter()
                .map(|v| {
                    let along = (pool.position(v) - origin).dot(&direction);
                    let tie = face_normals
                        .get(&(key, v))
                        .map_or(0.0, |n| -direction.dot(n));
                    (along, tie, v)
                })
                .collect();
            ordered.sort_by(|x, y| {
                x.0.total_cmp(&y.0)
                    .then_with(|| x.1.total_cmp(&y.1))
                    .then_with(|| x.2.cmp(&y.2))
            });
            self.divided_edges
                .insert(key, ordered.into_iter().map(|(_, _, v)| v).collect());
        }
    }

    fn faces_of<S: Clone + Send + Sync + Debug>(
        obj: IObj,
        a: &Operand<S>,
        b: &Operand<S>,
        out: &mut [BTreeSet<usize>; 2],
    ) {
        match obj {
            IObj::Vertex(u) => {
                for op in [a, b] {
                    if op.local(u).is_some() {
                        out[op.side.index()].extend(op.faces_around(u).iter().copied());
                    }
                }
            },
            IObj::Edge(edge) => {
                let owner = if edge.face.side == Side::A { a } else { b };
                let slot = &mut out[owner.side.index()];
                slot.insert(edge.face.index());
                if let Some(rev) = owner.reverse(edge) {
                    slot.insert(rev.face.index());
                }
            },
            IObj::Face(face) => {
                out[face.side.index()].insert(face.index());
            },
        }
    }

    fn build_split_edges<S: Clone + Send + Sync + Debug>(
        &mut self,
        a: &Operand<S>,
        b: &Operand<S>,
        pool: &VertexPool,
        epsilon: Real,
    ) {
        let mut common: BTreeMap<(usize, usize), BTreeSet<VertexId>> = BTreeMap::new();
        for (&v, pairs) in &self.vertex_intersections {
            let mut faces = [BTreeSet::new(), BTreeSet::new()];
            for &(x, y) in pairs {
                Self::faces_of(x, a, b, &mut faces);
                Self::faces_of(y, a, b, &mut faces);
            }
            let mv = self.map(v);
            for &fa in &faces[0] {
                for &fb in &faces[1] {
                    common.entry((fa, fb)).or_default().insert(mv);
                }
            }
        }

        let mut added = 0usize;
        for ((fa, fb), vertices) in common {
            if vertices.len() < 2 {
                continue;
            }
            let line = a.face(fa).plane.normal.cross(&b.face(fb).plane.normal);
            if line.norm() <= epsilon {
                continue;
            }
            let mut ordered: Vec<(Real, VertexId)> = vertices
                .into_iter()
                .map(|v| (pool.position(v).coords.dot(&line), v))
                .collect();
            ordered.sort_by(|x, y| x.0.total_cmp(&y.0).then_with(|| x.1.cmp(&y.1)));

            for window in ordered.windows(2) {
                let (v1, v2) = (window[0].1, window[1].1);
                let mid = nalgebra::center(pool.position(v1), pool.position(v2));
                if a.locate(fa, &mid, epsilon) == RingPosition::Outside
                    || b.locate(fb, &mid, epsilon) == RingPosition::Outside
                {
                    continue;
                }
                let key = EdgeKey::new(v1, v2);
                for (op, face) in [(a, fa), (b, fb)] {
                    if self.on_face_boundary(op, face, v1, v2) {
                        continue;
                    }
                    let list = &mut self.split_edges[op.side.index()][face];
                    if !list.contains(&key) {
                        list.push(key);
                        added += 1;
                    }
                }
            }
        }
        debug!("{} face split edges", added);
    }

    /// Whether welded vertices `v1` and `v2` both lie on one original edge of face `f`.
    fn on_face_boundary<S: Clone + Send + Sync + Debug>(
        &self,
        op: &Operand<S>,
        f: usize,
        v1: VertexId,
        v2: VertexId,
    ) -> bool {
        op.face_edges(f).any(|(_, s, t)| {
            let inner = self.divisions(s, t);
            let (s, t) = (self.map(s), self.map(t));
            let touches = |v: VertexId| v == s || v == t || inner.contains(&v);
            touches(v1) && touches(v2)
        })
    }

    pub fn vertex_intersections(&self) -> &VertexIntersections {
        &self.vertex_intersections
    }

    /// Interior vertices of the original edge `s -> t`, in walking order.
    pub fn divisions(&self, s: VertexId, t: VertexId) -> Vec<VertexId> {
        let key = EdgeKey::new(s, t);
        let Some(list) = self.divided_edges.get(&key) else {
            return Vec::new();
        };
        if key.is_forward(s) {
            list.clone()
        } else {
            list.iter().rev().copied().collect()
        }
    }

    /// Intersection-curve segments lying in a face (both endpoints already welded).
    pub fn split_edges(&self, side: Side, face: usize) -> &[EdgeKey] {
        self.split_edges[side.index()]
            .get(face)
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `v` (after welding) lies on the intersection curve.
    pub fn is_intersection_vertex(&self, v: VertexId) -> bool {
        self.vertex_intersections.contains_key(&self.map(v))
    }
}
