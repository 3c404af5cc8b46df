//! Rebuilds every original face as one or more loops over pool vertices, cut along the
//! intersection curve.

use crate::csg::geometry::{RingPosition, locate_in_ring, ring_polygon, signed_area};
use crate::csg::hooks::Hooks;
use crate::csg::ids::{FaceRef, VertexId};
use crate::csg::operand::Operand;
use crate::csg::subdivide::Registry;
use crate::csg::vertex_pool::VertexPool;
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::mesh::Mesh;
use crate::mesh::plane::{Plane, Projection};
use geo::{Coord, Polygon as GeoPolygon};
use hashbrown::HashMap;
use nalgebra::Point3;
use std::fmt::Debug;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

mod holes;
mod split;

/// Slot of a loop in its [`FaceLoopList`].
pub type LoopId = usize;

/// One rebuilt polygon of an original face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLoop {
    /// The input face this loop was cut from
    pub orig: FaceRef,
    /// Counter-clockwise around the original face normal
    pub vertices: Vec<VertexId>,
    /// Index of the owning group, once grouped
    pub group: Option<usize>,
}

impl FaceLoop {
    /// Directed edges of the loop.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

#[derive(Debug, Clone)]
struct Node {
    face_loop: FaceLoop,
    prev: Option<LoopId>,
    next: Option<LoopId>,
    linked: bool,
}

/// Arena-backed doubly linked list of face loops.
///
/// Loops keep their [`LoopId`] for the whole operation; unlinking only removes a loop from
/// the iteration order, so grouping can drain the list while groups still refer to members.
#[derive(Debug, Clone, Default)]
pub struct FaceLoopList {
    nodes: Vec<Node>,
    head: Option<LoopId>,
    tail: Option<LoopId>,
    len: usize,
}

impl FaceLoopList {
    pub const fn new() -> Self {
        FaceLoopList {
            nodes: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn push_back(&mut self, face_loop: FaceLoop) -> LoopId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            face_loop,
            prev: self.tail,
            next: None,
            linked: true,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Unlink a loop; false if it was not linked.
    pub fn remove(&mut self, id: LoopId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if !node.linked {
            return false;
        }
        node.linked = false;
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
        true
    }

    pub fn pop_front(&mut self) -> Option<LoopId> {
        let head = self.head?;
        self.remove(head);
        Some(head)
    }

    #[inline]
    pub fn contains(&self, id: LoopId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.linked)
    }

    #[inline]
    pub fn get(&self, id: LoopId) -> &FaceLoop {
        &self.nodes[id].face_loop
    }

    #[inline]
    pub fn get_mut(&mut self, id: LoopId) -> &mut FaceLoop {
        &mut self.nodes[id].face_loop
    }

    /// Linked loops.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every loop ever pushed, linked or not.
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    /// Linked loops in list order.
    pub fn iter(&self) -> impl Iterator<Item = (LoopId, &FaceLoop)> + '_ {
        std::iter::successors(self.head, move |&id| self.nodes[id].next)
            .map(move |id| (id, &self.nodes[id].face_loop))
    }

    /// Every loop in arena order, linked or not.
    pub fn all(&self) -> impl Iterator<Item = (LoopId, &FaceLoop)> + '_ {
        self.nodes.iter().enumerate().map(|(id, n)| (id, &n.face_loop))
    }

    /// Sum of loop lengths, a capacity hint for edge maps.
    pub fn vertex_count(&self) -> usize {
        self.nodes.iter().map(|n| n.face_loop.vertices.len()).sum()
    }
}

/// 2D view of pool vertices in one face's projection.
pub(crate) struct LoopFrame<'p> {
    pool: &'p VertexPool,
    projection: Projection,
    pub epsilon: Real,
}

impl<'p> LoopFrame<'p> {
    pub fn new(pool: &'p VertexPool, projection: Projection, epsilon: Real) -> Self {
        LoopFrame {
            pool,
            projection,
            epsilon,
        }
    }

    #[inline]
    pub fn at(&self, v: VertexId) -> Coord<Real> {
        self.projection.project(self.pool.position(v))
    }

    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<Real> {
        self.pool.position(v)
    }

    pub fn ring(&self, vertices: &[VertexId]) -> Vec<Coord<Real>> {
        vertices.iter().map(|&v| self.at(v)).collect()
    }

    pub fn area(&self, vertices: &[VertexId]) -> Real {
        signed_area(&self.ring(vertices))
    }

    pub fn polygon(&self, vertices: &[VertexId]) -> GeoPolygon<Real> {
        ring_polygon(self.ring(vertices))
    }

    pub fn locate(&self, vertices: &[VertexId], p: Coord<Real>) -> RingPosition {
        locate_in_ring(&self.polygon(vertices), p, self.epsilon)
    }

    /// A point well inside the loop: the centroid of its largest ear-clipped triangle,
    /// lifted onto `plane`.
    pub fn interior_point(&self, vertices: &[VertexId], plane: &Plane) -> Option<Point3<Real>> {
        let ring = self.ring(vertices);
        let best = Mesh::<()>::triangulate_2d(&ring)
            .into_iter()
            .map(|[i, j, k]| {
                let tri = [ring[i], ring[j], ring[k]];
                (signed_area(&tri).abs(), tri)
            })
            .max_by(|x, y| x.0.total_cmp(&y.0))?;
        if best.0 <= 0.0 {
            return None;
        }
        let [p, q, r] = best.1;
        let centroid = Coord {
            x: (p.x + q.x + r.x) / 3.0,
            y: (p.y + q.y + r.y) / 3.0,
        };
        Some(self.projection.unproject(centroid, plane))
    }
}

/// The original face's boundary with every edge subdivision inserted.
#[derive(Debug, Clone, Default)]
pub(crate) struct BaseLoop {
    pub vertices: Vec<VertexId>,
    /// Original edge indices each loop vertex lies on
    pub on_edges: HashMap<VertexId, Vec<u32>>,
}

fn base_loop<S: Clone + Send + Sync + Debug>(
    operand: &Operand<S>,
    face: usize,
    registry: &Registry,
    pool: &VertexPool,
    hooks: &mut Hooks<'_, S>,
) -> BaseLoop {
    let n = operand.face(face).len();
    let mut base = BaseLoop::default();
    let push = |base: &mut BaseLoop, v: VertexId, edges: &[u32]| {
        if base.vertices.last() != Some(&v) {
            base.vertices.push(v);
        }
        let slot = base.on_edges.entry(v).or_default();
        for &e in edges {
            if !slot.contains(&e) {
                slot.push(e);
            }
        }
    };

    for (e, (edge, s, t)) in operand.face_edges(face).enumerate() {
        let (ms, mt) = (registry.map(s), registry.map(t));
        let prev = ((e + n - 1) % n) as u32;
        push(&mut base, ms, &[prev, e as u32]);
        let divisions = registry.divisions(s, t);
        for &d in &divisions {
            push(&mut base, d, &[e as u32]);
        }

        if hooks.wants_edge_divisions() && !divisions.is_empty() {
            let chain: Vec<VertexId> = std::iter::once(ms)
                .chain(divisions.iter().copied())
                .chain(std::iter::once(mt))
                .collect();
            for (index, pair) in chain.windows(2).enumerate() {
                hooks.edge_division(edge, index, pool.position(pair[0]), pool.position(pair[1]));
            }
        }
    }

    while base.vertices.len() > 1 && base.vertices.first() == base.vertices.last() {
        base.vertices.pop();
    }
    base
}

/// Rebuild every face of `operand` as face loops.
pub fn build_face_loops<S: Clone + Send + Sync + Debug>(
    operand: &Operand<S>,
    registry: &Registry,
    pool: &VertexPool,
    epsilon: Real,
    hooks: &mut Hooks<'_, S>,
) -> Result<FaceLoopList, CsgError> {
    // Hooks are not thread safe, so base loops are built serially first.
    let bases: Vec<BaseLoop> = (0..operand.face_count())
        .map(|f| base_loop(operand, f, registry, pool, hooks))
        .collect();

    let side = operand.side;
    let work = |(f, base): (usize, BaseLoop)| -> Result<Vec<Vec<VertexId>>, CsgError> {
        let frame = LoopFrame::new(pool, operand.geoms[f].projection, epsilon);
        split::decompose(f, base, registry.split_edges(side, f), &frame)
    };

    #[cfg(not(feature = "parallel"))]
    let per_face: Vec<Vec<Vec<VertexId>>> = bases
        .into_iter()
        .enumerate()
        .map(work)
        .collect::<Result<_, _>>()?;
    #[cfg(feature = "parallel")]
    let per_face: Vec<Vec<Vec<VertexId>>> = bases
        .into_par_iter()
        .enumerate()
        .map(work)
        .collect::<Result<_, _>>()?;

    let mut list = FaceLoopList::new();
    let mut split_faces = 0usize;
    for (f, loops) in per_face.into_iter().enumerate() {
        if loops.len() > 1 {
            split_faces += 1;
        }
        for vertices in loops.into_iter().filter(|l| l.len() >= 3) {
            list.push_back(FaceLoop {
                orig: operand.face_ref(f),
                vertices,
                group: None,
            });
        }
    }
    debug!(
        "{:?}: {} face loops from {} faces ({} split)",
        side,
        list.len(),
        operand.face_count(),
        split_faces
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::ids::Side;

    fn face_loop(ids: &[u32]) -> FaceLoop {
        FaceLoop {
            orig: FaceRef::new(Side::A, 0),
            vertices: ids.iter().map(|&i| VertexId(i)).collect(),
            group: None,
        }
    }

    #[test]
    fn list_unlinks_in_constant_time() {
        let mut list = FaceLoopList::new();
        let a = list.push_back(face_loop(&[0, 1, 2]));
        let b = list.push_back(face_loop(&[1, 2, 3]));
        let c = list.push_back(face_loop(&[2, 3, 4]));
        assert_eq!(list.len(), 3);

        assert!(list.remove(b));
        assert!(!list.remove(b));
        assert_eq!(list.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![a, c]);

        assert_eq!(list.pop_front(), Some(a));
        assert_eq!(list.pop_front(), Some(c));
        assert_eq!(list.pop_front(), None);
        assert!(list.is_empty());
        // slots survive unlinking
        assert_eq!(list.slots(), 3);
        assert_eq!(list.get(b).vertices[0], VertexId(1));
        assert_eq!(list.vertex_count(), 9);
    }

    #[test]
    fn loop_edges_wrap() {
        let l = face_loop(&[4, 5, 6]);
        let edges: Vec<_> = l.edges().collect();
        assert_eq!(edges.last(), Some(&(VertexId(6), VertexId(4))));
    }
}
