//! Sampling strategies: loop vertices, edge midpoints and single interior points.

use super::{Classifier, FaceClass, PointClass, classify_point};
use crate::csg::face_loops::LoopId;
use crate::csg::grouping::FaceLoopGroup;
use crate::csg::ids::{EdgeKey, Side, VertexId};
use crate::float_types::Real;
use nalgebra::{Point3, Vector3, center};
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::{debug, warn};

impl<S: Clone + Send + Sync + Debug> Classifier<'_, '_, S> {
    /// Vertex test, then the edge-midpoint test, on every unresolved group of `me`.
    pub(super) fn classify_by_sampling(&mut self, me: Side, groups: &mut [FaceLoopGroup]) {
        let (mut by_vertex, mut by_midpoint) = (0, 0);
        for group in groups.iter_mut().filter(|g| !g.is_resolved()) {
            if let Some(class) = self.by_vertices(me, group) {
                group.classify(Some(me.other()), class);
                by_vertex += 1;
            } else if let Some(class) = self.by_midpoints(me, group) {
                group.classify(Some(me.other()), class);
                by_midpoint += 1;
            }
        }
        debug!(
            "{:?}: {} groups classified by vertex, {} by edge midpoint",
            me, by_vertex, by_midpoint
        );
    }

    /// Last resort for groups made of one loop: classify a point inside it.
    pub(super) fn classify_single_loops(&mut self, me: Side, groups: &mut [FaceLoopGroup]) {
        for (gi, group) in groups.iter_mut().enumerate() {
            if group.is_resolved() {
                continue;
            }
            if group.loops.len() != 1 {
                warn!(
                    "{:?}: unresolved group {} has {} loops, expected one",
                    me,
                    gi,
                    group.loops.len()
                );
                continue;
            }
            if let Some(class) = self.by_interior_point(me, group.loops[0]) {
                debug!("{:?}: group {} classified {:?} by an interior point", me, gi, class);
                group.classify(Some(me.other()), class);
            }
        }
    }

    /// Class of one of `me`'s loop vertices against the other operand.
    pub(super) fn vertex_class(&mut self, me: Side, v: VertexId) -> PointClass {
        if let Some(&class) = self.vertex_classes[me.index()].get(&v) {
            return class;
        }
        let other = self.view(me.other()).operand;
        let class = classify_point(other, self.pool.position(v), self.epsilon).class;
        self.vertex_classes[me.index()].insert(v, class);
        class
    }

    /// The first vertex found strictly inside or outside decides the whole group.
    pub(super) fn by_vertices(&mut self, me: Side, group: &FaceLoopGroup) -> Option<FaceClass> {
        let loops = self.view(me).loops;
        for &id in &group.loops {
            for &v in &loops.get(id).vertices {
                match self.vertex_class(me, v) {
                    PointClass::In => return Some(FaceClass::In),
                    PointClass::Out => return Some(FaceClass::Out),
                    _ => {},
                }
            }
        }
        None
    }

    /// Vote with the midpoints of edges off the perimeter. Any inside vote wins.
    pub(super) fn by_midpoints(&self, me: Side, group: &FaceLoopGroup) -> Option<FaceClass> {
        let loops = self.view(me).loops;
        let other = self.view(me.other()).operand;
        let mut seen = BTreeSet::new();
        let (mut ins, mut outs) = (0usize, 0usize);
        for &id in &group.loops {
            for (u, w) in loops.get(id).edges() {
                if group.on_perimeter(u, w) || !seen.insert(EdgeKey::new(u, w)) {
                    continue;
                }
                let mid = center(self.pool.position(u), self.pool.position(w));
                match classify_point(other, &mid, self.epsilon).class {
                    PointClass::In => ins += 1,
                    PointClass::Out => outs += 1,
                    _ => {},
                }
            }
        }
        if ins > 0 {
            Some(FaceClass::In)
        } else if outs > 0 {
            Some(FaceClass::Out)
        } else {
            None
        }
    }

    /// Classify a point inside loop `id`. A point on the other surface is settled by where
    /// the loop lies relative to the plane it landed on.
    pub(super) fn by_interior_point(&self, me: Side, id: LoopId) -> Option<FaceClass> {
        let view = self.view(me);
        let other = self.view(me.other()).operand;
        let p = self.interior_point(me, id)?;
        let hit = classify_point(other, &p, self.epsilon);
        match hit.class {
            PointClass::In => Some(FaceClass::In),
            PointClass::Out => Some(FaceClass::Out),
            PointClass::Unk => None,
            PointClass::On | PointClass::Vertex | PointClass::Edge => {
                let hit_plane = &other.face(hit.face?).plane;
                let face_loop = view.loops.get(id);
                let n = face_loop.vertices.len() as Real;
                let sum = face_loop
                    .vertices
                    .iter()
                    .fold(Vector3::zeros(), |acc, &v| acc + self.pool.position(v).coords);
                let centre = Point3::from(sum / n);

                let distance = hit_plane.signed_distance(&centre);
                if distance > self.epsilon {
                    Some(FaceClass::Out)
                } else if distance < -self.epsilon {
                    Some(FaceClass::In)
                } else if view
                    .operand
                    .face(face_loop.orig.index())
                    .plane
                    .normal
                    .dot(&hit_plane.normal)
                    > 0.0
                {
                    Some(FaceClass::OnOrientOut)
                } else {
                    Some(FaceClass::OnOrientIn)
                }
            },
        }
    }
}
