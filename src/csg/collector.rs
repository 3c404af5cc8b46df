//! Face selection per boolean operation and assembly of the output mesh.

use crate::config::BooleanOp;
use crate::csg::classify::FaceClass;
use crate::csg::face_loops::FaceLoopList;
use crate::csg::grouping::FaceLoopGroup;
use crate::csg::hooks::Hooks;
use crate::csg::ids::{EdgeKey, Side, VertexId};
use crate::csg::operand::Operand;
use crate::csg::vertex_pool::VertexPool;
use crate::mesh::{Face, Mesh};
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::debug;

/// What happens to one classified face in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDecision {
    Drop,
    Keep,
    /// Keep with reversed winding
    KeepFlipped,
}

/// Decide the fate of a face of class `class` coming from operand A (`is_a`) or B.
///
/// ```
/// use polycsg::config::BooleanOp;
/// use polycsg::csg::{FaceClass, FaceDecision, decide};
///
/// assert_eq!(decide(BooleanOp::AMinusB, FaceClass::In, false), FaceDecision::KeepFlipped);
/// assert_eq!(decide(BooleanOp::Union, FaceClass::OnOrientOut, false), FaceDecision::Drop);
/// ```
pub const fn decide(op: BooleanOp, class: FaceClass, is_a: bool) -> FaceDecision {
    use FaceClass::*;
    use FaceDecision::*;

    if let BooleanOp::All = op {
        return Keep;
    }
    match (op, class, is_a) {
        (BooleanOp::Union, Out, _) => Keep,
        (BooleanOp::Union, OnOrientOut, true) => Keep,
        (BooleanOp::Intersection, In, _) => Keep,
        (BooleanOp::Intersection, OnOrientOut, true) => Keep,
        (BooleanOp::AMinusB, Out | OnOrientIn, true) => Keep,
        (BooleanOp::AMinusB, In, false) => KeepFlipped,
        (BooleanOp::BMinusA, Out | OnOrientIn, false) => Keep,
        (BooleanOp::BMinusA, In, true) => KeepFlipped,
        (BooleanOp::SymmetricDifference, Out, _) => Keep,
        (BooleanOp::SymmetricDifference, In, _) => KeepFlipped,
        _ => Drop,
    }
}

/// One operand's loops and classified groups, as handed to the collector.
pub(crate) struct CollectSide<'a, 'm, S: Clone + Send + Sync + Debug> {
    pub operand: &'a Operand<'m, S>,
    pub loops: &'a FaceLoopList,
    pub groups: &'a [FaceLoopGroup],
}

/// The assembled output before it is wrapped for the caller.
pub(crate) struct Collected<S: Clone + Send + Sync + Debug> {
    pub mesh: Mesh<S>,
    pub face_classes: Vec<FaceClass>,
    pub shared_edges: Vec<(usize, usize)>,
    /// Unclassified groups left out of the result
    pub dropped_groups: usize,
}

/// Builds one output mesh from selected face loops, sharing vertices by pool id.
pub(crate) struct MeshBuilder<'p, S: Clone + Send + Sync + Debug> {
    pool: &'p VertexPool,
    index: HashMap<VertexId, usize>,
    sources: Vec<VertexId>,
    mesh: Mesh<S>,
}

impl<'p, S: Clone + Send + Sync + Debug> MeshBuilder<'p, S> {
    pub fn new(pool: &'p VertexPool, metadata: Option<S>) -> Self {
        let mut mesh = Mesh::new();
        mesh.metadata = metadata;
        MeshBuilder {
            pool,
            index: HashMap::new(),
            sources: Vec::new(),
            mesh,
        }
    }

    fn intern(&mut self, v: VertexId) -> usize {
        if let Some(&i) = self.index.get(&v) {
            return i;
        }
        let i = self.sources.len();
        self.sources.push(v);
        self.mesh.vertices.push(*self.pool.position(v));
        self.index.insert(v, i);
        i
    }

    /// Add every loop of `group` as a face carrying its source face's plane and metadata,
    /// and return the new faces' indices.
    pub fn push_group(
        &mut self,
        side: &CollectSide<'_, '_, S>,
        group: &FaceLoopGroup,
        flipped: bool,
        hooks: &mut Hooks<'_, S>,
    ) -> std::ops::Range<usize> {
        let start = self.mesh.faces.len();
        for &id in &group.loops {
            let face_loop = side.loops.get(id);
            let source = side.operand.face(face_loop.orig.index());
            let indices = face_loop.vertices.iter().map(|&v| self.intern(v)).collect();
            let mut face = Face {
                indices,
                plane: source.plane,
                metadata: source.metadata.clone(),
            };
            if flipped {
                face.flip();
            }
            hooks.result_face(&mut face, face_loop.orig);
            hooks.provenance(self.mesh.faces.len(), face_loop.orig, flipped);
            self.mesh.faces.push(face);
        }
        start..self.mesh.faces.len()
    }

    /// Output vertex pairs of face edges lying on the intersection curve, sorted.
    pub fn shared_edges(&self, shared: &BTreeSet<EdgeKey>) -> Vec<(usize, usize)> {
        let mut found = BTreeSet::new();
        for face in &self.mesh.faces {
            for e in 0..face.len() {
                let (i, j) = face.edge(e);
                if shared.contains(&EdgeKey::new(self.sources[i], self.sources[j])) {
                    found.insert((i.min(j), i.max(j)));
                }
            }
        }
        found.into_iter().collect()
    }

    pub fn finish(self) -> Mesh<S> {
        self.mesh
    }
}

/// Keep, flip or drop every group of both operands under `op`, A's groups first.
pub(crate) fn collect<S: Clone + Send + Sync + Debug>(
    op: BooleanOp,
    sides: [CollectSide<'_, '_, S>; 2],
    shared: &BTreeSet<EdgeKey>,
    pool: &VertexPool,
    hooks: &mut Hooks<'_, S>,
) -> Collected<S> {
    let mut builder = MeshBuilder::new(pool, sides[0].operand.mesh.metadata.clone());
    let mut face_classes = Vec::new();
    let mut dropped_groups = 0;

    for side in Side::BOTH {
        let view = &sides[side.index()];
        for group in view.groups {
            let class = group.class();
            let flipped = match decide(op, class, side == Side::A) {
                FaceDecision::Drop => {
                    if class == FaceClass::Unclassified {
                        dropped_groups += 1;
                    }
                    continue;
                },
                FaceDecision::Keep => false,
                FaceDecision::KeepFlipped => true,
            };
            let added = builder.push_group(view, group, flipped, hooks);
            face_classes.extend(std::iter::repeat_n(class, added.len()));
        }
    }

    let shared_edges = builder.shared_edges(shared);
    let mesh = builder.finish();
    debug!(
        "{}: kept {} faces over {} vertices, {} shared edges",
        op,
        mesh.faces.len(),
        mesh.vertices.len(),
        shared_edges.len()
    );
    Collected {
        mesh,
        face_classes,
        shared_edges,
        dropped_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FaceClass::*;
    use FaceDecision::*;

    #[test]
    fn union_keeps_one_copy_of_coincident_faces() {
        assert_eq!(decide(BooleanOp::Union, OnOrientOut, true), Keep);
        assert_eq!(decide(BooleanOp::Union, OnOrientOut, false), Drop);
        assert_eq!(decide(BooleanOp::Union, OnOrientIn, true), Drop);
        assert_eq!(decide(BooleanOp::Union, In, false), Drop);
        assert_eq!(decide(BooleanOp::Union, Out, false), Keep);
    }

    #[test]
    fn differences_are_mirror_images() {
        for class in [OnOrientOut, Out, In, OnOrientIn, Unclassified] {
            for is_a in [true, false] {
                assert_eq!(
                    decide(BooleanOp::AMinusB, class, is_a),
                    decide(BooleanOp::BMinusA, class, !is_a)
                );
            }
        }
        assert_eq!(decide(BooleanOp::AMinusB, OnOrientIn, true), Keep);
        assert_eq!(decide(BooleanOp::AMinusB, Out, false), Drop);
    }

    #[test]
    fn unclassified_only_survives_all() {
        for op in [
            BooleanOp::Union,
            BooleanOp::Intersection,
            BooleanOp::AMinusB,
            BooleanOp::BMinusA,
            BooleanOp::SymmetricDifference,
        ] {
            assert_eq!(decide(op, Unclassified, true), Drop);
        }
        assert_eq!(decide(BooleanOp::All, Unclassified, false), Keep);
        assert_eq!(decide(BooleanOp::All, In, true), Keep);
    }

    #[test]
    fn symmetric_difference_flips_inside_faces() {
        assert_eq!(decide(BooleanOp::SymmetricDifference, In, true), KeepFlipped);
        assert_eq!(decide(BooleanOp::SymmetricDifference, OnOrientOut, true), Drop);
    }
}
