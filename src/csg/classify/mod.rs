//! Classifies every face loop group as inside, outside or on the other operand.
//!
//! Strategies run cheapest first and each one only looks at groups the earlier ones left
//! unresolved. Two passes compare groups of both operands directly (coincident loops and
//! identical perimeters); the rest look at one operand's groups against the other mesh and
//! run once per side with the roles swapped.

use crate::config::ClassifierKind;
use crate::csg::face_loops::{FaceLoopList, LoopFrame, LoopId};
use crate::csg::grouping::{FaceLoopGroup, LoopEdges};
use crate::csg::ids::{EdgeKey, Side, VertexId};
use crate::csg::operand::Operand;
use crate::csg::subdivide::Registry;
use crate::csg::vertex_pool::VertexPool;
use crate::errors::CsgError;
use crate::float_types::Real;
use hashbrown::HashMap;
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::{debug, warn};

mod edge;
mod normal;
mod point;

pub use point::{PointHit, classify_point};

/// Where a face group lies relative to the other operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceClass {
    /// On the other surface, facing the same way
    OnOrientOut,
    Out,
    In,
    /// On the other surface, facing the opposite way
    OnOrientIn,
    Unclassified,
}

impl FaceClass {
    pub const ON_ORIENT_OUT_BIT: u8 = 1;
    pub const OUT_BIT: u8 = 2;
    pub const IN_BIT: u8 = 4;
    pub const ON_ORIENT_IN_BIT: u8 = 8;

    pub const fn bit(self) -> u8 {
        match self {
            FaceClass::OnOrientOut => Self::ON_ORIENT_OUT_BIT,
            FaceClass::Out => Self::OUT_BIT,
            FaceClass::In => Self::IN_BIT,
            FaceClass::OnOrientIn => Self::ON_ORIENT_IN_BIT,
            FaceClass::Unclassified => 0,
        }
    }

    /// The class whose bit is the only one set in `bits`.
    pub const fn from_bits(bits: u8) -> FaceClass {
        match bits {
            Self::ON_ORIENT_OUT_BIT => FaceClass::OnOrientOut,
            Self::OUT_BIT => FaceClass::Out,
            Self::IN_BIT => FaceClass::In,
            Self::ON_ORIENT_IN_BIT => FaceClass::OnOrientIn,
            _ => FaceClass::Unclassified,
        }
    }

    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, FaceClass::OnOrientOut | FaceClass::OnOrientIn)
    }
}

/// Where a point lies relative to a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointClass {
    /// Every test ray was degenerate
    Unk,
    Out,
    /// Inside a face
    On,
    In,
    /// At a mesh vertex
    Vertex,
    /// On a mesh edge
    Edge,
}

impl PointClass {
    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, PointClass::On | PointClass::Vertex | PointClass::Edge)
    }
}

/// One verdict for a group; `against` names the operand it was judged against, `None` for
/// verdicts that hold against both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationInfo {
    pub against: Option<Side>,
    pub class: FaceClass,
}

/// One operand as the classifier sees it.
pub(crate) struct SideView<'a, 'm, S: Clone + Send + Sync + Debug> {
    pub operand: &'a Operand<'m, S>,
    pub loops: &'a FaceLoopList,
    pub edges: &'a LoopEdges,
}

impl<S: Clone + Send + Sync + Debug> Clone for SideView<'_, '_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Clone + Send + Sync + Debug> Copy for SideView<'_, '_, S> {}

pub(crate) struct Classifier<'a, 'm, S: Clone + Send + Sync + Debug> {
    views: [SideView<'a, 'm, S>; 2],
    shared: &'a BTreeSet<EdgeKey>,
    pool: &'a VertexPool,
    epsilon: Real,
    /// Per side, classes of that side's loop vertices against the other operand
    vertex_classes: [HashMap<VertexId, PointClass>; 2],
    /// Per side, groups that received dihedral votes
    voted: [Vec<bool>; 2],
}

impl<'a, 'm, S: Clone + Send + Sync + Debug> Classifier<'a, 'm, S> {
    /// Every vertex of the intersection curve starts out ON against both operands.
    pub fn new(
        views: [SideView<'a, 'm, S>; 2],
        shared: &'a BTreeSet<EdgeKey>,
        registry: &Registry,
        pool: &'a VertexPool,
        epsilon: Real,
    ) -> Self {
        let mut on = HashMap::with_capacity(registry.vertex_intersections().len());
        for &v in registry.vertex_intersections().keys() {
            on.insert(registry.map(v), PointClass::On);
        }
        Classifier {
            views,
            shared,
            pool,
            epsilon,
            vertex_classes: [on.clone(), on],
            voted: [Vec::new(), Vec::new()],
        }
    }

    /// Classify the groups of `sides` with the `kind` pipeline.
    ///
    /// Groups that stay unresolved keep an `Unclassified` class; only the edge pipeline
    /// can fail, on an untouched group no test can place.
    pub fn run(
        &mut self,
        kind: ClassifierKind,
        groups: &mut [Vec<FaceLoopGroup>; 2],
        sides: &[Side],
    ) -> Result<(), CsgError> {
        {
            let [a, b] = &mut *groups;
            self.match_coincident(a, b);
        }
        for &side in sides {
            let mine = &mut groups[side.index()];
            match kind {
                ClassifierKind::Normal => self.classify_by_sampling(side, mine),
                ClassifierKind::Edge => self.classify_by_dihedral_votes(side, mine),
            }
        }
        {
            let [a, b] = &mut *groups;
            self.match_perimeters(a, b);
        }
        for &side in sides {
            let mine = &mut groups[side.index()];
            match kind {
                ClassifierKind::Normal => self.classify_single_loops(side, mine),
                ClassifierKind::Edge => self.classify_residual(side, mine)?,
            }
        }

        for &side in sides {
            let left = groups[side.index()]
                .iter()
                .filter(|g| !g.is_resolved())
                .count();
            if left > 0 {
                warn!("{:?}: {} face loop groups left unclassified", side, left);
            }
        }
        Ok(())
    }

    fn view(&self, side: Side) -> SideView<'a, 'm, S> {
        self.views[side.index()]
    }

    /// Pairs of single-loop groups whose loops visit the same vertices.
    fn match_coincident(&self, a: &mut [FaceLoopGroup], b: &mut [FaceLoopGroup]) {
        let (va, vb) = (self.view(Side::A), self.view(Side::B));
        let mut by_min: HashMap<VertexId, Vec<usize>> = HashMap::new();
        for (gi, group) in b.iter().enumerate() {
            if group.loops.len() != 1 || group.is_resolved() {
                continue;
            }
            if let Some(&min) = vb.loops.get(group.loops[0]).vertices.iter().min() {
                by_min.entry(min).or_default().push(gi);
            }
        }

        let mut matched = 0;
        for group_a in a.iter_mut() {
            if group_a.loops.len() != 1 || group_a.is_resolved() {
                continue;
            }
            let loop_a = &va.loops.get(group_a.loops[0]).vertices;
            let Some(min) = loop_a.iter().min() else {
                continue;
            };
            let Some(candidates) = by_min.get_mut(min) else {
                continue;
            };
            let found = candidates.iter().enumerate().find_map(|(slot, &gb)| {
                let orientation = is_same(loop_a, &vb.loops.get(b[gb].loops[0]).vertices);
                (orientation != 0).then_some((slot, gb, orientation))
            });
            if let Some((slot, gb, orientation)) = found {
                candidates.swap_remove(slot);
                let class = if orientation > 0 {
                    FaceClass::OnOrientOut
                } else {
                    FaceClass::OnOrientIn
                };
                group_a.classify(Some(Side::B), class);
                b[gb].classify(Some(Side::A), class);
                matched += 1;
            }
        }
        debug!("{} coincident single-loop group pairs", matched);
    }

    /// Pairs of groups bounded by exactly the same shared edges.
    ///
    /// The match is accepted only when a point inside the group lies on the other operand,
    /// which rules out two distinct patches spanning one closed curve.
    fn match_perimeters(&self, a: &mut [FaceLoopGroup], b: &mut [FaceLoopGroup]) {
        let mut by_perimeter: BTreeMap<Vec<EdgeKey>, Vec<usize>> = BTreeMap::new();
        for (gi, group) in b.iter().enumerate() {
            if group.perimeter.is_empty() || group.is_resolved() {
                continue;
            }
            by_perimeter
                .entry(undirected(&group.perimeter))
                .or_default()
                .push(gi);
        }

        let mut matched = 0;
        for group_a in a.iter_mut() {
            if group_a.perimeter.is_empty() || group_a.is_resolved() {
                continue;
            }
            let Some(candidates) = by_perimeter.get_mut(&undirected(&group_a.perimeter)) else {
                continue;
            };
            if !self.lies_on_other(Side::A, group_a) {
                continue;
            }
            let found = candidates.iter().enumerate().find_map(|(slot, &gb)| {
                let perimeter_b = &b[gb].perimeter;
                if *perimeter_b == group_a.perimeter {
                    Some((slot, gb, FaceClass::OnOrientOut))
                } else if perimeter_b
                    .iter()
                    .all(|&(u, w)| group_a.perimeter.binary_search(&(w, u)).is_ok())
                {
                    Some((slot, gb, FaceClass::OnOrientIn))
                } else {
                    None
                }
            });
            if let Some((slot, gb, class)) = found {
                candidates.swap_remove(slot);
                group_a.classify(Some(Side::B), class);
                b[gb].classify(Some(Side::A), class);
                matched += 1;
            }
        }
        debug!("{} perimeter-matched group pairs", matched);
    }

    fn lies_on_other(&self, me: Side, group: &FaceLoopGroup) -> bool {
        let other = self.view(me.other()).operand;
        group.loops.iter().any(|&id| {
            self.interior_point(me, id)
                .is_some_and(|p| classify_point(other, &p, self.epsilon).class.is_on())
        })
    }

    /// A point strictly inside loop `id` of side `me`.
    fn interior_point(&self, me: Side, id: LoopId) -> Option<Point3<Real>> {
        let view = self.view(me);
        let face_loop = view.loops.get(id);
        let f = face_loop.orig.index();
        let frame = LoopFrame::new(self.pool, view.operand.geoms[f].projection, self.epsilon);
        frame.interior_point(&face_loop.vertices, &view.operand.face(f).plane)
    }
}

/// Compare two loops up to rotation: `1` for the same cyclic order, `-1` for the reversed
/// order, `0` otherwise.
pub fn is_same(a: &[VertexId], b: &[VertexId]) -> i8 {
    let n = a.len();
    if n == 0 || n != b.len() {
        return 0;
    }
    let Some(k) = b.iter().position(|&v| v == a[0]) else {
        return 0;
    };
    if (0..n).all(|i| a[i] == b[(k + i) % n]) {
        1
    } else if (0..n).all(|i| a[i] == b[(k + n - i) % n]) {
        -1
    } else {
        0
    }
}

fn undirected(perimeter: &[(VertexId, VertexId)]) -> Vec<EdgeKey> {
    let mut keys: Vec<EdgeKey> = perimeter.iter().map(|&(u, w)| EdgeKey::new(u, w)).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[u32]) -> Vec<VertexId> {
        v.iter().map(|&i| VertexId(i)).collect()
    }

    #[test]
    fn loops_match_up_to_rotation() {
        let a = ids(&[3, 4, 5, 6]);
        assert_eq!(is_same(&a, &ids(&[5, 6, 3, 4])), 1);
        assert_eq!(is_same(&a, &ids(&[4, 3, 6, 5])), -1);
        assert_eq!(is_same(&a, &ids(&[3, 5, 4, 6])), 0);
        assert_eq!(is_same(&a, &ids(&[3, 4, 5])), 0);
    }

    #[test]
    fn bits_round_trip_for_single_classes() {
        for class in [
            FaceClass::OnOrientOut,
            FaceClass::Out,
            FaceClass::In,
            FaceClass::OnOrientIn,
        ] {
            assert_eq!(FaceClass::from_bits(class.bit()), class);
        }
        assert_eq!(
            FaceClass::from_bits(FaceClass::IN_BIT | FaceClass::OUT_BIT),
            FaceClass::Unclassified
        );
    }
}
