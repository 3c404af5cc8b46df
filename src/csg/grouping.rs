//! Groups face loops into patches bounded by the intersection curve.

use crate::csg::classify::{ClassificationInfo, FaceClass};
use crate::csg::face_loops::{FaceLoopList, LoopId};
use crate::csg::ids::{EdgeKey, Side, VertexId};
use hashbrown::HashMap;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// Directed loop edge to every loop that traverses it, ascending.
pub type LoopEdges = HashMap<(VertexId, VertexId), Vec<LoopId>>;

/// A maximal set of loops from one operand connected across edges that are not shared
/// with the other operand.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLoopGroup {
    pub side: Side,
    pub loops: Vec<LoopId>,
    /// Directed shared edges of the group's loops, sorted
    pub perimeter: Vec<(VertexId, VertexId)>,
    pub classification: Vec<ClassificationInfo>,
}

impl FaceLoopGroup {
    /// Record a verdict against `against` (`None` for a global one), replacing any earlier
    /// verdict against the same operand.
    pub fn classify(&mut self, against: Option<Side>, class: FaceClass) {
        match self.classification.iter_mut().find(|c| c.against == against) {
            Some(info) => info.class = class,
            None => self.classification.push(ClassificationInfo { against, class }),
        }
    }

    /// The resolved verdict, or `Unclassified` when there is none or verdicts disagree.
    pub fn class(&self) -> FaceClass {
        let mut classes = self.classification.iter().map(|c| c.class);
        let Some(first) = classes.next() else {
            return FaceClass::Unclassified;
        };
        if classes.all(|c| c == first) {
            first
        } else {
            FaceClass::Unclassified
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.class() != FaceClass::Unclassified
    }

    /// Whether `u`-`w` (either direction) lies on the perimeter.
    pub fn on_perimeter(&self, u: VertexId, w: VertexId) -> bool {
        self.perimeter.binary_search(&(u, w)).is_ok() || self.perimeter.binary_search(&(w, u)).is_ok()
    }
}

/// Index every loop edge of `list`, linked or not.
pub fn loop_edges(list: &FaceLoopList) -> LoopEdges {
    let mut edges: LoopEdges = HashMap::with_capacity(list.vertex_count());
    for (id, face_loop) in list.all() {
        for edge in face_loop.edges() {
            edges.entry(edge).or_default().push(id);
        }
    }
    for ids in edges.values_mut() {
        ids.sort_unstable();
        ids.dedup();
    }
    edges
}

/// Undirected edges used by loops of both operands: the discretised intersection curve.
pub fn shared_edges(a: &LoopEdges, b: &LoopEdges) -> BTreeSet<EdgeKey> {
    let b_keys: BTreeSet<EdgeKey> = b.keys().map(|&(u, w)| EdgeKey::new(u, w)).collect();
    a.keys()
        .map(|&(u, w)| EdgeKey::new(u, w))
        .filter(|k| b_keys.contains(k))
        .collect()
}

/// Drain `list` into groups, breadth first across non-shared edges.
pub fn group_loops(
    side: Side,
    list: &mut FaceLoopList,
    edges: &LoopEdges,
    shared: &BTreeSet<EdgeKey>,
) -> Vec<FaceLoopGroup> {
    let mut groups = Vec::new();

    while let Some(seed) = list.pop_front() {
        let group_index = groups.len();
        let mut group = FaceLoopGroup {
            side,
            loops: Vec::new(),
            perimeter: Vec::new(),
            classification: Vec::new(),
        };
        let mut queue = VecDeque::from([seed]);

        while let Some(id) = queue.pop_front() {
            list.get_mut(id).group = Some(group_index);
            group.loops.push(id);

            let loop_edges: Vec<(VertexId, VertexId)> = list.get(id).edges().collect();
            for (u, w) in loop_edges {
                if shared.contains(&EdgeKey::new(u, w)) {
                    group.perimeter.push((u, w));
                    continue;
                }
                let neighbours = edges
                    .get(&(w, u))
                    .into_iter()
                    .chain(edges.get(&(u, w)))
                    .flatten();
                for &n in neighbours {
                    if list.remove(n) {
                        queue.push_back(n);
                    }
                }
            }
        }

        group.loops.sort_unstable();
        group.perimeter.sort_unstable();
        group.perimeter.dedup();
        groups.push(group);
    }

    debug!("{:?}: {} face loop groups", side, groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::face_loops::FaceLoop;
    use crate::csg::ids::FaceRef;

    fn push(list: &mut FaceLoopList, ids: &[u32]) -> LoopId {
        list.push_back(FaceLoop {
            orig: FaceRef::new(Side::A, 0),
            vertices: ids.iter().map(|&i| VertexId(i)).collect(),
            group: None,
        })
    }

    #[test]
    fn shared_edges_split_groups() {
        // two triangles sharing edge 1-2, and a third across shared edge 2-3
        let mut a = FaceLoopList::new();
        let t0 = push(&mut a, &[0, 1, 2]);
        let t1 = push(&mut a, &[2, 1, 3]);
        let t2 = push(&mut a, &[3, 4, 2]);
        let mut b = FaceLoopList::new();
        push(&mut b, &[3, 2, 9]);

        let (ea, eb) = (loop_edges(&a), loop_edges(&b));
        let shared = shared_edges(&ea, &eb);
        assert_eq!(shared.len(), 1);
        assert!(shared.contains(&EdgeKey::new(VertexId(2), VertexId(3))));

        let groups = group_loops(Side::A, &mut a, &ea, &shared);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].loops, vec![t0, t1]);
        assert_eq!(groups[1].loops, vec![t2]);
        assert!(groups[0].on_perimeter(VertexId(2), VertexId(3)));
        assert_eq!(groups[1].perimeter, vec![(VertexId(2), VertexId(3))]);
        assert_eq!(a.get(t2).group, Some(1));
        assert!(a.is_empty());
    }

    #[test]
    fn verdicts_must_agree() {
        let mut group = FaceLoopGroup {
            side: Side::B,
            loops: vec![0],
            perimeter: Vec::new(),
            classification: Vec::new(),
        };
        assert_eq!(group.class(), FaceClass::Unclassified);
        group.classify(Some(Side::A), FaceClass::In);
        assert_eq!(group.class(), FaceClass::In);
        group.classify(None, FaceClass::Out);
        assert!(!group.is_resolved());
        group.classify(None, FaceClass::In);
        assert!(group.is_resolved());
    }
}
