//! Bulk-loaded R-tree over face bounding boxes.
//!
//! Built once per operand. Used for candidate face pairs between the operands and for the
//! point and ray queries of point-in-mesh classification.

use crate::csg::geometry::{box_contains, boxes_overlap, merged};
use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::{Aabb, BoundingVolume};
use crate::float_types::parry3d::query::{Ray, RayCast};
use nalgebra::Point3;

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(Vec<usize>),
    Inner(Vec<usize>),
}

#[derive(Debug, Clone)]
struct Node {
    aabb: Aabb,
    kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub struct RTree {
    nodes: Vec<Node>,
    boxes: Vec<Aabb>,
    root: Option<usize>,
}

impl RTree {
    /// Bulk-load a tree over `boxes`; item `i` of every query result indexes `boxes[i]`.
    ///
    /// Items are sorted along the longest axis of their centers and cut into `fanout`
    /// contiguous runs, recursively, until a run fits in one leaf of `leaf_size` items.
    pub fn build(boxes: Vec<Aabb>, fanout: usize, leaf_size: usize) -> Self {
        let fanout = fanout.max(2);
        let leaf_size = leaf_size.max(1);
        let mut tree = RTree {
            nodes: Vec::with_capacity(boxes.len() / leaf_size.max(1) * 2 + 1),
            boxes,
            root: None,
        };
        if tree.boxes.is_empty() {
            return tree;
        }

        let mut items: Vec<(usize, Point3<Real>)> = tree
            .boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.center()))
            .collect();
        let root = tree.build_node(&mut items, fanout, leaf_size);
        tree.root = Some(root);
        tree
    }

    fn build_node(
        &mut self,
        items: &mut [(usize, Point3<Real>)],
        fanout: usize,
        leaf_size: usize,
    ) -> usize {
        if items.len() <= leaf_size {
            let ids: Vec<usize> = items.iter().map(|(i, _)| *i).collect();
            let aabb = ids
                .iter()
                .skip(1)
                .fold(self.boxes[ids[0]], |acc, &i| merged(&acc, &self.boxes[i]));
            self.nodes.push(Node {
                aabb,
                kind: NodeKind::Leaf(ids),
            });
            return self.nodes.len() - 1;
        }

        // Split along the axis with the widest spread of centers
        let (mut lo, mut hi) = (items[0].1, items[0].1);
        for (_, c) in items.iter() {
            lo = lo.inf(c);
            hi = hi.sup(c);
        }
        let extent = hi - lo;
        let axis = extent.imax();
        items.sort_by(|a, b| a.1[axis].total_cmp(&b.1[axis]).then(a.0.cmp(&b.0)));

        let chunk = items.len().div_ceil(fanout);
        let children: Vec<usize> = items
            .chunks_mut(chunk)
            .map(|run| self.build_node(run, fanout, leaf_size))
            .collect();
        let aabb = children
            .iter()
            .skip(1)
            .fold(self.nodes[children[0]].aabb, |acc, &c| {
                merged(&acc, &self.nodes[c].aabb)
            });
        self.nodes.push(Node {
            aabb,
            kind: NodeKind::Inner(children),
        });
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Visit every item pair `(mine, theirs)` whose boxes overlap within `epsilon`.
    ///
    /// Paired nodes are descended larger side first, so each leaf pair is reached once.
    pub fn overlapping_pairs(&self, other: &RTree, epsilon: Real, mut visit: impl FnMut(usize, usize)) {
        let (Some(ra), Some(rb)) = (self.root, other.root) else {
            return;
        };
        let mut stack = vec![(ra, rb)];
        while let Some((na, nb)) = stack.pop() {
            let (node_a, node_b) = (&self.nodes[na], &other.nodes[nb]);
            if !boxes_overlap(&node_a.aabb, &node_b.aabb, epsilon) {
                continue;
            }
            match (&node_a.kind, &node_b.kind) {
                (NodeKind::Leaf(items_a), NodeKind::Leaf(items_b)) => {
                    for &i in items_a {
                        for &j in items_b {
                            if boxes_overlap(&self.boxes[i], &other.boxes[j], epsilon) {
                                visit(i, j);
                            }
                        }
                    }
                }
                (NodeKind::Inner(children), NodeKind::Leaf(_)) => {
                    stack.extend(children.iter().map(|&c| (c, nb)));
                }
                (NodeKind::Leaf(_), NodeKind::Inner(children)) => {
                    stack.extend(children.iter().map(|&c| (na, c)));
                }
                (NodeKind::Inner(children_a), NodeKind::Inner(children_b)) => {
                    if node_a.aabb.volume() >= node_b.aabb.volume() {
                        stack.extend(children_a.iter().map(|&c| (c, nb)));
                    } else {
                        stack.extend(children_b.iter().map(|&c| (na, c)));
                    }
                }
            }
        }
    }

    /// Items whose box contains `point` within `epsilon`.
    pub fn query_point(&self, point: &Point3<Real>, epsilon: Real) -> Vec<usize> {
        self.query(|aabb| box_contains(aabb, point, epsilon))
    }

    /// Items whose box is hit by `ray` (any positive time of impact).
    pub fn query_ray(&self, ray: &Ray, epsilon: Real) -> Vec<usize> {
        self.query(|aabb| aabb.loosened(epsilon).intersects_local_ray(ray, Real::MAX))
    }

    fn query(&self, accept: impl Fn(&Aabb) -> bool) -> Vec<usize> {
        let mut found = Vec::new();
        let Some(root) = self.root else {
            return found;
        };
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if !accept(&node.aabb) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(items) => {
                    found.extend(items.iter().copied().filter(|&i| accept(&self.boxes[i])));
                }
                NodeKind::Inner(children) => stack.extend(children.iter().copied()),
            }
        }
        found.sort_unstable();
        found
    }
}
