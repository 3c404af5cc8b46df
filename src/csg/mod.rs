//! The boolean engine: intersection, face rebuilding, grouping, classification and
//! collection of two polygon meshes.
//!
//! ```
//! use polycsg::config::{BooleanOp, CsgConfig};
//! use polycsg::csg::Csg;
//! use polycsg::mesh::Mesh;
//! use polycsg::traits::CsgOps;
//!
//! let a = Mesh::<()>::cube(1.0, None);
//! let b = a.translate(0.5, 0.0, 0.0);
//! let mut csg = Csg::new(CsgConfig::default());
//! let out = csg.compute(&a, &b, BooleanOp::Union).unwrap();
//! assert!(out.mesh.is_manifold());
//! assert_eq!(out.stats.unclassified_groups, 0);
//! ```

use crate::config::{BooleanOp, ClassifierKind, CsgConfig};
use crate::errors::CsgError;
use crate::mesh::{Mesh, Topology};
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub mod classify;
pub mod collector;
pub mod face_loops;
pub mod geometry;
pub mod grouping;
pub mod hooks;
pub mod ids;
pub mod intersect;
pub mod operand;
pub mod rtree;
pub mod subdivide;
pub mod vertex_pool;

pub use classify::{ClassificationInfo, FaceClass, PointClass};
pub use collector::{FaceDecision, decide};
pub use hooks::Hooks;
pub use ids::{EdgeRef, FaceRef, IObj, Side, VertexId};

use classify::{Classifier, SideView};
use collector::{CollectSide, MeshBuilder, collect};
use face_loops::{FaceLoopList, build_face_loops};
use grouping::{FaceLoopGroup, LoopEdges, group_loops, loop_edges, shared_edges};
use ids::EdgeKey;
use intersect::{candidate_pairs, detect};
use operand::Operand;
use subdivide::Registry;
use vertex_pool::VertexPool;

/// Counters describing one operation, including every degraded outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsgStats {
    /// Face pairs whose boxes and planes allow contact
    pub candidate_pairs: usize,
    /// Distinct points where the operands touch
    pub intersection_vertices: usize,
    /// Face loops rebuilt per operand
    pub face_loops: [usize; 2],
    /// Face loop groups per operand
    pub groups: [usize; 2],
    /// Groups no strategy could classify
    pub unclassified_groups: usize,
    /// Unclassified groups left out of the result
    pub dropped_groups: usize,
    /// Loop edges whose two directions are not used equally often
    pub integrity_mismatches: usize,
}

/// The result of [`Csg::compute`].
#[derive(Debug, Clone)]
pub struct CsgOutput<S: Clone + Send + Sync + Debug> {
    pub mesh: Mesh<S>,
    /// Class of the group each output face came from
    pub face_classes: Vec<FaceClass>,
    /// Output vertex index pairs `(low, high)` lying on the intersection curve
    pub shared_edges: Vec<(usize, usize)>,
    pub stats: CsgStats,
}

/// A reusable boolean engine.
///
/// The vertex pool is reset by every call, so one engine can run any number of operations
/// in sequence; nothing carries over between them.
#[derive(Debug)]
pub struct Csg<'h, S: Clone + Send + Sync + Debug> {
    config: CsgConfig,
    hooks: Hooks<'h, S>,
    pool: VertexPool,
}

impl<S: Clone + Send + Sync + Debug> Default for Csg<'_, S> {
    fn default() -> Self {
        Self::new(CsgConfig::default())
    }
}

/// Everything built before classification.
struct Prepared<'m, S: Clone + Send + Sync + Debug> {
    operands: [Operand<'m, S>; 2],
    registry: Registry,
    loops: [FaceLoopList; 2],
    edges: [LoopEdges; 2],
    shared: BTreeSet<EdgeKey>,
    groups: [Vec<FaceLoopGroup>; 2],
    stats: CsgStats,
}

impl<'h, S: Clone + Send + Sync + Debug> Csg<'h, S> {
    pub const fn new(config: CsgConfig) -> Self {
        Csg {
            config,
            hooks: Hooks::new(),
            pool: VertexPool::new(),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks<'h, S>) -> Self {
        self.hooks = hooks;
        self
    }

    pub const fn config(&self) -> &CsgConfig {
        &self.config
    }

    /// Compute `op` over `a` and `b`.
    ///
    /// Fails on degenerate edges, holes no face loop contains, or (edge classifier only) a
    /// group that can be placed neither inside nor outside.
    pub fn compute(
        &mut self,
        a: &Mesh<S>,
        b: &Mesh<S>,
        op: BooleanOp,
    ) -> Result<CsgOutput<S>, CsgError> {
        let mut prepared = self.prepare(a, b)?;
        self.classify(&mut prepared, self.config.classifier, &Side::BOTH)?;

        let Prepared {
            operands,
            loops,
            shared,
            groups,
            mut stats,
            ..
        } = prepared;
        stats.unclassified_groups = groups
            .iter()
            .flatten()
            .filter(|g| !g.is_resolved())
            .count();

        let sides = [
            CollectSide {
                operand: &operands[0],
                loops: &loops[0],
                groups: &groups[0],
            },
            CollectSide {
                operand: &operands[1],
                loops: &loops[1],
                groups: &groups[1],
            },
        ];
        let collected = collect(op, sides, &shared, &self.pool, &mut self.hooks);
        stats.dropped_groups = collected.dropped_groups;
        if stats.dropped_groups > 0 {
            warn!("{}: dropped {} unclassified groups", op, stats.dropped_groups);
        }
        info!(
            "{}: {} + {} faces -> {} faces",
            op,
            a.faces.len(),
            b.faces.len(),
            collected.mesh.faces.len()
        );

        Ok(CsgOutput {
            mesh: collected.mesh,
            face_classes: collected.face_classes,
            shared_edges: collected.shared_edges,
            stats,
        })
    }

    /// Cut both meshes along their intersection and return every face loop group as its
    /// own mesh, A's groups first, without classifying them.
    pub fn slice(&mut self, a: &Mesh<S>, b: &Mesh<S>) -> Result<Vec<Mesh<S>>, CsgError> {
        let prepared = self.prepare(a, b)?;
        let mut meshes = Vec::with_capacity(prepared.stats.groups[0] + prepared.stats.groups[1]);
        for side in Side::BOTH {
            let view = CollectSide {
                operand: &prepared.operands[side.index()],
                loops: &prepared.loops[side.index()],
                groups: &prepared.groups[side.index()],
            };
            for group in view.groups {
                let mut builder = MeshBuilder::new(&self.pool, view.operand.mesh.metadata.clone());
                builder.push_group(&view, group, false, &mut self.hooks);
                meshes.push(builder.finish());
            }
        }
        debug!("slice produced {} meshes", meshes.len());
        Ok(meshes)
    }

    /// Cut `open` along `closed` and classify each of its groups against `closed` with the
    /// edge classifier.
    ///
    /// Returns [`CsgError::NotClosed`] when `closed` has boundary edges.
    pub fn slice_and_classify(
        &mut self,
        closed: &Mesh<S>,
        open: &Mesh<S>,
    ) -> Result<Vec<(FaceClass, Mesh<S>)>, CsgError> {
        let boundary_edges = Topology::build(closed).boundary_edge_count();
        if boundary_edges > 0 {
            return Err(CsgError::NotClosed { boundary_edges });
        }

        let mut prepared = self.prepare(closed, open)?;
        self.classify(&mut prepared, ClassifierKind::Edge, &[Side::B])?;

        let view = CollectSide {
            operand: &prepared.operands[1],
            loops: &prepared.loops[1],
            groups: &prepared.groups[1],
        };
        let mut classified = Vec::with_capacity(view.groups.len());
        for group in view.groups {
            let mut builder = MeshBuilder::new(&self.pool, open.metadata.clone());
            builder.push_group(&view, group, false, &mut self.hooks);
            classified.push((group.class(), builder.finish()));
        }
        Ok(classified)
    }

    /// Intersect, rebuild and group both operands.
    fn prepare<'m>(&mut self, a: &'m Mesh<S>, b: &'m Mesh<S>) -> Result<Prepared<'m, S>, CsgError> {
        let epsilon = self.config.epsilon;
        let mut stats = CsgStats::default();

        self.pool.reset(&a.vertices, &b.vertices);
        let oa = Operand::new(Side::A, a, 0, &self.config);
        let ob = Operand::new(Side::B, b, a.vertices.len() as u32, &self.config);

        let candidates = candidate_pairs(&oa, &ob, epsilon);
        stats.candidate_pairs = candidates.len();
        let found = detect(&oa, &ob, &candidates, &mut self.pool, epsilon)?;
        let vertex_intersections = found.by_vertex();
        stats.intersection_vertices = vertex_intersections.len();
        for (&v, pairs) in &vertex_intersections {
            self.hooks.intersection_vertex(v, self.pool.position(v), pairs);
        }

        let registry = Registry::build(vertex_intersections, &oa, &ob, &self.pool, epsilon);
        let mut loops_a = build_face_loops(&oa, &registry, &self.pool, epsilon, &mut self.hooks)?;
        let mut loops_b = build_face_loops(&ob, &registry, &self.pool, epsilon, &mut self.hooks)?;
        stats.face_loops = [loops_a.len(), loops_b.len()];

        if self.config.check_integrity {
            for (operand, loops) in [(&oa, &loops_a), (&ob, &loops_b)] {
                if !operand.topology.is_closed() {
                    continue;
                }
                let mismatches = integrity_mismatches(loops);
                if mismatches > 0 {
                    warn!("{:?}: {} face loop edges fail the parity check", operand.side, mismatches);
                }
                stats.integrity_mismatches += mismatches;
            }
        }

        let edges = [loop_edges(&loops_a), loop_edges(&loops_b)];
        let shared = shared_edges(&edges[0], &edges[1]);
        debug!("{} shared edges", shared.len());
        let groups = [
            group_loops(Side::A, &mut loops_a, &edges[0], &shared),
            group_loops(Side::B, &mut loops_b, &edges[1], &shared),
        ];
        stats.groups = [groups[0].len(), groups[1].len()];

        Ok(Prepared {
            operands: [oa, ob],
            registry,
            loops: [loops_a, loops_b],
            edges,
            shared,
            groups,
            stats,
        })
    }

    fn classify(
        &self,
        prepared: &mut Prepared<'_, S>,
        kind: ClassifierKind,
        sides: &[Side],
    ) -> Result<(), CsgError> {
        let Prepared {
            operands,
            registry,
            loops,
            edges,
            shared,
            groups,
            ..
        } = prepared;
        let views = [
            SideView {
                operand: &operands[0],
                loops: &loops[0],
                edges: &edges[0],
            },
            SideView {
                operand: &operands[1],
                loops: &loops[1],
                edges: &edges[1],
            },
        ];
        let mut classifier = Classifier::new(views, shared, registry, &self.pool, self.config.epsilon);
        classifier.run(kind, groups, sides)
    }
}

/// Undirected loop edges walked a different number of times in each direction.
fn integrity_mismatches(loops: &FaceLoopList) -> usize {
    let mut balance: HashMap<EdgeKey, i64> = HashMap::new();
    for (_, face_loop) in loops.all() {
        for (u, w) in face_loop.edges() {
            let key = EdgeKey::new(u, w);
            *balance.entry(key).or_default() += if key.is_forward(u) { 1 } else { -1 };
        }
    }
    balance.values().filter(|&&b| b != 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CsgOps;

    #[test]
    fn engine_is_reusable() {
        let a = Mesh::<()>::cube(2.0, None);
        let b = Mesh::<()>::cube(1.0, None).translate(0.5, 0.5, 0.5);
        let mut csg = Csg::new(CsgConfig::default());
        let first = csg.compute(&a, &b, BooleanOp::Union).unwrap();
        let second = csg.compute(&a, &b, BooleanOp::Union).unwrap();
        assert_eq!(first.mesh.faces.len(), second.mesh.faces.len());
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.stats.intersection_vertices, 0);
        assert_eq!(first.stats.groups, [1, 1]);
    }

    #[test]
    fn rebuilt_loops_of_closed_meshes_balance() {
        let a = Mesh::<()>::cube(2.0, None);
        let b = Mesh::<()>::cube(2.0, None).translate(1.0, 1.0, 1.0);
        let mut csg = Csg::new(CsgConfig::default());
        let out = csg.compute(&a, &b, BooleanOp::Intersection).unwrap();
        assert_eq!(out.stats.integrity_mismatches, 0);
        assert!(out.stats.intersection_vertices > 0);
        assert_eq!(out.face_classes.len(), out.mesh.faces.len());
        assert!(out.face_classes.iter().all(|c| *c == FaceClass::In));
    }
}
