//! Optional observation and post-processing callbacks threaded through one engine.

use crate::csg::ids::{EdgeRef, FaceRef, IObj, VertexId};
use crate::float_types::Real;
use crate::mesh::Face;
use nalgebra::Point3;
use std::collections::BTreeSet;
use std::fmt;

type IntersectionVertexFn<'h> = dyn FnMut(VertexId, &Point3<Real>, &BTreeSet<(IObj, IObj)>) + 'h;
type EdgeDivisionFn<'h> = dyn FnMut(EdgeRef, usize, &Point3<Real>, &Point3<Real>) + 'h;
type ResultFaceFn<'h, S> = dyn FnMut(&mut Face<S>, FaceRef) + 'h;
type ProvenanceFn<'h> = dyn FnMut(usize, FaceRef, bool) + 'h;

/// Callbacks invoked at fixed points of the pipeline.
///
/// None of them can change which faces are produced; `on_result_face` may edit a face
/// (metadata, winding) before it is stored in the output mesh.
///
/// ```
/// use polycsg::csg::{Csg, Hooks};
/// use polycsg::config::{BooleanOp, CsgConfig};
/// use polycsg::mesh::Mesh;
/// use polycsg::traits::CsgOps;
///
/// let a = Mesh::<()>::cube(2.0, None);
/// let b = Mesh::<()>::cube(1.0, None).translate(0.5, 0.5, 0.5);
/// let mut kept = 0;
/// let hooks = Hooks::new().on_provenance(|_, _, _| kept += 1);
/// let mut csg = Csg::new(CsgConfig::default()).with_hooks(hooks);
/// let out = csg.compute(&a, &b, BooleanOp::Union).unwrap();
/// let faces = out.mesh.faces.len();
/// drop(csg);
/// assert_eq!(kept, faces);
/// ```
pub struct Hooks<'h, S: Clone> {
    intersection_vertex: Option<Box<IntersectionVertexFn<'h>>>,
    edge_division: Option<Box<EdgeDivisionFn<'h>>>,
    result_face: Option<Box<ResultFaceFn<'h, S>>>,
    provenance: Option<Box<ProvenanceFn<'h>>>,
}

impl<S: Clone> Default for Hooks<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> fmt::Debug for Hooks<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("intersection_vertex", &self.intersection_vertex.is_some())
            .field("edge_division", &self.edge_division.is_some())
            .field("result_face", &self.result_face.is_some())
            .field("provenance", &self.provenance.is_some())
            .finish()
    }
}

impl<'h, S: Clone> Hooks<'h, S> {
    pub const fn new() -> Self {
        Hooks {
            intersection_vertex: None,
            edge_division: None,
            result_face: None,
            provenance: None,
        }
    }

    /// Called once per final intersection vertex with every primitive pair that produced it.
    #[must_use]
    pub fn on_intersection_vertex(
        mut self,
        f: impl FnMut(VertexId, &Point3<Real>, &BTreeSet<(IObj, IObj)>) + 'h,
    ) -> Self {
        self.intersection_vertex = Some(Box::new(f));
        self
    }

    /// Called for each sub-segment `index` of every subdivided original edge.
    #[must_use]
    pub fn on_edge_division(
        mut self,
        f: impl FnMut(EdgeRef, usize, &Point3<Real>, &Point3<Real>) + 'h,
    ) -> Self {
        self.edge_division = Some(Box::new(f));
        self
    }

    /// Called with every output face (already flipped if needed) and its source face.
    #[must_use]
    pub fn on_result_face(mut self, f: impl FnMut(&mut Face<S>, FaceRef) + 'h) -> Self {
        self.result_face = Some(Box::new(f));
        self
    }

    /// Called with the output face index, its source face and whether it was flipped.
    #[must_use]
    pub fn on_provenance(mut self, f: impl FnMut(usize, FaceRef, bool) + 'h) -> Self {
        self.provenance = Some(Box::new(f));
        self
    }

    pub fn wants_edge_divisions(&self) -> bool {
        self.edge_division.is_some()
    }

    pub(crate) fn intersection_vertex(
        &mut self,
        v: VertexId,
        position: &Point3<Real>,
        pairs: &BTreeSet<(IObj, IObj)>,
    ) {
        if let Some(hook) = self.intersection_vertex.as_mut() {
            hook(v, position, pairs);
        }
    }

    pub(crate) fn edge_division(
        &mut self,
        edge: EdgeRef,
        index: usize,
        start: &Point3<Real>,
        end: &Point3<Real>,
    ) {
        if let Some(hook) = self.edge_division.as_mut() {
            hook(edge, index, start, end);
        }
    }

    pub(crate) fn result_face(&mut self, face: &mut Face<S>, source: FaceRef) {
        if let Some(hook) = self.result_face.as_mut() {
            hook(face, source);
        }
    }

    pub(crate) fn provenance(&mut self, index: usize, source: FaceRef, flipped: bool) {
        if let Some(hook) = self.provenance.as_mut() {
            hook(index, source, flipped);
        }
    }
}
