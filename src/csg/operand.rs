//! Per-operand context: topology, face R-tree and projected face rings, all addressed
//! through pool [`VertexId`]s.

use crate::config::CsgConfig;
use crate::csg::geometry::{RingPosition, locate_in_ring, ring_polygon};
use crate::csg::ids::{EdgeRef, FaceRef, Side, VertexId};
use crate::csg::rtree::RTree;
use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::mesh::plane::Projection;
use crate::mesh::{Face, Mesh, Topology};
use geo::{Coord, Polygon as GeoPolygon};
use nalgebra::Point3;
use std::fmt::Debug;

/// Cached 2D data for one face.
#[derive(Debug, Clone)]
pub struct FaceGeom {
    pub projection: Projection,
    pub ring: GeoPolygon<Real>,
    pub aabb: Aabb,
}

pub struct Operand<'m, S: Clone + Send + Sync + Debug> {
    pub side: Side,
    pub mesh: &'m Mesh<S>,
    pub topology: Topology,
    pub tree: RTree,
    pub geoms: Vec<FaceGeom>,
    vertex_base: u32,
}

impl<'m, S: Clone + Send + Sync + Debug> Operand<'m, S> {
    /// `vertex_base` is the pool id of the mesh's vertex 0.
    pub fn new(side: Side, mesh: &'m Mesh<S>, vertex_base: u32, config: &CsgConfig) -> Self {
        let geoms: Vec<FaceGeom> = mesh
            .faces
            .iter()
            .map(|face| {
                let projection = face.plane.projection();
                let coords: Vec<Coord<Real>> = mesh
                    .face_points(face)
                    .map(|p| projection.project(p))
                    .collect();
                FaceGeom {
                    projection,
                    ring: ring_polygon(coords),
                    aabb: face.bounding_box(&mesh.vertices),
                }
            })
            .collect();
        let tree = RTree::build(
            geoms.iter().map(|g| g.aabb).collect(),
            config.rtree_fanout,
            config.rtree_leaf_size,
        );

        Operand {
            side,
            mesh,
            topology: Topology::build(mesh),
            tree,
            geoms,
            vertex_base,
        }
    }

    #[inline]
    pub fn face(&self, f: usize) -> &Face<S> {
        &self.mesh.faces[f]
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.mesh.faces.len()
    }

    #[inline]
    pub const fn face_ref(&self, f: usize) -> FaceRef {
        FaceRef::new(self.side, f)
    }

    /// Pool id of local vertex `index`.
    #[inline]
    pub const fn vertex_id(&self, index: usize) -> VertexId {
        VertexId(self.vertex_base + index as u32)
    }

    /// Local index of a pool vertex, if it belongs to this operand.
    #[inline]
    pub fn local(&self, v: VertexId) -> Option<usize> {
        let index = v.0.checked_sub(self.vertex_base)? as usize;
        (index < self.mesh.vertices.len()).then_some(index)
    }

    /// Pool ids of a face's loop.
    pub fn face_vertices(&self, f: usize) -> impl Iterator<Item = VertexId> + '_ {
        self.mesh.faces[f]
            .indices
            .iter()
            .map(move |&i| self.vertex_id(i))
    }

    /// Every directed edge of face `f` with its pool endpoints.
    pub fn face_edges(&self, f: usize) -> impl Iterator<Item = (EdgeRef, VertexId, VertexId)> + '_ {
        let face = &self.mesh.faces[f];
        let face_ref = self.face_ref(f);
        (0..face.len()).map(move |e| {
            let (s, t) = face.edge(e);
            (EdgeRef::new(face_ref, e), self.vertex_id(s), self.vertex_id(t))
        })
    }

    /// Pool endpoints of a half-edge.
    #[inline]
    pub fn edge_vertices(&self, edge: EdgeRef) -> (VertexId, VertexId) {
        let (s, t) = self.mesh.faces[edge.face.index()].edge(edge.index());
        (self.vertex_id(s), self.vertex_id(t))
    }

    /// The opposite half-edge, when the mesh has one.
    pub fn reverse(&self, edge: EdgeRef) -> Option<EdgeRef> {
        let (s, t) = self.mesh.faces[edge.face.index()].edge(edge.index());
        self.topology
            .reverse(s, t)
            .map(|h| EdgeRef::new(self.face_ref(h.face), h.edge))
    }

    /// Faces incident to one of this operand's vertices.
    pub fn faces_around(&self, v: VertexId) -> &[usize] {
        self.local(v).map_or(&[], |i| self.topology.faces_around(i))
    }

    /// Locate a point against face `f`: off-plane points are outside.
    pub fn locate(&self, f: usize, p: &Point3<Real>, epsilon: Real) -> RingPosition {
        if self.mesh.faces[f].plane.signed_distance(p).abs() > epsilon {
            return RingPosition::Outside;
        }
        let geom = &self.geoms[f];
        locate_in_ring(&geom.ring, geom.projection.project(p), epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_reverse_edges() {
        let cube = Mesh::<()>::cube(1.0, None);
        let operand = Operand::new(Side::B, &cube, 10, &CsgConfig::default());

        assert_eq!(operand.vertex_id(3), VertexId(13));
        assert_eq!(operand.local(VertexId(13)), Some(3));
        assert_eq!(operand.local(VertexId(2)), None);
        assert_eq!(operand.local(VertexId(18)), None);

        for f in 0..operand.face_count() {
            for (edge, s, t) in operand.face_edges(f) {
                let rev = operand.reverse(edge).unwrap();
                assert_ne!(rev.face, edge.face);
                assert_eq!(operand.edge_vertices(rev), (t, s));
            }
        }
        assert_eq!(operand.faces_around(VertexId(10)).len(), 3);
    }

    #[test]
    fn locate_on_face() {
        let cube = Mesh::<()>::cube(1.0, None);
        let operand = Operand::new(Side::A, &cube, 0, &CsgConfig::default());
        let top = (0..operand.face_count())
            .find(|&f| operand.face(f).plane.normal.z > 0.5)
            .unwrap();
        let eps = 1e-9;
        assert_eq!(
            operand.locate(top, &Point3::new(0.5, 0.5, 1.0), eps),
            RingPosition::Inside
        );
        assert_eq!(
            operand.locate(top, &Point3::new(1.0, 0.5, 1.0), eps),
            RingPosition::Boundary
        );
        assert_eq!(
            operand.locate(top, &Point3::new(0.5, 0.5, 1.1), eps),
            RingPosition::Outside
        );
    }
}
