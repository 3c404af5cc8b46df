//! Half-edge adjacency derived from an indexed [`Mesh`].

use crate::mesh::Mesh;
use hashbrown::HashMap;
use std::fmt::Debug;

/// One directed edge slot: the `edge`-th edge of face `face`, running from
/// `indices[edge]` to `indices[edge + 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfEdge {
    pub face: usize,
    pub edge: usize,
}

/// Adjacency of a mesh: directed edge slots, reverse twins and vertex fans.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    half_edges: HashMap<(usize, usize), Vec<HalfEdge>>,
    vertex_faces: Vec<Vec<usize>>,
}

impl Topology {
    pub fn build<S: Clone + Send + Sync + Debug>(mesh: &Mesh<S>) -> Self {
        let mut half_edges: HashMap<(usize, usize), Vec<HalfEdge>> =
            HashMap::with_capacity(mesh.faces.len() * 4);
        let mut vertex_faces = vec![Vec::new(); mesh.vertices.len()];

        for (face_index, face) in mesh.faces.iter().enumerate() {
            for edge in 0..face.len() {
                half_edges
                    .entry(face.edge(edge))
                    .or_default()
                    .push(HalfEdge {
                        face: face_index,
                        edge,
                    });
                let fan: &mut Vec<usize> = &mut vertex_faces[face.indices[edge]];
                if fan.last() != Some(&face_index) {
                    fan.push(face_index);
                }
            }
        }

        for fan in &mut vertex_faces {
            fan.sort_unstable();
            fan.dedup();
        }

        Topology {
            half_edges,
            vertex_faces,
        }
    }

    /// Faces that use vertex `v`, ascending.
    pub fn faces_around(&self, v: usize) -> &[usize] {
        self.vertex_faces.get(v).map_or(&[], Vec::as_slice)
    }

    /// The opposite half-edge of the directed edge `start -> end`, if any face
    /// traverses `end -> start`. With non-manifold fans the lowest face wins.
    pub fn reverse(&self, start: usize, end: usize) -> Option<HalfEdge> {
        self.half_edges
            .get(&(end, start))
            .and_then(|slots| slots.iter().min().copied())
    }

    /// Number of directed edges whose twin is missing or ambiguous.
    pub fn boundary_edge_count(&self) -> usize {
        self.half_edges
            .iter()
            .filter(|&(&(a, b), slots)| {
                slots.len() != 1 || self.half_edges.get(&(b, a)).map_or(0, Vec::len) != 1
            })
            .count()
    }

    /// A closed, consistently oriented 2-manifold surface.
    pub fn is_closed(&self) -> bool {
        self.boundary_edge_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_closed() {
        let cube = Mesh::<()>::cube(1.0, None);
        let topology = Topology::build(&cube);
        assert!(topology.is_closed());
        assert_eq!(topology.faces_around(0).len(), 3);
        let twin = topology.reverse(0, 3).unwrap();
        assert_eq!(cube.faces[twin.face].edge(twin.edge), (3, 0));
    }

    #[test]
    fn open_box_has_boundary() {
        let mut cube = Mesh::<()>::cube(1.0, None);
        cube.faces.pop();
        let topology = Topology::build(&cube);
        assert!(!topology.is_closed());
        assert_eq!(topology.boundary_edge_count(), 4);
    }
}
