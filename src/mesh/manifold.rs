use crate::mesh::Mesh;
use hashbrown::HashMap;
use std::fmt::Debug;

impl<S: Clone + Debug + Send + Sync> Mesh<S> {
    /// Checks if the Mesh object is manifold
    ///
    /// ### Returns
    /// Returns `true` if every undirected edge is used exactly once in each direction
    ///
    /// ### Notes:
    /// - This also checks that all faces have consistent orientation and no neighbors
    ///   have flipped normals.
    /// - Works on vertex indices, so coincident but unshared vertices count as distinct.
    /// - An empty mesh is trivially manifold.
    pub fn is_manifold(&self) -> bool {
        let mut edge_counts: HashMap<(usize, usize), (u32, u32)> = HashMap::new();

        for face in &self.faces {
            for i in 0..face.len() {
                let (a, b) = face.edge(i);
                if a == b {
                    return false;
                }
                // Order them so (a, b) and (b, a) become the same key
                let counts = edge_counts.entry((a.min(b), a.max(b))).or_insert((0, 0));
                if a < b {
                    counts.0 += 1;
                } else {
                    counts.1 += 1;
                }
            }
        }

        edge_counts.values().all(|&counts| counts == (1, 1))
    }
}

#[cfg(test)]
mod tests {
    use crate::mesh::Mesh;

    #[test]
    fn cube_is_manifold() {
        assert!(Mesh::<()>::cube(1.0, None).is_manifold());
    }

    #[test]
    fn flipped_face_breaks_manifold() {
        let mut cube = Mesh::<()>::cube(1.0, None);
        cube.faces[0].flip();
        assert!(!cube.is_manifold());
    }
}
