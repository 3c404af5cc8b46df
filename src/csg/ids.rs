//! Arena indices naming the primitives of one boolean operation.
//!
//! Vertices of both operands and every intersection vertex live in one
//! [`VertexPool`](super::vertex_pool::VertexPool), so a single [`VertexId`] space is shared by
//! the whole pipeline. Faces and edges stay relative to their operand.

/// Which operand a primitive belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    A,
    B,
}

impl Side {
    #[inline]
    pub const fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub const BOTH: [Side; 2] = [Side::A, Side::B];
}

/// Slot of a vertex in the per-operation pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl VertexId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A face of one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceRef {
    pub side: Side,
    pub face: u32,
}

impl FaceRef {
    #[inline]
    pub const fn new(side: Side, face: usize) -> Self {
        FaceRef {
            side,
            face: face as u32,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.face as usize
    }
}

/// A directed half-edge: the `edge`-th edge of `face`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeRef {
    pub face: FaceRef,
    pub edge: u32,
}

impl EdgeRef {
    #[inline]
    pub const fn new(face: FaceRef, edge: usize) -> Self {
        EdgeRef {
            face,
            edge: edge as u32,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.edge as usize
    }
}

/// What part of an operand took part in an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IObj {
    Vertex(VertexId),
    Edge(EdgeRef),
    Face(FaceRef),
}

/// An undirected vertex pair, lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(pub VertexId, pub VertexId);

impl EdgeKey {
    #[inline]
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b { EdgeKey(a, b) } else { EdgeKey(b, a) }
    }

    /// True when `a -> b` runs in key order.
    #[inline]
    pub fn is_forward(&self, a: VertexId) -> bool {
        self.0 == a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_unordered() {
        let (a, b) = (VertexId(7), VertexId(3));
        assert_eq!(EdgeKey::new(a, b), EdgeKey::new(b, a));
        assert!(EdgeKey::new(a, b).is_forward(b));
        assert!(!EdgeKey::new(a, b).is_forward(a));
    }

    #[test]
    fn side_other() {
        assert_eq!(Side::A.other(), Side::B);
        assert_eq!(Side::B.other().index(), 0);
    }
}
