use crate::csg::ids::{Side, VertexId};
use crate::float_types::Real;
use nalgebra::Point3;

/// Where a pooled vertex came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexOrigin {
    /// Vertex `index` of operand `side`
    Input(Side, u32),
    /// Created by an edge-edge or edge-face intersection
    Intersection,
}

/// Per-operation vertex arena.
///
/// Operand A's vertices occupy the first slots, operand B's follow, and intersection
/// vertices are appended after both. [`reset`](VertexPool::reset) starts a new operation.
#[derive(Debug, Clone, Default)]
pub struct VertexPool {
    positions: Vec<Point3<Real>>,
    origins: Vec<VertexOrigin>,
    b_offset: u32,
}

impl VertexPool {
    pub const fn new() -> Self {
        VertexPool {
            positions: Vec::new(),
            origins: Vec::new(),
            b_offset: 0,
        }
    }

    /// Discard everything and load the two operands' vertices.
    pub fn reset(&mut self, a: &[Point3<Real>], b: &[Point3<Real>]) {
        self.positions.clear();
        self.origins.clear();
        self.positions.reserve(a.len() + b.len());
        self.origins.reserve(a.len() + b.len());

        self.positions.extend_from_slice(a);
        self.origins
            .extend((0..a.len() as u32).map(|i| VertexOrigin::Input(Side::A, i)));
        self.b_offset = a.len() as u32;
        self.positions.extend_from_slice(b);
        self.origins
            .extend((0..b.len() as u32).map(|i| VertexOrigin::Input(Side::B, i)));
    }

    /// Pool id of an operand vertex.
    #[inline]
    pub const fn input(&self, side: Side, index: usize) -> VertexId {
        match side {
            Side::A => VertexId(index as u32),
            Side::B => VertexId(self.b_offset + index as u32),
        }
    }

    /// Append a new intersection vertex.
    pub fn alloc(&mut self, position: Point3<Real>) -> VertexId {
        let id = VertexId(self.positions.len() as u32);
        self.positions.push(position);
        self.origins.push(VertexOrigin::Intersection);
        id
    }

    #[inline]
    pub fn position(&self, id: VertexId) -> &Point3<Real> {
        &self.positions[id.index()]
    }

    #[inline]
    pub fn origin(&self, id: VertexId) -> VertexOrigin {
        self.origins[id.index()]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of vertices created by intersections in the current operation.
    pub fn intersection_count(&self) -> usize {
        self.origins
            .iter()
            .filter(|o| matches!(o, VertexOrigin::Intersection))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_laid_out_by_operand() {
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let b = [Point3::new(2.0, 0.0, 0.0)];
        let mut pool = VertexPool::new();
        pool.reset(&a, &b);

        let vb = pool.input(Side::B, 0);
        assert_eq!(vb, VertexId(2));
        assert_eq!(pool.origin(vb), VertexOrigin::Input(Side::B, 0));

        let fresh = pool.alloc(Point3::new(5.0, 5.0, 5.0));
        assert_eq!(fresh, VertexId(3));
        assert_eq!(pool.intersection_count(), 1);

        pool.reset(&a, &[]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.intersection_count(), 0);
    }
}
