//! Validation and boolean-operation errors

use crate::float_types::Real;
use nalgebra::Point3;
use std::fmt::Display;

/// Problems found while building an input [`Mesh`](crate::mesh::Mesh)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// (TooFewPoints) A face has fewer than three vertices
    TooFewPoints { face: usize, count: usize },
    /// (IndexOutOfRange) A face references a vertex that does not exist
    IndexOutOfRange { face: usize, index: usize, vertex_count: usize },
    /// (InvalidCoordinate) The coordinate has a NaN or infinite
    InvalidCoordinate(Point3<Real>),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::TooFewPoints { face, count } => write!(
                f,
                "(TooFewPoints) Face {} has {} vertices, at least 3 are required",
                face, count
            ),
            ValidationError::IndexOutOfRange {
                face,
                index,
                vertex_count,
            } => write!(
                f,
                "(IndexOutOfRange) Face {} index {} is out of range (points.len = {})",
                face, index, vertex_count
            ),
            ValidationError::InvalidCoordinate(opoint) => write!(
                f,
                "(InvalidCoordinate) The coordinate ({}) has a NaN or infinite",
                opoint
            ),
        }
    }
}

/// Fatal conditions that abort a boolean operation.
///
/// Degraded-but-recoverable outcomes (unclassified groups, integrity mismatches) are not
/// errors; they are logged and counted in [`CsgStats`](crate::csg::CsgStats).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CsgError {
    /// Edge-edge closest approach could not be computed because an edge has zero length
    #[error("degenerate edge between {start} and {end}")]
    DegenerateEdge {
        start: Point3<Real>,
        end: Point3<Real>,
    },

    /// A hole produced while splitting a face lies inside none of the face's loops
    #[error("hole near {point} is not contained by any loop of face {face}")]
    UncontainedHole { face: usize, point: Point3<Real> },

    /// A face group touching nothing could not be placed inside or outside the other mesh
    #[error("non intersecting group is not IN or OUT!")]
    UnclassifiableGroup,

    /// `slice_and_classify` was given an operand with boundary edges as its closed operand
    #[error("the closed operand has {boundary_edges} boundary edges")]
    NotClosed { boundary_edges: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
