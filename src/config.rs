//! Configuration for boolean operations.

use crate::float_types::{Real, tolerance};
use std::fmt;

/// Selects which face-group classification pipeline runs after grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierKind {
    /// Coincident-loop matching, then vertex, edge-midpoint, perimeter and
    /// single-point fallbacks. Groups left unresolved are dropped and counted.
    #[default]
    Normal,

    /// Coincident-loop matching, then dihedral-angle voting around every shared edge,
    /// perimeter matching and residual vertex voting. Groups left unresolved stay
    /// unclassified and are dropped by every operation except [`BooleanOp::All`].
    Edge,
}

/// Configuration for a [`Csg`](crate::csg::Csg) engine.
///
/// # Example
///
/// ```
/// use polycsg::config::{ClassifierKind, CsgConfig};
///
/// let config = CsgConfig::default()
///     .with_epsilon(1e-8)
///     .with_classifier(ClassifierKind::Edge);
/// assert_eq!(config.classifier, ClassifierKind::Edge);
/// ```
#[derive(Debug, Clone)]
pub struct CsgConfig {
    /// Distance below which two primitives are considered to touch.
    pub epsilon: Real,

    /// Face-group classification pipeline.
    pub classifier: ClassifierKind,

    /// Children per interior R-tree node.
    pub rtree_fanout: usize,

    /// Faces per R-tree leaf.
    pub rtree_leaf_size: usize,

    /// Run the edge-parity check over the rebuilt face loops of both meshes.
    /// Mismatches are logged and counted, never fatal.
    pub check_integrity: bool,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            epsilon: tolerance(),
            classifier: ClassifierKind::Normal,
            rtree_fanout: 4,
            rtree_leaf_size: 4,
            check_integrity: true,
        }
    }
}

impl CsgConfig {
    /// Preset for CAD-quality input with exact shared coordinates.
    #[must_use]
    pub fn for_cad() -> Self {
        Self {
            epsilon: tolerance() * 0.01,
            ..Default::default()
        }
    }

    /// Preset for noisy input such as scanned or decimated meshes.
    #[must_use]
    pub fn for_scans() -> Self {
        Self {
            epsilon: tolerance() * 100.0,
            classifier: ClassifierKind::Edge,
            ..Default::default()
        }
    }

    /// Set the intersection epsilon.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: Real) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the classification pipeline.
    #[must_use]
    pub const fn with_classifier(mut self, classifier: ClassifierKind) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the R-tree fan-out and leaf size. Values below 2 are raised to 2.
    #[must_use]
    pub fn with_rtree_shape(mut self, fanout: usize, leaf_size: usize) -> Self {
        self.rtree_fanout = fanout.max(2);
        self.rtree_leaf_size = leaf_size.max(2);
        self
    }

    /// Enable or disable the face-loop integrity check.
    #[must_use]
    pub const fn with_integrity_check(mut self, check: bool) -> Self {
        self.check_integrity = check;
        self
    }
}

/// The six face-selection policies applied after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// Everything in A or B.
    Union,
    /// Everything in both A and B.
    Intersection,
    /// A with B removed.
    AMinusB,
    /// B with A removed.
    BMinusA,
    /// Everything in exactly one of A and B.
    SymmetricDifference,
    /// Every face of both meshes, unflipped, tagged with its classification.
    All,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "union"),
            Self::Intersection => write!(f, "intersection"),
            Self::AMinusB => write!(f, "a_minus_b"),
            Self::BMinusA => write!(f, "b_minus_a"),
            Self::SymmetricDifference => write!(f, "symmetric_difference"),
            Self::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CsgConfig::default();
        assert_eq!(config.classifier, ClassifierKind::Normal);
        assert_eq!(config.rtree_fanout, 4);
        assert_eq!(config.rtree_leaf_size, 4);
        assert!(config.check_integrity);
        assert!(config.epsilon > 0.0);
    }

    #[test]
    fn presets_scale_epsilon() {
        let base = CsgConfig::default().epsilon;
        assert!(CsgConfig::for_cad().epsilon < base);
        assert!(CsgConfig::for_scans().epsilon > base);
        assert_eq!(CsgConfig::for_scans().classifier, ClassifierKind::Edge);
    }

    #[test]
    fn builder_chain() {
        let config = CsgConfig::default()
            .with_epsilon(1e-3)
            .with_rtree_shape(1, 8)
            .with_integrity_check(false);
        assert!((config.epsilon - 1e-3).abs() < 1e-12);
        assert_eq!(config.rtree_fanout, 2);
        assert_eq!(config.rtree_leaf_size, 8);
        assert!(!config.check_integrity);
    }

    #[test]
    fn op_display() {
        assert_eq!(BooleanOp::Union.to_string(), "union");
        assert_eq!(BooleanOp::SymmetricDifference.to_string(), "symmetric_difference");
    }
}
