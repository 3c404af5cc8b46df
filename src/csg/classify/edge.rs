//! Dihedral-angle voting around the intersection curve, and the residual pass that places
//! groups the votes could not settle.

use super::{Classifier, FaceClass, SideView};
use crate::csg::face_loops::LoopId;
use crate::csg::geometry::{angle_of, ccw_sweep};
use crate::csg::grouping::FaceLoopGroup;
use crate::csg::ids::Side;
use crate::errors::CsgError;
use crate::float_types::{ANGLE_TOLERANCE, Real};
use geo::Coord;
use nalgebra::{Point3, Vector3};
use std::cmp::Ordering;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Vote slots, in bit order.
const SLOTS: [FaceClass; 4] = [
    FaceClass::OnOrientOut,
    FaceClass::Out,
    FaceClass::In,
    FaceClass::OnOrientIn,
];

/// Orthonormal frame around one shared edge: `e` along the edge, angles measured
/// counter-clockwise from `b1` towards `b2` looking down `e`.
struct EdgeFrame {
    e: Vector3<Real>,
    b1: Vector3<Real>,
    b2: Vector3<Real>,
}

impl EdgeFrame {
    fn new(from: &Point3<Real>, to: &Point3<Real>) -> Option<Self> {
        let e = (to - from).try_normalize(Real::EPSILON)?;
        // any axis far from `e` gives a usable perpendicular
        let axis = if e.x.abs() < 0.5 {
            Vector3::x()
        } else if e.y.abs() < 0.5 {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let b1 = e.cross(&axis).normalize();
        let b2 = e.cross(&b1);
        Some(EdgeFrame { e, b1, b2 })
    }

    /// Angle of the direction pointing from the edge into the loop's face, with the face
    /// normal. `forward` loops walk the edge along `e`.
    fn angle<S: Clone + Send + Sync + Debug>(
        &self,
        view: &SideView<'_, '_, S>,
        id: LoopId,
        forward: bool,
    ) -> (Real, Vector3<Real>) {
        let orig = view.loops.get(id).orig.index();
        let n = view.operand.face(orig).plane.normal;
        let t = if forward { self.e } else { -self.e };
        let into_face = n.cross(&t);
        let theta = angle_of(Coord {
            x: into_face.dot(&self.b1),
            y: into_face.dot(&self.b2),
        });
        (theta, n)
    }
}

fn angles_close(a: Real, b: Real) -> bool {
    ccw_sweep(a, b).min(ccw_sweep(b, a)) < ANGLE_TOLERANCE
}

fn single(ids: Option<&Vec<LoopId>>) -> Option<LoopId> {
    match ids.map(Vec::as_slice) {
        Some(&[id]) => Some(id),
        _ => None,
    }
}

/// Collapse a vote histogram into one class, if the votes allow it.
fn decide(histogram: &[u32; 4]) -> Option<FaceClass> {
    let mut votes = *histogram;
    let (out, inside) = (1, 2);
    if votes[out] > 0 && votes[inside] > 0 {
        match votes[inside].cmp(&votes[out]) {
            Ordering::Greater => votes[out] = 0,
            Ordering::Less => votes[inside] = 0,
            Ordering::Equal => return None,
        }
    }
    let bits = SLOTS
        .iter()
        .zip(votes)
        .filter(|&(_, count)| count > 0)
        .fold(0u8, |bits, (class, _)| bits | class.bit());
    match FaceClass::from_bits(bits) {
        FaceClass::Unclassified => None,
        class => Some(class),
    }
}

impl<S: Clone + Send + Sync + Debug> Classifier<'_, '_, S> {
    /// For every shared edge where the other operand has exactly one loop on each side,
    /// place each of `me`'s loops on the edge inside, outside or on the other solid's
    /// wedge, and vote for the loop's group.
    pub(super) fn classify_by_dihedral_votes(&mut self, me: Side, groups: &mut [FaceLoopGroup]) {
        let (mine, other) = (self.view(me), self.view(me.other()));
        let mut histograms = vec![[0u32; 4]; groups.len()];

        for key in self.shared {
            let (u, w) = (key.0, key.1);
            let Some(frame) = EdgeFrame::new(self.pool.position(u), self.pool.position(w)) else {
                continue;
            };
            let (Some(ref_fwd), Some(ref_rev)) =
                (single(other.edges.get(&(u, w))), single(other.edges.get(&(w, u))))
            else {
                continue;
            };
            let (theta_f, n_f) = frame.angle(&other, ref_fwd, true);
            let (theta_r, n_r) = frame.angle(&other, ref_rev, false);
            let wedge = ccw_sweep(theta_r, theta_f);

            for (edge, forward) in [((u, w), true), ((w, u), false)] {
                for &id in mine.edges.get(&edge).into_iter().flatten() {
                    let Some(gi) = mine.loops.get(id).group else {
                        continue;
                    };
                    let (theta, n) = frame.angle(&mine, id, forward);
                    let class = if angles_close(theta, theta_f) {
                        orientation(&n, &n_f)
                    } else if angles_close(theta, theta_r) {
                        orientation(&n, &n_r)
                    } else if ccw_sweep(theta_r, theta) < wedge {
                        FaceClass::In
                    } else {
                        FaceClass::Out
                    };
                    let slot = SLOTS.iter().position(|&c| c == class).unwrap_or(1);
                    histograms[gi][slot] += 1;
                }
            }
        }

        self.voted[me.index()] = histograms.iter().map(|h| h.iter().any(|&c| c > 0)).collect();
        let mut decided = 0;
        for (group, histogram) in groups.iter_mut().zip(&histograms) {
            if group.is_resolved() {
                continue;
            }
            if let Some(class) = decide(histogram) {
                group.classify(Some(me.other()), class);
                decided += 1;
            }
        }
        debug!("{:?}: {} groups decided by dihedral votes", me, decided);
    }

    /// Vertices, then edge midpoints, then loop interior points for every group still open.
    ///
    /// A group that got dihedral votes but no verdict stays unclassified; one that never
    /// touched the intersection curve must be placed or the operation fails.
    pub(super) fn classify_residual(
        &mut self,
        me: Side,
        groups: &mut [FaceLoopGroup],
    ) -> Result<(), CsgError> {
        for (gi, group) in groups.iter_mut().enumerate() {
            if group.is_resolved() {
                continue;
            }
            let class = match self.by_vertices(me, group) {
                Some(class) => Some(class),
                None => self.by_midpoints(me, group).or_else(|| {
                    group
                        .loops
                        .iter()
                        .find_map(|&id| self.by_interior_point(me, id))
                }),
            };
            match class {
                Some(class) => {
                    debug!("{:?}: residual group {} classified {:?}", me, gi, class);
                    group.classify(Some(me.other()), class);
                },
                None if self.voted[me.index()].get(gi).copied().unwrap_or(false) => {
                    warn!("{:?}: group {} has conflicting votes and no clear sample", me, gi);
                },
                None => return Err(CsgError::UnclassifiableGroup),
            }
        }
        Ok(())
    }
}

fn orientation(n: &Vector3<Real>, reference: &Vector3<Real>) -> FaceClass {
    if n.dot(reference) > 0.0 {
        FaceClass::OnOrientOut
    } else {
        FaceClass::OnOrientIn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_settles_in_against_out() {
        assert_eq!(decide(&[0, 3, 1, 0]), Some(FaceClass::Out));
        assert_eq!(decide(&[0, 1, 4, 0]), Some(FaceClass::In));
        assert_eq!(decide(&[0, 2, 2, 0]), None);
        assert_eq!(decide(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn mixed_on_votes_stay_open() {
        assert_eq!(decide(&[2, 0, 0, 0]), Some(FaceClass::OnOrientOut));
        assert_eq!(decide(&[1, 0, 0, 1]), None);
        assert_eq!(decide(&[1, 2, 0, 0]), None);
    }

    #[test]
    fn frame_is_right_handed() {
        let frame = EdgeFrame::new(&Point3::origin(), &Point3::new(0.0, 0.0, 2.0)).unwrap();
        let handed = frame.b1.cross(&frame.b2).dot(&frame.e);
        assert!((handed - 1.0).abs() < 1e-12);
        assert!(EdgeFrame::new(&Point3::origin(), &Point3::origin()).is_none());
    }

    #[test]
    fn near_angles_across_zero() {
        assert!(angles_close(0.0, crate::float_types::TAU - 1e-9));
        assert!(!angles_close(0.0, 0.1));
    }
}
