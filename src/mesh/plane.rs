//! Face planes and the axis-dominant 2D projection used for every in-plane test.

use crate::float_types::Real;
use geo::Coord;
use nalgebra::{Point3, Vector3};

// Plane classification constants
pub const COPLANAR: i8 = 0;
pub const FRONT: i8 = 1;
pub const BACK: i8 = 2;
pub const SPANNING: i8 = 3;

/// An oriented plane `n·p = w` with unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Plane {
    /// Create a new plane from normal vector and distance
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < Real::EPSILON {
            return Plane {
                normal: Vector3::z(),
                w: 0.0,
            };
        }
        Plane {
            normal: normal / len,
            w: w / len,
        }
    }

    /// **Newell's method**: fit a plane to a polygon loop.
    ///
    /// Sums the projected areas of the loop onto the three coordinate planes, which is
    /// exact for planar polygons of any shape and well behaved for nearly planar ones.
    /// The normal follows the right-hand rule of the loop order. Degenerate loops fall back
    /// to `+Z` through the origin.
    pub fn from_loop<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3<Real>>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let mut normal = Vector3::zeros();
        let mut centroid = Vector3::zeros();
        let mut count = 0usize;

        let mut next = iter.clone().cycle().skip(1);
        for current in iter {
            let Some(following) = next.next() else {
                break;
            };
            normal.x += (current.y - following.y) * (current.z + following.z);
            normal.y += (current.z - following.z) * (current.x + following.x);
            normal.z += (current.x - following.x) * (current.y + following.y);
            centroid += current.coords;
            count += 1;
        }

        if count < 3 || normal.norm_squared() < Real::EPSILON * Real::EPSILON {
            return Plane {
                normal: Vector3::z(),
                w: 0.0,
            };
        }

        let normal = normal.normalize();
        let centroid = centroid / count as Real;
        Plane {
            normal,
            w: normal.dot(&centroid),
        }
    }

    /// Signed distance of `point` from the plane, positive on the normal side.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Same plane, opposite orientation.
    #[inline]
    pub fn flipped(&self) -> Self {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Classify a point against the plane using `epsilon` as the coplanar band.
    pub fn orient_point(&self, point: &Point3<Real>, epsilon: Real) -> i8 {
        let d = self.signed_distance(point);
        if d > epsilon {
            FRONT
        } else if d < -epsilon {
            BACK
        } else {
            COPLANAR
        }
    }

    /// Classify a set of points against the plane: all on one side, all within the band,
    /// or spanning.
    pub fn orient_points<'a, I>(&self, points: I, epsilon: Real) -> i8
    where
        I: IntoIterator<Item = &'a Point3<Real>>,
    {
        points
            .into_iter()
            .fold(COPLANAR, |acc, p| acc | self.orient_point(p, epsilon))
    }

    /// True when both planes have parallel normals and (possibly flipped) equal offsets.
    pub fn is_coplanar_with(&self, other: &Plane, epsilon: Real) -> bool {
        let dot = self.normal.dot(&other.normal);
        if (dot.abs() - 1.0).abs() > epsilon {
            return false;
        }
        (self.w - dot.signum() * other.w).abs() <= epsilon
    }

    /// The axis-dominant projection for this plane.
    pub fn projection(&self) -> Projection {
        let n = self.normal;
        let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
        let axis = if ax >= ay && ax >= az {
            0
        } else if ay >= az {
            1
        } else {
            2
        };
        Projection {
            axis,
            flip: n[axis] < 0.0,
        }
    }
}

/// Drops the dominant axis of a plane normal so that loops wound counter-clockwise
/// around the normal stay counter-clockwise in 2D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    axis: usize,
    flip: bool,
}

impl Projection {
    #[inline]
    const fn axes(&self) -> (usize, usize) {
        ((self.axis + 1) % 3, (self.axis + 2) % 3)
    }

    /// Project a 3D point into the plane's 2D frame.
    #[inline]
    pub fn project(&self, point: &Point3<Real>) -> Coord<Real> {
        let (u, v) = self.axes();
        if self.flip {
            Coord {
                x: point[v],
                y: point[u],
            }
        } else {
            Coord {
                x: point[u],
                y: point[v],
            }
        }
    }

    /// Lift a 2D point back onto `plane`.
    pub fn unproject(&self, coord: Coord<Real>, plane: &Plane) -> Point3<Real> {
        let (u, v) = self.axes();
        let (cu, cv) = if self.flip {
            (coord.y, coord.x)
        } else {
            (coord.x, coord.y)
        };
        let mut point = Point3::origin();
        point[u] = cu;
        point[v] = cv;
        let n = plane.normal;
        point[self.axis] = (plane.w - n[u] * cu - n[v] * cv) / n[self.axis];
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn newell_square() {
        let pts = [
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(1.0, 1.0, 2.0),
            Point3::new(0.0, 1.0, 2.0),
        ];
        let plane = Plane::from_loop(pts.iter());
        assert_relative_eq!(plane.normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(plane.w, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_loop_falls_back() {
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let plane = Plane::from_loop(pts.iter());
        assert_eq!(plane.normal, Vector3::z());
    }

    #[test]
    fn projection_keeps_winding() {
        // Counter-clockwise around -X seen from the -X side.
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let plane = Plane::from_loop(pts.iter());
        assert_relative_eq!(plane.normal, -Vector3::x(), epsilon = 1e-12);
        let proj = plane.projection();
        let coords: Vec<Coord<Real>> = pts.iter().map(|p| proj.project(p)).collect();
        let mut area = 0.0;
        for i in 0..coords.len() {
            let a = coords[i];
            let b = coords[(i + 1) % coords.len()];
            area += a.x * b.y - b.x * a.y;
        }
        assert!(area > 0.0);
    }

    #[test]
    fn unproject_inverts_project() {
        let plane = Plane::from_normal(Vector3::new(1.0, 2.0, -3.0), 4.0);
        let proj = plane.projection();
        let p = Point3::new(0.3, 0.7, 0.0);
        let c = proj.project(&p);
        let lifted = proj.unproject(c, &plane);
        assert_relative_eq!(plane.signed_distance(&lifted), 0.0, epsilon = 1e-12);
        assert_relative_eq!(proj.project(&lifted).x, c.x, epsilon = 1e-12);
        assert_relative_eq!(proj.project(&lifted).y, c.y, epsilon = 1e-12);
    }

    #[test]
    fn orient_points_spanning() {
        let plane = Plane::from_normal(Vector3::z(), 0.0);
        let pts = [Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, -1.0)];
        assert_eq!(plane.orient_points(pts.iter(), 1e-9), SPANNING);
        assert_eq!(plane.orient_points(pts[..1].iter(), 1e-9), FRONT);
        assert!(plane.is_coplanar_with(&plane.flipped(), 1e-9));
    }
}
