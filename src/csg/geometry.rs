//! Epsilon-bounded geometric predicates shared by the intersection and loop stages.

use crate::float_types::parry3d::bounding_volume::{Aabb, BoundingVolume};
use crate::float_types::{Real, TAU};
use crate::mesh::plane::{BACK, FRONT, Plane};
use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Coord, Line, LineString, Polygon as GeoPolygon};
use nalgebra::Point3;

/// Where a 2D point lies relative to a ring, with an epsilon-wide boundary band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingPosition {
    Inside,
    Boundary,
    Outside,
}

/// Close a loop of 2D points into a geo polygon without holes.
pub fn ring_polygon(coords: Vec<Coord<Real>>) -> GeoPolygon<Real> {
    GeoPolygon::new(LineString::new(coords), Vec::new())
}

/// Signed area of a 2D loop, positive when counter-clockwise.
pub fn signed_area(coords: &[Coord<Real>]) -> Real {
    if coords.len() < 3 {
        return 0.0;
    }
    ring_polygon(coords.to_vec()).signed_area()
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Coord<Real>, a: Coord<Real>, b: Coord<Real>) -> Real {
    let d = b - a;
    let len2 = d.x * d.x + d.y * d.y;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * d.x + (p.y - a.y) * d.y) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let q = Coord {
        x: a.x + d.x * t,
        y: a.y + d.y * t,
    };
    ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt()
}

/// Locate `p` against `polygon`; points within `epsilon` of any edge are on the boundary.
pub fn locate_in_ring(polygon: &GeoPolygon<Real>, p: Coord<Real>, epsilon: Real) -> RingPosition {
    let near_edge = polygon
        .exterior()
        .lines()
        .any(|line| point_segment_distance(p, line.start, line.end) <= epsilon);
    if near_edge {
        return RingPosition::Boundary;
    }
    match polygon.coordinate_position(&p) {
        CoordPos::Inside => RingPosition::Inside,
        CoordPos::OnBoundary => RingPosition::Boundary,
        CoordPos::Outside => RingPosition::Outside,
    }
}

/// True when the open segments `a`-`b` and `c`-`d` share a point other than a common
/// endpoint, including collinear overlap.
pub fn segments_conflict(a: Coord<Real>, b: Coord<Real>, c: Coord<Real>, d: Coord<Real>) -> bool {
    match line_intersection(Line::new(a, b), Line::new(c, d)) {
        None => false,
        Some(LineIntersection::Collinear { .. }) => true,
        Some(LineIntersection::SinglePoint {
            intersection,
            is_proper,
        }) => is_proper || (intersection != a && intersection != b),
    }
}

/// Counter-clockwise angle of `v`, in `[0, TAU)`.
#[inline]
pub fn angle_of(v: Coord<Real>) -> Real {
    v.y.atan2(v.x).rem_euclid(TAU)
}

/// Counter-clockwise sweep from direction `from` to direction `to`, in `[0, TAU)`.
#[inline]
pub fn ccw_sweep(from: Real, to: Real) -> Real {
    (to - from).rem_euclid(TAU)
}

/// Union of two boxes.
#[inline]
pub fn merged(a: &Aabb, b: &Aabb) -> Aabb {
    a.merged(b)
}

/// Box overlap after inflating `a` by `epsilon`.
#[inline]
pub fn boxes_overlap(a: &Aabb, b: &Aabb, epsilon: Real) -> bool {
    a.loosened(epsilon).intersects(b)
}

/// Whether `p` lies within `epsilon` of the box.
#[inline]
pub fn box_contains(aabb: &Aabb, p: &Point3<Real>, epsilon: Real) -> bool {
    (0..3).all(|i| p[i] >= aabb.mins[i] - epsilon && p[i] <= aabb.maxs[i] + epsilon)
}

/// Bounds of a segment.
#[inline]
pub fn segment_box(a: &Point3<Real>, b: &Point3<Real>) -> Aabb {
    Aabb::new(a.inf(b), a.sup(b))
}

/// Outcome of the closest-approach computation between two segments' supporting lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayRay {
    /// Lines pass within epsilon at parameters `mu_a`, `mu_b`; `point` is the midpoint
    /// of the two closest points.
    Intersecting {
        mu_a: Real,
        mu_b: Real,
        point: Point3<Real>,
    },
    Parallel,
    /// One of the segments has zero length.
    Degenerate,
    /// Skew lines further apart than epsilon.
    None,
}

/// Closest approach of the lines through `a1`-`a2` and `b1`-`b2`.
pub fn ray_ray_intersection(
    a1: &Point3<Real>,
    a2: &Point3<Real>,
    b1: &Point3<Real>,
    b2: &Point3<Real>,
    epsilon: Real,
) -> RayRay {
    let p13 = a1 - b1;
    let p43 = b2 - b1;
    let p21 = a2 - a1;

    let d4343 = p43.norm_squared();
    let d2121 = p21.norm_squared();
    if d4343 <= Real::EPSILON * Real::EPSILON || d2121 <= Real::EPSILON * Real::EPSILON {
        return RayRay::Degenerate;
    }

    let d1343 = p13.dot(&p43);
    let d4321 = p43.dot(&p21);
    let d1321 = p13.dot(&p21);

    let denom = d2121 * d4343 - d4321 * d4321;
    if denom.abs() <= Real::EPSILON * d2121 * d4343 {
        return RayRay::Parallel;
    }

    let mu_a = (d1343 * d4321 - d1321 * d4343) / denom;
    let mu_b = (d1343 + d4321 * mu_a) / d4343;

    let pa = a1 + p21 * mu_a;
    let pb = b1 + p43 * mu_b;
    if (pa - pb).norm_squared() >= epsilon * epsilon {
        return RayRay::None;
    }

    RayRay::Intersecting {
        mu_a,
        mu_b,
        point: nalgebra::center(&pa, &pb),
    }
}

/// Whether `p` lies within `epsilon` of the open segment `a`-`b`.
pub fn point_on_segment(p: &Point3<Real>, a: &Point3<Real>, b: &Point3<Real>, epsilon: Real) -> bool {
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 <= Real::EPSILON * Real::EPSILON {
        return false;
    }
    let ap = p - a;
    let t = ap.dot(&d) / len2;
    if t <= 0.0 || t >= 1.0 {
        return false;
    }
    ap.cross(&d).norm_squared() < epsilon * epsilon * len2
}

/// Where the segment `p1`-`p2` crosses `plane`, if its endpoints lie strictly on opposite
/// sides of the epsilon band.
pub fn segment_plane_crossing(
    p1: &Point3<Real>,
    p2: &Point3<Real>,
    plane: &Plane,
    epsilon: Real,
) -> Option<Point3<Real>> {
    let o1 = plane.orient_point(p1, epsilon);
    let o2 = plane.orient_point(p2, epsilon);
    let spanning = (o1 == FRONT && o2 == BACK) || (o1 == BACK && o2 == FRONT);
    if !spanning {
        return None;
    }
    let d1 = plane.signed_distance(p1);
    let d2 = plane.signed_distance(p2);
    let t = d1 / (d1 - d2);
    Some(p1 + (p2 - p1) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_square() -> GeoPolygon<Real> {
        ring_polygon(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 1.0 },
        ])
    }

    #[test]
    fn ring_location_uses_band() {
        let square = unit_square();
        assert_eq!(
            locate_in_ring(&square, Coord { x: 0.5, y: 0.5 }, 1e-9),
            RingPosition::Inside
        );
        assert_eq!(
            locate_in_ring(&square, Coord { x: 0.5, y: 1e-12 }, 1e-9),
            RingPosition::Boundary
        );
        assert_eq!(
            locate_in_ring(&square, Coord { x: 2.0, y: 0.5 }, 1e-9),
            RingPosition::Outside
        );
    }

    #[test]
    fn crossing_lines_meet_midway() {
        let hit = ray_ray_intersection(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
            &Point3::new(1.0, -1.0, 0.0),
            &Point3::new(1.0, 1.0, 0.0),
            1e-9,
        );
        match hit {
            RayRay::Intersecting { mu_a, mu_b, point } => {
                assert_relative_eq!(mu_a, 0.5, epsilon = 1e-12);
                assert_relative_eq!(mu_b, 0.5, epsilon = 1e-12);
                assert_relative_eq!(point, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ray_ray_outcomes() {
        let o = Point3::origin();
        let x = Point3::new(1.0, 0.0, 0.0);
        assert_eq!(
            ray_ray_intersection(&o, &x, &Point3::new(0.0, 1.0, 0.0), &Point3::new(1.0, 1.0, 0.0), 1e-9),
            RayRay::Parallel
        );
        assert_eq!(ray_ray_intersection(&o, &o, &o, &x, 1e-9), RayRay::Degenerate);
        assert_eq!(
            ray_ray_intersection(&o, &x, &Point3::new(0.5, -1.0, 1.0), &Point3::new(0.5, 1.0, 1.0), 1e-9),
            RayRay::None
        );
    }

    #[test]
    fn segment_crosses_plane() {
        let plane = Plane::from_normal(Vector3::z(), 0.5);
        let hit = segment_plane_crossing(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
            &plane,
            1e-9,
        );
        assert_relative_eq!(hit.unwrap(), Point3::new(0.0, 0.0, 0.5), epsilon = 1e-12);

        // touching the plane at an endpoint is not a crossing
        assert!(segment_plane_crossing(
            &Point3::new(0.0, 0.0, 0.5),
            &Point3::new(0.0, 0.0, 1.0),
            &plane,
            1e-9
        )
        .is_none());
    }

    #[test]
    fn point_on_open_segment() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        assert!(point_on_segment(&Point3::new(1.0, 1e-12, 0.0), &a, &b, 1e-9));
        assert!(!point_on_segment(&Point3::new(1.0, 1e-3, 0.0), &a, &b, 1e-9));
        assert!(!point_on_segment(&b, &a, &b, 1e-9));
    }

    #[test]
    fn conflicts_ignore_shared_endpoints() {
        let o = Coord { x: 0.0, y: 0.0 };
        let a = Coord { x: 1.0, y: 0.0 };
        let b = Coord { x: 0.0, y: 1.0 };
        assert!(!segments_conflict(o, a, o, b));
        assert!(segments_conflict(
            Coord { x: -1.0, y: 0.5 },
            Coord { x: 1.0, y: 0.5 },
            o,
            b
        ));
        assert!(segments_conflict(o, a, Coord { x: 0.5, y: 0.0 }, Coord { x: 2.0, y: 0.0 }));
    }

    #[test]
    fn sweep_wraps() {
        assert_relative_eq!(ccw_sweep(TAU - 0.1, 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(angle_of(Coord { x: 0.0, y: -1.0 }), 0.75 * TAU, epsilon = 1e-12);
        assert_relative_eq!(signed_area(&[
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 1.0 },
        ]), 0.5, epsilon = 1e-12);
    }
}
