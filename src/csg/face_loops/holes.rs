//! Incorporating hole loops into the face loops that contain them.

use super::LoopFrame;
use crate::csg::geometry::{RingPosition, locate_in_ring, ring_polygon, segments_conflict};
use crate::csg::ids::VertexId;
use crate::errors::CsgError;
use crate::float_types::Real;
use geo::Coord;
use tracing::warn;

/// Attach every hole to the innermost face strictly containing it and bridge it in.
///
/// Fails with [`CsgError::UncontainedHole`] when some hole has no containing face.
pub(super) fn merge(
    face: usize,
    mut faces: Vec<Vec<VertexId>>,
    holes: Vec<Vec<VertexId>>,
    frame: &LoopFrame<'_>,
) -> Result<Vec<Vec<VertexId>>, CsgError> {
    if holes.is_empty() {
        return Ok(faces);
    }

    let polygons: Vec<_> = faces.iter().map(|f| frame.polygon(f)).collect();
    let areas: Vec<Real> = faces.iter().map(|f| frame.area(f).abs()).collect();
    let mut assigned: Vec<Vec<Vec<VertexId>>> = vec![Vec::new(); faces.len()];

    for mut hole in holes {
        let owner = hole.iter().find_map(|&v| {
            let p = frame.at(v);
            (0..faces.len())
                .filter(|&k| locate_in_ring(&polygons[k], p, frame.epsilon) == RingPosition::Inside)
                .min_by(|&x, &y| areas[x].total_cmp(&areas[y]))
        });
        let Some(owner) = owner else {
            return Err(CsgError::UncontainedHole {
                face,
                point: *frame.position(hole[0]),
            });
        };
        if frame.area(&hole) > 0.0 {
            hole.reverse();
        }
        assigned[owner].push(hole);
    }

    for (outer, mut pending) in faces.iter_mut().zip(assigned) {
        while let Some(hole) = pending.pop() {
            *outer = bridge(outer, &hole, &pending, frame);
        }
    }
    Ok(faces)
}

fn segments(ring: &[Coord<Real>]) -> impl Iterator<Item = (Coord<Real>, Coord<Real>)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Splice a clockwise `hole` into `outer` through the shortest bridge that stays inside the
/// face and crosses no loop edge.
fn bridge(
    outer: &[VertexId],
    hole: &[VertexId],
    others: &[Vec<VertexId>],
    frame: &LoopFrame<'_>,
) -> Vec<VertexId> {
    let outer_ring = frame.ring(outer);
    let hole_ring = frame.ring(hole);
    let other_rings: Vec<Vec<Coord<Real>>> = others.iter().map(|h| frame.ring(h)).collect();
    let outer_polygon = ring_polygon(outer_ring.clone());
    let hole_polygon = ring_polygon(hole_ring.clone());

    let mut candidates: Vec<(Real, usize, usize)> = Vec::with_capacity(outer.len() * hole.len());
    for (hi, h) in hole_ring.iter().enumerate() {
        for (oi, o) in outer_ring.iter().enumerate() {
            let d2 = (h.x - o.x).powi(2) + (h.y - o.y).powi(2);
            candidates.push((d2, hi, oi));
        }
    }
    candidates.sort_by(|x, y| x.0.total_cmp(&y.0).then((x.1, x.2).cmp(&(y.1, y.2))));

    let valid = |&&(_, hi, oi): &&(Real, usize, usize)| {
        let (o, h) = (outer_ring[oi], hole_ring[hi]);
        let mid = Coord {
            x: (o.x + h.x) * 0.5,
            y: (o.y + h.y) * 0.5,
        };
        if locate_in_ring(&outer_polygon, mid, frame.epsilon) != RingPosition::Inside
            || locate_in_ring(&hole_polygon, mid, frame.epsilon) == RingPosition::Inside
        {
            return false;
        }
        let crosses = segments(&outer_ring)
            .chain(segments(&hole_ring))
            .chain(other_rings.iter().flat_map(|r| segments(r)))
            .any(|(c, d)| segments_conflict(o, h, c, d));
        !crosses
    };

    let (_, hi, oi) = match candidates.iter().find(valid) {
        Some(&chosen) => chosen,
        None => {
            warn!("no clean bridge for a hole of {} vertices; using the nearest pair", hole.len());
            candidates[0]
        },
    };

    let mut merged = Vec::with_capacity(outer.len() + hole.len() + 2);
    merged.extend_from_slice(&outer[..=oi]);
    merged.extend_from_slice(&hole[hi..]);
    merged.extend_from_slice(&hole[..=hi]);
    merged.extend_from_slice(&outer[oi..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::vertex_pool::VertexPool;
    use crate::mesh::plane::Plane;
    use nalgebra::{Point3, Vector3};

    fn pool(points: &[[Real; 2]]) -> VertexPool {
        let pts: Vec<Point3<Real>> = points.iter().map(|p| Point3::new(p[0], p[1], 0.0)).collect();
        let mut pool = VertexPool::new();
        pool.reset(&pts, &[]);
        pool
    }

    fn ids(v: &[u32]) -> Vec<VertexId> {
        v.iter().map(|&i| VertexId(i)).collect()
    }

    #[test]
    fn nested_holes_go_to_innermost_face() {
        let pool = pool(&[
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [2.0, 2.0],
            [8.0, 2.0],
            [8.0, 8.0],
            [2.0, 8.0],
            [4.0, 4.0],
            [6.0, 4.0],
            [6.0, 6.0],
            [4.0, 6.0],
        ]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let faces = vec![ids(&[0, 1, 2, 3]), ids(&[4, 5, 6, 7])];
        let holes = vec![ids(&[8, 9, 10, 11]), ids(&[4, 5, 6, 7])];

        let merged = merge(0, faces, holes, &frame).unwrap();
        assert_eq!(merged.len(), 2);
        assert!((frame.area(&merged[0]) - 64.0).abs() < 1e-9);
        assert!((frame.area(&merged[1]) - 32.0).abs() < 1e-9);
        assert_eq!(merged[1].len(), 4 + 4 + 2);
    }

    #[test]
    fn orphan_hole_is_an_error() {
        let pool = pool(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [5.0, 5.0],
            [6.0, 5.0],
            [6.0, 6.0],
        ]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let err = merge(3, vec![ids(&[0, 1, 2])], vec![ids(&[3, 4, 5])], &frame).unwrap_err();
        assert!(matches!(err, CsgError::UncontainedHole { face: 3, .. }));
    }
}
