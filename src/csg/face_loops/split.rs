//! Cutting one face's base loop along its interior split edges.

use super::{BaseLoop, LoopFrame, holes};
use crate::csg::geometry::{RingPosition, angle_of, ccw_sweep};
use crate::csg::ids::{EdgeKey, VertexId};
use crate::errors::CsgError;
use crate::float_types::{Real, TAU};
use geo::Coord;
use hashbrown::HashSet;
use std::collections::BTreeMap;
use tracing::{debug, warn};

type Loops = Vec<Vec<VertexId>>;

/// Split a face into counter-clockwise loops with any holes bridged in.
pub(super) fn decompose(
    face: usize,
    base: BaseLoop,
    split_edges: &[EdgeKey],
    frame: &LoopFrame<'_>,
) -> Result<Loops, CsgError> {
    let interior = interior_edges(&base, split_edges);
    let base = base.vertices;
    if interior.is_empty() {
        return Ok(vec![base]);
    }

    if let [single] = interior.as_slice() {
        if let Some(pair) = split_once(&base, *single) {
            return Ok(pair);
        }
    }

    let (faces, holes) = match compose(&base, &interior, frame) {
        Some(parts) => parts,
        None => {
            debug!("face {} falls back to the graph walk", face);
            graph_walk(&base, &interior, frame)
        },
    };
    holes::merge(face, faces, holes, frame)
}

/// Split edges that actually cross the face rather than run along its boundary.
fn interior_edges(base: &BaseLoop, split_edges: &[EdgeKey]) -> Vec<EdgeKey> {
    let n = base.vertices.len();
    let perimeter: HashSet<EdgeKey> = (0..n)
        .map(|i| EdgeKey::new(base.vertices[i], base.vertices[(i + 1) % n]))
        .collect();
    let on_same_edge = |k: &EdgeKey| match (base.on_edges.get(&k.0), base.on_edges.get(&k.1)) {
        (Some(x), Some(y)) => x.iter().any(|e| y.contains(e)),
        _ => false,
    };

    let mut interior: Vec<EdgeKey> = split_edges
        .iter()
        .filter(|k| k.0 != k.1 && !perimeter.contains(*k) && !on_same_edge(*k))
        .copied()
        .collect();
    interior.sort_unstable();
    interior.dedup();
    interior
}

/// One chord between two distinct, singly visited loop vertices.
fn split_once(base: &[VertexId], chord: EdgeKey) -> Option<Loops> {
    let find = |v: VertexId| {
        let mut hits = base.iter().enumerate().filter(|&(_, &x)| x == v).map(|(i, _)| i);
        let first = hits.next()?;
        hits.next().is_none().then_some(first)
    };
    let (p, q) = (find(chord.0)?, find(chord.1)?);
    let (i, j) = (p.min(q), p.max(q));

    let first = base[i..=j].to_vec();
    let mut second = base[j..].to_vec();
    second.extend_from_slice(&base[..=i]);
    Some(vec![first, second])
}

/// Inclusive forward run of a cyclic loop from `from` to `to`.
fn cyclic(l: &[VertexId], from: usize, to: usize) -> Vec<VertexId> {
    if from <= to {
        l[from..=to].to_vec()
    } else {
        let mut run = l[from..].to_vec();
        run.extend_from_slice(&l[..=to]);
        run
    }
}

/// Which occurrence of `v` in `l` has `toward` inside its interior wedge.
fn occurrence(l: &[VertexId], v: VertexId, toward: Coord<Real>, frame: &LoopFrame<'_>) -> Option<usize> {
    let hits: Vec<usize> = (0..l.len()).filter(|&i| l[i] == v).collect();
    if hits.len() <= 1 {
        return hits.first().copied();
    }
    let n = l.len();
    let origin = frame.at(v);
    let dir = angle_of(toward - origin);
    hits.iter()
        .copied()
        .find(|&i| {
            let next = angle_of(frame.at(l[(i + 1) % n]) - origin);
            let prev = angle_of(frame.at(l[(i + n - 1) % n]) - origin);
            ccw_sweep(next, dir) < ccw_sweep(next, prev)
        })
        .or_else(|| hits.first().copied())
}

fn midpoint(p: Coord<Real>, q: Coord<Real>) -> Coord<Real> {
    Coord {
        x: (p.x + q.x) * 0.5,
        y: (p.y + q.y) * 0.5,
    }
}

/// Cut a loop along a path whose two ends lie on it. False if no loop holds the path.
fn slice_path(faces: &mut Loops, path: &[VertexId], frame: &LoopFrame<'_>) -> bool {
    let last = path.len() - 1;
    let (v0, vk) = (path[0], path[last]);
    let probe = midpoint(frame.at(path[0]), frame.at(path[1]));
    let Some(target) = faces.iter().position(|l| {
        l.contains(&v0) && l.contains(&vk) && frame.locate(l, probe) == RingPosition::Inside
    }) else {
        return false;
    };
    let l = &faces[target];

    if v0 == vk {
        // A closed curve touching the boundary at one vertex: it becomes its own face and
        // is spliced into the outer loop clockwise.
        let cycle = &path[..last];
        let ccw: Vec<VertexId> = if frame.area(cycle) >= 0.0 {
            cycle.to_vec()
        } else {
            std::iter::once(v0).chain(cycle[1..].iter().rev().copied()).collect()
        };
        let Some(i) = occurrence(l, v0, frame.at(path[1]), frame) else {
            return false;
        };
        let mut outer = l[..=i].to_vec();
        outer.extend(ccw[1..].iter().rev().copied());
        outer.push(v0);
        outer.extend_from_slice(&l[i + 1..]);
        faces[target] = outer;
        faces.push(ccw);
        return true;
    }

    let (Some(i), Some(j)) = (
        occurrence(l, v0, frame.at(path[1]), frame),
        occurrence(l, vk, frame.at(path[last - 1]), frame),
    ) else {
        return false;
    };
    let inner = &path[1..last];
    let mut first = cyclic(l, i, j);
    first.extend(inner.iter().rev().copied());
    let mut second = cyclic(l, j, i);
    second.extend_from_slice(inner);
    faces[target] = first;
    faces.push(second);
    true
}

/// Compose split edges into crossing paths, free-floating loops and cuts, and apply them.
///
/// `None` when the edges branch inside the face or dangle from its boundary, or when a path
/// cannot be placed; the caller then walks the full edge graph instead.
fn compose(base: &[VertexId], interior: &[EdgeKey], frame: &LoopFrame<'_>) -> Option<(Loops, Loops)> {
    let on_perimeter: HashSet<VertexId> = base.iter().copied().collect();
    let mut adjacency: BTreeMap<VertexId, Vec<VertexId>> = BTreeMap::new();
    for k in interior {
        adjacency.entry(k.0).or_default().push(k.1);
        adjacency.entry(k.1).or_default().push(k.0);
    }
    for neighbours in adjacency.values_mut() {
        neighbours.sort_unstable();
    }
    if adjacency
        .iter()
        .any(|(v, n)| !on_perimeter.contains(v) && n.len() > 2)
    {
        return None;
    }
    let terminal = |v: &VertexId| on_perimeter.contains(v) || adjacency[v].len() != 2;

    let mut used: HashSet<EdgeKey> = HashSet::new();
    let mut paths: Loops = Vec::new();
    let mut cuts: Loops = Vec::new();

    for (&start, neighbours) in &adjacency {
        if !terminal(&start) {
            continue;
        }
        for &first in neighbours {
            if used.contains(&EdgeKey::new(start, first)) {
                continue;
            }
            let mut chain = vec![start];
            let (mut prev, mut cur) = (start, first);
            loop {
                used.insert(EdgeKey::new(prev, cur));
                chain.push(cur);
                if terminal(&cur) {
                    break;
                }
                let next = adjacency[&cur].iter().copied().find(|&n| n != prev)?;
                if used.contains(&EdgeKey::new(cur, next)) {
                    return None;
                }
                (prev, cur) = (cur, next);
            }
            let end = cur;
            match (on_perimeter.contains(&start), on_perimeter.contains(&end)) {
                (true, true) => paths.push(chain),
                (false, false) => cuts.push(chain),
                _ => return None,
            }
        }
    }

    // whatever is left are closed curves through interior vertices only
    let mut loops: Loops = Vec::new();
    for (&start, neighbours) in &adjacency {
        for &first in neighbours {
            if used.contains(&EdgeKey::new(start, first)) {
                continue;
            }
            let mut cycle = vec![start];
            let (mut prev, mut cur) = (start, first);
            loop {
                used.insert(EdgeKey::new(prev, cur));
                if cur == start {
                    break;
                }
                cycle.push(cur);
                let next = adjacency[&cur].iter().copied().find(|&n| n != prev)?;
                (prev, cur) = (cur, next);
            }
            loops.push(cycle);
        }
    }

    let mut faces: Loops = vec![base.to_vec()];
    let mut holes: Loops = Vec::new();
    for path in &paths {
        if !slice_path(&mut faces, path, frame) {
            return None;
        }
    }
    for mut cycle in loops {
        if frame.area(&cycle) < 0.0 {
            cycle.reverse();
        }
        holes.push(cycle.iter().rev().copied().collect());
        faces.push(cycle);
    }
    for cut in cuts {
        let mut hole = cut.clone();
        hole.extend(cut[1..cut.len() - 1].iter().rev().copied());
        holes.push(hole);
    }
    Some((faces, holes))
}

/// Trace every face of the planar graph formed by the base loop (forward only) and the split
/// edges (both ways), turning as sharply clockwise as possible at each vertex.
///
/// Positive-area cycles are faces; the rest are holes.
pub(super) fn graph_walk(base: &[VertexId], interior: &[EdgeKey], frame: &LoopFrame<'_>) -> (Loops, Loops) {
    let mut out: BTreeMap<VertexId, Vec<VertexId>> = BTreeMap::new();
    let mut add = |u: VertexId, v: VertexId| {
        let targets = out.entry(u).or_default();
        if u != v && !targets.contains(&v) {
            targets.push(v);
        }
    };
    let n = base.len();
    for i in 0..n {
        add(base[i], base[(i + 1) % n]);
    }
    for k in interior {
        add(k.0, k.1);
        add(k.1, k.0);
    }
    let total: usize = out.values().map(Vec::len).sum();

    // the clockwise-most turn from the reversed incoming edge; going straight back is last
    let pick = |prev: VertexId, cur: VertexId| -> Option<VertexId> {
        let origin = frame.at(cur);
        let back = angle_of(frame.at(prev) - origin);
        out.get(&cur)?
            .iter()
            .map(|&w| {
                let sweep = ccw_sweep(angle_of(frame.at(w) - origin), back);
                let sweep = if w == prev || sweep <= 0.0 { TAU } else { sweep };
                (sweep, w)
            })
            .min_by(|x, y| x.0.total_cmp(&y.0).then_with(|| x.1.cmp(&y.1)))
            .map(|(_, w)| w)
    };

    let mut used: HashSet<(VertexId, VertexId)> = HashSet::with_capacity(total);
    let mut faces: Loops = Vec::new();
    let mut holes: Loops = Vec::new();
    let starts: Vec<(VertexId, VertexId)> = out
        .iter()
        .flat_map(|(&u, targets)| targets.iter().map(move |&v| (u, v)))
        .collect();

    for start in starts {
        if used.contains(&start) {
            continue;
        }
        let mut cycle = vec![start.0];
        let mut edge = start;
        let mut closed = false;
        for _ in 0..=total {
            used.insert(edge);
            let Some(next) = pick(edge.0, edge.1) else {
                break;
            };
            if (edge.1, next) == start {
                closed = true;
                break;
            }
            if used.contains(&(edge.1, next)) {
                break;
            }
            cycle.push(edge.1);
            edge = (edge.1, next);
        }
        if !closed {
            warn!("open cycle of {} vertices discarded while splitting a face", cycle.len());
            continue;
        }
        if frame.area(&cycle) > 0.0 {
            faces.push(cycle);
        } else {
            holes.push(cycle);
        }
    }
    (faces, holes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::vertex_pool::VertexPool;
    use crate::mesh::plane::Plane;
    use nalgebra::{Point3, Vector3};

    fn frame_for(points: &[[Real; 2]]) -> VertexPool {
        let pts: Vec<Point3<Real>> = points.iter().map(|p| Point3::new(p[0], p[1], 0.0)).collect();
        let mut pool = VertexPool::new();
        pool.reset(&pts, &[]);
        pool
    }

    fn ids(v: &[u32]) -> Vec<VertexId> {
        v.iter().map(|&i| VertexId(i)).collect()
    }

    fn base(v: &[u32]) -> BaseLoop {
        BaseLoop {
            vertices: ids(v),
            on_edges: Default::default(),
        }
    }

    fn total_area(frame: &LoopFrame<'_>, loops: &Loops) -> Real {
        loops.iter().map(|l| frame.area(l)).sum()
    }

    #[test]
    fn single_chord_splits_in_two() {
        let pool = frame_for(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let loops = decompose(0, base(&[0, 1, 2, 3]), &[EdgeKey::new(VertexId(0), VertexId(2))], &frame)
            .unwrap();
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 3 && frame.area(l) > 0.0));
    }

    #[test]
    fn path_through_interior_vertex() {
        // square with a bent path 4 -> 6 -> 5 across it
        let pool = frame_for(&[
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 4.0],
            [0.0, 4.0],
            [2.0, 0.0],
            [2.0, 4.0],
            [1.0, 2.0],
        ]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let split = [
            EdgeKey::new(VertexId(4), VertexId(6)),
            EdgeKey::new(VertexId(6), VertexId(5)),
        ];
        let loops = decompose(0, base(&[0, 4, 1, 2, 5, 3]), &split, &frame).unwrap();
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| frame.area(l) > 0.0));
        assert!((total_area(&frame, &loops) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn floating_loop_makes_face_and_hole() {
        let pool = frame_for(&[
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 4.0],
            [0.0, 4.0],
            [1.0, 1.0],
            [2.0, 1.0],
            [2.0, 2.0],
            [1.0, 2.0],
        ]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let split = [
            EdgeKey::new(VertexId(4), VertexId(5)),
            EdgeKey::new(VertexId(5), VertexId(6)),
            EdgeKey::new(VertexId(6), VertexId(7)),
            EdgeKey::new(VertexId(7), VertexId(4)),
        ];
        let loops = decompose(0, base(&[0, 1, 2, 3]), &split, &frame).unwrap();
        assert_eq!(loops.len(), 2);
        let mut areas: Vec<Real> = loops.iter().map(|l| frame.area(l)).collect();
        areas.sort_by(|a, b| a.total_cmp(b));
        assert!((areas[0] - 1.0).abs() < 1e-9);
        assert!((areas[1] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn branching_edges_use_graph_walk() {
        // a "T": chord 4 -> 5 plus a spur from 6 on it to the top edge at 7
        let pool = frame_for(&[
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 4.0],
            [0.0, 4.0],
            [0.0, 2.0],
            [4.0, 2.0],
            [2.0, 2.0],
            [2.0, 4.0],
        ]);
        let frame = LoopFrame::new(&pool, Plane::from_normal(Vector3::z(), 0.0).projection(), 1e-9);
        let split = [
            EdgeKey::new(VertexId(4), VertexId(6)),
            EdgeKey::new(VertexId(6), VertexId(5)),
            EdgeKey::new(VertexId(6), VertexId(7)),
        ];
        let loops = decompose(0, base(&[0, 1, 5, 2, 7, 3, 4]), &split, &frame).unwrap();
        assert_eq!(loops.len(), 3);
        assert!((total_area(&frame, &loops) - 16.0).abs() < 1e-9);
    }
}
