mod support;

use polycsg::{
    config::{BooleanOp, CsgConfig},
    csg::{Csg, FaceRef, Hooks, Side},
    mesh::Mesh,
    traits::CsgOps,
};

use crate::support::approx_eq;

#[test]
fn intersection_vertex_hook_sees_every_curve_vertex() {
    let a: Mesh<()> = Mesh::cube(1.0, None);
    let b = a.translate(0.5, 0.0, 0.0);

    let mut seen = Vec::new();
    let mut divisions = 0;
    let stats = {
        let hooks = Hooks::new()
            .on_intersection_vertex(|v, p, pairs| {
                assert!(!pairs.is_empty());
                seen.push((v, *p));
            })
            .on_edge_division(|_, _, start, end| {
                assert!((end - start).norm() > 0.0);
                divisions += 1;
            });
        let mut csg = Csg::new(CsgConfig::default()).with_hooks(hooks);
        csg.compute(&a, &b, BooleanOp::Union).unwrap().stats
    };

    assert_eq!(seen.len(), stats.intersection_vertices);
    assert!(divisions > 0);
    for (_, p) in &seen {
        assert!(approx_eq(p.x, 0.5, 1e-9) || approx_eq(p.x, 1.0, 1e-9));
    }
}

#[test]
fn provenance_covers_every_output_face() {
    let a: Mesh<()> = Mesh::cube(1.0, None);
    let b = a.translate(0.5, 0.0, 0.0);

    let mut records: Vec<(usize, FaceRef, bool)> = Vec::new();
    let faces = {
        let hooks = Hooks::new().on_provenance(|i, source, flipped| records.push((i, source, flipped)));
        let mut csg = Csg::new(CsgConfig::default()).with_hooks(hooks);
        csg.compute(&a, &b, BooleanOp::AMinusB).unwrap().mesh.faces.len()
    };

    assert_eq!(records.len(), faces);
    for (i, (index, source, flipped)) in records.iter().enumerate() {
        assert_eq!(*index, i);
        // in A - B only B's faces are turned around
        assert_eq!(*flipped, source.side == Side::B);
    }
    assert!(records.iter().any(|(_, source, _)| source.side == Side::B));
}

#[test]
fn result_face_hook_rewrites_metadata() {
    let a: Mesh<String> = Mesh::cube(1.0, Some("a".to_string()));
    let b: Mesh<String> = Mesh::cube(1.0, Some("b".to_string())).translate(0.5, 0.0, 0.0);

    let hooks = Hooks::new().on_result_face(|face, source| {
        let tag = face.metadata.clone().unwrap_or_default();
        face.metadata = Some(format!("{tag}:{}", source.face));
    });
    let mut csg = Csg::new(CsgConfig::default()).with_hooks(hooks);
    let out = csg.compute(&a, &b, BooleanOp::Union).unwrap();

    assert!(!out.mesh.faces.is_empty());
    for face in &out.mesh.faces {
        let meta = face.metadata.as_deref().unwrap_or_default();
        assert!(meta.starts_with("a:") || meta.starts_with("b:"), "{meta}");
    }
}

#[test]
fn shared_edges_lie_on_the_intersection_curve() {
    let a: Mesh<()> = Mesh::cube(1.0, None);
    let b = a.translate(0.5, 0.0, 0.0);

    let out = Csg::new(CsgConfig::default())
        .compute(&a, &b, BooleanOp::Union)
        .unwrap();
    assert!(!out.shared_edges.is_empty());
    for &(low, high) in &out.shared_edges {
        assert!(low < high);
        for p in [out.mesh.vertices[low], out.mesh.vertices[high]] {
            assert!(approx_eq(p.x, 0.5, 1e-9) || approx_eq(p.x, 1.0, 1e-9));
        }
    }
}
