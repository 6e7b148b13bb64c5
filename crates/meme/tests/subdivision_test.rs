//! Propagation of memes down the subdivision hierarchy.

use meme::prelude::*;

/// Two triangles sharing the edge 0-1.
fn diamond() -> SubdivMesh {
    SubdivMesh::from_tris(
        &[
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(0.5, -1.0, 0.0),
        ],
        &[[0, 1, 2], [1, 0, 3]],
    )
    .unwrap()
}

fn claim_all_verts(engine: &mut Engine, owner: OwnerId) -> Vec<MemeId> {
    engine
        .mesh()
        .verts_at(0)
        .into_iter()
        .map(|v| {
            engine
                .create_vert_meme_with(owner, v, VertAttribs::Free, Claim::IfFree)
                .unwrap()
        })
        .collect()
}

fn claim_all_edges(engine: &mut Engine, owner: OwnerId) -> Vec<MemeId> {
    engine
        .mesh()
        .edges_at(0)
        .into_iter()
        .map(|e| engine.create_edge_meme_with(owner, e, Claim::IfFree).unwrap())
        .collect()
}

#[test]
fn test_refine_produces_child_owner() {
    let mut engine = meme::new_engine(SubdivMesh::quad_grid(2, 2, 1.0));
    let a = engine.add_owner("surface");
    engine.set_res_level(a, 2).unwrap();
    let memes = claim_all_verts(&mut engine, a);

    assert_eq!(engine.refine().unwrap(), 1);
    let child = engine.owner(a).unwrap().child().unwrap();
    let child_owner = engine.owner(child).unwrap();
    assert_eq!(child_owner.level(), 1);
    assert_eq!(child_owner.res_level(), 1);
    assert_eq!(child_owner.parent(), Some(a));
    assert_eq!(child_owner.vert_memes().len(), memes.len());

    for m in memes {
        let c = engine.vert_child(m).unwrap().unwrap();
        assert!(engine.is_boss(c).unwrap());
        assert_eq!(engine.vert_parent(c).unwrap(), Some(m));
    }

    engine.refine().unwrap();
    let grandchild = engine.owner(child).unwrap().child();
    assert!(grandchild.is_some());
    assert_eq!(engine.owner(grandchild.unwrap()).unwrap().res_level(), 0);
}

#[test]
fn test_demotion_propagates_downward_only() {
    let mut engine = meme::new_engine(SubdivMesh::quad_grid(2, 2, 1.0));
    let a = engine.add_owner("surface");
    engine.set_res_level(a, 1).unwrap();
    let memes = claim_all_verts(&mut engine, a);
    engine.refine().unwrap();

    let target = memes[4];
    let child = engine.vert_child(target).unwrap().unwrap();
    assert!(engine.is_boss(child).unwrap());

    engine.get_demoted(target).unwrap();
    assert!(!engine.is_boss(target).unwrap());
    assert!(!engine.is_boss(child).unwrap());
    for &m in memes.iter().filter(|&&m| m != target) {
        assert!(engine.is_boss(m).unwrap());
        let c = engine.vert_child(m).unwrap().unwrap();
        assert!(engine.is_boss(c).unwrap());
    }

    // Promoting the child again leaves the parent alone.
    engine.take_charge(child).unwrap();
    assert!(!engine.is_boss(target).unwrap());
}

#[test]
fn test_impotent_parent_child_stays_non_boss() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 1).unwrap();
    let memes = claim_all_verts(&mut engine, a);
    let rival = engine.create_vert_meme(b, VertId(2), VertAttribs::Free).unwrap();
    engine.take_charge(rival).unwrap();

    engine.refine().unwrap();
    let child = engine.vert_child(memes[2]).unwrap().unwrap();
    assert!(!engine.is_boss(child).unwrap());
    let other = engine.vert_child(memes[0]).unwrap().unwrap();
    assert!(engine.is_boss(other).unwrap());
}

#[test]
fn test_two_parent_potency_rule() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 2).unwrap();
    let m = claim_all_verts(&mut engine, a);
    engine.refine().unwrap();
    let mesh = engine.mesh();
    let mid = |x: u32, y: u32| {
        let e = mesh.lookup_edge(VertId(x), VertId(y)).unwrap();
        mesh.edge_subdiv_vert(e).unwrap()
    };
    let (m01, m31, m20) = (mid(0, 1), mid(3, 1), mid(2, 0));

    // Both parents potent: boss and fertile.
    let c = engine.gen_child2(m01, m[0], m[1]).unwrap().unwrap();
    assert!(engine.is_boss(c).unwrap());
    assert!(!engine.is_sterile(c).unwrap());

    // One potent, one sterile: boss but sterile.
    engine.sterilize(m[3]).unwrap();
    let c = engine.gen_child2(m31, m[3], m[1]).unwrap().unwrap();
    assert!(engine.is_boss(c).unwrap());
    assert!(engine.is_sterile(c).unwrap());

    // Neither potent: not boss.
    for v in [0, 2] {
        let r = engine.create_vert_meme(b, VertId(v), VertAttribs::Free).unwrap();
        engine.take_charge(r).unwrap();
    }
    let c = engine.gen_child2(m20, m[2], m[0]).unwrap().unwrap();
    assert!(!engine.is_boss(c).unwrap());
}

#[test]
fn test_gen_child_requires_single_owner() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 1).unwrap();
    let ma = engine.create_vert_meme(a, VertId(0), VertAttribs::Free).unwrap();
    let mb = engine.create_vert_meme(b, VertId(1), VertAttribs::Free).unwrap();
    engine.refine().unwrap();
    let e = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    let lv = engine.mesh().edge_subdiv_vert(e).unwrap();
    assert!(matches!(
        engine.gen_child2(lv, ma, mb),
        Err(MemeError::InvariantViolation(_))
    ));
}

#[test]
fn test_edge_children_follow_endpoints() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("curve");
    engine.set_res_level(a, 2).unwrap();
    for (v, t) in [(0, 0.0), (1, 1.0)] {
        engine
            .create_vert_meme_with(a, VertId(v), VertAttribs::Curve { t }, Claim::IfFree)
            .unwrap();
    }
    let e = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    let em = engine.create_edge_meme_with(a, e, Claim::IfFree).unwrap();
    engine.refine().unwrap();

    let c = engine.edge_child(em).unwrap().unwrap();
    assert!(engine.is_boss(c).unwrap());
    match engine.attribs(c).unwrap() {
        VertAttribs::Curve { t } => assert!((t - 0.5).abs() < 1e-6),
        other => panic!("unexpected attributes {other:?}"),
    }
    assert!(engine.edge_child_e1(em).unwrap().is_some());
    assert!(engine.edge_child_e2(em).unwrap().is_some());

    // Edges without both endpoint memes get no vertex child.
    let other = engine.mesh().lookup_edge(VertId(1), VertId(2)).unwrap();
    let om = engine.create_edge_meme_with(a, other, Claim::IfFree).unwrap();
    engine.edge_gen_subdiv_memes(om).unwrap();
    assert!(engine.edge_child(om).unwrap().is_none());
    assert!(engine.edge_child_e1(om).unwrap().is_some());
}

#[test]
fn test_non_boss_edge_demotes_vertex_child() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 1).unwrap();
    claim_all_verts(&mut engine, a);
    let e = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    engine.create_edge_meme_with(b, e, Claim::IfFree).unwrap();
    let em = engine.create_edge_meme(a, e).unwrap();
    engine.refine().unwrap();

    let c = engine.edge_child(em).unwrap().unwrap();
    assert!(!engine.is_boss(c).unwrap());
}

#[test]
fn test_quad_centre_averaging() {
    let mut engine = meme::new_engine(SubdivMesh::quad_grid(1, 1, 1.0));
    let a = engine.add_owner("a");
    engine.set_res_level(a, 1).unwrap();
    for v in engine.mesh().verts_at(0) {
        let p = engine.mesh().loc(v);
        engine
            .create_vert_meme_with(a, v, VertAttribs::Uv { uv: Vec2::new(p.x, p.y) }, Claim::IfFree)
            .unwrap();
    }
    claim_all_edges(&mut engine, a);
    engine.refine().unwrap();

    let diag = engine.mesh().lookup_edge(VertId(0), VertId(3)).unwrap();
    let centre = engine.mesh().edge_subdiv_vert(diag).unwrap();
    assert!((engine.mesh().loc(centre) - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);

    let child = engine.owner(a).unwrap().child().unwrap();
    let cm = engine.find_meme(child, centre.into()).unwrap();
    assert!(engine.is_boss(cm).unwrap());
    assert_eq!(engine.attribs(cm).unwrap(), VertAttribs::Uv { uv: Vec2::new(0.5, 0.5) });
}

#[test]
fn test_mixed_flavors_make_no_child() {
    let mut engine = meme::new_engine(SubdivMesh::quad_grid(1, 1, 1.0));
    let a = engine.add_owner("a");
    engine.set_res_level(a, 1).unwrap();
    for v in engine.mesh().verts_at(0) {
        let attribs = if v == VertId(2) {
            VertAttribs::Curve { t: 0.0 }
        } else {
            VertAttribs::Free
        };
        engine
            .create_vert_meme_with(a, v, attribs, Claim::IfFree)
            .unwrap();
    }
    claim_all_edges(&mut engine, a);
    engine.refine().unwrap();

    let diag = engine.mesh().lookup_edge(VertId(0), VertId(3)).unwrap();
    let centre = engine.mesh().edge_subdiv_vert(diag).unwrap();
    assert!(!engine.has_boss(centre.into()));
    let side = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    let mid = engine.mesh().edge_subdiv_vert(side).unwrap();
    assert!(engine.has_boss(mid.into()));
}

#[test]
fn test_face_memes_propagate() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    engine.set_res_level(a, 1).unwrap();
    let fm = engine.create_face_meme(a, FaceId(0)).unwrap();
    engine.refine().unwrap();
    let child = engine.owner(a).unwrap().child().unwrap();

    let faces = engine.mesh().face_subdiv_faces(FaceId(0)).unwrap();
    for f in faces {
        assert!(engine.owns(child, f.into()));
    }
    for e in engine.mesh().face_subdiv_edges(FaceId(0)).unwrap() {
        assert!(engine.owns(child, e.into()));
    }
    let before = engine.owner(child).unwrap().num_memes();
    engine.face_gen_subdiv_memes(fm).unwrap();
    assert_eq!(engine.owner(child).unwrap().num_memes(), before);
}

#[test]
fn test_res_level_changes() {
    let mut engine = meme::new_engine(SubdivMesh::quad_grid(1, 1, 1.0));
    let a = engine.add_owner("a");
    claim_all_verts(&mut engine, a);
    engine.refine().unwrap();
    assert!(engine.owner(a).unwrap().child().is_none());

    engine.set_res_level(a, 1).unwrap();
    let child = engine.owner(a).unwrap().child().unwrap();
    assert_eq!(engine.owner(child).unwrap().vert_memes().len(), 4);

    engine.set_res_level(a, 0).unwrap();
    assert!(engine.owner(a).unwrap().child().is_none());
    assert!(engine.owner(child).is_err());
}

#[test]
fn test_update_from_parent() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    engine.set_res_level(a, 1).unwrap();
    let m = engine
        .create_vert_meme_with(a, VertId(0), VertAttribs::Curve { t: 0.1 }, Claim::IfFree)
        .unwrap();
    engine.refine().unwrap();

    engine.set_attribs(m, VertAttribs::Curve { t: 0.3 }).unwrap();
    let c = engine.update_vert_child(m).unwrap().unwrap();
    assert_eq!(engine.attribs(c).unwrap(), VertAttribs::Curve { t: 0.3 });

    // A flavor change above is not forced onto the child.
    engine.set_attribs(m, VertAttribs::Free).unwrap();
    engine.update_from_parent(c).unwrap();
    assert_eq!(engine.attribs(c).unwrap(), VertAttribs::Curve { t: 0.3 });
}

#[test]
fn test_pin_and_sterilize_reach_children() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    engine.set_res_level(a, 2).unwrap();
    let m = engine
        .create_vert_meme_with(a, VertId(0), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    engine.refine().unwrap();
    let c = engine.vert_child(m).unwrap().unwrap();

    engine.pin(m).unwrap();
    assert!(engine.is_pinned(c).unwrap());
    engine.unpin(m).unwrap();
    assert!(!engine.is_pinned(c).unwrap());

    assert!(engine.sterilize(m).unwrap());
    assert!(!engine.sterilize(m).unwrap());
    assert!(engine.is_sterile(m).unwrap());
    assert!(!engine.is_potent(m).unwrap());
    assert!(!engine.is_boss(c).unwrap());

    assert!(engine.unsterilize(m).unwrap());
    assert!(engine.is_potent(m).unwrap());
    assert!(engine.is_boss(c).unwrap());
}

/// Effective potency is taken to be plain potency (boss and fertile). A
/// non-boss meme that merely tracks the boss is not effectively potent.
#[test]
fn test_epotent_assumed_equal_to_potent() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 1).unwrap();
    engine.set_res_level(b, 1).unwrap();
    let boss = engine
        .create_vert_meme_with(a, VertId(2), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    let tracker = engine.create_vert_meme(b, VertId(2), VertAttribs::Free).unwrap();
    assert!(engine.tracks_boss(tracker).unwrap());

    for m in [boss, tracker] {
        assert_eq!(engine.is_epotent(m).unwrap(), engine.is_potent(m).unwrap());
    }
    assert!(engine.is_epotent(boss).unwrap());
    assert!(!engine.is_epotent(tracker).unwrap());

    engine.sterilize(boss).unwrap();
    assert!(!engine.is_epotent(boss).unwrap());
}

#[test]
fn test_unsterilize_needs_resolution() {
    let mut engine = meme::new_engine(diamond());
    let a = engine.add_owner("a");
    let m = engine
        .create_vert_meme_with(a, VertId(0), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    assert!(engine.is_sterile(m).unwrap());
    engine.sterilize(m).unwrap();
    assert!(!engine.unsterilize(m).unwrap());
    assert!(engine.is_boss(m).unwrap());
    assert!(!engine.is_potent(m).unwrap());
}
