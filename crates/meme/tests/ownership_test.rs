//! Boss protocol, owners and finders.

use std::cell::RefCell;
use std::rc::Rc;

use meme::prelude::*;
use meme::{MemeKind, Owner};

fn grid() -> Engine {
    meme::new_engine(SubdivMesh::quad_grid(2, 2, 1.0))
}

#[test]
fn test_take_charge_and_demote() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    let v = VertId(4);

    let ma = engine.create_vert_meme(a, v, VertAttribs::Free).unwrap();
    assert!(!engine.is_boss(ma).unwrap());
    assert!(!engine.has_boss(v.into()));

    assert!(engine.take_charge(ma).unwrap());
    assert!(engine.is_boss(ma).unwrap());
    assert!(!engine.take_charge(ma).unwrap());

    let mb = engine.create_vert_meme(b, v, VertAttribs::Free).unwrap();
    assert!(engine.take_charge(mb).unwrap());
    assert!(!engine.is_boss(ma).unwrap());
    assert_eq!(engine.find_boss_meme(v.into()), Some(mb));
    assert_eq!(engine.find_owner(v.into()), Some(b));
    assert!(engine.owns(b, v.into()));
    assert!(!engine.owns(a, v.into()));

    assert!(engine.get_demoted(mb).unwrap());
    assert!(!engine.get_demoted(mb).unwrap());
    assert!(!engine.has_boss(v.into()));
    assert_eq!(engine.slots().memes_on(v.into()).len(), 2);
}

#[test]
fn test_creation_is_idempotent_per_owner() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let first = engine.create_vert_meme(a, VertId(0), VertAttribs::Free).unwrap();
    let again = engine
        .create_vert_meme_with(a, VertId(0), VertAttribs::Curve { t: 0.5 }, Claim::Force)
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(engine.owner(a).unwrap().num_memes(), 1);
    assert_eq!(engine.attribs(first).unwrap(), VertAttribs::Free);
}

#[test]
fn test_claims() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");

    let ma = engine
        .create_vert_meme_with(a, VertId(1), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    let mb = engine
        .create_vert_meme_with(b, VertId(1), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    assert!(engine.is_boss(ma).unwrap());
    assert!(!engine.is_boss(mb).unwrap());

    let e = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    let ea = engine.create_edge_meme_with(a, e, Claim::IfFree).unwrap();
    let eb = engine.create_edge_meme_with(b, e, Claim::Force).unwrap();
    assert!(engine.is_boss(eb).unwrap());
    assert!(!engine.is_boss(ea).unwrap());
}

#[test]
fn test_face_meme_forces_and_covers_edges() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    let f = FaceId(0);

    let fa = engine.create_face_meme(a, f).unwrap();
    assert!(engine.is_boss(fa).unwrap());
    for e in engine.mesh().face_edges(f).into_iter().flatten() {
        assert!(engine.owns(a, e.into()));
    }

    let fb = engine.create_face_meme(b, f).unwrap();
    assert!(engine.is_boss(fb).unwrap());
    assert!(!engine.is_boss(fa).unwrap());
    // Edges are only claimed if free.
    for e in engine.mesh().face_edges(f).into_iter().flatten() {
        assert!(engine.owns(a, e.into()));
        assert!(engine.find_meme(b, e.into()).is_some());
    }
    assert_eq!(engine.kind_of(fb).unwrap(), MemeKind::Face);
}

#[test]
fn test_face_corner_lookups() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let f = FaceId(0);
    let corners = engine.mesh().face_verts(f);
    let quad = engine.mesh().quad_verts(f).unwrap();
    let fourth = quad.into_iter().find(|v| !corners.contains(v)).unwrap();

    let fm = engine.create_face_meme(a, f).unwrap();
    assert_eq!(engine.face_v1(fm).unwrap(), None);

    let m1 = engine.create_vert_meme(a, corners[0], VertAttribs::Free).unwrap();
    let mq = engine.create_vert_meme(a, fourth, VertAttribs::Free).unwrap();
    assert_eq!(engine.face_v1(fm).unwrap(), Some(m1));
    assert_eq!(engine.face_vq(fm).unwrap(), Some(mq));
    assert_eq!(engine.face_v2(fm).unwrap(), None);
}

#[test]
fn test_wrong_kind_and_unknown_memes() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let e = engine.mesh().lookup_edge(VertId(0), VertId(1)).unwrap();
    let em = engine.create_edge_meme(a, e).unwrap();
    assert!(matches!(
        engine.is_sterile(em),
        Err(MemeError::WrongKind { .. })
    ));

    let ghost = MemeId {
        owner: OwnerId(42),
        serial: 0,
    };
    assert!(matches!(
        engine.take_charge(ghost),
        Err(MemeError::UnknownMeme(_))
    ));
    assert!(matches!(
        engine.create_vert_meme(OwnerId(42), VertId(0), VertAttribs::Free),
        Err(MemeError::UnknownOwner(_))
    ));
    assert!(matches!(
        engine.create_vert_meme(a, VertId(999), VertAttribs::Free),
        Err(MemeError::MissingSimplex(_))
    ));
}

#[test]
fn test_owner_level_must_match_element() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    engine.refine().unwrap();
    let fine = engine.mesh().subdiv_vert(VertId(0)).unwrap();
    assert!(matches!(
        engine.create_vert_meme(a, fine, VertAttribs::Free),
        Err(MemeError::InvariantViolation(_))
    ));
}

#[test]
fn test_invalidate_callback_fires_on_boss_changes() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine
        .owner_mut(a)
        .unwrap()
        .set_on_invalidate(move |id| sink.borrow_mut().push(id));

    let m = engine.create_vert_meme(a, VertId(0), VertAttribs::Free).unwrap();
    assert!(seen.borrow().is_empty());
    assert!(!engine.owner(a).unwrap().is_dirty());

    engine.take_charge(m).unwrap();
    engine.get_demoted(m).unwrap();
    assert_eq!(*seen.borrow(), vec![a, a]);
    assert!(engine.owner(a).unwrap().is_dirty());

    engine.owner_mut(a).unwrap().clear_dirty();
    assert!(!engine.owner(a).unwrap().is_dirty());
}

#[test]
fn test_child_changes_reported_to_control_owner() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    engine.set_res_level(a, 1).unwrap();
    let m = engine
        .create_vert_meme_with(a, VertId(4), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    engine.refine().unwrap();
    let child_owner = engine.owner(a).unwrap().child().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine
        .owner_mut(a)
        .unwrap()
        .set_on_invalidate(move |id| sink.borrow_mut().push(id));

    engine.get_demoted(m).unwrap();
    assert_eq!(*seen.borrow(), vec![a, child_owner]);
    assert_eq!(engine.control_of(child_owner).unwrap(), a);
}

#[test]
fn test_finders() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    for v in [0, 1, 2] {
        engine
            .create_vert_meme_with(a, VertId(v), VertAttribs::Free, Claim::IfFree)
            .unwrap();
    }
    let verts = [VertId(0), VertId(1), VertId(2), VertId(3)];
    assert_eq!(engine.find_boss_vmemes(&verts).len(), 3);
    assert!(!engine.is_covered(&verts));
    assert!(engine.is_covered(&verts[..3]));

    // Controllers are found through subdivision parents.
    engine.refine().unwrap();
    let fine = engine.mesh().subdiv_vert(VertId(1)).unwrap();
    assert_eq!(engine.find_owner(fine.into()), None);
    assert_eq!(engine.find_controller(fine.into()), Some(a));
    assert_eq!(engine.find_controller(engine.mesh().subdiv_vert(VertId(3)).unwrap().into()), None);
}

#[test]
fn test_remove_owner_detaches_memes() {
    let mut engine = grid();
    let a = engine.add_owner("a");
    let b = engine.add_owner("b");
    engine.set_res_level(a, 1).unwrap();
    let ma = engine
        .create_vert_meme_with(a, VertId(4), VertAttribs::Free, Claim::IfFree)
        .unwrap();
    let mb = engine.create_vert_meme(b, VertId(4), VertAttribs::Free).unwrap();
    engine.refine().unwrap();
    let child = engine.owner(a).unwrap().child().unwrap();

    engine.remove_owner(a).unwrap();
    assert!(engine.owner(a).is_err());
    assert!(engine.owner(child).is_err());
    assert!(!engine.contains_meme(ma));
    assert!(!engine.has_boss(VertId(4).into()));
    assert_eq!(engine.slots().memes_on(VertId(4).into()), vec![mb]);
    let fine = engine.mesh().subdiv_vert(VertId(4)).unwrap();
    assert!(engine.slots().memes_on(fine.into()).is_empty());
    assert_eq!(engine.owners().map(Owner::id).collect::<Vec<_>>(), vec![b]);
}
