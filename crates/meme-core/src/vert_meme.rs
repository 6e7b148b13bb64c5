//! Vertex memes: attributes, relaxation state and the subdivision hierarchy.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::MemeEngine;
use crate::error::{invariant, MemeError, Result};
use crate::meme::{Claim, MemeBody, MemeId, MemeKind};
use crate::owner::OwnerId;
use crate::simplex::{EdgeId, FaceId, Simplex, VertId};
use crate::substrate::Substrate;

/// Which attribute payload a vertex meme carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemeFlavor {
    Free,
    Curve,
    Uv,
}

/// Owner-specific data attached to a vertex meme.
///
/// Subdivision children get their attributes by averaging their parents',
/// which only makes sense between memes of the same flavor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum VertAttribs {
    #[default]
    Free,
    /// Parameter along a curve.
    Curve { t: f32 },
    /// Surface texture coordinate.
    Uv { uv: Vec2 },
}

impl VertAttribs {
    #[must_use]
    pub fn flavor(&self) -> MemeFlavor {
        match self {
            VertAttribs::Free => MemeFlavor::Free,
            VertAttribs::Curve { .. } => MemeFlavor::Curve,
            VertAttribs::Uv { .. } => MemeFlavor::Uv,
        }
    }

    /// Attributes for a vertex at the midpoint of two others, or `None` if
    /// the flavors differ.
    #[must_use]
    pub fn midpoint(a: VertAttribs, b: VertAttribs) -> Option<VertAttribs> {
        match (a, b) {
            (VertAttribs::Free, VertAttribs::Free) => Some(VertAttribs::Free),
            (VertAttribs::Curve { t: t1 }, VertAttribs::Curve { t: t2 }) => {
                Some(VertAttribs::Curve { t: (t1 + t2) / 2.0 })
            }
            (VertAttribs::Uv { uv: a }, VertAttribs::Uv { uv: b }) => {
                Some(VertAttribs::Uv { uv: (a + b) / 2.0 })
            }
            _ => None,
        }
    }

    /// Attributes for a vertex at the centre of a quad, or `None` if the
    /// flavors differ.
    #[must_use]
    pub fn quad_average(corners: [VertAttribs; 4]) -> Option<VertAttribs> {
        let flavor = corners[0].flavor();
        if corners.iter().any(|a| a.flavor() != flavor) {
            return None;
        }
        Some(match flavor {
            MemeFlavor::Free => VertAttribs::Free,
            MemeFlavor::Curve => {
                let sum: f32 = corners
                    .iter()
                    .map(|a| match a {
                        VertAttribs::Curve { t } => *t,
                        _ => 0.0,
                    })
                    .sum();
                VertAttribs::Curve { t: sum / 4.0 }
            }
            MemeFlavor::Uv => {
                let sum: Vec2 = corners
                    .iter()
                    .map(|a| match a {
                        VertAttribs::Uv { uv } => *uv,
                        _ => Vec2::ZERO,
                    })
                    .sum();
                VertAttribs::Uv { uv: sum / 4.0 }
            }
        })
    }
}

/// State of a vertex meme.
#[derive(Debug, Clone)]
pub struct VertMeme {
    attribs: VertAttribs,
    sterile: bool,
    pinned: bool,
    /// Relaxation passes since the last committed update.
    cold_count: u8,
    /// Pending position from the last `compute_update`.
    update: Vec3,
    debug: bool,
}

impl VertMeme {
    /// New memes start cold, with no pending motion.
    pub(crate) fn new(attribs: VertAttribs, cold_count: u8, loc: Vec3) -> Self {
        Self {
            attribs,
            sterile: false,
            pinned: false,
            cold_count,
            update: loc,
            debug: false,
        }
    }

    #[must_use]
    pub fn attribs(&self) -> &VertAttribs {
        &self.attribs
    }

    #[must_use]
    pub fn flavor(&self) -> MemeFlavor {
        self.attribs.flavor()
    }

    /// The sterile flag alone, ignoring the owner's resolution level.
    #[must_use]
    pub fn sterile_flag(&self) -> bool {
        self.sterile
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    #[must_use]
    pub fn cold_count(&self) -> u8 {
        self.cold_count
    }

    /// The pending update position.
    #[must_use]
    pub fn update(&self) -> Vec3 {
        self.update
    }

    #[must_use]
    pub fn do_debug(&self) -> bool {
        self.debug
    }
}

fn apply_potency<M: Substrate>(
    engine: &mut MemeEngine<M>,
    child: MemeId,
    potent: &[bool],
) -> Result<()> {
    if potent.iter().all(|&p| p) {
        return Ok(());
    }
    if potent.iter().all(|&p| !p) {
        engine.get_demoted(child)?;
    } else {
        engine.sterilize(child)?;
    }
    Ok(())
}

impl<M: Substrate> MemeEngine<M> {
    // === Creation and access ===

    /// Creates a non-boss vertex meme, or returns the owner's existing one.
    pub fn create_vert_meme(
        &mut self,
        owner: OwnerId,
        v: VertId,
        attribs: VertAttribs,
    ) -> Result<MemeId> {
        self.create_vert_meme_with(owner, v, attribs, Claim::Observe)
    }

    /// Creates a vertex meme competing for the vertex as `claim` says.
    pub fn create_vert_meme_with(
        &mut self,
        owner: OwnerId,
        v: VertId,
        attribs: VertAttribs,
        claim: Claim,
    ) -> Result<MemeId> {
        self.require(v.into())?;
        let body = VertMeme::new(attribs, self.options.max_cold_iters, self.mesh.loc(v));
        self.attach_meme(owner, v.into(), MemeBody::Vert(body), claim)
    }

    /// The vertex a vertex meme sits on.
    pub fn vert_of(&self, meme: MemeId) -> Result<VertId> {
        self.simplex_of(meme)?
            .as_vert()
            .ok_or(MemeError::WrongKind {
                meme,
                expected: MemeKind::Vert,
            })
    }

    pub fn vert_meme(&self, meme: MemeId) -> Result<&VertMeme> {
        self.meme(meme)?.as_vert().ok_or(MemeError::WrongKind {
            meme,
            expected: MemeKind::Vert,
        })
    }

    fn vert_meme_mut(&mut self, meme: MemeId) -> Result<&mut VertMeme> {
        self.meme_mut(meme)?
            .as_vert_mut()
            .ok_or(MemeError::WrongKind {
                meme,
                expected: MemeKind::Vert,
            })
    }

    /// Current location of the meme's vertex.
    pub fn loc(&self, meme: MemeId) -> Result<Vec3> {
        Ok(self.mesh.loc(self.vert_of(meme)?))
    }

    pub fn attribs(&self, meme: MemeId) -> Result<VertAttribs> {
        Ok(*self.vert_meme(meme)?.attribs())
    }

    /// Replaces the attributes. Call [`MemeEngine::update_vert_child`] to
    /// pass them down.
    pub fn set_attribs(&mut self, meme: MemeId, attribs: VertAttribs) -> Result<()> {
        self.vert_meme_mut(meme)?.attribs = attribs;
        Ok(())
    }

    pub fn set_do_debug(&mut self, meme: MemeId, debug: bool) -> Result<()> {
        self.vert_meme_mut(meme)?.debug = debug;
        Ok(())
    }

    // === Potency ===

    /// Returns true if the meme is sterile: flagged, or its owner has no
    /// finer levels to control.
    pub fn is_sterile(&self, meme: MemeId) -> Result<bool> {
        let flag = self.vert_meme(meme)?.sterile;
        Ok(flag || self.owner(meme.owner)?.res_level() < 1)
    }

    /// Returns true if the meme is boss and fertile.
    pub fn is_potent(&self, meme: MemeId) -> Result<bool> {
        Ok(self.is_boss(meme)? && !self.is_sterile(meme)?)
    }

    /// Effective potency, as used when propagating to children.
    pub fn is_epotent(&self, meme: MemeId) -> Result<bool> {
        self.is_potent(meme)
    }

    /// Marks the meme sterile. A boss child gets demoted.
    pub fn sterilize(&mut self, meme: MemeId) -> Result<bool> {
        let state = self.vert_meme_mut(meme)?;
        if state.sterile {
            return Ok(false);
        }
        state.sterile = true;
        if let Some(child) = self.vert_child(meme)? {
            self.get_demoted(child)?;
        }
        Ok(true)
    }

    /// Clears the sterile flag, if the owner's resolution level allows it.
    /// An existing child takes charge of its vertex again.
    pub fn unsterilize(&mut self, meme: MemeId) -> Result<bool> {
        if self.owner(meme.owner)?.res_level() < 1 {
            return Ok(false);
        }
        let state = self.vert_meme_mut(meme)?;
        if !state.sterile {
            return Ok(false);
        }
        state.sterile = false;
        if let Some(child) = self.vert_child(meme)? {
            self.take_charge(child)?;
        }
        Ok(true)
    }

    pub fn is_pinned(&self, meme: MemeId) -> Result<bool> {
        Ok(self.vert_meme(meme)?.pinned)
    }

    /// Fixes the vertex in place, along with existing descendants.
    pub fn pin(&mut self, meme: MemeId) -> Result<()> {
        self.vert_meme_mut(meme)?.pinned = true;
        if let Some(child) = self.vert_child(meme)? {
            self.pin(child)?;
        }
        Ok(())
    }

    pub fn unpin(&mut self, meme: MemeId) -> Result<()> {
        self.vert_meme_mut(meme)?.pinned = false;
        if let Some(child) = self.vert_child(meme)? {
            self.unpin(child)?;
        }
        Ok(())
    }

    // === Heat ===

    /// Resets the cold count and schedules the owner for relaxation.
    pub fn set_hot(&mut self, meme: MemeId) -> Result<()> {
        self.vert_meme_mut(meme)?.cold_count = 0;
        self.owner_mut(meme.owner)?.set_active(true);
        Ok(())
    }

    pub fn set_cold(&mut self, meme: MemeId) -> Result<()> {
        let max = self.options.max_cold_iters;
        self.vert_meme_mut(meme)?.cold_count = max;
        Ok(())
    }

    pub fn is_hot(&self, meme: MemeId) -> Result<bool> {
        Ok(self.vert_meme(meme)?.cold_count == 0)
    }

    pub fn is_warm(&self, meme: MemeId) -> Result<bool> {
        Ok(self.vert_meme(meme)?.cold_count < self.options.max_cold_iters)
    }

    pub fn is_cold(&self, meme: MemeId) -> Result<bool> {
        Ok(!self.is_warm(meme)?)
    }

    /// 1 for hot, falling linearly to 0 for cold.
    pub fn heat(&self, meme: MemeId) -> Result<f32> {
        let max = f32::from(self.options.max_cold_iters);
        let count = f32::from(self.vert_meme(meme)?.cold_count);
        Ok(1.0 - (count / max).min(1.0))
    }

    /// Advances the cold count by one pass. Returns true while still warm.
    pub fn tick(&mut self, meme: MemeId) -> Result<bool> {
        let max = self.options.max_cold_iters;
        let state = self.vert_meme_mut(meme)?;
        if state.cold_count < max {
            state.cold_count += 1;
        }
        Ok(state.cold_count < max)
    }

    // === Relaxation ===

    /// Where the vertex would like to be.
    ///
    /// Normally a weighted centroid of the neighbours: weight 1 for each
    /// strong-edge neighbour and 1/2 for each quad-opposite corner. If edges
    /// controlled by a different barrier owner are present, those are
    /// dropped and the plain centroid of the rest is used.
    pub fn smooth_target(&self, meme: MemeId) -> Result<Vec3> {
        let v = self.vert_of(meme)?;
        let here = self.mesh.loc(v);
        let all = self.mesh.vert_edges(v);
        if all.is_empty() {
            return Ok(here);
        }

        let own = self.find_controller(v.into());
        let star: Vec<EdgeId> = all
            .iter()
            .copied()
            .filter(|&e| match self.find_controller(e.into()) {
                Some(c) if Some(c) != own => !self.is_barrier(c),
                _ => true,
            })
            .collect();

        if star.len() != all.len() {
            if star.is_empty() {
                return Ok(here);
            }
            let sum: Vec3 = star
                .iter()
                .filter_map(|&e| self.mesh.other_vertex(e, v))
                .map(|n| self.mesh.loc(n))
                .sum();
            return Ok(sum / star.len() as f32);
        }

        let mut sum = Vec3::ZERO;
        let mut weight = 0.0;
        for &e in &star {
            if self.mesh.is_weak(e) {
                continue;
            }
            if let Some(n) = self.mesh.other_vertex(e, v) {
                sum += self.mesh.loc(n);
                weight += 1.0;
            }
            let opposite = self
                .mesh
                .ccw_face(e, v)
                .and_then(|f| self.mesh.quad_opposite_vert(f, v));
            if let Some(q) = opposite {
                sum += 0.5 * self.mesh.loc(q);
                weight += 0.5;
            }
        }
        if weight > 0.0 {
            Ok(sum / weight)
        } else {
            Ok(here)
        }
    }

    /// Damped offset from the vertex toward its smoothing target.
    pub fn target_delt(&self, meme: MemeId) -> Result<Vec3> {
        let delt = self.smooth_target(meme)? - self.loc(meme)?;
        Ok(delt * self.options.relax_damping)
    }

    /// The position the meme would move to next.
    fn candidate(&self, meme: MemeId) -> Result<Vec3> {
        let here = self.loc(meme)?;
        if self.is_pinned(meme)? {
            return Ok(here);
        }
        Ok(here + self.target_delt(meme)?)
    }

    /// Computes and stores the pending update position.
    pub fn compute_update(&mut self, meme: MemeId) -> Result<Vec3> {
        let update = self.candidate(meme)?;
        self.vert_meme_mut(meme)?.update = update;
        Ok(update)
    }

    /// Computes the update only if the meme is boss.
    pub fn compute_boss_update(&mut self, meme: MemeId) -> Result<bool> {
        if !self.is_boss(meme)? {
            return Ok(false);
        }
        self.compute_update(meme)?;
        Ok(true)
    }

    /// Commits the pending update if the meme is boss and the move exceeds
    /// `thresh` times the vertex's average edge length.
    pub fn apply_update(&mut self, meme: MemeId, thresh: f32) -> Result<bool> {
        if !self.is_boss(meme)? {
            return Ok(false);
        }
        let v = self.vert_of(meme)?;
        let update = self.vert_meme(meme)?.update;
        let limit = thresh.max(0.0) * self.mesh.avg_edge_len(v);
        if update.distance(self.mesh.loc(v)) <= limit {
            return Ok(false);
        }
        if self.vert_meme(meme)?.debug {
            log::debug!("meme {meme} moves {v} to {update}");
        }
        self.mesh.set_loc(v, update);
        self.set_hot(meme)?;
        self.mark_vert_moved(v);
        Ok(true)
    }

    pub fn do_update(&mut self, meme: MemeId, thresh: f32) -> Result<bool> {
        self.compute_update(meme)?;
        self.apply_update(meme, thresh)
    }

    /// Returns true if the meme is a non-boss whose candidate position is
    /// close to the boss's.
    pub fn tracks_boss(&self, meme: MemeId) -> Result<bool> {
        if self.is_boss(meme)? {
            return Ok(false);
        }
        let v = self.vert_of(meme)?;
        let target = match self.find_boss_meme(v.into()) {
            Some(boss) => self.candidate(boss)?,
            None => self.mesh.loc(v),
        };
        let limit = self.mesh.avg_edge_len(v) * self.options.track_threshold_scale;
        Ok(self.candidate(meme)?.distance(target) < limit)
    }

    pub fn is_boss_like(&self, meme: MemeId) -> Result<bool> {
        Ok(self.is_boss(meme)? || self.tracks_boss(meme)?)
    }

    /// Moves the vertex directly. Refused for non-boss or pinned memes.
    pub fn move_to(&mut self, meme: MemeId, p: Vec3) -> Result<bool> {
        if !self.is_boss(meme)? || self.is_pinned(meme)? {
            return Ok(false);
        }
        let v = self.vert_of(meme)?;
        self.vert_meme_mut(meme)?.update = p;
        self.mesh.set_loc(v, p);
        self.set_hot(meme)?;
        self.mark_vert_moved(v);
        Ok(true)
    }

    // === Notifications ===

    /// Tells every meme on `v` that the vertex moved.
    pub fn notify_vert_moved(&mut self, v: VertId) -> Result<()> {
        self.require(v.into())?;
        for meme in self.slots.memes_on(v.into()) {
            if self.vert_meme(meme)?.debug {
                log::debug!("meme {meme}: {v} moved");
            }
            self.set_hot(meme)?;
        }
        self.mark_vert_moved(v);
        Ok(())
    }

    pub fn notify_normal_changed(&mut self, v: VertId) -> Result<()> {
        self.require(v.into())?;
        for meme in self.slots.memes_on(v.into()) {
            if self.vert_meme(meme)?.debug {
                log::debug!("meme {meme}: normal changed at {v}");
            }
            self.set_hot(meme)?;
        }
        Ok(())
    }

    // === Neighbours ===

    /// The owner's memes on vertices sharing an edge with this one.
    pub fn vert_nbrs(&self, meme: MemeId) -> Result<Vec<MemeId>> {
        let v = self.vert_of(meme)?;
        Ok(self
            .mesh
            .vert_edges(v)
            .into_iter()
            .filter_map(|e| self.mesh.other_vertex(e, v))
            .filter_map(|n| self.slots.find_meme(n.into(), meme.owner))
            .collect())
    }

    /// The owner's memes on edges incident to this vertex.
    pub fn edge_nbrs(&self, meme: MemeId) -> Result<Vec<MemeId>> {
        let v = self.vert_of(meme)?;
        Ok(self
            .mesh
            .vert_edges(v)
            .into_iter()
            .filter_map(|e| self.slots.find_meme(e.into(), meme.owner))
            .collect())
    }

    /// The owner's memes on faces incident to this vertex.
    pub fn face_nbrs(&self, meme: MemeId) -> Result<Vec<MemeId>> {
        let v = self.vert_of(meme)?;
        let mut faces: Vec<FaceId> = self
            .mesh
            .vert_edges(v)
            .into_iter()
            .flat_map(|e| self.mesh.edge_faces(e))
            .flatten()
            .collect();
        faces.sort_unstable();
        faces.dedup();
        Ok(faces
            .into_iter()
            .filter_map(|f| self.slots.find_meme(f.into(), meme.owner))
            .collect())
    }

    /// Rest length of an incident edge, preferring the owner's edge meme.
    pub fn vert_lookup_rest_length(&self, meme: MemeId, e: EdgeId) -> Result<f32> {
        self.vert_of(meme)?;
        match self.slots.find_meme(e.into(), meme.owner) {
            Some(em) => self.rest_length(em),
            None => self.lookup_rest_length(e),
        }
    }

    // === Hierarchy ===

    /// The parent owner's meme on the parent vertex, if there is one.
    pub fn vert_parent(&self, meme: MemeId) -> Result<Option<MemeId>> {
        let v = self.vert_of(meme)?;
        let Some(parent_owner) = self.owner(meme.owner)?.parent() else {
            return Ok(None);
        };
        Ok(match self.mesh.parent(v.into()) {
            Some(Simplex::Vert(pv)) => self.slots.find_meme(pv.into(), parent_owner),
            _ => None,
        })
    }

    /// The child owner's meme on the subdivision vertex, if it exists.
    pub fn vert_child(&self, meme: MemeId) -> Result<Option<MemeId>> {
        let v = self.vert_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            return Ok(None);
        };
        Ok(self
            .mesh
            .subdiv_vert(v)
            .and_then(|sv| self.slots.find_meme(sv.into(), child_owner)))
    }

    /// Returns the child meme, creating it if needed. An impotent meme
    /// leaves its child non-boss.
    pub fn get_vert_child(&mut self, meme: MemeId) -> Result<Option<MemeId>> {
        let v = self.vert_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            return Ok(None);
        };
        let Some(sv) = self.mesh.subdiv_vert(v) else {
            return Ok(None);
        };

        let child = match self.vert_child(meme)? {
            Some(c) => c,
            None => {
                let attribs = self.attribs(meme)?;
                let c = self.create_vert_meme_with(child_owner, sv, attribs, Claim::IfFree)?;
                if self.is_pinned(meme)? {
                    self.vert_meme_mut(c)?.pinned = true;
                }
                c
            }
        };
        if !self.is_potent(meme)? && self.is_boss(child)? {
            self.get_demoted(child)?;
        }
        Ok(Some(child))
    }

    /// Brings the child meme up to date with this one.
    pub fn update_vert_child(&mut self, meme: MemeId) -> Result<Option<MemeId>> {
        let child = self.get_vert_child(meme)?;
        if let Some(c) = child {
            self.update_from_parent(c)?;
        }
        Ok(child)
    }

    /// Recomputes the attributes from the parent owner's memes.
    ///
    /// A vertex child copies its parent. A strong-edge child takes the
    /// midpoint of the endpoints and a weak-edge child the quad average.
    /// Nothing changes if the needed parents are missing or their flavor
    /// differs from this meme's.
    pub fn update_from_parent(&mut self, meme: MemeId) -> Result<()> {
        let v = self.vert_of(meme)?;
        let Some(parent_owner) = self.owner(meme.owner)?.parent() else {
            return Ok(());
        };
        let lookup = |s: Simplex| self.slots.find_meme(s, parent_owner);

        let blended = match self.mesh.parent(v.into()) {
            None => return Ok(()),
            Some(Simplex::Vert(pv)) => match lookup(pv.into()) {
                Some(pm) => Some(self.attribs(pm)?),
                None => None,
            },
            Some(Simplex::Edge(pe)) if self.mesh.is_strong(pe) => {
                let [a, b] = self.mesh.edge_verts(pe);
                match (lookup(a.into()), lookup(b.into())) {
                    (Some(ma), Some(mb)) => {
                        VertAttribs::midpoint(self.attribs(ma)?, self.attribs(mb)?)
                    }
                    _ => None,
                }
            }
            Some(Simplex::Edge(pe)) => {
                let corners = self.mesh.edge_faces(pe)[0].and_then(|f| self.mesh.quad_verts(f));
                let memes = corners.and_then(|q| {
                    let found: Vec<MemeId> = q.iter().filter_map(|&c| lookup(c.into())).collect();
                    <[MemeId; 4]>::try_from(found).ok()
                });
                match memes {
                    Some(ms) => VertAttribs::quad_average([
                        self.attribs(ms[0])?,
                        self.attribs(ms[1])?,
                        self.attribs(ms[2])?,
                        self.attribs(ms[3])?,
                    ]),
                    None => None,
                }
            }
            Some(Simplex::Face(pf)) => {
                return Err(invariant!("{v} has face parent {pf}"));
            }
        };

        match blended {
            Some(a) if a.flavor() == self.vert_meme(meme)?.flavor() => self.set_attribs(meme, a),
            Some(_) => {
                log::debug!("meme {meme}: parent flavor mismatch, attributes kept");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Handles the subdivision location of the vertex's child. Returns
    /// true if the owner's child meme is boss there, in which case the
    /// substrate must not recompute the location.
    pub fn vert_handle_subdiv_calc(&mut self, meme: MemeId) -> Result<bool> {
        match self.get_vert_child(meme)? {
            Some(child) => self.is_boss(child),
            None => Ok(false),
        }
    }

    /// Marks the parent of `v` for subdivision-location recomputation.
    pub fn mark_parent_dirty(&mut self, v: VertId) {
        if let Some(p) = self.mesh.parent(v.into()) {
            self.mark_subdiv_dirty(p);
        }
    }

    /// Creates the child meme on the midpoint vertex `lv` of an edge whose
    /// endpoint memes are `a` and `b`.
    ///
    /// Returns `None` if the two memes have different flavors. The child's
    /// boss status follows the parents' potency: both potent leaves it as
    /// is, neither demotes it and a mix sterilizes it.
    pub fn gen_child2(&mut self, lv: VertId, a: MemeId, b: MemeId) -> Result<Option<MemeId>> {
        let child_owner = self.child_owner_of(&[a, b])?;
        let (aa, ab) = (self.attribs(a)?, self.attribs(b)?);
        let Some(attribs) = VertAttribs::midpoint(aa, ab) else {
            log::debug!("memes {a} and {b} have different flavors, no child at {lv}");
            return Ok(None);
        };

        let child = match self.slots.find_meme(lv.into(), child_owner) {
            Some(c) => c,
            None => {
                let c = self.create_vert_meme_with(child_owner, lv, attribs, Claim::IfFree)?;
                if self.is_pinned(a)? && self.is_pinned(b)? {
                    self.vert_meme_mut(c)?.pinned = true;
                }
                c
            }
        };
        let potent = [self.is_epotent(a)?, self.is_epotent(b)?];
        apply_potency(self, child, &potent)?;
        Ok(Some(child))
    }

    /// Creates the child meme on the centre vertex `lv` of a quad whose
    /// corner memes are given. Same rules as [`MemeEngine::gen_child2`].
    pub fn gen_child4(&mut self, lv: VertId, corners: [MemeId; 4]) -> Result<Option<MemeId>> {
        let child_owner = self.child_owner_of(&corners)?;
        let attribs = [
            self.attribs(corners[0])?,
            self.attribs(corners[1])?,
            self.attribs(corners[2])?,
            self.attribs(corners[3])?,
        ];
        let Some(attribs) = VertAttribs::quad_average(attribs) else {
            log::debug!("quad memes have different flavors, no child at {lv}");
            return Ok(None);
        };

        let child = match self.slots.find_meme(lv.into(), child_owner) {
            Some(c) => c,
            None => {
                let c = self.create_vert_meme_with(child_owner, lv, attribs, Claim::IfFree)?;
                let mut all_pinned = true;
                for &m in &corners {
                    all_pinned &= self.is_pinned(m)?;
                }
                if all_pinned {
                    self.vert_meme_mut(c)?.pinned = true;
                }
                c
            }
        };
        let mut potent = [false; 4];
        for (p, &m) in potent.iter_mut().zip(&corners) {
            *p = self.is_epotent(m)?;
        }
        apply_potency(self, child, &potent)?;
        Ok(Some(child))
    }

    /// The child owner shared by a set of memes from one owner.
    fn child_owner_of(&self, memes: &[MemeId]) -> Result<OwnerId> {
        let owner = memes[0].owner;
        if let Some(other) = memes.iter().find(|m| m.owner != owner) {
            return Err(invariant!(
                "memes {} and {other} belong to different owners",
                memes[0]
            ));
        }
        self.owner(owner)?
            .child()
            .ok_or_else(|| invariant!("owner {owner} has no child owner"))
    }
}
