//! The meme engine: owners, the slot table and the mesh they annotate.
//!
//! Every operation that touches ownership goes through [`MemeEngine`],
//! which holds the substrate mesh, the owners (each exclusively owning its
//! memes) and the per-element slot table. Memes are addressed by
//! [`MemeId`]; the per-kind operations live next to their state types in
//! `vert_meme`, `edge_meme` and `face_meme`.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{invariant, MemeError, Result};
use crate::meme::{Claim, Meme, MemeBody, MemeId, MemeKind};
use crate::options::Options;
use crate::owner::{Owner, OwnerId};
use crate::simplex::{EdgeId, Simplex, VertId};
use crate::slots::{SlotKey, SlotTable};
use crate::substrate::Substrate;

/// Owns the mesh, the owners and their memes.
pub struct MemeEngine<M> {
    pub(crate) mesh: M,
    pub(crate) options: Options,
    pub(crate) owners: BTreeMap<OwnerId, Owner>,
    pub(crate) slots: SlotTable,
    next_owner: u32,
    /// Parent simplices whose subdivision vertex needs a new location,
    /// keyed by level so coarser ones are handled first.
    subdiv_dirty: BTreeSet<(u32, Simplex)>,
}

impl<M: Substrate> MemeEngine<M> {
    /// Creates an engine with default options.
    pub fn new(mesh: M) -> Self {
        Self {
            mesh,
            options: Options::default(),
            owners: BTreeMap::new(),
            slots: SlotTable::new(),
            next_owner: 0,
            subdiv_dirty: BTreeSet::new(),
        }
    }

    pub fn with_options(mesh: M, options: Options) -> Result<Self> {
        options.validate()?;
        let mut engine = Self::new(mesh);
        engine.options = options;
        Ok(engine)
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    /// Mutable access to the mesh. Changes made here bypass the engine;
    /// report them through the `notify_*` entry points.
    pub fn mesh_mut(&mut self) -> &mut M {
        &mut self.mesh
    }

    pub fn into_mesh(self) -> M {
        self.mesh
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_options(&mut self, options: Options) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotTable {
        &mut self.slots
    }

    pub(crate) fn require(&self, s: Simplex) -> Result<()> {
        if self.mesh.contains(s) {
            Ok(())
        } else {
            Err(MemeError::MissingSimplex(s))
        }
    }

    // === Owners ===

    /// Registers a control owner at level 0 with resolution level 0.
    pub fn add_owner(&mut self, name: impl Into<String>) -> OwnerId {
        let id = self.alloc_owner_id();
        let owner = Owner::new(id, name, 0);
        log::debug!("added owner {id} ({})", owner.name());
        self.owners.insert(id, owner);
        id
    }

    fn alloc_owner_id(&mut self) -> OwnerId {
        let id = OwnerId(self.next_owner);
        self.next_owner += 1;
        id
    }

    pub fn owner(&self, id: OwnerId) -> Result<&Owner> {
        self.owners.get(&id).ok_or(MemeError::UnknownOwner(id))
    }

    pub fn owner_mut(&mut self, id: OwnerId) -> Result<&mut Owner> {
        self.owners.get_mut(&id).ok_or(MemeError::UnknownOwner(id))
    }

    pub fn owners(&self) -> impl Iterator<Item = &Owner> {
        self.owners.values()
    }

    /// The top of the owner chain containing `id`.
    pub fn control_of(&self, id: OwnerId) -> Result<OwnerId> {
        let mut cur = id;
        while let Some(parent) = self.owner(cur)?.parent() {
            cur = parent;
        }
        Ok(cur)
    }

    pub(crate) fn is_barrier(&self, id: OwnerId) -> bool {
        self.owners.get(&id).is_some_and(Owner::smoothing_barrier)
    }

    /// Marks the owner dirty and fires its control owner's callback.
    pub(crate) fn invalidate(&mut self, id: OwnerId) {
        let control = self.control_of(id).unwrap_or(id);
        if let Some(owner) = self.owners.get_mut(&id) {
            owner.mark_dirty();
        }
        if let Some(ctrl) = self.owners.get_mut(&control) {
            ctrl.fire_invalidate(id);
        }
    }

    /// Removes an owner, its child owners and all their memes.
    pub fn remove_owner(&mut self, id: OwnerId) -> Result<()> {
        if let Some(child) = self.owner(id)?.child() {
            self.remove_owner(child)?;
        }
        let mut owner = self.owners.remove(&id).ok_or(MemeError::UnknownOwner(id))?;
        for (meme_id, meme) in owner.take_memes() {
            let s = meme.simplex();
            if self.slots.is_boss(s, meme_id) {
                if let Simplex::Vert(v) = s {
                    self.mark_parent_dirty(v);
                }
            }
            self.slots.detach(s, meme_id);
        }
        if let Some(parent) = owner.parent() {
            if let Some(p) = self.owners.get_mut(&parent) {
                p.set_child(None);
            }
        }
        log::debug!("removed owner {id} ({})", owner.identifier());
        Ok(())
    }

    /// Changes how many finer levels the owner controls.
    ///
    /// Cutting it to zero removes the child owner; raising it from zero
    /// produces one if the mesh already has a finer level.
    pub fn set_res_level(&mut self, id: OwnerId, res_level: u32) -> Result<()> {
        let owner = self.owner_mut(id)?;
        if owner.res_level() == res_level {
            return Ok(());
        }
        owner.set_res_level_raw(res_level);
        match owner.child() {
            Some(child) if res_level == 0 => self.remove_owner(child),
            Some(child) => self.set_res_level(child, res_level - 1),
            None if res_level > 0 => self.produce_child(id).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Creates the child owner one level finer and copies every meme into
    /// it. Recurses while the child's resolution level is positive.
    ///
    /// Returns the child, or `None` if the owner has no resolution to spare
    /// or the mesh has no finer level yet.
    pub fn produce_child(&mut self, id: OwnerId) -> Result<Option<OwnerId>> {
        let owner = self.owner(id)?;
        if let Some(child) = owner.child() {
            return Ok(Some(child));
        }
        if owner.res_level() == 0 || self.mesh.finest_level() <= owner.level() {
            return Ok(None);
        }

        let child_id = self.alloc_owner_id();
        let owner = self.owner(id)?;
        let child = owner.new_child(child_id);
        let active = owner.is_active();
        log::debug!("owner {id} produced child {child_id} ({})", child.identifier());
        self.owners.insert(child_id, child);
        self.owner_mut(id)?.set_child(Some(child_id));

        self.propagate_memes(id)?;
        if self.owner(child_id)?.res_level() > 0 {
            self.produce_child(child_id)?;
        }
        if active {
            self.activate_owner(child_id)?;
        }
        Ok(Some(child_id))
    }

    /// Generates subdivision memes for every meme of the owner.
    fn propagate_memes(&mut self, id: OwnerId) -> Result<()> {
        let owner = self.owner(id)?;
        let (verts, edges, faces) = (owner.vert_memes(), owner.edge_memes(), owner.face_memes());
        for m in verts {
            self.get_vert_child(m)?;
        }
        for m in edges {
            self.edge_gen_subdiv_memes(m)?;
        }
        for m in faces {
            self.face_gen_subdiv_memes(m)?;
        }
        Ok(())
    }

    /// Makes the owner (and its child, while it has resolution to spare)
    /// active with all vertex memes hot.
    pub fn activate_owner(&mut self, id: OwnerId) -> Result<()> {
        for m in self.owner(id)?.vert_memes() {
            self.set_hot(m)?;
        }
        let owner = self.owner_mut(id)?;
        owner.set_active(true);
        if owner.res_level() > 0 {
            if let Some(child) = owner.child() {
                self.activate_owner(child)?;
            }
        }
        Ok(())
    }

    pub fn deactivate_owner(&mut self, id: OwnerId) -> Result<()> {
        self.owner_mut(id)?.set_active(false);
        Ok(())
    }

    // === Memes ===

    pub fn meme(&self, id: MemeId) -> Result<&Meme> {
        self.owners
            .get(&id.owner)
            .and_then(|o| o.meme(id))
            .ok_or(MemeError::UnknownMeme(id))
    }

    pub(crate) fn meme_mut(&mut self, id: MemeId) -> Result<&mut Meme> {
        self.owners
            .get_mut(&id.owner)
            .and_then(|o| o.meme_mut(id))
            .ok_or(MemeError::UnknownMeme(id))
    }

    pub fn contains_meme(&self, id: MemeId) -> bool {
        self.meme(id).is_ok()
    }

    pub fn simplex_of(&self, id: MemeId) -> Result<Simplex> {
        Ok(self.meme(id)?.simplex())
    }

    pub fn kind_of(&self, id: MemeId) -> Result<MemeKind> {
        Ok(self.meme(id)?.kind())
    }

    /// Registers a new meme with its owner and its element.
    ///
    /// Returns the owner's existing meme on the element if there is one.
    pub(crate) fn attach_meme(
        &mut self,
        owner: OwnerId,
        s: Simplex,
        body: MemeBody,
        claim: Claim,
    ) -> Result<MemeId> {
        let level = self.owner(owner)?.level();
        self.require(s)?;
        if let Some(existing) = self.slots.find_meme(s, owner) {
            return Ok(existing);
        }
        if self.mesh.level(s) != Some(level) {
            return Err(invariant!("{s} is not at level {level} of owner {owner}"));
        }

        let key = match claim {
            Claim::Observe => SlotKey::Owner(owner),
            Claim::IfFree if self.slots.find_boss(s).is_none() => SlotKey::Boss,
            Claim::IfFree => SlotKey::Owner(owner),
            Claim::Force => {
                if let Some(boss) = self.slots.find_boss(s) {
                    self.get_demoted(boss)?;
                }
                SlotKey::Boss
            }
        };

        let id = self.owner_mut(owner)?.insert_meme(s, body);
        if let Err(err) = self.slots.attach(s, key, id) {
            self.owner_mut(owner)?.remove_meme(id);
            return Err(err);
        }
        log::trace!("owner {owner} added {} meme {id} on {s}", MemeKind::of(s));

        if key == SlotKey::Boss {
            self.invalidate(owner);
            if let Simplex::Vert(v) = s {
                self.mark_parent_dirty(v);
            }
        }
        Ok(id)
    }

    /// Generates the meme's subdivision memes in the child owner.
    pub fn gen_subdiv_memes(&mut self, meme: MemeId) -> Result<()> {
        match self.kind_of(meme)? {
            MemeKind::Vert => self.get_vert_child(meme).map(|_| ()),
            MemeKind::Edge => self.edge_gen_subdiv_memes(meme),
            MemeKind::Face => self.face_gen_subdiv_memes(meme),
        }
    }

    /// Handles the location of the subdivision vertex of the meme's
    /// element. Returns true if a meme controls it.
    pub fn handle_subdiv_calc(&mut self, meme: MemeId) -> Result<bool> {
        match self.kind_of(meme)? {
            MemeKind::Vert => self.vert_handle_subdiv_calc(meme),
            MemeKind::Edge => self.edge_handle_subdiv_calc(meme),
            MemeKind::Face => Err(invariant!("face meme {meme} has no subdivision vertex")),
        }
    }

    // === Finders ===

    pub fn find_boss_meme(&self, s: Simplex) -> Option<MemeId> {
        self.slots.find_boss(s)
    }

    /// The owner of the element's boss meme.
    pub fn find_owner(&self, s: Simplex) -> Option<OwnerId> {
        self.find_boss_meme(s).map(|m| m.owner)
    }

    /// The owner controlling the element: the owner of its boss meme, or
    /// of the nearest subdivision ancestor that has one.
    pub fn find_controller(&self, s: Simplex) -> Option<OwnerId> {
        if !self.mesh.contains(s) {
            return None;
        }
        let mut cur = Some(s);
        while let Some(x) = cur {
            if let Some(owner) = self.find_owner(x) {
                return Some(owner);
            }
            cur = self.mesh.parent(x);
        }
        None
    }

    pub fn find_meme(&self, owner: OwnerId, s: Simplex) -> Option<MemeId> {
        self.slots.find_meme(s, owner)
    }

    /// Returns true if the owner holds the element's boss meme.
    pub fn owns(&self, owner: OwnerId, s: Simplex) -> bool {
        self.find_owner(s) == Some(owner)
    }

    pub fn has_boss(&self, s: Simplex) -> bool {
        self.find_boss_meme(s).is_some()
    }

    /// The boss memes of the vertices that have one.
    pub fn find_boss_vmemes(&self, verts: &[VertId]) -> Vec<MemeId> {
        verts
            .iter()
            .filter_map(|&v| self.find_boss_meme(v.into()))
            .collect()
    }

    /// Returns true if every vertex has a boss meme.
    pub fn is_covered(&self, verts: &[VertId]) -> bool {
        verts.iter().all(|&v| self.has_boss(v.into()))
    }

    // === Mesh events ===

    /// Subdivides the mesh once more, gives every owner working one level
    /// up a child owner and propagates memes into it.
    pub fn refine(&mut self) -> Result<u32> {
        let level = self.mesh.subdivide()?;
        let parents: Vec<OwnerId> = self
            .owners
            .values()
            .filter(|o| o.level() + 1 == level && o.res_level() > 0 && o.child().is_none())
            .map(Owner::id)
            .collect();
        for id in parents {
            self.produce_child(id)?;
        }
        log::debug!("refined mesh to level {level}");
        Ok(level)
    }

    /// Deletes a vertex (and everything the substrate removes with it).
    /// Returns the memes that were dropped.
    pub fn delete_vert(&mut self, v: VertId) -> Result<Vec<MemeId>> {
        self.require(v.into())?;
        let removed = self.mesh.delete_vert(v)?;
        let mut dropped = Vec::new();
        for s in removed {
            dropped.extend(self.notify_simplex_deleted(s));
        }
        Ok(dropped)
    }

    /// Splits an edge and delivers the split to the memes on every
    /// splitting element. Returns the memes created.
    pub fn split_edge(&mut self, e: EdgeId) -> Result<Vec<MemeId>> {
        self.require(e.into())?;
        let pairs = self.mesh.split_edge(e)?;
        let mut created = Vec::new();
        for (old, new) in pairs {
            for meme in self.slots.memes_on(old) {
                if let Some(m) = self.notify_split(meme, new)? {
                    created.push(m);
                }
            }
        }
        Ok(created)
    }

    /// Drops every meme on a deleted element, detaching each from its
    /// owner. Returns the dropped memes.
    pub fn notify_simplex_deleted(&mut self, s: Simplex) -> Vec<MemeId> {
        let boss = self.slots.find_boss(s);
        let memes = self.slots.remove_element(s);
        for &m in &memes {
            if let Some(owner) = self.owners.get_mut(&m.owner) {
                owner.remove_meme(m);
                log::debug!("owner {} dropped meme {m} with {s}", m.owner);
            }
            if boss == Some(m) {
                self.invalidate(m.owner);
            }
        }
        self.subdiv_dirty.retain(|&(_, x)| x != s);
        memes
    }

    // === Subdivision locations ===

    pub(crate) fn mark_subdiv_dirty(&mut self, s: Simplex) {
        if let Some(level) = self.mesh.level(s) {
            self.subdiv_dirty.insert((level, s));
        }
    }

    /// Marks everything whose subdivision vertex depends on `v`.
    pub(crate) fn mark_vert_moved(&mut self, v: VertId) {
        self.mark_subdiv_dirty(v.into());
        for e in self.mesh.vert_edges(v) {
            self.mark_subdiv_dirty(e.into());
            for f in self.mesh.edge_faces(e).into_iter().flatten() {
                if let Some(w) = self.mesh.face_weak_edge(f) {
                    self.mark_subdiv_dirty(w.into());
                }
            }
        }
    }

    /// Returns true if some subdivision location is waiting to be updated.
    pub fn has_dirty_subdiv_locs(&self) -> bool {
        !self.subdiv_dirty.is_empty()
    }

    /// Recomputes the default subdivision location below every dirty
    /// element, unless a meme controls it, cascading to finer levels.
    /// Returns the number of locations recomputed.
    pub fn update_subdiv_locs(&mut self) -> Result<usize> {
        let mut count = 0;
        while let Some((_, p)) = self.subdiv_dirty.pop_first() {
            if !self.mesh.contains(p) {
                continue;
            }
            let child = match p {
                Simplex::Vert(v) => self.mesh.subdiv_vert(v),
                Simplex::Edge(e) => self.mesh.edge_subdiv_vert(e),
                Simplex::Face(_) => None,
            };
            let Some(cv) = child else {
                continue;
            };
            if self.subdiv_controlled(p, cv)? {
                continue;
            }
            self.mesh.recompute_subdiv_loc(p)?;
            self.mark_vert_moved(cv);
            count += 1;
        }
        Ok(count)
    }

    fn subdiv_controlled(&mut self, p: Simplex, cv: VertId) -> Result<bool> {
        if let Some(boss) = self.find_boss_meme(p) {
            if self.handle_subdiv_calc(boss)? {
                return Ok(true);
            }
        }
        Ok(self.has_boss(cv.into()))
    }
}

impl<M> std::fmt::Debug for MemeEngine<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemeEngine")
            .field("options", &self.options)
            .field("owners", &self.owners.len())
            .field("elements", &self.slots.len())
            .finish_non_exhaustive()
    }
}
