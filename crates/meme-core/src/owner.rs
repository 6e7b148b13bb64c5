//! Owners: the controllers that create and hold memes.
//!
//! An owner is whatever higher-level tool (a curve, a surface, a
//! primitive) claims part of the mesh. Owners form a chain down the
//! subdivision hierarchy: an owner with a positive resolution level gets a
//! single child owner operating one level finer, which receives copies of
//! the parent's memes as subdivision elements appear.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meme::{Meme, MemeBody, MemeId, MemeKind};
use crate::simplex::Simplex;

/// Identifies an owner registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u32);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an owner does when one of its elements splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Leave the new element alone.
    #[default]
    Ignore,
    /// Put a meme of the same kind on the new element.
    Inherit,
}

/// Callback fired when boss status changes among an owner's memes.
///
/// Registered on a control owner; receives the id of the owner (the
/// control owner or one of its subdivision children) whose meme changed.
pub type InvalidateFn = Box<dyn FnMut(OwnerId)>;

/// A controller of mesh elements.
pub struct Owner {
    id: OwnerId,
    name: String,
    /// Subdivision level of the mesh elements this owner works on.
    level: u32,
    /// Number of finer levels this owner keeps control of.
    res_level: u32,
    parent: Option<OwnerId>,
    child: Option<OwnerId>,
    split_policy: SplitPolicy,
    smoothing_barrier: bool,
    dirty: bool,
    active: bool,
    on_invalidate: Option<InvalidateFn>,
    memes: BTreeMap<MemeId, Meme>,
    next_serial: u32,
}

impl Owner {
    pub(crate) fn new(id: OwnerId, name: impl Into<String>, level: u32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            res_level: 0,
            parent: None,
            child: None,
            split_policy: SplitPolicy::default(),
            smoothing_barrier: false,
            dirty: false,
            active: false,
            on_invalidate: None,
            memes: BTreeMap::new(),
            next_serial: 0,
        }
    }

    /// Creates the child owner one subdivision level finer.
    pub(crate) fn new_child(&self, id: OwnerId) -> Self {
        let mut child = Owner::new(id, self.name.clone(), self.level + 1);
        child.parent = Some(self.id);
        child.res_level = self.res_level.saturating_sub(1);
        child.split_policy = self.split_policy;
        child.smoothing_barrier = self.smoothing_barrier;
        child
    }

    #[must_use]
    pub fn id(&self) -> OwnerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name and level, for diagnostics.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.name, self.level)
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn res_level(&self) -> u32 {
        self.res_level
    }

    pub(crate) fn set_res_level_raw(&mut self, r: u32) {
        self.res_level = r;
    }

    #[must_use]
    pub fn parent(&self) -> Option<OwnerId> {
        self.parent
    }

    #[must_use]
    pub fn child(&self) -> Option<OwnerId> {
        self.child
    }

    pub(crate) fn set_child(&mut self, child: Option<OwnerId>) {
        self.child = child;
    }

    /// Returns true for the top of an owner chain.
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn split_policy(&self) -> SplitPolicy {
        self.split_policy
    }

    pub fn set_split_policy(&mut self, policy: SplitPolicy) {
        self.split_policy = policy;
    }

    /// Returns true if edges controlled by this owner are kept out of
    /// other owners' smoothing.
    #[must_use]
    pub fn smoothing_barrier(&self) -> bool {
        self.smoothing_barrier
    }

    pub fn set_smoothing_barrier(&mut self, barrier: bool) {
        self.smoothing_barrier = barrier;
    }

    /// Returns true if boss status changed among this owner's memes since
    /// the last [`Owner::clear_dirty`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true if the owner is scheduled for relaxation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Registers the invalidate callback.
    pub fn set_on_invalidate(&mut self, f: impl FnMut(OwnerId) + 'static) {
        self.on_invalidate = Some(Box::new(f));
    }

    pub(crate) fn fire_invalidate(&mut self, changed: OwnerId) {
        if let Some(f) = self.on_invalidate.as_mut() {
            f(changed);
        }
    }

    // === Memes ===

    #[must_use]
    pub fn meme(&self, id: MemeId) -> Option<&Meme> {
        self.memes.get(&id)
    }

    pub(crate) fn meme_mut(&mut self, id: MemeId) -> Option<&mut Meme> {
        self.memes.get_mut(&id)
    }

    /// Returns all memes, in creation order.
    pub fn memes(&self) -> impl Iterator<Item = &Meme> {
        self.memes.values()
    }

    /// Returns the ids of memes of the given kind, in creation order.
    #[must_use]
    pub fn meme_ids(&self, kind: MemeKind) -> Vec<MemeId> {
        self.memes
            .values()
            .filter(|m| m.kind() == kind)
            .map(Meme::id)
            .collect()
    }

    #[must_use]
    pub fn vert_memes(&self) -> Vec<MemeId> {
        self.meme_ids(MemeKind::Vert)
    }

    #[must_use]
    pub fn edge_memes(&self) -> Vec<MemeId> {
        self.meme_ids(MemeKind::Edge)
    }

    #[must_use]
    pub fn face_memes(&self) -> Vec<MemeId> {
        self.meme_ids(MemeKind::Face)
    }

    #[must_use]
    pub fn num_memes(&self) -> usize {
        self.memes.len()
    }

    pub(crate) fn insert_meme(&mut self, simplex: Simplex, body: MemeBody) -> MemeId {
        let id = MemeId {
            owner: self.id,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.memes.insert(id, Meme::new(id, simplex, body));
        id
    }

    pub(crate) fn remove_meme(&mut self, id: MemeId) -> Option<Meme> {
        self.memes.remove(&id)
    }

    pub(crate) fn take_memes(&mut self) -> BTreeMap<MemeId, Meme> {
        std::mem::take(&mut self.memes)
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("level", &self.level)
            .field("res_level", &self.res_level)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("dirty", &self.dirty)
            .field("active", &self.active)
            .field("memes", &self.memes.len())
            .finish_non_exhaustive()
    }
}
