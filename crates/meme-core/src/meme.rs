//! Memes and the base ownership protocol.
//!
//! A meme is an owner's record on a single mesh element. Several owners may
//! keep memes on the same element, but at most one of them is the boss. The
//! boss is whatever the element's slot table says it is, so the
//! single-boss rule holds structurally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge_meme::EdgeMeme;
use crate::engine::MemeEngine;
use crate::error::{invariant, Result};
use crate::face_meme::FaceMeme;
use crate::owner::{OwnerId, SplitPolicy};
use crate::simplex::{Simplex, VertId};
use crate::slots::SlotKey;
use crate::substrate::Substrate;
use crate::vert_meme::{VertAttribs, VertMeme};

/// Identifies a meme: its owner plus a per-owner serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemeId {
    pub owner: OwnerId,
    pub serial: u32,
}

impl fmt::Display for MemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.serial)
    }
}

/// The kind of element a meme sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemeKind {
    Vert,
    Edge,
    Face,
}

impl MemeKind {
    /// Returns the kind matching a simplex.
    #[must_use]
    pub fn of(simplex: Simplex) -> Self {
        match simplex {
            Simplex::Vert(_) => MemeKind::Vert,
            Simplex::Edge(_) => MemeKind::Edge,
            Simplex::Face(_) => MemeKind::Face,
        }
    }
}

impl fmt::Display for MemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemeKind::Vert => "vert",
            MemeKind::Edge => "edge",
            MemeKind::Face => "face",
        };
        f.write_str(s)
    }
}

/// How a newly created meme competes for its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Claim {
    /// Start as a non-boss.
    #[default]
    Observe,
    /// Become boss if the element has none.
    IfFree,
    /// Become boss, demoting any current boss.
    Force,
}

/// Per-kind meme state.
#[derive(Debug, Clone)]
pub enum MemeBody {
    Vert(VertMeme),
    Edge(EdgeMeme),
    Face(FaceMeme),
}

/// An owner's record on one mesh element.
#[derive(Debug, Clone)]
pub struct Meme {
    id: MemeId,
    simplex: Simplex,
    body: MemeBody,
}

impl Meme {
    pub(crate) fn new(id: MemeId, simplex: Simplex, body: MemeBody) -> Self {
        Self { id, simplex, body }
    }

    #[must_use]
    pub fn id(&self) -> MemeId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.id.owner
    }

    #[must_use]
    pub fn simplex(&self) -> Simplex {
        self.simplex
    }

    #[must_use]
    pub fn kind(&self) -> MemeKind {
        MemeKind::of(self.simplex)
    }

    #[must_use]
    pub fn body(&self) -> &MemeBody {
        &self.body
    }

    #[must_use]
    pub fn as_vert(&self) -> Option<&VertMeme> {
        match &self.body {
            MemeBody::Vert(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_vert_mut(&mut self) -> Option<&mut VertMeme> {
        match &mut self.body {
            MemeBody::Vert(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edge(&self) -> Option<&EdgeMeme> {
        match &self.body {
            MemeBody::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn as_edge_mut(&mut self) -> Option<&mut EdgeMeme> {
        match &mut self.body {
            MemeBody::Edge(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_face(&self) -> Option<&FaceMeme> {
        match &self.body {
            MemeBody::Face(f) => Some(f),
            _ => None,
        }
    }
}

impl<M: Substrate> MemeEngine<M> {
    /// Returns true if the meme is the boss of its element.
    pub fn is_boss(&self, meme: MemeId) -> Result<bool> {
        let s = self.simplex_of(meme)?;
        Ok(self.slots().is_boss(s, meme))
    }

    /// Makes the meme the boss of its element, demoting the current boss.
    ///
    /// Returns false if the meme already was the boss.
    pub fn take_charge(&mut self, meme: MemeId) -> Result<bool> {
        let s = self.simplex_of(meme)?;
        self.require(s)?;
        match self.slots().find_boss(s) {
            Some(boss) if boss == meme => return Ok(false),
            Some(boss) => {
                self.get_demoted(boss)?;
            }
            None => {}
        }
        if let Some(boss) = self.slots().find_boss(s) {
            return Err(invariant!("{s} still has boss {boss} after demotion"));
        }

        self.slots_mut().rekey(s, meme, SlotKey::Boss)?;
        log::trace!("meme {meme} took charge of {s}");
        self.invalidate(meme.owner);
        if let Simplex::Vert(v) = s {
            self.mark_parent_dirty(v);
        }
        Ok(true)
    }

    /// Gives up boss status. A demoted vertex meme demotes its child too.
    ///
    /// Returns false if the meme was not the boss.
    pub fn get_demoted(&mut self, meme: MemeId) -> Result<bool> {
        let s = self.simplex_of(meme)?;
        if !self.slots().is_boss(s, meme) {
            return Ok(false);
        }

        self.slots_mut().rekey(s, meme, SlotKey::Owner(meme.owner))?;
        log::trace!("meme {meme} demoted on {s}");
        self.invalidate(meme.owner);
        if let Simplex::Vert(v) = s {
            self.mark_parent_dirty(v);
            if let Some(child) = self.vert_child(meme)? {
                self.get_demoted(child)?;
            }
        }
        Ok(true)
    }

    /// Reacts to the meme's element being split, with `new` the element
    /// split off from it.
    ///
    /// Under [`SplitPolicy::Inherit`] the owner gets a meme of the same kind
    /// on the new element, claiming it only if the splitting meme is boss.
    /// Returns the new meme, if one was made.
    pub fn notify_split(&mut self, meme: MemeId, new: Simplex) -> Result<Option<MemeId>> {
        let owner = meme.owner;
        if self.owner(owner)?.split_policy() == SplitPolicy::Ignore {
            log::debug!("owner {owner} ignores split of {}", self.simplex_of(meme)?);
            return Ok(None);
        }
        let claim = if self.is_boss(meme)? {
            Claim::IfFree
        } else {
            Claim::Observe
        };

        let created = match new {
            Simplex::Vert(v) => {
                let attribs = self.split_attribs(meme, v)?;
                let id = self.create_vert_meme_with(owner, v, attribs, claim)?;
                if self.meme(meme)?.as_vert().is_some_and(VertMeme::is_pinned) {
                    self.pin(id)?;
                }
                id
            }
            Simplex::Edge(e) => {
                let id = self.create_edge_meme_with(owner, e, claim)?;
                if self.meme(meme)?.kind() == MemeKind::Edge && self.has_rest_length(meme)? {
                    let half = self.stored_rest_length(meme)? / 2.0;
                    self.set_rest_length(meme, half)?;
                    self.set_rest_length(id, half)?;
                }
                id
            }
            Simplex::Face(f) => self.create_face_meme_with(owner, f, claim)?,
        };
        log::trace!("meme {meme} split off {created} on {new}");
        Ok(Some(created))
    }

    /// Attributes for a vertex meme split off from `meme` onto `v`.
    ///
    /// An edge meme blends its owner's memes on the two endpoints the edge
    /// had before the split: the one it kept, and the one across `v` that
    /// is no longer joined to it.
    fn split_attribs(&self, meme: MemeId, v: VertId) -> Result<VertAttribs> {
        let m = self.meme(meme)?;
        if let Some(vm) = m.as_vert() {
            return Ok(*vm.attribs());
        }
        let Simplex::Edge(e) = m.simplex() else {
            return Ok(VertAttribs::default());
        };
        let mesh = self.mesh();
        let Some(a) = mesh.other_vertex(e, v) else {
            return Ok(VertAttribs::default());
        };
        let b = mesh
            .vert_edges(v)
            .into_iter()
            .filter_map(|x| mesh.other_vertex(x, v))
            .find(|&n| n != a && mesh.lookup_edge(a, n).is_none());
        let owner = meme.owner;
        let ends = b.and_then(|b| {
            let ma = self.slots().find_meme(a.into(), owner)?;
            let mb = self.slots().find_meme(b.into(), owner)?;
            Some((ma, mb))
        });
        if let Some((ma, mb)) = ends {
            let blended = VertAttribs::midpoint(self.attribs(ma)?, self.attribs(mb)?);
            return Ok(blended.unwrap_or_default());
        }
        Ok(VertAttribs::default())
    }
}
