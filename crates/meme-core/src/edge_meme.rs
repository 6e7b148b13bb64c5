//! Edge memes: rest lengths and propagation along split edges.

use std::f32::consts::SQRT_2;

use crate::engine::MemeEngine;
use crate::error::{MemeError, Result};
use crate::meme::{Claim, MemeBody, MemeId, MemeKind};
use crate::owner::OwnerId;
use crate::simplex::{EdgeId, Simplex, VertId};
use crate::substrate::Substrate;

/// State of an edge meme.
#[derive(Debug, Clone, Default)]
pub struct EdgeMeme {
    /// Stored rest length. Zero means unset.
    rest_length: f32,
}

impl EdgeMeme {
    #[must_use]
    pub fn stored_rest_length(&self) -> f32 {
        self.rest_length
    }

    #[must_use]
    pub fn has_rest_length(&self) -> bool {
        self.rest_length > 0.0
    }
}

impl<M: Substrate> MemeEngine<M> {
    /// Creates a non-boss edge meme, or returns the owner's existing one.
    pub fn create_edge_meme(&mut self, owner: OwnerId, e: EdgeId) -> Result<MemeId> {
        self.create_edge_meme_with(owner, e, Claim::Observe)
    }

    pub fn create_edge_meme_with(
        &mut self,
        owner: OwnerId,
        e: EdgeId,
        claim: Claim,
    ) -> Result<MemeId> {
        self.attach_meme(owner, e.into(), MemeBody::Edge(EdgeMeme::default()), claim)
    }

    pub fn edge_of(&self, meme: MemeId) -> Result<EdgeId> {
        self.simplex_of(meme)?
            .as_edge()
            .ok_or(MemeError::WrongKind {
                meme,
                expected: MemeKind::Edge,
            })
    }

    pub fn edge_meme(&self, meme: MemeId) -> Result<&EdgeMeme> {
        self.meme(meme)?.as_edge().ok_or(MemeError::WrongKind {
            meme,
            expected: MemeKind::Edge,
        })
    }

    fn edge_meme_mut(&mut self, meme: MemeId) -> Result<&mut EdgeMeme> {
        self.meme_mut(meme)?
            .as_edge_mut()
            .ok_or(MemeError::WrongKind {
                meme,
                expected: MemeKind::Edge,
            })
    }

    // === Rest length ===

    /// The stored rest length, or the local length if none is stored.
    pub fn rest_length(&self, meme: MemeId) -> Result<f32> {
        let state = self.edge_meme(meme)?;
        if state.has_rest_length() {
            Ok(state.rest_length)
        } else {
            Ok(self.local_length(self.edge_of(meme)?))
        }
    }

    pub fn stored_rest_length(&self, meme: MemeId) -> Result<f32> {
        Ok(self.edge_meme(meme)?.rest_length)
    }

    pub fn has_rest_length(&self, meme: MemeId) -> Result<bool> {
        Ok(self.edge_meme(meme)?.has_rest_length())
    }

    /// Stores a rest length. If it changed, each child edge gets half.
    #[allow(clippy::float_cmp)]
    pub fn set_rest_length(&mut self, meme: MemeId, len: f32) -> Result<()> {
        let state = self.edge_meme_mut(meme)?;
        if state.rest_length == len {
            return Ok(());
        }
        state.rest_length = len;
        self.propagate_length(meme, len / 2.0)
    }

    /// Clears the stored rest length here and on descendants.
    pub fn clear_rest_length(&mut self, meme: MemeId) -> Result<()> {
        self.set_rest_length(meme, 0.0)
    }

    /// Stores the current local length as the rest length.
    pub fn freeze_rest_length(&mut self, meme: MemeId) -> Result<()> {
        let len = self.local_length(self.edge_of(meme)?);
        self.set_rest_length(meme, len)
    }

    /// Takes the rest length from the parent edge's meme in the parent
    /// owner, if that one has a stored value.
    pub fn acquire_rest_length(&mut self, meme: MemeId) -> Result<bool> {
        let e = self.edge_of(meme)?;
        let Some(parent_owner) = self.owner(meme.owner)?.parent() else {
            return Ok(false);
        };
        let Some(Simplex::Edge(pe)) = self.mesh.parent(e.into()) else {
            return Ok(false);
        };
        let Some(pm) = self.slots.find_meme(pe.into(), parent_owner) else {
            return Ok(false);
        };
        if !self.has_rest_length(pm)? {
            return Ok(false);
        }
        let half = self.stored_rest_length(pm)? / 2.0;
        self.set_rest_length(meme, half)?;
        Ok(true)
    }

    /// Sets `len` on both child-edge memes.
    pub fn propagate_length(&mut self, meme: MemeId, len: f32) -> Result<()> {
        for child in [self.edge_child_e1(meme)?, self.edge_child_e2(meme)?]
            .into_iter()
            .flatten()
        {
            self.set_rest_length(child, len)?;
        }
        Ok(())
    }

    /// Length implied by the neighbourhood: the average face-edge length
    /// for a strong edge, or the quad diagonal for a weak one.
    pub fn local_length(&self, e: EdgeId) -> f32 {
        if self.mesh.is_strong(e) {
            return self.mesh.avg_face_edge_len(e);
        }
        match self.mesh.edge_faces(e)[0] {
            Some(f) if self.mesh.is_quad(f) => SQRT_2 * self.mesh.quad_avg_dim(f),
            _ => self.mesh.edge_length(e),
        }
    }

    /// Rest length of an edge: its boss edge meme's, or the local length.
    pub fn lookup_rest_length(&self, e: EdgeId) -> Result<f32> {
        match self.find_boss_meme(e.into()) {
            Some(boss) => self.rest_length(boss),
            None => Ok(self.local_length(e)),
        }
    }

    // === Neighbours ===

    fn edge_endpoint_meme(&self, meme: MemeId, which: usize) -> Result<Option<MemeId>> {
        let v = self.mesh.edge_verts(self.edge_of(meme)?)[which];
        Ok(self.slots.find_meme(v.into(), meme.owner))
    }

    fn edge_opposite_meme(&self, meme: MemeId, which: usize) -> Result<Option<MemeId>> {
        let v: Option<VertId> = self.mesh.edge_opposite_verts(self.edge_of(meme)?)[which];
        Ok(v.and_then(|v| self.slots.find_meme(v.into(), meme.owner)))
    }

    /// The owner's meme on the first endpoint.
    pub fn edge_v1(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_endpoint_meme(meme, 0)
    }

    pub fn edge_v2(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_endpoint_meme(meme, 1)
    }

    /// The owner's meme on the vertex opposite the edge in its first face.
    pub fn edge_vf1(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_opposite_meme(meme, 0)
    }

    pub fn edge_vf2(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_opposite_meme(meme, 1)
    }

    // === Hierarchy ===

    /// The child owner's meme on the edge's subdivision vertex.
    pub fn edge_child(&self, meme: MemeId) -> Result<Option<MemeId>> {
        let e = self.edge_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            return Ok(None);
        };
        Ok(self
            .mesh
            .edge_subdiv_vert(e)
            .and_then(|v| self.slots.find_meme(v.into(), child_owner)))
    }

    fn edge_child_edge(&self, meme: MemeId, which: usize) -> Result<Option<MemeId>> {
        let e = self.edge_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            return Ok(None);
        };
        Ok(self
            .mesh
            .edge_subdiv_edges(e)
            .and_then(|es| self.slots.find_meme(es[which].into(), child_owner)))
    }

    /// The child owner's meme on the first half of the edge.
    pub fn edge_child_e1(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_child_edge(meme, 0)
    }

    pub fn edge_child_e2(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_child_edge(meme, 1)
    }

    /// Returns the child vertex meme, generating subdivision memes first.
    pub fn get_edge_child(&mut self, meme: MemeId) -> Result<Option<MemeId>> {
        self.edge_gen_subdiv_memes(meme)?;
        self.edge_child(meme)
    }

    pub fn update_edge_child(&mut self, meme: MemeId) -> Result<Option<MemeId>> {
        let child = self.get_edge_child(meme)?;
        if let Some(c) = child {
            self.update_from_parent(c)?;
        }
        Ok(child)
    }

    /// Same contract as [`MemeEngine::vert_handle_subdiv_calc`].
    pub fn edge_handle_subdiv_calc(&mut self, meme: MemeId) -> Result<bool> {
        match self.get_edge_child(meme)? {
            Some(child) => self.is_boss(child),
            None => Ok(false),
        }
    }

    /// Puts the child owner's memes on the two half edges and the midpoint
    /// vertex. The vertex meme is made from the endpoint memes on a strong
    /// edge, or from the four quad corners on a weak one. A non-boss edge
    /// meme leaves its vertex child non-boss.
    pub fn edge_gen_subdiv_memes(&mut self, meme: MemeId) -> Result<()> {
        let e = self.edge_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            log::debug!("meme {meme}: owner {} has no child", meme.owner);
            return Ok(());
        };
        let Some([e1, e2]) = self.mesh.edge_subdiv_edges(e) else {
            return Ok(());
        };

        self.create_edge_meme_with(child_owner, e1, Claim::IfFree)?;
        self.create_edge_meme_with(child_owner, e2, Claim::IfFree)?;
        if self.has_rest_length(meme)? {
            let half = self.stored_rest_length(meme)? / 2.0;
            self.propagate_length(meme, half)?;
        }

        let Some(lv) = self.mesh.edge_subdiv_vert(e) else {
            return Ok(());
        };
        let child = if self.mesh.is_weak(e) {
            match (
                self.edge_v1(meme)?,
                self.edge_v2(meme)?,
                self.edge_vf1(meme)?,
                self.edge_vf2(meme)?,
            ) {
                (Some(a), Some(b), Some(c), Some(d)) => self.gen_child4(lv, [a, b, c, d])?,
                _ => None,
            }
        } else {
            match (self.edge_v1(meme)?, self.edge_v2(meme)?) {
                (Some(a), Some(b)) => self.gen_child2(lv, a, b)?,
                _ => None,
            }
        };

        if let Some(c) = child {
            if !self.is_boss(meme)? && self.is_boss(c)? {
                self.get_demoted(c)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_length_unset_by_default() {
        let em = EdgeMeme::default();
        assert!(!em.has_rest_length());
        assert!(em.stored_rest_length().abs() < f32::EPSILON);
    }

    #[test]
    fn test_has_rest_length() {
        let em = EdgeMeme { rest_length: 0.5 };
        assert!(em.has_rest_length());
    }
}
