//! Face memes.

use crate::engine::MemeEngine;
use crate::error::{MemeError, Result};
use crate::meme::{Claim, MemeBody, MemeId, MemeKind};
use crate::owner::OwnerId;
use crate::simplex::FaceId;
use crate::substrate::Substrate;

/// State of a face meme. Faces carry no data of their own.
#[derive(Debug, Clone, Default)]
pub struct FaceMeme;

impl<M: Substrate> MemeEngine<M> {
    /// Puts a face meme on `f`, taking charge of it, with edge memes on its
    /// three edges. Returns the owner's existing meme if there is one.
    pub fn create_face_meme(&mut self, owner: OwnerId, f: FaceId) -> Result<MemeId> {
        self.create_face_meme_with(owner, f, Claim::Force)
    }

    pub fn create_face_meme_with(
        &mut self,
        owner: OwnerId,
        f: FaceId,
        claim: Claim,
    ) -> Result<MemeId> {
        if let Some(existing) = self.slots.find_meme(f.into(), owner) {
            return Ok(existing);
        }
        self.require(f.into())?;
        for e in self.mesh.face_edges(f).into_iter().flatten() {
            self.create_edge_meme_with(owner, e, Claim::IfFree)?;
        }
        self.attach_meme(owner, f.into(), MemeBody::Face(FaceMeme), claim)
    }

    pub fn face_of(&self, meme: MemeId) -> Result<FaceId> {
        self.simplex_of(meme)?
            .as_face()
            .ok_or(MemeError::WrongKind {
                meme,
                expected: MemeKind::Face,
            })
    }

    fn face_corner_meme(&self, meme: MemeId, which: usize) -> Result<Option<MemeId>> {
        let v = self.mesh.face_verts(self.face_of(meme)?)[which];
        Ok(self.slots.find_meme(v.into(), meme.owner))
    }

    pub fn face_v1(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.face_corner_meme(meme, 0)
    }

    pub fn face_v2(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.face_corner_meme(meme, 1)
    }

    pub fn face_v3(&self, meme: MemeId) -> Result<Option<MemeId>> {
        self.face_corner_meme(meme, 2)
    }

    /// The owner's meme on the fourth corner of the quad holding the face.
    pub fn face_vq(&self, meme: MemeId) -> Result<Option<MemeId>> {
        let f = self.face_of(meme)?;
        let Some(partner) = self.mesh.quad_partner(f) else {
            return Ok(None);
        };
        let Some(w) = self.mesh.face_weak_edge(f) else {
            return Ok(None);
        };
        Ok(self
            .mesh
            .opposite_vert(partner, w)
            .and_then(|v| self.slots.find_meme(v.into(), meme.owner)))
    }

    /// Puts the child owner's memes on the three internal edges and the
    /// four child faces. Running it again changes nothing.
    pub fn face_gen_subdiv_memes(&mut self, meme: MemeId) -> Result<()> {
        let f = self.face_of(meme)?;
        let Some(child_owner) = self.owner(meme.owner)?.child() else {
            return Ok(());
        };
        let (Some(edges), Some(faces)) = (
            self.mesh.face_subdiv_edges(f),
            self.mesh.face_subdiv_faces(f),
        ) else {
            return Ok(());
        };

        for e in edges {
            self.create_edge_meme_with(child_owner, e, Claim::IfFree)?;
        }
        for cf in faces {
            self.create_face_meme(child_owner, cf)?;
        }
        Ok(())
    }
}
