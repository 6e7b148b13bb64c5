//! meme-rs: multi-owner control of subdivision meshes.
//!
//! Modeling tools such as curves, surfaces and primitives each want to
//! control part of a shared mesh. They do it through *memes*: per-element
//! records that an owner attaches to vertices, edges and faces. Every
//! element has at most one controlling meme, the *boss*; the others
//! observe. When the mesh is subdivided, owners get child owners one level
//! finer and their memes are propagated to the new elements.
//!
//! # Quick Start
//!
//! ```no_run
//! use meme::prelude::*;
//!
//! fn main() -> Result<()> {
//!     meme::init();
//!
//!     let mesh = SubdivMesh::quad_grid(4, 4, 1.0);
//!     let mut engine = meme::new_engine(mesh);
//!
//!     let surface = engine.add_owner("surface");
//!     let m = engine.create_vert_meme_with(surface, VertId(12), VertAttribs::Free, Claim::IfFree)?;
//!     assert!(engine.is_boss(m)?);
//!
//!     engine.set_res_level(surface, 1)?;
//!     engine.refine()?;
//!     engine.activate_owner(surface)?;
//!     engine.relax_until_cold(100)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`MemeEngine`] holds the mesh, the owners (each owning its memes) and
//!   the per-element [`SlotTable`] that records which meme is boss.
//! - [`Substrate`] is the mesh contract; [`SubdivMesh`] is the reference
//!   implementation.
//! - Vertex memes relax toward a smoothed position, cooling off after a few
//!   passes without moving; edge memes carry rest lengths; face memes pass
//!   ownership down to child faces.

mod init;

pub use init::init;

// Re-export core types
pub use meme_core::{
    edge_meme::EdgeMeme,
    engine::MemeEngine,
    error::{MemeError, Result, SubstrateError},
    face_meme::FaceMeme,
    meme::{Claim, Meme, MemeBody, MemeId, MemeKind},
    options::Options,
    owner::{InvalidateFn, Owner, OwnerId, SplitPolicy},
    relax::RelaxStats,
    simplex::{EdgeId, FaceId, Simplex, VertId},
    slots::{ElementSlots, SlotKey, SlotTable},
    substrate::Substrate,
    vert_meme::{MemeFlavor, VertAttribs, VertMeme},
    Vec2, Vec3,
};

// Re-export the reference mesh
pub use meme_mesh::SubdivMesh;

/// An engine driving the reference mesh.
pub type Engine = MemeEngine<SubdivMesh>;

/// Creates an engine over `mesh` with default options.
pub fn new_engine(mesh: SubdivMesh) -> Engine {
    MemeEngine::new(mesh)
}

/// Creates an engine over `mesh` with the given options.
pub fn new_engine_with(mesh: SubdivMesh, options: Options) -> Result<Engine> {
    MemeEngine::with_options(mesh, options)
}

/// The commonly used types.
pub mod prelude {
    pub use crate::{
        Claim, EdgeId, Engine, FaceId, MemeEngine, MemeError, MemeId, Options, OwnerId,
        RelaxStats, Result, Simplex, SplitPolicy, SubdivMesh, Substrate, Vec2, Vec3, VertAttribs,
        VertId,
    };
}
