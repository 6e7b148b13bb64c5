//! Core of meme-rs.
//!
//! Memes let several independent owners (curves, surfaces, primitives)
//! share control of a multiresolution subdivision mesh:
//! - [`Substrate`] trait for the mesh the memes annotate
//! - [`MemeEngine`] holding owners, memes and the per-element [`SlotTable`]
//! - vertex, edge and face memes with their propagation rules down the
//!   subdivision hierarchy
//! - the relaxation driver and engine [`Options`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors return plain values which don't need must_use
#![allow(clippy::must_use_candidate)]
// Element counts fit comfortably in f32 for averaging
#![allow(clippy::cast_precision_loss)]
// Engine methods are grouped by meme kind, so names repeat the kind
#![allow(clippy::module_name_repetitions)]

pub mod edge_meme;
pub mod engine;
pub mod error;
pub mod face_meme;
pub mod meme;
pub mod options;
pub mod owner;
pub mod relax;
pub mod simplex;
pub mod slots;
pub mod substrate;
pub mod vert_meme;

pub use edge_meme::EdgeMeme;
pub use engine::MemeEngine;
pub use error::{MemeError, Result, SubstrateError};
pub use face_meme::FaceMeme;
pub use meme::{Claim, Meme, MemeBody, MemeId, MemeKind};
pub use options::Options;
pub use owner::{InvalidateFn, Owner, OwnerId, SplitPolicy};
pub use relax::RelaxStats;
pub use simplex::{EdgeId, FaceId, Simplex, VertId};
pub use slots::{ElementSlots, SlotKey, SlotTable};
pub use substrate::Substrate;
pub use vert_meme::{MemeFlavor, VertAttribs, VertMeme};

// Re-export glam types for convenience
pub use glam::{Vec2, Vec3};
