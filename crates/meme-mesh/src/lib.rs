//! Reference substrate for meme-rs.
//!
//! [`SubdivMesh`] is a triangle mesh (with quads as triangle pairs) that
//! implements [`meme_core::Substrate`]: a multiresolution hierarchy built by
//! midpoint 1-to-4 subdivision, plus vertex deletion and edge splitting.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Grid coordinates are small enough for f32
#![allow(clippy::cast_precision_loss)]

pub mod subdiv_mesh;

pub use subdiv_mesh::SubdivMesh;
