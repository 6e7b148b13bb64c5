//! Error types for meme-rs.

use thiserror::Error;

use crate::meme::{MemeId, MemeKind};
use crate::owner::OwnerId;
use crate::simplex::Simplex;

/// The main error type for meme engine operations.
///
/// Everything here is a precondition violation on the caller's side.
/// Expected refusals (mismatched flavors, an unsterilize the owner's
/// resolution level does not allow, updates under the commit threshold)
/// are not errors and come back as `Ok(None)` or `Ok(false)`.
#[derive(Error, Debug)]
pub enum MemeError {
    /// The meme is not registered (never was, or its owner or element is gone).
    #[error("meme {0} is not registered")]
    UnknownMeme(MemeId),

    /// The owner is not registered.
    #[error("owner {0} is not registered")]
    UnknownOwner(OwnerId),

    /// The simplex is not part of the substrate.
    #[error("{0} is not part of the mesh")]
    MissingSimplex(Simplex),

    /// An operation for one kind of meme was applied to another kind.
    #[error("meme {meme} is not a {expected} meme")]
    WrongKind { meme: MemeId, expected: MemeKind },

    /// An engine invariant would be broken by the requested operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An option value is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The substrate refused an operation.
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a [`Substrate`](crate::substrate::Substrate) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstrateError {
    /// The simplex does not exist (or has been deleted).
    #[error("unknown {0}")]
    UnknownSimplex(Simplex),

    /// Adding the element would give an edge more than two faces.
    #[error("{0} would become non-manifold")]
    NonManifold(Simplex),

    /// The element already has subdivision children.
    #[error("{0} already has subdivision elements")]
    AlreadySubdivided(Simplex),

    /// A face referenced the same vertex twice.
    #[error("degenerate face")]
    DegenerateFace,

    /// The substrate does not support the operation in this situation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// A specialized Result type for meme engine operations.
pub type Result<T> = std::result::Result<T, MemeError>;

/// Builds an [`MemeError::InvariantViolation`] from a format string.
macro_rules! invariant {
    ($($arg:tt)*) => {
        $crate::error::MemeError::InvariantViolation(format!($($arg)*))
    };
}

pub(crate) use invariant;
