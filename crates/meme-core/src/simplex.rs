//! Mesh element identities.
//!
//! The engine never owns mesh elements. It refers to them through the
//! small copyable ids below, which a [`Substrate`](crate::substrate::Substrate)
//! hands out and resolves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a vertex of the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertId(pub u32);

/// Identifies an edge of the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Identifies a (triangular) face of the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub u32);

impl VertId {
    /// Returns the id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    /// Returns the id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    /// Returns the id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Any mesh element: vertex, edge or face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Simplex {
    Vert(VertId),
    Edge(EdgeId),
    Face(FaceId),
}

impl Simplex {
    /// Dimension of the element: 0 for vertices, 1 for edges, 2 for faces.
    pub fn dim(self) -> u8 {
        match self {
            Simplex::Vert(_) => 0,
            Simplex::Edge(_) => 1,
            Simplex::Face(_) => 2,
        }
    }

    pub fn as_vert(self) -> Option<VertId> {
        match self {
            Simplex::Vert(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_edge(self) -> Option<EdgeId> {
        match self {
            Simplex::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_face(self) -> Option<FaceId> {
        match self {
            Simplex::Face(f) => Some(f),
            _ => None,
        }
    }
}

impl From<VertId> for Simplex {
    fn from(v: VertId) -> Self {
        Simplex::Vert(v)
    }
}

impl From<EdgeId> for Simplex {
    fn from(e: EdgeId) -> Self {
        Simplex::Edge(e)
    }
}

impl From<FaceId> for Simplex {
    fn from(f: FaceId) -> Self {
        Simplex::Face(f)
    }
}

impl fmt::Display for Simplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Simplex::Vert(v) => fmt::Display::fmt(v, f),
            Simplex::Edge(e) => fmt::Display::fmt(e, f),
            Simplex::Face(face) => fmt::Display::fmt(face, f),
        }
    }
}
