//! The mesh contract the engine drives.
//!
//! A [`Substrate`] is the multiresolution mesh that memes are attached to.
//! The engine only needs adjacency, locations and subdivision-child
//! accessors from it, plus a handful of editing entry points that report
//! which elements appeared or disappeared so the engine can notify the
//! memes involved.
//!
//! Quads are represented the usual way for this kind of mesh: two
//! triangles sharing a *weak* edge (the quad diagonal). Every other edge
//! is *strong*.

use glam::Vec3;

use crate::error::SubstrateError;
use crate::simplex::{EdgeId, FaceId, Simplex, VertId};

/// A subdivision mesh that memes can be attached to.
///
/// Accessors taking an element id may assume the element is present
/// ([`Substrate::contains`]); the engine checks before asking.
pub trait Substrate {
    // === Structure ===

    /// Returns true if the element exists.
    fn contains(&self, s: Simplex) -> bool;

    /// Subdivision level of the element (0 is the control mesh).
    fn level(&self, s: Simplex) -> Option<u32>;

    /// Finest subdivision level generated so far.
    fn finest_level(&self) -> u32;

    /// The coarser element this one was generated from, if any.
    ///
    /// A subdivision vertex has a vertex or edge parent, a subdivision
    /// edge has an edge or face parent, a subdivision face has a face parent.
    fn parent(&self, s: Simplex) -> Option<Simplex>;

    // === Vertices ===

    fn loc(&self, v: VertId) -> Vec3;

    fn set_loc(&mut self, v: VertId, p: Vec3);

    /// Incident edges, in no particular order.
    fn vert_edges(&self, v: VertId) -> Vec<EdgeId>;

    /// The child vertex one level finer, once that level exists.
    fn subdiv_vert(&self, v: VertId) -> Option<VertId>;

    // === Edges ===

    fn edge_verts(&self, e: EdgeId) -> [VertId; 2];

    fn edge_faces(&self, e: EdgeId) -> [Option<FaceId>; 2];

    /// True for quad diagonals.
    fn is_weak(&self, e: EdgeId) -> bool;

    fn edge_subdiv_vert(&self, e: EdgeId) -> Option<VertId>;

    /// The two half-edges, the first touching `edge_verts(e)[0]`'s child.
    fn edge_subdiv_edges(&self, e: EdgeId) -> Option<[EdgeId; 2]>;

    // === Faces ===

    /// Vertices in counter-clockwise order.
    fn face_verts(&self, f: FaceId) -> [VertId; 3];

    /// The quad diagonal of this face, if it is half of a quad.
    fn face_weak_edge(&self, f: FaceId) -> Option<EdgeId>;

    /// The three edges joining the edge midpoints.
    fn face_subdiv_edges(&self, f: FaceId) -> Option<[EdgeId; 3]>;

    /// Three corner faces followed by the center face.
    fn face_subdiv_faces(&self, f: FaceId) -> Option<[FaceId; 4]>;

    // === Editing ===

    /// Generates the next subdivision level and returns its number.
    fn subdivide(&mut self) -> Result<u32, SubstrateError>;

    /// Recomputes the default location of the subdivision vertex of a
    /// vertex or edge. A no-op for faces or unsubdivided elements.
    fn recompute_subdiv_loc(&mut self, parent: Simplex) -> Result<(), SubstrateError>;

    /// Deletes a vertex with everything incident to it and every
    /// subdivision element descending from those. Returns all removed
    /// elements.
    fn delete_vert(&mut self, v: VertId) -> Result<Vec<Simplex>, SubstrateError>;

    /// Splits an edge at its midpoint. Returns `(splitting, new)` pairs,
    /// one per newly created element.
    fn split_edge(&mut self, e: EdgeId) -> Result<Vec<(Simplex, Simplex)>, SubstrateError>;

    // === Provided queries ===

    fn degree(&self, v: VertId) -> usize {
        self.vert_edges(v).len()
    }

    fn is_strong(&self, e: EdgeId) -> bool {
        !self.is_weak(e)
    }

    /// The endpoint of `e` that is not `v`.
    fn other_vertex(&self, e: EdgeId, v: VertId) -> Option<VertId> {
        let [a, b] = self.edge_verts(e);
        if a == v {
            Some(b)
        } else if b == v {
            Some(a)
        } else {
            None
        }
    }

    fn edge_length(&self, e: EdgeId) -> f32 {
        let [a, b] = self.edge_verts(e);
        self.loc(a).distance(self.loc(b))
    }

    /// Average length of the incident edges (0 for an isolated vertex).
    fn avg_edge_len(&self, v: VertId) -> f32 {
        let edges = self.vert_edges(v);
        if edges.is_empty() {
            return 0.0;
        }
        let total: f32 = edges.iter().map(|&e| self.edge_length(e)).sum();
        total / edges.len() as f32
    }

    fn lookup_edge(&self, a: VertId, b: VertId) -> Option<EdgeId> {
        self.vert_edges(a)
            .into_iter()
            .find(|&e| self.other_vertex(e, a) == Some(b))
    }

    fn face_edges(&self, f: FaceId) -> [Option<EdgeId>; 3] {
        let [a, b, c] = self.face_verts(f);
        [
            self.lookup_edge(a, b),
            self.lookup_edge(b, c),
            self.lookup_edge(c, a),
        ]
    }

    fn is_quad(&self, f: FaceId) -> bool {
        self.face_weak_edge(f).is_some()
    }

    /// The vertex of `f` not on `e`.
    fn opposite_vert(&self, f: FaceId, e: EdgeId) -> Option<VertId> {
        let [a, b] = self.edge_verts(e);
        self.face_verts(f).into_iter().find(|&v| v != a && v != b)
    }

    /// The vertices opposite `e` in each of its faces.
    fn edge_opposite_verts(&self, e: EdgeId) -> [Option<VertId>; 2] {
        let [f1, f2] = self.edge_faces(e);
        [
            f1.and_then(|f| self.opposite_vert(f, e)),
            f2.and_then(|f| self.opposite_vert(f, e)),
        ]
    }

    /// The other half of the quad containing `f`.
    fn quad_partner(&self, f: FaceId) -> Option<FaceId> {
        let w = self.face_weak_edge(f)?;
        self.edge_faces(w).into_iter().flatten().find(|&g| g != f)
    }

    /// The four quad corners in counter-clockwise order.
    fn quad_verts(&self, f: FaceId) -> Option<[VertId; 4]> {
        let w = self.face_weak_edge(f)?;
        let partner = self.quad_partner(f)?;
        let verts = self.face_verts(f);
        let [p, q] = self.edge_verts(w);
        let i = verts.iter().position(|&v| v != p && v != q)?;
        let s = self.opposite_vert(partner, w)?;
        Some([verts[(i + 2) % 3], verts[i], verts[(i + 1) % 3], s])
    }

    /// The quad corner diagonally across from `v`.
    fn quad_opposite_vert(&self, f: FaceId, v: VertId) -> Option<VertId> {
        let quad = self.quad_verts(f)?;
        let i = quad.iter().position(|&x| x == v)?;
        Some(quad[(i + 2) % 4])
    }

    /// Average length of the four quad sides.
    fn quad_avg_dim(&self, f: FaceId) -> f32 {
        let Some(quad) = self.quad_verts(f) else {
            return 0.0;
        };
        let total: f32 = (0..4)
            .map(|i| self.loc(quad[i]).distance(self.loc(quad[(i + 1) % 4])))
            .sum();
        total / 4.0
    }

    /// The face adjacent to `e` in which `e` runs from `v` to its other
    /// endpoint in counter-clockwise order.
    fn ccw_face(&self, e: EdgeId, v: VertId) -> Option<FaceId> {
        let n = self.other_vertex(e, v)?;
        self.edge_faces(e).into_iter().flatten().find(|&f| {
            let verts = self.face_verts(f);
            (0..3).any(|i| verts[i] == v && verts[(i + 1) % 3] == n)
        })
    }

    /// Average length of the distinct edges of the faces adjacent to `e`
    /// (the edge's own length if it has no faces).
    fn avg_face_edge_len(&self, e: EdgeId) -> f32 {
        let mut edges: Vec<EdgeId> = self
            .edge_faces(e)
            .into_iter()
            .flatten()
            .flat_map(|f| self.face_edges(f))
            .flatten()
            .collect();
        edges.sort_unstable();
        edges.dedup();
        if edges.is_empty() {
            return self.edge_length(e);
        }
        let total: f32 = edges.iter().map(|&x| self.edge_length(x)).sum();
        total / edges.len() as f32
    }
}
