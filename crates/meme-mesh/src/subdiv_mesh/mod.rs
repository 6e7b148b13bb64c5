//! Triangle mesh with a 1-to-4 subdivision hierarchy.

mod edit;
mod refine;

use std::collections::HashMap;

use glam::Vec3;
use meme_core::{EdgeId, FaceId, Simplex, Substrate, SubstrateError, VertId};

#[derive(Debug, Clone)]
struct VertRec {
    loc: Vec3,
    level: u32,
    parent: Option<Simplex>,
    edges: Vec<EdgeId>,
    subdiv: Option<VertId>,
    alive: bool,
}

#[derive(Debug, Clone)]
struct EdgeRec {
    verts: [VertId; 2],
    faces: [Option<FaceId>; 2],
    weak: bool,
    level: u32,
    parent: Option<Simplex>,
    subdiv_vert: Option<VertId>,
    subdiv_edges: Option<[EdgeId; 2]>,
    alive: bool,
}

#[derive(Debug, Clone)]
struct FaceRec {
    /// Counter-clockwise.
    verts: [VertId; 3],
    edges: [EdgeId; 3],
    weak_edge: Option<EdgeId>,
    level: u32,
    parent: Option<Simplex>,
    subdiv_edges: Option<[EdgeId; 3]>,
    subdiv_faces: Option<[FaceId; 4]>,
    alive: bool,
}

/// A triangle mesh with quads stored as triangle pairs, subdivided 1-to-4
/// one level at a time.
///
/// Subdivision keeps every vertex where it is, puts a new vertex at the
/// midpoint of each strong edge and at the centre of each quad (the
/// midpoint of its weak diagonal), and splits every triangle into three
/// corner triangles and a centre one. Quads stay quads: each child edge
/// inherits its parent edge's weak flag, and inside a quad half the
/// internal edge away from the quad centre becomes the new diagonal.
#[derive(Debug, Clone, Default)]
pub struct SubdivMesh {
    verts: Vec<VertRec>,
    edges: Vec<EdgeRec>,
    faces: Vec<FaceRec>,
    edge_lookup: HashMap<(VertId, VertId), EdgeId>,
    finest: u32,
}

fn edge_key(a: VertId, b: VertId) -> (VertId, VertId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl SubdivMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a control mesh from positions and triangles.
    pub fn from_tris(positions: &[Vec3], tris: &[[u32; 3]]) -> Result<Self, SubstrateError> {
        let mut mesh = Self::new();
        let verts: Vec<VertId> = positions.iter().map(|&p| mesh.add_vert(p)).collect();
        for t in tris {
            let [a, b, c] = mesh.lookup_verts(&verts, *t)?;
            mesh.add_tri(a, b, c)?;
        }
        Ok(mesh)
    }

    /// Builds a control mesh from positions and counter-clockwise quads.
    pub fn from_quads(positions: &[Vec3], quads: &[[u32; 4]]) -> Result<Self, SubstrateError> {
        let mut mesh = Self::new();
        let verts: Vec<VertId> = positions.iter().map(|&p| mesh.add_vert(p)).collect();
        for q in quads {
            let [a, b, c, d] = mesh.lookup_verts(&verts, *q)?;
            mesh.add_quad(a, b, c, d)?;
        }
        Ok(mesh)
    }

    /// A flat grid of `cols` x `rows` unit quads in the XY plane, with
    /// vertex `(i, j)` at `(i, j, 0) * spacing` and id `j * (cols + 1) + i`.
    pub fn quad_grid(cols: u32, rows: u32, spacing: f32) -> Self {
        let mut positions = Vec::new();
        for j in 0..=rows {
            for i in 0..=cols {
                positions.push(Vec3::new(i as f32, j as f32, 0.0) * spacing);
            }
        }
        let idx = |i: u32, j: u32| j * (cols + 1) + i;
        let mut quads = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                quads.push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
            }
        }
        Self::from_quads(&positions, &quads).unwrap_or_else(|err| {
            log::warn!("{cols}x{rows} grid not built: {err}");
            Self::default()
        })
    }

    fn lookup_verts<const N: usize>(
        &self,
        verts: &[VertId],
        idx: [u32; N],
    ) -> Result<[VertId; N], SubstrateError> {
        let mut out = [VertId(0); N];
        for (slot, i) in out.iter_mut().zip(idx) {
            *slot = *verts
                .get(i as usize)
                .ok_or(SubstrateError::UnknownSimplex(Simplex::Vert(VertId(i))))?;
        }
        Ok(out)
    }

    // === Control mesh editing ===

    fn check_editable(&self) -> Result<(), SubstrateError> {
        if self.finest > 0 {
            return Err(SubstrateError::Unsupported(
                "control mesh is fixed once subdivided".into(),
            ));
        }
        Ok(())
    }

    /// Adds a control vertex.
    pub fn add_vert(&mut self, loc: Vec3) -> VertId {
        self.push_vert(loc, 0, None)
    }

    /// Adds a control triangle, given counter-clockwise.
    pub fn add_tri(&mut self, a: VertId, b: VertId, c: VertId) -> Result<FaceId, SubstrateError> {
        self.check_editable()?;
        self.check_face([a, b, c])?;
        Ok(self.push_face([a, b, c], 0, None))
    }

    /// Adds a control quad, given counter-clockwise, as triangles
    /// `(a, b, c)` and `(a, c, d)` with the diagonal `a-c` weak.
    pub fn add_quad(
        &mut self,
        a: VertId,
        b: VertId,
        c: VertId,
        d: VertId,
    ) -> Result<[FaceId; 2], SubstrateError> {
        self.check_editable()?;
        if self.find_edge(a, c).is_some() {
            return Err(SubstrateError::NonManifold(Simplex::Vert(a)));
        }
        self.check_face([a, b, c])?;
        self.check_face([a, c, d])?;
        let f1 = self.push_face([a, b, c], 0, None);
        let f2 = self.push_face([a, c, d], 0, None);
        if let Some(diag) = self.find_edge(a, c) {
            self.edges[diag.index()].weak = true;
            self.faces[f1.index()].weak_edge = Some(diag);
            self.faces[f2.index()].weak_edge = Some(diag);
        }
        Ok([f1, f2])
    }

    /// Checks that a triangle can be added without breaking manifoldness.
    fn check_face(&self, verts: [VertId; 3]) -> Result<(), SubstrateError> {
        for v in verts {
            if !self.contains(v.into()) {
                return Err(SubstrateError::UnknownSimplex(v.into()));
            }
        }
        let [a, b, c] = verts;
        if a == b || b == c || c == a {
            return Err(SubstrateError::DegenerateFace);
        }
        for (x, y) in [(a, b), (b, c), (c, a)] {
            if let Some(e) = self.find_edge(x, y) {
                if self.edges[e.index()].faces.iter().all(Option::is_some) {
                    return Err(SubstrateError::NonManifold(e.into()));
                }
            }
        }
        Ok(())
    }

    // === Low-level construction ===

    fn push_vert(&mut self, loc: Vec3, level: u32, parent: Option<Simplex>) -> VertId {
        let id = VertId(to_u32(self.verts.len()));
        self.verts.push(VertRec {
            loc,
            level,
            parent,
            edges: Vec::new(),
            subdiv: None,
            alive: true,
        });
        id
    }

    fn find_edge(&self, a: VertId, b: VertId) -> Option<EdgeId> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    fn push_edge(&mut self, a: VertId, b: VertId, level: u32, parent: Option<Simplex>) -> EdgeId {
        let id = EdgeId(to_u32(self.edges.len()));
        self.edges.push(EdgeRec {
            verts: [a, b],
            faces: [None, None],
            weak: false,
            level,
            parent,
            subdiv_vert: None,
            subdiv_edges: None,
            alive: true,
        });
        self.verts[a.index()].edges.push(id);
        self.verts[b.index()].edges.push(id);
        self.edge_lookup.insert(edge_key(a, b), id);
        id
    }

    fn get_or_push_edge(&mut self, a: VertId, b: VertId, level: u32) -> EdgeId {
        match self.find_edge(a, b) {
            Some(e) => e,
            None => self.push_edge(a, b, level, None),
        }
    }

    /// Creates a face and hooks it into its edges, creating missing edges.
    fn push_face(&mut self, verts: [VertId; 3], level: u32, parent: Option<Simplex>) -> FaceId {
        let id = FaceId(to_u32(self.faces.len()));
        let [a, b, c] = verts;
        let edges = [
            self.get_or_push_edge(a, b, level),
            self.get_or_push_edge(b, c, level),
            self.get_or_push_edge(c, a, level),
        ];
        for e in edges {
            self.attach_face_to_edge(e, id);
        }
        let weak_edge = edges.into_iter().find(|e| self.edges[e.index()].weak);
        self.faces.push(FaceRec {
            verts,
            edges,
            weak_edge,
            level,
            parent,
            subdiv_edges: None,
            subdiv_faces: None,
            alive: true,
        });
        id
    }

    fn attach_face_to_edge(&mut self, e: EdgeId, f: FaceId) {
        let slots = &mut self.edges[e.index()].faces;
        if let Some(slot) = slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(f);
        } else {
            log::warn!("{e} already has two faces, {f} not attached");
        }
    }

    fn detach_face_from_edge(&mut self, e: EdgeId, f: FaceId) {
        for slot in &mut self.edges[e.index()].faces {
            if *slot == Some(f) {
                *slot = None;
            }
        }
    }

    // === Queries ===

    pub fn num_verts(&self) -> usize {
        self.verts.iter().filter(|v| v.alive).count()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.alive).count()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.alive).count()
    }

    /// Live vertices at the given level.
    pub fn verts_at(&self, level: u32) -> Vec<VertId> {
        (0..self.verts.len())
            .filter(|&i| self.verts[i].alive && self.verts[i].level == level)
            .map(|i| VertId(to_u32(i)))
            .collect()
    }

    pub fn edges_at(&self, level: u32) -> Vec<EdgeId> {
        (0..self.edges.len())
            .filter(|&i| self.edges[i].alive && self.edges[i].level == level)
            .map(|i| EdgeId(to_u32(i)))
            .collect()
    }

    pub fn faces_at(&self, level: u32) -> Vec<FaceId> {
        (0..self.faces.len())
            .filter(|&i| self.faces[i].alive && self.faces[i].level == level)
            .map(|i| FaceId(to_u32(i)))
            .collect()
    }

    fn vert(&self, v: VertId) -> Option<&VertRec> {
        self.verts.get(v.index()).filter(|r| r.alive)
    }

    fn edge(&self, e: EdgeId) -> Option<&EdgeRec> {
        self.edges.get(e.index()).filter(|r| r.alive)
    }

    fn face(&self, f: FaceId) -> Option<&FaceRec> {
        self.faces.get(f.index()).filter(|r| r.alive)
    }
}

impl Substrate for SubdivMesh {
    fn contains(&self, s: Simplex) -> bool {
        match s {
            Simplex::Vert(v) => self.vert(v).is_some(),
            Simplex::Edge(e) => self.edge(e).is_some(),
            Simplex::Face(f) => self.face(f).is_some(),
        }
    }

    fn level(&self, s: Simplex) -> Option<u32> {
        match s {
            Simplex::Vert(v) => self.vert(v).map(|r| r.level),
            Simplex::Edge(e) => self.edge(e).map(|r| r.level),
            Simplex::Face(f) => self.face(f).map(|r| r.level),
        }
    }

    fn finest_level(&self) -> u32 {
        self.finest
    }

    fn parent(&self, s: Simplex) -> Option<Simplex> {
        match s {
            Simplex::Vert(v) => self.vert(v).and_then(|r| r.parent),
            Simplex::Edge(e) => self.edge(e).and_then(|r| r.parent),
            Simplex::Face(f) => self.face(f).and_then(|r| r.parent),
        }
    }

    fn loc(&self, v: VertId) -> Vec3 {
        self.verts[v.index()].loc
    }

    fn set_loc(&mut self, v: VertId, p: Vec3) {
        self.verts[v.index()].loc = p;
    }

    fn vert_edges(&self, v: VertId) -> Vec<EdgeId> {
        self.vert(v).map(|r| r.edges.clone()).unwrap_or_default()
    }

    fn subdiv_vert(&self, v: VertId) -> Option<VertId> {
        self.vert(v)
            .and_then(|r| r.subdiv)
            .filter(|&c| self.vert(c).is_some())
    }

    fn edge_verts(&self, e: EdgeId) -> [VertId; 2] {
        self.edges[e.index()].verts
    }

    fn edge_faces(&self, e: EdgeId) -> [Option<FaceId>; 2] {
        self.edges[e.index()].faces
    }

    fn is_weak(&self, e: EdgeId) -> bool {
        self.edges[e.index()].weak
    }

    fn edge_subdiv_vert(&self, e: EdgeId) -> Option<VertId> {
        self.edge(e)
            .and_then(|r| r.subdiv_vert)
            .filter(|&c| self.vert(c).is_some())
    }

    fn edge_subdiv_edges(&self, e: EdgeId) -> Option<[EdgeId; 2]> {
        self.edge(e)
            .and_then(|r| r.subdiv_edges)
            .filter(|es| es.iter().all(|&c| self.edge(c).is_some()))
    }

    fn face_verts(&self, f: FaceId) -> [VertId; 3] {
        self.faces[f.index()].verts
    }

    fn face_weak_edge(&self, f: FaceId) -> Option<EdgeId> {
        self.faces[f.index()].weak_edge
    }

    fn face_subdiv_edges(&self, f: FaceId) -> Option<[EdgeId; 3]> {
        self.face(f)
            .and_then(|r| r.subdiv_edges)
            .filter(|es| es.iter().all(|&c| self.edge(c).is_some()))
    }

    fn face_subdiv_faces(&self, f: FaceId) -> Option<[FaceId; 4]> {
        self.face(f)
            .and_then(|r| r.subdiv_faces)
            .filter(|fs| fs.iter().all(|&c| self.face(c).is_some()))
    }

    fn subdivide(&mut self) -> Result<u32, SubstrateError> {
        self.subdivide_finest()
    }

    fn recompute_subdiv_loc(&mut self, parent: Simplex) -> Result<(), SubstrateError> {
        self.recompute_child_loc(parent)
    }

    fn delete_vert(&mut self, v: VertId) -> Result<Vec<Simplex>, SubstrateError> {
        self.remove_vert(v)
    }

    fn split_edge(&mut self, e: EdgeId) -> Result<Vec<(Simplex, Simplex)>, SubstrateError> {
        self.split(e)
    }

    // The stored face edges avoid a lookup per edge.
    fn face_edges(&self, f: FaceId) -> [Option<EdgeId>; 3] {
        self.faces[f.index()].edges.map(Some)
    }

    fn lookup_edge(&self, a: VertId, b: VertId) -> Option<EdgeId> {
        self.find_edge(a, b)
    }
}
