//! Deleting vertices and splitting edges.

use meme_core::{EdgeId, FaceId, Simplex, Substrate, SubstrateError, VertId};

use super::{edge_key, SubdivMesh};

impl SubdivMesh {
    /// Deletes a vertex with its edges, faces and all their subdivision
    /// descendants. Returns every removed element.
    pub(super) fn remove_vert(&mut self, v: VertId) -> Result<Vec<Simplex>, SubstrateError> {
        if self.vert(v).is_none() {
            return Err(SubstrateError::UnknownSimplex(v.into()));
        }
        let mut removed = Vec::new();
        self.kill_vert(v, &mut removed);
        log::debug!("deleting {v} removed {} elements", removed.len());
        Ok(removed)
    }

    fn kill_vert(&mut self, v: VertId, out: &mut Vec<Simplex>) {
        let Some(rec) = self.vert(v) else {
            return;
        };
        let edges = rec.edges.clone();
        let child = rec.subdiv;
        for e in edges {
            self.kill_edge(e, out);
        }
        self.verts[v.index()].alive = false;
        out.push(v.into());
        if let Some(c) = child {
            self.kill_vert(c, out);
        }
    }

    fn kill_edge(&mut self, e: EdgeId, out: &mut Vec<Simplex>) {
        let Some(rec) = self.edge(e) else {
            return;
        };
        let faces = rec.faces;
        let [a, b] = rec.verts;
        let halves = rec.subdiv_edges;
        let mid = rec.subdiv_vert;
        for f in faces.into_iter().flatten() {
            self.kill_face(f, out);
        }

        self.edges[e.index()].alive = false;
        for v in [a, b] {
            self.verts[v.index()].edges.retain(|&x| x != e);
        }
        if self.edge_lookup.get(&edge_key(a, b)) == Some(&e) {
            self.edge_lookup.remove(&edge_key(a, b));
        }
        out.push(e.into());

        for h in halves.into_iter().flatten() {
            self.kill_edge(h, out);
        }
        if let Some(m) = mid {
            self.kill_vert(m, out);
        }
    }

    fn kill_face(&mut self, f: FaceId, out: &mut Vec<Simplex>) {
        let Some(rec) = self.face(f) else {
            return;
        };
        let edges = rec.edges;
        let children = rec.subdiv_faces;
        let internal = rec.subdiv_edges;

        self.faces[f.index()].alive = false;
        for e in edges {
            self.detach_face_from_edge(e, f);
        }
        out.push(f.into());

        for c in children.into_iter().flatten() {
            self.kill_face(c, out);
        }
        for e in internal.into_iter().flatten() {
            self.kill_edge(e, out);
        }
    }

    /// Splits an edge at its midpoint, splitting each adjacent triangle in
    /// two. Quad edges and subdivided elements can't be split.
    ///
    /// The edge keeps its first half; the second half, the new vertex, the
    /// new cross edges and the new triangles are reported as
    /// `(splitting element, new element)` pairs, vertex first.
    pub(super) fn split(&mut self, e: EdgeId) -> Result<Vec<(Simplex, Simplex)>, SubstrateError> {
        let rec = self
            .edge(e)
            .ok_or(SubstrateError::UnknownSimplex(e.into()))?;
        if rec.subdiv_vert.is_some() {
            return Err(SubstrateError::AlreadySubdivided(e.into()));
        }
        if rec.weak {
            return Err(SubstrateError::Unsupported("can't split a quad diagonal".into()));
        }
        let faces: Vec<FaceId> = rec.faces.into_iter().flatten().collect();
        let [a, b] = rec.verts;
        let level = rec.level;
        for &f in &faces {
            let frec = &self.faces[f.index()];
            if frec.subdiv_faces.is_some() {
                return Err(SubstrateError::AlreadySubdivided(f.into()));
            }
            if frec.weak_edge.is_some() {
                return Err(SubstrateError::Unsupported("can't split a quad edge".into()));
            }
        }

        let loc = (self.loc(a) + self.loc(b)) / 2.0;
        let m = self.push_vert(loc, level, None);

        // Take the faces off their edges while the edge is rewired.
        let old: Vec<[VertId; 3]> = faces.iter().map(|f| self.faces[f.index()].verts).collect();
        for &f in &faces {
            for x in self.faces[f.index()].edges {
                self.detach_face_from_edge(x, f);
            }
        }

        // The edge becomes (a, m).
        self.edge_lookup.remove(&edge_key(a, b));
        self.verts[b.index()].edges.retain(|&x| x != e);
        self.edges[e.index()].verts = [a, m];
        self.verts[m.index()].edges.push(e);
        self.edge_lookup.insert(edge_key(a, m), e);
        let e2 = self.push_edge(m, b, level, None);

        let mut pairs = vec![
            (Simplex::Edge(e), Simplex::Vert(m)),
            (Simplex::Edge(e), Simplex::Edge(e2)),
        ];
        let swap = |verts: [VertId; 3], from: VertId| verts.map(|x| if x == from { m } else { x });
        for (&f, verts) in faces.iter().zip(old) {
            self.rewire_face(f, swap(verts, b), level);
            let g = self.push_face(swap(verts, a), level, None);
            if let Some(cross) = verts
                .into_iter()
                .find(|&x| x != a && x != b)
                .and_then(|c| self.find_edge(m, c))
            {
                pairs.push((Simplex::Face(f), Simplex::Edge(cross)));
            }
            pairs.push((Simplex::Face(f), Simplex::Face(g)));
        }
        log::debug!("split {e} at new vertex {m}");
        Ok(pairs)
    }

    /// Gives an existing face new corners, reattaching it to its edges.
    fn rewire_face(&mut self, f: FaceId, verts: [VertId; 3], level: u32) {
        let [a, b, c] = verts;
        let edges = [
            self.get_or_push_edge(a, b, level),
            self.get_or_push_edge(b, c, level),
            self.get_or_push_edge(c, a, level),
        ];
        for x in edges {
            self.attach_face_to_edge(x, f);
        }
        let rec = &mut self.faces[f.index()];
        rec.verts = verts;
        rec.edges = edges;
    }
}
