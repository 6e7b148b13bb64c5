//! Generating the next subdivision level.

use glam::Vec3;
use meme_core::{EdgeId, FaceId, Simplex, Substrate, SubstrateError, VertId};

use super::SubdivMesh;

impl SubdivMesh {
    /// Default location of the vertex generated from `parent`.
    fn default_child_loc(&self, parent: Simplex) -> Option<Vec3> {
        match parent {
            Simplex::Vert(v) => Some(self.loc(v)),
            Simplex::Edge(e) if self.is_weak(e) => {
                let f = self.edge_faces(e).into_iter().flatten().next()?;
                let quad = self.quad_verts(f)?;
                Some(quad.iter().map(|&v| self.loc(v)).sum::<Vec3>() / 4.0)
            }
            Simplex::Edge(e) => {
                let [a, b] = self.edge_verts(e);
                Some((self.loc(a) + self.loc(b)) / 2.0)
            }
            Simplex::Face(_) => None,
        }
    }

    pub(super) fn recompute_child_loc(&mut self, parent: Simplex) -> Result<(), SubstrateError> {
        if !self.contains(parent) {
            return Err(SubstrateError::UnknownSimplex(parent));
        }
        let child = match parent {
            Simplex::Vert(v) => self.subdiv_vert(v),
            Simplex::Edge(e) => self.edge_subdiv_vert(e),
            Simplex::Face(_) => None,
        };
        if let (Some(c), Some(p)) = (child, self.default_child_loc(parent)) {
            self.verts[c.index()].loc = p;
        }
        Ok(())
    }

    /// Subdivides every element of the finest level. Returns the new level.
    pub(super) fn subdivide_finest(&mut self) -> Result<u32, SubstrateError> {
        let level = self.finest;
        let next = level + 1;
        let verts = self.verts_at(level);
        let edges = self.edges_at(level);
        let faces = self.faces_at(level);
        if let Some(&e) = edges.iter().find(|e| self.edges[e.index()].subdiv_vert.is_some()) {
            return Err(SubstrateError::AlreadySubdivided(e.into()));
        }

        for &v in &verts {
            let loc = self.loc(v);
            let child = self.push_vert(loc, next, Some(v.into()));
            self.verts[v.index()].subdiv = Some(child);
        }

        for &e in &edges {
            let [a, b] = self.edge_verts(e);
            let (Some(ca), Some(cb), Some(loc)) = (
                self.verts[a.index()].subdiv,
                self.verts[b.index()].subdiv,
                self.default_child_loc(e.into()),
            ) else {
                continue;
            };
            let mid = self.push_vert(loc, next, Some(e.into()));
            let weak = self.edges[e.index()].weak;
            let e1 = self.push_edge(ca, mid, next, Some(e.into()));
            let e2 = self.push_edge(mid, cb, next, Some(e.into()));
            self.edges[e1.index()].weak = weak;
            self.edges[e2.index()].weak = weak;
            let rec = &mut self.edges[e.index()];
            rec.subdiv_vert = Some(mid);
            rec.subdiv_edges = Some([e1, e2]);
        }

        for &f in &faces {
            self.subdivide_face(f, next);
        }

        self.finest = next;
        log::debug!(
            "subdivided level {level}: {} verts, {} edges, {} faces",
            verts.len(),
            edges.len(),
            faces.len()
        );
        Ok(next)
    }

    fn subdivide_face(&mut self, f: FaceId, next: u32) {
        let rec = &self.faces[f.index()];
        let [a, b, c] = rec.verts;
        let [eab, ebc, eca] = rec.edges;
        let weak = rec.weak_edge;
        let child = |m: &Self, v: VertId| m.verts[v.index()].subdiv;
        let mid = |m: &Self, e: EdgeId| m.edges[e.index()].subdiv_vert;
        let (Some(ca), Some(cb), Some(cc), Some(mab), Some(mbc), Some(mca)) = (
            child(self, a),
            child(self, b),
            child(self, c),
            mid(self, eab),
            mid(self, ebc),
            mid(self, eca),
        ) else {
            log::warn!("{f} has unsubdivided elements, skipped");
            return;
        };

        // The internal edge opposite the weak edge's midpoint continues the
        // quad diagonal.
        let weak_mid = weak.and_then(|w| mid(self, w));
        let internal = [(mab, mbc), (mbc, mca), (mca, mab)].map(|(x, y)| {
            let e = self.push_edge(x, y, next, Some(f.into()));
            self.edges[e.index()].weak = weak_mid.is_some_and(|m| m != x && m != y);
            e
        });

        let parent = Some(f.into());
        let faces = [
            self.push_face([ca, mab, mca], next, parent),
            self.push_face([cb, mbc, mab], next, parent),
            self.push_face([cc, mca, mbc], next, parent),
            self.push_face([mab, mbc, mca], next, parent),
        ];
        let rec = &mut self.faces[f.index()];
        rec.subdiv_edges = Some(internal);
        rec.subdiv_faces = Some(faces);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivide_triangle() {
        let mut mesh =
            SubdivMesh::from_tris(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]]).unwrap();
        assert_eq!(mesh.subdivide().unwrap(), 1);
        assert_eq!(mesh.finest_level(), 1);
        assert_eq!(mesh.verts_at(1).len(), 6);
        assert_eq!(mesh.edges_at(1).len(), 9);
        assert_eq!(mesh.faces_at(1).len(), 4);

        let e = mesh.lookup_edge(VertId(0), VertId(1)).unwrap();
        let m = mesh.edge_subdiv_vert(e).unwrap();
        assert!((mesh.loc(m) - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(mesh.parent(m.into()), Some(e.into()));

        let cv = mesh.subdiv_vert(VertId(1)).unwrap();
        assert_eq!(mesh.loc(cv), Vec3::X);
        assert_eq!(mesh.level(cv.into()), Some(1));
        assert!(mesh.face_subdiv_faces(FaceId(0)).is_some());
        assert!(mesh.face_subdiv_edges(FaceId(0)).is_some());
    }

    #[test]
    fn test_quad_centre_and_weak_edges() {
        let mut mesh = SubdivMesh::quad_grid(1, 1, 2.0);
        mesh.subdivide().unwrap();
        let diag = mesh.lookup_edge(VertId(0), VertId(3)).unwrap();
        let centre = mesh.edge_subdiv_vert(diag).unwrap();
        assert!((mesh.loc(centre) - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);

        // Four child quads, each with exactly one weak edge.
        let faces = mesh.faces_at(1);
        assert_eq!(faces.len(), 8);
        for f in faces {
            assert!(mesh.is_quad(f));
            assert!(mesh.quad_partner(f).is_some());
        }
        let weak = mesh.edges_at(1).into_iter().filter(|&e| mesh.is_weak(e)).count();
        assert_eq!(weak, 4);
    }

    #[test]
    fn test_recompute_child_loc() {
        let mut mesh =
            SubdivMesh::from_tris(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]]).unwrap();
        mesh.subdivide().unwrap();
        let e = mesh.lookup_edge(VertId(0), VertId(1)).unwrap();
        mesh.set_loc(VertId(1), Vec3::new(3.0, 0.0, 0.0));
        mesh.recompute_subdiv_loc(e.into()).unwrap();
        let m = mesh.edge_subdiv_vert(e).unwrap();
        assert!((mesh.loc(m) - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_control_mesh_fixed_after_subdivision() {
        let mut mesh = SubdivMesh::quad_grid(1, 1, 1.0);
        mesh.subdivide().unwrap();
        let v = mesh.add_vert(Vec3::ONE);
        assert!(matches!(
            mesh.add_tri(VertId(0), VertId(1), v),
            Err(SubstrateError::Unsupported(_))
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn grid_subdivision_counts(cols in 1u32..5, rows in 1u32..5) {
                let mut mesh = SubdivMesh::quad_grid(cols, rows, 1.0);
                let (v0, e0, f0) = (
                    mesh.verts_at(0).len(),
                    mesh.edges_at(0).len(),
                    mesh.faces_at(0).len(),
                );
                prop_assert_eq!(mesh.subdivide().unwrap(), 1);

                prop_assert_eq!(mesh.verts_at(1).len(), v0 + e0);
                prop_assert_eq!(mesh.edges_at(1).len(), 2 * e0 + 3 * f0);
                prop_assert_eq!(mesh.faces_at(1).len(), 4 * f0);
                let weak = mesh.edges_at(1).into_iter().filter(|&e| mesh.is_weak(e)).count();
                prop_assert_eq!(weak, 4 * (cols * rows) as usize);
                for f in mesh.faces_at(1) {
                    prop_assert!(mesh.is_quad(f));
                }
            }
        }
    }
}
