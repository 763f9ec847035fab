//! Edge extraction for outline rendering.

use super::IndexedMesh;
use glam::Vec3;
use std::collections::HashMap;

/// Unique undirected edges of an indexed mesh, stored as `[low, high]` vertex
/// index pairs in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: Vec<[u32; 2]>,
}

impl EdgeSet {
    /// Every unique edge of the mesh's triangles.
    ///
    /// Expects a deduplicated mesh; on a passthrough mesh no two triangles
    /// share an index so every triangle contributes its own three edges.
    pub fn from_mesh(mesh: &IndexedMesh) -> Self {
        let mut seen = HashMap::new();
        let mut edges = Vec::new();

        for tri in mesh.indices.chunks_exact(3) {
            for (a, b) in triangle_edges(tri) {
                if a == b {
                    continue;
                }
                let key = edge_key(a, b);
                seen.entry(key).or_insert_with(|| edges.push(key));
            }
        }

        Self { edges }
    }

    /// Boundary edges plus edges whose adjacent faces meet at more than
    /// `threshold_degrees`. Degenerate triangles are ignored.
    pub fn feature_edges(mesh: &IndexedMesh, threshold_degrees: f32) -> Self {
        struct Adjacency {
            normal: Vec3,
            faces: usize,
            crease: bool,
        }

        let threshold_dot = threshold_degrees.to_radians().cos();
        let mut adjacency: HashMap<[u32; 2], Adjacency> = HashMap::new();
        let mut order = Vec::new();

        for tri in mesh.indices.chunks_exact(3) {
            let corner = |i: u32| mesh.positions.get(i as usize).copied().map(Vec3::from);
            let (Some(a), Some(b), Some(c)) = (corner(tri[0]), corner(tri[1]), corner(tri[2])) else {
                continue;
            };
            let normal = (b - a).cross(c - a);
            if normal.length_squared() == 0.0 || !normal.is_finite() {
                continue;
            }
            let normal = normal.normalize();

            for (i0, i1) in triangle_edges(tri) {
                let key = edge_key(i0, i1);
                match adjacency.get_mut(&key) {
                    Some(adj) => {
                        adj.faces += 1;
                        if adj.normal.dot(normal) <= threshold_dot {
                            adj.crease = true;
                        }
                    }
                    None => {
                        order.push(key);
                        adjacency.insert(
                            key,
                            Adjacency {
                                normal,
                                faces: 1,
                                crease: false,
                            },
                        );
                    }
                }
            }
        }

        let edges = order
            .into_iter()
            .filter(|key| {
                adjacency
                    .get(key)
                    .map_or(false, |adj| adj.faces == 1 || adj.crease)
            })
            .collect();

        Self { edges }
    }

    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Flattened index pairs, the layout of a line-segments index buffer.
    pub fn indices(&self) -> Vec<u32> {
        self.edges.iter().flat_map(|e| *e).collect()
    }

    pub fn contains(&self, a: u32, b: u32) -> bool {
        self.edges.contains(&edge_key(a, b))
    }
}

fn triangle_edges(tri: &[u32]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

fn edge_key(a: u32, b: u32) -> [u32; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::build_indexed_mesh;
    use crate::types::TriangleSoup;

    #[test]
    fn test_unit_triangle_edges() {
        let soup = TriangleSoup::from_triangles([[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        let edges = EdgeSet::from_mesh(&build_indexed_mesh(&soup, true));

        assert_eq!(edges.len(), 3);
        assert!(edges.contains(0, 1));
        assert!(edges.contains(1, 2));
        assert!(edges.contains(2, 0));
        assert_eq!(edges.indices(), vec![0, 1, 1, 2, 0, 2]);
    }

    #[test]
    fn test_shared_edge_counted_once() {
        let soup = TriangleSoup::from_triangles([
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let edges = EdgeSet::from_mesh(&build_indexed_mesh(&soup, true));

        assert_eq!(edges.len(), 5);
        assert_eq!(edges.edges(), &[[0, 1], [1, 2], [0, 2], [1, 3], [2, 3]]);
    }

    #[test]
    fn test_feature_edges_drop_flat_diagonal() {
        let soup = TriangleSoup::from_triangles([
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let edges = EdgeSet::feature_edges(&build_indexed_mesh(&soup, true), 1.0);

        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(1, 2));
    }

    #[test]
    fn test_feature_edges_keep_fold() {
        // Second triangle folded 90 degrees up around the shared edge.
        let soup = TriangleSoup::from_triangles([
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
        ]);
        let edges = EdgeSet::feature_edges(&build_indexed_mesh(&soup, true), 1.0);

        assert_eq!(edges.len(), 5);
        assert!(edges.contains(1, 2));
    }

    #[test]
    fn test_feature_edges_skip_out_of_range_triangles() {
        let mut mesh = IndexedMesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_vertex([1.0, 0.0, 0.0]);
        mesh.add_vertex([0.0, 1.0, 0.0]);
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(1, 2, 9);

        let edges = EdgeSet::feature_edges(&mesh, 1.0);
        assert_eq!(edges.edges(), &[[0, 1], [1, 2], [0, 2]]);
    }

    #[test]
    fn test_empty_mesh_has_no_edges() {
        let mesh = IndexedMesh::new();
        assert!(EdgeSet::from_mesh(&mesh).is_empty());
        assert!(EdgeSet::feature_edges(&mesh, 1.0).is_empty());
    }
}
