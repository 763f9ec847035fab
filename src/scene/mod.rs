//! Scene graph assembly.
//!
//! A [`Scene`] is an ordered list of top-level nodes under an implicit root.
//! Nodes are a tagged variant: filled triangle meshes and outline line
//! segments. Encoders switch on the variant.

use crate::error::Result;
use crate::indexer::{build_indexed_mesh_with_policy, DedupePolicy, EdgeSet, IndexedMesh};
use crate::pipeline::ExportConfig;
use crate::types::Color;
use tracing::{debug, warn};

/// A flat-color material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// A top-level scene node. Each node owns its geometry exclusively.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    /// Filled triangles.
    Mesh {
        name: String,
        mesh: IndexedMesh,
        material: Material,
    },
    /// Outline edges over a deduplicated vertex list.
    LineSegments {
        name: String,
        positions: Vec<[f32; 3]>,
        edges: EdgeSet,
        material: Material,
    },
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Mesh { name, .. } | SceneNode::LineSegments { name, .. } => name,
        }
    }

    pub fn material(&self) -> &Material {
        match self {
            SceneNode::Mesh { material, .. } | SceneNode::LineSegments { material, .. } => {
                material
            }
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        match self {
            SceneNode::Mesh { mesh, .. } => &mesh.positions,
            SceneNode::LineSegments { positions, .. } => positions,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions().len()
    }

    /// True when the node has nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            SceneNode::Mesh { mesh, .. } => mesh.is_empty() || mesh.indices.is_empty(),
            SceneNode::LineSegments {
                positions, edges, ..
            } => positions.is_empty() || edges.is_empty(),
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, SceneNode::Mesh { .. })
    }
}

/// An ordered collection of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) {
        self.nodes.push(node);
    }

    /// Nodes in traversal order.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_mesh()).count()
    }

    pub fn outline_count(&self) -> usize {
        self.nodes.len() - self.mesh_count()
    }

    /// Triangles across all mesh nodes.
    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                SceneNode::Mesh { mesh, .. } => mesh.triangle_count(),
                SceneNode::LineSegments { .. } => 0,
            })
            .sum()
    }
}

/// Builds scenes from indexed meshes with configured colors.
#[derive(Debug, Clone)]
pub struct SceneAssembler {
    mesh_color: Color,
    outline_color: Color,
    dedupe: DedupePolicy,
    outline_crease_angle: Option<f32>,
}

impl Default for SceneAssembler {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

impl SceneAssembler {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            mesh_color: config.mesh_color,
            outline_color: config.outline_color,
            dedupe: config.dedupe,
            outline_crease_angle: config.outline_crease_angle,
        }
    }

    /// One mesh node per input mesh, in input order. With `include_outline`
    /// each mesh is preceded by its outline node.
    ///
    /// A mesh whose indices are out of range gets no outline; its mesh node is
    /// kept so the encoder reports it.
    pub fn assemble(&self, meshes: Vec<IndexedMesh>, include_outline: bool) -> Scene {
        let mut scene = Scene::new();

        for (i, mesh) in meshes.into_iter().enumerate() {
            if include_outline {
                match self.outline_node(i, &mesh) {
                    Ok(outline) => scene.add(outline),
                    Err(e) => warn!(mesh = i, error = %e, "skipping outline for invalid mesh"),
                }
            }
            scene.add(SceneNode::Mesh {
                name: format!("mesh_{}", i),
                mesh,
                material: Material::new("surface", self.mesh_color),
            });
        }

        debug!(
            nodes = scene.len(),
            meshes = scene.mesh_count(),
            outlines = scene.outline_count(),
            "assembled scene"
        );
        scene
    }

    fn outline_node(&self, i: usize, mesh: &IndexedMesh) -> Result<SceneNode> {
        // Edges need shared vertices, so re-index from the expanded corners.
        let welded = build_indexed_mesh_with_policy(&mesh.expand()?, self.dedupe);
        let edges = match self.outline_crease_angle {
            Some(angle) => EdgeSet::feature_edges(&welded, angle),
            None => EdgeSet::from_mesh(&welded),
        };

        Ok(SceneNode::LineSegments {
            name: format!("outline_{}", i),
            positions: welded.positions,
            edges,
            material: Material::new("outline", self.outline_color),
        })
    }
}

/// Assemble a scene with the default colors.
pub fn assemble_scene(meshes: Vec<IndexedMesh>, include_outline: bool) -> Scene {
    SceneAssembler::default().assemble(meshes, include_outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::build_indexed_mesh;
    use crate::types::TriangleSoup;

    fn triangle_at(x: f32) -> IndexedMesh {
        let soup = TriangleSoup::from_triangles([[[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]]]);
        build_indexed_mesh(&soup, false)
    }

    #[test]
    fn test_two_buildings_in_input_order() {
        let scene = assemble_scene(vec![triangle_at(0.0), triangle_at(10.0)], false);

        assert_eq!(scene.len(), 2);
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.nodes()[0].positions()[0], [0.0, 0.0, 0.0]);
        assert_eq!(scene.nodes()[1].positions()[0], [10.0, 0.0, 0.0]);
        assert_eq!(scene.triangle_count(), 2);
    }

    #[test]
    fn test_outline_added_alongside_mesh() {
        let scene = assemble_scene(vec![triangle_at(0.0)], true);

        assert_eq!(scene.len(), 2);
        assert_eq!(scene.outline_count(), 1);
        match &scene.nodes()[0] {
            SceneNode::LineSegments {
                edges, material, ..
            } => {
                assert_eq!(edges.len(), 3);
                assert_eq!(material.color, Color::WHITE);
            }
            other => panic!("expected outline node, got {:?}", other),
        }
        assert_eq!(scene.nodes()[1].material().color, Color::BLACK);
    }

    #[test]
    fn test_outline_welds_passthrough_mesh() {
        let soup = TriangleSoup::from_triangles([
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let scene = assemble_scene(vec![build_indexed_mesh(&soup, false)], true);

        match &scene.nodes()[0] {
            SceneNode::LineSegments {
                positions, edges, ..
            } => {
                assert_eq!(positions.len(), 4);
                assert_eq!(edges.len(), 5);
            }
            other => panic!("expected outline node, got {:?}", other),
        }
    }

    #[test]
    fn test_crease_angle_config() {
        let soup = TriangleSoup::from_triangles([
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let config = ExportConfig::default().with_outline_crease_angle(1.0);
        let scene = SceneAssembler::from_config(&config)
            .assemble(vec![build_indexed_mesh(&soup, true)], true);

        match &scene.nodes()[0] {
            SceneNode::LineSegments { edges, .. } => assert_eq!(edges.len(), 4),
            other => panic!("expected outline node, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        let scene = assemble_scene(Vec::new(), true);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_invalid_mesh_gets_no_outline() {
        let mut mesh = IndexedMesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_triangle(0, 0, 7);
        let scene = assemble_scene(vec![mesh, triangle_at(5.0)], true);

        // mesh_0, outline_1, mesh_1
        assert_eq!(scene.len(), 3);
        assert!(scene.nodes()[0].is_mesh());
        assert_eq!(scene.nodes()[0].name(), "mesh_0");
        assert_eq!(scene.nodes()[1].name(), "outline_1");
    }

    #[test]
    fn test_empty_mesh_node_is_empty() {
        let scene = assemble_scene(vec![IndexedMesh::new()], true);
        assert_eq!(scene.len(), 2);
        assert!(scene.nodes().iter().all(|n| n.is_empty()));
    }
}
