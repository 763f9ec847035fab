//! glTF/GLB encoding of scenes.

use super::{glb, EncodeOptions, ExportTarget, Payload};
use crate::error::{ExportError, Result};
use crate::scene::{Scene, SceneNode};
use crate::types::{BoundingBox, Color};
use base64::Engine;
use gltf_json as json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Encode a scene with the target's default options.
pub fn encode(scene: &Scene, target: ExportTarget) -> Result<Payload> {
    encode_with_options(scene, target, &target.encode_options())
}

/// Encode a scene into a glTF document.
///
/// Every non-empty node becomes one glTF mesh with a single primitive and one
/// glTF node. Nodes without drawable geometry are skipped. The output depends
/// only on the inputs, so equal scenes encode to identical bytes.
pub fn encode_with_options(
    scene: &Scene,
    target: ExportTarget,
    options: &EncodeOptions,
) -> Result<Payload> {
    let mut builder = DocumentBuilder::default();

    for node in scene.nodes() {
        if node.is_empty() {
            warn!(node = node.name(), "skipping node with empty geometry");
            continue;
        }
        builder.add_node(node, options.force_indices)?;
    }

    debug!(
        meshes = builder.meshes.len(),
        accessors = builder.accessors.len(),
        buffer_bytes = builder.buffer.len(),
        ?target,
        "encoded scene"
    );

    match target {
        ExportTarget::TextDocument => {
            let root = builder.finish(&options.generator, BufferEmbedding::DataUri)?;
            Ok(Payload::Json(serde_json::to_value(&root)?))
        }
        ExportTarget::BinaryDocument => {
            let root = builder.finish(&options.generator, BufferEmbedding::GlbChunk)?;
            let json_bytes = json::serialize::to_vec(&root).map_err(|e| {
                ExportError::EncodingFailure(format!("Failed to serialize glTF JSON: {}", e))
            })?;
            Ok(Payload::Binary(glb::write_glb(&json_bytes, &builder.buffer)?))
        }
    }
}

/// How the single buffer is referenced from the JSON.
#[derive(Clone, Copy)]
enum BufferEmbedding {
    DataUri,
    GlbChunk,
}

/// Unsigned integer type used for an index accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexComponent {
    U8,
    U16,
    U32,
}

impl IndexComponent {
    /// Smallest type that holds `max` without touching the primitive restart
    /// value (the type's maximum).
    fn for_max_index(max: u32) -> Self {
        if max < u8::MAX as u32 {
            IndexComponent::U8
        } else if max < u16::MAX as u32 {
            IndexComponent::U16
        } else {
            IndexComponent::U32
        }
    }

    fn component_type(self) -> json::accessor::ComponentType {
        match self {
            IndexComponent::U8 => json::accessor::ComponentType::U8,
            IndexComponent::U16 => json::accessor::ComponentType::U16,
            IndexComponent::U32 => json::accessor::ComponentType::U32,
        }
    }

    fn write(self, indices: &[u32], buffer: &mut Vec<u8>) {
        match self {
            IndexComponent::U8 => buffer.extend(indices.iter().map(|&i| i as u8)),
            IndexComponent::U16 => {
                for &i in indices {
                    buffer.extend_from_slice(&(i as u16).to_le_bytes());
                }
            }
            IndexComponent::U32 => {
                for &i in indices {
                    buffer.extend_from_slice(&i.to_le_bytes());
                }
            }
        }
    }
}

/// Accumulates buffer data and glTF records node by node.
#[derive(Default)]
struct DocumentBuilder {
    buffer: Vec<u8>,
    buffer_views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
    materials: Vec<json::Material>,
    material_slots: HashMap<u32, u32>,
    meshes: Vec<json::Mesh>,
    nodes: Vec<json::Node>,
}

impl DocumentBuilder {
    fn add_node(&mut self, node: &SceneNode, force_indices: bool) -> Result<()> {
        let (positions, indices, mode) = match node {
            SceneNode::Mesh { mesh, .. } => {
                mesh.validate()?;
                let indices = if force_indices || !mesh.is_passthrough() {
                    Some(mesh.indices.clone())
                } else {
                    None
                };
                (&mesh.positions, indices, json::mesh::Mode::Triangles)
            }
            SceneNode::LineSegments {
                positions, edges, ..
            } => {
                let indices = edges.indices();
                if let Some(&max) = indices.iter().max() {
                    if max as usize >= positions.len() {
                        return Err(ExportError::EncodingFailure(format!(
                            "edge index {} out of range for {} vertices in '{}'",
                            max,
                            positions.len(),
                            node.name()
                        )));
                    }
                }
                (positions, Some(indices), json::mesh::Mode::Lines)
            }
        };

        let positions_accessor = self.push_positions(positions, node.name());
        let indices_accessor = indices.map(|indices| self.push_indices(&indices, node.name()));
        let material = self.material_for(node.material().color, &node.material().name);

        let mut attributes = BTreeMap::new();
        attributes.insert(
            Valid(json::mesh::Semantic::Positions),
            json::Index::new(positions_accessor),
        );

        let mesh_idx = self.meshes.len() as u32;
        self.meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(node.name().to_string()),
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: indices_accessor.map(json::Index::new),
                material: Some(json::Index::new(material)),
                mode: Valid(mode),
                targets: None,
            }],
            weights: None,
        });

        self.nodes.push(json::Node {
            camera: None,
            children: None,
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: Some(json::Index::new(mesh_idx)),
            name: Some(node.name().to_string()),
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        });

        Ok(())
    }

    /// Append a VEC3/FLOAT position accessor and return its index.
    fn push_positions(&mut self, positions: &[[f32; 3]], name: &str) -> u32 {
        let offset = self.align();
        for p in positions {
            for c in p {
                self.buffer.extend_from_slice(&c.to_le_bytes());
            }
        }
        let view = self.push_view(
            offset,
            json::buffer::Target::ArrayBuffer,
            format!("{}_positions", name),
        );

        // POSITION accessors must carry bounds.
        let bounds = BoundingBox::from_points(positions.iter().copied())
            .unwrap_or(BoundingBox::new([0.0; 3], [0.0; 3]));
        self.push_accessor(
            view,
            positions.len(),
            json::accessor::Type::Vec3,
            json::accessor::ComponentType::F32,
            Some(bounds),
            format!("{}_positions", name),
        )
    }

    /// Append a SCALAR index accessor using the smallest sufficient type.
    fn push_indices(&mut self, indices: &[u32], name: &str) -> u32 {
        let component = IndexComponent::for_max_index(indices.iter().copied().max().unwrap_or(0));
        let offset = self.align();
        component.write(indices, &mut self.buffer);
        let view = self.push_view(
            offset,
            json::buffer::Target::ElementArrayBuffer,
            format!("{}_indices", name),
        );
        self.push_accessor(
            view,
            indices.len(),
            json::accessor::Type::Scalar,
            component.component_type(),
            None,
            format!("{}_indices", name),
        )
    }

    /// Pad the buffer to a 4-byte boundary and return the new offset.
    fn align(&mut self) -> usize {
        let padding = (4 - (self.buffer.len() % 4)) % 4;
        self.buffer.extend(std::iter::repeat(0u8).take(padding));
        self.buffer.len()
    }

    /// Add a view over `offset..buffer.len()`.
    fn push_view(&mut self, offset: usize, target: json::buffer::Target, name: String) -> u32 {
        let idx = self.buffer_views.len() as u32;
        self.buffer_views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64((self.buffer.len() - offset) as u64),
            byte_offset: Some(USize64(offset as u64)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name),
            target: Some(Valid(target)),
        });
        idx
    }

    fn push_accessor(
        &mut self,
        buffer_view: u32,
        count: usize,
        type_: json::accessor::Type,
        component_type: json::accessor::ComponentType,
        bounds: Option<BoundingBox>,
        name: String,
    ) -> u32 {
        let idx = self.accessors.len() as u32;
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(buffer_view)),
            byte_offset: Some(USize64(0)),
            count: USize64(count as u64),
            component_type: Valid(json::accessor::GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name),
            type_: Valid(type_),
            min: bounds.map(|b| json::Value::from(b.min.to_vec())),
            max: bounds.map(|b| json::Value::from(b.max.to_vec())),
            normalized: false,
            sparse: None,
        });
        idx
    }

    /// One material per distinct color, in first-use order.
    fn material_for(&mut self, color: Color, name: &str) -> u32 {
        if let Some(&idx) = self.material_slots.get(&color.to_hex()) {
            return idx;
        }
        let idx = self.materials.len() as u32;
        self.materials.push(create_flat_material(color, name));
        self.material_slots.insert(color.to_hex(), idx);
        idx
    }

    fn finish(&self, generator: &str, embedding: BufferEmbedding) -> Result<json::Root> {
        if u32::try_from(self.buffer.len()).is_err() {
            return Err(ExportError::EncodingFailure(format!(
                "buffer of {} bytes exceeds 4 GiB",
                self.buffer.len()
            )));
        }

        // glTF forbids zero-length buffers.
        let buffers = if self.buffer.is_empty() {
            Vec::new()
        } else {
            let uri = match embedding {
                BufferEmbedding::GlbChunk => None,
                BufferEmbedding::DataUri => Some(format!(
                    "data:application/octet-stream;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&self.buffer)
                )),
            };
            vec![json::Buffer {
                byte_length: USize64(self.buffer.len() as u64),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri,
            }]
        };

        // A scene must list at least one node.
        let (scenes, scene) = if self.nodes.is_empty() {
            (Vec::new(), None)
        } else {
            let scene = json::Scene {
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                nodes: (0..self.nodes.len() as u32).map(json::Index::new).collect(),
            };
            (vec![scene], Some(json::Index::new(0)))
        };

        Ok(json::Root {
            accessors: self.accessors.clone(),
            asset: json::Asset {
                generator: Some(generator.to_string()),
                version: "2.0".to_string(),
                ..Default::default()
            },
            buffers,
            buffer_views: self.buffer_views.clone(),
            materials: self.materials.clone(),
            meshes: self.meshes.clone(),
            nodes: self.nodes.clone(),
            scenes,
            scene,
            ..Default::default()
        })
    }
}

/// Create an untextured, flat-color material.
fn create_flat_material(color: Color, name: &str) -> json::Material {
    json::Material {
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_texture: None,
            base_color_factor: json::material::PbrBaseColorFactor(color.to_linear_rgba()),
            metallic_factor: json::material::StrengthFactor(0.0),
            roughness_factor: json::material::StrengthFactor(1.0),
            metallic_roughness_texture: None,
            extensions: Default::default(),
            extras: Default::default(),
        },
        alpha_mode: Valid(json::material::AlphaMode::Opaque),
        alpha_cutoff: None,
        double_sided: true,
        name: Some(name.to_string()),
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: json::material::EmissiveFactor([0.0, 0.0, 0.0]),
        extensions: Default::default(),
        extras: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_glb;
    use crate::indexer::{build_indexed_mesh, IndexedMesh};
    use crate::scene::assemble_scene;
    use crate::types::TriangleSoup;
    use serde_json::Value;

    const COMPONENT_U8: u64 = 5121;
    const COMPONENT_U16: u64 = 5123;
    const COMPONENT_U32: u64 = 5125;
    const MODE_LINES: u64 = 1;

    fn triangle_at(x: f32) -> IndexedMesh {
        let soup = TriangleSoup::from_triangles([[[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]]]);
        build_indexed_mesh(&soup, false)
    }

    fn glb_json(payload: &Payload) -> Value {
        let bytes = payload.as_binary().expect("binary payload");
        read_glb(bytes).unwrap().json_value().unwrap()
    }

    #[test]
    fn test_export_simple_mesh() {
        let scene = assemble_scene(vec![triangle_at(0.0)], false);
        let payload = encode(&scene, ExportTarget::BinaryDocument).unwrap();
        let glb = payload.as_binary().unwrap();

        // Check GLB header
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes([glb[4], glb[5], glb[6], glb[7]]), 2); // version
        assert_eq!(
            u32::from_le_bytes([glb[8], glb[9], glb[10], glb[11]]) as usize,
            glb.len()
        );

        let doc = glb_json(&payload);
        assert_eq!(doc["asset"]["version"], "2.0");
        assert_eq!(doc["meshes"].as_array().unwrap().len(), 1);
        assert_eq!(doc["accessors"][0]["count"], 3);
        assert_eq!(doc["accessors"][0]["max"], serde_json::json!([1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_binary_forces_indices_on_passthrough() {
        let scene = assemble_scene(vec![triangle_at(0.0)], false);
        let doc = glb_json(&encode(&scene, ExportTarget::BinaryDocument).unwrap());

        let indices = doc["meshes"][0]["primitives"][0]["indices"].as_u64().unwrap() as usize;
        assert_eq!(doc["accessors"][indices]["count"], 3);
        assert_eq!(doc["accessors"][indices]["componentType"], COMPONENT_U8);
    }

    #[test]
    fn test_text_omits_indices_on_passthrough() {
        let scene = assemble_scene(vec![triangle_at(0.0)], false);
        let payload = encode(&scene, ExportTarget::TextDocument).unwrap();
        let doc = payload.as_json().unwrap();

        assert!(doc["meshes"][0]["primitives"][0].get("indices").is_none());
        assert_eq!(doc["accessors"].as_array().unwrap().len(), 1);
        let uri = doc["buffers"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn test_text_buffer_decodes_to_positions() {
        let scene = assemble_scene(vec![triangle_at(0.0)], false);
        let payload = encode(&scene, ExportTarget::TextDocument).unwrap();
        let doc = payload.as_json().unwrap();

        let uri = doc["buffers"][0]["uri"].as_str().unwrap();
        let data = base64::engine::general_purpose::STANDARD
            .decode(uri.trim_start_matches("data:application/octet-stream;base64,"))
            .unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(doc["buffers"][0]["byteLength"], 36);
        assert_eq!(&data[12..16], &1.0f32.to_le_bytes());
    }

    #[test]
    fn test_outline_emits_lines_primitive() {
        let scene = assemble_scene(vec![triangle_at(0.0)], true);
        let payload = encode(&scene, ExportTarget::TextDocument).unwrap();
        let doc = payload.as_json().unwrap();

        assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);
        let line = &doc["meshes"][0]["primitives"][0];
        assert_eq!(line["mode"], MODE_LINES);
        let indices = line["indices"].as_u64().unwrap() as usize;
        assert_eq!(doc["accessors"][indices]["count"], 6);
        // Black surface and white outline
        assert_eq!(doc["materials"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_two_buildings_disjoint_accessors() {
        let scene = assemble_scene(vec![triangle_at(0.0), triangle_at(10.0)], false);
        let doc = glb_json(&encode(&scene, ExportTarget::BinaryDocument).unwrap());

        let meshes = doc["meshes"].as_array().unwrap();
        assert_eq!(meshes.len(), 2);
        let accessors_of = |m: &Value| {
            let p = &m["primitives"][0];
            vec![p["attributes"]["POSITION"].as_u64().unwrap(), p["indices"].as_u64().unwrap()]
        };
        let first = accessors_of(&meshes[0]);
        let second = accessors_of(&meshes[1]);
        assert!(first.iter().all(|a| !second.contains(a)));
        assert_eq!(doc["scenes"][0]["nodes"], serde_json::json!([0, 1]));
        // Shared black material
        assert_eq!(doc["materials"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let scene = assemble_scene(vec![triangle_at(0.0), triangle_at(3.0)], true);

        for target in [ExportTarget::BinaryDocument, ExportTarget::TextDocument] {
            let a = encode(&scene, target).unwrap().to_bytes().unwrap();
            let b = encode(&scene, target).unwrap().to_bytes().unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_nodes_are_skipped() {
        let scene = assemble_scene(vec![IndexedMesh::new(), triangle_at(0.0)], false);
        let doc = glb_json(&encode(&scene, ExportTarget::BinaryDocument).unwrap());

        assert_eq!(doc["meshes"].as_array().unwrap().len(), 1);
        assert_eq!(doc["nodes"][0]["name"], "mesh_1");
    }

    #[test]
    fn test_empty_scene_is_valid_document() {
        let payload = encode(&Scene::new(), ExportTarget::BinaryDocument).unwrap();
        let parsed = read_glb(payload.as_binary().unwrap()).unwrap();

        assert!(parsed.bin.is_none());
        let doc = parsed.json_value().unwrap();
        assert!(doc.get("buffers").is_none());
        assert!(doc.get("meshes").is_none());
        assert!(doc.get("scenes").is_none());
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let mut mesh = IndexedMesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_triangle(0, 0, 7);
        let mut scene = Scene::new();
        scene.add(SceneNode::Mesh {
            name: "broken".to_string(),
            mesh,
            material: crate::scene::Material::new("surface", Color::BLACK),
        });

        let result = encode(&scene, ExportTarget::BinaryDocument);
        assert!(matches!(result, Err(ExportError::EncodingFailure(_))));
    }

    #[test]
    fn test_out_of_range_index_with_outline_fails() {
        let mut mesh = IndexedMesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_triangle(0, 0, 7);
        let scene = assemble_scene(vec![mesh], true);

        for target in [ExportTarget::BinaryDocument, ExportTarget::TextDocument] {
            let result = encode(&scene, target);
            assert!(matches!(result, Err(ExportError::EncodingFailure(_))));
        }
    }

    #[test]
    fn test_index_component_selection() {
        assert_eq!(IndexComponent::for_max_index(0), IndexComponent::U8);
        assert_eq!(IndexComponent::for_max_index(254), IndexComponent::U8);
        assert_eq!(IndexComponent::for_max_index(255), IndexComponent::U16);
        assert_eq!(IndexComponent::for_max_index(65_534), IndexComponent::U16);
        assert_eq!(IndexComponent::for_max_index(65_535), IndexComponent::U32);
    }

    #[test]
    fn test_large_mesh_uses_wider_indices() {
        let triangles: Vec<[[f32; 3]; 3]> = (0..100)
            .map(|i| {
                let x = i as f32;
                [[x, 0.0, 0.0], [x + 0.5, 0.0, 0.0], [x, 1.0, 0.0]]
            })
            .collect();
        let mesh = build_indexed_mesh(&TriangleSoup::from_triangles(triangles), false);
        let scene = assemble_scene(vec![mesh], false);
        let doc = glb_json(&encode(&scene, ExportTarget::BinaryDocument).unwrap());

        assert_eq!(doc["accessors"][1]["componentType"], COMPONENT_U16);
        assert_ne!(doc["accessors"][1]["componentType"], COMPONENT_U32);
    }

    #[test]
    fn test_buffer_views_are_aligned() {
        let scene = assemble_scene(vec![triangle_at(0.0), triangle_at(2.0)], true);
        let doc = glb_json(&encode(&scene, ExportTarget::BinaryDocument).unwrap());

        for view in doc["bufferViews"].as_array().unwrap() {
            assert_eq!(view["byteOffset"].as_u64().unwrap() % 4, 0);
        }
    }
}
