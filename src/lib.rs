//! # Surface Export
//!
//! A Rust library for exporting host-provided triangle geometry as glTF 2.0
//! assets.
//!
//! ## Overview
//!
//! Geometry arrives from a host as flat triangle soups. Each export fetches
//! the soups selected by a path or category, converts them to indexed
//! meshes, assembles a scene (optionally with edge outlines), encodes it as
//! a glTF JSON document or a GLB container, and hands the result back to the
//! host's storage.
//!
//! ## Quick Start
//!
//! ```ignore
//! use surface_export::{ExportJob, Exporter, MemorySink, MemorySource, TriangleSoup};
//!
//! let source = MemorySource::new()
//!     .with_object("root", TriangleSoup::from_flat(&positions)?);
//! let exporter = Exporter::new(source, MemorySink::new());
//!
//! // Readable document with outlines, stored as export.gltf
//! let report = exporter.export(&ExportJob::site()).await?;
//! ```
//!
//! ## Host Integration
//!
//! Implement [`TriangleSource`] and [`AssetSink`] over the host's geometry
//! and storage APIs. The stages in between are plain functions and can be
//! used directly:
//!
//! ```ignore
//! use surface_export::{assemble_scene, build_indexed_mesh, encode, ExportTarget};
//!
//! let mesh = build_indexed_mesh(&soup, false);
//! let scene = assemble_scene(vec![mesh], false);
//! let payload = encode(&scene, ExportTarget::BinaryDocument)?;
//! ```

pub mod error;
pub mod types;
pub mod source;
pub mod indexer;
pub mod scene;
pub mod export;
pub mod sink;
pub mod pipeline;

// Re-export main types for convenience
pub use error::{ExportError, Result};
pub use types::{BoundingBox, Color, Selector, TriangleSoup};
pub use source::{fetch_triangles, MemorySource, TriangleSource};
pub use indexer::{build_indexed_mesh, build_indexed_mesh_with_policy, DedupePolicy, EdgeSet, IndexedMesh};
pub use scene::{assemble_scene, Material, Scene, SceneAssembler, SceneNode};
pub use export::{encode, encode_with_options, read_glb, write_glb, EncodeOptions, ExportTarget, Glb, Payload};
pub use sink::{store, AssetSink, MemorySink};
#[cfg(feature = "native")]
pub use sink::{DirectorySink, TimeoutSink};
pub use pipeline::{render, ExportConfig, ExportJob, ExportReport, Exporter, Preview, Rendered};

#[cfg(feature = "wasm")]
pub mod wasm;
