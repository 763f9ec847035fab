//! End-to-end export: fetch, index, assemble, encode, store.
//!
//! Only the first and last stages touch the host. Everything in between is a
//! pure transformation over data owned by the running export.

use crate::error::{ExportError, Result};
use crate::export::{default_generator, encode_with_options, EncodeOptions, ExportTarget, Payload};
use crate::indexer::{build_indexed_mesh, build_indexed_mesh_with_policy, DedupePolicy, IndexedMesh};
use crate::scene::SceneAssembler;
use crate::sink::{store, AssetSink};
use crate::source::{fetch_triangles, TriangleSource};
use crate::types::{Color, Selector, TriangleSoup};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Export configuration shared by all jobs of an [`Exporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Flat color of surface meshes.
    pub mesh_color: Color,
    /// Flat color of outline line segments.
    pub outline_color: Color,
    /// Vertex merge policy used when outlines need shared vertices.
    pub dedupe: DedupePolicy,
    /// When set, outlines keep only boundary edges and creases sharper than
    /// this many degrees.
    pub outline_crease_angle: Option<f32>,
    /// Written to `asset.generator`.
    pub generator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mesh_color: Color::BLACK,
            outline_color: Color::WHITE,
            dedupe: DedupePolicy::Exact,
            outline_crease_angle: None,
            generator: default_generator(),
        }
    }
}

impl ExportConfig {
    pub fn with_mesh_color(mut self, color: Color) -> Self {
        self.mesh_color = color;
        self
    }

    pub fn with_outline_color(mut self, color: Color) -> Self {
        self.outline_color = color;
        self
    }

    pub fn with_dedupe(mut self, dedupe: DedupePolicy) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_outline_crease_angle(mut self, degrees: f32) -> Self {
        self.outline_crease_angle = Some(degrees);
        self
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = generator.into();
        self
    }

    /// Encoder options for `target`.
    pub fn encode_options(&self, target: ExportTarget) -> EncodeOptions {
        EncodeOptions {
            generator: self.generator.clone(),
            ..target.encode_options()
        }
    }
}

/// One export invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Geometry to export.
    pub selector: Selector,
    /// Storage key of the result.
    pub key: String,
    pub target: ExportTarget,
    /// Merge all matched objects into a single mesh.
    #[serde(default)]
    pub merge_objects: bool,
    /// Add an outline node for every mesh.
    #[serde(default)]
    pub include_outline: bool,
}

impl ExportJob {
    pub fn new(selector: Selector, key: impl Into<String>, target: ExportTarget) -> Self {
        Self {
            selector,
            key: key.into(),
            target,
            merge_objects: false,
            include_outline: false,
        }
    }

    pub fn with_outline(mut self, include_outline: bool) -> Self {
        self.include_outline = include_outline;
        self
    }

    pub fn merged(mut self, merge_objects: bool) -> Self {
        self.merge_objects = merge_objects;
        self
    }

    /// The whole site as a readable document with outlines.
    pub fn site() -> Self {
        Self::new(
            Selector::path("root"),
            ExportTarget::TextDocument.default_file_name(),
            ExportTarget::TextDocument,
        )
        .with_outline(true)
    }

    /// All terrain as one binary mesh.
    pub fn terrain() -> Self {
        Self::new(
            Selector::category("terrain"),
            "terrain.glb",
            ExportTarget::BinaryDocument,
        )
        .merged(true)
    }

    /// Every building as its own mesh in one binary document.
    pub fn surroundings() -> Self {
        Self::new(
            Selector::category("building"),
            "surroundings.glb",
            ExportTarget::BinaryDocument,
        )
    }
}

/// Outcome of a completed export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub key: String,
    pub target: ExportTarget,
    /// Objects matched by the selector.
    pub object_count: usize,
    pub triangle_count: usize,
    /// Scene nodes with drawable geometry.
    pub node_count: usize,
    /// Serialized payload size; zero when nothing was stored.
    pub byte_length: usize,
    /// False when there was nothing to export.
    pub stored: bool,
}

/// Geometry counts for a selector, without exporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub object_count: usize,
    pub triangle_count: usize,
}

/// Runs exports against a geometry source and an asset sink.
pub struct Exporter<S, K> {
    source: S,
    sink: K,
    config: ExportConfig,
    in_progress: AtomicBool,
}

impl<S: TriangleSource, K: AssetSink> Exporter<S, K> {
    /// Create an exporter with default configuration.
    pub fn new(source: S, sink: K) -> Self {
        Self::with_config(source, sink, ExportConfig::default())
    }

    /// Create an exporter with custom configuration.
    pub fn with_config(source: S, sink: K, config: ExportConfig) -> Self {
        Self {
            source,
            sink,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// True while an export is running.
    pub fn is_exporting(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Fetch geometry for `selector` and count it.
    pub async fn preview(&self, selector: &Selector) -> Result<Preview> {
        let soups = fetch_triangles(&self.source, selector).await?;
        Ok(Preview {
            object_count: soups.len(),
            triangle_count: soups.iter().map(TriangleSoup::triangle_count).sum(),
        })
    }

    /// Run one export to completion or failure.
    ///
    /// Fails with [`ExportError::ExportInProgress`] if another export is
    /// running on this exporter. Nothing is stored unless every stage
    /// succeeds.
    pub async fn export(&self, job: &ExportJob) -> Result<ExportReport> {
        let _guard = ExportGuard::acquire(&self.in_progress)?;
        info!(
            selector = %job.selector,
            key = %job.key,
            target = ?job.target,
            "starting export"
        );

        let result = self.run(job).await;
        match &result {
            Ok(report) => info!(
                key = %report.key,
                stored = report.stored,
                nodes = report.node_count,
                triangles = report.triangle_count,
                bytes = report.byte_length,
                "export finished"
            ),
            Err(e) => error!(key = %job.key, error = %e, "export failed"),
        }
        result
    }

    async fn run(&self, job: &ExportJob) -> Result<ExportReport> {
        let soups = fetch_triangles(&self.source, &job.selector).await?;
        let object_count = soups.len();
        let triangle_count = soups.iter().map(TriangleSoup::triangle_count).sum();

        let rendered = render(
            &self.config,
            soups,
            job.target,
            job.merge_objects,
            job.include_outline,
        )?;

        let mut report = ExportReport {
            key: job.key.clone(),
            target: job.target,
            object_count,
            triangle_count,
            node_count: rendered.node_count,
            byte_length: 0,
            stored: false,
        };

        let Some(payload) = rendered.payload else {
            info!(selector = %job.selector, "nothing to export");
            return Ok(report);
        };
        report.byte_length = match payload.as_binary() {
            Some(bytes) => bytes.len(),
            None => payload.to_bytes()?.len(),
        };

        store(&self.sink, &job.key, &payload).await?;
        report.stored = true;
        Ok(report)
    }
}

/// Result of the pure export stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// None when no node carries geometry.
    pub payload: Option<Payload>,
    /// Scene nodes with drawable geometry.
    pub node_count: usize,
}

/// Index, assemble and encode geometry the caller already holds.
pub fn render(
    config: &ExportConfig,
    soups: Vec<TriangleSoup>,
    target: ExportTarget,
    merge_objects: bool,
    include_outline: bool,
) -> Result<Rendered> {
    let soups = if merge_objects && soups.len() > 1 {
        vec![TriangleSoup::merged(soups)]
    } else {
        soups
    };

    // Outlines need shared vertices; plain meshes keep corner order.
    let meshes: Vec<IndexedMesh> = soups
        .iter()
        .map(|soup| {
            if include_outline {
                build_indexed_mesh_with_policy(soup, config.dedupe)
            } else {
                build_indexed_mesh(soup, false)
            }
        })
        .collect();
    debug!(meshes = meshes.len(), "indexed meshes");

    let scene = SceneAssembler::from_config(config).assemble(meshes, include_outline);
    let node_count = scene.nodes().iter().filter(|n| !n.is_empty()).count();
    if node_count == 0 {
        return Ok(Rendered { payload: None, node_count });
    }

    let payload = encode_with_options(&scene, target, &config.encode_options(target))?;
    Ok(Rendered {
        payload: Some(payload),
        node_count,
    })
}

/// Holds the in-progress flag for the lifetime of one export.
struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::ExportInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
