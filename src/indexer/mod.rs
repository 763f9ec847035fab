//! Conversion of triangle soups into indexed meshes.
//!
//! A soup carries one vertex per triangle corner. Indexing separates unique
//! positions from per-corner references, optionally merging coincident
//! vertices so that triangle connectivity (and therefore edges) can be
//! recovered.

pub mod edges;

pub use edges::EdgeSet;

use crate::error::{ExportError, Result};
use crate::types::{BoundingBox, TriangleSoup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle indices (3 per triangle).
    pub indices: Vec<u32>,
}

impl IndexedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, position: [f32; 3]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        index
    }

    /// Add a triangle by vertex indices.
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Get the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Check if the mesh is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Largest index referenced by the mesh.
    pub fn max_index(&self) -> Option<u32> {
        self.indices.iter().copied().max()
    }

    /// True when the indices are exactly `0..vertex_count`, i.e. the mesh is a
    /// 1:1 passthrough of its soup.
    pub fn is_passthrough(&self) -> bool {
        self.indices.len() == self.positions.len()
            && self.indices.iter().enumerate().all(|(i, &idx)| idx as usize == i)
    }

    /// Expand back to per-corner positions.
    ///
    /// Fails with [`ExportError::EncodingFailure`] when the indices do not
    /// describe whole triangles within range.
    pub fn expand(&self) -> Result<TriangleSoup> {
        self.validate()?;
        Ok(TriangleSoup::from_triangles(self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })))
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions.iter().copied())
    }

    /// Check that the index list describes whole triangles within range.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(ExportError::EncodingFailure(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(max) = self.max_index() {
            if max as usize >= self.positions.len() {
                return Err(ExportError::EncodingFailure(format!(
                    "index {} out of range for {} vertices",
                    max,
                    self.positions.len()
                )));
            }
        }
        Ok(())
    }
}

/// How coincident vertices are merged during indexing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DedupePolicy {
    /// Merge only vertices whose coordinates compare exactly equal.
    #[default]
    Exact,
    /// Merge vertices that round to the same `epsilon`-sized grid cell.
    /// Merged vertices keep the position of their first occurrence.
    ///
    /// This is a grid snap, not a distance test: two points closer than
    /// `epsilon` that fall on either side of a cell boundary are not merged.
    Quantized { epsilon: f32 },
}

impl DedupePolicy {
    /// Lookup key for a position, or `None` if it must never be merged.
    fn key(&self, p: [f32; 3]) -> Option<[i64; 3]> {
        match *self {
            DedupePolicy::Quantized { epsilon } if epsilon > 0.0 && epsilon.is_finite() => {
                if !p.iter().all(|c| c.is_finite()) {
                    return None;
                }
                let cell = |c: f32| (c as f64 / epsilon as f64).round() as i64;
                Some([cell(p[0]), cell(p[1]), cell(p[2])])
            }
            _ => {
                // NaN never compares equal, so it never merges.
                if p.iter().any(|c| c.is_nan()) {
                    return None;
                }
                // -0.0 == 0.0
                let bits = |c: f32| if c == 0.0 { 0 } else { c.to_bits() as i64 };
                Some([bits(p[0]), bits(p[1]), bits(p[2])])
            }
        }
    }
}

/// Convert a triangle soup into an indexed mesh.
///
/// With `dedupe == false` the vertex list is the soup unchanged and the
/// indices are `0..corner_count`. With `dedupe == true` exactly equal
/// positions are merged in first-occurrence order.
pub fn build_indexed_mesh(soup: &TriangleSoup, dedupe: bool) -> IndexedMesh {
    if dedupe {
        build_indexed_mesh_with_policy(soup, DedupePolicy::Exact)
    } else {
        IndexedMesh {
            positions: soup.vertices().to_vec(),
            indices: (0..soup.corner_count() as u32).collect(),
        }
    }
}

/// Convert a triangle soup into an indexed mesh, merging vertices according
/// to `policy`. Output order is deterministic: first occurrence wins.
pub fn build_indexed_mesh_with_policy(soup: &TriangleSoup, policy: DedupePolicy) -> IndexedMesh {
    let mut mesh = IndexedMesh {
        positions: Vec::new(),
        indices: Vec::with_capacity(soup.corner_count()),
    };
    let mut slots: HashMap<[i64; 3], u32> = HashMap::new();

    for &position in soup.vertices() {
        let index = match policy.key(position) {
            Some(key) => *slots
                .entry(key)
                .or_insert_with(|| mesh.add_vertex(position)),
            None => mesh.add_vertex(position),
        };
        mesh.indices.push(index);
    }

    mesh
}
