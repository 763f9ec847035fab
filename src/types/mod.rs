//! Shared types used throughout the library.

mod color;
mod selector;

pub use color::Color;
pub use selector::Selector;

use crate::error::{ExportError, Result};

/// A flat list of triangle corners with no shared-vertex indexing.
///
/// Every consecutive group of three vertices is one triangle. Vertices may
/// repeat across triangles; no identity is implied by equal coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup {
    vertices: Vec<[f32; 3]>,
}

impl TriangleSoup {
    /// Create an empty soup (zero triangles).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a soup from a flat `x, y, z` float buffer as returned by the host.
    ///
    /// The buffer length must be a multiple of 9 (three floats per vertex,
    /// three vertices per triangle).
    pub fn from_flat(positions: &[f32]) -> Result<Self> {
        if positions.len() % 9 != 0 {
            return Err(ExportError::InvalidGeometry(format!(
                "flat position buffer of length {} is not a multiple of 9",
                positions.len()
            )));
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self { vertices })
    }

    /// Build a soup from per-corner vertices. The count must be a multiple of 3.
    pub fn from_vertices(vertices: Vec<[f32; 3]>) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(ExportError::InvalidGeometry(format!(
                "{} corners do not form whole triangles",
                vertices.len()
            )));
        }
        Ok(Self { vertices })
    }

    /// Build a soup from whole triangles.
    pub fn from_triangles(triangles: impl IntoIterator<Item = [[f32; 3]; 3]>) -> Self {
        Self {
            vertices: triangles.into_iter().flatten().collect(),
        }
    }

    /// Concatenate several soups into one, keeping input order.
    pub fn merged(soups: impl IntoIterator<Item = TriangleSoup>) -> Self {
        let mut merged = Self::new();
        for soup in soups {
            merged.vertices.extend(soup.vertices);
        }
        merged
    }

    /// Per-corner vertices.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    /// Number of triangle corners (three per triangle).
    pub fn corner_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate over triangles as slices of three corners.
    pub fn triangles(&self) -> impl Iterator<Item = &[[f32; 3]]> {
        self.vertices.chunks_exact(3)
    }

    /// Positions as a flat float array, the layout the host hands out.
    pub fn to_flat(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| *v).collect()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().copied())
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl Iterator<Item = [f32; 3]>) -> Option<Self> {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut has_points = false;

        for p in points {
            has_points = true;
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        if has_points {
            Some(Self { min, max })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_rejects_partial_triangles() {
        let result = TriangleSoup::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert!(matches!(result, Err(ExportError::InvalidGeometry(_))));
    }

    #[test]
    fn test_from_flat_counts() {
        let flat = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let soup = TriangleSoup::from_flat(&flat).unwrap();

        assert_eq!(soup.corner_count(), 3);
        assert_eq!(soup.triangle_count(), 1);
        assert_eq!(soup.vertices()[1], [1.0, 0.0, 0.0]);
        assert_eq!(soup.to_flat(), flat.to_vec());
    }

    #[test]
    fn test_empty_soup() {
        let soup = TriangleSoup::from_flat(&[]).unwrap();
        assert!(soup.is_empty());
        assert_eq!(soup.triangle_count(), 0);
        assert!(soup.bounds().is_none());
    }

    #[test]
    fn test_merged_keeps_order() {
        let a = TriangleSoup::from_triangles([[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        let b = TriangleSoup::from_triangles([[[5.0; 3], [6.0, 5.0, 5.0], [5.0, 6.0, 5.0]]]);

        let merged = TriangleSoup::merged([a, b]);
        assert_eq!(merged.triangle_count(), 2);
        assert_eq!(merged.vertices()[3], [5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_bounds() {
        let soup = TriangleSoup::from_triangles([[[-1.0, 0.0, 2.0], [1.0, 0.0, 0.0], [0.0, 3.0, 0.0]]]);
        let bounds = soup.bounds().unwrap();

        assert_eq!(bounds.min, [-1.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 3.0, 2.0]);
    }
}
