//! In-memory geometry host.

use super::TriangleSource;
use crate::error::{ExportError, Result};
use crate::types::TriangleSoup;
use async_trait::async_trait;
use std::collections::HashMap;

/// Geometry held in memory, keyed by path, with named categories of paths.
///
/// Useful for embedding hosts that already hold their buffers, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    objects: HashMap<String, TriangleSoup>,
    categories: HashMap<String, Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, path: impl Into<String>, soup: TriangleSoup) -> Self {
        self.insert_object(path, soup);
        self
    }

    pub fn with_category<I, P>(mut self, category: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.categories
            .insert(category.into(), paths.into_iter().map(Into::into).collect());
        self
    }

    /// Insert or replace the geometry at `path`.
    pub fn insert_object(&mut self, path: impl Into<String>, soup: TriangleSoup) {
        self.objects.insert(path.into(), soup);
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl TriangleSource for MemorySource {
    async fn get_triangles(&self, path: &str) -> Result<TriangleSoup> {
        self.objects
            .get(path)
            .cloned()
            .ok_or_else(|| ExportError::source_unavailable(format!("path '{}'", path), "no such path"))
    }

    async fn paths_by_category(&self, category: &str) -> Result<Vec<String>> {
        Ok(self.categories.get(category).cloned().unwrap_or_default())
    }
}
