//! Host geometry access.
//!
//! The host exposes two asynchronous queries: triangles for a single path, and
//! the list of paths in a category. [`fetch_triangles`] resolves a
//! [`Selector`] into one soup per matched object.

mod memory;

pub use memory::MemorySource;

use crate::error::{ExportError, Result};
use crate::types::{Selector, TriangleSoup};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

/// Asynchronous host geometry API.
#[async_trait]
pub trait TriangleSource: Send + Sync {
    /// Raw triangles for one logical path.
    async fn get_triangles(&self, path: &str) -> Result<TriangleSoup>;

    /// Paths belonging to a category. An unknown category yields no paths.
    async fn paths_by_category(&self, category: &str) -> Result<Vec<String>>;
}

/// Fetch one soup per object matched by `selector`.
///
/// Category fetches are issued concurrently and joined in path order; the
/// first failure aborts the whole selector. Failures surface as
/// [`ExportError::SourceUnavailable`].
pub async fn fetch_triangles<S>(source: &S, selector: &Selector) -> Result<Vec<TriangleSoup>>
where
    S: TriangleSource + ?Sized,
{
    let paths = match selector {
        Selector::Path(path) => vec![path.clone()],
        Selector::Category(category) => source
            .paths_by_category(category)
            .await
            .map_err(|e| unavailable(selector, e))?,
    };
    debug!(%selector, paths = paths.len(), "resolved selector");

    let soups = try_join_all(paths.iter().map(|path| source.get_triangles(path)))
        .await
        .map_err(|e| unavailable(selector, e))?;

    debug!(
        %selector,
        triangles = soups.iter().map(TriangleSoup::triangle_count).sum::<usize>(),
        "fetched triangles"
    );
    Ok(soups)
}

/// Keep host errors that already name the failing path; wrap everything else.
fn unavailable(selector: &Selector, error: ExportError) -> ExportError {
    match error {
        ExportError::SourceUnavailable { .. } => error,
        other => ExportError::source_unavailable(selector, other),
    }
}
