//! Geometry selectors understood by the host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies what geometry to fetch from the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    /// A single logical geometry path, e.g. `"root"`.
    Path(String),
    /// A category of paths, e.g. `"terrain"` or `"building"`.
    Category(String),
}

impl Selector {
    pub fn path(path: impl Into<String>) -> Self {
        Selector::Path(path.into())
    }

    pub fn category(category: impl Into<String>) -> Self {
        Selector::Category(category.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Path(path) => write!(f, "path '{}'", path),
            Selector::Category(category) => write!(f, "category '{}'", category),
        }
    }
}
