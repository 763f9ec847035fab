//! glTF 2.0 export.
//!
//! [`encode`] turns a [`Scene`](crate::scene::Scene) into a [`Payload`]: a JSON
//! document with an embedded base64 buffer for [`ExportTarget::TextDocument`],
//! or a packed GLB container for [`ExportTarget::BinaryDocument`].

pub mod glb;
pub mod gltf;

pub use glb::{read_glb, write_glb, Glb};
pub use gltf::{encode, encode_with_options};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Output document flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    /// Human-readable `.gltf` JSON with the buffer embedded as a data URI.
    TextDocument,
    /// Single packed `.glb` container.
    #[default]
    BinaryDocument,
}

impl ExportTarget {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportTarget::TextDocument => "gltf",
            ExportTarget::BinaryDocument => "glb",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportTarget::TextDocument => "model/gltf+json",
            ExportTarget::BinaryDocument => "model/gltf-binary",
        }
    }

    /// Conventional file name for an export with no better name.
    pub fn default_file_name(&self) -> String {
        format!("export.{}", self.extension())
    }

    /// Binary exports always carry an index buffer.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            force_indices: matches!(self, ExportTarget::BinaryDocument),
            ..EncodeOptions::default()
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write an index accessor even for 1:1 passthrough meshes.
    pub force_indices: bool,
    /// Value of `asset.generator`.
    pub generator: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            force_indices: false,
            generator: default_generator(),
        }
    }
}

pub(crate) fn default_generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// An encoded document ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A glTF JSON document.
    Json(serde_json::Value),
    /// A GLB container.
    Binary(Vec<u8>),
}

impl Payload {
    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Payload::Json(_) => None,
            Payload::Binary(bytes) => Some(bytes),
        }
    }

    /// Serialized bytes, as they would be written to a file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Payload::Json(value) => Ok(serde_json::to_vec(value)?),
            Payload::Binary(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => ExportTarget::TextDocument.mime_type(),
            Payload::Binary(_) => ExportTarget::BinaryDocument.mime_type(),
        }
    }
}
