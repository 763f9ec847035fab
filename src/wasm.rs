//! WASM bindings for surface-export.
//!
//! Hosts running in the browser hand over flat position buffers directly; the
//! fetch and store stages stay on the JavaScript side.

use crate::export::{ExportTarget, Payload};
use crate::pipeline::{render, ExportConfig};
use crate::types::TriangleSoup;
use js_sys::{Array, Float32Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the browser console
    console_error_panic_hook::set_once();
}

/// Export result containing the encoded document.
#[wasm_bindgen]
pub struct ExportResult {
    bytes: Vec<u8>,
    binary: bool,
    node_count: usize,
    triangle_count: usize,
}

#[wasm_bindgen]
impl ExportResult {
    /// Get the encoded document bytes (GLB, or UTF-8 glTF JSON).
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Get the MIME type to store the bytes with.
    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.target().mime_type().to_string()
    }

    /// Get the default file name for the document.
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.target().default_file_name()
    }

    /// Get the number of scene nodes written.
    #[wasm_bindgen(getter, js_name = nodeCount)]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Get the number of input triangles.
    #[wasm_bindgen(getter, js_name = triangleCount)]
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    fn target(&self) -> ExportTarget {
        if self.binary {
            ExportTarget::BinaryDocument
        } else {
            ExportTarget::TextDocument
        }
    }
}

/// Export one flat `[x, y, z, ...]` position buffer as a single mesh.
#[wasm_bindgen(js_name = exportPositions)]
pub fn export_positions(
    positions: &Float32Array,
    binary: bool,
    outline: bool,
) -> Result<ExportResult, JsError> {
    let soup = soup_from_array(positions)?;
    export_soups(vec![soup], binary, outline)
}

/// Export an array of position buffers, one mesh per buffer.
#[wasm_bindgen(js_name = exportObjects)]
pub fn export_objects(objects: &Array, binary: bool, outline: bool) -> Result<ExportResult, JsError> {
    let mut soups = Vec::with_capacity(objects.length() as usize);
    for (i, value) in objects.iter().enumerate() {
        let array = value
            .dyn_into::<Float32Array>()
            .map_err(|_| JsError::new(&format!("object {} is not a Float32Array", i)))?;
        soups.push(soup_from_array(&array)?);
    }
    export_soups(soups, binary, outline)
}

/// Count the triangles in a flat position buffer.
#[wasm_bindgen(js_name = triangleCount)]
pub fn triangle_count(positions: &Float32Array) -> Result<usize, JsError> {
    Ok(soup_from_array(positions)?.triangle_count())
}

fn soup_from_array(array: &Float32Array) -> Result<TriangleSoup, JsError> {
    TriangleSoup::from_flat(&array.to_vec()).map_err(|e| JsError::new(&e.to_string()))
}

fn export_soups(soups: Vec<TriangleSoup>, binary: bool, outline: bool) -> Result<ExportResult, JsError> {
    let target = if binary {
        ExportTarget::BinaryDocument
    } else {
        ExportTarget::TextDocument
    };
    let triangle_count = soups.iter().map(TriangleSoup::triangle_count).sum();

    let rendered = render(&ExportConfig::default(), soups, target, false, outline)
        .map_err(|e| JsError::new(&e.to_string()))?;

    let bytes = match rendered.payload {
        Some(Payload::Binary(bytes)) => bytes,
        Some(payload) => payload.to_bytes().map_err(|e| JsError::new(&e.to_string()))?,
        None => Vec::new(),
    };

    Ok(ExportResult {
        bytes,
        binary,
        node_count: rendered.node_count,
        triangle_count,
    })
}
