//! GLB container packing and unpacking.

use crate::error::{ExportError, Result};
use gltf_json as json;

/// GLB header magic.
pub const GLB_MAGIC: &[u8; 4] = b"glTF";
/// GLB container version.
pub const GLB_VERSION: u32 = 2;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const CHUNK_JSON: u32 = 0x4E4F534A;
const CHUNK_BIN: u32 = 0x004E4942;

/// Pack a JSON document and its binary buffer into a GLB container.
///
/// The BIN chunk is omitted when `bin` is empty.
pub fn write_glb(json_bytes: &[u8], bin: &[u8]) -> Result<Vec<u8>> {
    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let padded_json_len = json_bytes.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let bin_padding = (4 - (bin.len() % 4)) % 4;
    let padded_bin_len = bin.len() + bin_padding;

    let total_size = HEADER_LEN
        + CHUNK_HEADER_LEN
        + padded_json_len
        + if bin.is_empty() { 0 } else { CHUNK_HEADER_LEN + padded_bin_len };
    let total_size = u32::try_from(total_size).map_err(|_| {
        ExportError::EncodingFailure(format!("GLB of {} bytes exceeds 4 GiB", total_size))
    })?;

    let mut glb = Vec::with_capacity(total_size as usize);

    // GLB Header
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_size.to_le_bytes());

    // JSON Chunk
    glb.extend_from_slice(&(padded_json_len as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(json_bytes);
    glb.extend_from_slice(&vec![0x20u8; json_padding]);

    // BIN Chunk
    if !bin.is_empty() {
        glb.extend_from_slice(&(padded_bin_len as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(bin);
        glb.extend_from_slice(&vec![0u8; bin_padding]);
    }

    Ok(glb)
}

/// An unpacked GLB container.
#[derive(Debug, Clone, PartialEq)]
pub struct Glb {
    /// JSON chunk contents, including any trailing space padding.
    pub json: Vec<u8>,
    /// BIN chunk contents, including any trailing zero padding.
    pub bin: Option<Vec<u8>>,
}

impl Glb {
    /// Parse the JSON chunk as an untyped value.
    pub fn json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.json)?)
    }

    /// Parse the JSON chunk as a glTF root.
    pub fn root(&self) -> Result<json::Root> {
        Ok(serde_json::from_slice(&self.json)?)
    }
}

/// Unpack a GLB container, validating header and chunk layout.
pub fn read_glb(bytes: &[u8]) -> Result<Glb> {
    if bytes.len() < HEADER_LEN {
        return Err(ExportError::InvalidGlb(format!(
            "{} bytes is shorter than the GLB header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != GLB_MAGIC {
        return Err(ExportError::InvalidGlb("bad magic".to_string()));
    }
    let version = read_u32(bytes, 4);
    if version != GLB_VERSION {
        return Err(ExportError::InvalidGlb(format!("unsupported version {}", version)));
    }
    let declared = read_u32(bytes, 8) as usize;
    if declared != bytes.len() {
        return Err(ExportError::InvalidGlb(format!(
            "header declares {} bytes, container has {}",
            declared,
            bytes.len()
        )));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = HEADER_LEN;

    while offset < bytes.len() {
        if offset + CHUNK_HEADER_LEN > bytes.len() {
            return Err(ExportError::InvalidGlb(format!("truncated chunk header at {}", offset)));
        }
        let chunk_len = read_u32(bytes, offset) as usize;
        let chunk_type = read_u32(bytes, offset + 4);
        let start = offset + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(chunk_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                ExportError::InvalidGlb(format!("chunk at {} overruns the container", offset))
            })?;
        let data = bytes[start..end].to_vec();

        match chunk_type {
            CHUNK_JSON if json.is_none() && offset == HEADER_LEN => json = Some(data),
            CHUNK_BIN if json.is_some() && bin.is_none() => bin = Some(data),
            CHUNK_JSON | CHUNK_BIN => {
                return Err(ExportError::InvalidGlb(format!(
                    "unexpected chunk 0x{:08X} at {}",
                    chunk_type, offset
                )))
            }
            // Unknown chunk types are ignored.
            _ => {}
        }
        offset = end;
    }

    let json = json.ok_or_else(|| ExportError::InvalidGlb("missing JSON chunk".to_string()))?;
    Ok(Glb { json, bin })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
