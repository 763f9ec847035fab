//! Host storage access.
//!
//! Encoded payloads are persisted under a key through an [`AssetSink`].
//! Writing an existing key replaces its content; any failure is terminal for
//! the export and is never retried.

mod memory;
#[cfg(feature = "native")]
mod directory;

pub use memory::MemorySink;
#[cfg(feature = "native")]
pub use directory::{DirectorySink, TimeoutSink};

use crate::error::{ExportError, Result};
use crate::export::Payload;
use async_trait::async_trait;
use tracing::{debug, error};

/// Asynchronous host storage API.
#[async_trait]
pub trait AssetSink: Send + Sync {
    /// Persist `payload` under `key`, replacing any previous content.
    async fn set_object(&self, key: &str, payload: &Payload) -> Result<()>;
}

/// Store a payload, reporting every failure as
/// [`ExportError::SinkUnavailable`] (key validation errors excepted).
pub async fn store<K>(sink: &K, key: &str, payload: &Payload) -> Result<()>
where
    K: AssetSink + ?Sized,
{
    validate_key(key)?;

    match sink.set_object(key, payload).await {
        Ok(()) => {
            debug!(key, binary = payload.is_binary(), "stored payload");
            Ok(())
        }
        Err(e) => {
            error!(key, error = %e, "storage write failed");
            Err(match e {
                ExportError::SinkUnavailable { .. } | ExportError::InvalidKey(_) => e,
                other => ExportError::sink_unavailable(key, other),
            })
        }
    }
}

/// Keys name a single object; they may not be empty or contain path
/// separators.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = key.trim().is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key == "."
        || key == "..";
    if invalid {
        return Err(ExportError::InvalidKey(key.to_string()));
    }
    Ok(())
}
