//! In-memory storage host.

use super::AssetSink;
use crate::error::{ExportError, Result};
use crate::export::Payload;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Stores payloads in a map. Each write replaces the whole entry.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<String, Payload>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AssetSink for MemorySink {
    async fn set_object(&self, key: &str, payload: &Payload) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ExportError::sink_unavailable(key, "storage lock poisoned"))?;
        objects.insert(key.to_string(), payload.clone());
        Ok(())
    }
}
