//! Filesystem-backed storage and write timeouts.

use super::{validate_key, AssetSink};
use crate::error::{ExportError, Result};
use crate::export::Payload;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persists each key as a file in one directory.
///
/// Payloads are written to a temporary sibling and renamed over the target,
/// so readers see either the old or the new content.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl AssetSink for DirectorySink {
    async fn set_object(&self, key: &str, payload: &Payload) -> Result<()> {
        validate_key(key)?;
        let bytes = payload.to_bytes()?;
        let target = self.path_for(key);
        let staging = self.root.join(format!(".{}.partial", key));

        tokio::fs::create_dir_all(&self.root).await?;
        let written = match tokio::fs::write(&staging, &bytes).await {
            Ok(()) => tokio::fs::rename(&staging, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Never leave a partial staging file behind.
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Fails writes that take longer than a fixed duration.
#[derive(Debug, Clone)]
pub struct TimeoutSink<K> {
    inner: K,
    timeout: Duration,
}

impl<K: AssetSink> TimeoutSink<K> {
    pub fn new(inner: K, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }
}

#[async_trait]
impl<K: AssetSink> AssetSink for TimeoutSink<K> {
    async fn set_object(&self, key: &str, payload: &Payload) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.inner.set_object(key, payload)).await {
            Ok(result) => result,
            Err(_) => Err(ExportError::sink_unavailable(
                key,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::store;

    struct StalledSink;

    #[async_trait]
    impl AssetSink for StalledSink {
        async fn set_object(&self, _key: &str, _payload: &Payload) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        store(&sink, "terrain.glb", &Payload::Binary(vec![1, 2, 3])).await.unwrap();
        let written = std::fs::read(dir.path().join("terrain.glb")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_directory_sink_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("nested"));

        let first = Payload::Json(serde_json::json!({ "v": 1 }));
        let second = Payload::Json(serde_json::json!({ "v": 2 }));
        store(&sink, "export.gltf", &first).await.unwrap();
        store(&sink, "export.gltf", &second).await.unwrap();

        let written = std::fs::read_to_string(sink.path_for("export.gltf")).unwrap();
        assert_eq!(written, r#"{"v":2}"#);
        let entries = std::fs::read_dir(sink.root()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        // A non-empty directory at the key cannot be replaced by a file.
        std::fs::create_dir_all(dir.path().join("terrain.glb").join("occupied")).unwrap();

        let result = sink.set_object("terrain.glb", &Payload::Binary(vec![1, 2, 3])).await;
        assert!(matches!(result, Err(ExportError::Io(_))));
        assert!(!dir.path().join(".terrain.glb.partial").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_sink_unavailable() {
        let sink = TimeoutSink::new(StalledSink, Duration::from_secs(5));
        let result = store(&sink, "surroundings.glb", &Payload::Binary(vec![1])).await;

        match result {
            Err(ExportError::SinkUnavailable { reason, .. }) => assert!(reason.contains("timed out")),
            other => panic!("expected SinkUnavailable, got {:?}", other),
        }
    }
}
