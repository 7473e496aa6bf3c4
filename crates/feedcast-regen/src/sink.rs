//! Document sinks: where a rebuilt document is published.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use feedcast_core::OutputDocument;
use tracing::debug;

use crate::error::{RegenError, Result};

/// Receives each successfully rebuilt document.
///
/// A publish either replaces the previous document completely or leaves it
/// untouched; readers never see a partial document.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn publish(&self, document: &OutputDocument) -> Result<()>;
}

/// Writes the rendered document to a file, atomically.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// The parent directory must exist and be writable.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dir = parent_dir(&path);
        let meta = std::fs::metadata(dir)?;
        if !meta.is_dir() {
            return Err(RegenError::Publish(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(RegenError::Publish(format!(
                "{} is read-only",
                dir.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

// Temp file in the same directory, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RegenError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl DocumentSink for FileSink {
    async fn publish(&self, document: &OutputDocument) -> Result<()> {
        let bytes = document.to_bytes();
        let path = self.path.clone();
        let len = bytes.len();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| RegenError::Publish(format!("write task failed: {}", e)))??;

        debug!(path = %self.path.display(), bytes = len, "document published");
        Ok(())
    }
}

/// Keeps the last published rendering in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    latest: Option<Vec<u8>>,
    publishes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the most recent publish.
    pub fn latest(&self) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    pub fn publish_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .publishes
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn publish(&self, document: &OutputDocument) -> Result<()> {
        let bytes = document.to_bytes();
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.latest = Some(bytes);
        state.publishes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcast_core::ChannelMeta;
    use tempfile::tempdir;

    fn doc(title: &str) -> OutputDocument {
        OutputDocument::build(ChannelMeta::new(title, ""), Vec::new())
    }

    #[tokio::test]
    async fn test_file_sink_replaces_document() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("tech.rss")).unwrap();

        sink.publish(&doc("first")).await.unwrap();
        sink.publish(&doc("second")).await.unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap();
        assert!(written.contains("<title>second</title>"));
        assert!(!written.contains("first"));

        // No temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_sink_requires_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope").join("tech.rss");
        assert!(FileSink::new(missing).is_err());
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.latest().is_none());
        sink.publish(&doc("x")).await.unwrap();
        assert_eq!(sink.publish_count(), 1);
        assert_eq!(sink.latest().unwrap(), doc("x").to_bytes());
    }
}
