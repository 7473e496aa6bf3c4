//! Feed reader: one feed's store view, regeneration engine, and output file.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use feedcast_core::{decode_entry, ChannelMeta, Entry};
use feedcast_regen::{FileSink, Freshness, ObserverId, RebuildReport, RegenerationEngine};
use feedcast_store::{PrefixedStore, StoreView};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{FeedcastError, Result};

fn default_extension() -> String {
    "rss".to_string()
}

/// Configuration for a [`FeedReader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Feed name; also the output file stem and the document title.
    pub name: String,
    /// Missing means empty.
    #[serde(default)]
    pub description: Option<String>,
    /// Directory the document is published into. Must exist.
    pub output_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub file_extension: String,
    /// Public URL of the published document, if any.
    #[serde(default)]
    pub link: Option<String>,
}

impl ReaderConfig {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: None,
            output_dir: output_dir.into(),
            file_extension: default_extension(),
            link: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// `<name>.<extension>`
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.name, self.file_extension)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FeedcastError::InvalidConfig(
                "feed name must not be empty".into(),
            ));
        }
        if self.name.contains('/') || self.name.contains(std::path::MAIN_SEPARATOR) {
            return Err(FeedcastError::InvalidConfig(format!(
                "feed name {:?} must not contain a path separator",
                self.name
            )));
        }
        if self.file_extension.is_empty() {
            return Err(FeedcastError::InvalidConfig(
                "file extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Publishes one feed from its store view.
pub struct FeedReader {
    config: ReaderConfig,
    engine: Arc<RegenerationEngine>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl FeedReader {
    /// Build a reader over a store view that holds only this feed's keys.
    ///
    /// Fails if the name is empty or the output directory is unusable;
    /// nothing is started.
    pub fn new(config: ReaderConfig, store: Arc<dyn StoreView>) -> Result<Self> {
        config.validate()?;

        let sink = FileSink::new(config.output_dir.join(config.output_file_name()))?;
        let mut meta = ChannelMeta::new(
            config.name.clone(),
            config.description.clone().unwrap_or_default(),
        );
        if let Some(link) = &config.link {
            meta = meta.with_link(link.clone());
        }

        Ok(Self {
            engine: Arc::new(RegenerationEngine::new(store, meta, Arc::new(sink))),
            config,
            listener: Mutex::new(None),
        })
    }

    /// Build a reader over the `<name>/` namespace of a shared store.
    pub fn namespaced(config: ReaderConfig, shared: Arc<dyn StoreView>) -> Result<Self> {
        config.validate()?;
        let store = PrefixedStore::new(shared, &config.name)?;
        Self::new(config, Arc::new(store))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> &str {
        &self.engine.meta().description
    }

    pub fn output_file_name(&self) -> String {
        self.config.output_file_name()
    }

    pub fn output_path(&self) -> PathBuf {
        self.config.output_dir.join(self.config.output_file_name())
    }

    pub fn engine(&self) -> &Arc<RegenerationEngine> {
        &self.engine
    }

    pub fn freshness(&self) -> Freshness {
        self.engine.freshness()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.engine.last_update()
    }

    pub fn refreshed_since_update(&self) -> bool {
        self.engine.refreshed_since_update()
    }

    /// Read and decode the entry stored under `key`.
    pub async fn read_entry(&self, key: &str) -> Result<Entry> {
        let blob = self
            .engine
            .store()
            .get(key)
            .await?
            .ok_or_else(|| FeedcastError::EntryNotFound(key.to_string()))?;
        Ok(decode_entry(&blob)?)
    }

    /// Rebuild and publish now.
    pub async fn force_update(&self) -> Result<RebuildReport> {
        Ok(self.engine.force_update().await?)
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(Option<DateTime<Utc>>, &RegenerationEngine) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.engine.add_observer(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.engine.remove_observer(id)
    }

    /// Publish the current key set, then rebuild on every store mutation.
    /// Starting twice is a no-op. Must be called from within a tokio
    /// runtime.
    pub fn start(&self) {
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!(feed = %self.config.name, "feed reader already running");
            return;
        }
        *listener = Some(self.engine.spawn_publisher());
        info!(feed = %self.config.name, output = %self.output_path().display(), "feed reader started");
    }

    pub fn is_running(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop listening for mutations. The published document stays in place.
    pub fn terminate(&self) {
        if let Some(handle) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        info!(feed = %self.config.name, "terminating feed");
    }
}

impl Drop for FeedReader {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedcast_store::MemoryStore;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config: ReaderConfig =
            serde_json::from_str(r#"{"name":"tech","output_dir":"/tmp"}"#).unwrap();
        assert_eq!(config.file_extension, "rss");
        assert_eq!(config.output_file_name(), "tech.rss");
        assert_eq!(config.description, None);
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempdir().unwrap();
        let err = FeedReader::new(
            ReaderConfig::new("  ", dir.path()),
            Arc::new(MemoryStore::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, FeedcastError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_output_dir_rejected() {
        let dir = tempdir().unwrap();
        let result = FeedReader::new(
            ReaderConfig::new("tech", dir.path().join("missing")),
            Arc::new(MemoryStore::new()),
        );
        assert!(matches!(result, Err(FeedcastError::Regen(_))));
    }

    #[test]
    fn test_missing_description_is_empty() {
        let dir = tempdir().unwrap();
        let reader = FeedReader::new(
            ReaderConfig::new("tech", dir.path()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        assert_eq!(reader.description(), "");
        assert_eq!(reader.name(), "tech");
        assert_eq!(reader.output_path(), dir.path().join("tech.rss"));
        assert_eq!(reader.last_update(), None);
        assert!(!reader.refreshed_since_update());
    }

    #[tokio::test]
    async fn test_read_entry_not_found() {
        let dir = tempdir().unwrap();
        let reader = FeedReader::new(
            ReaderConfig::new("tech", dir.path()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        assert!(matches!(
            reader.read_entry("2011-01-01_00-00-00/00").await,
            Err(FeedcastError::EntryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_terminate() {
        let dir = tempdir().unwrap();
        let reader = FeedReader::new(
            ReaderConfig::new("tech", dir.path()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        reader.start();
        reader.start();
        assert!(reader.is_running());
        reader.terminate();
        assert!(!reader.is_running());
    }

    #[tokio::test]
    async fn test_start_publishes_existing_entries() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let entry = Entry::new("already there", "", "", 1_300_000_000_000);
        feedcast_testkit::put_entry(store.as_ref(), &entry).await;

        let reader = FeedReader::new(ReaderConfig::new("tech", dir.path()), store).unwrap();
        reader.start();

        let mut published = String::new();
        for _ in 0..100 {
            published = std::fs::read_to_string(reader.output_path()).unwrap_or_default();
            if published.contains("<item>") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(published.contains("<title>already there</title>"));
        assert!(reader.refreshed_since_update());
        reader.terminate();
    }
}
