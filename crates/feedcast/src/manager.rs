//! Feed manager: the set of feeds this node publishes, keyed by name.
//!
//! Every feed reads its own `<name>/` namespace of one shared store and
//! publishes `<name>.<extension>` into one output directory.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use feedcast_store::StoreView;
use tracing::{debug, info};

use crate::error::{FeedcastError, Result};
use crate::reader::{FeedReader, ReaderConfig};

/// Owns the running [`FeedReader`]s of a node.
pub struct FeedManager {
    shared: Arc<dyn StoreView>,
    output_dir: PathBuf,
    feeds: RwLock<BTreeMap<String, Arc<FeedReader>>>,
}

impl FeedManager {
    pub fn new(shared: Arc<dyn StoreView>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared,
            output_dir: output_dir.into(),
            feeds: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Reader configuration for `name`, publishing into this manager's
    /// output directory.
    pub fn feed_config(&self, name: impl Into<String>) -> ReaderConfig {
        ReaderConfig::new(name, self.output_dir.clone())
    }

    /// Configure, start, and publish a new feed.
    ///
    /// The reader publishes the feed's current entries right away and then
    /// follows store mutations. Must be called from within a tokio runtime.
    pub fn add_feed(&self, config: ReaderConfig) -> Result<Arc<FeedReader>> {
        let mut feeds = self.write();
        if feeds.contains_key(&config.name) {
            return Err(FeedcastError::DuplicateFeed(config.name));
        }

        info!(feed = %config.name, "configuring feed");
        let reader = Arc::new(FeedReader::namespaced(config, self.shared.clone())?);
        reader.start();
        feeds.insert(reader.name().to_string(), reader.clone());
        Ok(reader)
    }

    /// Stop a feed and delete its published document.
    ///
    /// Returns `false` if no feed with that name is configured. Entries in
    /// the shared store are left alone.
    pub fn remove_feed(&self, name: &str) -> Result<bool> {
        let Some(reader) = self.write().remove(name) else {
            return Ok(false);
        };

        reader.terminate();
        let path = reader.output_path();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(feed = %name, path = %path.display(), "output removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(feed = %name, "feed removed");
        Ok(true)
    }

    /// Names of every configured feed, sorted.
    pub fn configured_feeds(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn reader(&self, name: &str) -> Option<Arc<FeedReader>> {
        self.read().get(name).cloned()
    }

    /// Where the feed's document is published.
    pub fn output_path(&self, name: &str) -> Option<PathBuf> {
        self.read().get(name).map(|reader| reader.output_path())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<FeedReader>>> {
        self.feeds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<FeedReader>>> {
        self.feeds.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        for reader in self.write().values() {
            reader.terminate();
        }
    }
}
