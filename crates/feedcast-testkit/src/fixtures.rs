//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;
use feedcast_core::{encode_entry, ChannelId, Entry};
use feedcast_store::{MemoryStore, PutResult, StoreView};

/// 2011-03-14T09:26:53Z, a fixed base for timestamp series.
pub const BASE_TIMESTAMP: i64 = 1_300_094_813_000;

/// One feed with a shared in-memory store.
pub struct FeedFixture {
    pub feed_name: String,
    pub source_url: String,
    pub store: Arc<MemoryStore>,
}

impl FeedFixture {
    pub fn new(feed_name: &str) -> Self {
        Self {
            feed_name: feed_name.to_string(),
            source_url: format!("http://{}.example/rss", feed_name),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId::derive(&self.feed_name, &self.source_url)
    }

    /// `count` entries one minute apart starting at [`BASE_TIMESTAMP`],
    /// oldest first, titled `<feed> #1`, `<feed> #2`, ...
    pub fn series(&self, count: usize) -> Vec<Entry> {
        (0..count)
            .map(|i| self.entry(&format!("{} #{}", self.feed_name, i + 1), minutes(i as i64)))
            .collect()
    }

    pub fn entry(&self, title: &str, published_at: i64) -> Entry {
        Entry::new(
            title,
            format!("{} item", self.feed_name),
            format!("{}/{}", self.source_url, published_at),
            published_at,
        )
    }

    /// Write entries straight into the store, as a local upload would.
    pub async fn seed(&self, entries: &[Entry]) -> Vec<PutResult> {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            results.push(put_entry(self.store.as_ref(), entry).await);
        }
        results
    }
}

/// `BASE_TIMESTAMP + n minutes`.
pub fn minutes(n: i64) -> i64 {
    BASE_TIMESTAMP + n * 60_000
}

/// Encode and put one entry under its derived key.
///
/// Panics on failure; fixtures are for tests only.
pub async fn put_entry<S: StoreView + ?Sized>(store: &S, entry: &Entry) -> PutResult {
    let key = entry.key().expect("fixture entry must be keyable");
    let blob = encode_entry(entry).expect("fixture entry must encode");
    store
        .put(key.as_str(), Bytes::from(blob))
        .await
        .expect("fixture put failed")
}

/// Create fixtures for several feeds sharing nothing.
pub fn multi_feed_fixtures(names: &[&str]) -> Vec<FeedFixture> {
    names.iter().map(|name| FeedFixture::new(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_ascending() {
        let fixture = FeedFixture::new("tech");
        let series = fixture.series(3);
        assert_eq!(series[0].title, "tech #1");
        assert!(series[0].published_at < series[2].published_at);
        assert_eq!(series[1].published_at, minutes(1));
    }

    #[tokio::test]
    async fn test_seed() {
        let fixture = FeedFixture::new("tech");
        let results = fixture.seed(&fixture.series(2)).await;
        assert_eq!(results, vec![PutResult::Inserted, PutResult::Inserted]);
        assert_eq!(fixture.store.len(), 2);
    }

    #[test]
    fn test_multi_feed() {
        let fixtures = multi_feed_fixtures(&["a", "b"]);
        assert_ne!(fixtures[0].channel(), fixtures[1].channel());
    }
}
