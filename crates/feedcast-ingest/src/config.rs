//! Bridge configuration.

use serde::{Deserialize, Serialize};

/// Default number of most recent items kept per channel.
pub const DEFAULT_RETAINED_COUNT: usize = 5;

/// Retention policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// How many of the newest items a channel keeps; older ones are pruned
    /// and move the channel's threshold forward.
    pub retained_count: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retained_count: DEFAULT_RETAINED_COUNT,
        }
    }
}

/// One logical feed: a name, its poll sources, and where entries go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed name; also the store namespace prefix.
    pub name: String,
    /// Source URLs polled for this feed. Each becomes one channel.
    pub sources: Vec<String>,
    /// Store target, resolved by the host (e.g. a database path or URI).
    pub target: String,
}

impl FeedConfig {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            target: target.into(),
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.sources.push(url.into());
        self
    }
}

/// Configuration for the ingestion bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub retention: RetentionConfig,
    pub feeds: Vec<FeedConfig>,
}

impl BridgeConfig {
    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feeds.push(feed);
        self
    }
}
