//! Proptest generators for property-based testing.

use proptest::prelude::*;

use feedcast_core::{ChannelId, Entry};

/// Latest timestamp whose key still has a four-digit year (9999-12-31).
pub const MAX_KEYED_TIMESTAMP: i64 = 253_402_300_799_000;

/// Generate a timestamp that can be keyed and rendered.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=MAX_KEYED_TIMESTAMP
}

/// Generate a non-blank title.
pub fn title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .,:!?&<>'\"-]{0,63}".prop_map(String::from)
}

/// Generate a link.
pub fn link() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,12}".prop_map(|host| format!("http://{}.example/item", host)),
    ]
}

/// Generate a channel ID.
pub fn channel_id() -> impl Strategy<Value = ChannelId> {
    any::<[u8; 32]>().prop_map(ChannelId::from_bytes)
}

/// Parameters for generating an entry.
#[derive(Debug, Clone)]
pub struct EntryParams {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published_at: i64,
}

impl Arbitrary for EntryParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (title(), ".{0,128}", link(), timestamp())
            .prop_map(|(title, description, link, published_at)| EntryParams {
                title,
                description,
                link,
                published_at,
            })
            .boxed()
    }
}

/// Build an entry from parameters.
pub fn entry_from_params(params: &EntryParams) -> Entry {
    Entry::new(
        params.title.clone(),
        params.description.clone(),
        params.link.clone(),
        params.published_at,
    )
}

/// Generate a batch of entries with distinct timestamps.
pub fn distinct_entries(range: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Entry>> {
    prop::collection::btree_set(timestamp(), range).prop_flat_map(|stamps| {
        let stamps: Vec<i64> = stamps.into_iter().collect();
        let n = stamps.len();
        prop::collection::vec(title(), n).prop_map(move |titles| {
            titles
                .into_iter()
                .zip(stamps.iter())
                .map(|(title, ts)| Entry::new(title, "", "", *ts))
                .collect()
        })
    })
}
