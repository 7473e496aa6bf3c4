//! A channel's full known item list, as held by the poll adapter.
//!
//! The retention policy reads the whole list and removes pruned items from
//! it; the poll adapter owns the list and adds to it as items are found.

use std::sync::{Mutex, PoisonError};

use feedcast_core::Entry;

/// The per-channel item list owned by the poll adapter.
pub trait ItemList: Send + Sync {
    /// Snapshot of every item currently known for the channel.
    fn items(&self) -> Vec<Entry>;

    /// Record a newly found item.
    fn add(&self, entry: Entry);

    /// Drop the given items from the list.
    fn remove(&self, entries: &[Entry]);
}

/// In-process item list.
#[derive(Debug, Default)]
pub struct MemoryItemList {
    items: Mutex<Vec<Entry>>,
}

impl MemoryItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemList for MemoryItemList {
    fn items(&self) -> Vec<Entry> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add(&self, entry: Entry) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if !items.contains(&entry) {
            items.push(entry);
        }
    }

    fn remove(&self, entries: &[Entry]) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|item| !entries.contains(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dedups_and_remove() {
        let list = MemoryItemList::new();
        let a = Entry::new("a", "", "", 1);
        let b = Entry::new("b", "", "", 2);
        list.add(a.clone());
        list.add(a.clone());
        list.add(b.clone());
        assert_eq!(list.len(), 2);

        list.remove(&[a]);
        assert_eq!(list.items(), vec![b]);
    }
}
