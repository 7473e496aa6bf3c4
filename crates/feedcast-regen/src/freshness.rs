//! Freshness tracking: when the key set last changed, and whether the
//! published document reflects it.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Point-in-time copy of the freshness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Freshness {
    /// When the last mutation (or forced update) was seen.
    pub last_update: Option<DateTime<Utc>>,
    /// Whether a rebuild has succeeded since `last_update`.
    pub refreshed_since_update: bool,
}

/// Ticket for one rebuild; only a ticket of the newest update may mark
/// success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTicket {
    generation: u64,
    last_update: Option<DateTime<Utc>>,
}

impl UpdateTicket {
    /// The update this rebuild answers to.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

#[derive(Debug, Default)]
struct State {
    freshness: Freshness,
    generation: u64,
}

/// Shared freshness state of one engine.
#[derive(Debug, Default)]
pub struct FreshnessTracker {
    state: Mutex<State>,
}

impl FreshnessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update at `at` and clear the refreshed flag.
    pub fn mark_updated(&self, at: DateTime<Utc>) -> UpdateTicket {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.freshness = Freshness {
            last_update: Some(at),
            refreshed_since_update: false,
        };
        UpdateTicket {
            generation: state.generation,
            last_update: Some(at),
        }
    }

    /// Ticket for a rebuild that is not caused by a new update.
    pub fn current(&self) -> UpdateTicket {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        UpdateTicket {
            generation: state.generation,
            last_update: state.freshness.last_update,
        }
    }

    /// Mark the rebuild started with `ticket` as published.
    ///
    /// Ignored if a newer update arrived in the meantime; that update's own
    /// rebuild decides the flag. Returns whether the flag was set.
    pub fn mark_refreshed(&self, ticket: UpdateTicket) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != ticket.generation {
            return false;
        }
        state.freshness.refreshed_since_update = true;
        true
    }

    pub fn snapshot(&self) -> Freshness {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .freshness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_initial_state() {
        let tracker = FreshnessTracker::new();
        assert_eq!(tracker.snapshot(), Freshness::default());
    }

    #[test]
    fn test_update_then_refresh() {
        let tracker = FreshnessTracker::new();
        let ticket = tracker.mark_updated(at(10));
        assert!(!tracker.snapshot().refreshed_since_update);
        assert!(tracker.mark_refreshed(ticket));

        let snap = tracker.snapshot();
        assert_eq!(snap.last_update, Some(at(10)));
        assert!(snap.refreshed_since_update);
    }

    #[test]
    fn test_stale_ticket_cannot_refresh() {
        let tracker = FreshnessTracker::new();
        let first = tracker.mark_updated(at(10));
        let second = tracker.mark_updated(at(11));

        assert!(!tracker.mark_refreshed(first));
        assert!(!tracker.snapshot().refreshed_since_update);
        assert!(tracker.mark_refreshed(second));
        assert_eq!(tracker.snapshot().last_update, second.last_update());
    }

    #[test]
    fn test_current_ticket_does_not_move_last_update() {
        let tracker = FreshnessTracker::new();
        let forced = tracker.current();
        assert_eq!(forced.last_update(), None);
        assert!(tracker.mark_refreshed(forced));
        assert_eq!(tracker.snapshot().last_update, None);

        let ticket = tracker.mark_updated(at(20));
        let forced = tracker.current();
        assert_eq!(forced.last_update(), ticket.last_update());
        assert!(tracker.mark_refreshed(forced));
    }
}
