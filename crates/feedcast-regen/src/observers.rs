//! Observer registration for regeneration events.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::engine::RegenerationEngine;

/// Callback invoked after every rebuild attempt, successful or not.
///
/// Receives the engine's last update time and the engine itself.
pub type Observer =
    dyn Fn(Option<DateTime<Utc>>, &RegenerationEngine) -> anyhow::Result<()> + Send + Sync;

/// Identity of a registered observer, returned by
/// [`RegenerationEngine::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Set of observers keyed by identity. Invocation order is unspecified.
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: Mutex<Vec<(ObserverId, Arc<Observer>)>>,
    next_id: AtomicU64,
}

impl ObserverSet {
    pub(crate) fn add(&self, observer: Arc<Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Invoke every observer. An error or panic from one does not stop the
    /// rest.
    pub(crate) fn notify(&self, last_update: Option<DateTime<Utc>>, engine: &RegenerationEngine) {
        // Snapshot so observers may add or remove observers while running.
        let snapshot: Vec<_> = self.lock().clone();
        for (id, observer) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| observer(last_update, engine))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(observer = ?id, error = %e, "observer failed"),
                Err(payload) => {
                    warn!(observer = ?id, panic = panic_message(&*payload), "observer panicked")
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, Arc<Observer>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
