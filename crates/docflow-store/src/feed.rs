use std::sync::RwLock;

use docflow_schema::{Record, Revision, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A single store-side modification, as delivered on a change feed.
///
/// `old_val`/`new_val` carry complete records: `(None, Some)` is a
/// create, `(Some, Some)` an update, `(Some, None)` a delete. The event
/// passes through the mapper layers unmodified, so consumers always have
/// the raw change message alongside any derived view.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub key: Value,
    pub old_val: Option<Record>,
    pub new_val: Option<Record>,
    pub revision: Revision,
}

impl ChangeEvent {
    pub fn is_create(&self) -> bool {
        self.old_val.is_none() && self.new_val.is_some()
    }

    pub fn is_update(&self) -> bool {
        self.old_val.is_some() && self.new_val.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.new_val.is_none()
    }
}

/// Filter for subscribing to a subset of a table's changes.
#[derive(Clone, Debug, Default)]
pub struct ChangeFilter {
    /// If set, only events for this primary key are delivered.
    pub key: Option<Value>,
}

impl ChangeFilter {
    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match &self.key {
            Some(key) => *key == event.key,
            None => true,
        }
    }
}

/// Internal subscriber: a filter paired with a broadcast sender.
struct Subscriber {
    filter: ChangeFilter,
    sender: broadcast::Sender<ChangeEvent>,
}

/// Fan-out router that delivers change events to matching subscribers.
///
/// One router lives per table. Dropping a [`ChangeFeed`] closes its
/// channel; the router prunes closed subscribers on the next routed
/// event, releasing the store-side cursor.
pub(crate) struct ChangeRouter {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ChangeRouter {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a new subscriber with the given filter.
    pub(crate) fn subscribe(&self, filter: ChangeFilter, capacity: usize) -> ChangeFeed {
        let (tx, rx) = broadcast::channel(capacity);
        self.subscribers
            .write()
            .expect("router lock poisoned")
            .push(Subscriber { filter, sender: tx });
        ChangeFeed { rx }
    }

    /// Route an event to all matching subscribers.
    pub(crate) fn route(&self, event: &ChangeEvent) {
        let mut subs = self.subscribers.write().expect("router lock poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(event) {
                // If send fails (no receivers), the subscriber is stale.
                sub.sender.send(event.clone()).is_ok()
            } else {
                // Keep non-matching subscribers unless their channel is
                // closed.
                sub.sender.receiver_count() > 0
            }
        });
        debug!(
            table = %event.table,
            subscribers = subs.len(),
            "change event routed"
        );
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("router lock poisoned")
            .len()
    }
}

/// Cursor over a table's live changes.
///
/// The feed is unbounded and cancellable: drop it to unsubscribe. A
/// consumer that falls behind the channel capacity gets a
/// [`StoreError::FeedLagged`] and can resubscribe to resynchronize.
pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Wait for the next change event. Returns `Ok(None)` once the store
    /// side has shut down and all buffered events are drained.
    pub async fn next(&mut self) -> StoreResult<Option<ChangeEvent>> {
        match self.rx.recv().await {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(StoreError::FeedLagged(n)),
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed").finish_non_exhaustive()
    }
}
