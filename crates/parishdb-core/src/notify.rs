use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

use crate::models::Record;

/// Full, immutable view of the collection after a mutation. Every observer
/// of one mutation receives the same `Arc`.
pub type Snapshot = Arc<[Record]>;

pub trait Subscriber: Send + Sync {
    fn on_data_changed(&self, snapshot: &Snapshot);
}

impl<F> Subscriber for F
where
    F: Fn(&Snapshot) + Send + Sync,
{
    fn on_data_changed(&self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered observers of a store. Backends call [`SubscriberRegistry::notify`]
/// once per successful mutation, while still holding their write gate.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn Subscriber>)>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, snapshot: &Snapshot) {
        // Callbacks run outside the registry lock so they may subscribe or
        // unsubscribe without deadlocking.
        let targets: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, s)| s.clone())
            .collect();

        for subscriber in targets {
            subscriber.on_data_changed(snapshot);
        }
    }
}
