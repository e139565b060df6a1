use std::sync::Arc;

use thiserror::Error;

use crate::{
    models::{NewRecord, Record, RecordId},
    notify::{Snapshot, Subscriber, SubscriptionId},
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(RecordId),
    #[error("no parish registered at {0}")]
    UnknownParish(String),
    #[error("a parish is already registered at {0}")]
    DuplicateParish(String),
    #[error("record kind cannot change on update")]
    KindMismatch,
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Persistence contract consumed by the parish office. Implementations
/// serialize mutations and notify every subscriber with the full collection
/// after each successful one, before returning.
pub trait StorageBackend: Send + Sync {
    /// Stores a new record under a freshly assigned id.
    fn create(&self, record: NewRecord) -> Result<Record, StorageError>;
    /// Replaces the record sharing `record.id`.
    fn update(&self, record: &Record) -> Result<(), StorageError>;
    /// Applies `edit` to the stored copy of `id` while holding the write
    /// gate, then stores the result like [`StorageBackend::update`]. When
    /// `edit` returns false nothing is written and no subscriber is called,
    /// and the result is `Ok(None)`.
    fn modify(
        &self,
        id: &RecordId,
        edit: &mut dyn FnMut(&mut Record) -> bool,
    ) -> Result<Option<Record>, StorageError>;
    /// Removes by id. Absent ids are not an error.
    fn delete(&self, id: &RecordId) -> Result<(), StorageError>;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Current collection in insertion order.
    fn snapshot(&self) -> Result<Snapshot, StorageError>;

    fn get(&self, id: &RecordId) -> Result<Option<Record>, StorageError> {
        Ok(self.snapshot()?.iter().find(|r| &r.id == id).cloned())
    }
}
