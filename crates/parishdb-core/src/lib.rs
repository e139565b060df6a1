//! Core types and traits for ParishDB storage backends.
//!
//! This crate provides the record model, the `StorageBackend` trait and the
//! subscriber registry, enabling pluggable storage implementations in
//! separate crates.

pub mod models;
pub mod notify;
pub mod rules;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{
    Appointment, AppointmentStatus, NewRecord, ParishKey, Record, RecordBody, RecordId, Role,
};
pub use models::kind::{KindSpec, RecordKind};
pub use notify::{Snapshot, Subscriber, SubscriberRegistry, SubscriptionId};
pub use storage::{StorageBackend, StorageError};
