//! In-memory storage backend for ParishDB.

use std::sync::{Arc, Mutex, RwLock};

use parishdb_core::{
    rules, NewRecord, Record, RecordId, Snapshot, StorageBackend, StorageError, Subscriber,
    SubscriberRegistry, SubscriptionId,
};

pub struct InMemoryStorage {
    records: RwLock<Vec<Record>>,
    // Held across apply + notify so mutations never interleave.
    write_gate: Mutex<()>,
    subscribers: SubscriberRegistry,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            write_gate: Mutex::new(()),
            subscribers: SubscriberRegistry::new(),
        }
    }

    fn commit<T>(
        &self,
        mutation: impl FnOnce(&mut Vec<Record>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.commit_when(mutation, |_| true)
    }

    /// Like `commit`, but subscribers only hear about it when `changed`
    /// holds for the mutation's result.
    fn commit_when<T>(
        &self,
        mutation: impl FnOnce(&mut Vec<Record>) -> Result<T, StorageError>,
        changed: impl FnOnce(&T) -> bool,
    ) -> Result<T, StorageError> {
        let _gate = self.write_gate.lock().map_err(|_| StorageError::LockPoisoned)?;

        let (value, snapshot) = {
            let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
            let value = mutation(&mut records)?;
            let snapshot = changed(&value).then(|| Snapshot::from(records.as_slice()));
            (value, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.subscribers.notify(&snapshot);
        }
        Ok(value)
    }
}

impl StorageBackend for InMemoryStorage {
    fn create(&self, record: NewRecord) -> Result<Record, StorageError> {
        self.commit(|records| {
            rules::check_create(records, &record)?;
            let stored = Record::new(RecordId::generate(), record);
            tracing::debug!(id = %stored.id, kind = %stored.kind(), "Record created");
            records.push(stored.clone());
            Ok(stored)
        })
    }

    fn update(&self, record: &Record) -> Result<(), StorageError> {
        self.commit(|records| {
            let plan = rules::plan_update(records, record)?;
            let touched = rules::apply_update(records, &plan, record);
            tracing::debug!(id = %record.id, kind = %record.kind(), touched = touched.len(), "Record updated");
            Ok(())
        })
    }

    fn modify(
        &self,
        id: &RecordId,
        edit: &mut dyn FnMut(&mut Record) -> bool,
    ) -> Result<Option<Record>, StorageError> {
        self.commit_when(
            |records| {
                let Some((plan, next)) = rules::plan_modify(records, id, edit)? else {
                    tracing::debug!(%id, "Edit declined");
                    return Ok(None);
                };
                let touched = rules::apply_update(records, &plan, &next);
                tracing::debug!(%id, kind = %next.kind(), touched = touched.len(), "Record modified");
                Ok(Some(next))
            },
            Option::is_some,
        )
    }

    fn delete(&self, id: &RecordId) -> Result<(), StorageError> {
        self.commit(|records| {
            let before = records.len();
            records.retain(|r| &r.id != id);
            tracing::debug!(%id, removed = before - records.len(), "Record deleted");
            Ok(())
        })
    }

    fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        self.subscribers.subscribe(subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn snapshot(&self) -> Result<Snapshot, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(Snapshot::from(records.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use parishdb_core::{
        models::{Donation, DonationPurpose, Parish},
        ParishKey, RecordBody,
    };
    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::*;

    fn key(barangay: &str) -> ParishKey {
        ParishKey::new("San Roque Parish", "Region VII", "Cebu", "Cebu City", barangay)
    }

    fn donation(parish: ParishKey) -> RecordBody {
        RecordBody::Donation(Donation {
            parish,
            donor_name: "Lito Ramos".into(),
            donation_date: date!(2024 - 03 - 10),
            donation_amount: dec!(250.00),
            donation_purpose: DonationPurpose::Charity,
            added_by: "Staff".into(),
        })
    }

    fn recorder(storage: &InMemoryStorage) -> Arc<Mutex<Vec<Snapshot>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        storage.subscribe(Arc::new(move |s: &Snapshot| sink.lock().unwrap().push(s.clone())));
        seen
    }

    #[test]
    fn test_create_assigns_unique_ids_and_broadcasts() {
        let storage = InMemoryStorage::new();
        let seen = recorder(&storage);

        let parish = storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let gift = storage.create(donation(key("Lahug"))).unwrap();

        assert!(!parish.id.as_str().is_empty());
        assert_ne!(parish.id, gift.id);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].iter().any(|r| r.id == gift.id));
    }

    #[test]
    fn test_create_requires_existing_parish() {
        let storage = InMemoryStorage::new();
        let seen = recorder(&storage);

        let err = storage.create(donation(key("Nowhere"))).unwrap_err();
        assert!(matches!(err, StorageError::UnknownParish(_)));
        assert!(seen.lock().unwrap().is_empty());
        assert!(storage.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_record_does_not_notify() {
        let storage = InMemoryStorage::new();
        storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let seen = recorder(&storage);

        let ghost = Record::new(RecordId::from("ghost"), donation(key("Lahug")));
        let err = storage.update(&ghost).unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let storage = InMemoryStorage::new();
        storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let gift = storage.create(donation(key("Lahug"))).unwrap();
        let seen = recorder(&storage);

        storage.delete(&gift.id).unwrap();
        let after_first = storage.snapshot().unwrap();
        storage.delete(&gift.id).unwrap();

        assert_eq!(after_first.len(), 1);
        assert_eq!(storage.snapshot().unwrap().as_ref(), after_first.as_ref());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_parish_move_carries_children_in_one_notification() {
        let storage = InMemoryStorage::new();
        let mut parish = storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let gift = storage.create(donation(key("Lahug"))).unwrap();
        let seen = recorder(&storage);

        *parish.body.parish_key_mut() = key("Apas");
        storage.update(&parish).unwrap();

        let moved = storage.get(&gift.id).unwrap().unwrap();
        assert_eq!(moved.parish_key(), &key("Apas"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_declined_modify_keeps_data_and_skips_notify() {
        let storage = InMemoryStorage::new();
        let parish = storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let seen = recorder(&storage);

        let result = storage.modify(&parish.id, &mut |_: &mut Record| false).unwrap();

        assert!(result.is_none());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(storage.get(&parish.id).unwrap(), Some(parish));
    }

    #[test]
    fn test_modify_edits_the_stored_copy() {
        let storage = InMemoryStorage::new();
        storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();
        let gift = storage.create(donation(key("Lahug"))).unwrap();
        let seen = recorder(&storage);

        let stored = storage
            .modify(&gift.id, &mut |r: &mut Record| {
                if let RecordBody::Donation(d) = &mut r.body {
                    d.donor_name = "Lito R. Ramos".to_string();
                }
                true
            })
            .unwrap()
            .unwrap();

        assert_eq!(storage.get(&gift.id).unwrap(), Some(stored));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(matches!(
            storage.modify(&RecordId::from("ghost"), &mut |_: &mut Record| true),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_cannot_change_kind() {
        let storage = InMemoryStorage::new();
        let parish = storage.create(RecordBody::Parish(Parish::new(key("Lahug")))).unwrap();

        let swapped = Record::new(parish.id.clone(), donation(key("Lahug")));
        let err = storage.update(&swapped).unwrap_err();
        assert!(matches!(err, StorageError::KindMismatch));
    }
}
