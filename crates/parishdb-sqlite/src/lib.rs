//! SQLite storage backend for ParishDB. Records are kept as JSON documents
//! with the parish key broken out into indexed columns.

use std::sync::{Arc, Mutex};

use parishdb_core::{
    rules, NewRecord, Record, RecordId, Snapshot, StorageBackend, StorageError, Subscriber,
    SubscriberRegistry, SubscriptionId,
};
use rusqlite::{params, Connection, Transaction};

pub struct SqliteStorage {
    conn: Mutex<Connection>,
    write_gate: Mutex<()>,
    subscribers: SubscriberRegistry,
}

fn sql_err(e: rusqlite::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

impl SqliteStorage {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(sql_err)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(sql_err)?;

        let storage = Self {
            conn: Mutex::new(conn),
            write_gate: Mutex::new(()),
            subscribers: SubscriberRegistry::new(),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                record_type TEXT NOT NULL,
                parish_name TEXT NOT NULL,
                parish_region TEXT NOT NULL,
                parish_province TEXT NOT NULL,
                parish_municipality TEXT NOT NULL,
                parish_barangay TEXT NOT NULL,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_parish
                ON records(parish_name, parish_region, parish_province, parish_municipality, parish_barangay);
            ",
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn load_all(conn: &Connection) -> Result<Vec<Record>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT body FROM records ORDER BY seq")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql_err)?;

        let mut records = Vec::new();
        for row in rows {
            let body = row.map_err(sql_err)?;
            records.push(serde_json::from_str(&body)?);
        }
        Ok(records)
    }

    fn insert_row(tx: &Transaction, record: &Record) -> Result<(), StorageError> {
        let key = record.parish_key();
        tx.execute(
            "INSERT INTO records (id, record_type, parish_name, parish_region, parish_province, parish_municipality, parish_barangay, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.as_str(),
                record.kind().as_str(),
                key.name,
                key.region,
                key.province,
                key.municipality,
                key.barangay,
                serde_json::to_string(record)?,
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn rewrite_row(tx: &Transaction, record: &Record) -> Result<(), StorageError> {
        let key = record.parish_key();
        tx.execute(
            "UPDATE records SET parish_name = ?2, parish_region = ?3, parish_province = ?4,
                 parish_municipality = ?5, parish_barangay = ?6, body = ?7
             WHERE id = ?1",
            params![
                record.id.as_str(),
                key.name,
                key.region,
                key.province,
                key.municipality,
                key.barangay,
                serde_json::to_string(record)?,
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    /// Runs one mutation inside a transaction over the loaded collection.
    /// The mutation keeps `records` in step with the rows it writes, so the
    /// committed collection is the snapshot subscribers receive. The write
    /// gate stays held until every subscriber has been called.
    fn commit<T>(
        &self,
        mutation: impl FnOnce(&Transaction, &mut Vec<Record>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.commit_when(mutation, |_| true)
    }

    /// Like `commit`, but subscribers only hear about it when `changed`
    /// holds for the mutation's result.
    fn commit_when<T>(
        &self,
        mutation: impl FnOnce(&Transaction, &mut Vec<Record>) -> Result<T, StorageError>,
        changed: impl FnOnce(&T) -> bool,
    ) -> Result<T, StorageError> {
        let _gate = self.write_gate.lock().map_err(|_| StorageError::LockPoisoned)?;

        let (value, snapshot) = {
            let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            let tx = conn.transaction().map_err(sql_err)?;
            tracing::debug!("SQLite transaction started");
            let mut records = Self::load_all(&tx)?;
            let value = mutation(&tx, &mut records)?;
            tx.commit().map_err(sql_err)?;
            tracing::debug!("SQLite transaction committed");
            let snapshot = changed(&value).then(|| Snapshot::from(records));
            (value, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.subscribers.notify(&snapshot);
        }
        Ok(value)
    }

    fn write_update(
        tx: &Transaction,
        records: &mut [Record],
        plan: &rules::UpdatePlan,
        record: &Record,
    ) -> Result<usize, StorageError> {
        let touched = rules::apply_update(records, plan, record);
        for i in &touched {
            Self::rewrite_row(tx, &records[*i])?;
        }
        Ok(touched.len())
    }
}

impl StorageBackend for SqliteStorage {
    fn create(&self, record: NewRecord) -> Result<Record, StorageError> {
        self.commit(|tx, records| {
            rules::check_create(records, &record)?;
            let stored = Record::new(RecordId::generate(), record);
            Self::insert_row(tx, &stored)?;
            records.push(stored.clone());
            tracing::debug!(id = %stored.id, kind = %stored.kind(), "Record created");
            Ok(stored)
        })
    }

    fn update(&self, record: &Record) -> Result<(), StorageError> {
        self.commit(|tx, records| {
            let plan = rules::plan_update(records, record)?;
            let touched = Self::write_update(tx, records, &plan, record)?;
            tracing::debug!(id = %record.id, kind = %record.kind(), touched, "Record updated");
            Ok(())
        })
    }

    fn modify(
        &self,
        id: &RecordId,
        edit: &mut dyn FnMut(&mut Record) -> bool,
    ) -> Result<Option<Record>, StorageError> {
        self.commit_when(
            |tx, records| {
                let Some((plan, next)) = rules::plan_modify(records, id, edit)? else {
                    tracing::debug!(%id, "Edit declined");
                    return Ok(None);
                };
                let touched = Self::write_update(tx, records, &plan, &next)?;
                tracing::debug!(%id, kind = %next.kind(), touched, "Record modified");
                Ok(Some(next))
            },
            Option::is_some,
        )
    }

    fn delete(&self, id: &RecordId) -> Result<(), StorageError> {
        self.commit(|tx, records| {
            let removed = tx
                .execute("DELETE FROM records WHERE id = ?1", params![id.as_str()])
                .map_err(sql_err)?;
            records.retain(|r| &r.id != id);
            tracing::debug!(%id, removed, "Record deleted");
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
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(Snapshot::from(Self::load_all(&conn)?))
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let body: Result<String, _> = conn.query_row(
            "SELECT body FROM records WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        );
        match body {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(sql_err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parishdb_core::{
        models::{Appointment, Baptism, Parish},
        AppointmentStatus, ParishKey, RecordBody,
    };
    use time::macros::date;

    use super::*;

    fn key(barangay: &str) -> ParishKey {
        ParishKey::new("Our Lady of Lourdes", "NCR", "Metro Manila", "Quezon City", barangay)
    }

    fn baptism(parish: ParishKey) -> RecordBody {
        RecordBody::Baptism(Baptism {
            parish,
            child_name: "Miguel Cruz".into(),
            father_name: "Jose Cruz".into(),
            mother_name: "Mary Santos".into(),
            birthday: date!(2024 - 01 - 05),
            birthplace: "Quezon City".into(),
            scheduled_date: date!(2024 - 06 - 01),
            contact_number: "09171234567".into(),
            email: None,
            address: "12 Retiro St".into(),
            officiating_priest: None,
            appointment: Appointment::new(AppointmentStatus::Pending, "Visitor"),
        })
    }

    #[test]
    fn test_sqlite_round_trips_records_in_insertion_order() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let parish = storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let child = storage.create(baptism(key("Sta. Mesa Heights"))).unwrap();

        let snapshot = storage.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], parish);
        assert_eq!(snapshot[1], child);
        assert_eq!(storage.get(&child.id).unwrap(), Some(child));
    }

    #[test]
    fn test_sqlite_failed_update_leaves_data_and_skips_notify() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        storage.subscribe(Arc::new(move |_: &Snapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let ghost = Record::new(RecordId::from("ghost"), baptism(key("Sta. Mesa Heights")));
        assert!(matches!(storage.update(&ghost), Err(StorageError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(storage.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_parish_move_rewrites_children() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let mut parish = storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let child = storage.create(baptism(key("Sta. Mesa Heights"))).unwrap();

        *parish.body.parish_key_mut() = key("Lourdes");
        storage.update(&parish).unwrap();

        let child = storage.get(&child.id).unwrap().unwrap();
        assert_eq!(child.parish_key().barangay, "Lourdes");
    }

    #[test]
    fn test_sqlite_modify_reads_inside_the_transaction() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let child = storage.create(baptism(key("Sta. Mesa Heights"))).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        storage.subscribe(Arc::new(move |_: &Snapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let approve = |r: &mut Record| match r.body.appointment_mut() {
            Some(a) if a.status == AppointmentStatus::Pending => {
                a.status = AppointmentStatus::Approved;
                true
            }
            _ => false,
        };
        assert!(storage.modify(&child.id, &mut approve.clone()).unwrap().is_some());
        assert!(storage.modify(&child.id, &mut approve.clone()).unwrap().is_none());

        let stored = storage.get(&child.id).unwrap().unwrap();
        assert_eq!(stored.appointment().unwrap().status, AppointmentStatus::Approved);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sqlite_snapshot_matches_reload() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::<Snapshot>::new()));
        let sink = seen.clone();
        storage.subscribe(Arc::new(move |s: &Snapshot| sink.lock().unwrap().push(s.clone())));

        storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let child = storage.create(baptism(key("Sta. Mesa Heights"))).unwrap();
        storage.delete(&child.id).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[2].as_ref(), storage.snapshot().unwrap().as_ref());
    }

    #[test]
    fn test_sqlite_delete_twice_is_ok() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage.create(RecordBody::Parish(Parish::new(key("Sta. Mesa Heights")))).unwrap();
        let child = storage.create(baptism(key("Sta. Mesa Heights"))).unwrap();

        storage.delete(&child.id).unwrap();
        storage.delete(&child.id).unwrap();
        assert_eq!(storage.snapshot().unwrap().len(), 1);
    }
}
