//! Collection-level checks every backend applies before mutating, so that
//! in-memory and SQLite stores accept and reject the same writes.

use crate::{
    models::{ParishKey, Record, RecordBody, RecordId},
    storage::StorageError,
};

fn parish_exists(records: &[Record], key: &ParishKey, except: Option<&Record>) -> bool {
    records.iter().any(|r| {
        r.is_parish() && r.parish_key() == key && except.map_or(true, |e| e.id != r.id)
    })
}

/// A parish key must be new; any other record must point at an existing parish.
pub fn check_create(records: &[Record], body: &RecordBody) -> Result<(), StorageError> {
    let key = body.parish_key();
    match body {
        RecordBody::Parish(_) if parish_exists(records, key, None) => {
            Err(StorageError::DuplicateParish(key.to_string()))
        }
        RecordBody::Parish(_) => Ok(()),
        _ if parish_exists(records, key, None) => Ok(()),
        _ => Err(StorageError::UnknownParish(key.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Position of the replaced record.
    pub index: usize,
    /// Old and new key when a parish moves; its children follow it.
    pub rename: Option<(ParishKey, ParishKey)>,
}

pub fn plan_update(records: &[Record], record: &Record) -> Result<UpdatePlan, StorageError> {
    let index = records
        .iter()
        .position(|r| r.id == record.id)
        .ok_or_else(|| StorageError::NotFound(record.id.clone()))?;
    let current = &records[index];

    if current.kind() != record.kind() {
        return Err(StorageError::KindMismatch);
    }

    let old_key = current.parish_key();
    let new_key = record.parish_key();
    if old_key == new_key {
        return Ok(UpdatePlan { index, rename: None });
    }

    if record.is_parish() {
        if parish_exists(records, new_key, Some(current)) {
            return Err(StorageError::DuplicateParish(new_key.to_string()));
        }
        return Ok(UpdatePlan {
            index,
            rename: Some((old_key.clone(), new_key.clone())),
        });
    }

    if !parish_exists(records, new_key, None) {
        return Err(StorageError::UnknownParish(new_key.to_string()));
    }
    Ok(UpdatePlan { index, rename: None })
}

/// Runs `edit` against the stored copy of `id` and plans the write of the
/// result. `Ok(None)` when `edit` declines.
pub fn plan_modify(
    records: &[Record],
    id: &RecordId,
    edit: &mut dyn FnMut(&mut Record) -> bool,
) -> Result<Option<(UpdatePlan, Record)>, StorageError> {
    let mut next = records
        .iter()
        .find(|r| &r.id == id)
        .cloned()
        .ok_or_else(|| StorageError::NotFound(id.clone()))?;
    if !edit(&mut next) {
        return Ok(None);
    }
    // an edit may not retarget the id
    next.id = id.clone();
    let plan = plan_update(records, &next)?;
    Ok(Some((plan, next)))
}

/// Positions of the non-parish records scoped to `key`.
pub fn children_of(records: &[Record], key: &ParishKey) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_parish() && r.parish_key() == key)
        .map(|(i, _)| i)
        .collect()
}

/// Applies a planned update in place and returns every touched position.
pub fn apply_update(records: &mut [Record], plan: &UpdatePlan, record: &Record) -> Vec<usize> {
    let mut touched = vec![plan.index];
    if let Some((old, new)) = &plan.rename {
        for i in children_of(records, old) {
            *records[i].body.parish_key_mut() = new.clone();
            touched.push(i);
        }
    }
    records[plan.index] = record.clone();
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Parish;

    fn parish(id: &str, barangay: &str) -> Record {
        Record::new(
            RecordId::from(id),
            RecordBody::Parish(Parish::new(ParishKey::new(
                "St. Jude",
                "NCR",
                "Metro Manila",
                "Manila",
                barangay,
            ))),
        )
    }

    #[test]
    fn duplicate_parish_is_rejected() {
        let records = vec![parish("p1", "Quiapo")];
        let err = check_create(&records, &parish("x", "Quiapo").body).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateParish(_)));
        assert!(check_create(&records, &parish("x", "Sampaloc").body).is_ok());
    }

    #[test]
    fn parish_move_is_planned_as_rename() {
        let records = vec![parish("p1", "Quiapo")];
        let moved = parish("p1", "Sampaloc");
        let plan = plan_update(&records, &moved).unwrap();
        let (old, new) = plan.rename.unwrap();
        assert_eq!(old.barangay, "Quiapo");
        assert_eq!(new.barangay, "Sampaloc");
    }

    #[test]
    fn parish_cannot_move_onto_another() {
        let records = vec![parish("p1", "Quiapo"), parish("p2", "Sampaloc")];
        let err = plan_update(&records, &parish("p1", "Sampaloc")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateParish(_)));
    }

    #[test]
    fn declined_edit_plans_nothing() {
        let records = vec![parish("p1", "Quiapo")];
        let planned = plan_modify(&records, &RecordId::from("p1"), &mut |_: &mut Record| false).unwrap();
        assert!(planned.is_none());
    }

    #[test]
    fn edit_sees_stored_copy() {
        let records = vec![parish("p1", "Quiapo")];
        let (plan, next) = plan_modify(&records, &RecordId::from("p1"), &mut |r: &mut Record| {
            assert_eq!(r.parish_key().barangay, "Quiapo");
            r.body.parish_key_mut().barangay = "Sampaloc".to_string();
            true
        })
        .unwrap()
        .unwrap();
        assert_eq!(plan.index, 0);
        assert!(plan.rename.is_some());
        assert_eq!(next.parish_key().barangay, "Sampaloc");
    }

    #[test]
    fn missing_id_is_not_found() {
        let records = vec![parish("p1", "Quiapo")];
        let err = plan_update(&records, &parish("nope", "Quiapo")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
