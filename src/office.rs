use std::{collections::BTreeMap, sync::Arc};

use parishdb_core::{
    models::{records::{DEFAULT_PRIEST_CODE, DEFAULT_STAFF_CODE}, Parish},
    Appointment, ParishKey, Record, RecordBody, RecordId, RecordKind, Role, StorageBackend,
    StorageError, Subscriber, SubscriptionId,
};
use rust_decimal::Decimal;
use thiserror::Error;
use time::Date;

use crate::{
    access::{self, AccessError, Session},
    aggregate::{self, ParishStats},
    calendar,
    lifecycle::{self, Decision, LifecycleError},
    scope, search,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Lifecycle(LifecycleError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => ServiceError::NotFound(format!("record {}", id)),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Storage(s) => s.into(),
            other => ServiceError::Lifecycle(other),
        }
    }
}

/// Entry point for every parish-office operation. Holds the store it was
/// built with and takes the caller's session explicitly, so access is
/// checked on each call against current store contents.
pub struct ParishOffice {
    storage: Arc<dyn StorageBackend>,
}

impl ParishOffice {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Registers `subscriber` and seeds `seed` parishes into an empty directory.
    pub fn init(
        &self,
        subscriber: Arc<dyn Subscriber>,
        seed: &[ParishKey],
    ) -> Result<SubscriptionId, ServiceError> {
        let subscription = self.storage.subscribe(subscriber);
        if scope::parishes(&self.storage.snapshot()?).is_empty() {
            for key in seed {
                self.add_parish(key.clone())?;
            }
            tracing::info!(count = seed.len(), "Seeded parish directory");
        }
        Ok(subscription)
    }

    pub fn parishes(&self) -> Result<Vec<Record>, ServiceError> {
        let snapshot = self.storage.snapshot()?;
        Ok(scope::parishes(&snapshot).into_iter().cloned().collect())
    }

    pub fn search_parishes(&self, query: &str) -> Result<Vec<Record>, ServiceError> {
        let snapshot = self.storage.snapshot()?;
        Ok(scope::search_parishes(&snapshot, query).into_iter().cloned().collect())
    }

    pub fn parish(&self, id: &RecordId) -> Result<Record, ServiceError> {
        match self.storage.get(id)? {
            Some(record) if record.is_parish() => Ok(record),
            _ => Err(ServiceError::NotFound(format!("parish {}", id))),
        }
    }

    pub fn add_parish(&self, key: ParishKey) -> Result<Record, ServiceError> {
        let mut parish = Parish::new(key);
        parish.staff_access_code = Some(DEFAULT_STAFF_CODE.to_string());
        parish.priest_access_code = Some(DEFAULT_PRIEST_CODE.to_string());
        let body = RecordBody::Parish(parish);
        validate(&body)?;

        let record = self.storage.create(body)?;
        metrics::increment_counter!("parishdb_mutations_total", "op" => "create", "kind" => "parish");
        tracing::info!(id = %record.id, parish = %record.parish_key(), "Parish added");
        Ok(record)
    }

    pub fn login(&self, parish_id: &RecordId, code: &str) -> Result<Session, ServiceError> {
        let parish = self.parish(parish_id)?;
        Ok(access::login(&parish, code)?)
    }

    /// Books an appointment at `parish_id`. The returned id is the only key
    /// a visitor has for later status checks. Sessions with elevated access
    /// to this parish submit pre-approved entries; anyone else is a visitor.
    pub fn submit_appointment(
        &self,
        session: &Session,
        parish_id: &RecordId,
        mut body: RecordBody,
    ) -> Result<Record, ServiceError> {
        if !body.kind().is_appointment() {
            return Err(ServiceError::Validation(format!(
                "{} records are not appointments",
                body.kind()
            )));
        }

        let parish = self.parish(parish_id)?;
        let role = if access::has_elevated_access(session, &parish) {
            session.role()
        } else {
            Role::Visitor
        };

        *body.parish_key_mut() = parish.parish_key().clone();
        if let Some(appointment) = body.appointment_mut() {
            *appointment = Appointment::new(lifecycle::initial_status(role), role.provenance());
        }
        validate(&body)?;

        let record = self.storage.create(body)?;
        metrics::increment_counter!("parishdb_mutations_total", "op" => "create", "kind" => record.kind().as_str());
        tracing::info!(id = %record.id, kind = %record.kind(), %role, "Appointment submitted");
        Ok(record)
    }

    /// Staff entry of any non-parish record for their own parish.
    pub fn add_record(
        &self,
        session: &Session,
        parish_id: &RecordId,
        mut body: RecordBody,
    ) -> Result<Record, ServiceError> {
        let parish = self.parish(parish_id)?;
        access::require_elevated(session, &parish)?;

        if body.kind() == RecordKind::Parish {
            return Err(ServiceError::Validation("use add_parish for parishes".to_string()));
        }

        let role = session.role();
        *body.parish_key_mut() = parish.parish_key().clone();
        body.set_added_by(role.provenance());
        if let Some(appointment) = body.appointment_mut() {
            appointment.status = lifecycle::initial_status(role);
            appointment.staff_reply = None;
        }
        validate(&body)?;

        let record = self.storage.create(body)?;
        metrics::increment_counter!("parishdb_mutations_total", "op" => "create", "kind" => record.kind().as_str());
        Ok(record)
    }

    /// Full replacement of an existing record. Records stay in their parish,
    /// appointment review state only changes through review, and access codes
    /// only through [`ParishOffice::update_access_codes`]. Those carried-over
    /// parts come from the stored copy at write time.
    pub fn update_record(&self, session: &Session, record: Record) -> Result<Record, ServiceError> {
        let current = self
            .storage
            .get(&record.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("record {}", record.id)))?;
        let parish = self.owning_parish(&current)?;
        access::require_elevated(session, &parish)?;
        validate(&record.body)?;

        let mut refusal: Option<ServiceError> = None;
        let stored = self.storage.modify(&record.id, &mut |stored: &mut Record| {
            if stored.parish_key() != current.parish_key() {
                // parish renamed since the access check
                refusal = Some(AccessError::AccessDenied.into());
                return false;
            }
            match merge_edit(stored, &record) {
                Ok(next) => {
                    *stored = next;
                    true
                }
                Err(e) => {
                    refusal = Some(e);
                    false
                }
            }
        })?;

        let stored = match stored {
            Some(stored) => stored,
            None => {
                return Err(refusal.unwrap_or_else(|| {
                    ServiceError::NotFound(format!("record {}", record.id))
                }))
            }
        };
        metrics::increment_counter!("parishdb_mutations_total", "op" => "update", "kind" => stored.kind().as_str());
        Ok(stored)
    }

    /// Deletes by id. An id that is already gone still succeeds for any staff
    /// or priest session; a parish that still owns records cannot be removed.
    pub fn delete_record(&self, session: &Session, id: &RecordId) -> Result<(), ServiceError> {
        match self.storage.get(id)? {
            Some(current) => {
                let parish = self.owning_parish(&current)?;
                access::require_elevated(session, &parish)?;
                if current.is_parish()
                    && !scope::scope(&self.storage.snapshot()?, current.parish_key()).is_empty()
                {
                    return Err(ServiceError::Validation(
                        "parish still has records".to_string(),
                    ));
                }
            }
            None if session.role().is_elevated() => {}
            None => return Err(AccessError::AccessDenied.into()),
        }

        self.storage.delete(id)?;
        metrics::increment_counter!("parishdb_mutations_total", "op" => "delete");
        Ok(())
    }

    pub fn review_appointment(
        &self,
        session: &Session,
        parish_id: &RecordId,
        appointment_id: &RecordId,
        decision: Decision,
        reply: Option<&str>,
    ) -> Result<Record, ServiceError> {
        let parish = self.parish(parish_id)?;
        access::require_elevated(session, &parish)?;

        let snapshot = self.storage.snapshot()?;
        let record = lifecycle::find_appointment(&snapshot, parish.parish_key(), appointment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("appointment {}", appointment_id)))?;

        let reviewed = lifecycle::review(self.storage.as_ref(), record, decision, reply)?;
        metrics::increment_counter!("parishdb_mutations_total", "op" => "review", "kind" => reviewed.kind().as_str());
        Ok(reviewed)
    }

    pub fn check_status(
        &self,
        parish_id: &RecordId,
        appointment_id: &RecordId,
    ) -> Result<Record, ServiceError> {
        let parish = self.parish(parish_id)?;
        let snapshot = self.storage.snapshot()?;
        lifecycle::find_appointment(&snapshot, parish.parish_key(), appointment_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("appointment {}", appointment_id)))
    }

    /// Records of one parish, optionally of one kind. Visitors only see kinds
    /// marked public in the kind table.
    pub fn records(
        &self,
        session: &Session,
        parish_id: &RecordId,
        kind: Option<RecordKind>,
    ) -> Result<Vec<Record>, ServiceError> {
        let parish = self.parish(parish_id)?;
        let elevated = access::has_elevated_access(session, &parish);
        if !elevated && !kind.map_or(false, |k| k.spec().public) {
            return Err(AccessError::AccessDenied.into());
        }

        let snapshot = self.storage.snapshot()?;
        Ok(scope::scope(&snapshot, parish.parish_key())
            .into_iter()
            .filter(|r| kind.map_or(true, |k| r.kind() == k))
            .cloned()
            .collect())
    }

    /// Record search within one parish. Visitors only get kinds marked
    /// public in the kind table.
    pub fn search(
        &self,
        session: &Session,
        parish_id: &RecordId,
        query: &str,
    ) -> Result<Vec<Record>, ServiceError> {
        let parish = self.parish(parish_id)?;
        let elevated = access::has_elevated_access(session, &parish);
        let snapshot = self.storage.snapshot()?;
        let scoped = scope::scope(&snapshot, parish.parish_key());
        Ok(search::search(scoped, query)
            .into_iter()
            .filter(|r| elevated || r.kind().spec().public)
            .cloned()
            .collect())
    }

    pub fn stats(&self, parish_id: &RecordId) -> Result<ParishStats, ServiceError> {
        let parish = self.parish(parish_id)?;
        let snapshot = self.storage.snapshot()?;
        Ok(aggregate::stats(scope::scope(&snapshot, parish.parish_key())))
    }

    pub fn pending_counts(
        &self,
        session: &Session,
        parish_id: &RecordId,
    ) -> Result<BTreeMap<RecordKind, usize>, ServiceError> {
        let parish = self.parish(parish_id)?;
        access::require_elevated(session, &parish)?;
        let snapshot = self.storage.snapshot()?;
        Ok(aggregate::pending_counts(scope::scope(&snapshot, parish.parish_key())))
    }

    /// Events on `date`. Sacramental bookings carry contact details, so
    /// visitors only see the public mass schedule.
    pub fn calendar(
        &self,
        session: &Session,
        parish_id: &RecordId,
        date: Date,
    ) -> Result<Vec<Record>, ServiceError> {
        let parish = self.parish(parish_id)?;
        let elevated = access::has_elevated_access(session, &parish);
        let snapshot = self.storage.snapshot()?;
        Ok(calendar::events_on(scope::scope(&snapshot, parish.parish_key()), date)
            .into_iter()
            .filter(|r| elevated || r.kind().spec().public)
            .cloned()
            .collect())
    }

    /// Staff may change the staff code; priests may change both.
    pub fn update_access_codes(
        &self,
        session: &Session,
        parish_id: &RecordId,
        staff_code: Option<String>,
        priest_code: Option<String>,
    ) -> Result<Record, ServiceError> {
        let parish = self.parish(parish_id)?;
        access::require_elevated(session, &parish)?;
        if priest_code.is_some() && session.role() != Role::Priest {
            return Err(AccessError::AccessDenied.into());
        }
        if [&staff_code, &priest_code]
            .iter()
            .any(|c| c.as_deref().map_or(false, |c| c.trim().is_empty()))
        {
            return Err(ServiceError::Validation("access codes cannot be blank".to_string()));
        }

        let stored = self.storage.modify(&parish.id, &mut |stored: &mut Record| {
            if stored.parish_key() != parish.parish_key() {
                return false;
            }
            let RecordBody::Parish(p) = &mut stored.body else {
                return false;
            };
            if let Some(code) = &staff_code {
                p.staff_access_code = Some(code.clone());
            }
            if let Some(code) = &priest_code {
                p.priest_access_code = Some(code.clone());
            }
            true
        })?;
        let stored = stored.ok_or(AccessError::AccessDenied)?;

        metrics::increment_counter!("parishdb_mutations_total", "op" => "update", "kind" => "parish");
        tracing::info!(id = %stored.id, role = %session.role(), "Access codes updated");
        Ok(stored)
    }

    fn owning_parish(&self, record: &Record) -> Result<Record, ServiceError> {
        if record.is_parish() {
            return Ok(record.clone());
        }
        scope::parishes(&self.storage.snapshot()?)
            .into_iter()
            .find(|p| p.parish_key() == record.parish_key())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("parish {}", record.parish_key())))
    }
}

/// The record an edit actually stores: `incoming` with the parts only other
/// operations may change taken from `stored`.
fn merge_edit(stored: &Record, incoming: &Record) -> Result<Record, ServiceError> {
    if stored.kind() != incoming.kind() {
        return Err(ServiceError::Validation("record kind cannot change".to_string()));
    }

    let mut next = incoming.clone();
    match (&mut next.body, &stored.body) {
        (RecordBody::Parish(next), RecordBody::Parish(prev)) => {
            next.staff_access_code = prev.staff_access_code.clone();
            next.priest_access_code = prev.priest_access_code.clone();
        }
        (body, prev_body) => {
            if body.parish_key() != prev_body.parish_key() {
                return Err(ServiceError::Validation(
                    "records cannot move between parishes".to_string(),
                ));
            }
            if let (Some(next), Some(prev)) = (body.appointment_mut(), prev_body.appointment()) {
                *next = prev.clone();
            }
        }
    }
    Ok(next)
}

/// Input checks run before the store is touched.
pub fn validate(body: &RecordBody) -> Result<(), ServiceError> {
    if !body.parish_key().is_complete() {
        return Err(ServiceError::Validation("all parish fields are required".to_string()));
    }

    let spec = body.kind().spec();
    for field in spec.required_fields {
        if body.text_field(field).map_or(true, |v| v.trim().is_empty()) {
            return Err(ServiceError::Validation(format!(
                "{} requires {}",
                spec.label, field
            )));
        }
    }

    let amount = match body {
        RecordBody::Donation(d) => Some(d.donation_amount),
        RecordBody::Expense(e) => Some(e.expense_amount),
        _ => None,
    };
    if let Some(amount) = amount {
        if amount < Decimal::ZERO {
            return Err(ServiceError::Validation("amounts cannot be negative".to_string()));
        }
        if amount.normalize().scale() > 2 {
            return Err(ServiceError::Validation(
                "amounts have at most two decimal places".to_string(),
            ));
        }
    }

    Ok(())
}
