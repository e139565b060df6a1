use parishdb_core::{
    AppointmentStatus, ParishKey, Record, RecordId, Role, StorageBackend, StorageError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("record {0} is not an appointment")]
    NotAppointment(RecordId),
    #[error("appointment {id} is already {status}")]
    AlreadyReviewed {
        id: RecordId,
        status: AppointmentStatus,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a staff review. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for AppointmentStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => AppointmentStatus::Approved,
            Decision::Rejected => AppointmentStatus::Rejected,
        }
    }
}

/// Visitor requests wait for review; staff and clergy entries are taken as
/// already vetted.
pub fn initial_status(role: Role) -> AppointmentStatus {
    if role.is_elevated() {
        AppointmentStatus::Approved
    } else {
        AppointmentStatus::Pending
    }
}

/// Moves a pending appointment to `decision` and attaches the reply.
///
/// The pending check and the write happen in one store mutation against the
/// stored copy, so a stale `record` or a concurrent review cannot overwrite
/// a decision already made. The returned record is the persisted state.
pub fn review(
    store: &dyn StorageBackend,
    record: &Record,
    decision: Decision,
    reply: Option<&str>,
) -> Result<Record, LifecycleError> {
    let reply = reply
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    let mut refusal = None;

    let reviewed = store.modify(&record.id, &mut |current: &mut Record| {
        let id = current.id.clone();
        match current.body.appointment_mut() {
            None => {
                refusal = Some(LifecycleError::NotAppointment(id));
                false
            }
            Some(appointment) if appointment.status.is_terminal() => {
                refusal = Some(LifecycleError::AlreadyReviewed {
                    id,
                    status: appointment.status,
                });
                false
            }
            Some(appointment) => {
                appointment.status = decision.into();
                appointment.staff_reply = reply.clone();
                true
            }
        }
    })?;

    match reviewed {
        Some(reviewed) => {
            tracing::info!(id = %reviewed.id, kind = %reviewed.kind(), status = %AppointmentStatus::from(decision), "Appointment reviewed");
            Ok(reviewed)
        }
        None => Err(refusal.unwrap_or_else(|| LifecycleError::NotAppointment(record.id.clone()))),
    }
}

/// Status lookup by the id handed to the visitor at submission. Only
/// appointments scoped to `parish` are found.
pub fn find_appointment<'a>(
    records: &'a [Record],
    parish: &ParishKey,
    id: &RecordId,
) -> Option<&'a Record> {
    records.iter().find(|r| {
        &r.id == id && !r.is_parish() && r.parish_key() == parish && r.kind().is_appointment()
    })
}
