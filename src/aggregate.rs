use std::collections::BTreeMap;

use parishdb_core::{AppointmentStatus, Record, RecordBody, RecordKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// Dashboard figures for one parish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParishStats {
    pub registrations: usize,
    pub baptisms: usize,
    pub marriages: usize,
    pub funerals: usize,
    pub members: usize,
    pub masses: usize,
    pub total_donations: Decimal,
    pub total_expenses: Decimal,
}

impl ParishStats {
    pub fn net_funds(&self) -> Decimal {
        self.total_donations - self.total_expenses
    }
}

/// Recomputes every figure from `records` on each call. Sums are kept at
/// two decimal places.
pub fn stats<'a, I>(records: I) -> ParishStats
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut stats = ParishStats::default();
    for record in records {
        match &record.body {
            RecordBody::Registration(_) => stats.registrations += 1,
            RecordBody::Baptism(_) => stats.baptisms += 1,
            RecordBody::Marriage(_) => stats.marriages += 1,
            RecordBody::Funeral(_) => stats.funerals += 1,
            RecordBody::Member(_) => stats.members += 1,
            RecordBody::Mass(_) => stats.masses += 1,
            RecordBody::Donation(d) => stats.total_donations += d.donation_amount,
            RecordBody::Expense(e) => stats.total_expenses += e.expense_amount,
            RecordBody::Parish(_) => {}
        }
    }
    stats.total_donations = money(stats.total_donations);
    stats.total_expenses = money(stats.total_expenses);
    stats
}

fn money(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount
}

/// Pending appointments per appointment kind; kinds with none report zero.
pub fn pending_counts<'a, I>(records: I) -> BTreeMap<RecordKind, usize>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: BTreeMap<RecordKind, usize> =
        RecordKind::APPOINTMENTS.iter().map(|k| (*k, 0)).collect();

    for record in records {
        if record.appointment().map(|a| a.status) == Some(AppointmentStatus::Pending) {
            *counts.entry(record.kind()).or_default() += 1;
        }
    }
    counts
}
