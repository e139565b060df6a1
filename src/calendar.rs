use parishdb_core::{Record, RecordBody};
use time::Date;

/// Scheduled events falling on `date`: baptisms and weddings by scheduled
/// date, funerals by funeral date, and masses that recur on that weekday.
pub fn events_on<'a, I>(records: I, date: Date) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| match &record.body {
            RecordBody::Baptism(b) => b.scheduled_date == date,
            RecordBody::Marriage(m) => m.scheduled_date == date,
            RecordBody::Funeral(f) => f.funeral_date == date,
            RecordBody::Mass(m) => m.mass_day == date.weekday(),
            _ => false,
        })
        .collect()
}
