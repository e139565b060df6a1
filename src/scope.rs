use parishdb_core::{ParishKey, Record};

/// Non-parish records whose five identity fields all equal `parish`
/// (case-sensitive), in store order.
pub fn scope<'a>(records: &'a [Record], parish: &ParishKey) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| !r.is_parish() && r.parish_key() == parish)
        .collect()
}

pub fn parishes(records: &[Record]) -> Vec<&Record> {
    records.iter().filter(|r| r.is_parish()).collect()
}

/// Parish directory search over name and location. Unlike record search an
/// empty query lists every parish.
pub fn search_parishes<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| r.is_parish())
        .filter(|r| {
            let key = r.parish_key();
            [&key.name, &key.barangay, &key.municipality, &key.province, &key.region]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}
