use parishdb_core::Record;

/// Case-insensitive substring search over each record kind's search fields
/// (see `KindSpec::search_fields`). A blank query matches nothing. Results
/// keep the input order.
pub fn search<'a, I>(records: I, query: &str) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    records
        .into_iter()
        .filter(|record| matches(record, &needle))
        .collect()
}

fn matches(record: &Record, needle: &str) -> bool {
    record
        .kind()
        .spec()
        .search_fields
        .iter()
        .filter_map(|field| record.body.text_field(field))
        .any(|value| value.to_lowercase().contains(needle))
}
