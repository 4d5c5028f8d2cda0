//! Record deduplication.

use std::collections::HashSet;

use crate::types::record::{ObligationRecord, RecordKey};

/// Drop repeated records, keeping the first occurrence of each
/// `(obligation, regulator, source_url)` triple in input order.
///
/// Fields outside the triple (`activity`, `level`, `postcode`) do not affect
/// identity, so the same obligation surfaced by two different queries keeps
/// the provenance of whichever query found it first.
pub fn dedupe(records: Vec<ObligationRecord>) -> Vec<ObligationRecord> {
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.key()))
        .collect()
}
