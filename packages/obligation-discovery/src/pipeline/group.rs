//! Jurisdiction grouping and local government area inference.

use crate::types::record::ObligationRecord;
use crate::types::result::GroupedObligations;

/// Regulator name fragments that identify a local council.
const COUNCIL_MARKERS: [&str; 3] = ["council", "city of", "shire"];

/// Whether a regulator name looks like a local council.
pub fn is_council_name(regulator: &str) -> bool {
    let lower = regulator.to_lowercase();
    COUNCIL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Partition records by their level label.
///
/// Case-insensitive substring match: "local" → local, "state" → state,
/// "federal"/"commonwealth" → federal, anything else (or no label) → unknown.
/// Every record lands in exactly one bucket, in input order.
pub fn group(records: Vec<ObligationRecord>) -> GroupedObligations {
    let mut grouped = GroupedObligations::default();
    for record in records {
        let level = record.level.as_deref().map(str::to_lowercase);
        let bucket = match level.as_deref() {
            Some(l) if l.contains("local") => &mut grouped.local,
            Some(l) if l.contains("state") => &mut grouped.state,
            Some(l) if l.contains("federal") || l.contains("commonwealth") => &mut grouped.federal,
            _ => &mut grouped.unknown,
        };
        bucket.push(record);
    }
    grouped
}

/// First regulator in input order that looks like a local council.
///
/// Best effort: returns the first match, not the most common one.
pub fn infer_lga(records: &[ObligationRecord]) -> Option<String> {
    records
        .iter()
        .filter_map(|record| record.regulator.as_deref())
        .find(|regulator| is_council_name(regulator))
        .map(str::to_string)
}
