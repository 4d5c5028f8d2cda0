//! Postcode to state/territory resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Lowest and highest postcodes considered at all.
const MIN_POSTCODE: u16 = 200;
const MAX_POSTCODE: u16 = 9999;

/// Australian state or territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Nsw,
    Vic,
    Qld,
    Sa,
    Wa,
    Tas,
    Nt,
    Act,
}

impl State {
    pub const ALL: [State; 8] = [
        State::Nsw,
        State::Vic,
        State::Qld,
        State::Sa,
        State::Wa,
        State::Tas,
        State::Nt,
        State::Act,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            State::Nsw => "NSW",
            State::Vic => "VIC",
            State::Qld => "QLD",
            State::Sa => "SA",
            State::Wa => "WA",
            State::Tas => "TAS",
            State::Nt => "NT",
            State::Act => "ACT",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Inclusive range of postcodes belonging to one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostcodeRange {
    pub start: u16,
    pub end: u16,
    pub state: State,
}

impl PostcodeRange {
    pub const fn new(start: u16, end: u16, state: State) -> Self {
        Self { start, end, state }
    }

    pub fn contains(&self, postcode: u16) -> bool {
        (self.start..=self.end).contains(&postcode)
    }

    fn overlaps(&self, other: &PostcodeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for PostcodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:04} {}", self.start, self.end, self.state)
    }
}

/// Australia Post ranges, including large-volume-receiver blocks.
///
/// 9800-9999 is unallocated and resolves to nothing.
const CANONICAL_RANGES: [PostcodeRange; 14] = [
    PostcodeRange::new(200, 299, State::Act),
    PostcodeRange::new(800, 999, State::Nt),
    PostcodeRange::new(1000, 2599, State::Nsw),
    PostcodeRange::new(2600, 2618, State::Act),
    PostcodeRange::new(2619, 2899, State::Nsw),
    PostcodeRange::new(2900, 2920, State::Act),
    PostcodeRange::new(2921, 2999, State::Nsw),
    PostcodeRange::new(3000, 3999, State::Vic),
    PostcodeRange::new(4000, 4999, State::Qld),
    PostcodeRange::new(5000, 5999, State::Sa),
    PostcodeRange::new(6000, 6999, State::Wa),
    PostcodeRange::new(7000, 7999, State::Tas),
    PostcodeRange::new(8000, 8999, State::Vic),
    PostcodeRange::new(9000, 9799, State::Qld),
];

/// Ordered, disjoint postcode ranges. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PostcodeRange>", into = "Vec<PostcodeRange>")]
pub struct PostcodeTable {
    ranges: Vec<PostcodeRange>,
}

impl Default for PostcodeTable {
    fn default() -> Self {
        Self {
            ranges: CANONICAL_RANGES.to_vec(),
        }
    }
}

impl PostcodeTable {
    /// Build a table, rejecting overlapping ranges.
    pub fn new(ranges: Vec<PostcodeRange>) -> ConfigResult<Self> {
        let table = Self { ranges };
        table.check_disjoint()?;
        Ok(table)
    }

    pub fn ranges(&self) -> &[PostcodeRange] {
        &self.ranges
    }

    /// Fail if any two ranges share a postcode.
    pub fn check_disjoint(&self) -> ConfigResult<()> {
        for (i, first) in self.ranges.iter().enumerate() {
            if let Some(second) = self.ranges[i + 1..].iter().find(|r| first.overlaps(r)) {
                return Err(ConfigError::OverlappingRanges {
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Map a postcode to its state.
    ///
    /// Non-numeric input and postcodes outside every range give `None`;
    /// an unresolved jurisdiction lowers confidence but is never an error.
    pub fn resolve(&self, postcode: &str) -> Option<State> {
        let postcode = postcode.trim();
        if postcode.is_empty() || !postcode.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u16 = postcode.parse().ok()?;
        if !(MIN_POSTCODE..=MAX_POSTCODE).contains(&value) {
            return None;
        }
        self.ranges
            .iter()
            .find(|range| range.contains(value))
            .map(|range| range.state)
    }
}

impl TryFrom<Vec<PostcodeRange>> for PostcodeTable {
    type Error = ConfigError;

    fn try_from(ranges: Vec<PostcodeRange>) -> ConfigResult<Self> {
        Self::new(ranges)
    }
}

impl From<PostcodeTable> for Vec<PostcodeRange> {
    fn from(table: PostcodeTable) -> Self {
        table.ranges
    }
}

/// Resolve against the canonical table.
pub fn resolve_state(postcode: &str) -> Option<State> {
    PostcodeTable::default().resolve(postcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_table_is_disjoint() {
        assert!(PostcodeTable::default().check_disjoint().is_ok());
    }

    #[test]
    fn test_every_state_has_a_range() {
        let table = PostcodeTable::default();
        for state in State::ALL {
            assert!(
                table.ranges().iter().any(|r| r.state == state),
                "no range for {state}"
            );
        }
    }

    #[test]
    fn test_known_postcodes() {
        assert_eq!(resolve_state("3066"), Some(State::Vic));
        assert_eq!(resolve_state("2000"), Some(State::Nsw));
        assert_eq!(resolve_state("2600"), Some(State::Act));
        assert_eq!(resolve_state("0200"), Some(State::Act));
        assert_eq!(resolve_state("0800"), Some(State::Nt));
        assert_eq!(resolve_state("4000"), Some(State::Qld));
        assert_eq!(resolve_state("5000"), Some(State::Sa));
        assert_eq!(resolve_state("6000"), Some(State::Wa));
        assert_eq!(resolve_state("7000"), Some(State::Tas));
        assert_eq!(resolve_state(" 3000 "), Some(State::Vic));
    }

    #[test]
    fn test_unmatched_postcodes() {
        assert_eq!(resolve_state("9999"), None);
        assert_eq!(resolve_state("0100"), None);
        assert_eq!(resolve_state("0"), None);
        assert_eq!(resolve_state("10000"), None);
    }

    #[test]
    fn test_non_numeric_postcodes() {
        assert_eq!(resolve_state(""), None);
        assert_eq!(resolve_state("abcd"), None);
        assert_eq!(resolve_state("30a6"), None);
        assert_eq!(resolve_state("-3000"), None);
        assert_eq!(resolve_state("+3000"), None);
    }

    #[test]
    fn test_overlapping_table_rejected() {
        let result = PostcodeTable::new(vec![
            PostcodeRange::new(3000, 3999, State::Vic),
            PostcodeRange::new(3500, 4500, State::Qld),
        ]);
        assert!(matches!(result, Err(ConfigError::OverlappingRanges { .. })));
    }

    #[test]
    fn test_substitute_table() {
        let table = PostcodeTable::new(vec![PostcodeRange::new(1000, 1999, State::Tas)]).unwrap();
        assert_eq!(table.resolve("1500"), Some(State::Tas));
        assert_eq!(table.resolve("3066"), None);
    }

    #[test]
    fn test_table_deserialization_validates() {
        let overlapping = r#"[
            {"start": 1000, "end": 2000, "state": "NSW"},
            {"start": 2000, "end": 3000, "state": "VIC"}
        ]"#;
        assert!(serde_json::from_str::<PostcodeTable>(overlapping).is_err());
    }

    proptest! {
        #[test]
        fn prop_every_range_member_resolves_to_its_state(idx in 0usize..CANONICAL_RANGES.len(), offset in 0u16..2000) {
            let range = CANONICAL_RANGES[idx];
            let postcode = range.start + offset % (range.end - range.start + 1);
            prop_assert_eq!(resolve_state(&format!("{:04}", postcode)), Some(range.state));
        }

        #[test]
        fn prop_non_numeric_never_resolves(input in "[^0-9]*[a-zA-Z][^0-9]*") {
            prop_assert_eq!(resolve_state(&input), None);
        }
    }
}
