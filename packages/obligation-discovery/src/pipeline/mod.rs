//! Discovery pipeline.
//!
//! Components, leaf first:
//! - Jurisdiction resolution (postcode → state)
//! - Automation session (scoped browser, one search per query)
//! - Extraction (results markup → records)
//! - Deduplication
//! - Supplemental query planning (regulated substances)
//! - Grouping and LGA inference
//! - Orchestration

pub mod dedupe;
pub mod discover;
pub mod extract;
pub mod group;
pub mod jurisdiction;
pub mod planner;
pub mod session;

pub use dedupe::dedupe;
pub use discover::{Discoverer, PlannedQuery};
pub use extract::{clean_text, infer_level, CompiledPatterns, Extractor};
pub use group::{group, infer_lga, is_council_name};
pub use jurisdiction::{resolve_state, PostcodeRange, PostcodeTable, State};
pub use planner::plan_supplemental;
pub use session::{with_session, QueryPage, ResultsWait, SessionHandle};
