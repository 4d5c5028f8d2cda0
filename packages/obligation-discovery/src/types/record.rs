//! Obligation records extracted from search results.

use serde::{Deserialize, Serialize};

/// One discovered obligation reference.
///
/// At least one of `obligation`, `regulator` or `source_url` is set; the
/// extractor never emits a record with none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationRecord {
    /// Jurisdiction label, either explicit from the page or inferred
    /// (`local`, `state`, `federal`). `None` until classified.
    pub level: Option<String>,

    /// Issuing agency or regulator
    pub regulator: Option<String>,

    /// Title of the licence, permit or registration
    pub obligation: Option<String>,

    /// Absolute URL of the obligation's detail page
    pub source_url: Option<String>,

    /// Query text that produced this record
    pub activity: String,

    /// Postcode the query was scoped to
    pub postcode: String,
}

/// Deduplication identity of a record.
pub type RecordKey = (Option<String>, Option<String>, Option<String>);

impl ObligationRecord {
    /// Create an empty record for a query.
    pub fn new(activity: impl Into<String>, postcode: impl Into<String>) -> Self {
        Self {
            level: None,
            regulator: None,
            obligation: None,
            source_url: None,
            activity: activity.into(),
            postcode: postcode.into(),
        }
    }

    /// Set the obligation title.
    pub fn with_obligation(mut self, obligation: impl Into<String>) -> Self {
        self.obligation = Some(obligation.into());
        self
    }

    /// Set the regulator.
    pub fn with_regulator(mut self, regulator: impl Into<String>) -> Self {
        self.regulator = Some(regulator.into());
        self
    }

    /// Set the source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Set the level label.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Whether the record carries any identifying content.
    pub fn is_identifiable(&self) -> bool {
        self.obligation.is_some() || self.regulator.is_some() || self.source_url.is_some()
    }

    /// The `(obligation, regulator, source_url)` triple used for deduplication.
    pub fn key(&self) -> RecordKey {
        (
            self.obligation.clone(),
            self.regulator.clone(),
            self.source_url.clone(),
        )
    }
}
