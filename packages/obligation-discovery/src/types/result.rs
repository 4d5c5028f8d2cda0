//! Discovery output and the envelopes handed back to collaborators.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::DiscoveryError;
use crate::pipeline::jurisdiction::State;
use crate::types::config::Dataset;
use crate::types::record::ObligationRecord;
use crate::types::request::BusinessStructure;

/// Output of one discovery run. Built once by the orchestrator and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub run_id: Uuid,
    pub retrieved_at: DateTime<Utc>,
    pub input: RequestEcho,
    pub jurisdiction: Jurisdiction,
    pub datasets_used: Vec<Dataset>,
    pub results: GroupedObligations,
    pub confidence: Confidence,
    /// Every query issued during the run, in order.
    pub queries: Vec<QueryReport>,
}

impl DiscoveryResult {
    /// Total number of obligations across all buckets.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Wrap in the success envelope.
    pub fn into_envelope(self) -> DiscoveryEnvelope {
        DiscoveryEnvelope {
            ok: true,
            result: self,
        }
    }
}

/// Request fields echoed back in the response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEcho {
    pub postcode: String,
    pub activity_description: String,
    pub anzsic_code: Option<String>,
    pub business_structure: Option<BusinessStructure>,
    /// Supplemental phrases planned from controlled substance flags.
    pub supplemental_queries: Vec<String>,
}

/// Resolved jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    pub state: Option<State>,
    pub inferred_lga: Option<String>,
}

/// Obligations partitioned by jurisdiction level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedObligations {
    pub local: Vec<ObligationRecord>,
    pub state: Vec<ObligationRecord>,
    pub federal: Vec<ObligationRecord>,
    pub unknown: Vec<ObligationRecord>,
}

impl GroupedObligations {
    pub fn len(&self) -> usize {
        self.local.len() + self.state.len() + self.federal.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &ObligationRecord> {
        self.local
            .iter()
            .chain(&self.state)
            .chain(&self.federal)
            .chain(&self.unknown)
    }
}

/// Qualitative confidence in a result.
///
/// Only jurisdiction resolution is reflected; there is no per-record score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The postcode mapped to a state or territory.
    Resolved,
    /// The postcode did not map to any state or territory.
    Unresolved,
}

impl Confidence {
    pub fn from_state(state: Option<State>) -> Self {
        match state {
            Some(_) => Confidence::Resolved,
            None => Confidence::Unresolved,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Confidence::Resolved => {
                "Jurisdiction resolved from postcode. Results are indicative only and should be confirmed with each regulator."
            }
            Confidence::Unresolved => {
                "Jurisdiction could not be resolved from postcode. Results are indicative only and may be incomplete."
            }
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Why a query was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
    Primary,
    Anzsic,
    Supplemental,
}

/// How a query ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum QueryOutcome {
    /// A results indicator appeared.
    Ready,
    /// No indicator within the wait budget; the page was parsed anyway.
    TimedOut,
    /// The query failed and contributed no records.
    Failed { reason: String },
}

/// Provenance of one query in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub kind: QueryKind,
    pub keywords: String,
    pub records: usize,
    pub outcome: QueryOutcome,
}

/// Success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryEnvelope {
    pub ok: bool,
    #[serde(flatten)]
    pub result: DiscoveryResult,
}

/// Failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl From<&DiscoveryError> for ErrorEnvelope {
    fn from(err: &DiscoveryError) -> Self {
        Self {
            ok: false,
            error: err.to_string(),
            field: err.field().map(str::to_string),
            status: err.status_code(),
        }
    }
}
