//! Business Obligation Discovery
//!
//! Finds the licences, permits, registrations and codes a business must hold,
//! given where it operates (postcode) and what it does (activity). The
//! government business-licence search site has no API, so the library drives
//! a browser through its search form, scrapes the result cards, and groups the
//! obligations by level of government.
//!
//! # Usage
//!
//! ```rust,ignore
//! use obligation_discovery::{ChromiumDriver, Discoverer, DiscoveryConfig, DiscoveryRequest};
//!
//! let discoverer = Discoverer::new(ChromiumDriver::new(), DiscoveryConfig::new())?;
//! let result = discoverer
//!     .discover(&DiscoveryRequest::new("3066", "Café / Restaurant"))
//!     .await?;
//!
//! for record in &result.results.local {
//!     println!("{}: {:?}", record.regulator.as_deref().unwrap_or("?"), record.obligation);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Browser automation abstractions (BrowserDriver, BrowserSession)
//! - [`types`] - Requests, records, results and configuration
//! - [`pipeline`] - Resolution, querying, extraction, grouping and orchestration
//! - [`browsers`] - Driver implementations (ChromiumDriver)
//! - [`testing`] - Scripted browser for tests

pub mod browsers;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    ConfigError, DiscoveryError, QueryError, Result, SearchControl, SessionError,
};
pub use traits::{BrowserDriver, BrowserSession};
pub use types::{
    config::{
        Dataset, DiscoveryConfig, MarkupPatterns, PhraseTable, SelectorTable, SessionConfig,
        DEFAULT_SEARCH_URL, DEFAULT_SITE_ORIGIN,
    },
    record::ObligationRecord,
    request::{
        AlcoholFlags, BusinessStructure, ChemicalFlags, ControlledSubstances, DiscoveryRequest,
        MedicineFlags,
    },
    result::{
        Confidence, DiscoveryEnvelope, DiscoveryResult, ErrorEnvelope, GroupedObligations,
        Jurisdiction, QueryKind, QueryOutcome, QueryReport, RequestEcho,
    },
};

// Re-export pipeline components
pub use pipeline::{
    dedupe, group, infer_lga, plan_supplemental, resolve_state, with_session, Discoverer,
    Extractor, PlannedQuery, PostcodeRange, PostcodeTable, QueryPage, ResultsWait,
    SessionHandle, State,
};

#[cfg(feature = "chromium")]
pub use browsers::ChromiumDriver;

// Re-export testing utilities
pub use testing::{MockBrowser, MockPage};
