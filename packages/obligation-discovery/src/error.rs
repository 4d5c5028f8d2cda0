//! Typed errors for obligation discovery.
//!
//! Only request validation and session lifecycle failures escape a discovery
//! run. Everything that goes wrong inside a single query is a [`QueryError`],
//! which the pipeline absorbs as "no records from this query".

use std::fmt;

use thiserror::Error;

/// Errors that abort a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A mandatory request field is missing or blank
    #[error("missing required field: {field}")]
    Validation { field: &'static str },

    /// The automation session could not be started or died mid-run
    #[error("browser session error: {0}")]
    Session(#[from] SessionError),
}

impl DiscoveryError {
    /// HTTP-style status for collaborators that surface this error.
    ///
    /// Validation failures are the caller's fault (400); session failures
    /// mean the upstream site could not be reached through the browser (502).
    pub fn status_code(&self) -> u16 {
        match self {
            DiscoveryError::Validation { .. } => 400,
            DiscoveryError::Session(_) => 502,
        }
    }

    /// Name of the offending request field, if this is a validation error.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DiscoveryError::Validation { field } => Some(*field),
            DiscoveryError::Session(_) => None,
        }
    }
}

/// Browser session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser failed to launch
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// The browser or its connection went away while in use
    #[error("browser crashed: {0}")]
    Crashed(String),

    /// The session was used after it was released
    #[error("session already closed")]
    Closed,

    /// Tearing down the browser failed
    #[error("failed to close browser: {0}")]
    Close(String),
}

/// One of the three search-form controls a query needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchControl {
    Keywords,
    Location,
    Submit,
}

impl fmt::Display for SearchControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchControl::Keywords => "keyword input",
            SearchControl::Location => "location input",
            SearchControl::Submit => "submit control",
        };
        f.write_str(name)
    }
}

/// Errors local to a single search query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// None of the candidate selectors for a control were present
    #[error("search controls not found: {control}")]
    ControlsNotFound { control: SearchControl },

    /// Navigating to the search page failed
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A driver-level interaction (type, click, read) failed
    #[error("driver error: {0}")]
    Driver(String),

    /// The session itself is gone; no further queries can run
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Invalid entries in a pattern or selector table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A CSS selector failed to parse
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The site origin is not an absolute URL
    #[error("invalid site origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// Two postcode ranges overlap
    #[error("postcode ranges overlap: {first} and {second}")]
    OverlappingRanges { first: String, second: String },
}

/// Result type alias for discovery runs.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for session lifecycle operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type alias for single queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Result type alias for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = DiscoveryError::Validation { field: "postcode" };
        assert_eq!(validation.status_code(), 400);
        assert_eq!(validation.field(), Some("postcode"));

        let session = DiscoveryError::from(SessionError::Launch("no chrome".into()));
        assert_eq!(session.status_code(), 502);
        assert_eq!(session.field(), None);
    }

    #[test]
    fn test_controls_not_found_names_control() {
        let err = QueryError::ControlsNotFound {
            control: SearchControl::Location,
        };
        assert_eq!(err.to_string(), "search controls not found: location input");
    }
}
