//! Configuration types for discovery runs.
//!
//! The external search site's markup is not under our control, so every
//! selector and phrase the pipeline relies on lives in one of these tables
//! rather than in code. Tests swap in their own tables for synthetic markup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pipeline::jurisdiction::PostcodeTable;

/// Default search entry point.
pub const DEFAULT_SEARCH_URL: &str = "https://ablis.business.gov.au/search";

/// Default origin used to absolutize relative result links.
pub const DEFAULT_SITE_ORIGIN: &str = "https://ablis.business.gov.au";

/// Top-level configuration for a [`Discoverer`](crate::Discoverer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub markup: MarkupPatterns,

    #[serde(default)]
    pub postcodes: PostcodeTable,

    #[serde(default)]
    pub phrases: PhraseTable,

    /// External sources reported back as `datasetsUsed`.
    #[serde(default = "default_datasets")]
    pub datasets: Vec<Dataset>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            markup: MarkupPatterns::default(),
            postcodes: PostcodeTable::default(),
            phrases: PhraseTable::default(),
            datasets: default_datasets(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_markup(mut self, markup: MarkupPatterns) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_postcodes(mut self, postcodes: PostcodeTable) -> Self {
        self.postcodes = postcodes;
        self
    }

    pub fn with_phrases(mut self, phrases: PhraseTable) -> Self {
        self.phrases = phrases;
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<Dataset>) -> Self {
        self.datasets = datasets;
        self
    }
}

/// A named external source consulted during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub url: String,
}

impl Dataset {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

fn default_datasets() -> Vec<Dataset> {
    vec![Dataset::new(
        "Australian Business Licence and Information Service (ABLIS)",
        DEFAULT_SITE_ORIGIN,
    )]
}

/// How the automation session reaches and drives the search form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Page holding the search form.
    pub search_url: String,

    /// Origin that site-relative result links are resolved against.
    pub site_origin: String,

    /// How long to wait for a results indicator after submitting.
    ///
    /// Running out of time is not an error; the page is parsed as-is.
    /// Default: 15000.
    pub results_timeout_ms: u64,

    /// Delay between checks for a results indicator. Default: 250.
    pub poll_interval_ms: u64,

    pub selectors: SelectorTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            results_timeout_ms: 15_000,
            poll_interval_ms: 250,
            selectors: SelectorTable::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_site_origin(mut self, origin: impl Into<String>) -> Self {
        self.site_origin = origin.into();
        self
    }

    pub fn with_results_timeout(mut self, timeout: Duration) -> Self {
        self.results_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorTable) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_millis(self.results_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Candidate selectors for each search control, in preference order.
///
/// The first candidate present on the page wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorTable {
    pub keywords: Vec<String>,
    pub location: Vec<String>,
    pub submit: Vec<String>,
    /// Any one of these appearing means results have rendered.
    pub results_ready: Vec<String>,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            keywords: strings(&[
                "input#keywords",
                "input[name='keywords']",
                "input[name='keyword']",
                "input[type='search']",
                "input[aria-label*='activity']",
            ]),
            location: strings(&[
                "input#location",
                "input[name='location']",
                "input[name='postcode']",
                "input[aria-label*='postcode']",
            ]),
            submit: strings(&[
                "button[type='submit']",
                "input[type='submit']",
                "button.search-button",
                "#search-button",
            ]),
            results_ready: strings(&[
                ".search-results",
                ".result-card",
                "article.result",
                "[data-testid='search-results']",
                ".no-results",
            ]),
        }
    }
}

/// CSS selectors used to carve a results page into records.
///
/// Each list is tried in order and the first selector that matches wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupPatterns {
    /// Wrappers around one result ("cards").
    pub cards: Vec<String>,
    pub titles: Vec<String>,
    pub regulators: Vec<String>,
    pub levels: Vec<String>,
    pub links: Vec<String>,
}

impl Default for MarkupPatterns {
    fn default() -> Self {
        Self {
            cards: strings(&[
                "article.result",
                "div.result-card",
                "li.search-result",
                "div.search-result",
                "div.card",
                "article",
            ]),
            titles: strings(&[
                "h2",
                "h3",
                "h4",
                "a.title",
                "a[class*='title']",
                "[class*='title']",
            ]),
            regulators: strings(&[
                "[class*='regulator']",
                "[class*='agency']",
                "[class*='authority']",
                "[class*='issuer']",
            ]),
            levels: strings(&["[class*='level']", "[class*='jurisdiction']"]),
            links: strings(&["a[href]"]),
        }
    }
}

/// Supplemental search phrases per regulated category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseTable {
    pub alcohol: Vec<String>,
    pub medicines: Vec<String>,
    /// Added when a poisons schedule is declared.
    pub scheduled_medicines: Vec<String>,
    pub chemicals: Vec<String>,
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self {
            alcohol: strings(&["liquor licence", "responsible service of alcohol"]),
            medicines: strings(&["scheduled medicines", "pharmacy"]),
            scheduled_medicines: strings(&["poisons permit"]),
            chemicals: strings(&["hazardous chemicals", "dangerous goods"]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .with_search_url("http://localhost/search")
            .with_results_timeout(Duration::from_millis(40))
            .with_poll_interval(Duration::from_millis(0));

        assert_eq!(config.search_url, "http://localhost/search");
        assert_eq!(config.results_timeout(), Duration::from_millis(40));
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_session_config_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"results_timeout_ms": 500}"#).unwrap();

        assert_eq!(config.results_timeout(), Duration::from_millis(500));
        assert_eq!(config.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.selectors, SelectorTable::default());
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = SessionConfig::new().with_results_timeout(Duration::MAX);
        assert_eq!(config.results_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_default_datasets_present() {
        let config = DiscoveryConfig::new();
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].url, DEFAULT_SITE_ORIGIN);
    }

    #[test]
    fn test_every_control_has_candidates() {
        let selectors = SelectorTable::default();
        assert!(!selectors.keywords.is_empty());
        assert!(!selectors.location.is_empty());
        assert!(!selectors.submit.is_empty());
        assert!(!selectors.results_ready.is_empty());
    }
}
