//! Testing utilities including a scripted browser.
//!
//! These let applications exercise the full discovery pipeline without
//! launching Chrome or touching the live search site.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{QueryError, QueryResult, SessionError, SessionResult};
use crate::traits::browser::{BrowserDriver, BrowserSession};

/// Markup returned for keywords with no scripted results.
pub const EMPTY_RESULTS: &str =
    r#"<html><body><div class="no-results">No results found</div></body></html>"#;

/// Elements present on the mock search form.
#[derive(Debug, Clone)]
pub struct MockPage {
    elements: HashSet<String>,
}

impl MockPage {
    /// A search form matching the first default candidate for each control.
    pub fn standard() -> Self {
        Self {
            elements: ["input#keywords", "input#location", "button[type='submit']"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// A page with no elements at all.
    pub fn empty() -> Self {
        Self {
            elements: HashSet::new(),
        }
    }

    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into());
        self
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.elements.remove(selector);
        self
    }

    fn has(&self, selector: &str) -> bool {
        self.elements.contains(selector)
    }

    fn markup(&self) -> String {
        let mut selectors: Vec<_> = self.elements.iter().cloned().collect();
        selectors.sort();
        format!("<html><body><!-- {} --></body></html>", selectors.join(", "))
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug)]
struct MockState {
    search_page: MockPage,
    results: HashMap<String, String>,
    fail_launch: bool,
    fail_navigation: HashSet<String>,
    crash_on: HashSet<String>,
    launches: usize,
    closes: usize,
    filled: Vec<(String, String)>,
    submissions: Vec<(String, String)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            search_page: MockPage::standard(),
            results: HashMap::new(),
            fail_launch: false,
            fail_navigation: HashSet::new(),
            crash_on: HashSet::new(),
            launches: 0,
            closes: 0,
            filled: Vec::new(),
            submissions: Vec::new(),
        }
    }
}

/// A scripted browser driver.
///
/// Serves a search form whose elements are listed in a [`MockPage`] and,
/// after submission, the markup registered for the typed keywords. Results
/// indicators are evaluated against that markup with real CSS selectors.
/// Every launch, close, fill and submission is recorded for assertions.
/// Clones share state.
///
/// # Example
///
/// ```rust
/// use obligation_discovery::testing::MockBrowser;
///
/// let browser = MockBrowser::new()
///     .with_results("cafe", r#"<div class="result-card"><h3>Food permit</h3></div>"#);
/// assert_eq!(browser.launch_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    state: Arc<RwLock<MockState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markup served after searching for `keywords`.
    pub fn with_results(self, keywords: impl Into<String>, markup: impl Into<String>) -> Self {
        self.state
            .write()
            .unwrap()
            .results
            .insert(keywords.into(), markup.into());
        self
    }

    /// Replace the search form.
    pub fn with_search_page(self, page: MockPage) -> Self {
        self.state.write().unwrap().search_page = page;
        self
    }

    /// Make every launch fail.
    pub fn fail_launch(self) -> Self {
        self.state.write().unwrap().fail_launch = true;
        self
    }

    /// Make submitting `keywords` fail with a navigation error.
    pub fn fail_navigation_for(self, keywords: impl Into<String>) -> Self {
        self.state
            .write()
            .unwrap()
            .fail_navigation
            .insert(keywords.into());
        self
    }

    /// Make submitting `keywords` kill the browser.
    pub fn crash_on(self, keywords: impl Into<String>) -> Self {
        self.state.write().unwrap().crash_on.insert(keywords.into());
        self
    }

    pub fn launch_count(&self) -> usize {
        self.state.read().unwrap().launches
    }

    pub fn close_count(&self) -> usize {
        self.state.read().unwrap().closes
    }

    /// `(selector, text)` for every fill, in order.
    pub fn filled(&self) -> Vec<(String, String)> {
        self.state.read().unwrap().filled.clone()
    }

    /// `(keywords, postcode)` for every submitted search, in order.
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.state.read().unwrap().submissions.clone()
    }

    /// Keywords of every submitted search, in order.
    pub fn searched_keywords(&self) -> Vec<String> {
        self.submissions().into_iter().map(|(k, _)| k).collect()
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    type Session = MockSession;

    async fn launch(&self) -> SessionResult<MockSession> {
        let mut state = self.state.write().unwrap();
        if state.fail_launch {
            return Err(SessionError::Launch("mock launch failure".to_string()));
        }
        state.launches += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
            current: Current::Blank,
            closed: false,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug)]
enum Current {
    Blank,
    Search { typed: Vec<(String, String)> },
    Results { markup: String },
}

/// Session produced by [`MockBrowser`].
#[derive(Debug)]
pub struct MockSession {
    state: Arc<RwLock<MockState>>,
    current: Current,
    closed: bool,
}

impl MockSession {
    fn ensure_open(&self) -> QueryResult<()> {
        if self.closed {
            return Err(SessionError::Closed.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn goto(&mut self, _url: &str) -> QueryResult<()> {
        self.ensure_open()?;
        self.current = Current::Search { typed: Vec::new() };
        Ok(())
    }

    async fn has_element(&mut self, selector: &str) -> bool {
        if self.closed {
            return false;
        }
        match &self.current {
            Current::Blank => false,
            Current::Search { .. } => self.state.read().unwrap().search_page.has(selector),
            Current::Results { markup } => match Selector::parse(selector) {
                Ok(parsed) => Html::parse_document(markup).select(&parsed).next().is_some(),
                Err(_) => false,
            },
        }
    }

    async fn fill(&mut self, selector: &str, text: &str) -> QueryResult<()> {
        self.ensure_open()?;
        let present = self.state.read().unwrap().search_page.has(selector);
        match &mut self.current {
            Current::Search { typed } if present => {
                typed.push((selector.to_string(), text.to_string()));
                self.state
                    .write()
                    .unwrap()
                    .filled
                    .push((selector.to_string(), text.to_string()));
                Ok(())
            }
            _ => Err(QueryError::Driver(format!("no element for {}", selector))),
        }
    }

    async fn click(&mut self, selector: &str) -> QueryResult<()> {
        self.ensure_open()?;
        let typed = match &self.current {
            Current::Search { typed } => typed.clone(),
            _ => return Err(QueryError::Driver(format!("no element for {}", selector))),
        };

        let mut state = self.state.write().unwrap();
        if !state.search_page.has(selector) {
            return Err(QueryError::Driver(format!("no element for {}", selector)));
        }

        // First fill is the keyword input, second the location input.
        let keywords = typed.first().map(|(_, t)| t.clone()).unwrap_or_default();
        let postcode = typed.get(1).map(|(_, t)| t.clone()).unwrap_or_default();
        state.submissions.push((keywords.clone(), postcode));

        if state.crash_on.contains(&keywords) {
            drop(state);
            self.closed = true;
            return Err(SessionError::Crashed("mock browser crashed".to_string()).into());
        }
        if state.fail_navigation.contains(&keywords) {
            return Err(QueryError::Navigation(
                "net::ERR_CONNECTION_RESET".to_string(),
            ));
        }

        let markup = state
            .results
            .get(&keywords)
            .cloned()
            .unwrap_or_else(|| EMPTY_RESULTS.to_string());
        self.current = Current::Results { markup };
        Ok(())
    }

    async fn content(&mut self) -> QueryResult<String> {
        self.ensure_open()?;
        Ok(match &self.current {
            Current::Blank => "<html></html>".to_string(),
            Current::Search { .. } => self.state.read().unwrap().search_page.markup(),
            Current::Results { markup } => markup.clone(),
        })
    }

    async fn close(&mut self) -> SessionResult<()> {
        // A crashed browser still counts as released.
        self.closed = true;
        self.state.write().unwrap().closes += 1;
        Ok(())
    }
}
