//! Scoped automation session and the search query it runs.
//!
//! A discovery run owns exactly one browser session. [`with_session`]
//! launches it, hands a [`SessionHandle`] to the body, and closes the browser
//! afterwards no matter how the body ends (value, error, or panic).

use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{QueryError, QueryResult, SearchControl, SessionError, SessionResult};
use crate::traits::browser::{BrowserDriver, BrowserSession};
use crate::types::config::SessionConfig;

/// How waiting for results ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsWait {
    /// This indicator appeared.
    Ready { indicator: String },
    /// Nothing appeared in time. Not an error; the page may still hold results.
    TimedOut,
}

/// Raw results page from one query.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub markup: String,
    pub wait: ResultsWait,
}

/// Shared handle to the run's browser session.
///
/// Queries are serialized through an async mutex. Once released, every call
/// fails with [`SessionError::Closed`].
pub struct SessionHandle<S: BrowserSession> {
    inner: Arc<Mutex<Option<S>>>,
    config: Arc<SessionConfig>,
}

impl<S: BrowserSession> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: BrowserSession> SessionHandle<S> {
    pub fn new(session: S, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Run one search and return the resulting page.
    ///
    /// Navigates to the search page, resolves the keyword, location and submit
    /// controls from their candidate selectors, submits, then waits a bounded
    /// time for any results indicator.
    pub async fn query(&self, keywords: &str, postcode: &str) -> QueryResult<QueryPage> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(SessionError::Closed)?;
        let selectors = &self.config.selectors;

        debug!(url = %self.config.search_url, keywords = %keywords, "Opening search page");
        session.goto(&self.config.search_url).await?;

        let keyword_input = locate(session, &selectors.keywords, SearchControl::Keywords).await?;
        let location_input = locate(session, &selectors.location, SearchControl::Location).await?;
        let submit = locate(session, &selectors.submit, SearchControl::Submit).await?;

        session.fill(&keyword_input, keywords).await?;
        session.fill(&location_input, postcode).await?;
        session.click(&submit).await?;

        let wait = wait_for_results(
            session,
            &selectors.results_ready,
            self.config.results_timeout(),
            self.config.poll_interval(),
        )
        .await;
        if wait == ResultsWait::TimedOut {
            warn!(
                keywords = %keywords,
                timeout_ms = self.config.results_timeout_ms,
                "No results indicator appeared, parsing page as-is"
            );
        }

        let markup = session.content().await?;
        debug!(keywords = %keywords, markup_len = markup.len(), "Query page captured");

        Ok(QueryPage { markup, wait })
    }

    /// Close the browser. A no-op if already released.
    pub async fn release(&self) -> SessionResult<()> {
        let session = self.inner.lock().await.take();
        match session {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

/// First candidate selector present on the page.
async fn first_present<S: BrowserSession>(session: &mut S, candidates: &[String]) -> Option<String> {
    for candidate in candidates {
        if session.has_element(candidate).await {
            return Some(candidate.clone());
        }
    }
    None
}

async fn locate<S: BrowserSession>(
    session: &mut S,
    candidates: &[String],
    control: SearchControl,
) -> QueryResult<String> {
    match first_present(session, candidates).await {
        Some(selector) => {
            debug!(control = %control, selector = %selector, "Resolved search control");
            Ok(selector)
        }
        None => Err(QueryError::ControlsNotFound { control }),
    }
}

async fn wait_for_results<S: BrowserSession>(
    session: &mut S,
    indicators: &[String],
    timeout: Duration,
    poll: Duration,
) -> ResultsWait {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(indicator) = first_present(session, indicators).await {
            return ResultsWait::Ready { indicator };
        }
        let now = Instant::now();
        if now >= deadline {
            return ResultsWait::TimedOut;
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Launch a session, run `body` with it, and always release it.
///
/// The body's value is returned as-is. Launch failure is the only error this
/// function produces; a failed close is logged. A panic in the body is
/// resumed after the browser has been closed.
pub async fn with_session<D, F, Fut, T>(
    driver: &D,
    config: &SessionConfig,
    body: F,
) -> SessionResult<T>
where
    D: BrowserDriver,
    F: FnOnce(SessionHandle<D::Session>) -> Fut,
    Fut: Future<Output = T>,
{
    let session = driver.launch().await?;
    info!(driver = driver.name(), "Browser session acquired");

    let handle = SessionHandle::new(session, config.clone());
    let body_handle = handle.clone();
    let outcome = AssertUnwindSafe(async move { body(body_handle).await })
        .catch_unwind()
        .await;

    match handle.release().await {
        Ok(()) => info!(driver = driver.name(), "Browser session released"),
        Err(e) => warn!(driver = driver.name(), error = %e, "Failed to release browser session"),
    }

    match outcome {
        Ok(value) => Ok(value),
        Err(payload) => panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, MockPage};

    fn fast_config() -> SessionConfig {
        SessionConfig::new()
            .with_results_timeout(Duration::from_millis(30))
            .with_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_query_returns_page_for_keywords() {
        let browser = MockBrowser::new().with_results("cafe", "<div class='result-card'>x</div>");

        let page = with_session(&browser, &fast_config(), |session| async move {
            session.query("cafe", "3066").await
        })
        .await
        .unwrap()
        .unwrap();

        assert!(page.markup.contains("result-card"));
        assert_eq!(
            page.wait,
            ResultsWait::Ready {
                indicator: ".result-card".to_string()
            }
        );
        assert_eq!(browser.submissions(), vec![("cafe".to_string(), "3066".to_string())]);
    }

    #[tokio::test]
    async fn test_later_selector_candidates_are_used() {
        let page = MockPage::standard()
            .without("input#keywords")
            .with_element("input[name='keyword']");
        let browser = MockBrowser::new().with_search_page(page);

        with_session(&browser, &fast_config(), |session| async move {
            session.query("bakery", "2000").await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            browser.filled(),
            vec![
                ("input[name='keyword']".to_string(), "bakery".to_string()),
                ("input#location".to_string(), "2000".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_controls_fail_the_query_only() {
        let page = MockPage::standard().without("button[type='submit']");
        let browser = MockBrowser::new().with_search_page(page);

        let (first, second) = with_session(&browser, &fast_config(), |session| async move {
            let first = session.query("cafe", "3066").await;
            let second = session.query("cafe", "3066").await;
            (first, second)
        })
        .await
        .unwrap();

        assert!(matches!(
            first,
            Err(QueryError::ControlsNotFound {
                control: SearchControl::Submit
            })
        ));
        assert!(second.is_err());
        assert_eq!(browser.close_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_returns_page_as_is() {
        let browser = MockBrowser::new().with_results("cafe", "<p>Loading</p>");

        let page = with_session(&browser, &fast_config(), |session| async move {
            session.query("cafe", "3066").await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(page.wait, ResultsWait::TimedOut);
        assert!(page.markup.contains("Loading"));
    }

    #[tokio::test]
    async fn test_session_released_after_body_error() {
        let browser = MockBrowser::new().fail_navigation_for("cafe");

        let result = with_session(&browser, &fast_config(), |session| async move {
            session.query("cafe", "3066").await
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(QueryError::Navigation(_))));
        assert_eq!(browser.launch_count(), 1);
        assert_eq!(browser.close_count(), 1);
    }

    #[tokio::test]
    async fn test_session_released_after_panic() {
        let browser = MockBrowser::new();
        let task_browser = browser.clone();

        let joined = tokio::spawn(async move {
            with_session(&task_browser, &fast_config(), |_session| async move {
                panic!("body exploded");
            })
            .await
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        assert_eq!(browser.close_count(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_session_error() {
        let browser = MockBrowser::new().fail_launch();

        let result = with_session(&browser, &fast_config(), |_session| async move { 1 }).await;

        assert!(matches!(result, Err(SessionError::Launch(_))));
        assert_eq!(browser.close_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_unusable_after_release() {
        let browser = MockBrowser::new();

        let escaped = with_session(&browser, &fast_config(), |session| async move { session })
            .await
            .unwrap();

        assert!(!escaped.is_open().await);
        let result = escaped.query("cafe", "3066").await;
        assert!(matches!(result, Err(QueryError::Session(SessionError::Closed))));
        assert!(escaped.release().await.is_ok());
    }
}
