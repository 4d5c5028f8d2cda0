//! Chrome driver over the DevTools protocol.
//!
//! Launches a local Chrome/Chromium per session via `chromiumoxide`. The
//! protocol handler runs on its own task; when that task ends the browser is
//! gone and every further call reports [`SessionError::Crashed`].

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::fmt::Display;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult, SessionError, SessionResult};
use crate::traits::browser::{BrowserDriver, BrowserSession};

/// Launches headless Chrome sessions.
///
/// # Example
///
/// ```rust,ignore
/// let driver = ChromiumDriver::new().with_executable("/usr/bin/chromium");
/// let discoverer = Discoverer::new(driver, DiscoveryConfig::new())?;
/// ```
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    executable: Option<PathBuf>,
    headless: bool,
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromiumDriver {
    pub fn new() -> Self {
        Self {
            executable: None,
            headless: true,
        }
    }

    /// Use a specific Chrome binary instead of auto-detection.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Show the browser window (debugging selectors against the live site).
    pub fn headful(mut self) -> Self {
        self.headless = false;
        self
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    type Session = ChromiumSession;

    async fn launch(&self) -> SessionResult<ChromiumSession> {
        let mut builder = BrowserConfig::builder();
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "DevTools connection closed");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SessionError::Launch(e.to_string()));
            }
        };

        debug!(headless = self.headless, "Chrome launched");
        Ok(ChromiumSession {
            browser,
            page,
            handler,
            closed: false,
        })
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// One Chrome process with a single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    closed: bool,
}

impl ChromiumSession {
    fn ensure_open(&self) -> QueryResult<()> {
        if self.closed {
            return Err(SessionError::Closed.into());
        }
        if self.handler.is_finished() {
            return Err(SessionError::Crashed("DevTools connection lost".to_string()).into());
        }
        Ok(())
    }

    /// Map a protocol error, escalating when the browser itself is gone.
    fn failure(&self, err: impl Display, wrap: fn(String) -> QueryError) -> QueryError {
        if self.handler.is_finished() {
            SessionError::Crashed(err.to_string()).into()
        } else {
            wrap(err.to_string())
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> QueryResult<()> {
        self.ensure_open()?;
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure(e, QueryError::Navigation)),
        }
    }

    async fn has_element(&mut self, selector: &str) -> bool {
        if self.ensure_open().is_err() {
            return false;
        }
        self.page.find_element(selector).await.is_ok()
    }

    async fn fill(&mut self, selector: &str, text: &str) -> QueryResult<()> {
        self.ensure_open()?;
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => return Err(self.failure(e, QueryError::Driver)),
        };
        if let Err(e) = element.click().await {
            return Err(self.failure(e, QueryError::Driver));
        }
        match element.type_str(text).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure(e, QueryError::Driver)),
        }
    }

    async fn click(&mut self, selector: &str) -> QueryResult<()> {
        self.ensure_open()?;
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => return Err(self.failure(e, QueryError::Driver)),
        };
        match element.click().await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure(e, QueryError::Navigation)),
        }
    }

    async fn content(&mut self) -> QueryResult<String> {
        self.ensure_open()?;
        match self.page.content().await {
            Ok(html) => Ok(html),
            Err(e) => Err(self.failure(e, QueryError::Driver)),
        }
    }

    async fn close(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed waiting for Chrome to exit");
        }
        self.handler.abort();

        closed
            .map(|_| ())
            .map_err(|e| SessionError::Close(e.to_string()))
    }
}
