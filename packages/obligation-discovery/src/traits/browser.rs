//! Browser automation seam.
//!
//! The search site only works through a real browser (client-side rendered
//! form and results), so the pipeline drives it through these two traits.
//! Implementations:
//! - `ChromiumDriver` - Chrome via the DevTools protocol (feature `chromium`)
//! - `MockBrowser` - scripted pages for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! let driver = ChromiumDriver::new();
//! let mut session = driver.launch().await?;
//! session.goto("https://example.com/search").await?;
//! if session.has_element("input#keywords").await {
//!     session.fill("input#keywords", "cafe").await?;
//! }
//! let html = session.content().await?;
//! session.close().await?;
//! ```

use async_trait::async_trait;

use crate::error::{QueryResult, SessionResult};

/// Launches browser sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Session: BrowserSession + 'static;

    /// Start a fresh browser with one blank page.
    async fn launch(&self) -> SessionResult<Self::Session>;

    /// Driver name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// One live browser page.
///
/// Not safe for concurrent use; callers issue operations one at a time.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the page load.
    async fn goto(&mut self, url: &str) -> QueryResult<()>;

    /// Whether an element matching `selector` is currently present.
    async fn has_element(&mut self, selector: &str) -> bool;

    /// Focus the element and type `text` into it.
    async fn fill(&mut self, selector: &str, text: &str) -> QueryResult<()>;

    /// Click the element.
    async fn click(&mut self, selector: &str) -> QueryResult<()>;

    /// Current page markup.
    async fn content(&mut self) -> QueryResult<String>;

    /// Tear the browser down. Further calls must fail with `SessionError::Closed`.
    async fn close(&mut self) -> SessionResult<()>;
}
