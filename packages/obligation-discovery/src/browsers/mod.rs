//! Browser driver implementations.
//!
//! - `ChromiumDriver` - local Chrome over the DevTools protocol (feature `chromium`)
//!
//! Tests use [`MockBrowser`](crate::testing::MockBrowser) instead.

#[cfg(feature = "chromium")]
pub mod chromium;

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumDriver, ChromiumSession};
