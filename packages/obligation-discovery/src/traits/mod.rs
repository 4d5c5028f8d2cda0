//! Core trait abstractions.

pub mod browser;

pub use browser::{BrowserDriver, BrowserSession};
