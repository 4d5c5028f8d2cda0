//! Data types for discovery requests, records and results.

pub mod config;
pub mod record;
pub mod request;
pub mod result;
