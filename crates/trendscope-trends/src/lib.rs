//! HTTP client for the external trends API.
//!
//! Wraps `reqwest` with trends-specific error mapping, retry with back-off,
//! and typed response deserialization. The raw endpoints live on
//! [`TrendsClient`]; the retrying [`trendscope_core::TrendsSource`]
//! implementation is what the aggregation pipeline consumes.

mod client;
mod retry;
mod source;

pub use client::TrendsClient;
