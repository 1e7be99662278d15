//! Error taxonomy for the aggregation pipeline.
//!
//! Every external call site maps raw failures into one of these enums before
//! returning, so no transport-level error type crosses a component boundary.

use thiserror::Error;

/// Failures from the external trends source.
#[derive(Debug, Error)]
pub enum TrendsError {
    /// The source throttled the request (HTTP 429). Retried with back-off by
    /// the client; surfaces here only once the attempt budget is exhausted.
    #[error("trends source rate limited")]
    RateLimited,

    /// The keyword has no measurable signal in the requested window. Not a
    /// failure — the aggregator treats it as a zero contribution.
    #[error("no trend data for keyword")]
    NoData,

    /// Network-level or 5xx failure worth retrying.
    #[error("transient trends source failure: {0}")]
    Transient(String),

    /// The source reported an application-level error.
    #[error("trends API error: {0}")]
    Api(String),

    /// The response body did not match the expected shape.
    #[error("trends response deserialization failed for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connection, pool, timeout).
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed.
    #[error("snapshot store query failed: {0}")]
    Query(String),
}

/// Failures of a whole aggregation or cache lookup.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Unknown scenario, empty seed set, or otherwise malformed scenario
    /// configuration. Surfaced before any external call is made.
    #[error("invalid scenario configuration: {0}")]
    InvalidConfig(String),

    /// Every seed fetch failed. Partial seed failures are absorbed; this is
    /// the total-failure escalation.
    #[error("no trend data available for any seed keyword")]
    NoData,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The spawned refresh task died before producing a result.
    #[error("aggregation task failed: {0}")]
    Internal(String),
}
