//! The trends-source capability boundary.

use async_trait::async_trait;

use crate::errors::TrendsError;
use crate::types::{RelatedQueries, TrendSeries};

/// A source of search-interest data.
///
/// Implemented by the HTTP trends client for production and by scripted fakes
/// in tests. Implementations are expected to apply their own retry policy;
/// callers see only the final outcome of each fetch.
#[async_trait]
pub trait TrendsSource: Send + Sync {
    /// Interest-over-time series for one keyword in one region.
    ///
    /// # Errors
    ///
    /// Returns [`TrendsError::NoData`] when the keyword has no measurable
    /// signal, [`TrendsError::RateLimited`] or [`TrendsError::Transient`]
    /// once the retry budget is exhausted, and [`TrendsError::Api`] /
    /// [`TrendsError::Deserialize`] for non-retriable source failures.
    async fn series(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<TrendSeries, TrendsError>;

    /// Related and rising query candidates for one seed keyword.
    ///
    /// # Errors
    ///
    /// Same error set as [`TrendsSource::series`], except that an empty
    /// candidate list is a valid result, not `NoData`.
    async fn related(&self, keyword: &str, geo: &str) -> Result<RelatedQueries, TrendsError>;
}
